//! Redo: repeats history by reapplying every logged page write the engine
//! hasn't already durably applied, then finalizes transactions that
//! committed but never got their `END` record written.

use crate::core::common::error::RecoveryError;
use crate::core::recovery::tables::{DirtyPageTable, TransactionTable};
use crate::core::storage::engine::StorageEngine;
use crate::core::types::{Lsn, PageId};
use crate::core::wal::LogRecord;
use log::{debug, warn};

/// The result of a redo pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedoOutcome {
    /// Every record that needed reapplying was reapplied.
    Complete,
    /// The storage engine rejected a page write; the caller should retry
    /// the whole recovery later.
    Retry {
        /// The page the failing write targeted.
        page_id: PageId,
        /// The LSN the write was attempting to apply.
        lsn: Lsn,
    },
}

fn redoable_payload(record: &LogRecord) -> Option<(PageId, u64, &[u8])> {
    match record {
        LogRecord::Update { page_id, offset, after_image, .. }
        | LogRecord::Clr { page_id, offset, after_image, .. } => {
            Some((*page_id, *offset, after_image.as_slice()))
        }
        _ => None,
    }
}

/// Runs the redo pass over the combined log. Returns the new `END` records
/// that must be appended to the tail on success.
pub fn redo(
    log: &[LogRecord],
    dirty_page_table: &mut DirtyPageTable,
    transaction_table: &mut TransactionTable,
    engine: &mut dyn StorageEngine,
) -> Result<(RedoOutcome, Vec<LogRecord>), RecoveryError> {
    let start_lsn = dirty_page_table.min_rec_lsn();

    for record in log {
        let this_lsn = record.lsn();
        if start_lsn.is_some_and(|start| this_lsn < start) {
            continue;
        }

        if let Some((page_id, offset, bytes)) = redoable_payload(record) {
            let Some(rec_lsn) = dirty_page_table.get(page_id) else { continue };
            if rec_lsn > this_lsn {
                continue;
            }
            if engine.get_lsn(page_id) >= this_lsn {
                continue;
            }
            debug!("redo: reapplying lsn {this_lsn} to page {page_id}");
            if !engine.page_write(page_id, offset, bytes, this_lsn) {
                warn!("redo: storage engine rejected write to page {page_id} at lsn {this_lsn}");
                return Ok((RedoOutcome::Retry { page_id, lsn: this_lsn }, Vec::new()));
            }
            continue;
        }

        match record {
            LogRecord::Commit { tx_id, .. } => {
                transaction_table.set_last_lsn(*tx_id, this_lsn);
                transaction_table.mark_committed(*tx_id);
            }
            LogRecord::End { tx_id, .. } => {
                transaction_table.forget(*tx_id);
            }
            _ => {}
        }
    }

    let committed: Vec<(crate::core::types::TxId, Lsn)> = transaction_table.committed().collect();
    let mut new_records = Vec::with_capacity(committed.len());
    for (tx_id, last_lsn) in committed {
        let end_lsn = engine.next_lsn();
        debug!("redo: writing missing end record for committed tx {tx_id} at lsn {end_lsn}");
        new_records.push(LogRecord::End { lsn: end_lsn, prev_lsn: last_lsn, tx_id });
        transaction_table.forget(tx_id);
    }

    Ok((RedoOutcome::Complete, new_records))
}
