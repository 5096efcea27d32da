//! Undo: rolls back transactions that were still in progress at crash time
//! (or a single transaction named by `abort`), generating compensation log
//! records so the rollback itself survives a second crash.

use crate::core::common::error::RecoveryError;
use crate::core::recovery::tables::{DirtyPageTable, TransactionTable};
use crate::core::storage::engine::StorageEngine;
use crate::core::types::{Lsn, TxId, TxStatus, NULL_LSN, NULL_TX};
use crate::core::wal::LogRecord;
use log::{debug, info, warn};
use std::collections::HashSet;

/// Runs the undo pass over the combined log.
///
/// `target` selects the mode: `None` undoes every transaction still
/// `InProgress` (the crash-recovery case); `Some(tx_id)` undoes a single
/// named transaction and also produces its `ABORT` record (the live-abort
/// case). Returns the new records — `ABORT`/`CLR`/`END` — that must be
/// appended to the tail, in the order they were produced.
pub fn undo(
    log: &[LogRecord],
    transaction_table: &mut TransactionTable,
    dirty_page_table: &mut DirtyPageTable,
    target: Option<TxId>,
    engine: &mut dyn StorageEngine,
) -> Result<Vec<LogRecord>, RecoveryError> {
    let mut to_undo: HashSet<Lsn> = HashSet::new();
    let mut new_records = Vec::new();

    match target {
        None => {
            for (_, last_lsn) in transaction_table.in_progress() {
                to_undo.insert(last_lsn);
            }
            info!("undo: {} transaction(s) to roll back", to_undo.len());
        }
        Some(tx_id) => {
            let Some(status) = transaction_table.status(tx_id) else {
                warn!("abort requested for unknown transaction {tx_id}; ignoring");
                return Ok(new_records);
            };
            if status != TxStatus::Committed {
                if let Some(last_lsn) = transaction_table.get_last_lsn(tx_id) {
                    to_undo.insert(last_lsn);
                }
            }
            let prev_lsn = transaction_table.get_last_lsn(tx_id).unwrap_or(NULL_LSN);
            let abort_lsn = engine.next_lsn();
            info!("undo: aborting transaction {tx_id} at lsn {abort_lsn}");
            transaction_table.set_last_lsn(tx_id, abort_lsn);
            new_records.push(LogRecord::Abort { lsn: abort_lsn, prev_lsn, tx_id });
        }
    }

    for record in log.iter().rev() {
        if to_undo.is_empty() {
            break;
        }
        let this_lsn = record.lsn();
        if !to_undo.remove(&this_lsn) {
            continue;
        }

        match record {
            LogRecord::Update { tx_id, page_id, offset, before_image, prev_lsn, .. } => {
                debug!("undo: reverting lsn {this_lsn} on page {page_id}");
                if !engine.page_write(*page_id, *offset, before_image, this_lsn) {
                    return Err(RecoveryError::EnginePageWriteFailed { page_id: *page_id, lsn: this_lsn });
                }

                let clr_lsn = engine.next_lsn();
                let current_last = transaction_table.get_last_lsn(*tx_id).unwrap_or(NULL_LSN);
                new_records.push(LogRecord::Clr {
                    lsn: clr_lsn,
                    prev_lsn: current_last,
                    tx_id: *tx_id,
                    page_id: *page_id,
                    offset: *offset,
                    after_image: before_image.clone(),
                    undo_next_lsn: *prev_lsn,
                });
                transaction_table.set_last_lsn(*tx_id, clr_lsn);
                dirty_page_table.insert_if_absent(*page_id, clr_lsn);

                if *prev_lsn == NULL_LSN {
                    let end_lsn = engine.next_lsn();
                    debug!("undo: transaction {tx_id} fully undone, writing end at lsn {end_lsn}");
                    new_records.push(LogRecord::End { lsn: end_lsn, prev_lsn: clr_lsn, tx_id: *tx_id });
                    transaction_table.forget(*tx_id);
                } else {
                    to_undo.insert(*prev_lsn);
                }
            }
            LogRecord::Clr { tx_id, undo_next_lsn, .. } => {
                if *undo_next_lsn != NULL_LSN {
                    to_undo.insert(*undo_next_lsn);
                } else {
                    let end_lsn = engine.next_lsn();
                    let current_last = transaction_table.get_last_lsn(*tx_id).unwrap_or(this_lsn);
                    debug!("undo: transaction {tx_id} fully undone, writing end at lsn {end_lsn}");
                    new_records.push(LogRecord::End { lsn: end_lsn, prev_lsn: current_last, tx_id: *tx_id });
                    transaction_table.forget(*tx_id);
                }
            }
            _ => {
                // ABORT/COMMIT/END/checkpoint records are never added to ToUndo.
            }
        }
    }

    if let Some(&dangling) = to_undo.iter().next() {
        return Err(RecoveryError::DanglingLsnReference {
            lsn: dangling,
            tx_id: target.unwrap_or(NULL_TX),
            target: dangling,
        });
    }

    Ok(new_records)
}
