//! Analysis: rebuilds the transaction table and dirty-page table from the
//! combined log, seeded from the most recent checkpoint if one exists.

use crate::core::common::error::RecoveryError;
use crate::core::recovery::tables::{DirtyPageTable, TransactionTable};
use crate::core::types::TxStatus;
use crate::core::wal::LogRecord;
use log::debug;

/// Scans the combined log and returns the tables as they stand at the end
/// of it. Seeds from the latest `END_CKPT`'s snapshots when one is present,
/// then replays every record from that point forward (inclusive — the
/// checkpoint record itself carries no further table mutation).
pub fn analyze(
    log: &[LogRecord],
) -> Result<(TransactionTable, DirtyPageTable), RecoveryError> {
    let mut transaction_table = TransactionTable::new();
    let mut dirty_page_table = DirtyPageTable::new();

    let mut start = 0;
    for (index, record) in log.iter().enumerate().rev() {
        if let LogRecord::EndCkpt { tx_table, dirty_pages, .. } = record {
            debug!("analyze: seeding tables from checkpoint at lsn {}", record.lsn());
            for entry in tx_table {
                transaction_table.set_last_lsn(entry.tx_id, entry.last_lsn);
                if entry.status == TxStatus::Committed {
                    transaction_table.mark_committed(entry.tx_id);
                }
            }
            for entry in dirty_pages {
                dirty_page_table.insert_if_absent(entry.page_id, entry.rec_lsn);
            }
            start = index;
            break;
        }
    }

    for record in &log[start..] {
        match record {
            LogRecord::Update { tx_id, lsn, page_id, .. } => {
                transaction_table.set_last_lsn(*tx_id, *lsn);
                dirty_page_table.insert_if_absent(*page_id, *lsn);
            }
            LogRecord::Clr { tx_id, lsn, page_id, .. } => {
                transaction_table.set_last_lsn(*tx_id, *lsn);
                dirty_page_table.insert_if_absent(*page_id, *lsn);
            }
            LogRecord::Commit { tx_id, lsn, .. } => {
                transaction_table.set_last_lsn(*tx_id, *lsn);
                transaction_table.mark_committed(*tx_id);
            }
            LogRecord::Abort { tx_id, lsn, .. } => {
                transaction_table.set_last_lsn(*tx_id, *lsn);
            }
            LogRecord::End { tx_id, .. } => {
                transaction_table.forget(*tx_id);
            }
            LogRecord::BeginCkpt { .. } | LogRecord::EndCkpt { .. } => {}
        }
    }

    debug!(
        "analyze: {} transactions, {} dirty pages after scanning {} records",
        transaction_table.len(),
        dirty_page_table.len(),
        log.len() - start
    );

    Ok((transaction_table, dirty_page_table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Lsn, PageId, TxId};
    use crate::core::wal::{DirtyPageSnapshot, TxTableSnapshot};

    #[test]
    fn empty_log_yields_empty_tables() {
        let (tt, dpt) = analyze(&[]).unwrap();
        assert!(tt.is_empty());
        assert!(dpt.is_empty());
    }

    #[test]
    fn tracks_in_progress_transaction_and_dirty_page() {
        let log = vec![LogRecord::Update {
            lsn: Lsn(1),
            prev_lsn: Lsn(0),
            tx_id: TxId(1),
            page_id: PageId(10),
            offset: 0,
            before_image: b"A".to_vec(),
            after_image: b"B".to_vec(),
        }];
        let (tt, dpt) = analyze(&log).unwrap();
        assert_eq!(tt.get_last_lsn(TxId(1)), Some(Lsn(1)));
        assert_eq!(dpt.get(PageId(10)), Some(Lsn(1)));
    }

    #[test]
    fn commit_then_end_clears_transaction() {
        let log = vec![
            LogRecord::Commit { lsn: Lsn(2), prev_lsn: Lsn(1), tx_id: TxId(1) },
            LogRecord::End { lsn: Lsn(3), prev_lsn: Lsn(2), tx_id: TxId(1) },
        ];
        let (tt, _) = analyze(&log).unwrap();
        assert_eq!(tt.get_last_lsn(TxId(1)), None);
    }

    #[test]
    fn seeds_from_latest_checkpoint_and_ignores_earlier_records() {
        let log = vec![
            LogRecord::Update {
                lsn: Lsn(1),
                prev_lsn: Lsn(0),
                tx_id: TxId(1),
                page_id: PageId(10),
                offset: 0,
                before_image: b"A".to_vec(),
                after_image: b"B".to_vec(),
            },
            LogRecord::BeginCkpt { lsn: Lsn(2) },
            LogRecord::EndCkpt {
                lsn: Lsn(3),
                prev_lsn: Lsn(2),
                tx_table: vec![TxTableSnapshot {
                    tx_id: TxId(1),
                    last_lsn: Lsn(1),
                    status: TxStatus::InProgress,
                }],
                dirty_pages: vec![DirtyPageSnapshot { page_id: PageId(10), rec_lsn: Lsn(1) }],
            },
            LogRecord::Update {
                lsn: Lsn(4),
                prev_lsn: Lsn(1),
                tx_id: TxId(1),
                page_id: PageId(10),
                offset: 1,
                before_image: b"X".to_vec(),
                after_image: b"Y".to_vec(),
            },
        ];
        let (tt, dpt) = analyze(&log).unwrap();
        assert_eq!(tt.get_last_lsn(TxId(1)), Some(Lsn(4)));
        assert_eq!(dpt.get(PageId(10)), Some(Lsn(1)));
    }
}
