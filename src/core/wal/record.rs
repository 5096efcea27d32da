//! The log-record model.
//!
//! Records form a closed variant instead of the base-class/downcast
//! hierarchy of the system this crate's algorithms are modeled on: every
//! operation matches exhaustively instead of probing a type tag and casting.
//!
//! The wire format is line-oriented and pipe-delimited so the durable log
//! stays plain, newline-delimited text (`parse(serialize(r)) == r` is the
//! only property the format owes anyone; it is not meant to be stable across
//! crate versions). Byte payloads are hex-encoded inline.

use crate::core::common::error::RecoveryError;
use crate::core::common::hex;
use crate::core::types::{Lsn, PageId, TxId, TxStatus};

/// A snapshot of one transaction-table entry, captured by `END_CKPT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxTableSnapshot {
    /// The transaction this entry describes.
    pub tx_id: TxId,
    /// Its `lastLSN` at checkpoint time.
    pub last_lsn: Lsn,
    /// Its status at checkpoint time.
    pub status: TxStatus,
}

/// A snapshot of one dirty-page-table entry, captured by `END_CKPT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyPageSnapshot {
    /// The page this entry describes.
    pub page_id: PageId,
    /// Its `recLSN` at checkpoint time.
    pub rec_lsn: Lsn,
}

/// A single write-ahead log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// A logical page write: `offset` bytes of `page_id` changed from
    /// `before_image` to `after_image`.
    Update {
        lsn: Lsn,
        prev_lsn: Lsn,
        tx_id: TxId,
        page_id: PageId,
        offset: u64,
        before_image: Vec<u8>,
        after_image: Vec<u8>,
    },
    /// A compensation log record: redo-only record of an undo step.
    /// `after_image` holds the bytes written (the before-image of the
    /// `Update` being undone). `undo_next_lsn` is the next record of this
    /// transaction still to be undone, i.e. the undone `Update`'s
    /// `prev_lsn` — not this CLR's own `prev_lsn` (see the CLR-linkage
    /// design note; the two are easy to conflate and must not be).
    Clr {
        lsn: Lsn,
        prev_lsn: Lsn,
        tx_id: TxId,
        page_id: PageId,
        offset: u64,
        after_image: Vec<u8>,
        undo_next_lsn: Lsn,
    },
    /// The transaction decided to commit.
    Commit { lsn: Lsn, prev_lsn: Lsn, tx_id: TxId },
    /// The transaction decided to abort; undo begins.
    Abort { lsn: Lsn, prev_lsn: Lsn, tx_id: TxId },
    /// The transaction is fully done (post-commit or undo-drained).
    End { lsn: Lsn, prev_lsn: Lsn, tx_id: TxId },
    /// Checkpoint start marker.
    BeginCkpt { lsn: Lsn },
    /// Checkpoint end, carrying a snapshot of both in-memory tables.
    EndCkpt {
        lsn: Lsn,
        prev_lsn: Lsn,
        tx_table: Vec<TxTableSnapshot>,
        dirty_pages: Vec<DirtyPageSnapshot>,
    },
}

impl LogRecord {
    /// This record's own LSN.
    #[must_use]
    pub const fn lsn(&self) -> Lsn {
        match self {
            Self::Update { lsn, .. }
            | Self::Clr { lsn, .. }
            | Self::Commit { lsn, .. }
            | Self::Abort { lsn, .. }
            | Self::End { lsn, .. }
            | Self::BeginCkpt { lsn }
            | Self::EndCkpt { lsn, .. } => *lsn,
        }
    }

    /// The LSN of the previous record belonging to the same transaction, or
    /// `NULL_LSN` for checkpoint records and first-action records.
    #[must_use]
    pub const fn prev_lsn(&self) -> Lsn {
        match self {
            Self::Update { prev_lsn, .. }
            | Self::Clr { prev_lsn, .. }
            | Self::Commit { prev_lsn, .. }
            | Self::Abort { prev_lsn, .. }
            | Self::End { prev_lsn, .. }
            | Self::EndCkpt { prev_lsn, .. } => *prev_lsn,
            Self::BeginCkpt { .. } => crate::core::types::NULL_LSN,
        }
    }

    /// The owning transaction, or `NULL_TX` for checkpoint records.
    #[must_use]
    pub const fn tx_id(&self) -> TxId {
        match self {
            Self::Update { tx_id, .. }
            | Self::Clr { tx_id, .. }
            | Self::Commit { tx_id, .. }
            | Self::Abort { tx_id, .. }
            | Self::End { tx_id, .. } => *tx_id,
            Self::BeginCkpt { .. } | Self::EndCkpt { .. } => crate::core::types::NULL_TX,
        }
    }

    /// Serialize to a single line of text (no trailing newline).
    #[must_use]
    pub fn serialize(&self) -> String {
        match self {
            Self::Update { lsn, prev_lsn, tx_id, page_id, offset, before_image, after_image } => {
                format!(
                    "UPDATE|{}|{}|{}|{}|{}|{}|{}",
                    lsn.0,
                    prev_lsn.0,
                    tx_id.0,
                    page_id.0,
                    offset,
                    hex::encode(before_image),
                    hex::encode(after_image)
                )
            }
            Self::Clr { lsn, prev_lsn, tx_id, page_id, offset, after_image, undo_next_lsn } => {
                format!(
                    "CLR|{}|{}|{}|{}|{}|{}|{}",
                    lsn.0,
                    prev_lsn.0,
                    tx_id.0,
                    page_id.0,
                    offset,
                    hex::encode(after_image),
                    undo_next_lsn.0
                )
            }
            Self::Commit { lsn, prev_lsn, tx_id } => {
                format!("COMMIT|{}|{}|{}", lsn.0, prev_lsn.0, tx_id.0)
            }
            Self::Abort { lsn, prev_lsn, tx_id } => {
                format!("ABORT|{}|{}|{}", lsn.0, prev_lsn.0, tx_id.0)
            }
            Self::End { lsn, prev_lsn, tx_id } => {
                format!("END|{}|{}|{}", lsn.0, prev_lsn.0, tx_id.0)
            }
            Self::BeginCkpt { lsn } => {
                format!("BEGIN_CKPT|{}|0|0", lsn.0)
            }
            Self::EndCkpt { lsn, prev_lsn, tx_table, dirty_pages } => {
                let tx_field = tx_table
                    .iter()
                    .map(|e| format!("{}:{}:{}", e.tx_id.0, e.last_lsn.0, e.status))
                    .collect::<Vec<_>>()
                    .join(";");
                let dp_field = dirty_pages
                    .iter()
                    .map(|e| format!("{}:{}", e.page_id.0, e.rec_lsn.0))
                    .collect::<Vec<_>>()
                    .join(";");
                format!("END_CKPT|{}|{}|0|{}|{}", lsn.0, prev_lsn.0, tx_field, dp_field)
            }
        }
    }
}

fn parse_u64(field: &str, line: usize, what: &str) -> Result<u64, RecoveryError> {
    field.parse::<u64>().map_err(|e| RecoveryError::MalformedRecord {
        line,
        reason: format!("invalid {what} {field:?}: {e}"),
    })
}

fn parse_tx_status(field: &str, line: usize) -> Result<TxStatus, RecoveryError> {
    match field {
        "U" => Ok(TxStatus::InProgress),
        "C" => Ok(TxStatus::Committed),
        other => Err(RecoveryError::MalformedRecord {
            line,
            reason: format!("invalid transaction status {other:?}"),
        }),
    }
}

fn parse_snapshot_field(
    field: &str,
    line: usize,
) -> Result<Vec<TxTableSnapshot>, RecoveryError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(';')
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            let [tx_id, last_lsn, status] = parts.as_slice() else {
                return Err(RecoveryError::MalformedRecord {
                    line,
                    reason: format!("invalid tx-table snapshot entry {entry:?}"),
                });
            };
            Ok(TxTableSnapshot {
                tx_id: TxId(parse_u64(tx_id, line, "tx_id")?),
                last_lsn: Lsn(parse_u64(last_lsn, line, "lsn")?),
                status: parse_tx_status(status, line)?,
            })
        })
        .collect()
}

fn parse_dirty_page_field(
    field: &str,
    line: usize,
) -> Result<Vec<DirtyPageSnapshot>, RecoveryError> {
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(';')
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            let [page_id, rec_lsn] = parts.as_slice() else {
                return Err(RecoveryError::MalformedRecord {
                    line,
                    reason: format!("invalid dirty-page snapshot entry {entry:?}"),
                });
            };
            Ok(DirtyPageSnapshot {
                page_id: PageId(parse_u64(page_id, line, "page_id")?),
                rec_lsn: Lsn(parse_u64(rec_lsn, line, "lsn")?),
            })
        })
        .collect()
}

/// Parse a single serialized line. `line_no` is only used to annotate
/// errors; it does not need to match the record's own LSN.
pub fn parse_line(text: &str, line_no: usize) -> Result<LogRecord, RecoveryError> {
    let fields: Vec<&str> = text.split('|').collect();
    let malformed = |reason: &str| RecoveryError::MalformedRecord {
        line: line_no,
        reason: reason.to_string(),
    };
    let tag = *fields.first().ok_or_else(|| malformed("empty line"))?;

    match tag {
        "UPDATE" => {
            let [_, lsn, prev_lsn, tx_id, page_id, offset, before, after] = fields.as_slice()
            else {
                return Err(malformed("UPDATE requires 7 fields"));
            };
            Ok(LogRecord::Update {
                lsn: Lsn(parse_u64(lsn, line_no, "lsn")?),
                prev_lsn: Lsn(parse_u64(prev_lsn, line_no, "prev_lsn")?),
                tx_id: TxId(parse_u64(tx_id, line_no, "tx_id")?),
                page_id: PageId(parse_u64(page_id, line_no, "page_id")?),
                offset: parse_u64(offset, line_no, "offset")?,
                before_image: hex::decode(before).map_err(|e| RecoveryError::MalformedRecord {
                    line: line_no,
                    reason: format!("before_image: {e}"),
                })?,
                after_image: hex::decode(after).map_err(|e| RecoveryError::MalformedRecord {
                    line: line_no,
                    reason: format!("after_image: {e}"),
                })?,
            })
        }
        "CLR" => {
            let [_, lsn, prev_lsn, tx_id, page_id, offset, after, undo_next_lsn] =
                fields.as_slice()
            else {
                return Err(malformed("CLR requires 7 fields"));
            };
            Ok(LogRecord::Clr {
                lsn: Lsn(parse_u64(lsn, line_no, "lsn")?),
                prev_lsn: Lsn(parse_u64(prev_lsn, line_no, "prev_lsn")?),
                tx_id: TxId(parse_u64(tx_id, line_no, "tx_id")?),
                page_id: PageId(parse_u64(page_id, line_no, "page_id")?),
                offset: parse_u64(offset, line_no, "offset")?,
                after_image: hex::decode(after).map_err(|e| RecoveryError::MalformedRecord {
                    line: line_no,
                    reason: format!("after_image: {e}"),
                })?,
                undo_next_lsn: Lsn(parse_u64(undo_next_lsn, line_no, "undo_next_lsn")?),
            })
        }
        "COMMIT" | "ABORT" | "END" => {
            let [_, lsn, prev_lsn, tx_id] = fields.as_slice() else {
                return Err(malformed("transaction marker requires 3 fields"));
            };
            let lsn = Lsn(parse_u64(lsn, line_no, "lsn")?);
            let prev_lsn = Lsn(parse_u64(prev_lsn, line_no, "prev_lsn")?);
            let tx_id = TxId(parse_u64(tx_id, line_no, "tx_id")?);
            Ok(match tag {
                "COMMIT" => LogRecord::Commit { lsn, prev_lsn, tx_id },
                "ABORT" => LogRecord::Abort { lsn, prev_lsn, tx_id },
                _ => LogRecord::End { lsn, prev_lsn, tx_id },
            })
        }
        "BEGIN_CKPT" => {
            let [_, lsn, _, _] = fields.as_slice() else {
                return Err(malformed("BEGIN_CKPT requires 3 fields"));
            };
            Ok(LogRecord::BeginCkpt { lsn: Lsn(parse_u64(lsn, line_no, "lsn")?) })
        }
        "END_CKPT" => {
            let [_, lsn, prev_lsn, _, tx_field, dp_field] = fields.as_slice() else {
                return Err(malformed("END_CKPT requires 5 fields"));
            };
            Ok(LogRecord::EndCkpt {
                lsn: Lsn(parse_u64(lsn, line_no, "lsn")?),
                prev_lsn: Lsn(parse_u64(prev_lsn, line_no, "prev_lsn")?),
                tx_table: parse_snapshot_field(tx_field, line_no)?,
                dirty_pages: parse_dirty_page_field(dp_field, line_no)?,
            })
        }
        other => Err(malformed(&format!("unknown record kind {other:?}"))),
    }
}

/// Parse a newline-delimited durable log into records, in file order. Blank
/// lines are skipped so a trailing newline never produces a spurious error.
pub fn parse_log(text: &str) -> Result<Vec<LogRecord>, RecoveryError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(line, i))
        .collect()
}
