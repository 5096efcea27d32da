//! Crate-wide error type for the recovery log manager.

use crate::core::types::{Lsn, TxId};

/// Errors surfaced by the log manager and its recovery phases.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// The storage engine's durable log contained a line that does not
    /// parse as a `LogRecord`.
    #[error("malformed log record at line {line}: {reason}")]
    MalformedRecord {
        /// 0-based line number within the text handed to `recover`.
        line: usize,
        /// Human-readable reason the line failed to parse.
        reason: String,
    },

    /// Undo followed a `prevLSN`/`undoNextLSN` pointer that names no record
    /// in the combined log. Indicates log corruption.
    #[error("dangling lsn reference: record {lsn} for tx {tx_id} points to missing lsn {target}")]
    DanglingLsnReference {
        /// LSN of the record holding the dangling pointer.
        lsn: Lsn,
        /// Transaction the record belongs to.
        tx_id: TxId,
        /// The missing LSN it pointed to.
        target: Lsn,
    },

    /// The storage engine reported failure (e.g. `pageWrite` returned
    /// `false`) while applying a redo or undo action.
    #[error("storage engine rejected page write for page {page_id} at lsn {lsn}")]
    EnginePageWriteFailed {
        /// Page the write targeted.
        page_id: crate::core::types::PageId,
        /// LSN the write was attempting to apply.
        lsn: Lsn,
    },

    /// A thread holding the log manager's internal mutex panicked while
    /// holding it, poisoning it for every later call.
    #[error("log manager mutex poisoned by a panicked thread")]
    LockPoisoned,
}
