#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    deprecated,
    unused,
    clippy::todo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::unreachable,
    clippy::missing_safety_doc,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::option_if_let_else,
    clippy::similar_names,
    clippy::doc_markdown,
    clippy::module_inception,
    clippy::single_match_else,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::if_not_else
)]

//! # Recovery log manager
//!
//! A write-ahead log manager and ARIES crash-recovery engine for a
//! page-level storage backend. Application code (or the storage engine
//! itself) calls [`LogManager::write`], [`LogManager::commit`] and
//! [`LogManager::abort`] as transactions run; on restart,
//! [`LogManager::recover`] replays a durable log through the analysis,
//! redo, and undo passes to bring storage back to a consistent state.
//!
//! ## Quick start
//!
//! ```
//! use recovery_log_manager::{InMemoryStorageEngine, LogManager, LogManagerConfig, PageId, TxId};
//!
//! # fn main() -> Result<(), recovery_log_manager::RecoveryError> {
//! let engine = InMemoryStorageEngine::new();
//! let manager = LogManager::new(Box::new(engine), LogManagerConfig::default());
//!
//! let lsn = manager.write(TxId(1), PageId(1), 0, b"old".to_vec(), b"new".to_vec())?;
//! manager.commit(TxId(1))?;
//! manager.flush_log_tail(lsn)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core::types`]: the small value types shared across the crate — LSNs,
//!   transaction ids, page ids, transaction status.
//! - [`core::wal`]: the log-record model and its text wire format.
//! - [`core::recovery`]: the transaction table and dirty-page table, the
//!   analyze/redo/undo passes, and the [`LogManager`] that orchestrates them.
//! - [`core::storage`]: the [`StorageEngine`] adapter trait the log manager
//!   is written against, plus an in-memory reference implementation used in
//!   tests.
//! - [`core::common`]: crate-wide error type and the hex codec used by the
//!   wire format.

pub mod core;

pub use crate::core::common::RecoveryError;
pub use crate::core::recovery::{DirtyPageTable, LogManager, LogManagerConfig, TransactionTable};
pub use crate::core::storage::{InMemoryStorageEngine, StorageEngine};
pub use crate::core::types::{Lsn, PageId, TxId, TxStatus, NULL_LSN, NULL_TX};
pub use crate::core::wal::LogRecord;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_commit_then_flush_produces_no_error() {
        let engine = InMemoryStorageEngine::new();
        let manager = LogManager::new(Box::new(engine), LogManagerConfig::default());

        let lsn = manager.write(TxId(1), PageId(1), 0, b"old".to_vec(), b"new".to_vec()).unwrap();
        manager.commit(TxId(1)).unwrap();
        manager.flush_log_tail(lsn).unwrap();
    }

    #[test]
    fn recovering_an_empty_log_is_a_no_op() {
        let engine = InMemoryStorageEngine::new();
        let manager = LogManager::new(Box::new(engine), LogManagerConfig::default());
        manager.recover("").expect("recovering an empty log must succeed");
    }
}
