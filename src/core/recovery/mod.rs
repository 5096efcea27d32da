//! ARIES recovery over a pluggable storage engine.
//!
//! ARIES runs in three phases once a crash is detected:
//! 1. **Analysis**: rebuilds the transaction table and dirty-page table from
//!    the combined log, seeded from the latest checkpoint.
//! 2. **Redo**: repeats history, reapplying every write the engine hasn't
//!    durably applied yet.
//! 3. **Undo**: rolls back whatever was still in progress at crash time,
//!    writing compensation log records as it goes.
//!
//! [`manager::LogManager`] is the entry point applications use; `analysis`,
//! `redo`, `undo` and `tables` are exposed individually so each phase can be
//! driven and tested on its own.

pub mod analysis;
pub mod config;
pub mod manager;
pub mod redo;
pub mod tables;
pub mod undo;

pub use analysis::analyze;
pub use config::LogManagerConfig;
pub use manager::LogManager;
pub use redo::{redo as redo_log, RedoOutcome};
pub use tables::{DirtyPageTable, TransactionTable};
pub use undo::undo as undo_log;
