//! Log-record model: the closed variant of record kinds the manager appends
//! to its tail, plus the line-oriented text codec that carries them to and
//! from the storage engine's durable log.

pub mod record;

pub use record::{parse_line, parse_log, LogRecord, TxTableSnapshot, DirtyPageSnapshot};
