pub mod common;
pub mod recovery;
pub mod storage;
pub mod types;
pub mod wal;

