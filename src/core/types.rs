//! Core identifiers shared by the log-record model, the in-memory tables and
//! the storage-engine adapter: log sequence numbers, transaction ids and page
//! ids.

use std::fmt;

/// Log Sequence Number. Allocated solely by the storage engine; strictly
/// increasing across the lifetime of a log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Lsn(pub u64);

/// Sentinel meaning "no such record". Never a valid allocation from
/// `StorageEngine::next_lsn`.
pub const NULL_LSN: Lsn = Lsn(0);

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct TxId(pub u64);

/// Sentinel meaning "not associated with a transaction". Used by
/// `BEGIN_CKPT`/`END_CKPT` records, which carry no owning transaction. Never
/// a valid transaction id handed to the manager by a client.
pub const NULL_TX: TxId = TxId(0);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page identifier, as understood by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A transaction's status in the transaction table.
///
/// `Aborting` transactions remain `InProgress` in the table until undo has
/// fully drained them (they are then removed entirely, not transitioned to
/// a terminal status) — ARIES never records "aborted" as a table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TxStatus {
    /// In progress (may still be active, or mid-abort/undo).
    InProgress,
    /// Committed; durability point has been reached.
    Committed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "U"),
            Self::Committed => write!(f, "C"),
        }
    }
}
