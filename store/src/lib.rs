//! Abstract storage traits for the traffic sign ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The resolution engine depends only on the traits.
//!
//! All access goes through a transaction. [`Store::write`] hands a closure a
//! [`WriteTxn`]; the transaction commits when the closure returns `Ok` and is
//! aborted when it returns `Err`, so a multi-row change (a status transition
//! plus its rewards and notifications) is never partially applied.

pub mod error;
pub mod keys;
pub mod txn;

pub use error::StoreError;
pub use txn::{ReadTxn, WriteTxn};

/// A transactional store.
///
/// Write transactions are serialisable: two concurrent `write` calls behave
/// as if one ran entirely before the other.
pub trait Store: Send + Sync {
    /// Run `f` against a read-only snapshot.
    fn read<R, E>(&self, f: impl FnOnce(&dyn ReadTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>;

    /// Run `f` inside a write transaction, committing only if it returns `Ok`.
    fn write<R, E>(&self, f: impl FnOnce(&mut dyn WriteTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>;
}
