//! LMDB storage backend for the traffic sign ledger.
//!
//! Implements the `tsl-store` traits using the `heed` LMDB bindings. Every
//! table maps to one named LMDB database inside a single environment, so one
//! LMDB write transaction covers a status transition and all of its effects.

pub mod codec;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod migration;
mod txn;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
