//! LMDB environment setup and the [`Store`] implementation.

use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use tsl_store::{ReadTxn, Store, StoreError, WriteTxn};

use crate::migration::Migrator;
use crate::txn::LmdbTxn;
use crate::LmdbError;

/// Database names, in creation order.
pub(crate) const DATABASE_NAMES: &[&str] = &[
    "users",
    "signs",
    "submissions",
    "votes",
    "pending_deadlines",
    "coin_transactions",
    "notifications",
    "meta",
];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    path: PathBuf,
    /// user id → `User`
    pub(crate) users_db: Database<Bytes, Bytes>,
    /// sign id → `Sign`
    pub(crate) signs_db: Database<Bytes, Bytes>,
    /// submission id → `Submission`
    pub(crate) submissions_db: Database<Bytes, Bytes>,
    /// `submission ‖ voter` → `Vote`
    pub(crate) votes_db: Database<Bytes, Bytes>,
    /// `deadline ‖ submission` → () for every pending submission
    pub(crate) pending_db: Database<Bytes, Bytes>,
    /// `user ‖ created_at ‖ seq` → `CoinTransaction`
    pub(crate) transactions_db: Database<Bytes, Bytes>,
    /// `user ‖ created_at ‖ seq` → `Notification`
    pub(crate) notifications_db: Database<Bytes, Bytes>,
    /// schema version, log sequence counter
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process for this path and
        // the memory map is only accessed through heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(DATABASE_NAMES.len() as u32))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let users_db = env.create_database(&mut wtxn, Some("users"))?;
        let signs_db = env.create_database(&mut wtxn, Some("signs"))?;
        let submissions_db = env.create_database(&mut wtxn, Some("submissions"))?;
        let votes_db = env.create_database(&mut wtxn, Some("votes"))?;
        let pending_db = env.create_database(&mut wtxn, Some("pending_deadlines"))?;
        let transactions_db = env.create_database(&mut wtxn, Some("coin_transactions"))?;
        let notifications_db = env.create_database(&mut wtxn, Some("notifications"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let environment = Self {
            env,
            path: path.to_path_buf(),
            users_db,
            signs_db,
            submissions_db,
            votes_db,
            pending_db,
            transactions_db,
            notifications_db,
            meta_db,
        };
        Migrator::run(&environment)?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a raw meta value.
    pub fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        Ok(self.meta_db.get(&rtxn, key.as_bytes())?.map(|v| v.to_vec()))
    }

    /// Write a raw meta value in its own transaction.
    pub fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        self.meta_db.put(&mut wtxn, key.as_bytes(), value)?;
        wtxn.commit()?;
        Ok(())
    }
}

impl Store for LmdbEnvironment {
    fn read<R, E>(&self, f: impl FnOnce(&dyn ReadTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let rtxn = self
            .env
            .read_txn()
            .map_err(LmdbError::from)
            .map_err(StoreError::from)?;
        let txn = LmdbTxn::new(self, rtxn);
        f(&txn)
    }

    fn write<R, E>(&self, f: impl FnOnce(&mut dyn WriteTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let wtxn = self
            .env
            .write_txn()
            .map_err(LmdbError::from)
            .map_err(StoreError::from)?;
        let mut txn = LmdbTxn::new(self, wtxn);
        // Dropping `txn` on the error path aborts the LMDB transaction.
        let out = f(&mut txn)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(out)
    }
}
