//! `ReadTxn` / `WriteTxn` over heed transactions.

use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use tsl_store::keys::{
    deadline_key, split_deadline_key, user_log_key, user_log_range, user_prefix, vote_key,
    vote_prefix,
};
use tsl_store::{ReadTxn, StoreError, WriteTxn};
use tsl_types::{
    CoinTransaction, Notification, Reputation, RewardPurpose, Sign, SignId, SignStatus,
    Submission, SubmissionId, SubmissionStatus, Timestamp, User, UserId, Vote,
};

use crate::codec::{decode, encode};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

const LOG_SEQ_KEY: &[u8] = b"log_seq";

/// Gives read access to either kind of heed transaction.
pub(crate) trait AsRoTxn<'e> {
    fn ro(&self) -> &RoTxn<'e>;
}

impl<'e> AsRoTxn<'e> for RoTxn<'e> {
    fn ro(&self) -> &RoTxn<'e> {
        self
    }
}

impl<'e> AsRoTxn<'e> for RwTxn<'e> {
    fn ro(&self) -> &RoTxn<'e> {
        self
    }
}

/// A heed transaction bound to the environment's database handles.
pub(crate) struct LmdbTxn<'e, T> {
    env: &'e LmdbEnvironment,
    txn: T,
}

impl<'e, T: AsRoTxn<'e>> LmdbTxn<'e, T> {
    pub(crate) fn new(env: &'e LmdbEnvironment, txn: T) -> Self {
        Self { env, txn }
    }

    fn get_record<V: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
    ) -> Result<Option<V>, StoreError> {
        match db.get(self.txn.ro(), key).map_err(heed_err)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn prefix_records<V: DeserializeOwned>(
        &self,
        db: Database<Bytes, Bytes>,
        prefix: &[u8],
    ) -> Result<Vec<V>, StoreError> {
        let mut out = Vec::new();
        for entry in db.prefix_iter(self.txn.ro(), prefix).map_err(heed_err)? {
            let (_, value) = entry.map_err(heed_err)?;
            out.push(decode(value)?);
        }
        Ok(out)
    }
}

impl<'e> LmdbTxn<'e, RwTxn<'e>> {
    pub(crate) fn commit(self) -> Result<(), LmdbError> {
        self.txn.commit()?;
        Ok(())
    }

    fn put_record<V: Serialize>(
        &mut self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
        value: &V,
    ) -> Result<(), StoreError> {
        let bytes = encode(value)?;
        db.put(&mut self.txn, key, &bytes).map_err(heed_err)?;
        Ok(())
    }

    fn insert_new<V: Serialize>(
        &mut self,
        db: Database<Bytes, Bytes>,
        key: &[u8],
        value: &V,
        what: impl FnOnce() -> String,
    ) -> Result<(), StoreError> {
        if db.get(self.txn.ro(), key).map_err(heed_err)?.is_some() {
            return Err(StoreError::Duplicate(what()));
        }
        self.put_record(db, key, value)
    }

    fn load_user(&self, id: &UserId) -> Result<User, StoreError> {
        self.get_record(self.env.users_db, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    fn load_submission(&self, id: &SubmissionId) -> Result<Submission, StoreError> {
        self.get_record(self.env.submissions_db, id.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))
    }

    fn store_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.put_record(self.env.users_db, user.id.as_bytes(), user)
    }

    fn store_submission(&mut self, submission: &Submission) -> Result<(), StoreError> {
        self.put_record(self.env.submissions_db, submission.id.as_bytes(), submission)
    }

    /// Next value of the log sequence that disambiguates same-second log rows.
    fn next_log_seq(&mut self) -> Result<u64, StoreError> {
        let current = match self
            .env
            .meta_db
            .get(self.txn.ro(), LOG_SEQ_KEY)
            .map_err(heed_err)?
        {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| StoreError::Corruption("log_seq is not 8 bytes".to_string()))?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        let next = current + 1;
        self.env
            .meta_db
            .put(&mut self.txn, LOG_SEQ_KEY, &next.to_be_bytes())
            .map_err(heed_err)?;
        Ok(next)
    }
}

impl<'e, T: AsRoTxn<'e>> ReadTxn for LmdbTxn<'e, T> {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.get_record(self.env.users_db, id.as_bytes())
    }

    fn get_sign(&self, id: &SignId) -> Result<Option<Sign>, StoreError> {
        self.get_record(self.env.signs_db, id.as_bytes())
    }

    fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        self.get_record(self.env.submissions_db, id.as_bytes())
    }

    fn votes_for(&self, submission: &SubmissionId) -> Result<Vec<Vote>, StoreError> {
        self.prefix_records(self.env.votes_db, &vote_prefix(submission))
    }

    fn pending_past_deadline(&self, now: Timestamp) -> Result<Vec<SubmissionId>, StoreError> {
        let mut due = Vec::new();
        for entry in self.env.pending_db.iter(self.txn.ro()).map_err(heed_err)? {
            let (key, _) = entry.map_err(heed_err)?;
            let (deadline, id) = split_deadline_key(key).ok_or_else(|| {
                StoreError::Corruption(format!("pending index key of {} bytes", key.len()))
            })?;
            if !deadline.has_passed(now) {
                break;
            }
            due.push(SubmissionId::from_bytes(id));
        }
        Ok(due)
    }

    fn admins(&self) -> Result<Vec<UserId>, StoreError> {
        let mut ids = Vec::new();
        for entry in self.env.users_db.iter(self.txn.ro()).map_err(heed_err)? {
            let (_, value) = entry.map_err(heed_err)?;
            let user: User = decode(value)?;
            if user.role.is_admin() {
                ids.push(user.id);
            }
        }
        Ok(ids)
    }

    fn transactions_for(&self, user: &UserId) -> Result<Vec<CoinTransaction>, StoreError> {
        self.prefix_records(self.env.transactions_db, &user_prefix(user))
    }

    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, StoreError> {
        self.prefix_records(self.env.notifications_db, &user_prefix(user))
    }

    /// Range scan from `user ‖ since`, so only the entries of the current
    /// window are decoded.
    fn count_entries_since(
        &self,
        user: &UserId,
        purpose: RewardPurpose,
        since: Timestamp,
    ) -> Result<u32, StoreError> {
        let (low, high) = user_log_range(user, since);
        let bounds = (
            Bound::Included(low.as_slice()),
            Bound::Included(high.as_slice()),
        );
        let mut count = 0;
        for entry in self
            .env
            .transactions_db
            .range(self.txn.ro(), &bounds)
            .map_err(heed_err)?
        {
            let (_, value) = entry.map_err(heed_err)?;
            let tx: CoinTransaction = decode(value)?;
            if tx.purpose == purpose {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl<'e> WriteTxn for LmdbTxn<'e, RwTxn<'e>> {
    fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.insert_new(self.env.users_db, user.id.as_bytes(), user, || {
            format!("user {}", user.id)
        })
    }

    fn insert_sign(&mut self, sign: &Sign) -> Result<(), StoreError> {
        self.insert_new(self.env.signs_db, sign.id.as_bytes(), sign, || {
            format!("sign {}", sign.id)
        })
    }

    fn insert_submission(&mut self, submission: &Submission) -> Result<(), StoreError> {
        self.insert_new(
            self.env.submissions_db,
            submission.id.as_bytes(),
            submission,
            || format!("submission {}", submission.id),
        )?;
        if submission.status.is_open() {
            self.env
                .pending_db
                .put(
                    &mut self.txn,
                    &deadline_key(submission.deadline, &submission.id),
                    &[],
                )
                .map_err(heed_err)?;
        }
        Ok(())
    }

    fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        self.insert_new(
            self.env.votes_db,
            &vote_key(&vote.submission, &vote.voter),
            vote,
            || format!("vote by {} on {}", vote.voter, vote.submission),
        )
    }

    fn increment_vote_count(
        &mut self,
        submission: &SubmissionId,
        now: Timestamp,
    ) -> Result<u32, StoreError> {
        let mut row = self.load_submission(submission)?;
        row.vote_count += 1;
        row.updated_at = now;
        self.store_submission(&row)?;
        Ok(row.vote_count)
    }

    fn resolve_if_pending(
        &mut self,
        submission: &SubmissionId,
        to: SubmissionStatus,
        approval_percentage: f64,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut row = self.load_submission(submission)?;
        if !row.status.is_open() {
            return Ok(false);
        }
        self.env
            .pending_db
            .delete(&mut self.txn, &deadline_key(row.deadline, &row.id))
            .map_err(heed_err)?;
        row.status = to;
        row.approval_percentage = approval_percentage;
        row.resolved_at = Some(now);
        row.updated_at = now;
        self.store_submission(&row)?;
        Ok(true)
    }

    fn mark_escalated(
        &mut self,
        submission: &SubmissionId,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let mut row = self.load_submission(submission)?;
        if !row.status.is_open() || row.escalated_at.is_some() {
            return Ok(false);
        }
        row.escalated_at = Some(now);
        row.updated_at = now;
        self.store_submission(&row)?;
        Ok(true)
    }

    fn set_sign_status(
        &mut self,
        sign: &SignId,
        status: SignStatus,
        approved_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut row: Sign = self
            .get_record(self.env.signs_db, sign.as_bytes())?
            .ok_or_else(|| StoreError::NotFound(format!("sign {sign}")))?;
        row.status = status;
        if approved_at.is_some() {
            row.approved_at = approved_at;
        }
        row.updated_at = now;
        self.put_record(self.env.signs_db, sign.as_bytes(), &row)
    }

    fn adjust_coin_balance(&mut self, user: &UserId, delta: i64) -> Result<u64, StoreError> {
        let mut row = self.load_user(user)?;
        let next = (row.coin_balance as i128) + (delta as i128);
        if next < 0 {
            return Err(StoreError::Constraint(format!(
                "coin balance of {user} would become {next}"
            )));
        }
        row.coin_balance = u64::try_from(next)
            .map_err(|_| StoreError::Constraint(format!("coin balance of {user} overflows")))?;
        self.store_user(&row)?;
        Ok(row.coin_balance)
    }

    fn adjust_reputation(&mut self, user: &UserId, delta: f64) -> Result<Reputation, StoreError> {
        let mut row = self.load_user(user)?;
        row.reputation = row.reputation.apply_delta(delta);
        self.store_user(&row)?;
        Ok(row.reputation)
    }

    fn increment_approved_submissions(&mut self, user: &UserId) -> Result<u32, StoreError> {
        let mut row = self.load_user(user)?;
        row.approved_submissions += 1;
        self.store_user(&row)?;
        Ok(row.approved_submissions)
    }

    fn append_transaction(&mut self, tx: &CoinTransaction) -> Result<(), StoreError> {
        let seq = self.next_log_seq()?;
        let key = user_log_key(&tx.user, tx.created_at, seq);
        self.put_record(self.env.transactions_db, &key, tx)
    }

    fn append_notification(&mut self, notification: &Notification) -> Result<(), StoreError> {
        let seq = self.next_log_seq()?;
        let key = user_log_key(&notification.user, notification.created_at, seq);
        self.put_record(self.env.notifications_db, &key, notification)
    }
}

fn heed_err(e: heed::Error) -> StoreError {
    LmdbError::from(e).into()
}

