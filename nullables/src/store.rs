//! Nullable store: thread-safe, transactional in-memory storage for testing.
//!
//! A write transaction runs against a private copy of every table while
//! holding the store lock. The copy replaces the live tables only if the
//! closure returns `Ok`, which gives the same all-or-nothing, one-writer-at-a-
//! time behaviour as the LMDB backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use tsl_store::{ReadTxn, Store, StoreError, WriteTxn};
use tsl_types::{
    CoinTransaction, Notification, Reputation, Sign, SignId, SignStatus, Submission,
    SubmissionId, SubmissionStatus, Timestamp, User, UserId, Vote,
};

#[derive(Clone, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    signs: HashMap<SignId, Sign>,
    submissions: HashMap<SubmissionId, Submission>,
    votes: BTreeMap<(SubmissionId, UserId), Vote>,
    transactions: Vec<CoinTransaction>,
    notifications: Vec<Notification>,
}

/// An in-memory store for testing.
pub struct NullStore {
    tables: Mutex<Tables>,
    failing_writes: AtomicU32,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            failing_writes: AtomicU32::new(0),
        }
    }

    /// Make the next `count` write transactions fail with a backend error
    /// before running. Used to exercise retry paths.
    pub fn fail_next_writes(&self, count: u32) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Total number of vote rows across all submissions.
    pub fn vote_row_count(&self) -> usize {
        self.lock().map(|t| t.votes.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("null store lock poisoned".to_string()))
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for NullStore {
    fn read<R, E>(&self, f: impl FnOnce(&dyn ReadTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let tables = self.lock()?;
        f(&*tables)
    }

    fn write<R, E>(&self, f: impl FnOnce(&mut dyn WriteTxn) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut live = self.lock()?;
        if self.take_injected_failure() {
            return Err(StoreError::Backend("injected write failure".to_string()).into());
        }
        let mut working = live.clone();
        let out = f(&mut working)?;
        *live = working;
        Ok(out)
    }
}

impl ReadTxn for Tables {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).cloned())
    }

    fn get_sign(&self, id: &SignId) -> Result<Option<Sign>, StoreError> {
        Ok(self.signs.get(id).cloned())
    }

    fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.get(id).cloned())
    }

    fn votes_for(&self, submission: &SubmissionId) -> Result<Vec<Vote>, StoreError> {
        Ok(self
            .votes
            .values()
            .filter(|v| &v.submission == submission)
            .cloned()
            .collect())
    }

    fn pending_past_deadline(&self, now: Timestamp) -> Result<Vec<SubmissionId>, StoreError> {
        let mut due: Vec<&Submission> = self
            .submissions
            .values()
            .filter(|s| s.status.is_open() && s.deadline.has_passed(now))
            .collect();
        due.sort_by_key(|s| (s.deadline, s.id));
        Ok(due.into_iter().map(|s| s.id).collect())
    }

    fn admins(&self) -> Result<Vec<UserId>, StoreError> {
        let mut ids: Vec<UserId> = self
            .users
            .values()
            .filter(|u| u.role.is_admin())
            .map(|u| u.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn transactions_for(&self, user: &UserId) -> Result<Vec<CoinTransaction>, StoreError> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| &t.user == user)
            .cloned()
            .collect())
    }

    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| &n.user == user)
            .cloned()
            .collect())
    }
}

impl Tables {
    fn user_mut(&mut self, id: &UserId) -> Result<&mut User, StoreError> {
        self.users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    fn submission_mut(&mut self, id: &SubmissionId) -> Result<&mut Submission, StoreError> {
        self.submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("submission {id}")))
    }
}

impl WriteTxn for Tables {
    fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("user {}", user.id)));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn insert_sign(&mut self, sign: &Sign) -> Result<(), StoreError> {
        if self.signs.contains_key(&sign.id) {
            return Err(StoreError::Duplicate(format!("sign {}", sign.id)));
        }
        self.signs.insert(sign.id, sign.clone());
        Ok(())
    }

    fn insert_submission(&mut self, submission: &Submission) -> Result<(), StoreError> {
        if self.submissions.contains_key(&submission.id) {
            return Err(StoreError::Duplicate(format!("submission {}", submission.id)));
        }
        self.submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError> {
        let key = (vote.submission, vote.voter);
        if self.votes.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "vote by {} on {}",
                vote.voter, vote.submission
            )));
        }
        self.votes.insert(key, vote.clone());
        Ok(())
    }

    fn increment_vote_count(
        &mut self,
        submission: &SubmissionId,
        now: Timestamp,
    ) -> Result<u32, StoreError> {
        let row = self.submission_mut(submission)?;
        row.vote_count += 1;
        row.updated_at = now;
        Ok(row.vote_count)
    }

    fn resolve_if_pending(
        &mut self,
        submission: &SubmissionId,
        to: SubmissionStatus,
        approval_percentage: f64,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let row = self.submission_mut(submission)?;
        if !row.status.is_open() {
            return Ok(false);
        }
        row.status = to;
        row.approval_percentage = approval_percentage;
        row.resolved_at = Some(now);
        row.updated_at = now;
        Ok(true)
    }

    fn mark_escalated(
        &mut self,
        submission: &SubmissionId,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let row = self.submission_mut(submission)?;
        if !row.status.is_open() || row.escalated_at.is_some() {
            return Ok(false);
        }
        row.escalated_at = Some(now);
        row.updated_at = now;
        Ok(true)
    }

    fn set_sign_status(
        &mut self,
        sign: &SignId,
        status: SignStatus,
        approved_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let row = self
            .signs
            .get_mut(sign)
            .ok_or_else(|| StoreError::NotFound(format!("sign {sign}")))?;
        row.status = status;
        if approved_at.is_some() {
            row.approved_at = approved_at;
        }
        row.updated_at = now;
        Ok(())
    }

    fn adjust_coin_balance(&mut self, user: &UserId, delta: i64) -> Result<u64, StoreError> {
        let row = self.user_mut(user)?;
        let next = (row.coin_balance as i128) + (delta as i128);
        if next < 0 {
            return Err(StoreError::Constraint(format!(
                "coin balance of {user} would become {next}"
            )));
        }
        row.coin_balance = u64::try_from(next)
            .map_err(|_| StoreError::Constraint(format!("coin balance of {user} overflows")))?;
        Ok(row.coin_balance)
    }

    fn adjust_reputation(&mut self, user: &UserId, delta: f64) -> Result<Reputation, StoreError> {
        let row = self.user_mut(user)?;
        row.reputation = row.reputation.apply_delta(delta);
        Ok(row.reputation)
    }

    fn increment_approved_submissions(&mut self, user: &UserId) -> Result<u32, StoreError> {
        let row = self.user_mut(user)?;
        row.approved_submissions += 1;
        Ok(row.approved_submissions)
    }

    fn append_transaction(&mut self, tx: &CoinTransaction) -> Result<(), StoreError> {
        self.transactions.push(tx.clone());
        Ok(())
    }

    fn append_notification(&mut self, notification: &Notification) -> Result<(), StoreError> {
        self.notifications.push(notification.clone());
        Ok(())
    }
}
