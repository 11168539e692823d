//! Transaction traits: the read and write operations a backend must offer.

use crate::StoreError;
use tsl_types::{
    CoinTransaction, Notification, Reputation, RewardPurpose, Sign, SignId, SignStatus,
    Submission, SubmissionId, SubmissionStatus, Timestamp, User, UserId, Vote,
};

/// Read operations available inside any transaction.
pub trait ReadTxn {
    fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    fn get_sign(&self, id: &SignId) -> Result<Option<Sign>, StoreError>;

    fn get_submission(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// Every vote cast on a submission.
    fn votes_for(&self, submission: &SubmissionId) -> Result<Vec<Vote>, StoreError>;

    /// Pending submissions whose deadline is strictly before `now`, oldest deadline first.
    fn pending_past_deadline(&self, now: Timestamp) -> Result<Vec<SubmissionId>, StoreError>;

    /// Ids of every user with the admin role.
    fn admins(&self) -> Result<Vec<UserId>, StoreError>;

    /// A user's coin ledger entries in write order.
    fn transactions_for(&self, user: &UserId) -> Result<Vec<CoinTransaction>, StoreError>;

    /// A user's notifications in write order.
    fn notifications_for(&self, user: &UserId) -> Result<Vec<Notification>, StoreError>;

    /// Number of `purpose` ledger entries for `user` created at or after `since`.
    ///
    /// The default filters the whole log. Backends keyed by
    /// `user ‖ created_at` override it with a range scan.
    fn count_entries_since(
        &self,
        user: &UserId,
        purpose: RewardPurpose,
        since: Timestamp,
    ) -> Result<u32, StoreError> {
        Ok(self
            .transactions_for(user)?
            .iter()
            .filter(|tx| tx.purpose == purpose && tx.created_at >= since)
            .count() as u32)
    }
}

/// Write operations. Every mutation of a shared counter (balance, reputation,
/// vote count) is a delta applied to the row as it exists inside this
/// transaction, never an overwrite with a caller-held copy.
pub trait WriteTxn: ReadTxn {
    /// Create a user. Fails with `Duplicate` if the id exists.
    fn insert_user(&mut self, user: &User) -> Result<(), StoreError>;

    /// Create a sign. Fails with `Duplicate` if the id exists.
    fn insert_sign(&mut self, sign: &Sign) -> Result<(), StoreError>;

    /// Create a submission. Fails with `Duplicate` if the id exists.
    fn insert_submission(&mut self, submission: &Submission) -> Result<(), StoreError>;

    /// Record a vote. The (submission, voter) pair is a unique key: a second
    /// insert for the same pair fails with `Duplicate`.
    fn insert_vote(&mut self, vote: &Vote) -> Result<(), StoreError>;

    /// Add one to a submission's cached vote count and return the new count.
    fn increment_vote_count(
        &mut self,
        submission: &SubmissionId,
        now: Timestamp,
    ) -> Result<u32, StoreError>;

    /// Move a submission out of `Pending`, caching `approval_percentage`.
    ///
    /// Only succeeds if the submission is still pending. Returns `true` if this
    /// call performed the transition, `false` if the submission had already
    /// left the pending state.
    fn resolve_if_pending(
        &mut self,
        submission: &SubmissionId,
        to: SubmissionStatus,
        approval_percentage: f64,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Stamp `escalated_at` on a pending submission that has not been escalated.
    ///
    /// Returns `true` only for the call that set the stamp.
    fn mark_escalated(&mut self, submission: &SubmissionId, now: Timestamp)
        -> Result<bool, StoreError>;

    /// Set a sign's status, stamping `approved_at` when given.
    fn set_sign_status(
        &mut self,
        sign: &SignId,
        status: SignStatus,
        approved_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Apply a signed delta to a user's coin balance and return the new balance.
    ///
    /// Fails with `Constraint` if the balance would go negative.
    fn adjust_coin_balance(&mut self, user: &UserId, delta: i64) -> Result<u64, StoreError>;

    /// Apply a signed delta to a user's reputation (clamped) and return the result.
    fn adjust_reputation(&mut self, user: &UserId, delta: f64) -> Result<Reputation, StoreError>;

    /// Add one to a user's approved-submission count and return the new count.
    fn increment_approved_submissions(&mut self, user: &UserId) -> Result<u32, StoreError>;

    fn append_transaction(&mut self, tx: &CoinTransaction) -> Result<(), StoreError>;

    fn append_notification(&mut self, notification: &Notification) -> Result<(), StoreError>;
}
