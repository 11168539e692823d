//! Persisted records.
//!
//! Users, signs and submissions are mutable rows. Votes, coin transactions and
//! notifications are append-only and never change after they are written.

use serde::{Deserialize, Serialize};

use crate::{
    Reputation, RewardPurpose, SignId, SignKind, SignStatus, SubmissionAction, SubmissionId,
    SubmissionStatus, Timestamp, TransactionKind, UserId, UserRole, VoteDirection,
};

/// A user: proposer, voter and possibly admin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: UserRole,
    pub reputation: Reputation,
    /// Coin balance. Never negative.
    pub coin_balance: u64,
    /// How many of this user's submissions were approved (feeds vote expertise).
    pub approved_submissions: u32,
    pub created_at: Timestamp,
}

/// A traffic sign in the dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sign {
    pub id: SignId,
    pub kind: SignKind,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: SignStatus,
    pub submitted_by: Option<UserId>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A proposed change to the dataset awaiting community resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub proposer: UserId,
    pub action: SubmissionAction,
    /// Sign this submission concerns. Set for every action once the sign exists.
    pub sign: Option<SignId>,
    pub description: Option<String>,
    pub status: SubmissionStatus,
    /// Snapshot of the weighted approval percentage taken at resolution time.
    pub approval_percentage: f64,
    /// Number of votes cast so far.
    pub vote_count: u32,
    /// Voting deadline, fixed at creation.
    pub deadline: Timestamp,
    /// When admins were asked to review this submission, if ever.
    pub escalated_at: Option<Timestamp>,
    /// When the submission left the pending state.
    pub resolved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Submission {
    /// Whether the escalation notification has already been sent.
    pub fn is_escalated(&self) -> bool {
        self.escalated_at.is_some()
    }
}

/// One voter's judgment on one submission. Immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub submission: SubmissionId,
    pub voter: UserId,
    pub direction: VoteDirection,
    /// Influence weight computed at cast time, in `[0.1, 1.0]`.
    pub weight: f64,
    pub cast_at: Timestamp,
}

/// A coin ledger entry. Immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinTransaction {
    pub user: UserId,
    /// Signed amount: positive for credits, negative for debits.
    pub amount: i64,
    pub kind: TransactionKind,
    pub purpose: RewardPurpose,
    pub reason: String,
    /// Submission or sign this entry refers to, as a string id.
    pub reference: Option<String>,
    pub created_at: Timestamp,
}

/// A message delivered to a user. Only the read flag may change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user: UserId,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}
