//! Lifecycle and classification enums for submissions, signs, votes and users.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Open for voting.
    Pending,
    /// Accepted by the community (or an admin).
    Approved,
    /// Refused by the community (or an admin).
    Rejected,
}

impl SubmissionStatus {
    /// Whether votes may still be cast.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a persisted sign record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignStatus {
    Pending,
    Approved,
    Rejected,
}

impl From<SubmissionStatus> for SignStatus {
    fn from(status: SubmissionStatus) -> Self {
        match status {
            SubmissionStatus::Pending => Self::Pending,
            SubmissionStatus::Approved => Self::Approved,
            SubmissionStatus::Rejected => Self::Rejected,
        }
    }
}

/// What a submission proposes to do to the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionAction {
    Add,
    Update,
    Remove,
}

impl SubmissionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }
}

/// Category of a traffic sign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignKind {
    Regulatory,
    Warning,
    Informational,
}

/// A voter's judgment on a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteDirection {
    Approve,
    Reject,
}

impl VoteDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    User,
    Staff,
    Admin,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Direction of a coin ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Earn,
    Spend,
}

/// Why a coin ledger entry was written.
///
/// The daily vote-reward cap counts entries tagged [`RewardPurpose::VoteReward`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardPurpose {
    VoteReward,
    ApprovalReward,
    SubmissionCost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_open() {
        assert!(SubmissionStatus::Pending.is_open());
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
    }

    #[test]
    fn sign_status_follows_submission_status() {
        assert_eq!(SignStatus::from(SubmissionStatus::Approved), SignStatus::Approved);
        assert_eq!(SignStatus::from(SubmissionStatus::Rejected), SignStatus::Rejected);
    }
}
