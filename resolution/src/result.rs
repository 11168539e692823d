//! The voting result reported to callers.

use serde::Serialize;
use std::fmt;
use tsl_types::{ResolutionParams, Submission, SubmissionId, SubmissionStatus};

use crate::Tally;

/// Externally visible voting status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStatus {
    Pending,
    Approved,
    Rejected,
    /// Still pending with an inconclusive tally, or already escalated to admins.
    ReviewNeeded,
}

impl VotingStatus {
    /// Project the persisted status and the current tally.
    ///
    /// A pending submission needs review once it has been escalated, or once it
    /// has the minimum number of votes and its ratio lies strictly between the
    /// rejection and approval thresholds.
    pub fn of(submission: &Submission, tally: &Tally, params: &ResolutionParams) -> Self {
        match submission.status {
            SubmissionStatus::Approved => Self::Approved,
            SubmissionStatus::Rejected => Self::Rejected,
            SubmissionStatus::Pending if submission.is_escalated() => Self::ReviewNeeded,
            SubmissionStatus::Pending if is_inconclusive(tally, params) => Self::ReviewNeeded,
            SubmissionStatus::Pending => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::ReviewNeeded => "review_needed",
        }
    }
}

fn is_inconclusive(tally: &Tally, params: &ResolutionParams) -> bool {
    let ratio = tally.weighted_approval_ratio;
    tally.total_votes >= params.min_votes_required
        && ratio > params.rejection_threshold
        && ratio < params.approval_threshold
}

impl fmt::Display for VotingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current tally and status of one submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VotingResult {
    pub submission: SubmissionId,
    pub total_votes: u32,
    pub upvotes: u32,
    pub downvotes: u32,
    /// Weighted approval ratio in `[0, 1]`.
    pub weighted_score: f64,
    pub approval_percentage: f64,
    pub status: VotingStatus,
}

impl VotingResult {
    pub fn new(submission: &Submission, tally: &Tally, params: &ResolutionParams) -> Self {
        Self {
            submission: submission.id,
            total_votes: tally.total_votes,
            upvotes: tally.up_count,
            downvotes: tally.down_count,
            weighted_score: tally.weighted_approval_ratio,
            approval_percentage: tally.approval_percentage,
            status: VotingStatus::of(submission, tally, params),
        }
    }
}
