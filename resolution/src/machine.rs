//! Resolution state machine.
//!
//! ```text
//!   pending ──(ratio ≥ approval threshold)──▶ approved
//!      │
//!      ├────(ratio ≤ rejection threshold)──▶ rejected
//!      │
//!      └──(deadline passed, inconclusive)──▶ pending + escalated (once)
//! ```
//!
//! Nothing resolves ahead of the deadline until the minimum vote count is
//! reached. Threshold boundaries are inclusive.

use tsl_types::{ResolutionParams, Submission, Timestamp};

use crate::Tally;

/// What the state machine wants to happen to a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    NoChange,
    Approve,
    Reject,
    /// Stay pending and ask admins for a manual decision.
    Escalate,
}

/// What a write transaction actually did after applying a [`Decision`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Approved,
    Rejected,
    Escalated,
}

impl Outcome {
    /// Whether the submission left the pending state.
    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// A manual verdict given by an admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminDecision {
    Approve,
    Reject,
}

impl From<AdminDecision> for Decision {
    fn from(d: AdminDecision) -> Self {
        match d {
            AdminDecision::Approve => Decision::Approve,
            AdminDecision::Reject => Decision::Reject,
        }
    }
}

/// Decide the next step for `submission` given its current tally.
pub fn evaluate(
    submission: &Submission,
    tally: &Tally,
    now: Timestamp,
    params: &ResolutionParams,
) -> Decision {
    if !submission.status.is_open() {
        return Decision::NoChange;
    }
    let deadline_passed = submission.deadline.has_passed(now);
    if tally.total_votes < params.min_votes_required && !deadline_passed {
        return Decision::NoChange;
    }

    let ratio = tally.weighted_approval_ratio;
    if ratio >= params.approval_threshold {
        Decision::Approve
    } else if ratio <= params.rejection_threshold {
        Decision::Reject
    } else if deadline_passed && !submission.is_escalated() {
        Decision::Escalate
    } else {
        Decision::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsl_types::{
        SubmissionAction, SubmissionId, SubmissionStatus, UserId, Vote, VoteDirection,
    };

    const DEADLINE: u64 = 1_000;

    fn pending() -> Submission {
        Submission {
            id: SubmissionId::generate(),
            proposer: UserId::generate(),
            action: SubmissionAction::Add,
            sign: None,
            description: None,
            status: SubmissionStatus::Pending,
            approval_percentage: 0.0,
            vote_count: 0,
            deadline: Timestamp::new(DEADLINE),
            escalated_at: None,
            resolved_at: None,
            created_at: Timestamp::new(0),
            updated_at: Timestamp::new(0),
        }
    }

    fn tally_of(up: usize, down: usize) -> Tally {
        let mk = |direction| Vote {
            submission: SubmissionId::from_bytes([0; 16]),
            voter: UserId::generate(),
            direction,
            weight: 1.0,
            cast_at: Timestamp::new(0),
        };
        let mut votes: Vec<Vote> = (0..up).map(|_| mk(VoteDirection::Approve)).collect();
        votes.extend((0..down).map(|_| mk(VoteDirection::Reject)));
        Tally::from_votes(&votes)
    }

    fn params() -> ResolutionParams {
        ResolutionParams::community_defaults()
    }

    #[test]
    fn too_few_votes_before_deadline_waits() {
        let d = evaluate(&pending(), &tally_of(4, 0), Timestamp::new(10), &params());
        assert_eq!(d, Decision::NoChange);
    }

    #[test]
    fn deadline_itself_is_not_past() {
        let d = evaluate(&pending(), &tally_of(1, 0), Timestamp::new(DEADLINE), &params());
        assert_eq!(d, Decision::NoChange);
    }

    #[test]
    fn clear_majority_approves() {
        let d = evaluate(&pending(), &tally_of(4, 1), Timestamp::new(10), &params());
        assert_eq!(d, Decision::Approve);
    }

    #[test]
    fn clear_minority_rejects() {
        let d = evaluate(&pending(), &tally_of(0, 5), Timestamp::new(10), &params());
        assert_eq!(d, Decision::Reject);
    }

    #[test]
    fn thresholds_are_inclusive() {
        // 7 of 10 = 0.70 exactly, 3 of 10 = 0.30 exactly.
        let approve = evaluate(&pending(), &tally_of(7, 3), Timestamp::new(10), &params());
        let reject = evaluate(&pending(), &tally_of(3, 7), Timestamp::new(10), &params());
        assert_eq!(approve, Decision::Approve);
        assert_eq!(reject, Decision::Reject);
    }

    #[test]
    fn inconclusive_before_deadline_waits() {
        let d = evaluate(&pending(), &tally_of(3, 3), Timestamp::new(10), &params());
        assert_eq!(d, Decision::NoChange);
    }

    #[test]
    fn inconclusive_after_deadline_escalates_once() {
        let mut sub = pending();
        let after = Timestamp::new(DEADLINE + 1);
        assert_eq!(evaluate(&sub, &tally_of(3, 3), after, &params()), Decision::Escalate);
        sub.escalated_at = Some(after);
        assert_eq!(evaluate(&sub, &tally_of(3, 3), after, &params()), Decision::NoChange);
    }

    #[test]
    fn few_votes_after_deadline_still_resolve() {
        let d = evaluate(&pending(), &tally_of(2, 0), Timestamp::new(DEADLINE + 1), &params());
        assert_eq!(d, Decision::Approve);
        let d = evaluate(&pending(), &tally_of(0, 0), Timestamp::new(DEADLINE + 1), &params());
        assert_eq!(d, Decision::Reject);
    }

    #[test]
    fn resolved_submission_never_changes() {
        let mut sub = pending();
        sub.status = SubmissionStatus::Rejected;
        let d = evaluate(&sub, &tally_of(10, 0), Timestamp::new(DEADLINE + 1), &params());
        assert_eq!(d, Decision::NoChange);
    }
}
