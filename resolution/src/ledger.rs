//! Guarded vote insert.
//!
//! Preconditions are checked in a fixed order, each with its own error:
//! missing submission, closed voting, self-vote, duplicate vote. The duplicate
//! check is the store's unique `(submission, voter)` key, so it holds even
//! when two workers race to insert the same pair.

use tsl_store::{StoreError, WriteTxn};
use tsl_types::{Submission, SubmissionId, Timestamp, UserId, Vote, VoteDirection};

use crate::weight::{voter_weight, ProximityScore};
use crate::ResolutionError;

/// Insert a vote and bump the submission's cached vote count.
///
/// Returns the submission as it stood before the vote, and the stored vote.
pub fn record_vote(
    txn: &mut dyn WriteTxn,
    submission_id: &SubmissionId,
    voter: &UserId,
    direction: VoteDirection,
    proximity: &dyn ProximityScore,
    now: Timestamp,
) -> Result<(Submission, Vote), ResolutionError> {
    let submission = txn
        .get_submission(submission_id)?
        .ok_or_else(|| ResolutionError::NotFound(format!("submission {submission_id}")))?;

    if !submission.status.is_open() {
        return Err(ResolutionError::InvalidState(format!(
            "voting closed: submission {} is {}",
            submission.id, submission.status
        )));
    }

    if submission.proposer == *voter {
        return Err(ResolutionError::InvalidOperation(
            "cannot vote on your own submission".to_string(),
        ));
    }

    let weight = voter_weight(&*txn, voter, &submission, proximity)?;
    let vote = Vote {
        submission: submission.id,
        voter: *voter,
        direction,
        weight,
        cast_at: now,
    };

    match txn.insert_vote(&vote) {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ResolutionError::Conflict(format!(
                "duplicate vote: {voter} already voted on {}",
                submission.id
            )));
        }
        Err(e) => return Err(e.into()),
    }
    txn.increment_vote_count(&submission.id, now)?;

    Ok((submission, vote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsl_nullables::NullStore;
    use tsl_store::{ReadTxn, Store};
    use tsl_types::{Reputation, SubmissionAction, SubmissionStatus, User, UserRole};

    use crate::FixedProximity;

    fn user() -> User {
        User {
            id: UserId::generate(),
            display_name: "u".to_string(),
            role: UserRole::User,
            reputation: Reputation::DEFAULT,
            coin_balance: 20,
            approved_submissions: 0,
            created_at: Timestamp::new(0),
        }
    }

    fn seeded() -> (NullStore, User, User, Submission) {
        let store = NullStore::new();
        let proposer = user();
        let voter = user();
        let submission = Submission {
            id: SubmissionId::generate(),
            proposer: proposer.id,
            action: SubmissionAction::Add,
            sign: None,
            description: None,
            status: SubmissionStatus::Pending,
            approval_percentage: 0.0,
            vote_count: 0,
            deadline: Timestamp::new(1_000),
            escalated_at: None,
            resolved_at: None,
            created_at: Timestamp::new(0),
            updated_at: Timestamp::new(0),
        };
        store
            .write(|txn| {
                txn.insert_user(&proposer)?;
                txn.insert_user(&voter)?;
                txn.insert_submission(&submission)
            })
            .unwrap();
        (store, proposer, voter, submission)
    }

    fn cast(
        store: &NullStore,
        submission: &SubmissionId,
        voter: &UserId,
    ) -> Result<(Submission, Vote), ResolutionError> {
        store.write(|txn| {
            record_vote(
                txn,
                submission,
                voter,
                VoteDirection::Approve,
                &FixedProximity(0.5),
                Timestamp::new(10),
            )
        })
    }

    #[test]
    fn records_vote_with_weight_and_count() {
        let (store, _, voter, sub) = seeded();
        let (_, vote) = cast(&store, &sub.id, &voter.id).unwrap();
        assert!((vote.weight - 0.35).abs() < 1e-12);
        let row = store.read(|txn| txn.get_submission(&sub.id)).unwrap().unwrap();
        assert_eq!(row.vote_count, 1);
    }

    #[test]
    fn missing_submission_is_not_found() {
        let (store, _, voter, _) = seeded();
        let err = cast(&store, &SubmissionId::generate(), &voter.id).unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound(_)));
    }

    #[test]
    fn missing_voter_is_not_found() {
        let (store, _, _, sub) = seeded();
        let err = cast(&store, &sub.id, &UserId::generate()).unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound(_)));
        assert_eq!(store.vote_row_count(), 0);
    }

    #[test]
    fn self_vote_is_invalid_operation() {
        let (store, proposer, _, sub) = seeded();
        let err = cast(&store, &sub.id, &proposer.id).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidOperation(_)));
    }

    #[test]
    fn second_vote_is_conflict_and_leaves_count() {
        let (store, _, voter, sub) = seeded();
        cast(&store, &sub.id, &voter.id).unwrap();
        let err = cast(&store, &sub.id, &voter.id).unwrap_err();
        assert!(matches!(err, ResolutionError::Conflict(_)));
        let row = store.read(|txn| txn.get_submission(&sub.id)).unwrap().unwrap();
        assert_eq!(row.vote_count, 1);
        assert_eq!(store.vote_row_count(), 1);
    }

    #[test]
    fn closed_submission_is_checked_before_self_vote() {
        let (store, proposer, _, sub) = seeded();
        store
            .write(|txn| {
                txn.resolve_if_pending(&sub.id, SubmissionStatus::Approved, 100.0, Timestamp::new(5))
            })
            .unwrap();
        let err = cast(&store, &sub.id, &proposer.id).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidState(_)));
    }
}
