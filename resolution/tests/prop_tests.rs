use std::sync::Arc;

use proptest::prelude::*;

use tsl_nullables::{NullClock, NullStore};
use tsl_resolution::machine::{evaluate, Decision};
use tsl_resolution::{compute_weight, FixedProximity, ResolutionEngine, Tally, VotingStatus};
use tsl_store::{ReadTxn, Store, WriteTxn};
use tsl_types::{
    Reputation, ResolutionParams, Submission, SubmissionAction, SubmissionId, SubmissionStatus,
    Timestamp, User, UserId, UserRole, Vote, VoteDirection,
};

fn seeded_voter(store: &NullStore, reputation: f64, approved: u32) -> UserId {
    let user = User {
        id: UserId::generate(),
        display_name: "voter".to_string(),
        role: UserRole::User,
        reputation: Reputation::new(reputation),
        coin_balance: 20,
        approved_submissions: approved,
        created_at: Timestamp::new(0),
    };
    store.write(|txn| txn.insert_user(&user)).unwrap();
    user.id
}

fn pending_submission(proposer: UserId) -> Submission {
    Submission {
        id: SubmissionId::generate(),
        proposer,
        action: SubmissionAction::Add,
        sign: None,
        description: None,
        status: SubmissionStatus::Pending,
        approval_percentage: 0.0,
        vote_count: 0,
        deadline: Timestamp::new(1_000_000),
        escalated_at: None,
        resolved_at: None,
        created_at: Timestamp::new(0),
        updated_at: Timestamp::new(0),
    }
}

proptest! {
    /// Weight stays in [0.1, 1.0] for every reputation, proximity and expertise.
    #[test]
    fn weight_is_bounded(
        reputation in -1.0f64..2.0,
        proximity in -1.0f64..2.0,
        approved in 0u32..1_000,
    ) {
        let w = compute_weight(Reputation::new(reputation), proximity, approved);
        prop_assert!((0.1..=1.0).contains(&w));
    }

    /// Weight never decreases as reputation grows.
    #[test]
    fn weight_is_monotonic_in_reputation(
        low in 0.0f64..1.0,
        bump in 0.0f64..1.0,
        approved in 0u32..20,
    ) {
        let a = compute_weight(Reputation::new(low), 0.5, approved);
        let b = compute_weight(Reputation::new(low + bump), 0.5, approved);
        prop_assert!(b >= a);
    }

    /// The tally ratio is in [0, 1] and the percentage is exactly 100 × ratio.
    #[test]
    fn tally_ratio_is_normalised(
        weights in prop::collection::vec((0.1f64..=1.0, any::<bool>()), 0..40),
    ) {
        let votes: Vec<Vote> = weights
            .iter()
            .map(|(weight, up)| Vote {
                submission: SubmissionId::from_bytes([7; 16]),
                voter: UserId::generate(),
                direction: if *up { VoteDirection::Approve } else { VoteDirection::Reject },
                weight: *weight,
                cast_at: Timestamp::new(0),
            })
            .collect();
        let t = Tally::from_votes(&votes);
        prop_assert!((0.0..=1.0).contains(&t.weighted_approval_ratio));
        prop_assert_eq!(t.approval_percentage, t.weighted_approval_ratio * 100.0);
        prop_assert_eq!(t.total_votes as usize, votes.len());
        prop_assert_eq!(t.up_count + t.down_count, t.total_votes);
    }

    /// Nothing resolves early with fewer than the minimum votes.
    #[test]
    fn below_minimum_never_resolves_early(up in 0usize..5, now in 0u64..=1_000_000) {
        let params = ResolutionParams::community_defaults();
        let sub = pending_submission(UserId::generate());
        let votes: Vec<Vote> = (0..up.min(4))
            .map(|_| Vote {
                submission: sub.id,
                voter: UserId::generate(),
                direction: VoteDirection::Approve,
                weight: 1.0,
                cast_at: Timestamp::new(0),
            })
            .collect();
        let d = evaluate(&sub, &Tally::from_votes(&votes), Timestamp::new(now), &params);
        prop_assert_eq!(d, Decision::NoChange);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// After any sequence of votes, a resolved submission's cached percentage
    /// equals the percentage recomputed from the stored votes, and a pending
    /// one has not been resolved behind the tally's back.
    #[test]
    fn cached_percentage_matches_ledger(
        ballots in prop::collection::vec((0.0f64..=1.0, 0u32..15, any::<bool>()), 1..12),
    ) {
        let store = NullStore::new();
        let proposer = seeded_voter(&store, 0.5, 0);
        let sub = pending_submission(proposer);
        store.write(|txn| txn.insert_submission(&sub)).unwrap();

        let voters: Vec<(UserId, bool)> = ballots
            .iter()
            .map(|(rep, approved, up)| (seeded_voter(&store, *rep, *approved), *up))
            .collect();

        let clock = Arc::new(NullClock::new(10));
        let engine = ResolutionEngine::new(store, clock, ResolutionParams::community_defaults())
            .with_proximity(FixedProximity(0.5));

        for (voter, up) in voters {
            let direction = if up { VoteDirection::Approve } else { VoteDirection::Reject };
            // Votes after resolution are refused; that is expected here.
            let _ = engine.cast_vote(&sub.id, &voter, direction);
        }

        let stored = engine
            .store()
            .read(|txn| txn.get_submission(&sub.id))
            .unwrap()
            .unwrap();
        let votes = engine.store().read(|txn| txn.votes_for(&sub.id)).unwrap();
        let fresh = Tally::from_votes(&votes);

        prop_assert_eq!(stored.vote_count as usize, votes.len());
        for vote in &votes {
            prop_assert!((0.1..=1.0).contains(&vote.weight));
        }
        if stored.status.is_terminal() {
            prop_assert!((stored.approval_percentage - fresh.approval_percentage).abs() < 1e-9);
        }
        let result = engine.get_voting_result(&sub.id).unwrap();
        let expected = match stored.status {
            SubmissionStatus::Approved => VotingStatus::Approved,
            SubmissionStatus::Rejected => VotingStatus::Rejected,
            SubmissionStatus::Pending
                if fresh.total_votes >= 5
                    && fresh.weighted_approval_ratio > 0.30
                    && fresh.weighted_approval_ratio < 0.70 =>
            {
                VotingStatus::ReviewNeeded
            }
            SubmissionStatus::Pending => VotingStatus::Pending,
        };
        prop_assert_eq!(result.status, expected);
    }
}
