//! Weighted vote tally, recomputed from the vote ledger on every call.

use serde::Serialize;
use tsl_store::{ReadTxn, StoreError};
use tsl_types::{SubmissionId, Vote, VoteDirection};

/// The weighted tally of a submission's votes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Tally {
    pub total_votes: u32,
    pub up_count: u32,
    pub down_count: u32,
    /// Sum of approve-vote weights.
    pub approve_weight: f64,
    /// Sum of reject-vote weights.
    pub reject_weight: f64,
    /// `approve_weight / (approve_weight + reject_weight)`, or 0 with no votes.
    pub weighted_approval_ratio: f64,
    /// The ratio as a percentage.
    pub approval_percentage: f64,
}

impl Tally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            tally.total_votes += 1;
            match vote.direction {
                VoteDirection::Approve => {
                    tally.up_count += 1;
                    tally.approve_weight += vote.weight;
                }
                VoteDirection::Reject => {
                    tally.down_count += 1;
                    tally.reject_weight += vote.weight;
                }
            }
        }
        let total_weight = tally.approve_weight + tally.reject_weight;
        tally.weighted_approval_ratio = if total_weight > 0.0 {
            tally.approve_weight / total_weight
        } else {
            0.0
        };
        tally.approval_percentage = tally.weighted_approval_ratio * 100.0;
        tally
    }
}

/// Tally every vote stored for `submission`.
pub fn tally<T: ReadTxn + ?Sized>(txn: &T, submission: &SubmissionId) -> Result<Tally, StoreError> {
    let votes = txn.votes_for(submission)?;
    Ok(Tally::from_votes(&votes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsl_types::{Timestamp, UserId};

    fn vote(direction: VoteDirection, weight: f64) -> Vote {
        Vote {
            submission: SubmissionId::from_bytes([1; 16]),
            voter: UserId::generate(),
            direction,
            weight,
            cast_at: Timestamp::new(0),
        }
    }

    #[test]
    fn empty_tally_has_zero_ratio() {
        let t = Tally::from_votes(&[]);
        assert_eq!(t.total_votes, 0);
        assert_eq!(t.weighted_approval_ratio, 0.0);
        assert_eq!(t.approval_percentage, 0.0);
    }

    #[test]
    fn four_up_one_down_is_eighty_percent() {
        let mut votes: Vec<Vote> = (0..4).map(|_| vote(VoteDirection::Approve, 1.0)).collect();
        votes.push(vote(VoteDirection::Reject, 1.0));
        let t = Tally::from_votes(&votes);
        assert_eq!(t.total_votes, 5);
        assert_eq!(t.up_count, 4);
        assert_eq!(t.down_count, 1);
        assert!((t.weighted_approval_ratio - 0.8).abs() < 1e-12);
        assert!((t.approval_percentage - 80.0).abs() < 1e-9);
    }

    #[test]
    fn weights_not_counts_decide_the_ratio() {
        let votes = vec![
            vote(VoteDirection::Approve, 0.1),
            vote(VoteDirection::Approve, 0.1),
            vote(VoteDirection::Reject, 0.8),
        ];
        let t = Tally::from_votes(&votes);
        assert_eq!(t.up_count, 2);
        assert!((t.weighted_approval_ratio - 0.2).abs() < 1e-12);
    }
}
