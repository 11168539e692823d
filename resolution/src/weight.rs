//! Vote weight calculation.
//!
//! `weight = reputation × 0.4 + proximity × 0.3 + expertise × 0.3`, where
//! `expertise = min(approved_submissions / 10, 1)`, clamped to `[0.1, 1.0]`.
//! Every vote counts at least a little and none counts more than one full vote.

use tsl_store::ReadTxn;
use tsl_types::{Reputation, Submission, User, UserId};

use crate::ResolutionError;

pub const REPUTATION_FACTOR: f64 = 0.4;
pub const PROXIMITY_FACTOR: f64 = 0.3;
pub const EXPERTISE_FACTOR: f64 = 0.3;

/// Approved submissions at which expertise saturates.
pub const EXPERTISE_SATURATION: u32 = 10;

pub const MIN_WEIGHT: f64 = 0.1;
pub const MAX_WEIGHT: f64 = 1.0;

/// Scores how close a voter is to the sign a submission concerns, in `[0, 1]`.
pub trait ProximityScore: Send + Sync {
    fn score(&self, voter: &User, submission: &Submission) -> f64;
}

/// Scores every voter the same. Stands in until location-aware scoring exists.
#[derive(Clone, Copy, Debug)]
pub struct FixedProximity(pub f64);

impl ProximityScore for FixedProximity {
    fn score(&self, _voter: &User, _submission: &Submission) -> f64 {
        self.0
    }
}

/// Expertise from a count of approved submissions, in `[0, 1]`.
pub fn expertise(approved_submissions: u32) -> f64 {
    (approved_submissions as f64 / EXPERTISE_SATURATION as f64).min(1.0)
}

/// Compute a vote weight. Always returns a value in `[MIN_WEIGHT, MAX_WEIGHT]`.
pub fn compute_weight(reputation: Reputation, proximity: f64, approved_submissions: u32) -> f64 {
    let proximity = if proximity.is_nan() {
        0.0
    } else {
        proximity.clamp(0.0, 1.0)
    };
    let raw = reputation.value() * REPUTATION_FACTOR
        + proximity * PROXIMITY_FACTOR
        + expertise(approved_submissions) * EXPERTISE_FACTOR;
    raw.clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Weight of `voter`'s vote on `submission`, read from the voter's current row.
pub fn voter_weight<T: ReadTxn + ?Sized>(
    txn: &T,
    voter: &UserId,
    submission: &Submission,
    proximity: &dyn ProximityScore,
) -> Result<f64, ResolutionError> {
    let user = txn
        .get_user(voter)?
        .ok_or_else(|| ResolutionError::NotFound(format!("voter {voter}")))?;
    let score = proximity.score(&user, submission);
    Ok(compute_weight(user.reputation, score, user.approved_submissions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_applies_to_weakest_voter() {
        let w = compute_weight(Reputation::MIN, 0.0, 0);
        assert_eq!(w, MIN_WEIGHT);
    }

    #[test]
    fn strongest_voter_reaches_cap() {
        // 1.0 × 0.4 + 0.5 × 0.3 + 1.0 × 0.3 = 0.85, below the cap.
        let w = compute_weight(Reputation::MAX, 0.5, 10);
        assert!((w - 0.85).abs() < 1e-12);
        assert_eq!(compute_weight(Reputation::MAX, 1.0, 50), MAX_WEIGHT);
    }

    #[test]
    fn default_user_weight() {
        // 0.5 × 0.4 + 0.5 × 0.3 + 0 = 0.35
        let w = compute_weight(Reputation::DEFAULT, 0.5, 0);
        assert!((w - 0.35).abs() < 1e-12);
    }

    #[test]
    fn expertise_saturates() {
        assert_eq!(expertise(0), 0.0);
        assert_eq!(expertise(5), 0.5);
        assert_eq!(expertise(10), 1.0);
        assert_eq!(expertise(1_000), 1.0);
    }

    #[test]
    fn out_of_range_proximity_is_clamped() {
        assert_eq!(
            compute_weight(Reputation::DEFAULT, 7.0, 0),
            compute_weight(Reputation::DEFAULT, 1.0, 0)
        );
        assert_eq!(compute_weight(Reputation::MIN, f64::NAN, 0), MIN_WEIGHT);
    }
}
