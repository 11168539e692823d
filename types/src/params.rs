//! Resolution parameters: thresholds, windows and reward amounts.
//!
//! Every field has a serde default, so a configuration file only needs to name
//! the values it changes.

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// Tunables for the submission resolution engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionParams {
    // ── Resolution ───────────────────────────────────────────────────────
    /// Votes needed before a submission can resolve ahead of its deadline.
    pub min_votes_required: u32,

    /// Weighted approval ratio at or above which a submission is approved.
    pub approval_threshold: f64,

    /// Weighted approval ratio at or below which a submission is rejected.
    pub rejection_threshold: f64,

    /// Length of the voting window in seconds. Default: 7 days.
    pub review_window_secs: u64,

    // ── Economics ────────────────────────────────────────────────────────
    /// Coins credited to the proposer when a submission is approved.
    pub approval_reward: u64,

    /// Coins credited per rewarded vote.
    pub vote_reward: u64,

    /// Rewarded votes per voter per day. Further votes count but earn nothing.
    pub max_daily_vote_rewards: u32,

    /// Coins debited when a user proposes a change.
    pub submission_cost: u64,

    /// Coins a newly registered user starts with.
    pub starting_balance: u64,

    // ── Reputation ───────────────────────────────────────────────────────
    /// Reputation added to the proposer on approval.
    pub approval_reputation_gain: f64,

    /// Reputation removed from the proposer on rejection.
    pub rejection_reputation_loss: f64,

    /// Proximity score used until location-aware scoring exists.
    pub default_proximity: f64,

    /// Offset from UTC (seconds) that defines "midnight" for the daily reward
    /// cap. `None` uses the host's local timezone.
    pub reward_day_utc_offset_secs: Option<i32>,
}

impl ResolutionParams {
    /// The production configuration.
    pub fn community_defaults() -> Self {
        Self {
            min_votes_required: 5,
            approval_threshold: 0.70,
            rejection_threshold: 0.30,
            review_window_secs: 7 * 24 * 3600, // 1 week

            approval_reward: 10,
            vote_reward: 1,
            max_daily_vote_rewards: 5,
            submission_cost: 5,
            starting_balance: 20,

            approval_reputation_gain: 0.01,
            rejection_reputation_loss: 0.005,
            default_proximity: 0.5,
            reward_day_utc_offset_secs: None,
        }
    }

    /// Check that thresholds and scores are usable.
    pub fn validate(&self) -> Result<(), TypesError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.approval_threshold) {
            return Err(TypesError::InvalidParams(format!(
                "approval_threshold {} outside [0, 1]",
                self.approval_threshold
            )));
        }
        if !unit.contains(&self.rejection_threshold) {
            return Err(TypesError::InvalidParams(format!(
                "rejection_threshold {} outside [0, 1]",
                self.rejection_threshold
            )));
        }
        if self.rejection_threshold >= self.approval_threshold {
            return Err(TypesError::InvalidParams(format!(
                "rejection_threshold {} must be below approval_threshold {}",
                self.rejection_threshold, self.approval_threshold
            )));
        }
        if !unit.contains(&self.default_proximity) {
            return Err(TypesError::InvalidParams(format!(
                "default_proximity {} outside [0, 1]",
                self.default_proximity
            )));
        }
        if self.approval_reputation_gain < 0.0 || self.rejection_reputation_loss < 0.0 {
            return Err(TypesError::InvalidParams(
                "reputation deltas are magnitudes and must not be negative".to_string(),
            ));
        }
        if self.review_window_secs == 0 {
            return Err(TypesError::InvalidParams(
                "review_window_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ResolutionParams {
    fn default() -> Self {
        Self::community_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ResolutionParams::default();
        params.validate().unwrap();
        assert_eq!(params.min_votes_required, 5);
        assert_eq!(params.review_window_secs, 604_800);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let params = ResolutionParams {
            approval_threshold: 0.3,
            rejection_threshold: 0.7,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(TypesError::InvalidParams(_))));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let params = ResolutionParams {
            approval_threshold: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params: ResolutionParams =
            serde_json::from_str(r#"{ "approval_reward": 25 }"#).unwrap();
        assert_eq!(params.approval_reward, 25);
        assert_eq!(params.vote_reward, 1);
        assert_eq!(params.approval_threshold, 0.70);
    }
}
