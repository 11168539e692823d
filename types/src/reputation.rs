//! Reputation score: a voter's standing in the community, kept in `[0, 1]`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A reputation score in the closed interval `[0, 1]`.
///
/// Construction and delta application clamp into range, so a stored value is
/// always valid no matter how many penalties or rewards were applied.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reputation(f64);

impl Reputation {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);
    /// Starting reputation of a newly registered user.
    pub const DEFAULT: Self = Self(0.5);

    /// Create a reputation, clamping into `[0, 1]`. NaN becomes zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Apply a signed delta and clamp the result.
    pub fn apply_delta(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }
}

impl Default for Reputation {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Reputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}
