//! Fundamental types for the traffic sign ledger.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! identifiers, timestamps, reputation scores, lifecycle enums, the persisted
//! records, and the tunable resolution parameters.

pub mod error;
pub mod id;
pub mod params;
pub mod record;
pub mod reputation;
pub mod state;
pub mod time;

pub use error::TypesError;
pub use id::{SignId, SubmissionId, UserId};
pub use params::ResolutionParams;
pub use record::{CoinTransaction, Notification, Sign, Submission, User, Vote};
pub use reputation::Reputation;
pub use state::{
    RewardPurpose, SignKind, SignStatus, SubmissionAction, SubmissionStatus, TransactionKind,
    UserRole, VoteDirection,
};
pub use time::{Clock, SystemClock, Timestamp};
