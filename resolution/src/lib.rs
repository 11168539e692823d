//! Submission resolution engine for the traffic sign ledger.
//!
//! A vote flows through the components leaf-first:
//!
//! 1. [`weight`] computes the voter's influence from reputation, proximity and
//!    expertise.
//! 2. [`ledger`] inserts the vote behind the existence, open-state, self-vote
//!    and uniqueness guards.
//! 3. [`aggregator`] recomputes the weighted tally from every stored vote.
//! 4. [`machine`] decides whether the submission resolves or escalates.
//! 5. [`dispatcher`] applies rewards, reputation changes and notifications.
//!
//! [`engine::ResolutionEngine`] runs steps 2–5 inside a single store write
//! transaction, so a transition and its side effects commit together or not at
//! all. The deadline sweep re-enters at step 3 without a new vote.

pub mod aggregator;
pub mod day;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod machine;
pub mod result;
pub mod retry;
pub mod weight;

pub use aggregator::Tally;
pub use engine::{ResolutionEngine, SignDraft, SubmissionDraft, SweepReport};
pub use error::ResolutionError;
pub use machine::{AdminDecision, Decision, Outcome};
pub use result::{VotingResult, VotingStatus};
pub use retry::retry_once;
pub use weight::{compute_weight, FixedProximity, ProximityScore};
