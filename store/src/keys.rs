//! Composite key encodings shared by ordered key-value backends.
//!
//! Keys are fixed-width byte strings built from id bytes and big-endian
//! integers, so lexicographic key order matches the logical order and a
//! prefix scan selects exactly one owner's rows.

use tsl_types::{SubmissionId, Timestamp, UserId};

/// `submission ‖ voter`. The unique key of the vote table.
pub fn vote_key(submission: &SubmissionId, voter: &UserId) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(submission.as_bytes());
    key[16..].copy_from_slice(voter.as_bytes());
    key
}

/// Prefix selecting every vote on `submission`.
pub fn vote_prefix(submission: &SubmissionId) -> [u8; 16] {
    *submission.as_bytes()
}

/// `deadline ‖ submission`. Orders the pending index by deadline.
pub fn deadline_key(deadline: Timestamp, submission: &SubmissionId) -> [u8; 24] {
    let mut key = [0u8; 24];
    key[..8].copy_from_slice(&deadline.to_be_bytes());
    key[8..].copy_from_slice(submission.as_bytes());
    key
}

/// Split a [`deadline_key`] back into its parts.
pub fn split_deadline_key(key: &[u8]) -> Option<(Timestamp, [u8; 16])> {
    if key.len() != 24 {
        return None;
    }
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&key[..8]);
    let mut id = [0u8; 16];
    id.copy_from_slice(&key[8..]);
    Some((Timestamp::from_be_bytes(ts), id))
}

/// `user ‖ created_at ‖ seq`. Keys per-user append-only logs in write order.
pub fn user_log_key(user: &UserId, created_at: Timestamp, seq: u64) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(user.as_bytes());
    key[16..24].copy_from_slice(&created_at.to_be_bytes());
    key[24..].copy_from_slice(&seq.to_be_bytes());
    key
}

/// Inclusive key bounds of `user`'s log entries created at or after `since`.
pub fn user_log_range(user: &UserId, since: Timestamp) -> ([u8; 32], [u8; 32]) {
    (
        user_log_key(user, since, 0),
        user_log_key(user, Timestamp::new(u64::MAX), u64::MAX),
    )
}

/// Prefix selecting one user's log entries.
pub fn user_prefix(user: &UserId) -> [u8; 16] {
    *user.as_bytes()
}
