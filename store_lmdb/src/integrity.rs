//! LMDB database integrity checks.
//!
//! Run on startup (and by `tsl check`) to detect corruption early, before the
//! sweeper starts resolving submissions.

use std::collections::HashMap;
use std::path::Path;

use tsl_store::keys::deadline_key;
use tsl_types::{Submission, SubmissionId, Vote};

use crate::codec::decode;
use crate::environment::{LmdbEnvironment, DATABASE_NAMES};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check LMDB database integrity.
///
/// Counts the entries of every database, then cross-checks the submission
/// table against the vote table and the pending deadline index. Read failures
/// and mismatches are recorded in the report rather than causing a hard error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for &db_name in DATABASE_NAMES {
        match env
            .env()
            .open_database::<heed::types::Bytes, heed::types::Bytes>(&rtxn, Some(db_name))
        {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{}': {}", db_name, e)),
                }
            }
            Ok(None) => report
                .errors
                .push(format!("database '{}' is missing", db_name)),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{}': {}", db_name, e)),
        }
    }

    let mut votes_per_submission: HashMap<SubmissionId, u32> = HashMap::new();
    for entry in env.votes_db.iter(&rtxn)? {
        let (key, value) = entry?;
        match decode::<Vote>(value) {
            Ok(vote) => *votes_per_submission.entry(vote.submission).or_default() += 1,
            Err(e) => report
                .errors
                .push(format!("undecodable vote at key {}: {}", hex_prefix(key), e)),
        }
    }

    let mut pending = 0u64;
    for entry in env.submissions_db.iter(&rtxn)? {
        let (key, value) = entry?;
        let submission: Submission = match decode(value) {
            Ok(s) => s,
            Err(e) => {
                report
                    .errors
                    .push(format!("undecodable submission at key {}: {}", hex_prefix(key), e));
                continue;
            }
        };
        let votes = votes_per_submission.get(&submission.id).copied().unwrap_or(0);
        if votes != submission.vote_count {
            report.errors.push(format!(
                "submission {} caches {} votes but has {}",
                submission.id, submission.vote_count, votes
            ));
        }
        let indexed = env
            .pending_db
            .get(&rtxn, &deadline_key(submission.deadline, &submission.id))?
            .is_some();
        if submission.status.is_open() {
            pending += 1;
            if !indexed {
                report
                    .errors
                    .push(format!("pending submission {} is not indexed", submission.id));
            }
        } else if indexed {
            report.errors.push(format!(
                "{} submission {} is still in the pending index",
                submission.status, submission.id
            ));
        }
    }

    let index_len = env.pending_db.len(&rtxn)?;
    if index_len != pending {
        report.errors.push(format!(
            "pending index has {} entries for {} pending submissions",
            index_len, pending
        ));
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

fn hex_prefix(key: &[u8]) -> String {
    key.iter().take(8).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_data_dir_fresh_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(&dir.path().join("never-created")).is_ok());
    }

    #[test]
    fn check_data_dir_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_data_dir(dir.path()).is_err());
    }

    #[test]
    fn empty_environment_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 10 * 1024 * 1024).unwrap();
        let report = check_integrity(&env).unwrap();
        assert!(report.is_healthy(), "{:?}", report.errors);
        assert_eq!(report.databases_checked, DATABASE_NAMES.len() as u32);
    }

    #[test]
    fn unhealthy_report() {
        let report = IntegrityReport {
            databases_checked: 5,
            total_entries: 100,
            errors: vec!["corruption detected".to_string()],
        };
        assert!(!report.is_healthy());
    }
}
