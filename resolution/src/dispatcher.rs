//! Side effects of resolution and voting.
//!
//! Every function here runs inside the caller's write transaction. The
//! transition functions only apply effects after winning the pending-guarded
//! status write, so two transactions that both decide to approve produce one
//! set of rewards.

use tsl_store::{StoreError, WriteTxn};
use tsl_types::{
    CoinTransaction, Notification, ResolutionParams, RewardPurpose, SignStatus, Submission,
    SubmissionStatus, Timestamp, TransactionKind, UserId,
};

use crate::day::start_of_day;
use crate::machine::{Decision, Outcome};
use crate::Tally;

/// Apply `decision` to `submission`, returning what actually happened.
pub fn apply(
    txn: &mut dyn WriteTxn,
    submission: &Submission,
    decision: Decision,
    tally: &Tally,
    params: &ResolutionParams,
    now: Timestamp,
) -> Result<Outcome, StoreError> {
    match decision {
        Decision::NoChange => Ok(Outcome::Unchanged),
        Decision::Approve => {
            let won = txn.resolve_if_pending(
                &submission.id,
                SubmissionStatus::Approved,
                tally.approval_percentage,
                now,
            )?;
            if !won {
                return Ok(Outcome::Unchanged);
            }
            on_approved(txn, submission, params, now)?;
            Ok(Outcome::Approved)
        }
        Decision::Reject => {
            let won = txn.resolve_if_pending(
                &submission.id,
                SubmissionStatus::Rejected,
                tally.approval_percentage,
                now,
            )?;
            if !won {
                return Ok(Outcome::Unchanged);
            }
            on_rejected(txn, submission, params, now)?;
            Ok(Outcome::Rejected)
        }
        Decision::Escalate => {
            if !txn.mark_escalated(&submission.id, now)? {
                return Ok(Outcome::Unchanged);
            }
            notify_admins(txn, submission, tally, now)?;
            Ok(Outcome::Escalated)
        }
    }
}

fn on_approved(
    txn: &mut dyn WriteTxn,
    submission: &Submission,
    params: &ResolutionParams,
    now: Timestamp,
) -> Result<(), StoreError> {
    let proposer = submission.proposer;
    if let Some(sign) = submission.sign {
        txn.set_sign_status(&sign, SignStatus::Approved, Some(now), now)?;
    }
    if params.approval_reward > 0 {
        txn.adjust_coin_balance(&proposer, to_delta(params.approval_reward))?;
        txn.append_transaction(&CoinTransaction {
            user: proposer,
            amount: to_delta(params.approval_reward),
            kind: TransactionKind::Earn,
            purpose: RewardPurpose::ApprovalReward,
            reason: "Submission approved by community".to_string(),
            reference: Some(submission.id.to_string()),
            created_at: now,
        })?;
    }
    txn.adjust_reputation(&proposer, params.approval_reputation_gain)?;
    txn.increment_approved_submissions(&proposer)?;
    txn.append_notification(&Notification {
        user: proposer,
        title: "Submission approved".to_string(),
        message: format!(
            "Your traffic sign submission has been approved. You earned {} coins.",
            params.approval_reward
        ),
        is_read: false,
        created_at: now,
    })
}

fn on_rejected(
    txn: &mut dyn WriteTxn,
    submission: &Submission,
    params: &ResolutionParams,
    now: Timestamp,
) -> Result<(), StoreError> {
    let proposer = submission.proposer;
    if let Some(sign) = submission.sign {
        txn.set_sign_status(&sign, SignStatus::Rejected, None, now)?;
    }
    txn.adjust_reputation(&proposer, -params.rejection_reputation_loss)?;
    txn.append_notification(&Notification {
        user: proposer,
        title: "Submission rejected".to_string(),
        message: "Your traffic sign submission was rejected by the community. \
                  Please check accuracy in future submissions."
            .to_string(),
        is_read: false,
        created_at: now,
    })
}

/// Send one review request to every admin. Returns the number notified.
fn notify_admins(
    txn: &mut dyn WriteTxn,
    submission: &Submission,
    tally: &Tally,
    now: Timestamp,
) -> Result<u32, StoreError> {
    let admins = txn.admins()?;
    for admin in &admins {
        txn.append_notification(&Notification {
            user: *admin,
            title: "Submission needs review".to_string(),
            message: format!(
                "Submission {} requires admin review. Approval score: {:.1}%",
                submission.id, tally.approval_percentage
            ),
            is_read: false,
            created_at: now,
        })?;
    }
    Ok(admins.len() as u32)
}

/// Credit the per-vote reward unless `voter` already hit today's cap.
///
/// Returns whether a reward was credited. Reaching the cap is not an error.
pub fn reward_vote(
    txn: &mut dyn WriteTxn,
    voter: &UserId,
    submission: &Submission,
    params: &ResolutionParams,
    now: Timestamp,
) -> Result<bool, StoreError> {
    if params.vote_reward == 0 {
        return Ok(false);
    }
    let since = start_of_day(now, params.reward_day_utc_offset_secs);
    let rewarded_today = txn.count_entries_since(voter, RewardPurpose::VoteReward, since)?;
    if rewarded_today >= params.max_daily_vote_rewards {
        return Ok(false);
    }
    txn.adjust_coin_balance(voter, to_delta(params.vote_reward))?;
    txn.append_transaction(&CoinTransaction {
        user: *voter,
        amount: to_delta(params.vote_reward),
        kind: TransactionKind::Earn,
        purpose: RewardPurpose::VoteReward,
        reason: "Voting on submission".to_string(),
        reference: Some(submission.id.to_string()),
        created_at: now,
    })?;
    Ok(true)
}

/// Coin amounts are configured as `u64` but applied as signed deltas.
pub(crate) fn to_delta(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}
