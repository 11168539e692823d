//! The resolution engine: the operations exposed to request handlers and the
//! deadline scheduler.
//!
//! Each operation is one store transaction. Vote casting and resolution share
//! the transaction, so the guarded status write and its side effects are
//! committed together, and a failed transaction leaves nothing behind.

use tracing::{debug, info, info_span, warn};

use tsl_store::{ReadTxn, Store, WriteTxn};
use tsl_types::{
    Clock, CoinTransaction, Notification, Reputation, ResolutionParams, RewardPurpose, Sign,
    SignId, SignKind, SignStatus, Submission, SubmissionAction, SubmissionId, SubmissionStatus,
    Timestamp, TransactionKind, User, UserId, UserRole, VoteDirection,
};

use crate::aggregator::tally;
use crate::dispatcher::{self, to_delta};
use crate::ledger::record_vote;
use crate::machine::{evaluate, AdminDecision, Decision, Outcome};
use crate::retry::retry_once;
use crate::weight::{FixedProximity, ProximityScore};
use crate::{ResolutionError, VotingResult};

/// A new sign proposed by an `add` submission.
#[derive(Clone, Debug)]
pub struct SignDraft {
    pub kind: SignKind,
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A proposed change to the dataset.
#[derive(Clone, Debug)]
pub struct SubmissionDraft {
    pub action: SubmissionAction,
    /// The sign to create. Required for `add`.
    pub sign: Option<SignDraft>,
    /// The existing sign to change. Required for `update` and `remove`.
    pub target: Option<SignId>,
    pub description: Option<String>,
}

/// Result of one deadline sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending submissions past their deadline at the start of the sweep.
    pub examined: usize,
    pub approved: usize,
    pub rejected: usize,
    pub escalated: usize,
    /// Submissions whose transaction failed twice. They are picked up again
    /// by the next sweep.
    pub failed: usize,
}

impl SweepReport {
    /// Number of submissions that left the pending state.
    pub fn transitioned(&self) -> usize {
        self.approved + self.rejected
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Approved => self.approved += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Escalated => self.escalated += 1,
            Outcome::Unchanged => {}
        }
    }
}

/// Resolves submissions against a [`Store`], reading time from a [`Clock`].
pub struct ResolutionEngine<S, C> {
    store: S,
    clock: C,
    params: ResolutionParams,
    proximity: Box<dyn ProximityScore>,
}

impl<S: Store, C: Clock> ResolutionEngine<S, C> {
    /// Create an engine scoring proximity with `params.default_proximity`.
    pub fn new(store: S, clock: C, params: ResolutionParams) -> Self {
        let proximity = Box::new(FixedProximity(params.default_proximity));
        Self {
            store,
            clock,
            params,
            proximity,
        }
    }

    /// Replace the proximity strategy.
    pub fn with_proximity(mut self, proximity: impl ProximityScore + 'static) -> Self {
        self.proximity = Box::new(proximity);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn params(&self) -> &ResolutionParams {
        &self.params
    }

    // ── Voting ───────────────────────────────────────────────────────────

    /// Cast a vote and resolve the submission if the vote settles it.
    pub fn cast_vote(
        &self,
        submission: &SubmissionId,
        voter: &UserId,
        direction: VoteDirection,
    ) -> Result<VotingResult, ResolutionError> {
        let span = info_span!("cast_vote", %submission, %voter);
        let _enter = span.enter();
        let now = self.clock.now();

        let (result, outcome, rewarded) = self.store.write(|txn| {
            let (before, vote) = record_vote(
                txn,
                submission,
                voter,
                direction,
                self.proximity.as_ref(),
                now,
            )?;
            debug!(direction = %vote.direction, weight = vote.weight, "vote recorded");
            let rewarded = dispatcher::reward_vote(txn, voter, &before, &self.params, now)?;
            let outcome = self.resolve_in(txn, &before.id, now)?;
            let result = self.result_in(&*txn, &before.id)?;
            Ok::<_, ResolutionError>((result, outcome, rewarded))
        })?;

        debug!(
            total_votes = result.total_votes,
            approval_percentage = result.approval_percentage,
            rewarded,
            ?outcome,
            "vote committed"
        );
        Ok(result)
    }

    /// Current tally and status of a submission.
    pub fn get_voting_result(
        &self,
        submission: &SubmissionId,
    ) -> Result<VotingResult, ResolutionError> {
        self.store.read(|txn| self.result_in(txn, submission))
    }

    /// Resolve or escalate every pending submission whose deadline has passed.
    ///
    /// Returns the number of submissions that left the pending state.
    pub fn sweep_deadlines(&self) -> Result<usize, ResolutionError> {
        Ok(self.sweep()?.transitioned())
    }

    /// Run a deadline sweep and report what it did.
    ///
    /// Each submission is evaluated in its own transaction and retried once on
    /// a transient failure. A submission that still fails is logged and left
    /// for the next sweep.
    pub fn sweep(&self) -> Result<SweepReport, ResolutionError> {
        let span = info_span!("sweep_deadlines");
        let _enter = span.enter();
        let now = self.clock.now();

        let due = self.store.read(|txn| {
            txn.pending_past_deadline(now)
                .map_err(ResolutionError::from)
        })?;
        let mut report = SweepReport {
            examined: due.len(),
            ..SweepReport::default()
        };

        for id in &due {
            let attempt = retry_once(|| self.store.write(|txn| self.resolve_in(txn, id, now)));
            match attempt {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(submission = %id, error = %e, "deadline evaluation failed");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                approved = report.approved,
                rejected = report.rejected,
                escalated = report.escalated,
                failed = report.failed,
                "deadline sweep finished"
            );
        }
        Ok(report)
    }

    // ── Proposals and manual review ──────────────────────────────────────

    /// Propose a change, paying the submission cost.
    pub fn propose(
        &self,
        proposer: &UserId,
        draft: SubmissionDraft,
    ) -> Result<Submission, ResolutionError> {
        let span = info_span!("propose", %proposer, action = draft.action.as_str());
        let _enter = span.enter();
        let now = self.clock.now();
        let cost = self.params.submission_cost;

        let submission = self.store.write(|txn| {
            let user = txn
                .get_user(proposer)?
                .ok_or_else(|| ResolutionError::NotFound(format!("user {proposer}")))?;
            if user.coin_balance < cost {
                return Err(ResolutionError::InsufficientCoins {
                    required: cost,
                    available: user.coin_balance,
                });
            }

            let sign = match draft.action {
                SubmissionAction::Add => {
                    let new_sign = draft.sign.as_ref().ok_or_else(|| {
                        ResolutionError::InvalidOperation(
                            "an add submission must describe the new sign".to_string(),
                        )
                    })?;
                    let sign = Sign {
                        id: SignId::generate(),
                        kind: new_sign.kind,
                        label: new_sign.label.clone(),
                        latitude: new_sign.latitude,
                        longitude: new_sign.longitude,
                        status: SignStatus::Pending,
                        submitted_by: Some(*proposer),
                        approved_at: None,
                        created_at: now,
                        updated_at: now,
                    };
                    txn.insert_sign(&sign)?;
                    sign.id
                }
                SubmissionAction::Update | SubmissionAction::Remove => {
                    let target = draft.target.ok_or_else(|| {
                        ResolutionError::InvalidOperation(format!(
                            "an {} submission must name its target sign",
                            draft.action.as_str()
                        ))
                    })?;
                    if txn.get_sign(&target)?.is_none() {
                        return Err(ResolutionError::NotFound(format!("sign {target}")));
                    }
                    target
                }
            };

            let submission = Submission {
                id: SubmissionId::generate(),
                proposer: *proposer,
                action: draft.action,
                sign: Some(sign),
                description: draft.description.clone(),
                status: SubmissionStatus::Pending,
                approval_percentage: 0.0,
                vote_count: 0,
                deadline: now.plus_secs(self.params.review_window_secs),
                escalated_at: None,
                resolved_at: None,
                created_at: now,
                updated_at: now,
            };
            txn.insert_submission(&submission)?;

            if cost > 0 {
                txn.adjust_coin_balance(proposer, -to_delta(cost))?;
                txn.append_transaction(&CoinTransaction {
                    user: *proposer,
                    amount: -to_delta(cost),
                    kind: TransactionKind::Spend,
                    purpose: RewardPurpose::SubmissionCost,
                    reason: format!("Submission ({})", draft.action.as_str()),
                    reference: Some(submission.id.to_string()),
                    created_at: now,
                })?;
            }
            Ok::<_, ResolutionError>(submission)
        })?;

        info!(submission = %submission.id, deadline = %submission.deadline, "submission created");
        Ok(submission)
    }

    /// Resolve a pending submission by hand.
    pub fn admin_resolve(
        &self,
        submission: &SubmissionId,
        admin: &UserId,
        decision: AdminDecision,
    ) -> Result<VotingResult, ResolutionError> {
        let span = info_span!("admin_resolve", %submission, %admin, ?decision);
        let _enter = span.enter();
        let now = self.clock.now();

        let (result, outcome) = self.store.write(|txn| {
            let user = txn
                .get_user(admin)?
                .ok_or_else(|| ResolutionError::NotFound(format!("user {admin}")))?;
            if !user.role.is_admin() {
                return Err(ResolutionError::InvalidOperation(format!(
                    "user {admin} is not an admin"
                )));
            }
            let current = txn
                .get_submission(submission)?
                .ok_or_else(|| ResolutionError::NotFound(format!("submission {submission}")))?;
            if !current.status.is_open() {
                return Err(ResolutionError::InvalidState(format!(
                    "submission {} is already {}",
                    current.id, current.status
                )));
            }
            let counted = tally(&*txn, submission)?;
            let outcome = dispatcher::apply(
                txn,
                &current,
                Decision::from(decision),
                &counted,
                &self.params,
                now,
            )?;
            let result = self.result_in(&*txn, submission)?;
            Ok::<_, ResolutionError>((result, outcome))
        })?;

        info!(?outcome, status = %result.status, "submission resolved by admin");
        Ok(result)
    }

    // ── Users ────────────────────────────────────────────────────────────

    /// Create a user with default reputation and the starting balance.
    pub fn register_user(
        &self,
        display_name: &str,
        role: UserRole,
    ) -> Result<User, ResolutionError> {
        let user = User {
            id: UserId::generate(),
            display_name: display_name.to_string(),
            role,
            reputation: Reputation::DEFAULT,
            coin_balance: self.params.starting_balance,
            approved_submissions: 0,
            created_at: self.clock.now(),
        };
        self.store.write(|txn| {
            txn.insert_user(&user)?;
            Ok::<_, ResolutionError>(())
        })?;
        info!(user = %user.id, ?role, "user registered");
        Ok(user)
    }

    pub fn user(&self, id: &UserId) -> Result<User, ResolutionError> {
        self.store.read(|txn| {
            txn.get_user(id)?
                .ok_or_else(|| ResolutionError::NotFound(format!("user {id}")))
        })
    }

    pub fn submission(&self, id: &SubmissionId) -> Result<Submission, ResolutionError> {
        self.store.read(|txn| {
            txn.get_submission(id)?
                .ok_or_else(|| ResolutionError::NotFound(format!("submission {id}")))
        })
    }

    pub fn sign(&self, id: &SignId) -> Result<Sign, ResolutionError> {
        self.store.read(|txn| {
            txn.get_sign(id)?
                .ok_or_else(|| ResolutionError::NotFound(format!("sign {id}")))
        })
    }

    pub fn notifications(&self, user: &UserId) -> Result<Vec<Notification>, ResolutionError> {
        self.store
            .read(|txn| txn.notifications_for(user).map_err(ResolutionError::from))
    }

    pub fn transactions(&self, user: &UserId) -> Result<Vec<CoinTransaction>, ResolutionError> {
        self.store
            .read(|txn| txn.transactions_for(user).map_err(ResolutionError::from))
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Evaluate one submission inside `txn` and apply the decision.
    fn resolve_in(
        &self,
        txn: &mut dyn WriteTxn,
        id: &SubmissionId,
        now: Timestamp,
    ) -> Result<Outcome, ResolutionError> {
        let current = txn
            .get_submission(id)?
            .ok_or_else(|| ResolutionError::NotFound(format!("submission {id}")))?;
        let counted = tally(&*txn, id)?;
        let decision = evaluate(&current, &counted, now, &self.params);
        if decision == Decision::NoChange {
            debug!(submission = %id, total_votes = counted.total_votes, "no transition");
            return Ok(Outcome::Unchanged);
        }

        let outcome = dispatcher::apply(txn, &current, decision, &counted, &self.params, now)?;
        match outcome {
            Outcome::Approved | Outcome::Rejected => info!(
                submission = %id,
                ?outcome,
                approval_percentage = counted.approval_percentage,
                total_votes = counted.total_votes,
                "submission resolved"
            ),
            Outcome::Escalated => info!(
                submission = %id,
                approval_percentage = counted.approval_percentage,
                "submission escalated for admin review"
            ),
            Outcome::Unchanged => debug!(submission = %id, "lost resolution race"),
        }
        Ok(outcome)
    }

    fn result_in<T: ReadTxn + ?Sized>(
        &self,
        txn: &T,
        id: &SubmissionId,
    ) -> Result<VotingResult, ResolutionError> {
        let current = txn
            .get_submission(id)?
            .ok_or_else(|| ResolutionError::NotFound(format!("submission {id}")))?;
        let counted = tally(txn, id)?;
        Ok(VotingResult::new(&current, &counted, &self.params))
    }
}
