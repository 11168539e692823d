//! Periodic deadline sweeper.
//!
//! Each tick runs one engine sweep on the blocking pool, since LMDB
//! transactions block the calling thread. The loop exits on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use tsl_resolution::{ResolutionEngine, SweepReport};
use tsl_store::Store;
use tsl_types::Clock;
use tsl_utils::{format_duration, StatsCounter};

use crate::error::DaemonError;

/// Counter names tracked by the sweeper.
pub const SWEEP_COUNTERS: &[&str] = &[
    "sweeps",
    "examined",
    "approved",
    "rejected",
    "escalated",
    "failed",
    "errors",
];

/// Run one sweep and fold its report into `stats`.
pub async fn sweep_once<S, C>(
    engine: &Arc<ResolutionEngine<S, C>>,
    stats: &StatsCounter,
) -> Result<SweepReport, DaemonError>
where
    S: Store + 'static,
    C: Clock + 'static,
{
    let engine = Arc::clone(engine);
    let report = tokio::task::spawn_blocking(move || engine.sweep()).await??;

    stats.increment("sweeps");
    stats.add("examined", report.examined as u64);
    stats.add("approved", report.approved as u64);
    stats.add("rejected", report.rejected as u64);
    stats.add("escalated", report.escalated as u64);
    stats.add("failed", report.failed as u64);
    Ok(report)
}

/// Sweep every `interval` until a shutdown signal arrives.
pub async fn run_sweeper<S, C>(
    engine: Arc<ResolutionEngine<S, C>>,
    interval: Duration,
    stats: Arc<StatsCounter>,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: Store + 'static,
    C: Clock + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval = %format_duration(interval.as_secs()),
        "deadline sweeper started"
    );

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                match sweep_once(&engine, &stats).await {
                    Ok(report) if report.examined == 0 => debug!("no submissions past deadline"),
                    Ok(report) => debug!(transitioned = report.transitioned(), "sweep applied"),
                    Err(e) => {
                        stats.increment("errors");
                        error!("deadline sweep failed: {e}");
                    }
                }
            }
        }
    }

    info!(totals = %stats, "deadline sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownController;
    use tsl_nullables::{NullClock, NullStore};
    use tsl_resolution::{SignDraft, SubmissionDraft};
    use tsl_types::{ResolutionParams, SignKind, SubmissionAction, SubmissionStatus, UserRole};

    const START: u64 = 1_710_032_400;
    const WEEK: u64 = 7 * 24 * 3600;

    type Engine = ResolutionEngine<NullStore, Arc<NullClock>>;

    fn engine_with_expired_submission() -> (Arc<Engine>, tsl_types::SubmissionId) {
        let clock = Arc::new(NullClock::new(START));
        let engine = ResolutionEngine::new(
            NullStore::new(),
            Arc::clone(&clock),
            ResolutionParams::community_defaults(),
        );
        let proposer = engine.register_user("proposer", UserRole::User).unwrap();
        let submission = engine
            .propose(
                &proposer.id,
                SubmissionDraft {
                    action: SubmissionAction::Add,
                    sign: Some(SignDraft {
                        kind: SignKind::Warning,
                        label: "Deer crossing".to_string(),
                        latitude: 48.2,
                        longitude: 16.4,
                    }),
                    target: None,
                    description: None,
                },
            )
            .unwrap();
        clock.advance(WEEK + 1);
        (Arc::new(engine), submission.id)
    }

    #[tokio::test]
    async fn sweep_once_resolves_and_counts() {
        let (engine, id) = engine_with_expired_submission();
        let stats = StatsCounter::new(SWEEP_COUNTERS);

        let report = sweep_once(&engine, &stats).await.unwrap();
        assert_eq!(report.examined, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(
            engine.submission(&id).unwrap().status,
            SubmissionStatus::Rejected
        );

        let again = sweep_once(&engine, &stats).await.unwrap();
        assert_eq!(again.examined, 0);
        assert_eq!(stats.get("sweeps"), 2);
        assert_eq!(stats.get("rejected"), 1);
    }

    #[tokio::test]
    async fn sweeper_stops_on_shutdown() {
        let (engine, id) = engine_with_expired_submission();
        let stats = Arc::new(StatsCounter::new(SWEEP_COUNTERS));
        let controller = ShutdownController::new();

        let handle = tokio::spawn(run_sweeper(
            Arc::clone(&engine),
            Duration::from_millis(10),
            Arc::clone(&stats),
            controller.subscribe(),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;
        controller.shutdown();
        handle.await.unwrap();

        assert!(stats.get("sweeps") >= 1);
        assert_eq!(stats.get("errors"), 0);
        assert!(engine.submission(&id).unwrap().status.is_terminal());
    }
}
