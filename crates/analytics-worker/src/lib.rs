//! Background analytics scheduler: a bounded pool of cooperative workers
//! that recompute derived session metrics whenever uploads move a watermark
//! past the line count analytics were last computed at.
//!
//! Workers claim sessions through `FOR UPDATE SKIP LOCKED`, so they never
//! contend with each other, and nothing here takes the locks the upload path
//! uses — analytics can lag, uploads never wait.

use std::time::Duration;

use sync_engine::{SyncEngine, retry};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod metrics;
pub use metrics::MetricsFolder;

mod worker;
pub use worker::WorkError;

/// Failed attempts back off exponentially from 30s, capped at 10 minutes.
const FAIL_BACKOFF_BASE_SECS: f64 = 30.0;
const FAIL_BACKOFF_CAP_SECS: f64 = 600.0;

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Number of workers; bounds in-flight recomputations independent of
    /// request volume.
    pub workers: usize,
    /// Age after which a `computing` claim is considered abandoned.
    pub claim_stale_secs: f64,
    /// Sleep between polls when no work is due.
    pub idle_poll: Duration,
    /// Wall-clock budget for one session.
    pub session_timeout: Duration,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            claim_stale_secs: 600.0,
            idle_poll: Duration::from_secs(15),
            session_timeout: Duration::from_secs(120),
        }
    }
}

/// Handle over the spawned worker tasks.
pub struct AnalyticsPool {
    handles: Vec<JoinHandle<()>>,
}

impl AnalyticsPool {
    /// Spawns `config.workers` loops onto the current runtime. Cancel
    /// `shutdown` to drain; workers finish their in-flight session first.
    pub fn spawn(engine: SyncEngine, config: AnalyticsConfig, shutdown: CancellationToken) -> Self {
        let handles = (0..config.workers.max(1))
            .map(|worker_index| {
                let engine = engine.clone();
                let config = config.clone();
                let shutdown = shutdown.clone();

                tokio::spawn(async move {
                    run_worker(worker_index, engine, config, shutdown).await;
                })
            })
            .collect();

        Self { handles }
    }

    pub async fn join(self) {
        for handle in self.handles {
            if let Err(error) = handle.await {
                tracing::error!(message = "analytics worker panicked", ?error, alert = true);
            }
        }
    }
}

async fn run_worker(
    worker_index: usize,
    engine: SyncEngine,
    config: AnalyticsConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(message = "analytics worker started", worker_index);

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        match run_once(&engine, &config).await {
            Ok(true) => {
                // processed something; immediately look for more
                continue;
            }
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(
                    message = "analytics pass failed",
                    worker_index,
                    error.display = %error,
                );
            }
        }

        let idle = retry::jittered_delay(
            0,
            config.idle_poll.as_millis() as u64,
            config.idle_poll.as_millis() as u64 * 2,
        );

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(idle) => {}
        }
    }

    tracing::info!(message = "analytics worker stopped", worker_index);
}

/// One claim-process-write cycle. Returns whether any work was claimed.
async fn run_once(engine: &SyncEngine, config: &AnalyticsConfig) -> Result<bool, WorkError> {
    engine.db().seed_analytics_rows().await?;

    let Some(claim) = engine
        .db()
        .claim_next_analytics(config.claim_stale_secs)
        .await?
    else {
        return Ok(false);
    };

    let outcome = match tokio::time::timeout(
        config.session_timeout,
        worker::process_claim(engine, &claim),
    )
    .await
    {
        Ok(result) => result,
        Err(_elapsed) => Err(WorkError::Timeout),
    };

    match outcome {
        Ok(Some(computed)) => {
            engine
                .db()
                .complete_analytics(
                    claim.session_id,
                    computed.computed_line_count,
                    &computed.metrics,
                )
                .await?;

            tracing::debug!(
                message = "analytics recomputed",
                session_id = %claim.session_id,
                computed_line_count = computed.computed_line_count,
            );
        }
        Ok(None) => {
            tracing::debug!(
                message = "claimed session vanished mid-run",
                session_id = %claim.session_id,
            );
        }
        Err(error) => {
            let backoff =
                (FAIL_BACKOFF_BASE_SECS * 2_f64.powi(claim.attempts)).min(FAIL_BACKOFF_CAP_SECS);

            tracing::warn!(
                message = "analytics recomputation failed",
                session_id = %claim.session_id,
                attempts = claim.attempts + 1,
                backoff_secs = backoff,
                error.display = %error,
            );

            engine
                .db()
                .fail_analytics(claim.session_id, &error.to_string(), backoff)
                .await?;
        }
    }

    Ok(true)
}
