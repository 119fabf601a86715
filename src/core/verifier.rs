//! Verification Loop: ticks one session's engine at a fixed cadence
//!
//! - One tokio task per session, owning the `TrustEngine` outright
//! - Re-auth events arrive over an mpsc channel and are handled between
//!   ticks, never in the middle of one
//! - Decisions fan out over a bounded broadcast; the latest snapshot sits in
//!   a watch channel for synchronous reads
//! - `stop()` is idempotent; dropping the handle stops the task

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::Instrument;

use crate::core::engine::TrustEngine;
use crate::core::producer::{collect_readings, SignalProducer};
use crate::types::{
    SignalSource, TrustConfig, TrustDecision, TrustError, TrustResult, TrustSnapshot,
};

/// Pending re-auth events per session; extra events coalesce
const REAUTH_QUEUE: usize = 4;

/// Re-auth request, optionally acknowledged with the resulting decision
#[derive(Debug)]
struct ReauthRequest {
    ack: Option<oneshot::Sender<TrustDecision>>,
}

/// Starts verification loops
pub struct VerificationLoop;

impl VerificationLoop {
    /// Validate `config`, build the engine and spawn the loop.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start(
        session_id: impl Into<String>,
        config: &TrustConfig,
        producer: Arc<dyn SignalProducer>,
    ) -> TrustResult<VerificationHandle> {
        let session_id = session_id.into();
        let engine = TrustEngine::new(config, now())?;

        let (decisions_tx, _) = broadcast::channel(config.channel_capacity);
        let (current_tx, current_rx) = watch::channel(engine.current());
        let (reauth_tx, reauth_rx) = mpsc::channel(REAUTH_QUEUE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = LoopWorker {
            engine,
            producer,
            sources: config.sources.keys().copied().collect(),
            period: config.tick_interval(),
            decisions_tx: decisions_tx.clone(),
            current_tx,
        };

        let span = tracing::info_span!("session", id = %session_id);
        let task = tokio::spawn(worker.run(reauth_rx, shutdown_rx).instrument(span));

        Ok(VerificationHandle {
            session_id,
            decisions_tx,
            current_rx,
            reauth_tx,
            shutdown_tx,
            task: Some(task),
        })
    }
}

/// Owns the per-session state inside the spawned task
struct LoopWorker {
    engine: TrustEngine,
    producer: Arc<dyn SignalProducer>,
    sources: Vec<SignalSource>,
    period: Duration,
    decisions_tx: broadcast::Sender<TrustDecision>,
    current_tx: watch::Sender<TrustSnapshot>,
}

impl LoopWorker {
    async fn run(
        mut self,
        mut reauth_rx: mpsc::Receiver<ReauthRequest>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            period_ms = self.period.as_millis() as u64,
            sources = self.sources.len(),
            "verification loop started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                Some(request) = reauth_rx.recv() => {
                    let decision = self.engine.reauth_success(now());
                    self.publish(&decision);
                    if let Some(ack) = request.ack {
                        let _ = ack.send(decision);
                    }
                }

                _ = ticker.tick() => {
                    let readings = collect_readings(self.producer.as_ref(), &self.sources);
                    let decision = self.engine.tick(&readings, now());
                    self.publish(&decision);
                }
            }
        }

        tracing::info!(ticks = self.engine.tick_count(), "verification loop stopped");
    }

    fn publish(&self, decision: &TrustDecision) {
        // Snapshot first so a subscriber woken by the broadcast sees it
        self.current_tx.send_replace(decision.snapshot());
        // No subscribers is fine
        let _ = self.decisions_tx.send(decision.clone());
    }
}

/// Handle to a running verification loop
pub struct VerificationHandle {
    session_id: String,
    decisions_tx: broadcast::Sender<TrustDecision>,
    current_rx: watch::Receiver<TrustSnapshot>,
    reauth_tx: mpsc::Sender<ReauthRequest>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl VerificationHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stream of decisions, one per tick plus one per re-auth
    pub fn subscribe(&self) -> broadcast::Receiver<TrustDecision> {
        self.decisions_tx.subscribe()
    }

    /// Latest snapshot (synchronous)
    pub fn current_state(&self) -> TrustSnapshot {
        *self.current_rx.borrow()
    }

    /// Watch receiver for awaiting snapshot changes
    pub fn watch(&self) -> watch::Receiver<TrustSnapshot> {
        self.current_rx.clone()
    }

    /// Detached sender for re-auth events, usable without borrowing the handle
    pub fn reauth_notifier(&self) -> ReauthNotifier {
        ReauthNotifier {
            reauth_tx: self.reauth_tx.clone(),
        }
    }

    /// Fire-and-forget re-auth success. Applied before the next tick.
    pub fn notify_reauth_success(&self) -> TrustResult<()> {
        notify(&self.reauth_tx)
    }

    /// Re-auth success, waiting for the resulting decision
    pub async fn reauth_success(&self) -> TrustResult<TrustDecision> {
        request(&self.reauth_tx).await
    }

    /// Ask the loop to stop. Idempotent.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Stop and wait for the task to finish
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "verification task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for VerificationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cloneable re-auth sender for one session.
///
/// Does not keep the loop alive: once the session stops, both calls return
/// `SessionClosed`.
#[derive(Clone)]
pub struct ReauthNotifier {
    reauth_tx: mpsc::Sender<ReauthRequest>,
}

impl ReauthNotifier {
    pub fn notify(&self) -> TrustResult<()> {
        notify(&self.reauth_tx)
    }

    pub async fn reauth_success(&self) -> TrustResult<TrustDecision> {
        request(&self.reauth_tx).await
    }
}

fn notify(reauth_tx: &mpsc::Sender<ReauthRequest>) -> TrustResult<()> {
    match reauth_tx.try_send(ReauthRequest { ack: None }) {
        Ok(()) => Ok(()),
        // A re-auth is already queued; applying it once is equivalent
        Err(mpsc::error::TrySendError::Full(_)) => Ok(()),
        Err(mpsc::error::TrySendError::Closed(_)) => Err(TrustError::SessionClosed),
    }
}

async fn request(reauth_tx: &mpsc::Sender<ReauthRequest>) -> TrustResult<TrustDecision> {
    let (ack_tx, ack_rx) = oneshot::channel();
    reauth_tx
        .send(ReauthRequest { ack: Some(ack_tx) })
        .await
        .map_err(|_| TrustError::SessionClosed)?;
    ack_rx.await.map_err(|_| TrustError::SessionClosed)
}

/// Current time on tokio's clock, so paused-time tests drive the engine too
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
