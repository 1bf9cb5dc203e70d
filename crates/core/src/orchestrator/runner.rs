//! Encode orchestrator implementation.
//!
//! Jobs run strictly one at a time: a single dispatch task consumes the
//! queue and drives each job through probe, translate and encode. Every
//! accepted job ends with exactly one terminal event to all subscribers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{BusyPolicy, JobsConfig};
use crate::encoder::{parse_payload, translate, Encoder, JobError, ProgressHandle, Prober};
use crate::metrics;

use super::broadcaster::ProgressBroadcaster;
use super::registry::{SubscriberId, SubscriberRegistry};
use super::types::{
    ActiveJob, EncodeRequest, JobPhase, OrchestratorStatus, StatusEvent, SubmitError,
    SubmitOutcome,
};

/// Error sent to a requester turned away by the `reject` busy policy.
const BUSY_MESSAGE: &str = "An encode is already in progress";

/// Error broadcast when shutdown interrupts the running job.
const SHUTDOWN_MESSAGE: &str = "Encode interrupted: ffmpegd is shutting down";

#[derive(Debug)]
struct QueuedJob {
    id: Uuid,
    request: EncodeRequest,
}

/// Runs one job at a time and reports on it.
struct JobRunner {
    config: JobsConfig,
    prober: Arc<dyn Prober>,
    encoder: Arc<dyn Encoder>,
    registry: Arc<SubscriberRegistry>,
    progress: ProgressHandle,
    phase: watch::Sender<JobPhase>,
    current_job: RwLock<Option<ActiveJob>>,
    /// Progress ticker of the running job.
    ticker: Mutex<Option<ProgressBroadcaster>>,
    /// Accepted jobs not yet finished, the active one included.
    pending: AtomicUsize,
}

impl JobRunner {
    fn set_phase(&self, phase: JobPhase) {
        self.phase.send_replace(phase);
    }

    async fn run_job(&self, job: QueuedJob) {
        let started = Instant::now();
        *self.current_job.write().await = Some(ActiveJob {
            id: job.id,
            input: job.request.input.clone(),
            output: job.request.output.clone(),
            started_at: Utc::now(),
        });
        info!(
            job_id = %job.id,
            input = %job.request.input.display(),
            output = %job.request.output.display(),
            "Starting encode job"
        );

        let (outcome, event) = match self.execute(&job).await {
            Ok(()) => {
                self.set_phase(JobPhase::Succeeded);
                info!(
                    job_id = %job.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Encode job succeeded"
                );
                ("succeeded", StatusEvent::completed())
            }
            Err(e) => {
                self.set_phase(JobPhase::Failed);
                warn!(job_id = %job.id, stage = e.stage(), error = %e, "Encode job failed");
                metrics::JOB_FAILURES.with_label_values(&[e.stage()]).inc();
                ("failed", StatusEvent::failed(e.to_string()))
            }
        };

        self.current_job.write().await.take();
        let report = self.registry.broadcast(&event).await;
        debug!(
            job_id = %job.id,
            delivered = report.delivered,
            dropped = report.dropped,
            "Terminal event sent"
        );

        metrics::ENCODE_JOBS.with_label_values(&[outcome]).inc();
        metrics::ENCODE_DURATION
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());

        self.finish();
    }

    async fn execute(&self, job: &QueuedJob) -> Result<(), JobError> {
        let request = &job.request;

        self.set_phase(JobPhase::Probing);
        let probe = self.prober.probe(&request.input).await?;
        let total_frames = probe.total_frames();
        debug!(job_id = %job.id, streams = probe.streams.len(), ?total_frames, "Probed input");

        self.set_phase(JobPhase::Translating);
        let document = parse_payload(&request.payload)?;
        let args = translate(&document)?;
        debug!(job_id = %job.id, ?args, "Translated encode options");

        self.progress.reset().await;
        self.set_phase(JobPhase::Running);
        *self.ticker.lock().await = Some(ProgressBroadcaster::spawn(
            Duration::from_millis(self.config.progress_interval_ms),
            total_frames,
            self.progress.clone(),
            Arc::clone(&self.registry),
        ));

        let result = self
            .encoder
            .encode(&request.input, &request.output, &args, &self.progress)
            .await;

        self.stop_ticker().await;
        result?;
        Ok(())
    }

    /// Stops and joins the progress ticker, so no tick can follow the
    /// terminal event.
    async fn stop_ticker(&self) {
        let ticker = self.ticker.lock().await.take();
        if let Some(ticker) = ticker {
            let sent = ticker.stop().await;
            debug!(progress_events = sent, "Progress ticker stopped");
        }
    }

    /// Ends the job that shutdown cut short, unless its terminal event
    /// already went out.
    async fn interrupt(&self) {
        self.stop_ticker().await;
        let Some(job) = self.current_job.write().await.take() else {
            return;
        };
        warn!(job_id = %job.id, "Encode job interrupted by shutdown");
        self.set_phase(JobPhase::Failed);
        self.registry
            .broadcast(&StatusEvent::failed(SHUTDOWN_MESSAGE))
            .await;
        metrics::ENCODE_JOBS.with_label_values(&["failed"]).inc();
        self.finish();
    }

    fn finish(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.set_phase(JobPhase::Idle);
    }
}

/// The encode orchestrator: owns the queue and the single dispatch task.
pub struct EncodeOrchestrator {
    runner: Arc<JobRunner>,
    queue_tx: mpsc::UnboundedSender<QueuedJob>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<QueuedJob>>>,
    dispatch: Mutex<Option<JoinHandle<()>>>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl EncodeOrchestrator {
    /// Create a new orchestrator. Call [`start`](Self::start) before submitting.
    pub fn new(
        config: JobsConfig,
        prober: Arc<dyn Prober>,
        encoder: Arc<dyn Encoder>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (phase, _) = watch::channel(JobPhase::Idle);

        let runner = JobRunner {
            config,
            prober,
            encoder,
            registry,
            progress: ProgressHandle::new(),
            phase,
            current_job: RwLock::new(None),
            ticker: Mutex::new(None),
            pending: AtomicUsize::new(0),
        };

        Self {
            runner: Arc::new(runner),
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            dispatch: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start the dispatch task. An orchestrator can only be started once.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Encode orchestrator already running");
            return;
        }

        let Some(mut queue_rx) = self.queue_rx.lock().await.take() else {
            warn!("Encode orchestrator was stopped and cannot be restarted");
            self.running.store(false, Ordering::SeqCst);
            return;
        };

        info!("Starting encode orchestrator");

        let runner = Arc::clone(&self.runner);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Dispatch loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Dispatch loop received shutdown signal");
                        break;
                    }
                    job = queue_rx.recv() => {
                        let Some(job) = job else { break };
                        tokio::select! {
                            _ = runner.run_job(job) => {}
                            _ = shutdown_rx.recv() => {
                                runner.interrupt().await;
                                info!("Dispatch loop received shutdown signal");
                                break;
                            }
                        }
                    }
                }
            }
            info!("Dispatch loop stopped");
        });

        *self.dispatch.lock().await = Some(handle);
        info!("Encode orchestrator started");
    }

    /// Stop the orchestrator. A running encode is cut short and its ffmpeg
    /// process killed; queued jobs are dropped.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Encode orchestrator not running");
            return;
        }

        info!("Stopping encode orchestrator");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.dispatch.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dispatch task ended abnormally");
            }
        }

        info!("Encode orchestrator stopped");
    }

    /// Accept an encode request from subscriber `from` (if known).
    ///
    /// With the `reject` busy policy, a request arriving while a job is
    /// active gets one error event sent to `from` only.
    pub async fn submit(
        &self,
        from: Option<SubscriberId>,
        request: EncodeRequest,
    ) -> Result<SubmitOutcome, SubmitError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SubmitError::NotRunning);
        }

        let pending = &self.runner.pending;
        let ahead = match self.runner.config.when_busy {
            BusyPolicy::Queue => pending.fetch_add(1, Ordering::SeqCst),
            BusyPolicy::Reject => {
                if pending
                    .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    info!(
                        subscriber_id = ?from,
                        input = %request.input.display(),
                        "Rejecting encode request, another job is active"
                    );
                    metrics::ENCODE_JOBS.with_label_values(&["rejected"]).inc();
                    if let Some(id) = from {
                        self.runner
                            .registry
                            .send_to(id, &StatusEvent::failed(BUSY_MESSAGE))
                            .await;
                    }
                    return Ok(SubmitOutcome::Rejected);
                }
                0
            }
        };

        let job_id = Uuid::new_v4();
        let job = QueuedJob { id: job_id, request };
        if self.queue_tx.send(job).is_err() {
            pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SubmitError::NotRunning);
        }

        info!(job_id = %job_id, subscriber_id = ?from, ahead, "Encode request queued");
        Ok(SubmitOutcome::Queued { job_id, ahead })
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let running = self.running.load(Ordering::Relaxed);
        let phase = *self.runner.phase.borrow();
        OrchestratorStatus {
            running,
            phase,
            current_job: self.runner.current_job.read().await.clone(),
            pending_count: self.runner.pending.load(Ordering::SeqCst),
            subscriber_count: self.runner.registry.len().await,
        }
    }

    pub fn registry(&self) -> Arc<SubscriberRegistry> {
        Arc::clone(&self.runner.registry)
    }

    /// Progress of the running job.
    pub fn progress(&self) -> ProgressHandle {
        self.runner.progress.clone()
    }

    /// Watch phase transitions.
    pub fn subscribe_phase(&self) -> watch::Receiver<JobPhase> {
        self.runner.phase.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}
