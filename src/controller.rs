//! The capture-process-translate loop and its lifecycle state machine.
//!
//! [`LoopController`] owns the session: the state machine
//! `Idle → Running ⇄ Paused → Stopped`, the capture region, and the worker
//! thread that runs the per-iteration pipeline. Control calls
//! (`start`/`pause`/`resume`/`stop`/`change_region`) come from the
//! presentation thread and never block; the worker observes them before its
//! next iteration begins.
//!
//! Per iteration the worker captures the region, preprocesses the frame,
//! runs OCR, asks the aggregator whether anything material changed, and only
//! then calls the translation service. Transient faults publish an error
//! status and back off; the loop itself never dies from a failed iteration.

use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::metrics::Metrics;
use crate::models::{CaptureRegion, CaptureSettings, PreprocessSettings};
use crate::services::{
    CaptureError, CaptureSource, OcrEngine, OcrError, TextAggregator, TranslateError, Translator,
    preprocess,
};
use crate::state::{ResultSink, SessionHandle, TranslationResult};

/// Granularity for interruptible sleeps, so `stop` takes effect promptly
/// even in the middle of a long backoff.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Error descriptions shown to the user are cut to this many characters,
/// matching the status-line discipline of the display.
const ERROR_DETAIL_CHARS: usize = 100;

/// Lifecycle of one capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No region chosen yet; nothing running.
    Idle,

    /// Worker is actively iterating.
    Running,

    /// Worker is alive but sleeping; no capture, OCR, or translation work.
    Paused,

    /// Terminal. The worker exits and the controller accepts no further
    /// transitions.
    Stopped,
}

/// Errors returned by the control operations.
#[derive(Error, Debug)]
pub enum LoopError {
    /// OCR preflight failed; the loop never entered Running.
    #[error("cannot start loop: {0}")]
    EngineUnavailable(#[source] OcrError),

    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        from: LoopState,
        action: &'static str,
    },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// The three external boundaries the loop drives each iteration.
#[derive(Clone)]
pub struct Collaborators {
    pub capture: Arc<dyn CaptureSource>,
    pub ocr: Arc<dyn OcrEngine>,
    pub translator: Arc<dyn Translator>,
}

/// Control block shared between the presentation thread and the worker.
///
/// Mutated only by the presentation thread's control calls; the worker takes
/// an atomic snapshot at the top of every iteration, so a transition takes
/// effect before the next iteration begins and at most one stale iteration
/// can complete.
struct SharedControl {
    control: RwLock<ControlBlock>,
}

#[derive(Clone, Copy)]
struct ControlBlock {
    state: LoopState,
    region: CaptureRegion,
}

impl SharedControl {
    fn new(region: CaptureRegion) -> Self {
        Self {
            control: RwLock::new(ControlBlock {
                state: LoopState::Running,
                region,
            }),
        }
    }

    fn snapshot(&self) -> ControlBlock {
        match self.control.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, state: LoopState) {
        match self.control.write() {
            Ok(mut guard) => guard.state = state,
            Err(poisoned) => poisoned.into_inner().state = state,
        }
    }
}

/// One worker session: its shared control block and the thread handle.
struct Session {
    shared: Arc<SharedControl>,
    // Held so the thread is not detached silently; the worker exits on its
    // own once it observes Stopped, so nothing joins it on the control path.
    _worker: thread::JoinHandle<()>,
}

/// Owns the loop lifecycle for one capture session.
///
/// One instance per active session; the region and state live as private
/// fields and are reachable only through the control operations, never as
/// process-wide globals.
pub struct LoopController {
    capture_settings: CaptureSettings,
    preprocess_settings: PreprocessSettings,
    collaborators: Collaborators,
    sink: Arc<ResultSink>,
    metrics: Arc<Metrics>,
    session: Option<Session>,
    stopped: bool,
}

impl LoopController {
    pub fn new(
        capture_settings: CaptureSettings,
        preprocess_settings: PreprocessSettings,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            capture_settings,
            preprocess_settings,
            collaborators,
            sink: Arc::new(ResultSink::new()),
            metrics: Arc::new(Metrics::new()),
            session: None,
            stopped: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        if self.stopped {
            return LoopState::Stopped;
        }
        match &self.session {
            Some(session) => session.shared.snapshot().state,
            None => LoopState::Idle,
        }
    }

    /// Region bound to the active session, if any.
    pub fn current_region(&self) -> Option<CaptureRegion> {
        self.session
            .as_ref()
            .map(|session| session.shared.snapshot().region)
    }

    /// Subscribe to result updates; the presentation layer awaits changes
    /// instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<TranslationResult> {
        self.sink.subscribe()
    }

    /// Latest published result.
    pub fn latest(&self) -> TranslationResult {
        self.sink.latest()
    }

    /// Latest preprocessed frame, for operator inspection.
    pub fn last_frame(&self) -> Option<image::GrayImage> {
        self.sink.last_frame()
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Verify the OCR engine and enter Running with `region`.
    ///
    /// # Errors
    /// - [`LoopError::EngineUnavailable`] when the OCR preflight fails; the
    ///   state stays Idle.
    /// - [`LoopError::InvalidTransition`] unless the controller is Idle.
    pub fn start(&mut self, region: CaptureRegion) -> Result<(), LoopError> {
        let state = self.state();
        if state != LoopState::Idle {
            return Err(LoopError::InvalidTransition {
                from: state,
                action: "start",
            });
        }

        self.collaborators
            .ocr
            .preflight()
            .map_err(LoopError::EngineUnavailable)?;

        tracing::info!(%region, "Starting capture loop");
        self.spawn_session(region)?;
        Ok(())
    }

    /// Suspend the loop. The worker stays alive but does no capture, OCR,
    /// or translation work until resumed.
    pub fn pause(&mut self) -> Result<(), LoopError> {
        match self.state() {
            LoopState::Running => {
                if let Some(session) = &self.session {
                    session.shared.set_state(LoopState::Paused);
                }
                tracing::info!("Capture loop paused");
                Ok(())
            }
            from => Err(LoopError::InvalidTransition {
                from,
                action: "pause",
            }),
        }
    }

    /// Resume a paused loop. The capture region is untouched by a
    /// pause/resume cycle.
    pub fn resume(&mut self) -> Result<(), LoopError> {
        match self.state() {
            LoopState::Paused => {
                if let Some(session) = &self.session {
                    session.shared.set_state(LoopState::Running);
                }
                tracing::info!("Capture loop resumed");
                Ok(())
            }
            from => Err(LoopError::InvalidTransition {
                from,
                action: "resume",
            }),
        }
    }

    /// Terminally stop the loop. Idempotent and non-blocking: the worker
    /// exits asynchronously, and its publish permission is revoked before
    /// this returns so no result can land afterwards.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(session) = &self.session {
            session.shared.set_state(LoopState::Stopped);
        }
        self.sink.revoke();
        tracing::info!("Capture loop stopped");
    }

    /// Replace the sampled region: the old worker is stopped and a fresh
    /// Running worker is spawned bound to the new region. The old worker
    /// loses its publish permission immediately, so none of its in-flight
    /// results can overwrite output from the new session.
    pub fn change_region(&mut self, region: CaptureRegion) -> Result<(), LoopError> {
        let state = self.state();
        if !matches!(state, LoopState::Running | LoopState::Paused) {
            return Err(LoopError::InvalidTransition {
                from: state,
                action: "change region",
            });
        }

        if let Some(session) = &self.session {
            session.shared.set_state(LoopState::Stopped);
        }

        tracing::info!(%region, "Region changed, restarting capture loop");
        self.spawn_session(region)?;
        Ok(())
    }

    fn spawn_session(&mut self, region: CaptureRegion) -> Result<(), LoopError> {
        let shared = Arc::new(SharedControl::new(region));
        // Opening the new session bumps the sink epoch, revoking the old
        // worker's handle in the same step.
        let handle = self.sink.begin_session();

        let worker_shared = Arc::clone(&shared);
        let collaborators = self.collaborators.clone();
        let capture_settings = self.capture_settings.clone();
        let preprocess_settings = self.preprocess_settings.clone();
        let metrics = Arc::clone(&self.metrics);

        let worker = thread::Builder::new()
            .name("lenslate-worker".to_string())
            .spawn(move || {
                run_loop(
                    worker_shared,
                    collaborators,
                    capture_settings,
                    preprocess_settings,
                    handle,
                    metrics,
                );
            })?;

        self.session = Some(Session {
            shared,
            _worker: worker,
        });
        Ok(())
    }
}

/// Failures inside one loop iteration. All of these are recovered locally:
/// the worker publishes a status string and keeps going.
#[derive(Error, Debug)]
enum IterationError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Translation(#[from] TranslateError),
}

/// What one iteration did. The loop matches on this to record the right
/// counter and pick the delay before the next iteration.
enum IterationOutcome {
    /// A translation was published.
    Published,

    /// The service rejected the payload; an error status was published but
    /// no backoff applies, the fault is not transient.
    InvalidPayload,

    /// Nothing new to translate (empty, unchanged, or noise).
    Unchanged,

    /// Translation succeeded but produced nothing worth displaying.
    EmptyTranslation,
}

fn run_loop(
    shared: Arc<SharedControl>,
    collaborators: Collaborators,
    capture_settings: CaptureSettings,
    preprocess_settings: PreprocessSettings,
    handle: SessionHandle,
    metrics: Arc<Metrics>,
) {
    let interval = Duration::from_millis(capture_settings.interval_ms);
    let pause_poll = Duration::from_millis(capture_settings.pause_poll_ms);
    let backoff = Duration::from_millis(capture_settings.backoff_ms);

    // Change detection state lives and dies with the session: a new region
    // always translates its first recognized text.
    let mut aggregator = TextAggregator::new();

    tracing::debug!("Worker started");

    loop {
        let control = shared.snapshot();
        match control.state {
            LoopState::Stopped => break,
            LoopState::Paused => {
                thread::sleep(pause_poll);
                continue;
            }
            LoopState::Running | LoopState::Idle => {}
        }

        let result = run_iteration(
            &control.region,
            &collaborators,
            &preprocess_settings,
            &mut aggregator,
            &handle,
        );
        metrics.record_iteration();

        let delay = match result {
            Ok(outcome) => {
                match outcome {
                    IterationOutcome::Published => metrics.record_translation_published(),
                    IterationOutcome::InvalidPayload => metrics.record_invalid_payload(),
                    IterationOutcome::Unchanged => metrics.record_unchanged_skip(),
                    IterationOutcome::EmptyTranslation => {}
                }
                interval
            }
            Err(err) => {
                tracing::warn!("Iteration failed: {err}");
                handle.publish(TranslationResult::Error(describe_failure(&err)));
                metrics.record_recovered_error();
                // Longer than the normal cadence so a failing dependency is
                // not hammered.
                backoff
            }
        };

        if !sleep_while_active(&shared, delay) {
            break;
        }
    }

    tracing::debug!("Worker exiting");
}

fn run_iteration(
    region: &CaptureRegion,
    collaborators: &Collaborators,
    preprocess_settings: &PreprocessSettings,
    aggregator: &mut TextAggregator,
    handle: &SessionHandle,
) -> Result<IterationOutcome, IterationError> {
    let frame = collaborators.capture.grab(region)?;

    let processed = preprocess(&frame, preprocess_settings);
    handle.store_frame(processed.clone());

    let extracted = collaborators.ocr.recognize(&processed)?;

    let Some(aggregated) = aggregator.aggregate(&extracted) else {
        return Ok(IterationOutcome::Unchanged);
    };

    match collaborators.translator.translate(&aggregated) {
        Ok(translated) if translated.is_empty() => {
            tracing::debug!("Translator returned an empty result, nothing to publish");
            Ok(IterationOutcome::EmptyTranslation)
        }
        Ok(translated) => {
            handle.publish(TranslationResult::Translated(translated));
            Ok(IterationOutcome::Published)
        }
        Err(TranslateError::InvalidPayload(detail)) => {
            handle.publish(TranslationResult::Error(format!(
                "Translation failed: {detail}"
            )));
            Ok(IterationOutcome::InvalidPayload)
        }
        Err(err @ TranslateError::Transient(_)) => Err(err.into()),
    }
}

/// User-facing description of a recovered fault, truncated so a huge error
/// chain cannot flood the status display.
fn describe_failure(err: &IterationError) -> String {
    let detail: String = err.to_string().chars().take(ERROR_DETAIL_CHARS).collect();
    format!("Translation error, retrying.\nDetails: {detail}")
}

/// Sleep for `total`, waking in short slices to notice a Stopped state.
/// Returns `false` when the loop should exit.
fn sleep_while_active(shared: &SharedControl, total: Duration) -> bool {
    let mut remaining = total;
    while !remaining.is_zero() {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);

        if shared.snapshot().state == LoopState::Stopped {
            return false;
        }
    }
    true
}
