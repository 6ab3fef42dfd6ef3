// Shared-state handoff between the capture worker and the presentation layer.
//
// Two single-slot stores live here:
// - ResultSink: the latest TranslationResult, published by the worker and
//   observed by the presentation thread with change notification
// - FrameStore: the latest preprocessed frame, kept for diagnostics only
//
// Both are overwrite-on-publish. This is a status display, not a queue, so
// coalescing intermediate values is correct: readers always want the newest
// state, never the history.

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use image::GrayImage;
use tokio::sync::watch;

/// The one currently displayed outcome of the loop.
///
/// Exactly one value is current at any time; each publish overwrites the
/// previous one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TranslationResult {
    /// Nothing published yet.
    #[default]
    Idle,

    /// Latest successful translation.
    Translated(String),

    /// Human-readable description of the latest failure. The loop keeps
    /// running; this is status, not a fatal condition.
    Error(String),
}

/// Single-slot handoff of the latest [`TranslationResult`].
///
/// Built on `tokio::sync::watch`, which gives the exact contract needed:
/// writers replace the slot atomically, readers always observe a fully
/// formed value, the last publish wins, and subscribers are notified of
/// changes without polling.
///
/// Publishing goes through a [`SessionHandle`] carrying an epoch. Starting a
/// new session (or stopping) bumps the epoch, so a superseded worker that is
/// still finishing an iteration can no longer touch the slot. This is what
/// keeps a region change from being overwritten by a stale result.
///
/// The epoch lives behind a mutex and every write holds it across the
/// check-and-send, so a revocation that has returned is a barrier: no write
/// from the revoked session can land afterwards, even one racing the bump.
pub struct ResultSink {
    tx: watch::Sender<TranslationResult>,
    epoch: Mutex<u64>,
    frames: FrameStore,
}

impl ResultSink {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TranslationResult::Idle);
        Self {
            tx,
            epoch: Mutex::new(0),
            frames: FrameStore::new(),
        }
    }

    /// Latest published result. Safe from any thread.
    pub fn latest(&self) -> TranslationResult {
        self.tx.borrow().clone()
    }

    /// Subscribe for change notification. The receiver starts with the
    /// current value marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<TranslationResult> {
        self.tx.subscribe()
    }

    /// Latest preprocessed frame, for diagnostic display.
    pub fn last_frame(&self) -> Option<GrayImage> {
        self.frames.latest()
    }

    /// Open a new publish session, revoking any previous one.
    pub fn begin_session(self: &Arc<Self>) -> SessionHandle {
        let mut epoch = self.lock_epoch();
        *epoch += 1;
        SessionHandle {
            sink: Arc::clone(self),
            epoch: *epoch,
        }
    }

    /// Revoke the current session without opening a new one. Used by `stop`
    /// so no publish can land after it returns.
    pub fn revoke(&self) {
        *self.lock_epoch() += 1;
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        match self.epoch.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ResultSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker-side publishing capability for one session.
///
/// Every write checks the session epoch against the sink, so a handle held
/// by a superseded worker silently becomes inert.
pub struct SessionHandle {
    sink: Arc<ResultSink>,
    epoch: u64,
}

impl SessionHandle {
    /// Publish a result. Returns `false` when this session has been
    /// superseded and the value was discarded.
    ///
    /// The epoch lock is held across the send, so a revocation cannot slip
    /// in between the staleness check and the write.
    pub fn publish(&self, result: TranslationResult) -> bool {
        let current = self.sink.lock_epoch();
        if *current != self.epoch {
            tracing::debug!("Discarding publish from superseded session");
            return false;
        }
        self.sink.tx.send_replace(result);
        true
    }

    /// Store the latest preprocessed frame. Same staleness rule as
    /// [`publish`](Self::publish).
    pub fn store_frame(&self, frame: GrayImage) -> bool {
        let current = self.sink.lock_epoch();
        if *current != self.epoch {
            return false;
        }
        self.sink.frames.store(frame);
        true
    }

    /// Whether this session is still the active publisher.
    pub fn is_current(&self) -> bool {
        *self.sink.lock_epoch() == self.epoch
    }
}

/// Single most-recent preprocessed frame, overwritten each iteration.
///
/// Single-writer (the worker) / single-reader-on-demand (the presentation
/// thread's diagnostics view). The lock prevents a torn read while the
/// worker replaces the frame.
pub struct FrameStore {
    slot: RwLock<Option<GrayImage>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn store(&self, frame: GrayImage) {
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(frame),
            Err(poisoned) => *poisoned.into_inner() = Some(frame),
        }
    }

    pub fn latest(&self) -> Option<GrayImage> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for FrameStore {
    fn default() -> Self {
        Self::new()
    }
}
