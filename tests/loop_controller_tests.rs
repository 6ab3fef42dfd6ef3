//! End-to-end tests for the capture loop against in-process fakes.
//!
//! Real worker threads and real timing, fake boundaries: capture returns a
//! synthetic frame sized to the region, OCR derives its text from the frame,
//! and the translator is scripted per test. Timing assertions use generous
//! margins so the suite stays stable on loaded machines.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage};

use lenslate::models::{CaptureRegion, CaptureSettings, PreprocessSettings};
use lenslate::services::{
    CaptureError, CaptureSource, OcrEngine, OcrError, TranslateError, Translator,
};
use lenslate::{Collaborators, LoopController, LoopState, TranslationResult};

/// Capture fake that records when each grab happened.
struct FakeCapture {
    grabs: Mutex<Vec<Instant>>,
}

impl FakeCapture {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            grabs: Mutex::new(Vec::new()),
        })
    }

    fn grab_times(&self) -> Vec<Instant> {
        self.grabs.lock().unwrap().clone()
    }
}

impl CaptureSource for FakeCapture {
    fn grab(&self, region: &CaptureRegion) -> Result<DynamicImage, CaptureError> {
        self.grabs.lock().unwrap().push(Instant::now());
        Ok(DynamicImage::new_rgba8(region.width(), region.height()))
    }
}

/// What the OCR fake reports for each frame.
enum OcrScript {
    /// Text derived from frame width, so distinct regions read differently
    /// and a repeated region reads the same.
    FrameWidth,
    /// Fresh text on every call, so no iteration is skipped as unchanged.
    Counter,
}

struct FakeOcr {
    script: OcrScript,
    calls: AtomicU64,
}

impl FakeOcr {
    fn new(script: OcrScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicU64::new(0),
        })
    }
}

impl OcrEngine for FakeOcr {
    fn preflight(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn recognize(&self, frame: &GrayImage) -> Result<String, OcrError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.script {
            OcrScript::FrameWidth => format!("width {}", frame.width()),
            OcrScript::Counter => format!("reading {n}"),
        })
    }
}

enum TranslateScript {
    /// Succeed, prefixing the input.
    Echo,
    /// Sleep first, then succeed. Models a slow remote service.
    SlowEcho(Duration),
    /// Always fail with a transient fault.
    Transient,
    /// Always fail with a payload rejection.
    InvalidPayload,
}

struct FakeTranslator {
    script: TranslateScript,
    calls: AtomicU64,
}

impl FakeTranslator {
    fn new(script: TranslateScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicU64::new(0),
        })
    }

    fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Translator for FakeTranslator {
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            TranslateScript::Echo => Ok(format!("T: {text}")),
            TranslateScript::SlowEcho(delay) => {
                thread::sleep(*delay);
                Ok(format!("T: {text}"))
            }
            TranslateScript::Transient => {
                Err(TranslateError::Transient("service unreachable".to_string()))
            }
            TranslateScript::InvalidPayload => {
                Err(TranslateError::InvalidPayload("unsupported language".to_string()))
            }
        }
    }
}

fn fast_settings() -> (CaptureSettings, PreprocessSettings) {
    (
        CaptureSettings {
            interval_ms: 20,
            pause_poll_ms: 20,
            backoff_ms: 250,
            region: None,
        },
        // Pass frames through nearly untouched; the fakes do not read pixels.
        PreprocessSettings {
            upscale_factor: 1,
            sharpen: false,
            threshold: 200,
        },
    )
}

fn region(width: i32) -> CaptureRegion {
    CaptureRegion::new(0, 0, width, 10).unwrap()
}

fn controller_with(
    capture: Arc<FakeCapture>,
    ocr: Arc<FakeOcr>,
    translator: Arc<FakeTranslator>,
) -> LoopController {
    let (capture_settings, preprocess_settings) = fast_settings();
    LoopController::new(
        capture_settings,
        preprocess_settings,
        Collaborators {
            capture,
            ocr,
            translator,
        },
    )
}

/// Poll the published result until `predicate` matches or the deadline hits.
fn wait_for(
    controller: &LoopController,
    timeout: Duration,
    predicate: impl Fn(&TranslationResult) -> bool,
) -> Option<TranslationResult> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let latest = controller.latest();
        if predicate(&latest) {
            return Some(latest);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn recognized_text_is_translated_and_published() {
    let capture = FakeCapture::new();
    let ocr = FakeOcr::new(OcrScript::FrameWidth);
    let translator = FakeTranslator::new(TranslateScript::Echo);
    let mut controller = controller_with(capture, ocr, translator);

    controller.start(region(10)).unwrap();

    let published = wait_for(&controller, Duration::from_secs(2), |r| {
        matches!(r, TranslationResult::Translated(_))
    });
    assert_eq!(
        published,
        Some(TranslationResult::Translated("T: width 10".to_string()))
    );

    controller.stop();
}

#[test]
fn unchanged_text_is_translated_only_once() {
    let capture = FakeCapture::new();
    // Same region every iteration, so OCR output never changes.
    let ocr = FakeOcr::new(OcrScript::FrameWidth);
    let translator = FakeTranslator::new(TranslateScript::Echo);
    let mut controller =
        controller_with(capture, ocr, Arc::clone(&translator));

    controller.start(region(10)).unwrap();
    // Plenty of iterations at the 20ms cadence.
    thread::sleep(Duration::from_millis(400));
    controller.stop();

    assert_eq!(translator.call_count(), 1);

    // The skipped iterations are counted as skips, not publishes.
    let metrics = controller.metrics();
    assert_eq!(
        metrics.translations_published.load(Ordering::SeqCst),
        1
    );
    assert!(metrics.unchanged_skips.load(Ordering::SeqCst) >= 1);
}

#[test]
fn transient_failures_back_off_and_publish_an_error() {
    let capture = FakeCapture::new();
    // New text each iteration, so every iteration reaches the translator.
    let ocr = FakeOcr::new(OcrScript::Counter);
    let translator = FakeTranslator::new(TranslateScript::Transient);
    let mut controller = controller_with(Arc::clone(&capture), ocr, translator);

    controller.start(region(10)).unwrap();

    let error = wait_for(&controller, Duration::from_secs(2), |r| {
        matches!(r, TranslationResult::Error(_))
    })
    .expect("an error status should be published");
    match error {
        TranslationResult::Error(message) => {
            assert!(message.contains("Details:"), "got: {message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // Let a few failing iterations accumulate, then check their spacing.
    thread::sleep(Duration::from_millis(700));
    controller.stop();

    let grabs = capture.grab_times();
    assert!(grabs.len() >= 2, "expected repeated capture attempts");
    for pair in grabs.windows(2) {
        let gap = pair[1] - pair[0];
        // Backoff is 250ms; anything close to the 20ms cadence means the
        // failure did not slow the loop down.
        assert!(gap >= Duration::from_millis(150), "gap was {gap:?}");
    }
}

#[test]
fn payload_rejection_reports_without_backing_off() {
    let capture = FakeCapture::new();
    let ocr = FakeOcr::new(OcrScript::Counter);
    let translator = FakeTranslator::new(TranslateScript::InvalidPayload);
    let mut controller =
        controller_with(Arc::clone(&capture), ocr, Arc::clone(&translator));

    controller.start(region(10)).unwrap();

    let error = wait_for(&controller, Duration::from_secs(2), |r| {
        matches!(r, TranslationResult::Error(_))
    })
    .expect("a rejection status should be published");
    match error {
        TranslationResult::Error(message) => {
            assert!(message.contains("Translation failed"), "got: {message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    thread::sleep(Duration::from_millis(400));
    controller.stop();

    // Rejections keep the normal cadence; at 20ms we see many iterations
    // where the 250ms backoff would allow only one or two.
    assert!(
        translator.call_count() >= 5,
        "only {} translation attempts",
        translator.call_count()
    );

    // Each rejection lands in the invalid-payload counter, not the
    // recovered-error one.
    let metrics = controller.metrics();
    assert!(metrics.invalid_payloads.load(Ordering::SeqCst) >= 5);
    assert_eq!(metrics.recovered_errors.load(Ordering::SeqCst), 0);
}

#[test]
fn pause_suspends_all_work_and_resume_continues() {
    let capture = FakeCapture::new();
    let ocr = FakeOcr::new(OcrScript::Counter);
    let translator = FakeTranslator::new(TranslateScript::Echo);
    let mut controller =
        controller_with(Arc::clone(&capture), ocr, translator);

    controller.start(region(10)).unwrap();
    wait_for(&controller, Duration::from_secs(2), |r| {
        matches!(r, TranslationResult::Translated(_))
    })
    .expect("loop should publish before the pause");

    controller.pause().unwrap();
    assert_eq!(controller.state(), LoopState::Paused);
    // Let any in-flight iteration drain before sampling the counter.
    thread::sleep(Duration::from_millis(150));
    let grabs_at_pause = capture.grab_times().len();

    thread::sleep(Duration::from_millis(300));
    assert_eq!(
        capture.grab_times().len(),
        grabs_at_pause,
        "paused loop still captured"
    );

    controller.resume().unwrap();
    assert_eq!(controller.state(), LoopState::Running);
    assert_eq!(controller.current_region(), Some(region(10)));

    let deadline = Instant::now() + Duration::from_secs(2);
    while capture.grab_times().len() == grabs_at_pause {
        assert!(Instant::now() < deadline, "loop did not resume capturing");
        thread::sleep(Duration::from_millis(10));
    }

    controller.stop();
}

#[test]
fn change_region_discards_results_from_the_old_region() {
    let capture = FakeCapture::new();
    let ocr = FakeOcr::new(OcrScript::FrameWidth);
    // Slow enough that the first region's translation is still in flight
    // when the region changes out from under it.
    let translator = FakeTranslator::new(TranslateScript::SlowEcho(Duration::from_millis(300)));
    let mut controller = controller_with(capture, ocr, translator);

    controller.start(region(10)).unwrap();
    thread::sleep(Duration::from_millis(100));
    controller.change_region(region(20)).unwrap();
    assert_eq!(controller.current_region(), Some(region(20)));

    // Record everything published from here on.
    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let latest = controller.latest();
        if !seen.contains(&latest) {
            seen.push(latest.clone());
        }
        if matches!(&latest, TranslationResult::Translated(t) if t.contains("width 20")) {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "new region never published; saw {seen:?}"
        );
        thread::sleep(Duration::from_millis(10));
    }
    controller.stop();

    assert!(
        !seen.iter().any(
            |r| matches!(r, TranslationResult::Translated(t) if t.contains("width 10"))
        ),
        "stale result from the old region was published: {seen:?}"
    );
}

#[test]
fn nothing_is_published_after_stop() {
    let capture = FakeCapture::new();
    let ocr = FakeOcr::new(OcrScript::Counter);
    let translator = FakeTranslator::new(TranslateScript::Echo);
    let mut controller = controller_with(capture, ocr, translator);

    controller.start(region(10)).unwrap();
    wait_for(&controller, Duration::from_secs(2), |r| {
        matches!(r, TranslationResult::Translated(_))
    })
    .expect("loop should publish before the stop");

    controller.stop();
    assert_eq!(controller.state(), LoopState::Stopped);

    // A fresh subscription has already seen the current value, so any
    // change from here on is a post-stop publish.
    let rx = controller.subscribe();
    thread::sleep(Duration::from_millis(400));
    assert!(!rx.has_changed().unwrap(), "result changed after stop");
}
