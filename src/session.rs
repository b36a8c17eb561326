// src/session.rs
// Countdown, capture, rating, and submission orchestration for the finger rating flow

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::camera::{decode_data_url, VideoSource};
use crate::detector::HandDetector;
use crate::finger_count::count_raised_fingers;
use crate::review::{BackendError, ReviewBackend};
use crate::vision::{preprocess_for_detector, FrameFilter, FrameFilterConfig, PreprocessConfig};

/// Initial countdown value; the still frame is frozen on the fifth tick.
pub const COUNTDOWN_START: u8 = 5;

/// One countdown tick per second.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Where the capture flow currently stands. One tagged value instead of a
/// pile of independent flags, so impossible combinations cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePhase {
    /// Nothing in progress; capture can be triggered.
    Idle,
    /// Counting down; value is the seconds remaining.
    Countdown(u8),
    /// Freezing a still frame from the live feed.
    Capturing,
    /// Captured frame sent to the rating endpoint, response pending.
    RatingPending,
    /// Rating received and held alongside the captured frame.
    RatingReady { rating: u8 },
    /// Rating endpoint failed; the captured frame is retained but a new
    /// capture is required to obtain a rating.
    RatingFailed,
}

/// Externally observable session activity, the library-level analog of
/// frontend events. Alerts carry the user-visible message for the failure
/// cases; nothing in the session panics or retries on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Latest raised-finger count from the continuous detection loop.
    FingerCount(u8),
    /// Countdown updated; value is the seconds remaining.
    CountdownTick(u8),
    /// Rating endpoint accepted the captured frame.
    RatingReady(u8),
    /// Submission endpoint accepted the review; carries its message.
    SubmissionAccepted(String),
    /// A user-visible error message.
    Alert(String),
}

/// Tuning for a capture session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub frame_filter: FrameFilterConfig,
    pub preprocess: PreprocessConfig,
}

struct SessionInner {
    phase: CapturePhase,
    captured_image: Option<Vec<u8>>,
    remark: String,
    submitting: bool,
}

/// Orchestrates the finger-rating capture flow against three collaborators:
/// a live video source, a hand-landmark detector, and the review backend.
///
/// Two independent activities run concurrently: the continuous detection
/// loop (started with [`CaptureSession::start_detection`]) which keeps the
/// finger count fresh for as long as the session is open, and the
/// countdown/capture/rating flow triggered by [`CaptureSession::start_capture`].
/// They share the video source read-only; only the capture step freezes a
/// frame from it.
pub struct CaptureSession<S, D, B> {
    camera: Arc<S>,
    detector: Arc<D>,
    backend: Arc<B>,
    config: SessionConfig,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    detection_running: Arc<AtomicBool>,
    /// Bumped on every capture attempt and on close, so responses arriving
    /// for a superseded attempt (or after teardown) are discarded instead
    /// of mutating state.
    generation: Arc<AtomicU64>,
}

impl<S, D, B> CaptureSession<S, D, B>
where
    S: VideoSource + 'static,
    D: HandDetector + 'static,
    B: ReviewBackend + 'static,
{
    /// Creates a session and the receiving end of its event stream.
    pub fn new(
        camera: Arc<S>,
        detector: Arc<D>,
        backend: Arc<B>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();

        let session = Self {
            camera,
            detector,
            backend,
            config,
            inner: Arc::new(Mutex::new(SessionInner {
                phase: CapturePhase::Idle,
                captured_image: None,
                remark: String::new(),
                submitting: false,
            })),
            events,
            detection_running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        };

        (session, receiver)
    }

    pub fn phase(&self) -> CapturePhase {
        self.inner.lock().unwrap().phase.clone()
    }

    pub fn has_captured_image(&self) -> bool {
        self.inner.lock().unwrap().captured_image.is_some()
    }

    pub fn remark(&self) -> String {
        self.inner.lock().unwrap().remark.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.lock().unwrap().submitting
    }

    /// Starts the continuous landmark detection loop.
    ///
    /// Waits for the video source to report ready, then feeds every frame
    /// that passes the frame filter through the detector and emits a
    /// [`SessionEvent::FingerCount`] per detected hand. Runs until the
    /// session is closed or the frame stream ends. Calling this while the
    /// loop is already running is a no-op.
    pub fn start_detection(&self) {
        if self.detection_running.swap(true, Ordering::SeqCst) {
            debug!("detection loop already running");
            return;
        }

        let running = Arc::clone(&self.detection_running);
        let camera = Arc::clone(&self.camera);
        let detector = Arc::clone(&self.detector);
        let events = self.events.clone();
        let filter_config = self.config.frame_filter.clone();
        let preprocess_config = self.config.preprocess.clone();

        tokio::spawn(async move {
            if let Err(e) = camera.ready().await {
                warn!("video source failed to become ready: {}", e);
                running.store(false, Ordering::SeqCst);
                return;
            }
            info!("hand detection loop started");

            let mut filter = FrameFilter::new(filter_config);
            while running.load(Ordering::SeqCst) {
                let Some(frame) = camera.next_frame().await else {
                    break;
                };

                if !filter.evaluate(&frame).should_process {
                    continue;
                }

                let prepared = preprocess_for_detector(&frame, &preprocess_config);
                match detector.detect(&prepared).await {
                    Ok(Some(hand)) => match count_raised_fingers(&hand.landmarks) {
                        Ok(count) => {
                            let _ = events.send(SessionEvent::FingerCount(count));
                        }
                        Err(e) => warn!("detector produced unusable landmarks: {}", e),
                    },
                    Ok(None) => {}
                    Err(e) => debug!("landmark detection failed: {}", e),
                }
            }

            running.store(false, Ordering::SeqCst);
            let stats = filter.statistics();
            debug!(
                "detection loop stopped after {} frames ({} skipped)",
                stats.total_frames, stats.skipped_frames
            );
        });
    }

    /// Triggers the five-second countdown, then freezes a still frame and
    /// sends it to the rating endpoint.
    ///
    /// Fire-and-forget: progress and failures surface through the event
    /// stream. Triggering while a countdown or capture is already in
    /// progress is ignored, so only one countdown sequence ever runs at a
    /// time. Triggering while a rating response is pending supersedes that
    /// attempt; its late response is discarded.
    pub fn start_capture(&self) {
        {
            let mut state = self.inner.lock().unwrap();
            match state.phase {
                CapturePhase::Countdown(_) | CapturePhase::Capturing => {
                    debug!("capture already in progress; ignoring trigger");
                    return;
                }
                _ => {}
            }
            state.phase = CapturePhase::Countdown(COUNTDOWN_START);
        }

        let attempt = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self
            .events
            .send(SessionEvent::CountdownTick(COUNTDOWN_START));
        info!("capture countdown started");

        let inner = Arc::clone(&self.inner);
        let camera = Arc::clone(&self.camera);
        let backend = Arc::clone(&self.backend);
        let generation = Arc::clone(&self.generation);
        let events = self.events.clone();

        tokio::spawn(async move {
            let mut remaining = COUNTDOWN_START;
            while remaining > 0 {
                sleep(TICK_INTERVAL).await;
                if generation.load(Ordering::SeqCst) != attempt {
                    debug!("countdown superseded; stopping");
                    return;
                }
                remaining -= 1;
                if remaining > 0 {
                    inner.lock().unwrap().phase = CapturePhase::Countdown(remaining);
                    let _ = events.send(SessionEvent::CountdownTick(remaining));
                }
            }

            inner.lock().unwrap().phase = CapturePhase::Capturing;

            let Some(still) = camera.capture_still() else {
                inner.lock().unwrap().phase = CapturePhase::Idle;
                warn!("video source had no frame available at capture time");
                let _ = events.send(SessionEvent::Alert(
                    "Webcam image could not be captured.".to_string(),
                ));
                return;
            };

            let image = match decode_data_url(&still) {
                Ok(bytes) => bytes,
                Err(e) => {
                    inner.lock().unwrap().phase = CapturePhase::Idle;
                    warn!("still capture was undecodable: {}", e);
                    let _ = events.send(SessionEvent::Alert(
                        "Webcam image could not be captured.".to_string(),
                    ));
                    return;
                }
            };

            {
                let mut state = inner.lock().unwrap();
                state.captured_image = Some(image.clone());
                state.phase = CapturePhase::RatingPending;
            }

            match backend.rate(image).await {
                Ok(rating) => {
                    if generation.load(Ordering::SeqCst) != attempt {
                        debug!("discarding stale rating response");
                        return;
                    }
                    inner.lock().unwrap().phase = CapturePhase::RatingReady { rating };
                    info!("rating received: {}", rating);
                    let _ = events.send(SessionEvent::RatingReady(rating));
                }
                Err(e) => {
                    if generation.load(Ordering::SeqCst) != attempt {
                        debug!("discarding stale rating failure");
                        return;
                    }
                    inner.lock().unwrap().phase = CapturePhase::RatingFailed;
                    warn!("rating request failed: {}", e);
                    let message = match e {
                        BackendError::Rejected(_) => "Failed to detect fingers. Please try again.",
                        BackendError::Transport(_) => "Server error while detecting fingers.",
                    };
                    let _ = events.send(SessionEvent::Alert(message.to_string()));
                }
            }
        });
    }

    /// Submits the held captured image together with `remark` (which may be
    /// empty) to the review backend.
    ///
    /// Fails immediately with an alert when no captured image is held.
    /// While a submission is in flight further submissions are ignored. On
    /// success the session fully resets (image, rating, and remark are all
    /// cleared, and any rating response still pending for the submitted
    /// image is invalidated); on failure everything is retained so the user
    /// can retry.
    pub fn submit_review(&self, remark: impl Into<String>) {
        let remark = remark.into();

        let image = {
            let mut state = self.inner.lock().unwrap();
            if state.submitting {
                debug!("submission already in flight; ignoring");
                return;
            }
            match state.captured_image.clone() {
                Some(image) => {
                    state.submitting = true;
                    state.remark = remark.clone();
                    image
                }
                None => {
                    drop(state);
                    let _ = self.events.send(SessionEvent::Alert(
                        "No image available to submit.".to_string(),
                    ));
                    return;
                }
            }
        };

        let attempt = self.generation.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let generation = Arc::clone(&self.generation);
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = backend.submit(image, remark).await;

            let mut state = inner.lock().unwrap();
            state.submitting = false;
            if generation.load(Ordering::SeqCst) != attempt {
                debug!("discarding stale submission result");
                return;
            }

            match result {
                Ok(message) => {
                    state.captured_image = None;
                    state.remark.clear();
                    state.phase = CapturePhase::Idle;
                    drop(state);
                    // The reset session must stay reset: a rating response
                    // still pending for the submitted image is now stale.
                    generation.fetch_add(1, Ordering::SeqCst);
                    info!("review submitted");
                    let _ = events.send(SessionEvent::SubmissionAccepted(message));
                }
                Err(e) => {
                    drop(state);
                    warn!("review submission failed: {}", e);
                    let message = match e {
                        BackendError::Rejected(_) => "Failed to submit review.",
                        BackendError::Transport(_) => {
                            "An error occurred while submitting the review."
                        }
                    };
                    let _ = events.send(SessionEvent::Alert(message.to_string()));
                }
            }
        });
    }

    /// Tears the session down: stops the detection loop, stops the video
    /// source's media tracks, and invalidates in-flight network calls so
    /// their late results cannot mutate state. Safe to call more than once.
    pub fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.detection_running.store(false, Ordering::SeqCst);
        self.camera.stop();
        info!("capture session closed");
    }
}
