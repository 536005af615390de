//! The streaming heart-rate estimation pipeline.
//!
//! One [`HeartRateEstimator`] instance is owned per recording session.
//! Every accepted frame runs the signal model and feeds the sliding
//! window; roughly every 30 accepted frames (once warmed up) the
//! spectral branch fires and produces a corrected, smoothed heart-rate
//! estimate.
//!
//! Concurrency model: a single atomic busy flag admits at most one
//! in-flight execution. A caller that loses the compare-and-swap race
//! gets an empty output immediately; the frame is dropped, never
//! queued. All mutable state is touched only inside the guarded
//! critical section, so no further locking discipline is needed.

use crate::kalman::Kalman1d;
use crate::model::{RateModel, SignalModel, SpectralModel};
use crate::sink::RecordSink;
use crate::state::RecurrentState;
use crate::types::{FrameOutput, FrameRecord, FrameTensor};
use crate::window::{SampleWindow, TriggerCounter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Frame rate the rate model was trained against.
pub const NOMINAL_FPS: f64 = 30.0;

/// Delta-time assumed for the first frame, in seconds.
pub const DEFAULT_DT_SECS: f32 = 1.0 / 30.0;

/// Lower clamp on delta-time, in seconds. Bursty capture callbacks can
/// deliver frames a millisecond apart; the signal model never sees a
/// step shorter than 1/90 s.
pub const MIN_DT_SECS: f32 = 1.0 / 90.0;

const SIGNAL_PROCESS_NOISE: f32 = 1.0;
const SIGNAL_MEASUREMENT_NOISE: f32 = 0.5;
const RATE_PROCESS_NOISE: f32 = 1.0;
const RATE_MEASUREMENT_NOISE: f32 = 2.0;
const INITIAL_ESTIMATE_ERROR: f32 = 1.0;

/// Rescale a raw heart rate from the nominal 30 fps assumption to the
/// measured average frame rate.
#[must_use]
pub fn correct_rate(raw_bpm: f32, average_fps: f64) -> f32 {
    raw_bpm * (average_fps / NOMINAL_FPS) as f32
}

/// Streaming rPPG heart-rate estimator.
///
/// Owns the three models, the recurrent state, the sample window, the
/// trigger counter, both Kalman smoothers, and the record sink. All of
/// this state is session-scoped: it is reset only by constructing a new
/// estimator.
pub struct HeartRateEstimator {
    busy: AtomicBool,
    inner: Mutex<Inner>,
}

struct Inner {
    signal_model: Box<dyn SignalModel>,
    spectral_model: Box<dyn SpectralModel>,
    rate_model: Box<dyn RateModel>,
    state: RecurrentState,
    window: SampleWindow,
    trigger: TriggerCounter,
    signal_filter: Option<Kalman1d>,
    rate_filter: Option<Kalman1d>,
    last_timestamp_ms: Option<i64>,
    sink: Box<dyn RecordSink>,
}

/// Clears the busy flag on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl HeartRateEstimator {
    /// Create an estimator from its three models, the serialized
    /// initial-state document, and a record sink.
    pub fn new(
        signal_model: Box<dyn SignalModel>,
        spectral_model: Box<dyn SpectralModel>,
        rate_model: Box<dyn RateModel>,
        initial_state_json: &str,
        sink: Box<dyn RecordSink>,
    ) -> crate::error::RppgResult<Self> {
        let state = RecurrentState::from_json(initial_state_json)?;
        Ok(Self::with_state(
            signal_model,
            spectral_model,
            rate_model,
            state,
            sink,
        ))
    }

    /// Create an estimator from an already-loaded recurrent state.
    #[must_use]
    pub fn with_state(
        signal_model: Box<dyn SignalModel>,
        spectral_model: Box<dyn SpectralModel>,
        rate_model: Box<dyn RateModel>,
        state: RecurrentState,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            busy: AtomicBool::new(false),
            inner: Mutex::new(Inner {
                signal_model,
                spectral_model,
                rate_model,
                state,
                window: SampleWindow::new(),
                trigger: TriggerCounter::new(),
                signal_filter: None,
                rate_filter: None,
                last_timestamp_ms: None,
                sink,
            }),
        }
    }

    /// Process one frame captured at `now_ms` (monotonic milliseconds).
    ///
    /// Returns the smoothed signal sample for the live waveform and,
    /// on trigger firings only, the corrected and smoothed heart rate.
    /// If another execution is in flight, the frame is silently dropped
    /// and an empty output returned without blocking. Model failures
    /// are logged, mutate nothing, and likewise yield an empty output;
    /// no error ever reaches the capture thread.
    pub fn estimate_from_frame(&self, frame: &FrameTensor, now_ms: i64) -> FrameOutput {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return FrameOutput::none();
        }
        let _guard = BusyGuard(&self.busy);
        self.inner.lock().process(frame, now_ms)
    }

    /// Number of samples currently in the temporal window.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.inner.lock().window.len()
    }

    /// Whether the window has warmed up to its full 300 samples.
    #[must_use]
    pub fn is_warmed_up(&self) -> bool {
        self.inner.lock().window.is_full()
    }
}

impl Inner {
    fn process(&mut self, frame: &FrameTensor, now_ms: i64) -> FrameOutput {
        let dt_secs = match self.last_timestamp_ms {
            None => DEFAULT_DT_SECS,
            Some(prev) => (((now_ms - prev) as f32) / 1000.0).max(MIN_DT_SECS),
        };

        // Nothing below mutates until the model call has succeeded and
        // its state update has been validated, so a failed frame is a
        // no-op for windows, counter, timestamps, and recurrent state.
        let extracted = match self.signal_model.extract(frame, dt_secs, &self.state) {
            Ok(output) => output,
            Err(err) => {
                warn!(%err, "signal model failed, frame skipped");
                return FrameOutput::none();
            }
        };
        if let Err(err) = self.state.replace(extracted.state) {
            warn!(%err, "signal model violated state contract, frame skipped");
            return FrameOutput::none();
        }

        self.last_timestamp_ms = Some(now_ms);

        let smoothed = smooth(
            &mut self.signal_filter,
            SIGNAL_PROCESS_NOISE,
            SIGNAL_MEASUREMENT_NOISE,
            extracted.signal,
        );
        self.window.push(smoothed, now_ms);
        self.trigger.tick();

        let heart_rate = if self.trigger.should_fire(self.window.is_full()) {
            self.trigger.rearm();
            self.run_spectral_branch()
        } else {
            None
        };

        let record = FrameRecord {
            timestamp_ms: now_ms,
            signal: smoothed,
            heart_rate,
        };
        if let Err(err) = self.sink.append(&record) {
            warn!(%err, "record sink append failed");
        }

        FrameOutput {
            signal: Some(smoothed),
            heart_rate,
        }
    }

    fn run_spectral_branch(&mut self) -> Option<f32> {
        let started = Instant::now();
        let samples = self.window.ordered_samples();

        let spectrum = match self.spectral_model.power_spectrum(&samples) {
            Ok(spectrum) => spectrum,
            Err(err) => {
                warn!(%err, "spectral model failed");
                return None;
            }
        };
        if spectrum.bin_count() != self.spectral_model.bin_count() {
            warn!(
                expected = self.spectral_model.bin_count(),
                actual = spectrum.bin_count(),
                "spectral model produced unexpected bin count"
            );
            return None;
        }

        let raw_bpm = match self.rate_model.heart_rate(&spectrum) {
            Ok(bpm) => bpm,
            Err(err) => {
                warn!(%err, "rate model failed");
                return None;
            }
        };

        let corrected = match self.window.average_fps() {
            Some(fps) => correct_rate(raw_bpm, fps),
            None => raw_bpm,
        };
        let smoothed = smooth(
            &mut self.rate_filter,
            RATE_PROCESS_NOISE,
            RATE_MEASUREMENT_NOISE,
            corrected,
        );

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bpm = smoothed,
            "spectral branch fired"
        );
        Some(smoothed)
    }
}

/// Seed the filter with the first observed value, update thereafter.
fn smooth(
    filter: &mut Option<Kalman1d>,
    process_noise: f32,
    measurement_noise: f32,
    value: f32,
) -> f32 {
    match filter {
        Some(f) => f.update(value),
        None => {
            *filter = Some(Kalman1d::new(
                process_noise,
                measurement_noise,
                value,
                INITIAL_ESTIMATE_ERROR,
            ));
            value
        }
    }
}
