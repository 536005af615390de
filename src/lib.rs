//! # rPPG Vitals
//!
//! Real-time heart-rate estimation from a stream of cropped,
//! normalized face-region video frames (remote photoplethysmography),
//! without contact sensors.
//!
//! # Architecture
//!
//! Every accepted frame flows through a fixed pipeline:
//!
//! 1. **Signal extraction** ([`SignalModel`]): a recurrent numeric
//!    model maps the 36×36×3 frame plus a frame-rate-adaptive
//!    delta-time to one raw scalar signal sample, carrying its hidden
//!    state forward through [`RecurrentState`].
//! 2. **Signal smoothing** ([`Kalman1d`], instance A): a light causal
//!    smoother over the raw signal, feeding the live waveform.
//! 3. **Temporal window** ([`SampleWindow`]): the most recent 300
//!    smoothed samples and their capture timestamps, in lockstep.
//! 4. **Trigger** ([`TriggerCounter`]): the spectral branch fires once
//!    300 frames have been accepted and every 30 frames thereafter
//!    (counter starts at 60, fires at ≥300, rearms to 270).
//! 5. **Spectral estimation + rate mapping** ([`SpectralModel`],
//!    [`RateModel`]): the windowed signal becomes a power spectrum and
//!    then a raw BPM value, rescaled from the models' nominal 30 fps
//!    assumption to the measured average frame rate.
//! 6. **Rate smoothing** ([`Kalman1d`], instance B): a more heavily
//!    damped smoother over the corrected heart rate.
//!
//! A single atomic busy flag in [`HeartRateEstimator`] admits at most
//! one in-flight execution; overlapping frames are dropped, never
//! queued. Model failures abort only the current frame's output and
//! leave all pipeline state untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use rppg_vitals::{
//!     CsvSink, HeartRateEstimator,
//!     OnnxRateConfig, OnnxRateModel,
//!     OnnxSignalConfig, OnnxSignalModel,
//!     OnnxSpectralConfig, OnnxSpectralModel,
//! };
//!
//! let signal = OnnxSignalModel::from_file(
//!     "signal.onnx",
//!     OnnxSignalConfig::new("arg_0.1", "onnx::Mul_37"),
//! )?;
//! let spectral = OnnxSpectralModel::from_file("welch.onnx", OnnxSpectralConfig::new(64))?;
//! let rate = OnnxRateModel::from_file("hr.onnx", OnnxRateConfig::default())?;
//!
//! let estimator = HeartRateEstimator::new(
//!     Box::new(signal),
//!     Box::new(spectral),
//!     Box::new(rate),
//!     &std::fs::read_to_string("initial_state.json")?,
//!     Box::new(CsvSink::open("hr_log.csv")?),
//! )?;
//!
//! // Per captured frame, on the processing thread:
//! let output = estimator.estimate_from_frame(&frame, now_ms);
//! if let Some(signal) = output.signal {
//!     waveform.push(signal);
//! }
//! if let Some(bpm) = output.heart_rate {
//!     display.show_heart_rate(bpm);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod estimator;
pub mod kalman;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod sink;
pub mod state;
pub mod types;
pub mod window;

pub use error::{RppgError, RppgResult};
pub use estimator::{
    correct_rate, HeartRateEstimator, DEFAULT_DT_SECS, MIN_DT_SECS, NOMINAL_FPS,
};
pub use kalman::Kalman1d;
pub use model::{RateModel, SignalModel, SignalOutput, SpectralModel};
#[cfg(feature = "onnx")]
pub use onnx::{
    OnnxRateConfig, OnnxRateModel, OnnxSignalConfig, OnnxSignalModel, OnnxSpectralConfig,
    OnnxSpectralModel,
};
pub use sink::{CsvSink, NullSink, RecordSink};
pub use state::RecurrentState;
pub use types::{
    FrameOutput, FrameRecord, FrameTensor, SpectralResult, FRAME_CHANNELS, FRAME_SIZE,
};
pub use window::{SampleWindow, TriggerCounter, WINDOW_CAPACITY};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
