//! Domain types for the rPPG pipeline.

use crate::error::{RppgError, RppgResult};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Height and width of the normalized face crop, in pixels.
pub const FRAME_SIZE: usize = 36;

/// Colour channels per pixel.
pub const FRAME_CHANNELS: usize = 3;

/// A cropped, normalized face-region frame.
///
/// Wraps a `(36, 36, 3)` float tensor in row-major `(y, x, channel)`
/// order with channel values normalized by the upstream face detector.
/// The capture timestamp travels alongside the tensor as a separate
/// argument so a single frame buffer can be reused across calls.
#[derive(Debug, Clone)]
pub struct FrameTensor(Array3<f32>);

impl FrameTensor {
    /// Wrap a pixel tensor, validating its shape.
    pub fn new(pixels: Array3<f32>) -> RppgResult<Self> {
        let shape = pixels.shape();
        if shape != [FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS] {
            return Err(RppgError::shape_mismatch(
                vec![FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS],
                shape.to_vec(),
            ));
        }
        Ok(Self(pixels))
    }

    /// An all-zero frame, useful for warm-up and testing.
    #[must_use]
    pub fn zeros() -> Self {
        Self(Array3::zeros((FRAME_SIZE, FRAME_SIZE, FRAME_CHANNELS)))
    }

    /// The underlying pixel tensor.
    #[must_use]
    pub fn pixels(&self) -> &Array3<f32> {
        &self.0
    }
}

/// Frequency/power-spectrum pair produced by the spectral model.
///
/// `freqs` and `psd` are index-aligned and share a fixed bin count
/// determined by the spectral model's architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralResult {
    /// Frequency of each bin, in Hz.
    pub freqs: Vec<f32>,
    /// Power spectral density per bin.
    pub psd: Vec<f32>,
}

impl SpectralResult {
    /// Create a spectral result, validating that the arrays are
    /// index-aligned.
    pub fn new(freqs: Vec<f32>, psd: Vec<f32>) -> RppgResult<Self> {
        if freqs.len() != psd.len() {
            return Err(RppgError::shape_mismatch(
                vec![freqs.len()],
                vec![psd.len()],
            ));
        }
        Ok(Self { freqs, psd })
    }

    /// Number of frequency bins.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.freqs.len()
    }
}

/// Result of a single `estimate_from_frame` call.
///
/// `signal` is present whenever the frame was accepted and the signal
/// model ran successfully; it feeds the live waveform display.
/// `heart_rate` is present only on frames where the spectral branch
/// fired. A frame dropped by the reentrancy guard, or one whose signal
/// extraction failed, yields both fields `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutput {
    /// Smoothed signal sample for this frame.
    pub signal: Option<f32>,
    /// Corrected and smoothed heart rate, in BPM.
    pub heart_rate: Option<f32>,
}

impl FrameOutput {
    /// Output for a frame that produced nothing (dropped or failed).
    #[must_use]
    pub fn none() -> Self {
        Self {
            signal: None,
            heart_rate: None,
        }
    }
}

/// Append-only log record emitted once per successfully processed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Capture timestamp, monotonic milliseconds.
    pub timestamp_ms: i64,
    /// Smoothed signal sample.
    pub signal: f32,
    /// Heart rate in BPM, present only on trigger firings.
    pub heart_rate: Option<f32>,
}
