//! Model seams for the three numeric stages.
//!
//! The pipeline consumes its models as opaque pure functions with
//! fixed named I/O contracts. Each stage is a trait so the estimator
//! can run against an ONNX backend in production (see [`crate::onnx`])
//! and against synthetic models in tests and benchmarks.

use crate::error::RppgResult;
use crate::state::RecurrentState;
use crate::types::{FrameTensor, SpectralResult};

/// Output of one signal-model invocation.
#[derive(Debug, Clone)]
pub struct SignalOutput {
    /// Raw scalar signal sample for this frame.
    pub signal: f32,
    /// Updated recurrent state. Must carry the same key set that was
    /// consumed; the estimator rejects the frame otherwise.
    pub state: RecurrentState,
}

/// Per-frame signal extraction model.
///
/// A pure, deterministic function of `(frame, dt, state)`. The model
/// must not retain references to its inputs between calls; all
/// temporal context travels through the returned state.
pub trait SignalModel: Send + Sync {
    /// Extract one raw signal sample from a frame.
    fn extract(
        &self,
        frame: &FrameTensor,
        dt_secs: f32,
        state: &RecurrentState,
    ) -> RppgResult<SignalOutput>;
}

/// Spectral model transforming the full sample window into a
/// frequency/power-spectrum pair. Pure and stateless across calls.
pub trait SpectralModel: Send + Sync {
    /// Number of frequency bins this model produces. Fixed by the
    /// model's architecture and supplied alongside it, never assumed.
    fn bin_count(&self) -> usize;

    /// Compute the power spectrum of an ordered sample window.
    fn power_spectrum(&self, window: &[f32]) -> RppgResult<SpectralResult>;
}

/// Rate model mapping a power spectrum to a raw heart rate in BPM,
/// computed under the model's nominal 30 fps training assumption.
pub trait RateModel: Send + Sync {
    /// Map a spectrum to a heart-rate value.
    fn heart_rate(&self, spectrum: &SpectralResult) -> RppgResult<f32>;
}
