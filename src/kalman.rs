//! Scalar Kalman filter used as a causal smoother.
//!
//! Fixed, non-adaptive noise parameters make this behave as a
//! recursive exponential-style smoother rather than a full tracker.
//! Two independent instances exist in the pipeline: one over the raw
//! signal (light damping) and one over the corrected heart rate
//! (heavier damping). They never share state.

/// One-dimensional Kalman filter with fixed noise parameters.
#[derive(Debug, Clone)]
pub struct Kalman1d {
    process_noise: f32,
    measurement_noise: f32,
    estimate: f32,
    estimate_error: f32,
}

impl Kalman1d {
    /// Create a filter seeded with an initial estimate.
    ///
    /// - `process_noise`: variance added per step before measuring.
    /// - `measurement_noise`: variance attributed to each measurement.
    /// - `initial_estimate`: usually the first observed value.
    /// - `initial_error`: initial estimate error.
    #[must_use]
    pub fn new(
        process_noise: f32,
        measurement_noise: f32,
        initial_estimate: f32,
        initial_error: f32,
    ) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: initial_estimate,
            estimate_error: initial_error,
        }
    }

    /// Fold in one measurement and return the updated estimate.
    ///
    /// O(1), allocation-free, deterministic.
    pub fn update(&mut self, measurement: f32) -> f32 {
        let prediction_error = self.estimate_error + self.process_noise;
        let gain = prediction_error / (prediction_error + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.estimate_error = (1.0 - gain) * prediction_error;
        self.estimate
    }

    /// Current estimate without folding in a new measurement.
    #[must_use]
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    /// Current estimate error.
    #[must_use]
    pub fn estimate_error(&self) -> f32 {
        self.estimate_error
    }
}
