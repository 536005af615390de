//! ONNX Runtime backends for the three pipeline models.
//!
//! Available behind the `onnx` cargo feature. Each model wraps an
//! `ort` session behind a mutex (session runs take `&mut`), loaded
//! from a file or from in-memory bytes.
//!
//! Graph I/O names are configuration: exporters produce artifact names
//! like `arg_0.1` or `onnx::Mul_37` for the frame and dt inputs, so
//! the names are supplied per deployment rather than assumed. For the
//! signal model, every session input that is not the frame or dt input
//! is a recurrent-state tensor, and session outputs are ordered as
//! `[signal, state...]` with the state outputs aligned 1:1 with the
//! state inputs.

use crate::error::{RppgError, RppgResult};
use crate::model::{RateModel, SignalModel, SignalOutput, SpectralModel};
use crate::state::RecurrentState;
use crate::types::{FrameTensor, SpectralResult, FRAME_CHANNELS, FRAME_SIZE};
use ndarray::{ArrayD, IxDyn};
use ort::session::{Session, SessionInputValue};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Graph I/O names for the signal model.
#[derive(Debug, Clone)]
pub struct OnnxSignalConfig {
    /// Name of the frame tensor input, shape `(1, 1, 36, 36, 3)`.
    pub frame_input: String,
    /// Name of the scalar delta-time input.
    pub dt_input: String,
}

impl OnnxSignalConfig {
    /// Configuration with explicit input names.
    #[must_use]
    pub fn new<S: Into<String>>(frame_input: S, dt_input: S) -> Self {
        Self {
            frame_input: frame_input.into(),
            dt_input: dt_input.into(),
        }
    }
}

/// Graph I/O names and bin count for the spectral model.
#[derive(Debug, Clone)]
pub struct OnnxSpectralConfig {
    /// Name of the window input, shape `(1, 1, 300)`.
    pub input: String,
    /// Name of the frequency-bin output, shape `(K,)`.
    pub freqs_output: String,
    /// Name of the PSD output, shape `(1, K)`.
    pub psd_output: String,
    /// Frequency bin count K, fixed by the model architecture.
    pub bin_count: usize,
}

impl OnnxSpectralConfig {
    /// Standard export names with an explicit bin count.
    #[must_use]
    pub fn new(bin_count: usize) -> Self {
        Self {
            input: "input".to_string(),
            freqs_output: "freqs".to_string(),
            psd_output: "psd".to_string(),
            bin_count,
        }
    }
}

/// Graph I/O names for the rate model.
#[derive(Debug, Clone)]
pub struct OnnxRateConfig {
    /// Name of the frequency-bin input.
    pub freqs_input: String,
    /// Name of the PSD input.
    pub psd_input: String,
    /// Name of the scalar heart-rate output.
    pub hr_output: String,
}

impl Default for OnnxRateConfig {
    fn default() -> Self {
        Self {
            freqs_input: "freqs".to_string(),
            psd_input: "psd".to_string(),
            hr_output: "hr".to_string(),
        }
    }
}

/// ONNX-backed signal extraction model carrying recurrent state
/// through named session inputs/outputs.
pub struct OnnxSignalModel {
    session: Mutex<Session>,
    config: OnnxSignalConfig,
    /// Session inputs that carry recurrent state, in declared order.
    state_inputs: Vec<String>,
    /// Session outputs: `[signal, state...]` in declared order.
    output_names: Vec<String>,
}

impl OnnxSignalModel {
    /// Load the model from a file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: OnnxSignalConfig) -> RppgResult<Self> {
        let path = path.as_ref();
        info!(?path, "Loading signal model");
        let session = Session::builder()?.commit_from_file(path)?;
        Self::from_session(session, config)
    }

    /// Load the model from in-memory bytes.
    pub fn from_bytes(bytes: &[u8], config: OnnxSignalConfig) -> RppgResult<Self> {
        info!("Loading signal model from bytes");
        let session = Session::builder()?.commit_from_memory(bytes)?;
        Self::from_session(session, config)
    }

    fn from_session(session: Session, config: OnnxSignalConfig) -> RppgResult<Self> {
        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        for required in [&config.frame_input, &config.dt_input] {
            if !input_names.iter().any(|n| n == required) {
                return Err(RppgError::config(format!(
                    "signal model has no input named '{required}'",
                )));
            }
        }

        let state_inputs: Vec<String> = input_names
            .into_iter()
            .filter(|n| *n != config.frame_input && *n != config.dt_input)
            .collect();

        if output_names.len() != state_inputs.len() + 1 {
            return Err(RppgError::config(format!(
                "signal model declares {} outputs for {} state inputs",
                output_names.len(),
                state_inputs.len(),
            )));
        }

        info!(
            state_tensors = state_inputs.len(),
            outputs = ?output_names,
            "Signal model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
            state_inputs,
            output_names,
        })
    }
}

impl SignalModel for OnnxSignalModel {
    fn extract(
        &self,
        frame: &FrameTensor,
        dt_secs: f32,
        state: &RecurrentState,
    ) -> RppgResult<SignalOutput> {
        let mut feeds: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(self.state_inputs.len() + 2);

        // Frame in (1, 1, 36, 36, 3), row-major (y, x, channel).
        let frame_data: Vec<f32> = frame.pixels().iter().copied().collect();
        let frame_shape = vec![1_i64, 1, FRAME_SIZE as i64, FRAME_SIZE as i64, FRAME_CHANNELS as i64];
        feeds.push((
            Cow::from(self.config.frame_input.as_str()),
            make_tensor(frame_shape, frame_data)?.into(),
        ));
        feeds.push((
            Cow::from(self.config.dt_input.as_str()),
            make_tensor(Vec::new(), vec![dt_secs])?.into(),
        ));

        for name in &self.state_inputs {
            let tensor = state.get(name).ok_or_else(|| {
                RppgError::invalid_input(format!("state is missing tensor '{name}'"))
            })?;
            let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
            let data: Vec<f32> = tensor.iter().copied().collect();
            feeds.push((Cow::from(name.as_str()), make_tensor(shape, data)?.into()));
        }

        let mut session = self.session.lock();
        let outputs = session.run(feeds)?;

        let (_, signal_data) = extract_f32(&outputs, &self.output_names[0])?;
        let signal = *signal_data
            .first()
            .ok_or_else(|| RppgError::model("signal output is empty"))?;

        let mut updated = HashMap::with_capacity(self.state_inputs.len());
        for (name, output_name) in self.state_inputs.iter().zip(&self.output_names[1..]) {
            let (dims, data) = extract_f32(&outputs, output_name)?;
            let tensor = ArrayD::from_shape_vec(IxDyn(&dims), data)
                .map_err(|e| RppgError::model(format!("state output '{output_name}': {e}")))?;
            updated.insert(name.clone(), tensor);
        }

        Ok(SignalOutput {
            signal,
            state: RecurrentState::from_tensors(updated),
        })
    }
}

/// ONNX-backed spectral model (Welch-style PSD export).
pub struct OnnxSpectralModel {
    session: Mutex<Session>,
    config: OnnxSpectralConfig,
}

impl OnnxSpectralModel {
    /// Load the model from a file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: OnnxSpectralConfig) -> RppgResult<Self> {
        let path = path.as_ref();
        info!(?path, bin_count = config.bin_count, "Loading spectral model");
        let session = Session::builder()?.commit_from_file(path)?;
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Load the model from in-memory bytes.
    pub fn from_bytes(bytes: &[u8], config: OnnxSpectralConfig) -> RppgResult<Self> {
        let session = Session::builder()?.commit_from_memory(bytes)?;
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }
}

impl SpectralModel for OnnxSpectralModel {
    fn bin_count(&self) -> usize {
        self.config.bin_count
    }

    fn power_spectrum(&self, window: &[f32]) -> RppgResult<SpectralResult> {
        let shape = vec![1_i64, 1, window.len() as i64];
        let feeds: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![(
            Cow::from(self.config.input.as_str()),
            make_tensor(shape, window.to_vec())?.into(),
        )];

        let mut session = self.session.lock();
        let outputs = session.run(feeds)?;

        // freqs is (K,), psd is (1, K); leading unit dims are dropped.
        let (_, freqs) = extract_f32(&outputs, &self.config.freqs_output)?;
        let (_, psd) = extract_f32(&outputs, &self.config.psd_output)?;

        SpectralResult::new(freqs, psd)
    }
}

/// ONNX-backed rate model mapping a spectrum to BPM.
pub struct OnnxRateModel {
    session: Mutex<Session>,
    config: OnnxRateConfig,
}

impl OnnxRateModel {
    /// Load the model from a file.
    pub fn from_file<P: AsRef<Path>>(path: P, config: OnnxRateConfig) -> RppgResult<Self> {
        let path = path.as_ref();
        info!(?path, "Loading rate model");
        let session = Session::builder()?.commit_from_file(path)?;
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    /// Load the model from in-memory bytes.
    pub fn from_bytes(bytes: &[u8], config: OnnxRateConfig) -> RppgResult<Self> {
        let session = Session::builder()?.commit_from_memory(bytes)?;
        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }
}

impl RateModel for OnnxRateModel {
    fn heart_rate(&self, spectrum: &SpectralResult) -> RppgResult<f32> {
        let k = spectrum.bin_count() as i64;
        let feeds: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![
            (
                Cow::from(self.config.freqs_input.as_str()),
                make_tensor(vec![k], spectrum.freqs.clone())?.into(),
            ),
            (
                Cow::from(self.config.psd_input.as_str()),
                make_tensor(vec![1, k], spectrum.psd.clone())?.into(),
            ),
        ];

        let mut session = self.session.lock();
        let outputs = session.run(feeds)?;

        let (_, data) = extract_f32(&outputs, &self.config.hr_output)?;
        data.first()
            .copied()
            .ok_or_else(|| RppgError::model("rate output is empty"))
    }
}

fn make_tensor(shape: Vec<i64>, data: Vec<f32>) -> RppgResult<ort::value::Tensor<f32>> {
    ort::value::Tensor::from_array((shape, data))
        .map_err(|e| RppgError::model(format!("failed to create tensor: {e}")))
}

fn extract_f32(
    outputs: &ort::session::SessionOutputs<'_>,
    name: &str,
) -> RppgResult<(Vec<usize>, Vec<f32>)> {
    let value = outputs
        .get(name)
        .ok_or_else(|| RppgError::model(format!("model produced no output named '{name}'")))?;
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| RppgError::model(format!("output '{name}' is not an f32 tensor: {e}")))?;
    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    Ok((dims, data.to_vec()))
}
