//! Recurrent state carried across signal-model calls.
//!
//! The signal model encodes temporal context in a set of named
//! tensors that it consumes and re-emits on every call. The key set
//! is established once, when the serialized initial-state document is
//! loaded at construction, and is never renegotiated: every wholesale
//! replacement is validated against it, and a failed model call leaves
//! the state exactly as it was.

use crate::error::{RppgError, RppgResult};
use ndarray::{ArrayD, IxDyn};
use serde_json::Value;
use std::collections::HashMap;

/// Named tensor map whose key set is fixed for the pipeline lifetime.
#[derive(Debug, Clone)]
pub struct RecurrentState {
    tensors: HashMap<String, ArrayD<f32>>,
}

impl RecurrentState {
    /// Build a state directly from named tensors.
    #[must_use]
    pub fn from_tensors(tensors: HashMap<String, ArrayD<f32>>) -> Self {
        Self { tensors }
    }

    /// Load the initial state from a serialized JSON document mapping
    /// tensor names to arbitrarily nested numeric arrays.
    ///
    /// The nesting depth of each entry determines its tensor rank;
    /// ragged nesting is rejected. This fixes both the initial values
    /// and the permanent key/shape contract of the state.
    pub fn from_json(json: &str) -> RppgResult<Self> {
        let parsed: Value = serde_json::from_str(json)?;
        let map = parsed
            .as_object()
            .ok_or_else(|| RppgError::state_load("top-level value must be an object"))?;

        let mut tensors = HashMap::with_capacity(map.len());
        for (name, value) in map {
            let shape = nested_shape(value)
                .map_err(|e| RppgError::state_load(format!("tensor '{name}': {e}")))?;
            let mut flat = Vec::with_capacity(shape.iter().product());
            flatten_into(value, &mut flat)
                .map_err(|e| RppgError::state_load(format!("tensor '{name}': {e}")))?;
            let tensor = ArrayD::from_shape_vec(IxDyn(&shape), flat).map_err(|e| {
                RppgError::state_load(format!("tensor '{name}' shape error: {e}"))
            })?;
            tensors.insert(name.clone(), tensor);
        }

        Ok(Self { tensors })
    }

    /// Replace the entire state with a model-produced update.
    ///
    /// The update must carry exactly the keys established at
    /// construction; otherwise the call fails and `self` is left
    /// untouched (all-or-nothing).
    pub fn replace(&mut self, update: RecurrentState) -> RppgResult<()> {
        if update.tensors.len() != self.tensors.len()
            || !update.tensors.keys().all(|k| self.tensors.contains_key(k))
        {
            let mut expected: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
            let mut actual: Vec<&str> = update.tensors.keys().map(String::as_str).collect();
            expected.sort_unstable();
            actual.sort_unstable();
            return Err(RppgError::invalid_input(format!(
                "state key set changed: expected {expected:?}, got {actual:?}",
            )));
        }
        self.tensors = update.tensors;
        Ok(())
    }

    /// Tensor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArrayD<f32>> {
        self.tensors.get(name)
    }

    /// Whether a tensor with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Iterator over `(name, tensor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of named tensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether the state holds no tensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Infer the shape of a nested JSON array, rejecting ragged nesting.
fn nested_shape(value: &Value) -> Result<Vec<usize>, String> {
    match value {
        Value::Number(_) => Ok(Vec::new()),
        Value::Array(items) => {
            let Some(first) = items.first() else {
                return Ok(vec![0]);
            };
            let inner = nested_shape(first)?;
            for item in &items[1..] {
                if nested_shape(item)? != inner {
                    return Err("ragged nested array".to_string());
                }
            }
            let mut shape = Vec::with_capacity(inner.len() + 1);
            shape.push(items.len());
            shape.extend(inner);
            Ok(shape)
        }
        other => Err(format!("unexpected value: {other}")),
    }
}

/// Flatten a nested JSON array of numbers in row-major order.
fn flatten_into(value: &Value, out: &mut Vec<f32>) -> Result<(), String> {
    match value {
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| format!("non-finite number: {n}"))?;
            out.push(v as f32);
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out)?;
            }
            Ok(())
        }
        other => Err(format!("unexpected value: {other}")),
    }
}
