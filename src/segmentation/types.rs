use crate::config::Device;
use anyhow::Result;
use ndarray::ArrayD;
use std::sync::Arc;

/// Named float tensor passed to or returned from a session.
pub type NamedTensor = (String, ArrayD<f32>);

/// Trait for inference runtimes
/// Allows swapping the ONNX Runtime backend for a fake in tests, or another
/// runtime entirely
pub trait InferenceAdapter: Send + Sync {
    /// Build a session from serialized model bytes
    ///
    /// # Arguments
    /// * `model` - Model file contents (e.g. an ONNX graph)
    /// * `device` - Preferred execution device; GPU falls back to CPU when
    ///   no GPU provider is available
    fn create_session(&self, model: &[u8], device: Device) -> Result<Arc<dyn InferenceSession>>;
}

/// A loaded model, shared read-only between concurrent pipeline invocations
pub trait InferenceSession: Send + Sync {
    /// Run the model
    ///
    /// # Arguments
    /// * `inputs` - Named input tensors
    /// * `outputs` - Names of the outputs to return, in order
    ///
    /// # Returns
    /// * One tensor per requested output name
    fn run(&self, inputs: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<ArrayD<f32>>>;
}
