use super::types::{InferenceAdapter, InferenceSession, NamedTensor};
use crate::config::Device;
use anyhow::{anyhow, Context, Result};
use ndarray::{ArrayD, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use std::sync::{Arc, Mutex};

/// ONNX Runtime backed [`InferenceAdapter`]
pub struct OnnxAdapter {
    intra_threads: usize,
}

impl OnnxAdapter {
    pub fn new(intra_threads: usize) -> Self {
        Self { intra_threads }
    }
}

impl Default for OnnxAdapter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl InferenceAdapter for OnnxAdapter {
    fn create_session(&self, model: &[u8], device: Device) -> Result<Arc<dyn InferenceSession>> {
        tracing::info!(
            "Creating ONNX session from {} byte model on {:?}",
            model.len(),
            device
        );

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?;

        if device == Device::Gpu {
            // Registration failures are logged by ort and inference stays on CPU
            builder = builder.with_execution_providers([CUDAExecutionProvider::default().build()])?;
        }

        let session = builder
            .commit_from_memory(model)
            .context("Failed to load model")?;

        tracing::info!("ONNX session created successfully");
        Ok(Arc::new(OnnxSession {
            session: Mutex::new(session),
        }))
    }
}

/// `Session::run` needs exclusive access, so concurrent callers take turns.
struct OnnxSession {
    session: Mutex<Session>,
}

impl InferenceSession for OnnxSession {
    fn run(&self, inputs: Vec<NamedTensor>, outputs: &[&str]) -> Result<Vec<ArrayD<f32>>> {
        let _span = tracing::debug_span!("inference").entered();

        let mut feeds: Vec<(String, DynValue)> = Vec::with_capacity(inputs.len());
        for (name, array) in inputs {
            let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
            let data = if array.is_standard_layout() {
                array.into_raw_vec_and_offset().0
            } else {
                array.iter().copied().collect()
            };
            let tensor = Tensor::from_array((shape, data))
                .with_context(|| format!("Failed to build input tensor {name}"))?;
            feeds.push((name, tensor.into_dyn()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let results = session.run(feeds).context("Failed to run inference")?;

        outputs
            .iter()
            .map(|name| {
                let value = results
                    .get(*name)
                    .ok_or_else(|| anyhow!("Model has no output named {name}"))?;
                let (shape, data) = value.try_extract_tensor::<f32>()?;
                let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
                Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
            })
            .collect()
    }
}
