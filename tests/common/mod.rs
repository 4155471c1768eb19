#![allow(dead_code)]

use bgremove::codec::Codec;
use bgremove::config::{Config, ConfigOptions, Device};
use bgremove::mime::{MimeDescriptor, IMAGE_PNG};
use bgremove::segmentation::{InferenceAdapter, InferenceSession, NamedTensor};
use bgremove::ImageTensor;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;

/// Adapter whose sessions predict the same mask value everywhere.
pub struct ConstantMaskAdapter {
    value: f32,
    fail: bool,
    created: AtomicUsize,
    models: Mutex<Vec<Vec<u8>>>,
}

impl ConstantMaskAdapter {
    pub fn new(value: f32) -> Arc<Self> {
        Arc::new(Self {
            value,
            fail: false,
            created: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            value: 0.0,
            fail: true,
            created: AtomicUsize::new(0),
            models: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn models(&self) -> Vec<Vec<u8>> {
        self.models.lock().unwrap().clone()
    }
}

impl InferenceAdapter for ConstantMaskAdapter {
    fn create_session(
        &self,
        model: &[u8],
        _device: Device,
    ) -> anyhow::Result<Arc<dyn InferenceSession>> {
        if self.fail {
            anyhow::bail!("not an onnx graph");
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.models.lock().unwrap().push(model.to_vec());
        Ok(Arc::new(ConstantMaskSession { value: self.value }))
    }
}

struct ConstantMaskSession {
    value: f32,
}

impl InferenceSession for ConstantMaskSession {
    fn run(&self, _inputs: Vec<NamedTensor>, _outputs: &[&str]) -> anyhow::Result<Vec<ArrayD<f32>>> {
        Ok(vec![ArrayD::from_elem(IxDyn(&[1, 1, 4, 4]), self.value)])
    }
}

/// Bytes standing in for model weights.
pub fn model_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

/// Lay out `model` as chunked `/models/small` and `/models/medium` entries
/// under a fresh directory, next to a `resources.json` describing them.
pub fn write_resources(model: &[u8], chunk_len: usize) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let mut chunks = Vec::new();
    for (i, part) in model.chunks(chunk_len).enumerate() {
        let hash = format!("chunk-{i}");
        std::fs::write(dir.path().join(&hash), part).unwrap();
        let start = i * chunk_len;
        chunks.push(format!("\"{hash}\": [{start}, {}]", start + part.len() - 1));
    }
    let entry = format!(
        "{{\"mime\": \"application/octet-stream\", \"size\": {}, \"chunks\": {{{}}}}}",
        model.len(),
        chunks.join(", ")
    );
    let manifest = format!("{{\"/models/small\": {entry}, \"/models/medium\": {entry}}}");
    std::fs::write(dir.path().join("resources.json"), manifest).unwrap();
    dir
}

pub fn options(dir: &Path) -> ConfigOptions {
    ConfigOptions {
        public_path: Some(Url::from_directory_path(dir).unwrap().to_string()),
        ..Default::default()
    }
}

pub fn config(dir: &Path) -> Config {
    options(dir).validate().unwrap()
}

pub fn sample_image() -> ImageTensor<u8> {
    let data = (0..6u8).flat_map(|i| [i * 40, 255 - i * 40, 90, 255]).collect();
    ImageTensor::from_vec(2, 3, 4, data).unwrap()
}

pub fn sample_png() -> Vec<u8> {
    Codec::default()
        .encode(&sample_image(), 1.0, &MimeDescriptor::new(IMAGE_PNG).unwrap())
        .unwrap()
        .bytes
}

pub fn alphas(image: &ImageTensor<u8>) -> Vec<u8> {
    image.data().chunks_exact(4).map(|p| p[3]).collect()
}
