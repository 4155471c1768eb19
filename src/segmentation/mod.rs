mod onnx;
pub mod types;

pub use onnx::OnnxAdapter;
pub use types::{InferenceAdapter, InferenceSession, NamedTensor};

/// Name of the network's image input.
pub const INPUT_NAME: &str = "input";

/// Name of the network's mask output.
pub const OUTPUT_NAME: &str = "output";

/// Square input resolution the network expects.
pub const INPUT_RESOLUTION: usize = 1024;
