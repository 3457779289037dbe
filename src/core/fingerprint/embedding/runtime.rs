//! ONNX Runtime session creation and execution provider selection.

use crate::error::ModelError;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Where inference runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Provider {
    /// Best accelerator available, CPU otherwise
    #[default]
    Auto,
    /// Force CPU
    Cpu,
    Cuda,
    TensorRt,
    CoreMl,
    Xnnpack,
}

/// Build a session for `model_path` on the requested provider.
///
/// An unavailable accelerator is logged and the session falls back to CPU.
pub fn create_session(model_path: &Path, provider: Provider) -> Result<Session, ModelError> {
    let load_error = |e: ort::Error| ModelError::Load {
        path: model_path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut builder = Session::builder().map_err(load_error)?;

    match provider {
        Provider::Auto => register_best(&mut builder),
        Provider::Cpu => info!("Using CPU execution provider (forced)"),
        Provider::Cuda => {
            if !try_cuda(&mut builder) {
                warn!("CUDA requested but unavailable, falling back to CPU");
            }
        }
        Provider::TensorRt => {
            if !try_tensorrt(&mut builder) {
                warn!("TensorRT requested but unavailable, falling back to CPU");
            }
        }
        Provider::CoreMl => {
            #[cfg(target_os = "macos")]
            if !try_coreml(&mut builder) {
                warn!("CoreML requested but unavailable, falling back to CPU");
            }
            #[cfg(not(target_os = "macos"))]
            warn!("CoreML only available on macOS, falling back to CPU");
        }
        Provider::Xnnpack => {
            if !try_xnnpack(&mut builder) {
                warn!("XNNPACK requested but unavailable, falling back to CPU");
            }
        }
    }

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(load_error)?
        .commit_from_file(model_path)
        .map_err(load_error)
}

fn register_best(builder: &mut SessionBuilder) {
    if try_tensorrt(builder) || try_cuda(builder) {
        return;
    }

    #[cfg(target_os = "macos")]
    if try_coreml(builder) {
        return;
    }

    if try_xnnpack(builder) {
        return;
    }

    info!("Using CPU execution provider");
}

macro_rules! try_provider {
    ($builder:expr, $provider_type:ty, $name:expr) => {{
        use ort::ep::ExecutionProvider;

        debug!("Trying provider: {}", $name);

        let provider = <$provider_type>::default();
        if !provider.is_available().unwrap_or(false) {
            debug!("{} not available", $name);
            return false;
        }

        match provider.register($builder) {
            Ok(_) => {
                info!("Using {} execution provider", $name);
                true
            }
            Err(e) => {
                debug!("{} registration failed: {}", $name, e);
                false
            }
        }
    }};
}

fn try_cuda(builder: &mut SessionBuilder) -> bool {
    use ort::ep::CUDA;
    try_provider!(builder, CUDA, "CUDA")
}

#[cfg(target_os = "macos")]
fn try_coreml(builder: &mut SessionBuilder) -> bool {
    use ort::ep::CoreML;
    try_provider!(builder, CoreML, "CoreML")
}

fn try_tensorrt(builder: &mut SessionBuilder) -> bool {
    use ort::ep::TensorRT;
    try_provider!(builder, TensorRT, "TensorRT")
}

fn try_xnnpack(builder: &mut SessionBuilder) -> bool {
    use ort::ep::XNNPACK;
    try_provider!(builder, XNNPACK, "XNNPACK")
}
