//! Model byte sources.
//!
//! The ONNX weights can come from a local file, an in-memory blob, or a URL
//! fetched once before first use. Fetching happens at engine construction;
//! failures surface there rather than through the event stream.

use crate::error::{Result, VadError};
use std::path::PathBuf;

/// Where to obtain the ONNX model bytes.
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// ONNX file on local disk.
    Path(PathBuf),
    /// ONNX bytes already in memory.
    Bytes(Vec<u8>),
    /// ONNX file fetched over HTTP(S).
    Url(String),
}

impl ModelSource {
    /// Resolves the source to raw model bytes.
    pub async fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            ModelSource::Path(path) => std::fs::read(path).map_err(|e| VadError::ModelFetch {
                message: format!("failed to read model file {}: {}", path.display(), e),
            }),
            ModelSource::Bytes(bytes) => Ok(bytes.clone()),
            ModelSource::Url(url) => {
                tracing::info!(url, "fetching VAD model");
                let response = reqwest::get(url).await.map_err(|e| VadError::ModelFetch {
                    message: format!("failed to fetch model from {}: {}", url, e),
                })?;
                if !response.status().is_success() {
                    return Err(VadError::ModelFetch {
                        message: format!(
                            "model download from {} failed with status {}",
                            url,
                            response.status()
                        ),
                    });
                }
                let bytes = response.bytes().await.map_err(|e| VadError::ModelFetch {
                    message: format!("failed to read model download body: {}", e),
                })?;
                Ok(bytes.to_vec())
            }
        }
    }
}
