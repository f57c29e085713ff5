//! Engine configuration.

use crate::defaults;
use crate::error::{Result, VadError};
use crate::model::ModelVariant;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Detector and frame configuration for one engine instance.
///
/// The defaults differ per model variant; [`VadConfig::for_model`] returns
/// the published tuning for either checkpoint. Every instance is validated
/// once at engine construction and is immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VadConfig {
    /// Model architecture (selects state shapes and per-variant defaults).
    pub model: ModelVariant,
    /// Audio sample rate at the state-machine boundary. Must be 16000.
    pub sample_rate: u32,
    /// Frame width in samples (512, 1024 or 1536).
    pub frame_samples: usize,
    /// Entry threshold: probability at or above this opens/extends speech.
    pub positive_speech_threshold: f32,
    /// Exit threshold: probability strictly below this counts toward ending
    /// speech. Must not exceed the positive threshold.
    pub negative_speech_threshold: f32,
    /// Consecutive sub-negative frames that close an utterance.
    pub redemption_frames: usize,
    /// Silent frames retained as context before speech start.
    pub pre_speech_pad_frames: usize,
    /// Positive frames required before an utterance is validated.
    pub min_speech_frames: usize,
    /// Trailing frames retained as context after speech end.
    pub end_speech_pad_frames: usize,
    /// In-flight chunk width in frames; 0 disables chunk emission.
    pub num_frames_to_emit: usize,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self::for_model(ModelVariant::V5)
    }
}

impl VadConfig {
    /// Returns the published default tuning for the given model variant.
    pub fn for_model(model: ModelVariant) -> Self {
        match model {
            ModelVariant::V4 => Self {
                model,
                sample_rate: defaults::SAMPLE_RATE,
                frame_samples: defaults::V4_FRAME_SAMPLES,
                positive_speech_threshold: defaults::POSITIVE_SPEECH_THRESHOLD,
                negative_speech_threshold: defaults::NEGATIVE_SPEECH_THRESHOLD,
                redemption_frames: defaults::V4_REDEMPTION_FRAMES,
                pre_speech_pad_frames: defaults::V4_PRE_SPEECH_PAD_FRAMES,
                min_speech_frames: defaults::V4_MIN_SPEECH_FRAMES,
                end_speech_pad_frames: defaults::V4_END_SPEECH_PAD_FRAMES,
                num_frames_to_emit: 0,
            },
            ModelVariant::V5 => Self {
                model,
                sample_rate: defaults::SAMPLE_RATE,
                frame_samples: defaults::V5_FRAME_SAMPLES,
                positive_speech_threshold: defaults::POSITIVE_SPEECH_THRESHOLD,
                negative_speech_threshold: defaults::NEGATIVE_SPEECH_THRESHOLD,
                redemption_frames: defaults::V5_REDEMPTION_FRAMES,
                pre_speech_pad_frames: defaults::V5_PRE_SPEECH_PAD_FRAMES,
                min_speech_frames: defaults::V5_MIN_SPEECH_FRAMES,
                end_speech_pad_frames: defaults::V5_END_SPEECH_PAD_FRAMES,
                num_frames_to_emit: 0,
            },
        }
    }

    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate != defaults::SAMPLE_RATE {
            return Err(VadError::ConfigInvalidValue {
                key: "sample_rate".to_string(),
                message: format!(
                    "must be {} Hz, got {}",
                    defaults::SAMPLE_RATE,
                    self.sample_rate
                ),
            });
        }
        if !defaults::SUPPORTED_FRAME_SAMPLES.contains(&self.frame_samples) {
            return Err(VadError::ConfigInvalidValue {
                key: "frame_samples".to_string(),
                message: format!(
                    "must be one of {:?}, got {}",
                    defaults::SUPPORTED_FRAME_SAMPLES,
                    self.frame_samples
                ),
            });
        }
        for (key, value) in [
            ("positive_speech_threshold", self.positive_speech_threshold),
            ("negative_speech_threshold", self.negative_speech_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VadError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: format!("must be within [0, 1], got {}", value),
                });
            }
        }
        if self.negative_speech_threshold > self.positive_speech_threshold {
            return Err(VadError::ConfigInvalidValue {
                key: "negative_speech_threshold".to_string(),
                message: "must not exceed positive_speech_threshold".to_string(),
            });
        }
        if self.redemption_frames == 0 {
            return Err(VadError::ConfigInvalidValue {
                key: "redemption_frames".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.min_speech_frames == 0 {
            return Err(VadError::ConfigInvalidValue {
                key: "min_speech_frames".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: VadConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Frame duration in seconds at the configured sample rate.
    pub fn frame_secs(&self) -> f64 {
        self.frame_samples as f64 / self.sample_rate as f64
    }
}
