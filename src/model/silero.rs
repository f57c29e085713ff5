//! Silero VAD ONNX inference adapter.
//!
//! Drives a pretrained Silero speech-probability model through ONNX Runtime,
//! carrying the recurrent state across calls. Both published exports are
//! supported:
//! - v4: separate LSTM hidden/cell tensors `h` and `c`, shape [2, 1, 64] each;
//!   input order `input, sr, h, c`, outputs `prob, hn, cn`.
//! - v5: one combined `state` tensor, shape [2, 1, 128]; input order
//!   `input, state, sr`, outputs `prob, stateN`.

use crate::defaults;
use crate::error::{Result, VadError};
use crate::model::{ModelVariant, SpeechModel, SpeechProbabilities};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;

/// v4 LSTM hidden/cell tensor shape.
const V4_STATE_SHAPE: [usize; 3] = [2, 1, 64];
/// v5 combined state tensor shape.
const V5_STATE_SHAPE: [usize; 3] = [2, 1, 128];

const V4_STATE_LEN: usize = V4_STATE_SHAPE[0] * V4_STATE_SHAPE[1] * V4_STATE_SHAPE[2];
const V5_STATE_LEN: usize = V5_STATE_SHAPE[0] * V5_STATE_SHAPE[1] * V5_STATE_SHAPE[2];

/// Recurrent state bundle, zeroed at construction and on reset.
enum NeuralState {
    V4 { h: Vec<f32>, c: Vec<f32> },
    V5 { state: Vec<f32> },
}

impl NeuralState {
    fn new(variant: ModelVariant) -> Self {
        match variant {
            ModelVariant::V4 => NeuralState::V4 {
                h: vec![0.0; V4_STATE_LEN],
                c: vec![0.0; V4_STATE_LEN],
            },
            ModelVariant::V5 => NeuralState::V5 {
                state: vec![0.0; V5_STATE_LEN],
            },
        }
    }

    fn zero(&mut self) {
        match self {
            NeuralState::V4 { h, c } => {
                h.fill(0.0);
                c.fill(0.0);
            }
            NeuralState::V5 { state } => state.fill(0.0),
        }
    }
}

/// Silero VAD model over an ONNX Runtime session.
pub struct SileroModel {
    session: Session,
    state: NeuralState,
    /// Sample rate scalar passed to the model's "sr" input (shape [1] i64).
    sr: i64,
}

impl SileroModel {
    /// Builds a session from raw ONNX bytes.
    pub fn from_bytes(variant: ModelVariant, bytes: &[u8]) -> Result<Self> {
        let session = Session::builder()
            .map_err(|e| VadError::ModelLoad {
                message: format!("failed to create session builder: {}", e),
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VadError::ModelLoad {
                message: format!("failed to set optimization level: {}", e),
            })?
            .with_intra_threads(1)
            .map_err(|e| VadError::ModelLoad {
                message: format!("failed to set intra threads: {}", e),
            })?
            .commit_from_memory(bytes)
            .map_err(|e| VadError::ModelLoad {
                message: format!("failed to load model: {}", e),
            })?;

        Ok(Self {
            session,
            state: NeuralState::new(variant),
            sr: defaults::SAMPLE_RATE as i64,
        })
    }

    fn run_inference(&mut self, frame: &[f32]) -> Result<f32> {
        use ort::inputs;

        let input = Value::from_array((vec![1usize, frame.len()], frame.to_vec())).map_err(|e| {
            VadError::Inference {
                message: format!("failed to create input tensor: {}", e),
            }
        })?;
        let sr = Value::from_array((vec![1usize], vec![self.sr])).map_err(|e| {
            VadError::Inference {
                message: format!("failed to create sr tensor: {}", e),
            }
        })?;

        let outputs = match &self.state {
            NeuralState::V4 { h, c } => {
                let h = Value::from_array((V4_STATE_SHAPE.to_vec(), h.clone())).map_err(|e| {
                    VadError::Inference {
                        message: format!("failed to create h tensor: {}", e),
                    }
                })?;
                let c = Value::from_array((V4_STATE_SHAPE.to_vec(), c.clone())).map_err(|e| {
                    VadError::Inference {
                        message: format!("failed to create c tensor: {}", e),
                    }
                })?;
                self.session
                    .run(inputs![input, sr, h, c])
                    .map_err(|e| VadError::Inference {
                        message: format!("inference failed: {}", e),
                    })?
            }
            NeuralState::V5 { state } => {
                let state =
                    Value::from_array((V5_STATE_SHAPE.to_vec(), state.clone())).map_err(|e| {
                        VadError::Inference {
                            message: format!("failed to create state tensor: {}", e),
                        }
                    })?;
                self.session
                    .run(inputs![input, state, sr])
                    .map_err(|e| VadError::Inference {
                        message: format!("inference failed: {}", e),
                    })?
            }
        };

        let (_, prob_data) =
            outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| VadError::Inference {
                    message: format!("failed to extract speech probability: {}", e),
                })?;
        let speech_prob = prob_data[0];

        // Carry the updated recurrent state into the next call.
        match &mut self.state {
            NeuralState::V4 { h, c } => {
                for (name, index, target) in [("hn", 1usize, h), ("cn", 2usize, c)] {
                    let (_, data) = outputs[index].try_extract_tensor::<f32>().map_err(|e| {
                        VadError::Inference {
                            message: format!("failed to extract {}: {}", name, e),
                        }
                    })?;
                    if data.len() != target.len() {
                        return Err(VadError::Inference {
                            message: format!(
                                "unexpected {} length {} (want {})",
                                name,
                                data.len(),
                                target.len()
                            ),
                        });
                    }
                    target.copy_from_slice(data);
                }
            }
            NeuralState::V5 { state } => {
                let (_, data) =
                    outputs[1]
                        .try_extract_tensor::<f32>()
                        .map_err(|e| VadError::Inference {
                            message: format!("failed to extract stateN: {}", e),
                        })?;
                if data.len() != state.len() {
                    return Err(VadError::Inference {
                        message: format!(
                            "unexpected stateN length {} (want {})",
                            data.len(),
                            state.len()
                        ),
                    });
                }
                state.copy_from_slice(data);
            }
        }

        tracing::trace!(prob = speech_prob, "vad inference");
        Ok(speech_prob)
    }
}

impl SpeechModel for SileroModel {
    fn process(&mut self, frame: &[f32]) -> Result<SpeechProbabilities> {
        let prob = self.run_inference(frame)?;
        Ok(SpeechProbabilities::from_is_speech(prob))
    }

    fn reset_state(&mut self) {
        self.state.zero();
        tracing::debug!("silero recurrent state zeroed");
    }
}
