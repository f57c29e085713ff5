//! Speech probability models.
//!
//! The detector only ever sees the [`SpeechModel`] trait: a frame of floats
//! in, a probability pair out, with recurrent state carried across calls.
//! [`silero::SileroModel`] is the production implementation over ONNX
//! Runtime; [`ScriptedModel`] replays canned probabilities for tests.

pub mod silero;
pub mod source;

pub use silero::SileroModel;
pub use source::ModelSource;

use crate::error::{Result, VadError};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Model architecture selector.
///
/// The two published Silero VAD checkpoints carry different recurrent state:
/// v4 keeps separate LSTM hidden/cell tensors, v5 a single combined state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    V4,
    V5,
}

impl ModelVariant {
    /// Default frame width in samples for this variant.
    pub fn default_frame_samples(self) -> usize {
        match self {
            ModelVariant::V4 => crate::defaults::V4_FRAME_SAMPLES,
            ModelVariant::V5 => crate::defaults::V5_FRAME_SAMPLES,
        }
    }
}

/// Speech probability pair for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechProbabilities {
    /// Probability that the frame contains speech, in [0, 1].
    pub is_speech: f32,
    /// Complement of `is_speech`.
    pub not_speech: f32,
}

impl SpeechProbabilities {
    /// Builds the pair from the speech probability alone.
    pub fn from_is_speech(is_speech: f32) -> Self {
        Self {
            is_speech,
            not_speech: 1.0 - is_speech,
        }
    }
}

/// Trait for speech probability models.
///
/// This trait allows swapping implementations (real ONNX inference vs a
/// scripted mock). Implementations own their recurrent state; a successful
/// `process` call is the only thing that mutates it.
pub trait SpeechModel: Send {
    /// Scores one frame of float samples in [-1, 1].
    fn process(&mut self, frame: &[f32]) -> Result<SpeechProbabilities>;

    /// Zeroes the recurrent state.
    fn reset_state(&mut self);
}

/// Scripted speech model for testing.
///
/// Replays a fixed sequence of probabilities, one per call, returning 0.0
/// once the script is exhausted. Calls listed in the failure set return an
/// inference error instead (without consuming a scripted value).
pub struct ScriptedModel {
    script: VecDeque<f32>,
    fail_on_calls: HashSet<usize>,
    calls: usize,
    resets: usize,
}

impl ScriptedModel {
    /// Creates a model replaying the given probabilities in order.
    pub fn new(probabilities: impl IntoIterator<Item = f32>) -> Self {
        Self {
            script: probabilities.into_iter().collect(),
            fail_on_calls: HashSet::new(),
            calls: 0,
            resets: 0,
        }
    }

    /// Makes the n-th `process` call (0-based) fail.
    pub fn with_failure_on_call(mut self, call: usize) -> Self {
        self.fail_on_calls.insert(call);
        self
    }

    /// Number of times `reset_state` has been invoked.
    pub fn resets(&self) -> usize {
        self.resets
    }
}

impl SpeechModel for ScriptedModel {
    fn process(&mut self, _frame: &[f32]) -> Result<SpeechProbabilities> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on_calls.contains(&call) {
            return Err(VadError::Inference {
                message: format!("scripted failure on call {}", call),
            });
        }
        let p = self.script.pop_front().unwrap_or(0.0);
        Ok(SpeechProbabilities::from_is_speech(p))
    }

    fn reset_state(&mut self) {
        self.resets += 1;
    }
}
