//! Default configuration constants for voicegate.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication. The per-model
//! detector defaults follow the tunings published with the Silero VAD v4 and
//! v5 checkpoints.

/// Audio sample rate in Hz at the state-machine boundary.
///
/// 16kHz is the rate the Silero models were trained on; the engine rejects
/// any other rate at construction time.
pub const SAMPLE_RATE: u32 = 16000;

/// Default entry threshold for the speech detector.
///
/// A frame with speech probability at or above this value is treated as
/// positive evidence of speech.
pub const POSITIVE_SPEECH_THRESHOLD: f32 = 0.5;

/// Default exit threshold for the speech detector.
///
/// A frame strictly below this value counts toward ending an utterance.
/// Probabilities between the two thresholds form the intermediate band.
pub const NEGATIVE_SPEECH_THRESHOLD: f32 = 0.35;

/// Frame width in samples for the v5 model (32ms at 16kHz).
pub const V5_FRAME_SAMPLES: usize = 512;

/// Consecutive sub-negative frames that end an utterance (v5).
pub const V5_REDEMPTION_FRAMES: usize = 24;

/// Silent frames retained before speech start (v5).
pub const V5_PRE_SPEECH_PAD_FRAMES: usize = 3;

/// Positive frames required to validate an utterance (v5).
pub const V5_MIN_SPEECH_FRAMES: usize = 9;

/// Trailing frames retained after speech end (v5).
pub const V5_END_SPEECH_PAD_FRAMES: usize = 3;

/// Frame width in samples for the v4 model (96ms at 16kHz).
pub const V4_FRAME_SAMPLES: usize = 1536;

/// Consecutive sub-negative frames that end an utterance (v4).
pub const V4_REDEMPTION_FRAMES: usize = 8;

/// Silent frames retained before speech start (v4).
pub const V4_PRE_SPEECH_PAD_FRAMES: usize = 1;

/// Positive frames required to validate an utterance (v4).
pub const V4_MIN_SPEECH_FRAMES: usize = 3;

/// Trailing frames retained after speech end (v4).
pub const V4_END_SPEECH_PAD_FRAMES: usize = 1;

/// Frame widths accepted by the engine.
pub const SUPPORTED_FRAME_SAMPLES: [usize; 3] = [512, 1024, 1536];
