//! voicegate - streaming voice activity detection.
//!
//! Feeds 16 kHz mono 16-bit PCM through a Silero VAD model and emits
//! timestamped speech events: start, validated start, in-flight chunks,
//! end-with-audio, misfires.

pub mod audio;
pub mod config;
pub mod defaults;
pub mod error;
pub mod model;
pub mod streaming;
