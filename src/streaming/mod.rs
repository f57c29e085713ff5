//! Streaming VAD pipeline.
//!
//! Composes the engine from leaf layers:
//! ```text
//! ┌───────────┐    ┌──────────────┐    ┌──────────────┐    ┌────────────┐
//! │ PCM bytes │───▶│ Frame slicer │───▶│ Speech model │───▶│  Detector  │───▶ events
//! └───────────┘    └──────────────┘    └──────────────┘    └────────────┘
//!                   fixed-width f32      probability,       hysteresis +
//!                   frames               recurrent state    chunk scheduler
//! ```
//!
//! Control flow is purely forward; callers throttle input. Events come out
//! strictly in the order the state machine generated them.

pub mod detector;
pub mod engine;
pub mod events;
pub mod prebuffer;
pub mod slicer;

pub use detector::SpeechDetector;
pub use engine::VadEngine;
pub use events::VadEvent;
pub use prebuffer::PreSpeechBuffer;
pub use slicer::FrameSlicer;
