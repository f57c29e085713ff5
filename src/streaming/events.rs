//! Events emitted by the VAD engine.
//!
//! Every processed frame produces one `FrameProcessed`; state transitions
//! append further events after it. Within one utterance the order is
//! `SpeechStart`, optionally `SpeechRealStart`, any number of in-flight
//! `Chunk`s, then `SpeechEnd` or `Misfire`, optionally followed by one final
//! `Chunk`.

use crate::model::SpeechProbabilities;

/// A timestamped event from the streaming state machine.
///
/// Timestamps are seconds at the start boundary of the frame that produced
/// the event; all events from one frame share its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    /// One frame was scored by the model.
    FrameProcessed {
        time: f64,
        probabilities: SpeechProbabilities,
        /// Copy of the float samples that were scored.
        samples: Vec<f32>,
    },
    /// First positive frame opened an utterance.
    SpeechStart { time: f64 },
    /// The utterance reached the minimum positive-frame count.
    SpeechRealStart { time: f64 },
    /// An in-flight or final slice of the current utterance.
    Chunk {
        time: f64,
        audio: Vec<i16>,
        is_final: bool,
    },
    /// A validated utterance ended; carries the padded speech segment.
    SpeechEnd { time: f64, audio: Vec<i16> },
    /// An utterance ended before reaching the minimum positive-frame count.
    Misfire { time: f64 },
    /// A non-fatal processing error; the stream continues.
    Error { time: f64, message: String },
}

impl VadEvent {
    /// Timestamp in seconds.
    pub fn time(&self) -> f64 {
        match self {
            VadEvent::FrameProcessed { time, .. }
            | VadEvent::SpeechStart { time }
            | VadEvent::SpeechRealStart { time }
            | VadEvent::Chunk { time, .. }
            | VadEvent::SpeechEnd { time, .. }
            | VadEvent::Misfire { time }
            | VadEvent::Error { time, .. } => *time,
        }
    }

    /// Short name for logging and display.
    pub fn kind(&self) -> &'static str {
        match self {
            VadEvent::FrameProcessed { .. } => "frame",
            VadEvent::SpeechStart { .. } => "start",
            VadEvent::SpeechRealStart { .. } => "real-start",
            VadEvent::Chunk { is_final: false, .. } => "chunk",
            VadEvent::Chunk { is_final: true, .. } => "final-chunk",
            VadEvent::SpeechEnd { .. } => "end",
            VadEvent::Misfire { .. } => "misfire",
            VadEvent::Error { .. } => "error",
        }
    }

    /// Returns true if this event closes an utterance.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VadEvent::SpeechEnd { .. } | VadEvent::Misfire { .. })
    }
}
