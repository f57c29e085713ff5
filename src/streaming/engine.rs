//! Streaming VAD engine.
//!
//! Composes the frame slicer, the speech model and the detector into one
//! byte-in, events-out unit. The engine itself is synchronous; the async
//! [`VadEngine::run`] wrapper turns it into a pipeline station over tokio
//! channels.

use crate::config::VadConfig;
use crate::error::{Result, VadError};
use crate::model::{ModelSource, SileroModel, SpeechModel};
use crate::streaming::detector::SpeechDetector;
use crate::streaming::events::VadEvent;
use crate::streaming::slicer::FrameSlicer;
use tokio::sync::mpsc;

/// Streaming voice activity detection engine.
///
/// One instance assumes serialized input: feed bytes with
/// [`process_audio_data`](Self::process_audio_data) and handle the returned
/// events in order. Instances share nothing; independent engines may run on
/// independent threads.
pub struct VadEngine {
    config: VadConfig,
    model: Option<Box<dyn SpeechModel>>,
    slicer: FrameSlicer,
    detector: SpeechDetector,
}

impl VadEngine {
    /// Builds an engine, resolving the model source first.
    ///
    /// Configuration and model-load failures surface here; after a
    /// successful return the engine does not fail construction-style again.
    pub async fn new(config: VadConfig, source: ModelSource) -> Result<Self> {
        config.validate()?;
        let bytes = source.fetch().await?;
        let model = SileroModel::from_bytes(config.model, &bytes)?;
        Ok(Self::assemble(config, Box::new(model)))
    }

    /// Builds an engine around an existing model implementation.
    ///
    /// This is the constructor used by tests to drive the detector with
    /// scripted probabilities.
    pub fn with_model(config: VadConfig, model: Box<dyn SpeechModel>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, model))
    }

    fn assemble(config: VadConfig, model: Box<dyn SpeechModel>) -> Self {
        let slicer = FrameSlicer::new(config.frame_samples);
        let detector = SpeechDetector::new(config.clone());
        Self {
            config,
            model: Some(model),
            slicer,
            detector,
        }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    /// Returns true while an utterance is open.
    pub fn is_speaking(&self) -> bool {
        self.detector.is_speaking()
    }

    /// Frames processed since construction or the last reset.
    pub fn total_frames_processed(&self) -> u64 {
        self.detector.total_frames_processed()
    }

    /// Feeds raw little-endian 16-bit PCM bytes and returns the events they
    /// produced, in order.
    ///
    /// Bytes short of a full frame stay queued for the next call. A frame
    /// whose inference fails produces one `Error` event and advances no
    /// detector state; later frames in the same call still run.
    ///
    /// Only returns `Err` after [`release`](Self::release).
    pub fn process_audio_data(&mut self, bytes: &[u8]) -> Result<Vec<VadEvent>> {
        let Some(model) = self.model.as_mut() else {
            return Err(VadError::Released);
        };

        self.slicer.extend(bytes);
        let mut events = Vec::new();
        while let Some(frame) = self.slicer.next_frame() {
            match model.process(&frame) {
                Ok(probs) => events.extend(self.detector.process_frame(frame, probs)),
                Err(e) => {
                    tracing::warn!(error = %e, "inference failed, frame skipped");
                    events.push(VadEvent::Error {
                        time: self.detector.time_secs(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(events)
    }

    /// Ends the current utterance immediately, if it has enough positive
    /// frames to be worth delivering. See [`SpeechDetector::force_end_speech`].
    pub fn force_end_speech(&mut self) -> Vec<VadEvent> {
        self.detector.force_end_speech()
    }

    /// Clears queued bytes, detector state and the model's recurrent state.
    pub fn reset(&mut self) {
        self.slicer.clear();
        self.detector.reset();
        if let Some(model) = self.model.as_mut() {
            model.reset_state();
        }
    }

    /// Drops the model. Terminal: further `process_audio_data` calls return
    /// [`VadError::Released`].
    pub fn release(&mut self) {
        self.slicer.clear();
        self.detector.reset();
        self.model = None;
    }

    /// Runs the engine as a station: PCM byte chunks in, events out.
    ///
    /// Consumes the engine and returns when the input channel closes or the
    /// event receiver is dropped.
    pub async fn run(mut self, mut input: mpsc::Receiver<Vec<u8>>, output: mpsc::Sender<VadEvent>) {
        while let Some(bytes) = input.recv().await {
            let events = match self.process_audio_data(&bytes) {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!(error = %e, "engine stopped");
                    return;
                }
            };
            for event in events {
                if output.send(event).await.is_err() {
                    return;
                }
            }
        }

        // Input ended: deliver whatever validated speech is still open.
        for event in self.force_end_speech() {
            if output.send(event).await.is_err() {
                return;
            }
        }
    }
}
