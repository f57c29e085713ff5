//! Hysteresis speech detector and chunk scheduler.
//!
//! Drives the Silent/Speaking state machine over per-frame speech
//! probabilities:
//! - double thresholds with an intermediate band between them
//! - pre-speech ring buffer prepended on speech start
//! - redemption counting with post-speech padding
//! - minimum-positive-frame validation (misfire below it)
//! - optional in-flight chunk emission with a final remainder slice
//!
//! The detector is pure synchronous logic; it sees probabilities, never the
//! model. All decisions are deterministic in the input sequence.

use crate::audio;
use crate::config::VadConfig;
use crate::model::SpeechProbabilities;
use crate::streaming::events::VadEvent;
use crate::streaming::prebuffer::PreSpeechBuffer;

/// Streaming speech detector.
///
/// Consumes fixed-width float frames together with their model scores and
/// returns the events each frame produced, in order. `FrameProcessed` always
/// precedes any transition event from the same frame.
pub struct SpeechDetector {
    config: VadConfig,
    speaking: bool,
    /// Consecutive sub-negative frames since the last positive one.
    redemption_counter: usize,
    /// Positive frames seen in the current utterance.
    speech_positive_frames: usize,
    real_start_fired: bool,
    /// Index of the first accumulator frame not yet emitted as a chunk.
    speech_start_index: usize,
    /// Redemption counter as of the most recent chunk emission. Deliberately
    /// survives the intermediate band, so the final-chunk math can see a
    /// stale snapshot; downstream consumers depend on that.
    sent_redemption_frames: usize,
    /// Samples consumed so far, for timestamps.
    current_sample: u64,
    total_frames_processed: u64,
    pre_speech: PreSpeechBuffer,
    /// All frames retained since the last speech start.
    speech_buffer: Vec<Vec<f32>>,
}

impl SpeechDetector {
    /// Creates a detector with the given (validated) configuration.
    pub fn new(config: VadConfig) -> Self {
        let pre_speech = PreSpeechBuffer::new(config.pre_speech_pad_frames);
        Self {
            config,
            speaking: false,
            redemption_counter: 0,
            speech_positive_frames: 0,
            real_start_fired: false,
            speech_start_index: 0,
            sent_redemption_frames: 0,
            current_sample: 0,
            total_frames_processed: 0,
            pre_speech,
            speech_buffer: Vec::new(),
        }
    }

    /// Seconds of audio consumed so far.
    pub fn time_secs(&self) -> f64 {
        self.current_sample as f64 / self.config.sample_rate as f64
    }

    /// Returns true while an utterance is open.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Frames currently held as pre-speech context.
    pub fn pre_speech_frames(&self) -> usize {
        self.pre_speech.len()
    }

    /// Frames processed since construction or the last reset.
    pub fn total_frames_processed(&self) -> u64 {
        self.total_frames_processed
    }

    /// Processes one scored frame and returns the events it produced.
    ///
    /// A frame of the wrong width is a programming error upstream: it is
    /// logged and dropped without touching any state.
    pub fn process_frame(&mut self, frame: Vec<f32>, probs: SpeechProbabilities) -> Vec<VadEvent> {
        if frame.len() != self.config.frame_samples {
            tracing::warn!(
                got = frame.len(),
                expected = self.config.frame_samples,
                "dropping frame of unexpected width"
            );
            return Vec::new();
        }

        let time = self.time_secs();
        let mut events = vec![VadEvent::FrameProcessed {
            time,
            probabilities: probs,
            samples: frame.clone(),
        }];

        let p = probs.is_speech;
        if p >= self.config.positive_speech_threshold {
            self.handle_positive(frame, time, &mut events);
        } else if p < self.config.negative_speech_threshold {
            self.handle_negative(frame, time, &mut events);
        } else {
            self.handle_intermediate(frame);
        }

        // Chunk scheduling runs on every frame consumed while the utterance
        // is still open, including early redemption frames.
        if self.speaking {
            self.maybe_emit_chunk(time, &mut events);
        }

        self.current_sample += self.config.frame_samples as u64;
        self.total_frames_processed += 1;
        events
    }

    fn handle_positive(&mut self, frame: Vec<f32>, time: f64, events: &mut Vec<VadEvent>) {
        if !self.speaking {
            self.speaking = true;
            self.speech_start_index = 0;
            self.real_start_fired = false;
            events.push(VadEvent::SpeechStart { time });
            tracing::debug!(time, "speech start");
            self.pre_speech.drain_into(&mut self.speech_buffer);
        }

        self.redemption_counter = 0;
        self.sent_redemption_frames = 0;
        self.speech_buffer.push(frame);
        self.speech_positive_frames += 1;

        if !self.real_start_fired && self.speech_positive_frames == self.config.min_speech_frames {
            self.real_start_fired = true;
            events.push(VadEvent::SpeechRealStart { time });
            tracing::debug!(time, "speech validated");
        }
    }

    fn handle_negative(&mut self, frame: Vec<f32>, time: f64, events: &mut Vec<VadEvent>) {
        if !self.speaking {
            self.pre_speech.push(frame);
            return;
        }

        self.speech_buffer.push(frame);
        self.redemption_counter += 1;
        if self.redemption_counter >= self.config.redemption_frames {
            self.end_of_speech(time, events);
        }
    }

    fn handle_intermediate(&mut self, frame: Vec<f32>) {
        if !self.speaking {
            self.pre_speech.push(frame);
            return;
        }

        self.speech_buffer.push(frame);
        // The band keeps the utterance alive but is not positive evidence:
        // redemption restarts while the chunk snapshot stays as-is.
        self.redemption_counter = 0;
    }

    fn maybe_emit_chunk(&mut self, time: f64, events: &mut Vec<VadEvent>) {
        let width = self.config.num_frames_to_emit;
        if width == 0 {
            return;
        }
        if self.speech_buffer.len() - self.speech_start_index < width {
            return;
        }
        if self.redemption_counter > self.config.end_speech_pad_frames {
            return;
        }

        let end = self.speech_start_index + width;
        let audio = audio::frames_to_pcm(&self.speech_buffer[self.speech_start_index..end]);
        events.push(VadEvent::Chunk {
            time,
            audio,
            is_final: false,
        });
        self.speech_start_index = end;
        self.sent_redemption_frames = self.redemption_counter;
    }

    /// Closes the utterance after the redemption counter filled up.
    fn end_of_speech(&mut self, time: f64, events: &mut Vec<VadEvent>) {
        self.speaking = false;
        self.redemption_counter = 0;

        if self.speech_positive_frames < self.config.min_speech_frames {
            events.push(VadEvent::Misfire { time });
            tracing::debug!(time, "speech misfire");
            self.finish_utterance();
            return;
        }

        // The accumulator ends with a full run of redemption frames; keep
        // end_speech_pad_frames of them as trailing context.
        let frames_to_remove =
            self.config.redemption_frames as isize - self.config.end_speech_pad_frames as isize;
        let audio = self.segment_pcm(0, frames_to_remove);
        events.push(VadEvent::SpeechEnd { time, audio });
        tracing::debug!(time, "speech end");

        if self.config.num_frames_to_emit > 0 {
            self.maybe_emit_final_chunk(time, events);
        }
        self.finish_utterance();
    }

    /// Emits the remainder slice between the last in-flight chunk and the
    /// end of the validated segment.
    fn maybe_emit_final_chunk(&mut self, time: f64, events: &mut Vec<VadEvent>) {
        let end_frames_to_remove = if self.sent_redemption_frames == 0 {
            self.config.redemption_frames as isize - self.config.end_speech_pad_frames as isize
        } else {
            self.sent_redemption_frames as isize - self.config.end_speech_pad_frames as isize
        };

        if self.speech_start_index < self.speech_buffer.len() || end_frames_to_remove < 0 {
            let audio = self.segment_pcm(self.speech_start_index, end_frames_to_remove);
            if !audio.is_empty() {
                events.push(VadEvent::Chunk {
                    time,
                    audio,
                    is_final: true,
                });
            }
        }
    }

    /// Slices the accumulator from `start` up to `len - frames_to_remove`,
    /// as PCM. A negative `frames_to_remove` instead appends that many
    /// zero-filled silence frames after the accumulator tail.
    fn segment_pcm(&self, start: usize, frames_to_remove: isize) -> Vec<i16> {
        let len = self.speech_buffer.len();
        if frames_to_remove >= 0 {
            let end = len.saturating_sub(frames_to_remove as usize);
            if end <= start {
                return Vec::new();
            }
            audio::frames_to_pcm(&self.speech_buffer[start..end])
        } else {
            let mut pcm = audio::frames_to_pcm(&self.speech_buffer[start..]);
            let silence = (-frames_to_remove) as usize * self.config.frame_samples;
            pcm.extend(std::iter::repeat_n(0i16, silence));
            pcm
        }
    }

    /// Resets the utterance counters and recycles the trimmed redemption
    /// tail as pre-speech context for the next utterance.
    fn finish_utterance(&mut self) {
        self.speech_positive_frames = 0;
        self.speech_start_index = 0;
        self.sent_redemption_frames = 0;
        self.real_start_fired = false;

        if self.config.end_speech_pad_frames < self.config.redemption_frames {
            let tail = self.config.redemption_frames - self.config.end_speech_pad_frames;
            let start = self.speech_buffer.len().saturating_sub(tail);
            for frame in self.speech_buffer.drain(start..) {
                self.pre_speech.push(frame);
            }
        }
        self.speech_buffer.clear();
    }

    /// Ends the current utterance immediately, delivering the entire
    /// accumulator as the speech segment.
    ///
    /// A no-op unless speaking with at least `min_speech_frames` positive
    /// frames, so half-formed utterances are never emitted. The in-flight
    /// chunk partition is discarded: no final chunk follows the end event.
    pub fn force_end_speech(&mut self) -> Vec<VadEvent> {
        if !self.speaking || self.speech_positive_frames < self.config.min_speech_frames {
            return Vec::new();
        }

        let time = self.time_secs();
        self.speaking = false;
        self.redemption_counter = 0;
        let audio = audio::frames_to_pcm(&self.speech_buffer);
        let events = vec![VadEvent::SpeechEnd { time, audio }];
        tracing::debug!(time, "speech force-ended");
        self.finish_utterance();
        events
    }

    /// Clears all buffers and counters.
    pub fn reset(&mut self) {
        self.speaking = false;
        self.redemption_counter = 0;
        self.speech_positive_frames = 0;
        self.real_start_fired = false;
        self.speech_start_index = 0;
        self.sent_redemption_frames = 0;
        self.current_sample = 0;
        self.total_frames_processed = 0;
        self.pre_speech.clear();
        self.speech_buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelVariant;

    const FRAME: usize = 512;

    fn v5_config() -> VadConfig {
        VadConfig::for_model(ModelVariant::V5)
    }

    fn frame() -> Vec<f32> {
        vec![0.01; FRAME]
    }

    /// Feeds a probability script and collects all events.
    fn run_script(detector: &mut SpeechDetector, script: &[(f32, usize)]) -> Vec<VadEvent> {
        let mut events = Vec::new();
        for &(p, count) in script {
            for _ in 0..count {
                events.extend(
                    detector.process_frame(frame(), SpeechProbabilities::from_is_speech(p)),
                );
            }
        }
        events
    }

    fn non_frame_events(events: &[VadEvent]) -> Vec<&VadEvent> {
        events
            .iter()
            .filter(|e| !matches!(e, VadEvent::FrameProcessed { .. }))
            .collect()
    }

    fn frame_time(index: u64) -> f64 {
        (index * FRAME as u64) as f64 / 16000.0
    }

    #[test]
    fn test_detector_starts_silent() {
        let detector = SpeechDetector::new(v5_config());
        assert!(!detector.is_speaking());
        assert_eq!(detector.total_frames_processed(), 0);
    }

    #[test]
    fn test_silence_only_produces_no_transitions() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = run_script(&mut detector, &[(0.0, 20)]);

        assert_eq!(events.len(), 20);
        assert!(
            events
                .iter()
                .all(|e| matches!(e, VadEvent::FrameProcessed { .. }))
        );
        // Ring holds at most pre_speech_pad_frames of the 20 silent frames.
        assert_eq!(detector.pre_speech_frames(), 3);
        assert!(!detector.is_speaking());
    }

    #[test]
    fn test_clean_utterance() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = run_script(&mut detector, &[(0.1, 3), (0.9, 12), (0.1, 24), (0.0, 10)]);

        let frames = events
            .iter()
            .filter(|e| matches!(e, VadEvent::FrameProcessed { .. }))
            .count();
        assert_eq!(frames, 49);

        let transitions = non_frame_events(&events);
        assert_eq!(transitions.len(), 3);
        assert_eq!(
            *transitions[0],
            VadEvent::SpeechStart {
                time: frame_time(3)
            }
        );
        assert_eq!(
            *transitions[1],
            VadEvent::SpeechRealStart {
                time: frame_time(11)
            }
        );
        match transitions[2] {
            VadEvent::SpeechEnd { time, audio } => {
                assert_eq!(*time, frame_time(38));
                // 3 pre-pad + 12 positive + 24 redemption, minus the
                // 24 - 3 redemption frames beyond the retained post-pad.
                assert_eq!(audio.len(), 18 * FRAME);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        assert!(!detector.is_speaking());
    }

    #[test]
    fn test_frame_processed_precedes_transition() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = detector.process_frame(frame(), SpeechProbabilities::from_is_speech(0.9));
        assert!(matches!(events[0], VadEvent::FrameProcessed { .. }));
        assert!(matches!(events[1], VadEvent::SpeechStart { .. }));
    }

    #[test]
    fn test_misfire_when_too_few_positives() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = run_script(&mut detector, &[(0.9, 5), (0.0, 24)]);

        let transitions = non_frame_events(&events);
        assert_eq!(transitions.len(), 2);
        assert!(matches!(transitions[0], VadEvent::SpeechStart { .. }));
        assert_eq!(
            *transitions[1],
            VadEvent::Misfire {
                time: frame_time(28)
            }
        );
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, VadEvent::SpeechEnd { .. } | VadEvent::Chunk { .. }))
        );
    }

    #[test]
    fn test_intermediate_band_holds_speech_open() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = run_script(&mut detector, &[(0.9, 9), (0.4, 100), (0.0, 24)]);

        let transitions = non_frame_events(&events);
        assert_eq!(transitions.len(), 3);
        assert!(matches!(transitions[0], VadEvent::SpeechStart { .. }));
        assert!(matches!(transitions[1], VadEvent::SpeechRealStart { .. }));
        match transitions[2] {
            VadEvent::SpeechEnd { time, audio } => {
                assert_eq!(*time, frame_time(132));
                // 9 + 100 + 24 accumulated, trimmed by 24 - 3.
                assert_eq!(audio.len(), 112 * FRAME);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_chunked_long_utterance() {
        let config = VadConfig {
            num_frames_to_emit: 30,
            ..v5_config()
        };
        let mut detector = SpeechDetector::new(config);
        let events = run_script(&mut detector, &[(0.9, 120), (0.0, 24)]);

        let transitions = non_frame_events(&events);
        // start, realStart, 4 in-flight chunks, end, final chunk.
        assert_eq!(transitions.len(), 8);

        let chunk_times: Vec<f64> = transitions
            .iter()
            .filter_map(|e| match e {
                VadEvent::Chunk {
                    time,
                    audio,
                    is_final: false,
                } => {
                    assert_eq!(audio.len(), 30 * FRAME);
                    Some(*time)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            chunk_times,
            vec![
                frame_time(29),
                frame_time(59),
                frame_time(89),
                frame_time(119)
            ]
        );

        match transitions[6] {
            VadEvent::SpeechEnd { time, audio } => {
                assert_eq!(*time, frame_time(143));
                // 144 accumulated frames trimmed by 24 - 3.
                assert_eq!(audio.len(), 123 * FRAME);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        // The remainder past the last in-flight chunk, up to the segment
        // boundary, arrives as the final chunk after the end event.
        match transitions[7] {
            VadEvent::Chunk {
                audio,
                is_final: true,
                ..
            } => assert_eq!(audio.len(), 3 * FRAME),
            other => panic!("expected final Chunk, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_blocked_deep_into_redemption() {
        let config = VadConfig {
            num_frames_to_emit: 5,
            min_speech_frames: 1,
            pre_speech_pad_frames: 0,
            ..v5_config()
        };
        let mut detector = SpeechDetector::new(config);
        // One positive frame, then six negatives: the accumulator passes the
        // chunk width while the redemption counter is already above the
        // end pad, so nothing may be emitted.
        let events = run_script(&mut detector, &[(0.9, 1), (0.1, 6)]);
        assert!(!events.iter().any(|e| matches!(e, VadEvent::Chunk { .. })));

        // A positive frame clears redemption and releases the chunk.
        let events = run_script(&mut detector, &[(0.9, 1)]);
        let chunks: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, VadEvent::Chunk { .. }))
            .collect();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_stale_chunk_snapshot_pads_final_with_silence() {
        let config = VadConfig {
            num_frames_to_emit: 5,
            min_speech_frames: 1,
            pre_speech_pad_frames: 0,
            ..v5_config()
        };
        let mut detector = SpeechDetector::new(config);

        // 3 positives, then 2 negatives: the 5th frame triggers a chunk with
        // redemption_counter = 2, snapshotting sent_redemption_frames = 2.
        let events = run_script(&mut detector, &[(0.9, 3), (0.1, 2)]);
        let chunks: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, VadEvent::Chunk { .. }))
            .collect();
        assert_eq!(chunks.len(), 1);

        // One intermediate frame clears redemption but keeps the snapshot,
        // then a full redemption run ends the utterance.
        let events = run_script(&mut detector, &[(0.4, 1), (0.0, 24)]);
        let transitions = non_frame_events(&events);
        assert_eq!(transitions.len(), 2);

        match transitions[0] {
            VadEvent::SpeechEnd { audio, .. } => {
                // 30 accumulated frames trimmed by 24 - 3.
                assert_eq!(audio.len(), 9 * FRAME);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        match transitions[1] {
            VadEvent::Chunk {
                audio,
                is_final: true,
                ..
            } => {
                // sent_redemption_frames (2) minus end pad (3) is negative:
                // the final chunk runs to the accumulator end plus one
                // zero-filled silence frame.
                assert_eq!(audio.len(), 26 * FRAME);
                assert!(audio[25 * FRAME..].iter().all(|&s| s == 0));
            }
            other => panic!("expected final Chunk, got {:?}", other),
        }
    }

    #[test]
    fn test_no_final_chunk_after_misfire() {
        let config = VadConfig {
            num_frames_to_emit: 2,
            ..v5_config()
        };
        let mut detector = SpeechDetector::new(config);
        let events = run_script(&mut detector, &[(0.9, 3), (0.0, 24)]);

        let misfires = events
            .iter()
            .filter(|e| matches!(e, VadEvent::Misfire { .. }))
            .count();
        assert_eq!(misfires, 1);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, VadEvent::SpeechEnd { .. }))
        );
        assert!(!events.iter().any(
            |e| matches!(e, VadEvent::Chunk { is_final, .. } if *is_final)
        ));
    }

    #[test]
    fn test_force_end_delivers_entire_accumulator() {
        let mut detector = SpeechDetector::new(v5_config());
        run_script(&mut detector, &[(0.1, 3), (0.9, 15)]);
        assert!(detector.is_speaking());

        let events = detector.force_end_speech();
        assert_eq!(events.len(), 1);
        match &events[0] {
            VadEvent::SpeechEnd { audio, .. } => {
                // 3 pre-pad frames plus 15 positive frames, untrimmed.
                assert_eq!(audio.len(), 18 * FRAME);
            }
            other => panic!("expected SpeechEnd, got {:?}", other),
        }
        assert!(!detector.is_speaking());

        // Second call is a no-op.
        assert!(detector.force_end_speech().is_empty());
    }

    #[test]
    fn test_force_end_below_validation_is_noop() {
        let mut detector = SpeechDetector::new(v5_config());
        run_script(&mut detector, &[(0.9, 4)]);
        assert!(detector.is_speaking());

        assert!(detector.force_end_speech().is_empty());
        // The utterance stays open.
        assert!(detector.is_speaking());
    }

    #[test]
    fn test_force_end_skips_final_chunk() {
        let config = VadConfig {
            num_frames_to_emit: 5,
            min_speech_frames: 1,
            ..v5_config()
        };
        let mut detector = SpeechDetector::new(config);
        run_script(&mut detector, &[(0.9, 12)]);

        let events = detector.force_end_speech();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], VadEvent::SpeechEnd { .. }));
    }

    #[test]
    fn test_trimmed_tail_seeds_next_utterance_context() {
        let mut detector = SpeechDetector::new(v5_config());
        run_script(&mut detector, &[(0.9, 12), (0.0, 24)]);

        // The 24 - 3 trimmed redemption frames were offered to the ring,
        // which kept the last pre_speech_pad_frames of them.
        assert_eq!(detector.pre_speech_frames(), 3);
    }

    #[test]
    fn test_wrong_width_frame_is_dropped() {
        let mut detector = SpeechDetector::new(v5_config());
        let events =
            detector.process_frame(vec![0.0; 100], SpeechProbabilities::from_is_speech(0.9));
        assert!(events.is_empty());
        assert_eq!(detector.total_frames_processed(), 0);
        assert_eq!(detector.time_secs(), 0.0);
        assert!(!detector.is_speaking());
    }

    #[test]
    fn test_reset_restores_initial_behavior() {
        let mut detector = SpeechDetector::new(v5_config());
        run_script(&mut detector, &[(0.1, 2), (0.9, 7)]);
        assert!(detector.is_speaking());

        detector.reset();
        assert!(!detector.is_speaking());
        assert_eq!(detector.total_frames_processed(), 0);
        assert_eq!(detector.pre_speech_frames(), 0);
        assert_eq!(detector.time_secs(), 0.0);

        // The same script as a fresh detector produces the same events.
        let replay = run_script(&mut detector, &[(0.1, 3), (0.9, 12), (0.1, 24)]);
        let mut fresh = SpeechDetector::new(v5_config());
        let expected = run_script(&mut fresh, &[(0.1, 3), (0.9, 12), (0.1, 24)]);
        assert_eq!(replay, expected);
    }

    #[test]
    fn test_two_consecutive_utterances() {
        let mut detector = SpeechDetector::new(v5_config());
        let events = run_script(
            &mut detector,
            &[(0.9, 10), (0.0, 24), (0.9, 10), (0.0, 24)],
        );

        let starts = events
            .iter()
            .filter(|e| matches!(e, VadEvent::SpeechStart { .. }))
            .count();
        let ends: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                VadEvent::SpeechEnd { audio, .. } => Some(audio.len()),
                _ => None,
            })
            .collect();
        assert_eq!(starts, 2);
        // First utterance: 10 + 24 frames, trimmed by 21. The second picks
        // up 3 recycled context frames: 3 + 10 + 24, trimmed by 21.
        assert_eq!(ends, vec![13 * FRAME, 16 * FRAME]);
    }
}
