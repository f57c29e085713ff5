//! PCM sample conversions shared across the pipeline.
//!
//! The engine consumes little-endian signed 16-bit PCM and works internally
//! on float frames in [-1, 1]. The two directions use different scale
//! factors (32768 in, 32767 out); this asymmetry is kept on purpose so that
//! emitted audio stays bit-compatible with prior consumers of the format.

/// Converts one 16-bit PCM sample to a float in [-1, 1).
pub fn sample_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Converts one float sample to 16-bit PCM.
///
/// Clamps to the i16 range before rounding. Note that -32768 does not
/// round-trip through [`sample_to_f32`]: it comes back as -32767, one LSB
/// off, a consequence of the asymmetric scale factors.
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0).round() as i16
}

/// Flattens a run of float frames into a single 16-bit PCM buffer.
pub fn frames_to_pcm(frames: &[Vec<f32>]) -> Vec<i16> {
    let total: usize = frames.iter().map(Vec::len).sum();
    let mut pcm = Vec::with_capacity(total);
    for frame in frames {
        pcm.extend(frame.iter().copied().map(sample_to_i16));
    }
    pcm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_converts_to_zero() {
        assert_eq!(sample_to_f32(0), 0.0);
        assert_eq!(sample_to_i16(0.0), 0);
    }

    #[test]
    fn test_round_trip_is_exact_except_int_min() {
        // Spot checks across the range plus the boundary values.
        for s in [-32767i16, -12345, -1, 0, 1, 2048, 12345, 32767] {
            let back = sample_to_i16(sample_to_f32(s));
            assert_eq!(back, s, "sample {} did not round-trip", s);
        }
    }

    #[test]
    fn test_int_min_round_trips_one_lsb_high() {
        // -32768 / 32768 = -1.0; -1.0 * 32767 = -32767.
        let back = sample_to_i16(sample_to_f32(i16::MIN));
        assert_eq!(back, -32767);
    }

    #[test]
    fn test_out_of_range_floats_clamp() {
        assert_eq!(sample_to_i16(2.0), 32767);
        assert_eq!(sample_to_i16(-2.0), -32768);
    }

    #[test]
    fn test_frames_to_pcm_concatenates_in_order() {
        let frames = vec![vec![0.0f32, 0.5], vec![-0.5, 1.0]];
        let pcm = frames_to_pcm(&frames);
        assert_eq!(pcm.len(), 4);
        assert_eq!(pcm[0], 0);
        assert_eq!(pcm[1], 16384); // round(0.5 * 32767)
        assert_eq!(pcm[2], -16384);
        assert_eq!(pcm[3], 32767);
    }

    #[test]
    fn test_frames_to_pcm_empty() {
        assert!(frames_to_pcm(&[]).is_empty());
    }
}
