//! Sample format conversions between devices and services.
//!
//! Services speak 16-bit little-endian mono PCM at 16 kHz. Devices speak
//! whatever they were built with.

/// Encode samples as little-endian 16-bit PCM bytes.
pub fn samples_to_pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian 16-bit PCM bytes. A trailing odd byte is ignored.
pub fn pcm_bytes_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Average interleaved channels down to mono.
pub fn mix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Repeat each mono sample across `channels` interleaved channels.
pub fn spread_to_channels(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .iter()
        .flat_map(|&s| std::iter::repeat_n(s, channels))
        .collect()
}

/// Linear-interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

/// Convert a device capture buffer to mono at `target_rate`.
pub fn to_mono_at_rate(
    samples: &[i16],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<i16> {
    let mono = mix_to_mono(samples, channels);
    resample(&mono, source_rate, target_rate)
}

/// Convert mono PCM at `source_rate` to an interleaved device buffer.
pub fn from_mono_at_rate(
    samples: &[i16],
    source_rate: u32,
    target_rate: u32,
    channels: usize,
) -> Vec<i16> {
    let resampled = resample(samples, source_rate, target_rate);
    spread_to_channels(&resampled, channels)
}

pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_bytes_roundtrip() {
        let samples = vec![0, 1, -1, i16::MAX, i16::MIN];
        let bytes = samples_to_pcm_bytes(&samples);
        assert_eq!(bytes.len(), 10);
        assert_eq!(pcm_bytes_to_samples(&bytes), samples);
    }

    #[test]
    fn test_pcm_bytes_odd_length_drops_tail() {
        assert_eq!(pcm_bytes_to_samples(&[0x01, 0x00, 0x7F]), vec![1]);
    }

    #[test]
    fn test_mix_to_mono_averages_stereo() {
        let stereo = vec![100, 300, -200, 200];
        assert_eq!(mix_to_mono(&stereo, 2), vec![200, 0]);
        assert_eq!(mix_to_mono(&stereo, 1), stereo);
    }

    #[test]
    fn test_spread_to_channels() {
        assert_eq!(spread_to_channels(&[1, 2], 2), vec![1, 1, 2, 2]);
        assert_eq!(spread_to_channels(&[1, 2], 1), vec![1, 2]);
    }

    #[test]
    fn test_resample_identity_same_rate() {
        let samples = vec![100i16, 200, 300, 400, 500];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_downsample_halves_length() {
        let samples: Vec<i16> = (0..100).collect();
        let resampled = resample(&samples, 32000, 16000);
        assert_eq!(resampled.len(), 50);
        assert_eq!(resampled[0], 0);
        assert_eq!(resampled[1], 2);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let resampled = resample(&[0, 100], 8000, 16000);
        assert_eq!(resampled, vec![0, 50, 100, 100]);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample(&[], 48000, 16000).is_empty());
    }

    #[test]
    fn test_to_and_from_mono_at_rate() {
        let captured = vec![10, 30, 10, 30, 10, 30, 10, 30];
        let mono = to_mono_at_rate(&captured, 2, 32000, 16000);
        assert_eq!(mono, vec![20, 20]);

        let device = from_mono_at_rate(&[5, 5], 16000, 16000, 2);
        assert_eq!(device, vec![5, 5, 5, 5]);
    }

    #[test]
    fn test_float_conversion_clamps() {
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(0.0), 0);
        assert!((i16_to_f32(i16::MAX) - 1.0).abs() < f32::EPSILON);
    }
}
