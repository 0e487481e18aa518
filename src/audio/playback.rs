//! Speaker playback using CPAL.

use crate::audio::capture::{DeviceKind, SendableStream, find_device};
use crate::audio::convert::{from_mono_at_rate, i16_to_f32, pcm_bytes_to_samples};
use crate::audio::player::{AudioOutput, AudioSink};
use crate::defaults;
use crate::error::{ParleyError, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Queued device audio, in milliseconds, before writes block.
const QUEUE_MS: usize = 500;

/// Opens playback streams on a named or default output device.
#[derive(Debug, Clone, Default)]
pub struct CpalAudioOutput {
    device_name: Option<String>,
}

impl CpalAudioOutput {
    pub fn new(device_name: Option<&str>) -> Self {
        Self {
            device_name: device_name.map(str::to_string),
        }
    }
}

impl AudioOutput for CpalAudioOutput {
    fn open(&self) -> Result<Box<dyn AudioSink>> {
        let device = find_device(DeviceKind::Output, self.device_name.as_deref())?;
        let sink = CpalAudioSink::open(&device)?;
        Ok(Box::new(sink))
    }
}

/// Output stream fed from a shared sample queue.
///
/// The device callback pops interleaved samples and plays silence when the
/// queue runs dry.
pub struct CpalAudioSink {
    stream: Mutex<Option<SendableStream>>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    capacity: usize,
    device_rate: u32,
    device_channels: usize,
    carry: Option<u8>,
}

impl CpalAudioSink {
    fn open(device: &cpal::Device) -> Result<Self> {
        let queue = Arc::new(Mutex::new(VecDeque::new()));

        let preferred = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: cpal::SampleRate(defaults::SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };
        let (stream, rate, channels) =
            match build_output_stream::<i16>(device, &preferred, Arc::clone(&queue)) {
                Ok(stream) => (stream, defaults::SAMPLE_RATE, defaults::CHANNELS as usize),
                Err(_) => build_native_stream(device, Arc::clone(&queue))?,
            };

        stream.play().map_err(|e| ParleyError::AudioPlayback {
            message: format!("Failed to start output stream: {e}"),
        })?;

        let capacity = (rate as usize * channels * QUEUE_MS / 1000).max(1);
        Ok(Self {
            stream: Mutex::new(Some(SendableStream(stream))),
            queue,
            capacity,
            device_rate: rate,
            device_channels: channels,
            carry: None,
        })
    }

    fn decode(&mut self, pcm: &[u8]) -> Vec<i16> {
        let mut bytes = Vec::with_capacity(pcm.len() + 1);
        if let Some(byte) = self.carry.take() {
            bytes.push(byte);
        }
        bytes.extend_from_slice(pcm);
        if bytes.len() % 2 == 1 {
            self.carry = bytes.pop();
        }
        pcm_bytes_to_samples(&bytes)
    }

    fn queued(&self) -> Result<usize> {
        self.queue
            .lock()
            .map(|q| q.len())
            .map_err(|e| ParleyError::AudioPlayback {
                message: format!("Failed to lock playback queue: {e}"),
            })
    }
}

impl AudioSink for CpalAudioSink {
    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        let samples = self.decode(pcm);
        let device_samples = from_mono_at_rate(
            &samples,
            defaults::SAMPLE_RATE,
            self.device_rate,
            self.device_channels,
        );

        let mut offset = 0;
        while offset < device_samples.len() {
            let free = self.capacity.saturating_sub(self.queued()?);
            if free == 0 {
                std::thread::sleep(Duration::from_millis(5));
                continue;
            }
            let end = (offset + free).min(device_samples.len());
            let mut queue = self.queue.lock().map_err(|e| ParleyError::AudioPlayback {
                message: format!("Failed to lock playback queue: {e}"),
            })?;
            queue.extend(&device_samples[offset..end]);
            offset = end;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
        let mut guard = self.stream.lock().map_err(|e| ParleyError::AudioPlayback {
            message: format!("Failed to lock stream: {e}"),
        })?;
        if let Some(stream) = guard.take() {
            stream.0.pause().map_err(|e| ParleyError::AudioPlayback {
                message: format!("Failed to stop output stream: {e}"),
            })?;
        }
        Ok(())
    }
}

/// Device sample types the sink can feed.
trait OutputSample: cpal::SizedSample + Send + 'static {
    fn from_i16(sample: i16) -> Self;
    fn silence() -> Self;
}

impl OutputSample for i16 {
    fn from_i16(sample: i16) -> Self {
        sample
    }

    fn silence() -> Self {
        0
    }
}

impl OutputSample for f32 {
    fn from_i16(sample: i16) -> Self {
        i16_to_f32(sample)
    }

    fn silence() -> Self {
        0.0
    }
}

fn build_output_stream<T: OutputSample>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: Arc<Mutex<VecDeque<i16>>>,
) -> Result<cpal::Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| match queue.lock() {
                Ok(mut queue) => {
                    for slot in data.iter_mut() {
                        *slot = queue.pop_front().map_or_else(T::silence, T::from_i16);
                    }
                }
                Err(_) => data.fill(T::silence()),
            },
            |err| eprintln!("Audio output error: {err}"),
            None,
        )
        .map_err(|e| ParleyError::AudioPlayback {
            message: format!("Failed to build output stream: {e}"),
        })
}

/// Play at the device's default config, converting from 16 kHz mono.
fn build_native_stream(
    device: &cpal::Device,
    queue: Arc<Mutex<VecDeque<i16>>>,
) -> Result<(cpal::Stream, u32, usize)> {
    use cpal::SampleFormat;

    let default_config = device
        .default_output_config()
        .map_err(|e| ParleyError::AudioPlayback {
            message: format!("Failed to query default output config: {e}"),
        })?;
    let rate = default_config.sample_rate().0;
    let channels = default_config.channels() as usize;
    let config: cpal::StreamConfig = default_config.clone().into();

    let stream = match default_config.sample_format() {
        SampleFormat::I16 => build_output_stream::<i16>(device, &config, queue)?,
        SampleFormat::F32 => build_output_stream::<f32>(device, &config, queue)?,
        fmt => {
            return Err(ParleyError::AudioPlayback {
                message: format!(
                    "Unsupported output sample format: {fmt:?}. Try another device with --output-device."
                ),
            });
        }
    };
    Ok((stream, rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_sample_conversion() {
        assert_eq!(<i16 as OutputSample>::from_i16(-7), -7);
        assert_eq!(<f32 as OutputSample>::from_i16(0), 0.0);
        assert_eq!(<i16 as OutputSample>::silence(), 0);
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_play_short_silence() {
        let output = CpalAudioOutput::new(None);
        let mut sink = output.open().unwrap();
        sink.write(&[0u8; 3200]).unwrap();
        std::thread::sleep(Duration::from_millis(150));
        sink.stop().unwrap();
    }
}
