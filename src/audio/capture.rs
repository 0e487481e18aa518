//! Microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::convert::{f32_to_i16, to_mono_at_rate};
use crate::audio::recorder::AudioSource;
use crate::defaults;
use crate::error::{ParleyError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL's backend probing prints ALSA/JACK noise that is harmless but
/// interleaves with the conversation transcript.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2.
/// Safe as long as no other thread is concurrently manipulating fd 2.
pub(crate) fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Device names preferred on desktop Linux, where they follow the session's
/// selected input and output.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns not useful for a voice conversation.
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "S/PDIF",
];

pub(crate) fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

pub(crate) fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Which side of the audio host to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Input,
    Output,
}

/// List usable devices, marking preferred ones with "\[recommended\]".
pub fn list_devices(kind: DeviceKind) -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match kind {
            DeviceKind::Input => host.input_devices().map(|d| d.collect::<Vec<_>>()),
            DeviceKind::Output => host.output_devices().map(|d| d.collect::<Vec<_>>()),
        }
    })
    .map_err(|e| ParleyError::AudioCapture {
        message: format!("Failed to enumerate devices: {e}"),
    })?;

    let mut names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }
            if is_preferred_device(&name) {
                names.push(format!("{name} [recommended]"));
            } else {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Find a device by exact name, or the best default for `kind`.
pub(crate) fn find_device(kind: DeviceKind, device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = match kind {
            DeviceKind::Input => host.input_devices().map(|d| d.collect::<Vec<_>>()),
            DeviceKind::Output => host.output_devices().map(|d| d.collect::<Vec<_>>()),
        }
        .map_err(|e| ParleyError::AudioCapture {
            message: format!("Failed to enumerate devices: {e}"),
        })?;

        if let Some(name) = device_name {
            return devices
                .into_iter()
                .find(|dev| dev.name().is_ok_and(|n| n == name))
                .ok_or_else(|| ParleyError::AudioDeviceNotFound {
                    device: name.to_string(),
                });
        }

        if let Some(preferred) = devices
            .into_iter()
            .find(|dev| dev.name().is_ok_and(|n| is_preferred_device(&n)))
        {
            return Ok(preferred);
        }

        let fallback = match kind {
            DeviceKind::Input => host.default_input_device(),
            DeviceKind::Output => host.default_output_device(),
        };
        fallback.ok_or_else(|| ParleyError::AudioDeviceNotFound {
            device: "default".to_string(),
        })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched through the owning struct's Mutex, and
/// its methods are called synchronously from one thread at a time.
pub(crate) struct SendableStream(pub(crate) cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture at 16 kHz mono i16.
///
/// Tries the preferred format first, then falls back to the device's native
/// config with software channel mixing and resampling.
pub struct CpalAudioSource {
    device: cpal::Device,
    stream: Mutex<Option<SendableStream>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CpalAudioSource {
    /// Open the named input device, or the best default when `None`.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_device(DeviceKind::Input, device_name)?;
        Ok(Self {
            device,
            stream: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate: defaults::SAMPLE_RATE,
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: defaults::CHANNELS,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| eprintln!("Audio stream error: {err}"),
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(data.iter().map(|&s| f32_to_i16(s)));
                }
            },
            |err| eprintln!("Audio stream error: {err}"),
            None,
        ) {
            return Ok(stream);
        }

        self.build_stream_native()
    }

    /// Capture at the device's default config and convert in software.
    fn build_stream_native(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| ParleyError::AudioCapture {
                    message: format!("Failed to query default input config: {e}"),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let buffer = Arc::clone(&self.buffer);
        let counter = Arc::clone(&self.callback_count);

        match default_config.sample_format() {
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let converted =
                            to_mono_at_rate(data, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    |err| eprintln!("Audio stream error: {err}"),
                    None,
                )
                .map_err(|e| ParleyError::AudioCapture {
                    message: format!("Failed to build native i16 stream: {e}"),
                }),
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        counter.fetch_add(1, Ordering::Relaxed);
                        let samples: Vec<i16> = data.iter().map(|&s| f32_to_i16(s)).collect();
                        let converted =
                            to_mono_at_rate(&samples, native_channels, native_rate, target_rate);
                        if let Ok(mut buf) = buffer.lock() {
                            buf.extend_from_slice(&converted);
                        }
                    },
                    |err| eprintln!("Audio stream error: {err}"),
                    None,
                )
                .map_err(|e| ParleyError::AudioCapture {
                    message: format!("Failed to build native f32 stream: {e}"),
                }),
            fmt => Err(ParleyError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {fmt:?}. Try another device with --device."
                ),
            }),
        }
    }

    fn lock_stream(&self) -> Result<std::sync::MutexGuard<'_, Option<SendableStream>>> {
        self.stream.lock().map_err(|e| ParleyError::AudioCapture {
            message: format!("Failed to lock stream: {e}"),
        })
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.lock_stream()?.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| ParleyError::AudioCapture {
            message: format!("Failed to start audio stream: {e}"),
        })?;

        // Some PipeWire-ALSA setups accept a non-native config but never run
        // the data callback.
        std::thread::sleep(Duration::from_millis(200));

        let stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            drop(stream);
            if let Ok(mut buf) = self.buffer.lock() {
                buf.clear();
            }
            let native = self.build_stream_native()?;
            native.play().map_err(|e| ParleyError::AudioCapture {
                message: format!("Failed to start native audio stream: {e}"),
            })?;
            native
        } else {
            stream
        };

        *self.lock_stream()? = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.lock_stream()?.take() {
            stream.0.pause().map_err(|e| ParleyError::AudioCapture {
                message: format!("Failed to stop audio stream: {e}"),
            })?;
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<i16>> {
        let mut buffer = self.buffer.lock().map_err(|e| ParleyError::AudioCapture {
            message: format!("Failed to lock audio buffer: {e}"),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_filter_device() {
        assert!(should_filter_device("surround51"));
        assert!(should_filter_device("front:CARD=PCH"));
        assert!(should_filter_device("Digital Output S/PDIF"));
        assert!(!should_filter_device("pipewire"));
        assert!(!should_filter_device("Built-in Audio"));
    }

    #[test]
    fn test_is_preferred_device() {
        assert!(is_preferred_device("PipeWire"));
        assert!(is_preferred_device("pulse"));
        assert!(!is_preferred_device("hw:0,0"));
        assert!(!is_preferred_device("default"));
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_list_input_devices() {
        let devices = list_devices(DeviceKind::Input).unwrap();
        for device in &devices {
            assert!(!device.to_lowercase().contains("surround"));
        }
    }

    #[test]
    #[ignore] // Requires an audio host
    fn test_create_with_invalid_device_name() {
        match CpalAudioSource::new(Some("NonExistentDevice12345")) {
            Err(ParleyError::AudioDeviceNotFound { device }) => {
                assert_eq!(device, "NonExistentDevice12345");
            }
            Err(other) => panic!("Expected AudioDeviceNotFound, got {other:?}"),
            Ok(_) => panic!("Expected AudioDeviceNotFound"),
        }
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_capture_start_read_stop() {
        let mut source = CpalAudioSource::new(None).unwrap();
        source.start().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(source.read_samples().is_ok());
        source.stop().unwrap();
    }
}
