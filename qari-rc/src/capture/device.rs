//! Input device selection and capture stream construction using cpal
//!
//! Capture runs at the device's native configuration; downmixing and
//! resampling happen after the recording stops, never in the callback.

use crate::error::{RcError, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// List available audio input devices.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .input_devices()
        .map_err(|e| RcError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?
        .filter_map(|device| device.name().ok())
        .collect();

    debug!("Found {} input devices", devices.len());
    Ok(devices)
}

/// Open an input device at its native configuration.
///
/// If the requested device is missing, falls back to the default device
/// rather than failing; a classroom machine often renames its USB mic.
pub fn open_input(device_name: Option<&str>) -> Result<(Device, StreamConfig, SampleFormat)> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        let mut devices = host
            .input_devices()
            .map_err(|e| RcError::DeviceUnavailable(format!("Failed to enumerate devices: {}", e)))?;

        match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            Some(dev) => {
                info!("Found requested input device: {}", name);
                dev
            }
            None => {
                warn!("Requested device '{}' not found, falling back to default device", name);
                host.default_input_device().ok_or_else(|| {
                    RcError::DeviceUnavailable(format!(
                        "Device '{}' not found and no default device available",
                        name
                    ))
                })?
            }
        }
    } else {
        host.default_input_device()
            .ok_or_else(|| RcError::DeviceUnavailable("No default input device found".to_string()))?
    };

    let supported = device
        .default_input_config()
        .map_err(|e| RcError::DeviceUnavailable(format!("Failed to get device config: {}", e)))?;

    let sample_format = supported.sample_format();
    let config = supported.config();

    debug!(
        "Input config: sample_rate={}, channels={}, format={:?}",
        config.sample_rate.0, config.channels, sample_format
    );

    Ok((device, config, sample_format))
}

/// Build an input stream that appends interleaved i16 samples to `buffer`.
///
/// The callback stops appending once `max_samples` is reached and flips
/// `ceiling_hit` so the owner can observe the auto-stop.
pub fn build_capture_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    buffer: Arc<Mutex<Vec<i16>>>,
    ceiling_hit: Arc<AtomicBool>,
    max_samples: usize,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::F32 => {
            build_stream_f32(device, config, buffer, ceiling_hit, max_samples)
        }
        SampleFormat::I16 => {
            build_stream_i16(device, config, buffer, ceiling_hit, max_samples)
        }
        SampleFormat::U16 => {
            build_stream_u16(device, config, buffer, ceiling_hit, max_samples)
        }
        sample_format => Err(RcError::DeviceUnavailable(format!(
            "Unsupported sample format: {:?}",
            sample_format
        ))),
    }
}

/// Append converted samples, honoring the ceiling.
fn append_capped(
    buffer: &Arc<Mutex<Vec<i16>>>,
    ceiling_hit: &Arc<AtomicBool>,
    max_samples: usize,
    converted: impl Iterator<Item = i16>,
) {
    let mut samples = buffer.lock().unwrap();
    if samples.len() >= max_samples {
        ceiling_hit.store(true, Ordering::SeqCst);
        return;
    }

    let remaining = max_samples - samples.len();
    samples.extend(converted.take(remaining));

    if samples.len() >= max_samples {
        ceiling_hit.store(true, Ordering::SeqCst);
    }
}

fn build_stream_f32(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
    ceiling_hit: Arc<AtomicBool>,
    max_samples: usize,
) -> Result<Stream> {
    let stream = device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let converted = data
                    .iter()
                    .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                append_capped(&buffer, &ceiling_hit, max_samples, converted);
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| RcError::DeviceUnavailable(format!("Failed to build stream: {}", e)))?;

    Ok(stream)
}

fn build_stream_i16(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
    ceiling_hit: Arc<AtomicBool>,
    max_samples: usize,
) -> Result<Stream> {
    let stream = device
        .build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                append_capped(&buffer, &ceiling_hit, max_samples, data.iter().copied());
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| RcError::DeviceUnavailable(format!("Failed to build stream: {}", e)))?;

    Ok(stream)
}

fn build_stream_u16(
    device: &Device,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<i16>>>,
    ceiling_hit: Arc<AtomicBool>,
    max_samples: usize,
) -> Result<Stream> {
    let stream = device
        .build_input_stream(
            config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let converted = data.iter().map(|s| ((*s as i32) - 32768) as i16);
                append_capped(&buffer, &ceiling_hit, max_samples, converted);
            },
            move |err| {
                error!("Audio input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| RcError::DeviceUnavailable(format!("Failed to build stream: {}", e)))?;

    Ok(stream)
}
