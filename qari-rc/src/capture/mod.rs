//! Microphone capture session
//!
//! A recording is a single owned [`CaptureSession`] value: starting it
//! opens the input device, stopping it consumes the session and yields a
//! WAV blob. The device is released on every exit path, including drop,
//! so an abandoned session never wedges the microphone.
//!
//! Lifecycle: `Idle -> Recording -> Processing -> Ready` (or `Error`).
//! A retake is a fresh session; there is no in-place reset.

pub mod device;
pub mod writer;

use crate::error::{RcError, Result};
use qari_common::media;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Capture lifecycle state, used for status display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Processing,
    Ready,
    Error,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Processing => "processing",
            CaptureState::Ready => "ready",
            CaptureState::Error => "error",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An active microphone recording.
///
/// Owns the input stream, the sample buffer, and the recording ceiling.
/// Only one session can hold a device at a time; the previous session
/// must be stopped or dropped before starting another.
pub struct CaptureSession {
    stream: Option<cpal::Stream>,
    buffer: Arc<Mutex<Vec<i16>>>,
    ceiling_hit: Arc<AtomicBool>,
    started_at: Instant,
    sample_rate: u32,
    channels: u16,
    state: CaptureState,
}

impl CaptureSession {
    /// Open the input device and begin recording.
    ///
    /// The stream appends interleaved i16 samples to the session buffer
    /// until [`stop`](Self::stop) is called or the ceiling
    /// ([`media::MAX_DURATION_SECS`]) is reached, whichever comes first.
    pub fn start(device_name: Option<&str>) -> Result<Self> {
        let (input_device, config, sample_format) = device::open_input(device_name)?;

        let sample_rate = config.sample_rate.0;
        let channels = config.channels;
        let max_samples =
            (media::MAX_DURATION_SECS * sample_rate as f64) as usize * channels as usize;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let ceiling_hit = Arc::new(AtomicBool::new(false));

        let stream = device::build_capture_stream(
            &input_device,
            &config,
            sample_format,
            Arc::clone(&buffer),
            Arc::clone(&ceiling_hit),
            max_samples,
        )?;

        use cpal::traits::StreamTrait;
        stream
            .play()
            .map_err(|e| RcError::DeviceUnavailable(format!("Failed to start stream: {}", e)))?;

        info!(
            sample_rate = sample_rate,
            channels = channels,
            "Recording started"
        );

        Ok(Self {
            stream: Some(stream),
            buffer,
            ceiling_hit,
            started_at: Instant::now(),
            sample_rate,
            channels,
            state: CaptureState::Recording,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Wall-clock time since the recording began.
    ///
    /// Progress display only; acceptance is decided by the intrinsic
    /// duration of the assembled audio, never by this value.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether the recording ceiling was reached and capture auto-stopped.
    pub fn ceiling_reached(&self) -> bool {
        self.ceiling_hit.load(Ordering::SeqCst)
    }

    /// Stop recording and assemble the captured samples into a WAV blob.
    ///
    /// Consumes the session: the input stream is dropped (releasing the
    /// device) before any processing happens, so a slow assembly never
    /// holds the microphone.
    pub fn stop(mut self) -> Result<Vec<u8>> {
        self.state = CaptureState::Processing;

        if let Some(stream) = self.stream.take() {
            drop(stream);
        }

        let samples = {
            let mut guard = self.buffer.lock().unwrap();
            std::mem::take(&mut *guard)
        };

        if samples.is_empty() {
            warn!("Capture produced no samples");
            return Err(RcError::EmptyCapture);
        }

        let mono = downmix_to_mono(&samples, self.channels);
        info!(
            frames = mono.len(),
            sample_rate = self.sample_rate,
            ceiling_hit = self.ceiling_reached(),
            "Recording stopped"
        );

        writer::assemble_wav(&mono, self.sample_rate)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Release the device even if the session is abandoned mid-recording
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
    }
}

/// Average interleaved multi-channel samples down to mono.
fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);
    for frame in samples.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        mono.push((sum / channels as i32) as i16);
    }
    mono
}
