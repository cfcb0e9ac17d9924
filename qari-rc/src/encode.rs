//! Upload-format encoding.
//!
//! Recitations are uploaded as 16 kHz mono WAV regardless of how they
//! were captured, which keeps the transcription service's input uniform
//! and the payload small. Callers fall back to uploading the original
//! file when this conversion fails.

use crate::capture::writer;
use crate::error::{RcError, Result};
use crate::validate::DecodedAudio;
use rubato::{FastFixedIn, Resampler as RubatoResampler};
use tracing::debug;

/// Sample rate of every uploaded recitation.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Re-encode decoded audio as 16 kHz mono 16-bit WAV.
pub fn to_wav_16k_mono(decoded: &DecodedAudio) -> Result<Vec<u8>> {
    let mono = downmix(&decoded.samples, decoded.channels);

    let resampled = if decoded.sample_rate == TARGET_SAMPLE_RATE {
        mono
    } else {
        debug!(
            "Resampling from {}Hz to {}Hz",
            decoded.sample_rate, TARGET_SAMPLE_RATE
        );
        resample_mono(mono, decoded.sample_rate)?
    };

    let pcm: Vec<i16> = resampled
        .iter()
        .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect();

    writer::assemble_wav(&pcm, TARGET_SAMPLE_RATE)
}

/// Average interleaved samples down to a single channel.
fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let num_channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / num_channels);
    for frame in samples.chunks_exact(num_channels) {
        mono.push(frame.iter().sum::<f32>() / num_channels as f32);
    }
    mono
}

/// Resample a mono clip to [`TARGET_SAMPLE_RATE`] in one pass.
fn resample_mono(input: Vec<f32>, input_rate: u32) -> Result<Vec<f32>> {
    let input_frames = input.len();
    if input_frames == 0 {
        return Ok(input);
    }

    let mut resampler = FastFixedIn::<f32>::new(
        TARGET_SAMPLE_RATE as f64 / input_rate as f64,
        1.0,
        rubato::PolynomialDegree::Septic,
        input_frames,
        1,
    )
    .map_err(|e| RcError::Decode(format!("Failed to create resampler: {}", e)))?;

    let planar_input = vec![input];
    let mut planar_output = resampler
        .process(&planar_input, None)
        .map_err(|e| RcError::Decode(format!("Resampling failed: {}", e)))?;

    Ok(planar_output.remove(0))
}
