//! Pre-upload validation of recitation audio.
//!
//! Every candidate submission, whether just captured or imported from a
//! file, is decoded in full before it goes near the network. Acceptance
//! is decided by the intrinsic duration of the decoded audio, so a
//! recording that claims three minutes but decodes to half a second is
//! caught here rather than server-side.

use crate::error::{RcError, Result};
use qari_common::media;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Fully decoded PCM audio.
pub struct DecodedAudio {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Source sample rate
    pub sample_rate: u32,
    /// Channel count in the source (1=mono, 2=stereo, etc.)
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// A submission that passed every local check.
pub struct ValidatedAudio {
    /// Raw file bytes, ready for upload as-is if re-encoding fails
    pub bytes: Vec<u8>,
    /// Canonical content type derived from the file extension
    pub content_type: &'static str,
    /// Intrinsic duration of the decoded audio
    pub duration_secs: f64,
    /// Decoded PCM for the re-encode step
    pub decoded: DecodedAudio,
}

/// Validate an audio file for submission.
///
/// Checks run cheapest-first: extension allow list, file size, then a
/// full decode with duration bounds
/// ([`media::MIN_DURATION_SECS`]..=[`media::MAX_DURATION_SECS`]).
pub fn validate_file(path: &Path) -> Result<ValidatedAudio> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| RcError::UnsupportedType("file has no extension".to_string()))?;

    let content_type = media::mime_for_extension(extension)
        .ok_or_else(|| RcError::UnsupportedType(extension.to_string()))?;

    let size = std::fs::metadata(path)?.len();
    if size > media::MAX_UPLOAD_BYTES as u64 {
        return Err(RcError::FileTooLarge {
            size,
            limit: media::MAX_UPLOAD_BYTES as u64,
        });
    }

    let decoded = decode_file(path)?;
    let duration_secs = decoded.duration_secs();

    if !duration_secs.is_finite() || duration_secs < media::MIN_DURATION_SECS {
        return Err(RcError::TooShort {
            duration: if duration_secs.is_finite() {
                duration_secs
            } else {
                0.0
            },
            minimum: media::MIN_DURATION_SECS,
        });
    }

    if duration_secs > media::MAX_DURATION_SECS {
        return Err(RcError::TooLong {
            duration: duration_secs,
            maximum: media::MAX_DURATION_SECS,
        });
    }

    let bytes = std::fs::read(path)?;

    debug!(
        path = %path.display(),
        duration_secs = duration_secs,
        content_type = content_type,
        "Audio validated"
    );

    Ok(ValidatedAudio {
        bytes,
        content_type,
        duration_secs,
        decoded,
    })
}

/// Decode an entire audio file to interleaved f32 PCM.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path)
        .map_err(|e| RcError::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| RcError::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| RcError::Decode("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| RcError::Decode("Sample rate not found".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| RcError::Decode("Channel count not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| RcError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => convert_samples_to_f32(&decoded, &mut samples),
            Err(e) => {
                warn!("Decode error: {}", e);
                continue;
            }
        }
    }

    debug!(
        "Decoded {} samples ({} frames)",
        samples.len(),
        samples.len() / channels.max(1) as usize
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Convert a decoded buffer to f32, normalizing each format to [-1.0, 1.0].
fn convert_samples_to_f32(decoded: &AudioBufferRef, output: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::F32(buf) => push_frames(buf, output, |s| s),
        AudioBufferRef::F64(buf) => push_frames(buf, output, |s| s as f32),
        AudioBufferRef::S32(buf) => push_frames(buf, output, |s| s as f32 / i32::MAX as f32),
        AudioBufferRef::S16(buf) => push_frames(buf, output, |s| s as f32 / i16::MAX as f32),
        AudioBufferRef::S8(buf) => push_frames(buf, output, |s| s as f32 / i8::MAX as f32),
        AudioBufferRef::U32(buf) => {
            push_frames(buf, output, |s| (s as i32) as f32 / i32::MAX as f32)
        }
        AudioBufferRef::U16(buf) => {
            push_frames(buf, output, |s| ((s as i32) - 32768) as f32 / 32768.0)
        }
        AudioBufferRef::U8(buf) => push_frames(buf, output, |s| ((s as i32) - 128) as f32 / 128.0),
        AudioBufferRef::S24(buf) => push_frames(buf, output, |s| s.inner() as f32 / 8388608.0),
        AudioBufferRef::U24(buf) => push_frames(buf, output, |s| {
            ((s.inner() as i32) - 8388608) as f32 / 8388608.0
        }),
    }
}

/// Interleave a planar buffer into the output, converting each sample.
fn push_frames<S: Sample>(buf: &AudioBuffer<S>, output: &mut Vec<f32>, convert: impl Fn(S) -> f32) {
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    output.reserve(num_frames * num_channels);

    for frame_idx in 0..num_frames {
        for ch_idx in 0..num_channels {
            output.push(convert(buf.chan(ch_idx)[frame_idx]));
        }
    }
}
