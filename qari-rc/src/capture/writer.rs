//! WAV assembly using hound

use crate::error::{RcError, Result};
use std::io::Cursor;

/// Assemble mono 16-bit PCM samples into an in-memory WAV blob.
pub fn assemble_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| RcError::Decode(format!("Failed to create WAV writer: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| RcError::Decode(format!("Failed to write WAV sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| RcError::Decode(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
