//! WAV transport encoding for the transcription service.
//!
//! The service consumes whole utterances as WAV buffers; this is the only
//! serialization the pipeline performs.

use crate::error::{MeetscribeError, Result};
use std::io::Cursor;

/// Encodes mono 16-bit PCM samples into an in-memory WAV buffer.
pub fn encode_wav_mono16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
        let mut writer16 = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            writer16.write_sample(sample);
        }
        writer16.flush().map_err(encode_error)?;
        writer.finalize().map_err(encode_error)?;
    }

    Ok(cursor.into_inner())
}

fn encode_error(e: hound::Error) -> MeetscribeError {
    MeetscribeError::permanent(format!("WAV encode failed: {e}"))
}
