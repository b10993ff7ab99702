//! WAV container reading: `hound` walks the RIFF chunks, [`load_pcm`]
//! decodes the `data` bytes.

use std::io::Cursor;

use hound::{WavReader, WavSpec};

use super::pcm::{load_pcm, AudioBuffer};
use crate::error::FormatError;

const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;

/// Split a WAV file into its format and raw `data` bytes.
pub fn parse_wav(bytes: &[u8]) -> Result<(WavSpec, &[u8]), FormatError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_format == hound::SampleFormat::Float {
        return Err(FormatError::NotPcm(WAVE_FORMAT_IEEE_FLOAT));
    }

    let data_len = reader.len() as usize * spec.bits_per_sample.div_ceil(8) as usize;
    // 读取器停在 data 块开头
    let start = reader.into_inner().position() as usize;
    let end = start.saturating_add(data_len).min(bytes.len());
    Ok((spec, &bytes[start.min(end)..end]))
}

/// Parse and decode a complete WAV file.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, FormatError> {
    let (spec, data) = parse_wav(bytes)?;
    log::debug!(
        "WAV: {} ch, {} Hz, {} bit, {} data bytes",
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        data.len()
    );
    load_pcm(data, spec.bits_per_sample, spec.channels, spec.sample_rate)
}
