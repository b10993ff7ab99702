//! Linear PCM decoding into a normalized, immutable frame buffer.

use crate::error::FormatError;

/// Sample encoding of interleaved little-endian PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Offset binary, silence at 128.
    Unsigned8,
    Signed16LE,
    /// Packed in three bytes.
    Signed24LE,
    Signed32LE,
}

impl SampleFormat {
    pub fn from_bit_depth(bits: u16) -> Result<Self, FormatError> {
        match bits {
            8 => Ok(SampleFormat::Unsigned8),
            16 => Ok(SampleFormat::Signed16LE),
            24 => Ok(SampleFormat::Signed24LE),
            32 => Ok(SampleFormat::Signed32LE),
            other => Err(FormatError::UnsupportedBitDepth(other)),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Unsigned8 => 1,
            SampleFormat::Signed16LE => 2,
            SampleFormat::Signed24LE => 3,
            SampleFormat::Signed32LE => 4,
        }
    }

    /// Decode one sample to `[-1.0, 1.0)`. `bytes` holds exactly
    /// `bytes_per_sample()` bytes.
    fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            SampleFormat::Unsigned8 => (bytes[0] as f32 - 128.0) / 128.0,
            SampleFormat::Signed16LE => {
                i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32_768.0
            }
            SampleFormat::Signed24LE => {
                // Place the 24 bits at the top of an i32, then shift back to sign-extend
                let raw = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
                raw as f32 / 8_388_608.0
            }
            SampleFormat::Signed32LE => {
                let raw = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (raw as f64 / 2_147_483_648.0) as f32
            }
        }
    }
}

/// Fully decoded interleaved audio. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Interleaved samples of frames `start..end`.
    pub fn frames(&self, start: usize, end: usize) -> &[f32] {
        let ch = self.channels as usize;
        &self.samples[start * ch..end * ch]
    }

    /// Frames needed to cover `secs` seconds, never fewer than one.
    pub fn frames_for(&self, secs: f64) -> usize {
        ((secs * self.sample_rate as f64).round() as usize).max(1)
    }
}

/// Decode raw interleaved PCM bytes.
///
/// Either the whole buffer decodes or nothing is returned.
pub fn load_pcm(
    bytes: &[u8],
    bit_depth: u16,
    channels: u16,
    sample_rate: u32,
) -> Result<AudioBuffer, FormatError> {
    let format = SampleFormat::from_bit_depth(bit_depth)?;
    if channels == 0 {
        return Err(FormatError::NoChannels);
    }
    if sample_rate == 0 {
        return Err(FormatError::ZeroSampleRate);
    }

    let frame_size = format.bytes_per_sample() * channels as usize;
    if bytes.len() % frame_size != 0 {
        return Err(FormatError::MisalignedLength { len: bytes.len(), frame_size });
    }
    if bytes.is_empty() {
        return Err(FormatError::Empty);
    }

    let samples = bytes
        .chunks_exact(format.bytes_per_sample())
        .map(|b| format.decode(b))
        .collect();

    Ok(AudioBuffer { samples, channels, sample_rate })
}
