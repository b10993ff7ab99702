//! Decode-time error types.

use thiserror::Error;

/// Failure to turn source bytes into an [`AudioBuffer`](crate::audio::AudioBuffer).
///
/// Always fatal to the load step: the player refuses to start rather than
/// play a partially decoded or corrupted buffer.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unsupported bit depth: {0} (expected 8, 16, 24 or 32)")]
    UnsupportedBitDepth(u16),

    #[error("channel count must be at least 1")]
    NoChannels,

    #[error("sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("PCM length {len} is not a multiple of the {frame_size}-byte frame size")]
    MisalignedLength { len: usize, frame_size: usize },

    #[error("PCM data contains no frames")]
    Empty,

    /// RIFF/WAVE container problems.
    #[error("malformed WAV container: {0}")]
    Container(#[from] hound::Error),

    #[error("unsupported WAV encoding tag 0x{0:04X} (only linear PCM)")]
    NotPcm(u16),
}
