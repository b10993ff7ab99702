//! audio - PCM decoding, wrapping reads and segment playback
//!
//! The source recording is decoded once into an [`AudioBuffer`]; segments
//! are cut from it with a [`PositionCursor`] and rendered on a dedicated
//! playback thread through an [`AudioSink`].

#[cfg(feature = "alsa")]
mod alsa_device;
pub mod cursor;
pub mod pcm;
mod player;
pub mod sink;
pub mod wav;

pub use cursor::PositionCursor;
pub use pcm::{load_pcm, AudioBuffer, SampleFormat};
pub use player::Player;
pub use sink::{create_sink, AudioSink, NullSink, OutputFormat};
pub use wav::decode_wav;

use crate::config::Config;

/// Audio output configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// "auto", "alsa" or "null"
    pub sink: String,
    /// ALSA playback device name (e.g. "default", "plughw:0,0")
    pub playback_device: String,
    /// Desired ALSA playback period size (0 = let ALSA decide)
    pub period_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sink: "auto".to_string(),
            playback_device: "default".to_string(),
            period_size: 1024,
        }
    }
}

impl From<&Config> for AudioConfig {
    fn from(config: &Config) -> Self {
        Self {
            sink: config.audio_sink.to_string(),
            playback_device: config.audio_playback_device.to_string(),
            period_size: config.audio_period_size,
        }
    }
}
