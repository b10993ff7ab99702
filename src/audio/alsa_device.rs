//! ALSA PCM playback sink.

use alsa::pcm::{Access, Format, Frames, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::sink::{to_i16, write_with_recovery, AudioSink, OutputFormat};
use super::AudioConfig;

/// Renders segments to an ALSA device as interleaved S16LE.
pub struct AlsaSink {
    pcm: PCM,
    channels: usize,
}

impl AlsaSink {
    pub fn open(config: &AudioConfig, format: OutputFormat) -> Result<Self> {
        let device = config.playback_device.as_str();
        let pcm = PCM::new(device, Direction::Playback, false)
            .with_context(|| format!("Failed to open PCM device '{}' for Playback", device))?;

        {
            let hwp = HwParams::any(&pcm).context("Failed to initialize HwParams")?;
            hwp.set_access(Access::RWInterleaved)?;
            hwp.set_format(Format::S16LE)?;
            hwp.set_channels(u32::from(format.channels))?;
            hwp.set_rate_near(format.sample_rate, ValueOr::Nearest)?;
            if config.period_size > 0 {
                hwp.set_period_size_near(config.period_size as Frames, ValueOr::Nearest)?;
            }
            pcm.hw_params(&hwp)?;
        }

        let hwp = pcm.hw_params_current()?;
        let rate = hwp.get_rate()?;
        let channels = hwp.get_channels()?;
        let period = hwp.get_period_size()?;
        drop(hwp);

        if channels != u32::from(format.channels) {
            anyhow::bail!(
                "Device '{}' negotiated {} channels, audio has {}",
                device,
                channels,
                format.channels
            );
        }
        if rate != format.sample_rate {
            log::warn!(
                "Device runs at {}Hz but audio is {}Hz, playback speed will be off",
                rate,
                format.sample_rate
            );
        }
        if config.period_size > 0 && period as usize != config.period_size {
            log::debug!("Requested period {} frames, device chose {}", config.period_size, period);
        }

        log::info!(
            "ALSA Playback: device={}, rate={}, channels={}, period_size={}",
            device,
            rate,
            channels,
            period
        );

        Ok(Self {
            pcm,
            channels: channels as usize,
        })
    }
}

impl AudioSink for AlsaSink {
    fn name(&self) -> &str {
        "alsa"
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        let pcm_data: Vec<i16> = samples.iter().map(|&s| to_i16(s)).collect();
        let io = self.pcm.io_i16()?;

        let written = write_with_recovery(
            &pcm_data,
            self.channels,
            |chunk| Ok(io.writei(chunk)?),
            || {
                self.pcm.prepare().context("Failed to recover PCM playback")
            },
        );

        // 无论成功与否都让设备回到可写状态，下一段才能正常播放
        match written {
            Ok(()) => {
                self.pcm.drain().context("Failed to drain PCM playback")?;
                self.pcm.prepare().context("Failed to re-prepare PCM playback")?;
                Ok(())
            }
            Err(e) => {
                if let Err(prep) = self.pcm.prepare() {
                    log::warn!("Failed to re-prepare PCM after error: {}", prep);
                }
                Err(e)
            }
        }
    }
}
