//! Output sinks for rendered segments.

use std::thread;
use std::time::Duration;

use anyhow::Result;

use super::AudioConfig;

/// Stream layout a sink is opened with; matches the decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl OutputFormat {
    pub fn duration_of(&self, samples: usize) -> Duration {
        let frames = samples / self.channels.max(1) as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

/// A device that plays interleaved normalized samples.
///
/// `render` blocks until the whole segment has been emitted; the playback
/// worker relies on that to decide when it is idle again.
pub trait AudioSink: Send {
    fn name(&self) -> &str;

    fn render(&mut self, samples: &[f32]) -> Result<()>;
}

/// Discards audio but takes exactly as long as real playback would.
pub struct NullSink {
    format: OutputFormat,
}

impl NullSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl AudioSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        thread::sleep(self.format.duration_of(samples.len()));
        Ok(())
    }
}

/// Convert a normalized sample to S16.
pub fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

/// Consecutive failed writes tolerated before a segment is abandoned.
pub const MAX_RECOVERY_RETRIES: u32 = 3;

/// Push every frame of interleaved `data` through `write`, which may accept
/// fewer frames than offered. `recover` runs after each failed write; once
/// [`MAX_RECOVERY_RETRIES`] writes in a row fail the segment is an error.
pub fn write_with_recovery<W, R>(data: &[i16], channels: usize, mut write: W, mut recover: R) -> Result<()>
where
    W: FnMut(&[i16]) -> Result<usize>,
    R: FnMut() -> Result<()>,
{
    let channels = channels.max(1);
    let total_frames = data.len() / channels;
    let mut frames_written = 0;
    let mut failures = 0u32;

    while frames_written < total_frames {
        let err = match write(&data[frames_written * channels..]) {
            Ok(n) if n > 0 => {
                frames_written += n;
                failures = 0;
                continue;
            }
            Ok(_) => anyhow::anyhow!("device accepted no frames"),
            Err(e) => e,
        };

        failures += 1;
        if failures >= MAX_RECOVERY_RETRIES {
            anyhow::bail!(
                "Giving up after {} write errors ({}), {} of {} frames written",
                failures,
                err,
                frames_written,
                total_frames
            );
        }
        log::warn!("ALSA XRUN or error: {}, recovering...", err);
        recover()?;
    }
    Ok(())
}

/// Factory function: create a sink based on the configured output.
pub fn create_sink(config: &AudioConfig, format: OutputFormat) -> Result<Box<dyn AudioSink>> {
    match config.sink.as_str() {
        "null" => Ok(Box::new(NullSink::new(format))),
        #[cfg(feature = "alsa")]
        "alsa" | "auto" => Ok(Box::new(super::alsa_device::AlsaSink::open(config, format)?)),
        #[cfg(not(feature = "alsa"))]
        "alsa" => anyhow::bail!("Built without ALSA support (enable the `alsa` feature)"),
        #[cfg(not(feature = "alsa"))]
        "auto" => {
            log::warn!("No audio backend compiled in, rendering to the null sink");
            Ok(Box::new(NullSink::new(format)))
        }
        other => anyhow::bail!("Unsupported audio sink: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sample_conversion_saturates() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), i16::MAX);
        assert_eq!(to_i16(-1.0), -i16::MAX);
        assert_eq!(to_i16(3.5), i16::MAX);
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let format = OutputFormat { sample_rate: 1000, channels: 2 };
        assert_eq!(format.duration_of(200), Duration::from_millis(100));
    }

    #[test]
    fn null_sink_blocks_for_segment_length() {
        let format = OutputFormat { sample_rate: 1000, channels: 1 };
        let mut sink = NullSink::new(format);
        let started = Instant::now();
        sink.render(&[0.0; 50]).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn short_writes_are_continued() {
        let data: Vec<i16> = (0..10).collect();
        let mut seen = Vec::new();
        write_with_recovery(
            &data,
            2,
            |chunk| {
                // two frames per call
                let n = (chunk.len() / 2).min(2);
                seen.extend_from_slice(&chunk[..n * 2]);
                Ok(n)
            },
            || panic!("no recovery expected"),
        )
        .unwrap();
        assert_eq!(seen, data);
    }

    #[test]
    fn transient_error_is_recovered() {
        let data = [0i16; 8];
        let mut calls = 0;
        let mut recoveries = 0;
        write_with_recovery(
            &data,
            1,
            |chunk| {
                calls += 1;
                if calls == 1 { anyhow::bail!("xrun") } else { Ok(chunk.len()) }
            },
            || {
                recoveries += 1;
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(recoveries, 1);
    }

    #[test]
    fn persistent_errors_fail_the_segment() {
        let data = [0i16; 8];
        let mut recoveries = 0;
        let mut first = true;
        let result = write_with_recovery(
            &data,
            1,
            |_| {
                if std::mem::take(&mut first) { Ok(3) } else { anyhow::bail!("xrun") }
            },
            || {
                recoveries += 1;
                Ok(())
            },
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("3 of 8 frames"), "{}", err);
        assert_eq!(recoveries, MAX_RECOVERY_RETRIES - 1);
    }

    #[test]
    fn stalled_device_fails_the_segment() {
        let result = write_with_recovery(&[0i16; 4], 1, |_| Ok(0), || Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_sink_is_rejected() {
        let config = AudioConfig { sink: "pulse".into(), ..AudioConfig::default() };
        let format = OutputFormat { sample_rate: 8000, channels: 1 };
        assert!(create_sink(&config, format).is_err());
        let config = AudioConfig { sink: "null".into(), ..AudioConfig::default() };
        assert_eq!(create_sink(&config, format).unwrap().name(), "null");
    }
}
