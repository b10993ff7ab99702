use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::AsyncRead;

use crate::audio::{AudioSink, Player};
use crate::scheduler::{PlaybackPhase, PlaybackScheduler};
use crate::serial_link::EventReader;

/// Routes inbound device lines to the scheduler and hands playback requests
/// to the worker thread.
pub struct CoreController {
    scheduler: Arc<PlaybackScheduler>,
    player: Player,
}

impl CoreController {
    pub fn new(scheduler: Arc<PlaybackScheduler>, sink: Box<dyn AudioSink>) -> Result<Self> {
        let player = Player::start(scheduler.clone(), sink)?;
        Ok(Self { scheduler, player })
    }

    pub fn scheduler(&self) -> &Arc<PlaybackScheduler> {
        &self.scheduler
    }

    /// Never blocks on playback.
    pub fn handle_line(&self, line: &str) {
        if let Some(request) = self.scheduler.on_event(line) {
            if !self.player.submit(request) {
                log::warn!("Playback worker unavailable, dropping segment");
                self.scheduler.abandon(&request);
            }
        }
    }

    /// Consume lines until end of stream, a read error or `shutdown`.
    pub async fn run<R, F>(&mut self, reader: &mut EventReader<R>, shutdown: F) -> Result<()>
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested");
                    break;
                }
                line = reader.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line),
                    Ok(None) => {
                        log::warn!("Serial stream closed");
                        break;
                    }
                    Err(e) => {
                        log::error!("Serial read error: {}", e);
                        return Err(e.into());
                    }
                },
            }
        }
        Ok(())
    }

    /// Stop the worker, letting an in-progress segment finish.
    pub fn shutdown(mut self) {
        if self.scheduler.phase() == PlaybackPhase::Playing {
            log::info!("Waiting for the current segment to finish");
        }
        self.player.stop();
    }
}
