//! The playback worker.
//!
//! Uses a std::thread (NOT a tokio task) because rendering blocks for the
//! whole segment; the serial reception path must never wait on it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

use anyhow::Result;

use super::sink::AudioSink;
use crate::scheduler::{PlaybackRequest, PlaybackScheduler};

/// Owns the playback thread and the single-slot request channel feeding it.
pub struct Player {
    running: Arc<AtomicBool>,
    tx: Option<mpsc::Sender<PlaybackRequest>>,
    play_handle: Option<JoinHandle<()>>,
}

impl Player {
    /// Start the playback thread rendering into `sink`.
    pub fn start(scheduler: Arc<PlaybackScheduler>, sink: Box<dyn AudioSink>) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        // At most one in-flight request
        let (tx, rx) = mpsc::channel::<PlaybackRequest>(1);

        log::info!("Player starting, sink: {}", sink.name());

        let play_handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("audio-play".into())
                .spawn(move || play_thread(scheduler, sink, rx, &running))?
        };

        Ok(Self {
            running,
            tx: Some(tx),
            play_handle: Some(play_handle),
        })
    }

    /// Hand a request to the worker without waiting. Returns `false` if the
    /// worker cannot take it.
    pub fn submit(&self, request: PlaybackRequest) -> bool {
        match &self.tx {
            Some(tx) => tx.try_send(request).is_ok(),
            None => false,
        }
    }

    /// Signal the thread to stop and wait for the current render to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Closing the channel wakes the thread if it is waiting for work
        self.tx.take();
        if let Some(h) = self.play_handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

fn play_thread(
    scheduler: Arc<PlaybackScheduler>,
    mut sink: Box<dyn AudioSink>,
    mut rx: mpsc::Receiver<PlaybackRequest>,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        // Block until a request arrives (or the channel closes)
        match rx.blocking_recv() {
            Some(request) => {
                log::info!(
                    "[play] start {:.3}s ({} frames)",
                    request.duration_sec,
                    request.frames
                );
                match scheduler.render(&request, sink.as_mut()) {
                    Ok(()) => log::info!("[play] done {:.3}s", request.duration_sec),
                    Err(e) => log::error!("Playback error: {:#}", e),
                }
            }
            None => {
                log::info!("Playback channel closed");
                break;
            }
        }
    }

    log::info!("Playback stopped");
}
