//! Interval-synchronized playback scheduling.
//!
//! The reception path calls [`PlaybackScheduler::on_event`] for every line;
//! the playback thread calls [`PlaybackScheduler::render`]. Tracker, cursor
//! and phase live behind one lock so neither side sees the other half-done.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::Mutex;

use crate::audio::cursor::gather;
use crate::audio::{AudioBuffer, AudioSink, PositionCursor};
use crate::interval::{CloseOutcome, DurationBounds, IntervalTracker};
use crate::protocol::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Playing,
}

/// A segment to play: clamped duration and the frame count it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackRequest {
    pub duration_sec: f64,
    pub frames: usize,
}

struct SharedState {
    tracker: IntervalTracker,
    cursor: PositionCursor,
    phase: PlaybackPhase,
}

pub struct PlaybackScheduler {
    buffer: Arc<AudioBuffer>,
    bounds: DurationBounds,
    state: Mutex<SharedState>,
}

impl PlaybackScheduler {
    pub fn new(buffer: AudioBuffer, bounds: DurationBounds) -> Self {
        let cursor = PositionCursor::for_buffer(&buffer);
        Self {
            buffer: Arc::new(buffer),
            bounds,
            state: Mutex::new(SharedState {
                tracker: IntervalTracker::new(),
                cursor,
                phase: PlaybackPhase::Idle,
            }),
        }
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Classify one inbound line (timestamped now) and update state.
    pub fn on_event(&self, line: &str) -> Option<PlaybackRequest> {
        self.handle_event(Event::classify(line, Instant::now()))
    }

    /// Feed an already classified event. A request is returned only when a
    /// `Close` records an interval while the player is idle; the phase is
    /// then `Playing` until [`render`](Self::render) finishes.
    pub fn handle_event(&self, event: Event) -> Option<PlaybackRequest> {
        match event {
            Event::Other(line) => {
                if !line.is_empty() {
                    log::info!("[recv] {}", line);
                }
                None
            }
            Event::Open(at) => {
                self.state.lock().tracker.open(at);
                None
            }
            Event::Close(at) => {
                let mut state = self.state.lock();
                match state.tracker.close(at) {
                    CloseOutcome::Recorded(interval) => {
                        log::debug!("Interval {:.3}s, history {:?}", interval, state.tracker.history());
                    }
                    CloseOutcome::Stale(reason) => {
                        log::debug!("Ignoring stale close: {:?}", reason);
                        return None;
                    }
                }

                let average = state.tracker.average()?;
                if state.phase == PlaybackPhase::Playing {
                    log::debug!("Close while playing, not starting another segment");
                    return None;
                }

                let duration_sec = self.bounds.clamp(average);
                state.phase = PlaybackPhase::Playing;
                Some(PlaybackRequest {
                    duration_sec,
                    frames: self.buffer.frames_for(duration_sec),
                })
            }
        }
    }

    /// Play `request` from the current cursor position, blocking until the
    /// sink is done. The cursor only moves after a successful render; the
    /// phase returns to `Idle` either way.
    pub fn render(&self, request: &PlaybackRequest, sink: &mut dyn AudioSink) -> Result<()> {
        let segments = self.state.lock().cursor.segments(request.frames);
        let samples = gather(&self.buffer, &segments);

        let result = sink.render(&samples);

        let mut state = self.state.lock();
        if result.is_ok() {
            state.cursor.advance(request.frames);
        }
        state.phase = PlaybackPhase::Idle;
        result
    }

    /// Give up on a request that never reached the playback thread.
    pub fn abandon(&self, _request: &PlaybackRequest) {
        self.state.lock().phase = PlaybackPhase::Idle;
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.lock().phase
    }

    pub fn cursor_offset(&self) -> usize {
        self.state.lock().cursor.offset()
    }

    pub fn history(&self) -> Vec<f64> {
        self.state.lock().tracker.history()
    }

    pub fn average(&self) -> Option<f64> {
        self.state.lock().tracker.average()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::load_pcm;
    use approx::assert_abs_diff_eq;
    use std::sync::mpsc as std_mpsc;
    use std::thread;
    use std::time::Duration;

    /// Records every rendered segment.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub rendered: Arc<Mutex<Vec<Vec<f32>>>>,
    }

    impl AudioSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn render(&mut self, samples: &[f32]) -> Result<()> {
            self.rendered.lock().push(samples.to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    impl AudioSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn render(&mut self, _samples: &[f32]) -> Result<()> {
            anyhow::bail!("device unplugged")
        }
    }

    /// Blocks inside `render` until released.
    struct GatedSink {
        entered: std_mpsc::Sender<()>,
        release: std_mpsc::Receiver<()>,
    }

    impl AudioSink for GatedSink {
        fn name(&self) -> &str {
            "gated"
        }

        fn render(&mut self, _samples: &[f32]) -> Result<()> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Ok(())
        }
    }

    /// Mono 8-bit buffer of `frames` frames at `rate` Hz.
    pub(crate) fn silent_buffer(frames: usize, rate: u32) -> AudioBuffer {
        load_pcm(&vec![128u8; frames], 8, 1, rate).unwrap()
    }

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn end_to_end_interval_scenario() {
        let scheduler = PlaybackScheduler::new(silent_buffer(50_000, 44_100), DurationBounds::default());
        let t0 = Instant::now();

        assert_eq!(scheduler.handle_event(Event::Open(at(t0, 0.0))), None);
        let first = scheduler.handle_event(Event::Close(at(t0, 0.60))).unwrap();
        assert_abs_diff_eq!(first.duration_sec, 0.60, epsilon = 1e-6);
        scheduler.render(&first, &mut RecordingSink::default()).unwrap();

        scheduler.handle_event(Event::Open(at(t0, 1.0)));
        let second = scheduler.handle_event(Event::Close(at(t0, 1.58))).unwrap();

        let history = scheduler.history();
        assert_eq!(history.len(), 2);
        assert_abs_diff_eq!(history[0], 0.60, epsilon = 1e-6);
        assert_abs_diff_eq!(history[1], 0.58, epsilon = 1e-6);
        assert_abs_diff_eq!(scheduler.average().unwrap(), 0.59, epsilon = 1e-6);
        assert_abs_diff_eq!(second.duration_sec, 0.59, epsilon = 1e-6);
        assert_eq!(second.frames, (0.59f64 * 44_100.0).round() as usize);
        assert_eq!(scheduler.phase(), PlaybackPhase::Playing);
        assert_eq!(scheduler.cursor_offset(), first.frames);
    }

    #[test]
    fn on_event_classifies_text() {
        let scheduler = PlaybackScheduler::new(silent_buffer(100, 1000), DurationBounds::default());
        assert_eq!(scheduler.on_event("boot ok"), None);
        assert_eq!(scheduler.on_event("OPEN"), None);
        thread::sleep(Duration::from_millis(5));
        let request = scheduler.on_event(" close \r").unwrap();
        // A few milliseconds clamps up to the minimum
        assert_eq!(request.duration_sec, 0.05);
        assert_eq!(request.frames, 50);
    }

    #[test]
    fn stale_close_does_not_trigger_playback() {
        let scheduler = PlaybackScheduler::new(silent_buffer(100, 1000), DurationBounds::default());
        assert_eq!(scheduler.handle_event(Event::Close(Instant::now())), None);
        assert!(scheduler.history().is_empty());
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn long_interval_is_clamped() {
        let scheduler = PlaybackScheduler::new(silent_buffer(100, 1000), DurationBounds::default());
        let t0 = Instant::now();
        scheduler.handle_event(Event::Open(t0));
        let request = scheduler.handle_event(Event::Close(at(t0, 9.0))).unwrap();
        assert_eq!(request.duration_sec, 5.0);
        assert_eq!(request.frames, 5000);
    }

    #[test]
    fn close_while_playing_is_dropped_but_recorded() {
        let scheduler = PlaybackScheduler::new(silent_buffer(1000, 1000), DurationBounds::default());
        let t0 = Instant::now();
        scheduler.handle_event(Event::Open(at(t0, 0.0)));
        let first = scheduler.handle_event(Event::Close(at(t0, 0.2))).unwrap();

        scheduler.handle_event(Event::Open(at(t0, 0.5)));
        assert_eq!(scheduler.handle_event(Event::Close(at(t0, 0.9))), None);
        assert_eq!(scheduler.history().len(), 2);
        assert_eq!(scheduler.phase(), PlaybackPhase::Playing);
        assert_eq!(scheduler.cursor_offset(), 0);

        let sink = RecordingSink::default();
        let rendered = sink.rendered.clone();
        let mut sink = sink;
        scheduler.render(&first, &mut sink).unwrap();
        assert_eq!(rendered.lock().len(), 1);
        assert_eq!(rendered.lock()[0].len(), 200);
        assert_eq!(scheduler.cursor_offset(), 200);
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn cursor_is_untouched_until_render_completes() {
        let scheduler = Arc::new(PlaybackScheduler::new(silent_buffer(1000, 1000), DurationBounds::default()));
        let t0 = Instant::now();
        scheduler.handle_event(Event::Open(at(t0, 0.0)));
        let request = scheduler.handle_event(Event::Close(at(t0, 0.3))).unwrap();

        let (entered_tx, entered_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let worker = {
            let scheduler = scheduler.clone();
            thread::spawn(move || {
                let mut sink = GatedSink { entered: entered_tx, release: release_rx };
                scheduler.render(&request, &mut sink)
            })
        };

        entered_rx.recv().unwrap();
        // Mid-render: reception keeps working, nothing new starts, cursor unchanged
        scheduler.handle_event(Event::Open(at(t0, 1.0)));
        assert_eq!(scheduler.handle_event(Event::Close(at(t0, 1.4))), None);
        assert_eq!(scheduler.phase(), PlaybackPhase::Playing);
        assert_eq!(scheduler.cursor_offset(), 0);

        release_tx.send(()).unwrap();
        worker.join().unwrap().unwrap();
        assert_eq!(scheduler.cursor_offset(), 300);
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn failed_render_returns_to_idle_without_advancing() {
        let scheduler = PlaybackScheduler::new(silent_buffer(1000, 1000), DurationBounds::default());
        let t0 = Instant::now();
        scheduler.handle_event(Event::Open(t0));
        let request = scheduler.handle_event(Event::Close(at(t0, 0.1))).unwrap();
        assert!(scheduler.render(&request, &mut FailingSink).is_err());
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
        assert_eq!(scheduler.cursor_offset(), 0);
    }

    #[test]
    fn abandon_releases_playing_phase() {
        let scheduler = PlaybackScheduler::new(silent_buffer(1000, 1000), DurationBounds::default());
        let t0 = Instant::now();
        scheduler.handle_event(Event::Open(t0));
        let request = scheduler.handle_event(Event::Close(at(t0, 0.1))).unwrap();
        scheduler.abandon(&request);
        assert_eq!(scheduler.phase(), PlaybackPhase::Idle);
    }
}
