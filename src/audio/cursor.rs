//! Wrapping read position into an [`AudioBuffer`].

use std::ops::Range;

use super::pcm::AudioBuffer;

/// Frame offset into a buffer of `total_frames`, always in `[0, total_frames)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionCursor {
    offset: usize,
    total_frames: usize,
}

impl PositionCursor {
    /// `total_frames` must be non-zero; decoding never yields an empty buffer.
    pub fn new(total_frames: usize) -> Self {
        debug_assert!(total_frames > 0);
        Self { offset: 0, total_frames }
    }

    pub fn for_buffer(buffer: &AudioBuffer) -> Self {
        Self::new(buffer.total_frames())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Frame ranges that together cover `frame_count` frames from the current
    /// offset: the tail `[offset, total)`, as many whole passes as needed,
    /// and a final head segment. Does not move the cursor.
    pub fn segments(&self, frame_count: usize) -> Vec<Range<usize>> {
        let mut segments = Vec::new();
        let mut start = self.offset;
        let mut remaining = frame_count;
        while remaining > 0 {
            let len = remaining.min(self.total_frames - start);
            segments.push(start..start + len);
            remaining -= len;
            start = 0;
        }
        segments
    }

    pub fn advance(&mut self, frame_count: usize) {
        self.offset = (self.offset + frame_count % self.total_frames) % self.total_frames;
    }

    /// Exactly `frame_count` frames of interleaved samples, wrapping as
    /// needed, then moves the cursor past them.
    pub fn read(&mut self, buffer: &AudioBuffer, frame_count: usize) -> Vec<f32> {
        let samples = gather(buffer, &self.segments(frame_count));
        self.advance(frame_count);
        samples
    }
}

/// Concatenate the given frame ranges of `buffer`.
pub fn gather(buffer: &AudioBuffer, segments: &[Range<usize>]) -> Vec<f32> {
    let frames: usize = segments.iter().map(|r| r.len()).sum();
    let mut out = Vec::with_capacity(frames * buffer.channels() as usize);
    for r in segments {
        out.extend_from_slice(buffer.frames(r.start, r.end));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::load_pcm;

    /// Mono 8-bit buffer whose frame `i` decodes to `i / 128`.
    fn ramp(frames: u8) -> AudioBuffer {
        let bytes: Vec<u8> = (0..frames).map(|i| 128 + i).collect();
        load_pcm(&bytes, 8, 1, 1000).unwrap()
    }

    fn indices(samples: &[f32]) -> Vec<usize> {
        samples.iter().map(|s| (s * 128.0).round() as usize).collect()
    }

    #[test]
    fn full_read_returns_buffer_and_resets() {
        let buf = ramp(10);
        let mut cursor = PositionCursor::for_buffer(&buf);
        let out = cursor.read(&buf, 10);
        assert_eq!(indices(&out), (0..10).collect::<Vec<_>>());
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn read_past_end_repeats_head() {
        let buf = ramp(10);
        let mut cursor = PositionCursor::for_buffer(&buf);
        let out = cursor.read(&buf, 15);
        let mut expected: Vec<usize> = (0..10).collect();
        expected.extend(0..5);
        assert_eq!(indices(&out), expected);
        assert_eq!(cursor.offset(), 5);
    }

    #[test]
    fn seam_is_continuous() {
        let buf = ramp(10);
        let mut cursor = PositionCursor::for_buffer(&buf);
        cursor.advance(8);
        assert_eq!(cursor.segments(5), vec![8..10, 0..3]);
        let out = cursor.read(&buf, 5);
        assert_eq!(indices(&out), vec![8, 9, 0, 1, 2]);
        assert_eq!(cursor.offset(), 3);
    }

    #[test]
    fn multiple_wraps_land_inside_buffer() {
        let buf = ramp(4);
        let mut cursor = PositionCursor::for_buffer(&buf);
        cursor.advance(3);
        assert_eq!(cursor.segments(10), vec![3..4, 0..4, 0..4, 0..1]);
        let out = cursor.read(&buf, 10);
        assert_eq!(out.len(), 10);
        assert_eq!(indices(&out), vec![3, 0, 1, 2, 3, 0, 1, 2, 3, 0]);
        assert_eq!(cursor.offset(), 1);
    }

    #[test]
    fn segments_do_not_move_cursor() {
        let mut cursor = PositionCursor::new(10);
        cursor.advance(7);
        let _ = cursor.segments(30);
        assert_eq!(cursor.offset(), 7);
        cursor.advance(usize::MAX);
        assert!(cursor.offset() < 10);
    }

    #[test]
    fn stereo_frames_stay_interleaved() {
        // L = frame index, R = negated
        let bytes: Vec<u8> = (0..3u8).flat_map(|i| [128 + i, 128 - i]).collect();
        let buf = load_pcm(&bytes, 8, 2, 1000).unwrap();
        let mut cursor = PositionCursor::for_buffer(&buf);
        cursor.advance(2);
        let out = cursor.read(&buf, 2);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0] * 128.0, 2.0);
        assert_eq!(out[1] * 128.0, -2.0);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);
    }
}
