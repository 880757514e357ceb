use crate::error::{Result, TonewheelError};
use crate::tone::BYTES_PER_FRAME;
use std::time::Duration;

/// Fixed per-session layout of the circular hardware buffer: total size
/// in bytes and how far ahead of the play cursor the software keeps the
/// buffer written.
#[derive(Debug, Clone, Copy)]
pub struct BufferGeometry {
    buffer_len: usize,
    latency_frames: usize,
}

/// One iteration's writable byte range. Recomputed every poll from the
/// frame counter and the hardware play cursor, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSpan {
    pub offset: usize,
    pub len: usize,
}

impl BufferGeometry {
    pub fn new(buffer_len: usize, latency_frames: usize) -> Result<Self> {
        if buffer_len == 0 || buffer_len % BYTES_PER_FRAME != 0 {
            return Err(TonewheelError::Config(format!(
                "buffer size must be a non-zero multiple of {} bytes, got {}",
                BYTES_PER_FRAME, buffer_len
            )));
        }
        if latency_frames * BYTES_PER_FRAME >= buffer_len {
            return Err(TonewheelError::Config(format!(
                "latency window of {} frames does not fit a {} byte buffer",
                latency_frames, buffer_len
            )));
        }

        Ok(Self {
            buffer_len,
            latency_frames,
        })
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn latency_frames(&self) -> usize {
        self.latency_frames
    }

    pub fn latency_bytes(&self) -> usize {
        self.latency_frames * BYTES_PER_FRAME
    }

    /// Byte offset of the first frame the software has not yet written,
    /// given the generator's lifetime frame counter.
    pub fn frame_offset(&self, frames_written: u64) -> usize {
        ((frames_written * BYTES_PER_FRAME as u64) % self.buffer_len as u64) as usize
    }

    /// The range to (re)write this iteration: from the last written byte
    /// up to `latency_frames` ahead of the hardware play cursor. Grows
    /// by itself when the caller polls late, so the scheme needs no
    /// elapsed-time bookkeeping to recover from jitter.
    ///
    /// `offset == target` collapses the span to zero bytes; that is a
    /// legal write, not an error.
    pub fn write_span(&self, lock_offset: usize, play_cursor: usize) -> WriteSpan {
        debug_assert!(lock_offset < self.buffer_len);
        debug_assert!(play_cursor < self.buffer_len);

        let target = (play_cursor + self.latency_bytes()) % self.buffer_len;
        let len = if lock_offset > target {
            (self.buffer_len - lock_offset) + target
        } else {
            target - lock_offset
        };

        WriteSpan {
            offset: lock_offset,
            len,
        }
    }

    /// The polling cadence this geometry tolerates: if one caller
    /// iteration takes longer than this, the play cursor overruns the
    /// written region and the output gaps audibly.
    pub fn max_refill_interval(&self, sample_rate: u32) -> Duration {
        Duration::from_secs_f64(self.latency_frames as f64 / f64::from(sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(buffer_len: usize, latency_frames: usize) -> BufferGeometry {
        BufferGeometry::new(buffer_len, latency_frames).unwrap()
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(BufferGeometry::new(0, 0).is_err());
        assert!(BufferGeometry::new(1001, 10).is_err());
        assert!(BufferGeometry::new(1000, 250).is_err());
        assert!(BufferGeometry::new(1000, 260).is_err());
    }

    #[test]
    fn no_wrap_span() {
        // lock 100, target 500 in a 1000 byte ring
        let g = geometry(1000, 125);
        let span = g.write_span(100, 0);
        assert_eq!(span, WriteSpan { offset: 100, len: 400 });
    }

    #[test]
    fn wrapping_span() {
        // lock 900, target 100: 100 bytes to the end plus 100 from the start
        let g = geometry(1000, 25);
        let span = g.write_span(900, 0);
        assert_eq!(span, WriteSpan { offset: 900, len: 200 });
    }

    #[test]
    fn matching_cursors_collapse_to_zero() {
        let g = geometry(1000, 100);
        let span = g.write_span(400, 0);
        assert_eq!(span.len, 0);
    }

    #[test]
    fn span_always_lands_on_the_target_cursor() {
        let g = geometry(1000, 37);
        for lock in (0..1000).step_by(4) {
            for play in (0..1000).step_by(4) {
                let span = g.write_span(lock, play);
                let target = (play + 37 * BYTES_PER_FRAME) % 1000;
                assert!(span.len < 1000);
                assert_eq!((span.offset + span.len) % 1000, target);
            }
        }
    }

    #[test]
    fn frame_offset_wraps_by_frame_size() {
        let g = geometry(1000, 10);
        assert_eq!(g.frame_offset(0), 0);
        assert_eq!(g.frame_offset(10), 40);
        assert_eq!(g.frame_offset(250), 0);
        assert_eq!(g.frame_offset(251), 4);
    }

    #[test]
    fn refill_interval_reflects_the_latency_window() {
        let g = geometry(48_000 * BYTES_PER_FRAME, 3200);
        let interval = g.max_refill_interval(48_000);
        assert!((interval.as_secs_f64() - 3200.0 / 48_000.0).abs() < 1e-9);
    }
}
