use crate::error::{Result, TonewheelError};
use crate::tone::BYTES_PER_FRAME;

/// Hardware-reported byte offsets into the circular buffer. `play` is
/// being read out to the speaker right now; software must not write
/// below `write`.
#[derive(Debug, Clone, Copy)]
pub struct Cursors {
    pub play: usize,
    pub write: usize,
}

/// A looping hardware audio buffer. Every operation reports failure
/// explicitly; callers decide whether a failure is fatal (construction)
/// or skippable (one polling iteration).
pub trait AudioSink {
    fn buffer_len(&self) -> usize;

    fn position(&mut self) -> Result<Cursors>;

    /// Locks `[offset, offset + len)` modulo the buffer and hands `fill`
    /// the writable regions: the second is non-empty only when the span
    /// crosses the physical end of the buffer, and follows the first.
    /// The lock is released when this returns, errors included. A zero
    /// length span still performs the lock/unlock cycle.
    fn locked_write(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<()>;

    /// Starts playback from the current position.
    fn play(&mut self, looped: bool) -> Result<()>;
}

/// Splits a locked byte span into its up-to-two contiguous regions.
pub(crate) fn split_regions(
    buffer: &mut [u8],
    offset: usize,
    len: usize,
) -> Result<(&mut [u8], &mut [u8])> {
    if offset >= buffer.len() || len > buffer.len() {
        return Err(TonewheelError::Sink(format!(
            "lock of {} bytes at offset {} exceeds {} byte buffer",
            len,
            offset,
            buffer.len()
        )));
    }

    if offset + len <= buffer.len() {
        Ok((&mut buffer[offset..offset + len], &mut []))
    } else {
        let wrapped = offset + len - buffer.len();
        let (front, back) = buffer.split_at_mut(offset);
        Ok((back, &mut front[..wrapped]))
    }
}

/// In-memory sink for tests and headless runs. Playback is advanced by
/// hand with [`advance_play`](LoopbackSink::advance_play), standing in
/// for the device consuming the buffer asynchronously.
pub struct LoopbackSink {
    buffer: Box<[u8]>,
    play_cursor: usize,
    playing: bool,
    looped: bool,
}

impl LoopbackSink {
    pub fn new(buffer_len: usize) -> Result<Self> {
        if buffer_len == 0 || buffer_len % BYTES_PER_FRAME != 0 {
            return Err(TonewheelError::Config(format!(
                "loopback buffer must be a non-zero multiple of {} bytes, got {}",
                BYTES_PER_FRAME, buffer_len
            )));
        }

        Ok(Self {
            buffer: vec![0u8; buffer_len].into_boxed_slice(),
            play_cursor: 0,
            playing: false,
            looped: false,
        })
    }

    /// Consumes `bytes` of playback, wrapping when looped. A one-shot
    /// sink stops at the end of the buffer.
    pub fn advance_play(&mut self, bytes: usize) {
        if !self.playing {
            return;
        }

        if self.looped {
            self.play_cursor = (self.play_cursor + bytes) % self.buffer.len();
        } else if self.play_cursor + bytes >= self.buffer.len() {
            self.play_cursor = 0;
            self.playing = false;
        } else {
            self.play_cursor += bytes;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn contents(&self) -> &[u8] {
        &self.buffer
    }
}

impl AudioSink for LoopbackSink {
    fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn position(&mut self) -> Result<Cursors> {
        Ok(Cursors {
            play: self.play_cursor,
            write: self.play_cursor,
        })
    }

    fn locked_write(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<()> {
        let (region1, region2) = split_regions(&mut self.buffer, offset, len)?;
        fill(region1, region2);
        Ok(())
    }

    fn play(&mut self, looped: bool) -> Result<()> {
        self.playing = true;
        self.looped = looped;
        Ok(())
    }
}
