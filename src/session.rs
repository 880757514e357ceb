use crate::error::{Result, TonewheelError};
use crate::sink::AudioSink;
use crate::sync::BufferGeometry;
use crate::tone::{ToneGenerator, ToneParams};
use log::{info, trace};
use std::time::Duration;

/// One playback session: tone parameters, buffer geometry, generator
/// state and the hardware sink, owned together and torn down together.
///
/// The session is single-threaded by design. Each caller iteration runs
/// cursor read, range computation, lock, fill and unlock to completion
/// in that order; nothing here suspends or retries.
pub struct AudioSession<S: AudioSink> {
    params: ToneParams,
    geometry: BufferGeometry,
    generator: ToneGenerator,
    sink: S,
}

impl<S: AudioSink> AudioSession<S> {
    pub fn new(sink: S, params: ToneParams, geometry: BufferGeometry) -> Result<Self> {
        if sink.buffer_len() != geometry.buffer_len() {
            return Err(TonewheelError::Config(format!(
                "geometry describes a {} byte buffer but the sink holds {} bytes",
                geometry.buffer_len(),
                sink.buffer_len()
            )));
        }

        Ok(Self {
            params,
            geometry,
            generator: ToneGenerator::new(params),
            sink,
        })
    }

    /// Primes the first latency window from the start of the buffer and
    /// begins looping playback.
    pub fn start(&mut self) -> Result<()> {
        let generator = &mut self.generator;
        self.sink
            .locked_write(0, self.geometry.latency_bytes(), &mut |r1, r2| {
                generator.fill(r1);
                generator.fill(r2);
            })?;
        self.sink.play(true)?;

        info!(
            "Tone session started: {} Hz tone at {} Hz, {} byte ring, {} frame latency window",
            self.params.hertz(),
            self.params.sample_rate(),
            self.geometry.buffer_len(),
            self.geometry.latency_frames()
        );
        Ok(())
    }

    /// Tops the buffer up to the latency window ahead of the hardware
    /// play cursor and returns the byte count written. A sink failure
    /// leaves the generator untouched, so the next call simply computes
    /// a larger catch-up window; callers skip the iteration rather than
    /// retry.
    pub fn refill(&mut self) -> Result<usize> {
        let cursors = self.sink.position()?;
        let lock_offset = self.geometry.frame_offset(self.generator.frames_written());
        let span = self.geometry.write_span(lock_offset, cursors.play);
        trace!(
            "refill: {} bytes at offset {} (play cursor {})",
            span.len,
            span.offset,
            cursors.play
        );

        let generator = &mut self.generator;
        self.sink.locked_write(span.offset, span.len, &mut |r1, r2| {
            generator.fill(r1);
            generator.fill(r2);
        })?;
        Ok(span.len)
    }

    /// How long one caller iteration may take before the play cursor
    /// overruns the written region.
    pub fn max_refill_interval(&self) -> Duration {
        self.geometry.max_refill_interval(self.params.sample_rate())
    }

    pub fn frames_written(&self) -> u64 {
        self.generator.frames_written()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
