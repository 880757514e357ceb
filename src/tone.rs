use crate::error::{Result, TonewheelError};
use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};
use std::f32::consts::PI;

/// 2 channels x 16-bit samples.
pub const BYTES_PER_FRAME: usize = 4;

/// Fixed per-session tone description. Validated at construction; the
/// amplitude is an `i16` so it cannot exceed the output sample range.
#[derive(Debug, Clone, Copy)]
pub struct ToneParams {
    sample_rate: u32,
    hertz: u32,
    amplitude: i16,
}

impl ToneParams {
    pub fn new(sample_rate: u32, hertz: u32, amplitude: i16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TonewheelError::Config(
                "sample rate must be at least 1 frame per second".to_string(),
            ));
        }
        if hertz == 0 || hertz > sample_rate {
            return Err(TonewheelError::Config(format!(
                "tone frequency must be between 1 and {} Hz, got {}",
                sample_rate, hertz
            )));
        }

        Ok(Self {
            sample_rate,
            hertz,
            amplitude,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn hertz(&self) -> u32 {
        self.hertz
    }

    pub fn amplitude(&self) -> i16 {
        self.amplitude
    }

    /// Truncating division, so the synthesized pitch carries the same
    /// small error as the requested frequency divides unevenly.
    pub fn frames_per_cycle(&self) -> u32 {
        self.sample_rate / self.hertz
    }

    pub fn phase_step(&self) -> f32 {
        2.0 * PI / self.frames_per_cycle() as f32
    }
}

/// Stateful phase accumulator producing stereo 16-bit PCM frames.
///
/// The phase grows monotonically and is never wrapped; sine periodicity
/// takes care of it. `frames_written` only ever increases.
pub struct ToneGenerator {
    params: ToneParams,
    phase: f32,
    frames_written: u64,
}

impl ToneGenerator {
    pub fn new(params: ToneParams) -> Self {
        Self {
            params,
            phase: 0.0,
            frames_written: 0,
        }
    }

    fn next_value(&mut self) -> i16 {
        let value = (self.phase.sin() * f32::from(self.params.amplitude)).round() as i16;
        self.phase += self.params.phase_step();
        self.frames_written += 1;
        value
    }

    /// Writes `region.len() / BYTES_PER_FRAME` frames of little-endian
    /// PCM into `region`, the same value on both channels. Trailing
    /// bytes shorter than one frame are left untouched. An empty region
    /// advances nothing.
    pub fn fill(&mut self, region: &mut [u8]) {
        for frame in region.chunks_exact_mut(BYTES_PER_FRAME) {
            let value = self.next_value();
            LittleEndian::write_i16(&mut frame[0..2], value);
            LittleEndian::write_i16(&mut frame[2..4], value);
        }
    }

    /// Same synthesis into a freshly allocated buffer.
    pub fn generate(&mut self, frames: usize) -> Bytes {
        let mut buffer = BytesMut::with_capacity(frames * BYTES_PER_FRAME);

        for _ in 0..frames {
            let value = self.next_value();
            buffer.put_i16_le(value);
            buffer.put_i16_le(value);
        }

        buffer.freeze()
    }

    pub fn params(&self) -> &ToneParams {
        &self.params
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ToneParams {
        ToneParams::new(48_000, 256, 3000).unwrap()
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(ToneParams::new(0, 256, 3000).is_err());
    }

    #[test]
    fn rejects_frequency_above_sample_rate() {
        assert!(ToneParams::new(48_000, 0, 3000).is_err());
        assert!(ToneParams::new(48_000, 48_001, 3000).is_err());
    }

    #[test]
    fn frames_per_cycle_truncates() {
        assert_eq!(params().frames_per_cycle(), 187);
    }

    #[test]
    fn fill_advances_counter_and_phase() {
        let mut generator = ToneGenerator::new(params());
        let mut region = vec![0u8; 32 * BYTES_PER_FRAME];

        generator.fill(&mut region);

        assert_eq!(generator.frames_written(), 32);
        let expected = 32.0 * params().phase_step();
        assert!((generator.phase() - expected).abs() < 1e-4);
    }

    #[test]
    fn empty_fill_is_a_no_op() {
        let mut generator = ToneGenerator::new(params());
        generator.fill(&mut []);
        assert_eq!(generator.frames_written(), 0);
        assert_eq!(generator.phase(), 0.0);
    }

    #[test]
    fn both_channels_carry_the_same_sample() {
        let mut generator = ToneGenerator::new(params());
        let mut region = vec![0u8; 16 * BYTES_PER_FRAME];

        generator.fill(&mut region);

        for frame in region.chunks_exact(BYTES_PER_FRAME) {
            let left = i16::from_le_bytes([frame[0], frame[1]]);
            let right = i16::from_le_bytes([frame[2], frame[3]]);
            assert_eq!(left, right);
        }
    }

    #[test]
    fn fill_and_generate_produce_identical_output() {
        let mut a = ToneGenerator::new(params());
        let mut b = ToneGenerator::new(params());

        let mut region = vec![0u8; 200 * BYTES_PER_FRAME];
        a.fill(&mut region);
        let generated = b.generate(200);

        assert_eq!(&region[..], &generated[..]);
    }

    #[test]
    fn split_fill_matches_unsplit_fill() {
        let mut split = ToneGenerator::new(params());
        let mut whole = ToneGenerator::new(params());

        let mut first = vec![0u8; 60 * BYTES_PER_FRAME];
        let mut second = vec![0u8; 40 * BYTES_PER_FRAME];
        split.fill(&mut first);
        split.fill(&mut second);

        let mut unsplit = vec![0u8; 100 * BYTES_PER_FRAME];
        whole.fill(&mut unsplit);

        assert_eq!(&unsplit[..60 * BYTES_PER_FRAME], &first[..]);
        assert_eq!(&unsplit[60 * BYTES_PER_FRAME..], &second[..]);
        assert_eq!(split.phase(), whole.phase());
    }

    #[test]
    fn one_full_cycle_returns_to_the_first_sample() {
        let mut generator = ToneGenerator::new(params());
        let cycle = params().frames_per_cycle() as usize;

        let samples = generator.generate(cycle);
        assert!((generator.phase() - 2.0 * PI).abs() < 1e-3);

        let first = i16::from_le_bytes([samples[0], samples[1]]);
        let next_cycle = generator.generate(1);
        let after_cycle = i16::from_le_bytes([next_cycle[0], next_cycle[1]]);
        assert!((i32::from(first) - i32::from(after_cycle)).abs() <= 1);
    }
}
