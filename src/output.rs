use crate::error::{Result, TonewheelError};
use crate::sink::{split_regions, AudioSink, Cursors};
use crate::tone::BYTES_PER_FRAME;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Ring state shared with the device callback. The callback is the
/// hardware side of the sink: it drains frames at the play cursor the
/// way the device's own DMA would, independent of the polling loop.
struct SharedRing {
    data: Mutex<Box<[u8]>>,
    play_cursor: AtomicUsize,
    playing: AtomicBool,
}

/// Hardware audio sink backed by a cpal output stream.
///
/// The stream consumes the ring circularly, so playback is always
/// looping; the buffer holds little-endian stereo 16-bit PCM converted
/// to the device's f32 format on the way out.
pub struct CpalSink {
    shared: Arc<SharedRing>,
    buffer_len: usize,
    stream: cpal::Stream,
}

impl CpalSink {
    pub fn new(sample_rate: u32, buffer_len: usize) -> Result<Self> {
        if buffer_len == 0 || buffer_len % BYTES_PER_FRAME != 0 {
            return Err(TonewheelError::Config(format!(
                "sink buffer must be a non-zero multiple of {} bytes, got {}",
                BYTES_PER_FRAME, buffer_len
            )));
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TonewheelError::SinkInit("no audio output device".to_string()))?;
        ensure_stereo_f32_support(&device, sample_rate)?;

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(SharedRing {
            data: Mutex::new(vec![0u8; buffer_len].into_boxed_slice()),
            play_cursor: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
        });

        let callback_ring = Arc::clone(&shared);
        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    drain_ring(&callback_ring, out);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| TonewheelError::SinkInit(e.to_string()))?;

        info!(
            "Audio sink initialized: {} Hz, {} byte ring",
            sample_rate, buffer_len
        );

        Ok(Self {
            shared,
            buffer_len,
            stream,
        })
    }
}

/// Converts one callback quantum of ring bytes to device samples and
/// advances the shared play cursor. Emits silence while stopped or while
/// a refill is holding the ring lock.
fn drain_ring(ring: &SharedRing, out: &mut [f32]) {
    if !ring.playing.load(Ordering::Acquire) {
        out.fill(0.0);
        return;
    }

    let Ok(data) = ring.data.try_lock() else {
        out.fill(0.0);
        return;
    };

    let mut cursor = ring.play_cursor.load(Ordering::Relaxed);
    for sample in out.iter_mut() {
        let value = i16::from_le_bytes([data[cursor], data[cursor + 1]]);
        *sample = f32::from(value) / 32768.0;
        cursor = (cursor + 2) % data.len();
    }
    ring.play_cursor.store(cursor, Ordering::Release);
}

fn ensure_stereo_f32_support(device: &cpal::Device, sample_rate: u32) -> Result<()> {
    let mut configs = device
        .supported_output_configs()
        .map_err(|e| TonewheelError::SinkInit(e.to_string()))?;

    let supported = configs.any(|c| {
        c.channels() == 2
            && c.sample_format() == cpal::SampleFormat::F32
            && c.min_sample_rate().0 <= sample_rate
            && c.max_sample_rate().0 >= sample_rate
    });

    if supported {
        Ok(())
    } else {
        Err(TonewheelError::SinkInit(format!(
            "output device does not support {} Hz stereo f32",
            sample_rate
        )))
    }
}

impl AudioSink for CpalSink {
    fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    fn position(&mut self) -> Result<Cursors> {
        let play = self.shared.play_cursor.load(Ordering::Acquire);
        // No guard band is emulated; software may write right up to the
        // play cursor.
        Ok(Cursors { play, write: play })
    }

    fn locked_write(
        &mut self,
        offset: usize,
        len: usize,
        fill: &mut dyn FnMut(&mut [u8], &mut [u8]),
    ) -> Result<()> {
        let mut data = self
            .shared
            .data
            .lock()
            .map_err(|_| TonewheelError::Sink("audio ring poisoned".to_string()))?;

        let (region1, region2) = split_regions(&mut data, offset, len)?;
        fill(region1, region2);
        Ok(())
    }

    fn play(&mut self, looped: bool) -> Result<()> {
        if !looped {
            return Err(TonewheelError::Config(
                "cpal sink only supports looping playback".to_string(),
            ));
        }

        self.stream
            .play()
            .map_err(|e| TonewheelError::Sink(e.to_string()))?;
        self.shared.playing.store(true, Ordering::Release);
        Ok(())
    }
}
