use log::{error, warn};
use minifb::{Key, Window, WindowOptions};
use tonewheel::{
    AudioSession, BufferGeometry, CpalSink, FrameBuffer, Result, ToneParams, BYTES_PER_FRAME,
};

const WIDTH: usize = 1280;
const HEIGHT: usize = 720;

// 256 Hz tone into a one-second ring, kept 1/15 s ahead of playback.
fn start_audio() -> Result<AudioSession<CpalSink>> {
    let params = ToneParams::new(48_000, 256, 3000)?;
    let buffer_len = params.sample_rate() as usize * BYTES_PER_FRAME;
    let latency_frames = params.sample_rate() as usize / 15;
    let geometry = BufferGeometry::new(buffer_len, latency_frames)?;

    let sink = CpalSink::new(params.sample_rate(), buffer_len)?;
    let mut session = AudioSession::new(sink, params, geometry)?;
    session.start()?;
    println!(
        "Playing. Each iteration must finish within {:?} to stay ahead of the play cursor.",
        session.max_refill_interval()
    );
    Ok(session)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Losing audio costs the session its sound, not its window.
    let mut session = match start_audio() {
        Ok(session) => Some(session),
        Err(e) => {
            error!("Audio unavailable: {}", e);
            None
        }
    };

    let mut frame = FrameBuffer::new(WIDTH, HEIGHT)?;
    let mut window = Window::new("Gradient Tone", WIDTH, HEIGHT, WindowOptions::default())?;

    let mut x_offset: u8 = 0;
    let mut y_offset: u8 = 0;

    while window.is_open() && !window.is_key_down(Key::Escape) {
        frame.fill_gradient(255, x_offset, y_offset);
        x_offset = x_offset.wrapping_add(1);
        y_offset = y_offset.wrapping_add(1);
        window.update_with_buffer(frame.pixels(), frame.width(), frame.height())?;

        // A failed refill skips this iteration; the next poll computes a
        // larger catch-up window on its own.
        if let Some(session) = session.as_mut() {
            if let Err(e) = session.refill() {
                warn!("Refill skipped: {}", e);
            }
        }
    }

    Ok(())
}
