use std::time::{Duration, Instant};

use anyhow::Result;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bindings::UniformBindings;

/// Per-frame random jitter fed to the noise-transport pass.
pub trait OffsetSource: Send {
    /// Restarts the sequence from the beginning.
    fn reset(&mut self);
    /// Offset for the next frame, in normalised texture units.
    fn next_offset(&mut self) -> Vec2;
}

/// Uniform offsets in `[0, 1)^2` from a seeded generator.
#[derive(Debug, Clone)]
pub struct SeededOffsetSource {
    seed: u64,
    rng: StdRng,
}

impl SeededOffsetSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds from the operating system; sequences differ between runs.
    pub fn from_entropy() -> Self {
        Self::new(rand::thread_rng().gen())
    }
}

impl OffsetSource for SeededOffsetSource {
    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }

    fn next_offset(&mut self) -> Vec2 {
        Vec2::new(self.rng.gen(), self.rng.gen())
    }
}

/// Always reports the same offset; zero freezes the noise in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOffsetSource {
    offset: Vec2,
}

impl FixedOffsetSource {
    pub fn new(offset: Vec2) -> Self {
        Self { offset }
    }
}

impl OffsetSource for FixedOffsetSource {
    fn reset(&mut self) {}

    fn next_offset(&mut self) -> Vec2 {
        self.offset
    }
}

pub type BoxedOffsetSource = Box<dyn OffsetSource>;

/// Seeded when a seed is given, entropy-seeded otherwise.
pub fn offset_source_for(seed: Option<u64>) -> BoxedOffsetSource {
    match seed {
        Some(seed) => Box::new(SeededOffsetSource::new(seed)),
        None => Box::new(SeededOffsetSource::from_entropy()),
    }
}

/// What one rendered frame reports back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub random_offset: Vec2,
    pub elapsed: Duration,
}

/// Anything that can run the five passes once.
pub trait FrameRenderer {
    /// Runs one frame with `bindings` and advances the blended history.
    fn render_frame(&mut self, bindings: &UniformBindings) -> Result<()>;

    /// Frames rendered so far.
    fn frame_index(&self) -> u64;
}

/// Renders `frames` frames, drawing a fresh random offset before each one.
pub fn drive(
    renderer: &mut impl FrameRenderer,
    offsets: &mut dyn OffsetSource,
    bindings: &mut UniformBindings,
    frames: u32,
) -> Result<Vec<FrameStats>> {
    let mut stats = Vec::with_capacity(frames as usize);
    for _ in 0..frames {
        let random_offset = offsets.next_offset();
        bindings.set_random_offset(random_offset);
        let started = Instant::now();
        renderer.render_frame(bindings)?;
        let frame = FrameStats {
            frame_index: renderer.frame_index(),
            random_offset,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            frame = frame.frame_index,
            offset_x = random_offset.x,
            offset_y = random_offset.y,
            elapsed_ms = frame.elapsed.as_secs_f64() * 1000.0,
            "rendered frame"
        );
        stats.push(frame);
    }
    Ok(stats)
}
