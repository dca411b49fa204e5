use std::time::{Duration, Instant};

/// Measures how much time passed between consecutive frames of the main loop.
#[derive(Debug)]
pub struct FrameClock {
    last_tick: Instant,
    frame_count: u64,
}

impl FrameClock {
    /// Create a new frame clock that starts counting from now.
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            frame_count: 0,
        }
    }

    /// Mark the start of a new frame and return the time elapsed since the
    /// previous call (or since the clock was created).
    ///
    /// `Instant` is monotonic so the delta is never negative.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.saturating_duration_since(self.last_tick);

        self.last_tick = now;
        self.frame_count += 1;

        delta
    }

    /// Get the number of frames ticked so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
