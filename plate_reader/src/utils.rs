use std::time::Duration;
use std::time::Instant;

/// Caps the loop rate by sleeping away what is left of each frame period.
pub struct FpsLimiter {
    fps_control: Instant,
    fps_wait: Duration,
}

impl FpsLimiter {
    pub fn new(fps: u32) -> Self {
        Self {
            fps_control: Instant::now(),
            fps_wait: Duration::from_secs(1) / fps.max(1),
        }
    }

    pub fn period(&self) -> Duration {
        self.fps_wait
    }

    pub fn wait(&mut self) {
        let elapsed = self.fps_control.elapsed();

        if self.fps_wait > elapsed {
            spin_sleep::sleep(self.fps_wait - elapsed);
        }

        self.fps_control = Instant::now();
    }
}
