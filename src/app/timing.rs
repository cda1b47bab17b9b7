use std::time::{Duration, Instant};

pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_fps_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    compose_ms: f32,
    status: String,
}

impl FrameTiming {
    pub fn new() -> Self {
        Self {
            last_frame_time: None,
            last_fps_time: Instant::now(),
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            compose_ms: 0.0,
            status: String::new(),
        }
    }

    pub fn set_compose_ms(&mut self, compose_ms: f32) {
        self.compose_ms = compose_ms;
    }

    /// Status-bar text, refreshed twice a second.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn update(&mut self, now: Instant) {
        let dt_duration = if let Some(last) = self.last_frame_time {
            now.saturating_duration_since(last)
        } else {
            Duration::from_millis(16)
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().max(0.0);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_fps_time);
        if elapsed.as_secs_f32() >= 0.5 {
            let fps = self.frame_count as f32 / elapsed.as_secs_f32();
            let ms = (self.frame_dt * 1000.0).max(0.0);
            self.status = format!(
                "{:.1} fps (cadence {:.2} ms, compose {:.2} ms)",
                fps, ms, self.compose_ms
            );
            self.frame_count = 0;
            self.last_fps_time = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_refreshes_after_half_a_second() {
        let mut timing = FrameTiming::new();
        let start = Instant::now();
        timing.update(start);
        assert!(timing.status().is_empty() || timing.status().contains("fps"));
        for frame in 1..=40 {
            timing.update(start + Duration::from_millis(16 * frame));
        }
        assert!(timing.status().contains("fps"));
        assert!((timing.frame_dt - 0.016).abs() < 1e-4);
    }
}
