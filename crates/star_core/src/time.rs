use std::time::Instant;

const FPS_SAMPLE_COUNT: usize = 60;

pub struct TimeState {
    pub fixed_dt: f64,
    pub max_accumulator: f64,
    accumulator: f64,
    pub total_time: f64,
    pub fixed_step_count: u64,
    pub frame_count: u64,
    pub steps_this_frame: u32,
    pub real_dt: f64,
    last_instant: Instant,
    pub interpolation_alpha: f64,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl TimeState {
    pub fn new() -> Self {
        Self::with_rate(60)
    }

    /// Clock stepping the simulation `steps_per_second` times per second.
    pub fn with_rate(steps_per_second: u32) -> Self {
        let fixed_dt = 1.0 / f64::from(steps_per_second.max(1));
        Self {
            fixed_dt,
            max_accumulator: 0.25,
            accumulator: 0.0,
            total_time: 0.0,
            fixed_step_count: 0,
            frame_count: 0,
            steps_this_frame: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            interpolation_alpha: 0.0,
            fps_samples: [fixed_dt; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            smoothed_fps: 1.0 / fixed_dt,
            smoothed_frame_time_ms: fixed_dt * 1000.0,
        }
    }

    /// Fixed step length in whole microseconds, for integer animation timing.
    pub fn fixed_dt_us(&self) -> u64 {
        (self.fixed_dt * 1_000_000.0).round() as u64
    }

    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Feed `elapsed` wall-clock seconds into the accumulator.
    pub fn advance(&mut self, elapsed: f64) {
        self.real_dt = elapsed;

        // Spiral-of-death cap
        if self.real_dt > self.max_accumulator {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                self.real_dt * 1000.0,
                self.max_accumulator * 1000.0
            );
            self.real_dt = self.max_accumulator;
        }

        self.accumulator += self.real_dt;
        self.steps_this_frame = 0;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        let avg_dt: f64 = self.fps_samples.iter().sum::<f64>() / FPS_SAMPLE_COUNT as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };
    }

    pub fn should_step(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.total_time += self.fixed_dt;
            self.fixed_step_count += 1;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    pub fn end_frame(&mut self) {
        self.interpolation_alpha = self.accumulator / self.fixed_dt;
    }
}

impl Default for TimeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_steps(time: &mut TimeState) -> u32 {
        let mut steps = 0;
        while time.should_step() {
            steps += 1;
        }
        steps
    }

    #[test]
    fn one_frame_of_fixed_dt_runs_one_step() {
        let mut time = TimeState::new();
        time.advance(time.fixed_dt);
        assert_eq!(drain_steps(&mut time), 1);
        assert_eq!(time.steps_this_frame, 1);
    }

    #[test]
    fn short_frame_carries_over_to_next() {
        let mut time = TimeState::new();
        time.advance(time.fixed_dt * 0.6);
        assert_eq!(drain_steps(&mut time), 0);
        time.advance(time.fixed_dt * 0.6);
        assert_eq!(drain_steps(&mut time), 1);
        assert_eq!(time.fixed_step_count, 1);
    }

    #[test]
    fn long_frame_is_capped() {
        let mut time = TimeState::new();
        time.advance(5.0);
        assert!((time.real_dt - time.max_accumulator).abs() < f64::EPSILON);
        // 0.25s at 60Hz is 15 steps, give or take float rounding.
        let steps = drain_steps(&mut time);
        assert!((14..=15).contains(&steps), "got {steps} steps");
    }

    #[test]
    fn custom_rate_sets_fixed_dt() {
        let time = TimeState::with_rate(120);
        assert!((time.fixed_dt - 1.0 / 120.0).abs() < 1e-12);
        assert_eq!(time.fixed_dt_us(), 8_333);
        assert_eq!(TimeState::new().fixed_dt_us(), 16_667);
    }

    #[test]
    fn interpolation_alpha_reflects_leftover() {
        let mut time = TimeState::new();
        time.advance(time.fixed_dt * 1.5);
        drain_steps(&mut time);
        time.end_frame();
        assert!((time.interpolation_alpha - 0.5).abs() < 1e-9);
    }
}
