//! Session score, gameplay statistics and frame timing

use std::collections::VecDeque;

/// Survival-time score in seconds
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreTracker {
    score: f64,
    started_at_ms: f64,
}

impl ScoreTracker {
    pub fn start(&mut self, now_ms: f64) {
        self.score = 0.0;
        self.started_at_ms = now_ms;
    }

    pub fn update(&mut self, dt: f32) {
        self.score += dt as f64;
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn started_at_ms(&self) -> f64 {
        self.started_at_ms
    }
}

/// Per-run gameplay statistics shown on the game over screen
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameStats {
    pub blocks_dodged: u32,
    /// Highest obstacle speed multiplier reached
    pub max_speed: f32,
    /// Horizontal pixels travelled
    pub distance_moved: f32,
    pub close_calls: u32,
}

impl GameStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add_dodged(&mut self, count: u32) {
        self.blocks_dodged += count;
    }

    pub fn update_max_speed(&mut self, speed: f32) {
        self.max_speed = self.max_speed.max(speed);
    }

    pub fn add_distance(&mut self, distance: f32) {
        self.distance_moved += distance.abs();
    }

    pub fn increment_close_calls(&mut self) {
        self.close_calls += 1;
    }
}

/// Number of frames kept for timing min/avg/max
pub const TIMING_HISTORY: usize = 60;

/// Rolling min/avg/max over recent samples
#[derive(Debug, Clone, Default)]
pub struct TimingHistory {
    samples: VecDeque<f64>,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl TimingHistory {
    pub fn record(&mut self, duration: f64) {
        self.samples.push_back(duration);
        if self.samples.len() > TIMING_HISTORY {
            self.samples.pop_front();
        }
        self.average = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        self.min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        self.max = self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Frame rate and per-phase timings
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub fps: u32,
    /// Live obstacle count at the end of the last frame
    pub object_count: usize,
    /// Milliseconds between the last two frames
    pub frame_time: f64,
    pub frame_history: TimingHistory,
    /// Milliseconds spent in the last update
    pub update_time: f64,
    pub update_history: TimingHistory,
    frame_count: u32,
    window_start_ms: f64,
    last_frame_ms: f64,
}

impl FrameStats {
    pub fn reset(&mut self, now_ms: f64) {
        *self = Self {
            window_start_ms: now_ms,
            last_frame_ms: now_ms,
            ..Default::default()
        };
    }

    /// Count a frame; fps is recomputed once per elapsed second
    pub fn record_frame(&mut self, timestamp_ms: f64) {
        self.frame_time = timestamp_ms - self.last_frame_ms;
        self.frame_history.record(self.frame_time);
        self.last_frame_ms = timestamp_ms;

        self.frame_count += 1;
        let elapsed = timestamp_ms - self.window_start_ms;
        if elapsed >= 1000.0 {
            self.fps = (self.frame_count as f64 * 1000.0 / elapsed).round() as u32;
            self.frame_count = 0;
            self.window_start_ms = timestamp_ms;
        }
    }

    pub fn record_update(&mut self, duration_ms: f64) {
        self.update_time = duration_ms;
        self.update_history.record(duration_ms);
    }

    /// Lines for a debug overlay
    pub fn debug_lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {}", self.fps),
            format!("Frame Time: {:.2}ms", self.frame_time),
            format!(
                "Frame avg/min/max: {:.2}/{:.2}/{:.2}ms",
                self.frame_history.average, self.frame_history.min, self.frame_history.max
            ),
            format!("Update Time: {:.2}ms", self.update_time),
            format!(
                "Update avg/min/max: {:.2}/{:.2}/{:.2}ms",
                self.update_history.average, self.update_history.min, self.update_history.max
            ),
            format!("Objects: {}", self.object_count),
        ]
    }
}
