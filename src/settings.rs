//! Game settings and tuning
//!
//! Every gameplay constant lives here so balance can be changed without a
//! rebuild. Persisted as JSON in the key-value store; missing fields fall back
//! to their defaults.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, StoreError};

/// Data-driven game tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Playfield ===
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// Frame rate the delta clamp is derived from
    pub target_fps: f32,
    /// Draw fps and timing text over the playfield
    pub debug_overlay: bool,

    // === Obstacles ===
    /// Milliseconds between spawns
    pub spawn_interval_ms: f64,
    /// Fall speed at multiplier 1.0 (pixels/second)
    pub base_speed: f32,
    /// Added to the speed multiplier on every increase
    pub speed_step: f32,
    /// Milliseconds between speed increases
    pub speed_increase_interval_ms: f64,
    pub obstacle_width: f32,
    pub obstacle_height: f32,

    // === Obstacle pool ===
    pub pool_initial_size: usize,
    pub pool_max_size: usize,
    pub pool_grow_size: usize,

    // === Player ===
    pub player_width: f32,
    pub player_height: f32,
    /// Horizontal speed (pixels/second)
    pub player_speed: f32,
    /// Gap kept between the player and the bottom edge
    pub player_bottom_margin: f32,

    // === Collision ===
    /// Vertical gap (pixels) below the player that counts as a close call
    pub close_call_threshold: f32,
    /// Use the uniform grid as a broad phase before exact overlap tests
    pub use_spatial_grid: bool,
    pub grid_cell_size: f32,

    // === Impact effect ===
    pub effect_particle_count: usize,
    /// Effect lifetime in seconds
    pub effect_max_age: f32,
    /// Downward acceleration applied to particle velocity
    pub effect_gravity: f32,
    /// Upper bound on the Ending phase (ms); `None` waits for effects forever
    pub ending_timeout_ms: Option<f64>,

    /// Base RNG seed; `None` reads the clock once when the game is built.
    /// Session `n` plays with `seed + n`.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            target_fps: 60.0,
            debug_overlay: false,

            spawn_interval_ms: 1000.0,
            base_speed: 200.0,
            speed_step: 0.1,
            speed_increase_interval_ms: 10_000.0,
            obstacle_width: 40.0,
            obstacle_height: 40.0,

            pool_initial_size: 50,
            pool_max_size: 1000,
            pool_grow_size: 20,

            player_width: 50.0,
            player_height: 50.0,
            player_speed: 400.0,
            player_bottom_margin: 10.0,

            close_call_threshold: 30.0,
            use_spatial_grid: true,
            grid_cell_size: 100.0,

            effect_particle_count: 20,
            effect_max_age: 1.0,
            effect_gravity: 5.0,
            ending_timeout_ms: None,

            seed: None,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "dodgeABlock_settings";

    /// Target duration of one frame in milliseconds
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.target_fps.max(1.0) as f64
    }

    /// Largest delta a single tick may simulate (seconds)
    pub fn max_delta_secs(&self) -> f32 {
        (2.0 * self.frame_interval_ms() / 1000.0) as f32
    }

    /// Load settings from storage, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(json) = store.get(Self::STORAGE_KEY) else {
            log::info!("Using default settings");
            return Self::default();
        };

        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from storage");
                Self::validated(settings)
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings: {}", e);
                Self::default()
            }
        }
    }

    /// Replace non-positive or non-finite sizes, speeds and intervals with
    /// their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        macro_rules! positive {
            ($($field:ident),+ $(,)?) => {$(
                if !(self.$field.is_finite() && self.$field > 0.0) {
                    log::warn!(
                        "Invalid {} ({}), using {}",
                        stringify!($field),
                        self.$field,
                        defaults.$field
                    );
                    self.$field = defaults.$field;
                }
            )+};
        }
        positive!(
            canvas_width,
            canvas_height,
            target_fps,
            spawn_interval_ms,
            base_speed,
            speed_increase_interval_ms,
            obstacle_width,
            obstacle_height,
            player_width,
            player_height,
            player_speed,
            grid_cell_size,
            effect_max_age,
        );
        self
    }

    /// Save settings to storage
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_frame_budget() {
        let settings = Settings::default();
        assert!((settings.frame_interval_ms() - 16.666).abs() < 0.01);
        assert!((settings.max_delta_secs() - 0.0333).abs() < 0.001);
    }

    #[test]
    fn test_round_trip_through_store() {
        let mut store = MemoryStore::default();
        let settings = Settings {
            spawn_interval_ms: 750.0,
            use_spatial_grid: false,
            ..Default::default()
        };
        settings.save(&mut store).unwrap();
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let mut store = MemoryStore::default();
        store
            .set(Settings::STORAGE_KEY, r#"{"base_speed": 320.0}"#)
            .unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.base_speed, 320.0);
        assert_eq!(settings.pool_max_size, 1000);
    }

    #[test]
    fn test_zero_cell_size_falls_back() {
        let mut store = MemoryStore::default();
        store
            .set(Settings::STORAGE_KEY, r#"{"grid_cell_size": 0.0}"#)
            .unwrap();
        assert_eq!(Settings::load(&store).grid_cell_size, 100.0);
    }

    #[test]
    fn test_non_positive_dimensions_fall_back() {
        let settings = Settings {
            canvas_width: -5.0,
            target_fps: 0.0,
            spawn_interval_ms: f64::NAN,
            obstacle_height: f32::INFINITY,
            base_speed: 320.0,
            ..Default::default()
        }
        .validated();
        let defaults = Settings::default();
        assert_eq!(settings.canvas_width, defaults.canvas_width);
        assert_eq!(settings.target_fps, defaults.target_fps);
        assert_eq!(settings.spawn_interval_ms, defaults.spawn_interval_ms);
        assert_eq!(settings.obstacle_height, defaults.obstacle_height);
        assert_eq!(settings.base_speed, 320.0);
    }

    #[test]
    fn test_malformed_falls_back() {
        let mut store = MemoryStore::default();
        store.set(Settings::STORAGE_KEY, "{not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }
}
