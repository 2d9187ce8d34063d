//! Falling obstacles
//!
//! The manager owns every obstacle through a pool, spawns one per spawn
//! interval, raises fall speed on a fixed schedule, and keeps a uniform grid of
//! live obstacles current for broad-phase queries. Timers are plain timestamp
//! comparisons against the frame clock.

use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::Rect;
use super::grid::{GridStats, SpatialGrid};
use crate::pool::{ObjectPool, PoolError, PoolHandle, PoolStats, Poolable};
use crate::settings::Settings;

/// A falling block
#[derive(Debug, Clone, Default)]
pub struct Obstacle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Pixels per second
    pub speed: f32,
    active: bool,
}

impl Obstacle {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Place a freshly acquired obstacle
    pub fn init(&mut self, x: f32, y: f32, speed: f32) {
        self.x = x;
        self.y = y;
        self.speed = speed;
        self.active = true;
    }

    pub fn advance(&mut self, dt: f32) {
        self.y += self.speed * dt;
    }

    /// Fully below the playfield
    pub fn is_off_screen(&self, canvas_height: f32) -> bool {
        self.y > canvas_height
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl Poolable for Obstacle {
    fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.speed = 0.0;
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Default obstacle factory; the pool builds every obstacle through it
fn standard_obstacle() -> Obstacle {
    Obstacle::new(40.0, 40.0)
}

/// Spawns, advances and retires obstacles
#[derive(Debug, Clone)]
pub struct ObstacleManager {
    pool: ObjectPool<Obstacle>,
    /// Live obstacles in spawn order
    live: Vec<PoolHandle>,
    grid: SpatialGrid<PoolHandle>,
    rng: Pcg32,
    width: f32,
    height: f32,
    spawn_interval_ms: f64,
    last_spawn_ms: f64,
    base_speed: f32,
    speed_multiplier: f32,
    speed_step: f32,
    speed_increase_interval_ms: f64,
    last_speed_increase_ms: f64,
    dodged: u32,
}

impl ObstacleManager {
    pub fn new(settings: &Settings, seed: u64) -> Result<Self, PoolError> {
        let pool = ObjectPool::new(
            standard_obstacle,
            settings.pool_initial_size,
            settings.pool_max_size,
            settings.pool_grow_size,
        )?;

        Ok(Self {
            pool,
            live: Vec::new(),
            grid: SpatialGrid::new(
                settings.canvas_width,
                settings.canvas_height,
                settings.grid_cell_size,
            ),
            rng: Pcg32::seed_from_u64(seed),
            width: settings.obstacle_width,
            height: settings.obstacle_height,
            spawn_interval_ms: settings.spawn_interval_ms,
            last_spawn_ms: 0.0,
            base_speed: settings.base_speed,
            speed_multiplier: 1.0,
            speed_step: settings.speed_step,
            speed_increase_interval_ms: settings.speed_increase_interval_ms,
            last_speed_increase_ms: 0.0,
            dodged: 0,
        })
    }

    /// Reset for a new session starting at `now_ms`
    pub fn start_game(&mut self, now_ms: f64, seed: u64) {
        self.pool.release_all();
        self.live.clear();
        self.grid.clear();
        self.rng = Pcg32::seed_from_u64(seed);
        self.last_spawn_ms = now_ms;
        self.last_speed_increase_ms = now_ms;
        self.speed_multiplier = 1.0;
        self.dodged = 0;
    }

    /// Advance one frame
    pub fn update(&mut self, dt: f32, timestamp_ms: f64, canvas_width: f32, canvas_height: f32) {
        self.advance(dt, canvas_height);

        if timestamp_ms - self.last_spawn_ms >= self.spawn_interval_ms {
            self.spawn(canvas_width);
            self.last_spawn_ms = timestamp_ms;
        }

        if timestamp_ms - self.last_speed_increase_ms >= self.speed_increase_interval_ms {
            self.speed_multiplier += self.speed_step;
            self.last_speed_increase_ms = timestamp_ms;
            log::debug!("Speed multiplier now {:.1}", self.speed_multiplier);
        }
    }

    fn advance(&mut self, dt: f32, canvas_height: f32) {
        let Self {
            pool,
            live,
            grid,
            dodged,
            ..
        } = self;

        live.retain(|&handle| {
            let Some(obstacle) = pool.get_mut(handle) else {
                return false;
            };
            let (old_x, old_y) = (obstacle.x, obstacle.y);
            obstacle.advance(dt);
            let rect = obstacle.rect();

            if obstacle.is_off_screen(canvas_height) {
                grid.remove(handle, &rect.moved_to(old_x, old_y));
                pool.release(handle);
                *dodged += 1;
                false
            } else {
                grid.update(handle, &rect, old_x, old_y);
                true
            }
        });
    }

    fn spawn(&mut self, canvas_width: f32) {
        let max_x = (canvas_width - self.width).max(0.0);
        let x = self.rng.random::<f32>() * max_x;
        if self.spawn_at(x, -self.height).is_none() {
            log::debug!("Obstacle pool exhausted, skipping spawn");
        }
    }

    /// Place an obstacle at a fixed position, moving at the current speed
    ///
    /// Returns `None` when the pool has no capacity left.
    pub fn spawn_at(&mut self, x: f32, y: f32) -> Option<PoolHandle> {
        let handle = self.pool.acquire()?;
        let speed = self.base_speed * self.speed_multiplier;
        let (width, height) = (self.width, self.height);

        let obstacle = self.pool.get_mut(handle)?;
        obstacle.width = width;
        obstacle.height = height;
        obstacle.init(x, y, speed);
        let rect = obstacle.rect();

        self.grid.insert(handle, &rect);
        self.live.push(handle);
        Some(handle)
    }

    /// Obstacles that fell past the bottom since the last call
    ///
    /// Draining: each dodge is reported exactly once, to whichever caller
    /// polls first.
    pub fn take_dodged(&mut self) -> u32 {
        std::mem::take(&mut self.dodged)
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Live obstacles in spawn order
    pub fn obstacles(&self) -> impl Iterator<Item = (PoolHandle, &Obstacle)> {
        self.live
            .iter()
            .filter_map(|&handle| self.pool.get(handle).map(|o| (handle, o)))
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&Obstacle> {
        self.pool.get(handle)
    }

    /// Broad-phase candidates near `rect`
    pub fn nearby(&self, rect: &Rect) -> Vec<PoolHandle> {
        self.grid.query(rect)
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn grid_stats(&self) -> GridStats {
        self.grid.stats()
    }
}
