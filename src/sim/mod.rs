//! Simulation module
//!
//! All gameplay logic lives here. Nothing in this module touches the browser:
//! - Time arrives as frame timestamps from the host
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - Drawing goes through the `RenderSink` trait

pub mod collision;
pub mod game;
pub mod grid;
pub mod obstacle;
pub mod player;
pub mod state;
pub mod stats;

pub use collision::{
    CollisionEffect, CollisionSystem, PARTICLE_COLORS, Particle, Rect, check_collision,
    overlap_center,
};
pub use game::{Game, TickOutcome};
pub use grid::{GridStats, SpatialGrid};
pub use obstacle::{Obstacle, ObstacleManager};
pub use player::{Direction, Player};
pub use state::{GamePhase, KeyEventKind, direction_for_code};
pub use stats::{FrameStats, GameStats, ScoreTracker, TimingHistory};
