//! Dodge Block - a falling-obstacle survival game
//!
//! Core modules:
//! - `sim`: Simulation (obstacles, collisions, game state machine)
//! - `pool`: Reusable object pool
//! - `renderer`: 2D draw sinks (canvas and recorded)
//! - `platform`: Browser/native platform abstraction
//! - `persistence`: Key-value storage backends
//! - `settings`: Data-driven game tuning

pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod pool;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod ui;

pub use highscores::HighScores;
pub use pool::{ObjectPool, PoolError, PoolHandle, Poolable};
pub use settings::Settings;
pub use sim::{Game, GamePhase, TickOutcome};
