//! Session phases and input mapping

use serde::{Deserialize, Serialize};

use super::player::Direction;

/// Coarse session state
///
/// `Start -> Playing -> Ending -> GameOver`, and back to `Playing` only through
/// an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Before the first session
    #[default]
    Start,
    /// Active gameplay
    Playing,
    /// Hit registered; waiting for the impact effect to finish
    Ending,
    /// Run ended, score submitted
    GameOver,
}

impl GamePhase {
    /// The frame loop keeps running only in these phases
    pub fn is_running(self) -> bool {
        matches!(self, GamePhase::Playing | GamePhase::Ending)
    }

    /// A new session may be started from here
    pub fn can_start(self) -> bool {
        matches!(self, GamePhase::Start | GamePhase::GameOver)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Start => "start",
            GamePhase::Playing => "playing",
            GamePhase::Ending => "ending",
            GamePhase::GameOver => "gameover",
        }
    }
}

/// Key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

impl KeyEventKind {
    /// Parse a DOM event type (`keydown` / `keyup`)
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "keydown" => Some(KeyEventKind::Down),
            "keyup" => Some(KeyEventKind::Up),
            _ => None,
        }
    }
}

/// Map a DOM `KeyboardEvent.code` to a movement direction
pub fn direction_for_code(code: &str) -> Option<Direction> {
    match code {
        "ArrowLeft" | "KeyA" => Some(Direction::Left),
        "ArrowRight" | "KeyD" => Some(Direction::Right),
        _ => None,
    }
}
