//! The player's avatar
//!
//! Slides horizontally along the bottom of the playfield while a direction key
//! is held; both directions may be held at once and cancel out.

use super::collision::Rect;
use crate::settings::Settings;

/// Horizontal movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Pixels per second
    pub speed: f32,
    moving_left: bool,
    moving_right: bool,
    /// Distance travelled since the last `take_distance`
    travelled: f32,
}

impl Player {
    pub fn new(settings: &Settings) -> Self {
        let mut player = Self {
            x: 0.0,
            y: 0.0,
            width: settings.player_width,
            height: settings.player_height,
            speed: settings.player_speed,
            moving_left: false,
            moving_right: false,
            travelled: 0.0,
        };
        player.respawn(settings);
        player
    }

    /// Back to bottom-centre, standing still
    pub fn respawn(&mut self, settings: &Settings) {
        self.x = (settings.canvas_width - self.width) / 2.0;
        self.y = settings.canvas_height - self.height - settings.player_bottom_margin;
        self.moving_left = false;
        self.moving_right = false;
        self.travelled = 0.0;
    }

    pub fn start_moving(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.moving_left = true,
            Direction::Right => self.moving_right = true,
        }
    }

    pub fn stop_moving(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.moving_left = false,
            Direction::Right => self.moving_right = false,
        }
    }

    pub fn update(&mut self, dt: f32, canvas_width: f32) {
        let step = self.speed * dt;
        let before = self.x;
        if self.moving_left {
            self.x = (self.x - step).max(0.0);
        }
        if self.moving_right {
            self.x = (self.x + step).min(canvas_width - self.width);
        }
        self.travelled += (self.x - before).abs();
    }

    /// Distance moved since the previous call
    pub fn take_distance(&mut self) -> f32 {
        std::mem::take(&mut self.travelled)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_bottom_centre() {
        let player = Player::new(&Settings::default());
        assert_eq!(player.rect(), Rect::new(375.0, 540.0, 50.0, 50.0));
    }

    #[test]
    fn test_moves_and_clamps() {
        let settings = Settings::default();
        let mut player = Player::new(&settings);

        player.start_moving(Direction::Left);
        player.update(0.5, settings.canvas_width);
        assert_eq!(player.x, 175.0);
        player.update(1.0, settings.canvas_width);
        assert_eq!(player.x, 0.0);
        assert_eq!(player.take_distance(), 375.0);

        player.stop_moving(Direction::Left);
        player.start_moving(Direction::Right);
        player.update(5.0, settings.canvas_width);
        assert_eq!(player.x, 750.0);
        assert_eq!(player.take_distance(), 750.0);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let settings = Settings::default();
        let mut player = Player::new(&settings);
        player.start_moving(Direction::Left);
        player.start_moving(Direction::Right);
        player.update(0.1, settings.canvas_width);
        assert_eq!(player.x, 375.0);
    }
}
