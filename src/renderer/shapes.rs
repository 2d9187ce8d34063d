//! Drawing routines for each kind of entity

use glam::Vec2;

use super::{Color, RenderSink};
use crate::sim::{CollisionEffect, Obstacle, Player, Rect};

pub const BORDER_COLOR: Color = [0.2, 0.2, 0.2, 1.0];
pub const PLAYER_COLOR: Color = [0.298, 0.686, 0.314, 1.0]; // #4CAF50
pub const OBSTACLE_COLOR: Color = [0.2, 0.2, 0.2, 1.0]; // #333
pub const DEBUG_TEXT_COLOR: Color = [0.2, 0.2, 0.2, 1.0];

/// Convert 0xRRGGBB plus alpha to a color
pub fn hex_color(rgb: u32, alpha: f32) -> Color {
    [
        ((rgb >> 16) & 0xFF) as f32 / 255.0,
        ((rgb >> 8) & 0xFF) as f32 / 255.0,
        (rgb & 0xFF) as f32 / 255.0,
        alpha,
    ]
}

pub fn border(sink: &mut dyn RenderSink, width: f32, height: f32) {
    sink.stroke_rect(Rect::new(0.0, 0.0, width, height), BORDER_COLOR, 2.0);
}

pub fn player(sink: &mut dyn RenderSink, player: &Player) {
    sink.fill_rect(player.rect(), PLAYER_COLOR);
}

pub fn obstacle(sink: &mut dyn RenderSink, obstacle: &Obstacle) {
    sink.fill_rect(obstacle.rect(), OBSTACLE_COLOR);
}

/// Particles of one burst, faded by the effect's age
pub fn effect(sink: &mut dyn RenderSink, effect: &CollisionEffect) {
    for particle in &effect.particles {
        sink.fill_circle(
            particle.pos,
            particle.size,
            hex_color(particle.color, particle.alpha),
        );
    }
}

/// Debug overlay lines in the top-left corner
pub fn debug_lines(sink: &mut dyn RenderSink, lines: &[String]) {
    for (i, line) in lines.iter().enumerate() {
        sink.fill_text(line, Vec2::new(10.0, 20.0 + 15.0 * i as f32), DEBUG_TEXT_COLOR);
    }
}
