//! Canvas 2D render sink (browser)

use glam::Vec2;
use web_sys::CanvasRenderingContext2d;

use super::{Color, RenderSink};
use crate::sim::Rect;

/// Draws onto a `CanvasRenderingContext2d`
pub struct CanvasSink {
    ctx: CanvasRenderingContext2d,
}

impl CanvasSink {
    pub fn new(ctx: CanvasRenderingContext2d) -> Self {
        ctx.set_font("12px monospace");
        ctx.set_text_align("left");
        Self { ctx }
    }
}

fn css(color: Color) -> String {
    format!(
        "rgba({}, {}, {}, {:.3})",
        (color[0] * 255.0).round() as u8,
        (color[1] * 255.0).round() as u8,
        (color[2] * 255.0).round() as u8,
        color[3]
    )
}

impl RenderSink for CanvasSink {
    fn clear(&mut self, width: f32, height: f32) {
        self.ctx.clear_rect(0.0, 0.0, width as f64, height as f64);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, line_width: f32) {
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.set_line_width(line_width as f64);
        self.ctx.stroke_rect(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx.fill_rect(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        );
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.begin_path();
        // Only fails for a negative radius
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            std::f64::consts::TAU,
        );
        self.ctx.set_fill_style_str(&css(color));
        self.ctx.fill();
    }

    fn fill_text(&mut self, text: &str, pos: Vec2, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        let _ = self.ctx.fill_text(text, pos.x as f64, pos.y as f64);
    }
}
