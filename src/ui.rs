//! HUD text and the high score pulse
//!
//! Pure helpers; the browser entry point owns the DOM and frame callbacks.

use crate::highscores::{HighScores, MAX_HIGH_SCORES, format_score};
use crate::sim::GameStats;

/// Colors the high score label cycles through
pub const PULSE_COLORS: [&str; 3] = ["#4CAF50", "#FFD700", "#FF4081"];

/// Frames one pulse lasts
pub const PULSE_FRAMES: u32 = 6;

/// Game over banner for a leaderboard rank
pub fn rank_text(rank: usize) -> String {
    match rank {
        1 => "🏆 New High Score!".to_string(),
        r if r <= MAX_HIGH_SCORES => format!("🎉 Top {} Score!", r),
        _ => "Keep practicing!".to_string(),
    }
}

/// One `#n: score` line per leaderboard entry
pub fn high_score_lines(scores: &HighScores) -> Vec<String> {
    scores
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("#{}: {:.1}s", i + 1, entry.score))
        .collect()
}

/// Game over statistics as `(element id, text)` pairs
pub fn stat_fields(stats: &GameStats) -> [(&'static str, String); 4] {
    [
        ("blocks-dodged", stats.blocks_dodged.to_string()),
        ("max-speed", format!("{:.1}x", stats.max_speed)),
        ("distance-moved", format!("{}px", stats.distance_moved.round() as u32)),
        ("close-calls", stats.close_calls.to_string()),
    ]
}

/// Score and high score labels
pub fn score_labels(score: f64, high_score: f64) -> (String, String) {
    (format_score(score), format_score(high_score))
}

/// Color sequence of a single pulse
#[derive(Debug, Clone, Copy, Default)]
pub struct HighScorePulse {
    frame: u32,
}

impl HighScorePulse {
    /// Color for the next frame; `None` once the pulse is over
    pub fn next_color(&mut self) -> Option<&'static str> {
        if self.frame >= PULSE_FRAMES {
            return None;
        }
        let color = PULSE_COLORS[self.frame as usize % PULSE_COLORS.len()];
        self.frame += 1;
        Some(color)
    }
}

/// At most one pulse per element
///
/// `H` is the host's handle for the scheduled frame callback. Triggering a new
/// pulse hands back the previous handle so the host can cancel it.
#[derive(Debug, Clone, Default)]
pub struct PulseSlot<H> {
    pending: Option<H>,
    pulse: Option<HighScorePulse>,
}

impl<H> PulseSlot<H> {
    pub fn new() -> Self {
        Self {
            pending: None,
            pulse: None,
        }
    }

    /// Restart the pulse; returns the superseded callback, if any
    #[must_use]
    pub fn trigger(&mut self) -> Option<H> {
        self.pulse = Some(HighScorePulse::default());
        self.pending.take()
    }

    /// Remember the callback scheduled for the next step
    pub fn arm(&mut self, handle: H) {
        self.pending = Some(handle);
    }

    /// Run one step from the scheduled callback
    ///
    /// `None` means the pulse is over and the element should drop its color.
    pub fn step(&mut self) -> Option<&'static str> {
        self.pending = None;
        let color = self.pulse.as_mut()?.next_color();
        if color.is_none() {
            self.pulse = None;
        }
        color
    }

    pub fn is_active(&self) -> bool {
        self.pulse.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_cycles_then_stops() {
        let mut pulse = HighScorePulse::default();
        let colors: Vec<_> = std::iter::from_fn(|| pulse.next_color()).collect();
        assert_eq!(
            colors,
            ["#4CAF50", "#FFD700", "#FF4081", "#4CAF50", "#FFD700", "#FF4081"]
        );
        assert_eq!(pulse.next_color(), None);
    }

    #[test]
    fn test_slot_replaces_in_flight_pulse() {
        let mut slot = PulseSlot::<i32>::new();
        assert_eq!(slot.trigger(), None);
        assert_eq!(slot.step(), Some("#4CAF50"));
        slot.arm(7);
        assert_eq!(slot.step(), Some("#FFD700"));
        slot.arm(8);

        // Retrigger mid-pulse: the old callback comes back for cancelling
        assert_eq!(slot.trigger(), Some(8));
        assert!(!slot.has_pending());
        assert_eq!(slot.step(), Some("#4CAF50"));

        for _ in 1..PULSE_FRAMES {
            assert!(slot.step().is_some());
        }
        assert_eq!(slot.step(), None);
        assert!(!slot.is_active());
        assert_eq!(slot.step(), None);
    }

    #[test]
    fn test_rank_text() {
        assert_eq!(rank_text(1), "🏆 New High Score!");
        assert_eq!(rank_text(3), "🎉 Top 3 Score!");
        assert_eq!(rank_text(6), "Keep practicing!");
    }

    #[test]
    fn test_hud_strings() {
        let mut scores = HighScores::new();
        scores.add_score(12.34, String::new());
        scores.add_score(75.0, String::new());
        assert_eq!(high_score_lines(&scores), ["#1: 75.0s", "#2: 12.3s"]);

        let stats = GameStats {
            blocks_dodged: 4,
            max_speed: 1.3,
            distance_moved: 250.4,
            close_calls: 2,
        };
        let fields = stat_fields(&stats);
        assert_eq!(fields[1], ("max-speed", "1.3x".to_string()));
        assert_eq!(fields[2], ("distance-moved", "250px".to_string()));

        assert_eq!(score_labels(5.0, 75.0), ("5.0s".to_string(), "1m 15.0s".to_string()));
    }
}
