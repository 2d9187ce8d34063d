//! High score leaderboard
//!
//! Persisted through the key-value store, tracks the top 5 survival times.

use serde::{Deserialize, Serialize};

use crate::persistence::{KeyValueStore, StoreError};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 5;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Survival time in seconds
    pub score: f64,
    /// ISO-8601 date the score was set
    pub date: String,
    /// Session length in seconds
    pub duration: f64,
}

/// High score leaderboard, sorted descending by score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScores {
    entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "dodgeABlock_highScores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from arbitrary entries, restoring order and size bounds
    pub fn from_entries(mut entries: Vec<HighScoreEntry>) -> Self {
        // Stable sort keeps earlier entries ahead on ties
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.truncate(MAX_HIGH_SCORES);
        Self { entries }
    }

    /// Whether a score would enter the leaderboard
    pub fn qualifies(&self, score: f64) -> bool {
        self.entries.len() < MAX_HIGH_SCORES
            || self.entries.last().is_some_and(|e| score > e.score)
    }

    /// Add a score if it qualifies; returns whether it was recorded
    pub fn add_score(&mut self, score: f64, date: String) -> bool {
        if !self.qualifies(score) {
            return false;
        }

        // After every equal score, so ties keep insertion order
        let pos = self
            .entries
            .iter()
            .position(|e| score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            HighScoreEntry {
                score,
                date,
                duration: score,
            },
        );
        self.entries.truncate(MAX_HIGH_SCORES);
        true
    }

    /// 1-based position `score` would take, capped at `MAX_HIGH_SCORES + 1`
    pub fn rank(&self, score: f64) -> usize {
        let ahead = self.entries.iter().filter(|e| score <= e.score).count();
        (ahead + 1).min(MAX_HIGH_SCORES + 1)
    }

    /// Best score so far, 0 when empty
    pub fn high_score(&self) -> f64 {
        self.entries.first().map(|e| e.score).unwrap_or(0.0)
    }

    pub fn entries(&self) -> &[HighScoreEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Load from storage; anything unreadable becomes an empty board
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let Some(json) = store.get(Self::STORAGE_KEY) else {
            log::info!("No high scores found, starting fresh");
            return Self::new();
        };

        match serde_json::from_str::<Vec<HighScoreEntry>>(&json) {
            Ok(entries) => {
                let scores = Self::from_entries(entries);
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Err(e) => {
                log::warn!("Failed to load high scores: {}", e);
                Self::new()
            }
        }
    }

    /// Save to storage
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Format a survival time: `12.3s` or `2m 5.0s`
pub fn format_score(seconds: f64) -> String {
    if seconds < 60.0 {
        return format!("{seconds:.1}s");
    }
    let minutes = (seconds / 60.0).floor();
    let remaining = seconds - minutes * 60.0;
    format!("{}m {:.1}s", minutes as u64, remaining)
}
