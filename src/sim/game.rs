//! Session state machine and per-frame update
//!
//! The host calls [`Game::tick`] once per display refresh with a monotonic
//! millisecond timestamp and re-arms its frame callback only while the outcome
//! says so. Input and restarts arrive between ticks.

use rustc_hash::FxHashSet;

use super::collision::{CollisionSystem, check_collision, overlap_center};
use super::obstacle::ObstacleManager;
use super::player::Player;
use super::state::{GamePhase, KeyEventKind, direction_for_code};
use super::stats::{FrameStats, GameStats, ScoreTracker};
use crate::highscores::HighScores;
use crate::persistence::KeyValueStore;
use crate::platform;
use crate::pool::{PoolError, PoolHandle};
use crate::renderer::{RenderSink, shapes};
use crate::settings::Settings;

/// Mixed into the session seed so effects and spawns draw different streams
const EFFECT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// What the host should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Request another frame
    pub keep_running: bool,
    pub phase: GamePhase,
    /// The run ended on this tick
    pub game_over: bool,
    /// The finished run beat the previous best
    pub new_high_score: bool,
    /// The finished run made it onto the leaderboard
    pub entered_leaderboard: bool,
}

impl TickOutcome {
    fn idle(phase: GamePhase) -> Self {
        Self {
            keep_running: phase.is_running(),
            phase,
            game_over: false,
            new_high_score: false,
            entered_leaderboard: false,
        }
    }
}

/// Converts frame timestamps to clamped deltas
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    last_ms: f64,
    max_delta: f32,
}

impl FrameClock {
    fn reset(&mut self, now_ms: f64) {
        self.last_ms = now_ms;
    }

    /// Seconds since the previous call, clamped to `[0, max_delta]`
    fn delta(&mut self, timestamp_ms: f64) -> f32 {
        let dt = ((timestamp_ms - self.last_ms) / 1000.0) as f32;
        self.last_ms = timestamp_ms;
        dt.clamp(0.0, self.max_delta)
    }
}

pub struct Game {
    settings: Settings,
    phase: GamePhase,
    player: Player,
    obstacles: ObstacleManager,
    collisions: CollisionSystem,
    score: ScoreTracker,
    stats: GameStats,
    frame: FrameStats,
    clock: FrameClock,
    high_scores: HighScores,
    store: Box<dyn KeyValueStore>,
    ending_since_ms: Option<f64>,
    /// Rank taken by the last finished run, fixed before it joined the board
    final_rank: Option<usize>,
    seed: u64,
    sessions: u64,
}

impl Game {
    /// Build a game in the `Start` phase, loading high scores from `store`
    pub fn new(settings: Settings, store: Box<dyn KeyValueStore>) -> Result<Self, PoolError> {
        let settings = settings.validated();
        let seed = settings.seed.unwrap_or_else(platform::clock_seed);
        let obstacles = ObstacleManager::new(&settings, seed)?;
        let collisions = CollisionSystem::new(
            settings.effect_particle_count,
            settings.effect_max_age,
            settings.effect_gravity,
            seed ^ EFFECT_SEED_SALT,
        );
        let high_scores = HighScores::load(store.as_ref());

        log::info!("Game initialized with seed: {}", seed);

        Ok(Self {
            player: Player::new(&settings),
            clock: FrameClock {
                last_ms: 0.0,
                max_delta: settings.max_delta_secs(),
            },
            settings,
            phase: GamePhase::Start,
            obstacles,
            collisions,
            score: ScoreTracker::default(),
            stats: GameStats::default(),
            frame: FrameStats::default(),
            high_scores,
            store,
            ending_since_ms: None,
            final_rank: None,
            seed,
            sessions: 0,
        })
    }

    /// Begin a new session at `now_ms`
    ///
    /// Only allowed from `Start` or `GameOver`; returns whether the session
    /// started, in which case the host should request a frame.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if !self.phase.can_start() {
            return false;
        }

        let seed = self.seed.wrapping_add(self.sessions);
        self.sessions += 1;

        self.obstacles.start_game(now_ms, seed);
        self.collisions.clear();
        self.collisions.reseed(seed ^ EFFECT_SEED_SALT);
        self.player.respawn(&self.settings);
        self.score.start(now_ms);
        self.stats.reset();
        self.frame.reset(now_ms);
        self.clock.reset(now_ms);
        self.ending_since_ms = None;
        self.final_rank = None;
        self.phase = GamePhase::Playing;

        log::info!("Session {} started", self.sessions);
        true
    }

    /// Key press or release; ignored outside `Playing`
    pub fn handle_input(&mut self, kind: KeyEventKind, code: &str) {
        if self.phase != GamePhase::Playing {
            return;
        }
        let Some(direction) = direction_for_code(code) else {
            return;
        };
        match kind {
            KeyEventKind::Down => self.player.start_moving(direction),
            KeyEventKind::Up => self.player.stop_moving(direction),
        }
    }

    /// Advance one frame
    pub fn tick(&mut self, timestamp_ms: f64) -> TickOutcome {
        if !self.phase.is_running() {
            return TickOutcome::idle(self.phase);
        }

        let dt = self.clock.delta(timestamp_ms);
        self.frame.record_frame(timestamp_ms);

        let (width, height) = (self.settings.canvas_width, self.settings.canvas_height);
        if self.phase == GamePhase::Playing {
            self.score.update(dt);
            self.player.update(dt, width);
            self.stats.add_distance(self.player.take_distance());
            self.obstacles.update(dt, timestamp_ms, width, height);
            self.stats.add_dodged(self.obstacles.take_dodged());
            self.stats.update_max_speed(self.obstacles.speed_multiplier());
        }

        self.collisions.update(dt);

        if self.phase == GamePhase::Playing {
            self.check_collisions(timestamp_ms);
        }
        self.frame.object_count = self.obstacles.live_count();

        let mut outcome = TickOutcome::idle(self.phase);
        if self.phase == GamePhase::Ending && self.ending_finished(timestamp_ms) {
            outcome = self.finish();
        }
        outcome
    }

    /// Close calls and the first true hit, scanning in spawn order
    fn check_collisions(&mut self, timestamp_ms: f64) {
        let player = self.player.rect();
        let player_bottom = player.bottom();
        let threshold = self.settings.close_call_threshold;

        let candidates: Option<FxHashSet<PoolHandle>> = self
            .settings
            .use_spatial_grid
            .then(|| self.obstacles.nearby(&player).into_iter().collect());

        let mut hit = None;
        for (handle, obstacle) in self.obstacles.obstacles() {
            let rect = obstacle.rect();

            let gap = rect.y - player_bottom;
            if gap > 0.0 && gap < threshold && rect.x < player.right() && rect.right() > player.x {
                self.stats.increment_close_calls();
            }

            let in_range = candidates.as_ref().is_none_or(|c| c.contains(&handle));
            if in_range && check_collision(&player, &rect) {
                hit = Some(overlap_center(&player, &rect));
                break;
            }
        }

        if let Some(point) = hit {
            self.collisions.create_collision_effect(point);
            self.phase = GamePhase::Ending;
            self.ending_since_ms = Some(timestamp_ms);
            log::info!("Hit at ({:.0}, {:.0}) after {:.1}s", point.x, point.y, self.score.score());
        }
    }

    fn ending_finished(&self, timestamp_ms: f64) -> bool {
        if !self.collisions.has_active_effects() {
            return true;
        }
        match (self.settings.ending_timeout_ms, self.ending_since_ms) {
            (Some(timeout), Some(since)) => timestamp_ms - since >= timeout,
            _ => false,
        }
    }

    /// Enter `GameOver` and submit the score
    fn finish(&mut self) -> TickOutcome {
        self.phase = GamePhase::GameOver;
        self.ending_since_ms = None;

        let score = self.score.score();
        let new_high_score = score > self.high_scores.high_score();
        self.final_rank = Some(self.high_scores.rank(score));
        let entered_leaderboard = self.high_scores.add_score(score, platform::now_iso());
        if entered_leaderboard {
            if let Err(e) = self.high_scores.save(self.store.as_mut()) {
                log::warn!("Failed to save high scores: {}", e);
            }
        }

        log::info!(
            "Game over: {:.1}s, {} dodged, {} close calls{}",
            score,
            self.stats.blocks_dodged,
            self.stats.close_calls,
            if new_high_score { " (new high score)" } else { "" }
        );

        TickOutcome {
            keep_running: false,
            phase: self.phase,
            game_over: true,
            new_high_score,
            entered_leaderboard,
        }
    }

    /// Draw the current frame
    pub fn render(&self, sink: &mut dyn RenderSink) {
        let (width, height) = (self.settings.canvas_width, self.settings.canvas_height);
        sink.clear(width, height);
        shapes::border(sink, width, height);
        shapes::player(sink, &self.player);
        for (_, obstacle) in self.obstacles.obstacles() {
            shapes::obstacle(sink, obstacle);
        }
        for effect in self.collisions.effects() {
            shapes::effect(sink, effect);
        }
        if self.settings.debug_overlay {
            shapes::debug_lines(sink, &self.frame.debug_lines());
        }
    }

    /// Wall time the host measured around the last `tick`
    pub fn record_update_time(&mut self, duration_ms: f64) {
        self.frame.record_update(duration_ms);
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Survival time of the current or last session (seconds)
    pub fn score(&self) -> f64 {
        self.score.score()
    }

    pub fn high_score(&self) -> f64 {
        self.high_scores.high_score()
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    /// Leaderboard position of the current score
    ///
    /// After game over this is the rank the run earned on submission.
    pub fn score_rank(&self) -> usize {
        self.final_rank
            .unwrap_or_else(|| self.high_scores.rank(self.score.score()))
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn frame_stats(&self) -> &FrameStats {
        &self.frame
    }

    pub fn obstacles(&self) -> &ObstacleManager {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut ObstacleManager {
        &mut self.obstacles
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn collisions(&self) -> &CollisionSystem {
        &self.collisions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::renderer::DrawList;

    const FRAME_MS: f64 = 16.0;

    fn settings() -> Settings {
        Settings {
            spawn_interval_ms: 3000.0,
            base_speed: 400.0,
            speed_increase_interval_ms: 1.0e9,
            seed: Some(1),
            ..Default::default()
        }
    }

    fn game(settings: Settings) -> Game {
        Game::new(settings, Box::new(MemoryStore::default())).unwrap()
    }

    /// Force an obstacle onto the player and tick once
    fn force_hit(game: &mut Game, timestamp_ms: f64) -> TickOutcome {
        let (x, y) = (game.player().x, game.player().y);
        game.obstacles_mut().spawn_at(x, y - 10.0).unwrap();
        game.tick(timestamp_ms)
    }

    #[test]
    fn test_new_game_waits_in_start() {
        let mut game = game(settings());
        assert_eq!(game.phase(), GamePhase::Start);
        let outcome = game.tick(100.0);
        assert!(!outcome.keep_running);
        assert_eq!(game.score(), 0.0);
    }

    #[test]
    fn test_full_session() {
        let mut game = game(settings());
        assert!(game.start(0.0));

        let mut step = 0u32;
        let mut tick_until = |game: &mut Game, end_ms: f64| {
            let mut last = None;
            while (step as f64 + 1.0) * FRAME_MS <= end_ms {
                step += 1;
                last = Some(game.tick(step as f64 * FRAME_MS));
            }
            last
        };

        // One interval elapsed: exactly one obstacle
        tick_until(&mut game, 2992.0);
        assert_eq!(game.obstacles().live_count(), 0);
        tick_until(&mut game, 3008.0);
        assert_eq!(game.obstacles().live_count(), 1);

        // Step out of its column
        let (_, obstacle) = game.obstacles().obstacles().next().unwrap();
        let code = if obstacle.x + obstacle.width / 2.0 > 400.0 {
            "ArrowLeft"
        } else {
            "ArrowRight"
        };
        game.handle_input(KeyEventKind::Down, code);

        let outcome = tick_until(&mut game, 4800.0).unwrap();
        assert_eq!(outcome.phase, GamePhase::Playing);
        assert!(outcome.keep_running);
        assert_eq!(game.stats().blocks_dodged, 1);
        assert_eq!(game.obstacles().live_count(), 0);
        assert!(game.stats().distance_moved > 0.0);
        assert!((game.score() - 4.8).abs() < 0.01);

        // Forced overlap ends play immediately
        let mut now = 4816.0;
        let outcome = force_hit(&mut game, now);
        assert_eq!(outcome.phase, GamePhase::Ending);
        assert!(outcome.keep_running);
        assert!(game.collisions().has_active_effects());
        let final_score = game.score();

        // GameOver only once the burst has faded
        let mut ending_ticks = 0;
        let outcome = loop {
            now += FRAME_MS;
            let outcome = game.tick(now);
            if outcome.phase != GamePhase::Ending {
                break outcome;
            }
            assert!(game.collisions().has_active_effects());
            ending_ticks += 1;
            assert!(ending_ticks < 200);
        };
        assert!(ending_ticks >= 50);
        assert_eq!(outcome.phase, GamePhase::GameOver);
        assert!(outcome.game_over);
        assert!(outcome.new_high_score);
        assert!(outcome.entered_leaderboard);
        assert!(!outcome.keep_running);
        assert!(!game.collisions().has_active_effects());

        // Score frozen during Ending, then persisted
        assert_eq!(game.score(), final_score);
        assert_eq!(game.high_score(), final_score);
        let saved = HighScores::load(game.store());
        assert_eq!(saved.entries().len(), 1);
        assert_eq!(game.score_rank(), 1);
        assert!((saved.high_score() - final_score).abs() < 1e-9);
    }

    #[test]
    fn test_close_call_counted() {
        let mut game = game(settings());
        game.start(0.0);
        let (x, bottom) = (game.player().x, game.player().rect().bottom());
        game.obstacles_mut().spawn_at(x, bottom + 1.0).unwrap();
        game.tick(FRAME_MS);
        assert_eq!(game.stats().close_calls, 1);
        assert_eq!(game.phase(), GamePhase::Playing);
    }

    #[test]
    fn test_hit_without_grid() {
        let mut game = game(Settings {
            use_spatial_grid: false,
            ..settings()
        });
        game.start(0.0);
        assert_eq!(force_hit(&mut game, FRAME_MS).phase, GamePhase::Ending);
    }

    #[test]
    fn test_zero_cell_size_does_not_stall() {
        let mut game = game(Settings {
            grid_cell_size: 0.0,
            ..settings()
        });
        assert_eq!(game.settings().grid_cell_size, 100.0);
        game.start(0.0);
        game.obstacles_mut().spawn_at(0.0, -40.0).unwrap();
        game.tick(FRAME_MS);
        assert_eq!(game.obstacles().grid_stats().cells, 1);
    }

    #[test]
    fn test_input_ignored_outside_playing() {
        let mut game = game(settings());
        game.handle_input(KeyEventKind::Down, "ArrowLeft");
        game.start(0.0);
        let start_x = game.player().x;
        game.tick(FRAME_MS);
        assert_eq!(game.player().x, start_x);

        game.handle_input(KeyEventKind::Down, "KeyA");
        game.tick(2.0 * FRAME_MS);
        assert!(game.player().x < start_x);

        game.handle_input(KeyEventKind::Up, "KeyA");
        let stopped_x = game.player().x;
        game.tick(3.0 * FRAME_MS);
        assert_eq!(game.player().x, stopped_x);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut game = game(settings());
        game.start(0.0);
        game.tick(1000.0);
        let max = game.settings().max_delta_secs() as f64;
        assert!((game.score() - max).abs() < 1e-6);

        // Timestamps going backwards never rewind the score
        game.tick(900.0);
        assert!((game.score() - max).abs() < 1e-6);
    }

    #[test]
    fn test_start_only_from_idle_phases() {
        let mut game = game(settings());
        assert!(game.start(0.0));
        assert!(!game.start(10.0));

        force_hit(&mut game, FRAME_MS);
        assert!(!game.start(20.0));

        let mut now = FRAME_MS;
        while game.phase() == GamePhase::Ending {
            now += FRAME_MS;
            game.tick(now);
        }
        assert!(game.start(now));
        assert_eq!(game.phase(), GamePhase::Playing);
        assert_eq!(game.obstacles().live_count(), 0);
        assert_eq!(game.stats().close_calls, 0);
        assert_eq!(game.score(), 0.0);
        assert!(!game.collisions().has_active_effects());
    }

    #[test]
    fn test_sessions_advance_seed() {
        let quick = |seed| Settings {
            spawn_interval_ms: 10.0,
            seed: Some(seed),
            ..settings()
        };
        let first_spawn_x = |game: &mut Game, now: f64| {
            assert!(game.start(now));
            game.tick(now + FRAME_MS);
            game.obstacles().obstacles().next().map(|(_, o)| o.x)
        };

        let mut a = game(quick(5));
        let first = first_spawn_x(&mut a, 0.0);
        force_hit(&mut a, 2.0 * FRAME_MS);
        let mut now = 2.0 * FRAME_MS;
        while a.phase() == GamePhase::Ending {
            now += FRAME_MS;
            a.tick(now);
        }
        let second = first_spawn_x(&mut a, now);

        // Session 1 of seed 5 replays session 0 of seed 6
        let mut b = game(quick(6));
        assert_eq!(second, first_spawn_x(&mut b, 0.0));
        assert!(first.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn test_ending_timeout() {
        let mut game = game(Settings {
            ending_timeout_ms: Some(100.0),
            effect_max_age: 10.0,
            ..settings()
        });
        game.start(0.0);
        force_hit(&mut game, FRAME_MS);
        assert_eq!(game.tick(100.0).phase, GamePhase::Ending);
        let outcome = game.tick(FRAME_MS + 100.0);
        assert!(outcome.game_over);
        assert!(game.collisions().has_active_effects());
    }

    #[test]
    fn test_lower_score_is_not_new_high() {
        let mut game = game(settings());
        let mut now = 0.0;
        let mut outcomes = Vec::new();
        for session_ms in [1000.0, 200.0] {
            game.start(now);
            while now < game.score.started_at_ms() + session_ms {
                now += FRAME_MS;
                game.tick(now);
            }
            now += FRAME_MS;
            force_hit(&mut game, now);
            let outcome = loop {
                now += FRAME_MS;
                let outcome = game.tick(now);
                if outcome.game_over {
                    break outcome;
                }
            };
            outcomes.push(outcome);
        }
        assert!(outcomes[0].new_high_score);
        assert!(!outcomes[1].new_high_score);
        // Any top-5 finish still counts for the label pulse
        assert!(outcomes[1].entered_leaderboard);
        assert_eq!(game.high_scores().entries().len(), 2);
        assert_eq!(game.score_rank(), 2);
        assert_eq!(game.high_scores().rank(0.5), 2);
    }

    #[test]
    fn test_render_draws_every_entity() {
        let mut game = game(settings());
        game.start(0.0);
        game.obstacles_mut().spawn_at(100.0, 100.0).unwrap();
        game.obstacles_mut().spawn_at(300.0, 100.0).unwrap();

        let mut sink = DrawList::new();
        game.render(&mut sink);
        // Player plus two obstacles
        assert_eq!(sink.rect_count(), 3);
        assert_eq!(sink.circle_count(), 0);

        force_hit(&mut game, FRAME_MS);
        sink.clear_commands();
        game.render(&mut sink);
        assert_eq!(sink.circle_count(), game.settings().effect_particle_count);
    }
}
