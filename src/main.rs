//! Dodge Block entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, KeyboardEvent};

    use dodge_block::persistence::LocalStorage;
    use dodge_block::renderer::canvas::CanvasSink;
    use dodge_block::sim::{Game, GamePhase, KeyEventKind, direction_for_code};
    use dodge_block::ui::{self, PulseSlot};
    use dodge_block::Settings;

    /// Browser-side state around the game
    struct App {
        game: Game,
        sink: CanvasSink,
        /// High score label pulse; holds the pending animation frame id
        pulse: PulseSlot<i32>,
        /// A main-loop frame is already scheduled
        frame_pending: bool,
        /// Last text written to the score label
        score_text: String,
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn element(id: &str) -> Option<web_sys::Element> {
        web_sys::window()?.document()?.get_element_by_id(id)
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = element(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = element(id) {
            let _ = el.set_attribute("class", if hidden { "hidden" } else { "" });
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Dodge Block starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let settings = Settings::load(&LocalStorage);

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("gameCanvas")
            .ok_or("no canvas")?
            .dyn_into()?;
        canvas.set_width(settings.canvas_width as u32);
        canvas.set_height(settings.canvas_height as u32);

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or("no 2d context")?
            .dyn_into()?;

        let game = Game::new(settings, Box::new(LocalStorage))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let app = Rc::new(RefCell::new(App {
            game,
            sink: CanvasSink::new(ctx),
            pulse: PulseSlot::new(),
            frame_pending: false,
            score_text: String::new(),
        }));

        {
            let a = &mut *app.borrow_mut();
            a.game.render(&mut a.sink);
            update_hud(a);
            update_high_score_lists(&a.game);
        }
        show_start_screen();

        setup_input_handlers(app.clone());
        setup_buttons(app);

        log::info!("Dodge Block ready");
        Ok(())
    }

    fn show_start_screen() {
        set_hidden("game-overlay", false);
        set_hidden("start-screen", false);
        set_hidden("game-over-screen", true);
    }

    fn show_game_over_screen(game: &Game) {
        set_hidden("game-overlay", false);
        set_hidden("start-screen", true);
        set_hidden("game-over-screen", false);

        set_text("final-score", &format!("{:.1}", game.score()));
        set_text("final-high-score", &format!("{:.1}", game.high_score()));
        set_text("rank-info", &ui::rank_text(game.score_rank()));
        for (id, text) in ui::stat_fields(game.stats()) {
            set_text(id, &text);
        }
        update_high_score_lists(game);
    }

    fn update_high_score_lists(game: &Game) {
        let entries = game.high_scores().entries();
        let html: String = ui::high_score_lines(game.high_scores())
            .iter()
            .zip(entries)
            .map(|(line, entry)| {
                let date = entry.date.get(..10).unwrap_or(&entry.date);
                format!("<li><span>{}</span><span>{}</span></li>", line, date)
            })
            .collect();

        for id in ["start-high-scores", "game-over-high-scores"] {
            if let Some(el) = element(id) {
                el.set_inner_html(&html);
            }
        }
    }

    /// Refresh score labels when their text changes
    fn update_hud(app: &mut App) {
        let (score, high_score) = ui::score_labels(app.game.score(), app.game.high_score());
        if score != app.score_text {
            set_text("score", &score);
            app.score_text = score;
        }
        set_text("high-score", &high_score);
    }

    fn start_game(app: &Rc<RefCell<App>>) {
        let schedule = {
            let mut a = app.borrow_mut();
            if !a.game.start(now_ms()) {
                return;
            }
            set_hidden("game-overlay", true);
            set_hidden("start-screen", true);
            set_hidden("game-over-screen", true);
            !std::mem::replace(&mut a.frame_pending, true)
        };
        if schedule {
            request_animation_frame(app.clone());
        }
    }

    fn setup_input_handlers(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Keyboard
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let code = event.code();
                let phase = app.borrow().game.phase();
                if matches!(code.as_str(), "Space" | "Enter") && phase.can_start() {
                    event.prevent_default();
                    start_game(&app);
                    return;
                }
                if direction_for_code(&code).is_some() {
                    event.prevent_default();
                }
                app.borrow_mut().game.handle_input(KeyEventKind::Down, &code);
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                app.borrow_mut()
                    .game
                    .handle_input(KeyEventKind::Up, &event.code());
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(app: Rc<RefCell<App>>) {
        for id in ["start-button", "restart-button"] {
            let Some(btn) = element(id) else {
                continue;
            };
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                start_game(&app);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        let outcome = {
            let a = &mut *app.borrow_mut();

            let started = now_ms();
            let outcome = a.game.tick(time);
            a.game.record_update_time(now_ms() - started);

            a.game.render(&mut a.sink);
            update_hud(a);

            if outcome.game_over {
                show_game_over_screen(&a.game);
            }
            if !outcome.keep_running {
                a.frame_pending = false;
            }
            outcome
        };

        if outcome.entered_leaderboard {
            start_pulse(app.clone());
        }
        if outcome.keep_running {
            request_animation_frame(app);
        } else if outcome.phase == GamePhase::GameOver {
            log::info!("Press Space to play again");
        }
    }

    /// Start the high score pulse, cancelling one still in flight
    fn start_pulse(app: Rc<RefCell<App>>) {
        let superseded = app.borrow_mut().pulse.trigger();
        if let (Some(id), Some(window)) = (superseded, web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
        schedule_pulse(app);
    }

    fn schedule_pulse(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let next = app.clone();
        let closure = Closure::once(move |_time: f64| pulse_step(next));
        if let Ok(id) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            app.borrow_mut().pulse.arm(id);
        }
        closure.forget();
    }

    fn pulse_step(app: Rc<RefCell<App>>) {
        let color = app.borrow_mut().pulse.step();
        let Some(label) = element("high-score").and_then(|el| el.dyn_into::<HtmlElement>().ok())
        else {
            return;
        };
        match color {
            Some(color) => {
                let _ = label.style().set_property("color", color);
                schedule_pulse(app);
            }
            None => {
                let _ = label.style().remove_property("color");
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    if let Err(e) = wasm_game::run() {
        log::error!("Failed to start: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Dodge Block (native) starting...");
    log::info!("Native mode runs a headless autopilot session - use `trunk serve` for the web version");

    if let Err(e) = headless::run() {
        log::error!("Headless run failed: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::time::Instant;

    use dodge_block::highscores::format_score;
    use dodge_block::persistence::FileStore;
    use dodge_block::renderer::DrawList;
    use dodge_block::sim::{Game, KeyEventKind, Player};
    use dodge_block::{PoolError, Settings};

    /// Give up on a session after this much simulated time
    const MAX_SESSION_MS: f64 = 10.0 * 60.0 * 1000.0;
    /// How far above the player obstacles start to matter
    const LOOKAHEAD: f32 = 220.0;

    /// Key the autopilot wants held, if any
    fn steer(game: &Game) -> Option<&'static str> {
        let player: &Player = game.player();
        let rect = player.rect();
        let centre = rect.x + rect.width / 2.0;

        // Lowest obstacle still above the player's feet and near its column
        let threat = game
            .obstacles()
            .obstacles()
            .map(|(_, o)| o.rect())
            .filter(|r| r.bottom() > rect.y - LOOKAHEAD && r.y < rect.bottom())
            .filter(|r| r.x < rect.right() + 10.0 && r.right() > rect.x - 10.0)
            .max_by(|a, b| a.y.total_cmp(&b.y))?;

        let threat_centre = threat.x + threat.width / 2.0;
        let width = game.settings().canvas_width;
        let go_left = if threat_centre > centre {
            threat.x - rect.width > 0.0
        } else {
            threat.right() + rect.width > width
        };
        Some(if go_left { "ArrowLeft" } else { "ArrowRight" })
    }

    pub fn run() -> Result<(), PoolError> {
        let store = FileStore::new(".dodge-block");
        let settings = Settings::load(&store);
        let frame_ms = settings.frame_interval_ms();
        let mut game = Game::new(settings, Box::new(store))?;
        let mut sink = DrawList::new();

        let mut now = 0.0;
        game.start(now);
        let mut held: Option<&'static str> = None;

        loop {
            let want = steer(&game);
            if want != held {
                if let Some(code) = held {
                    game.handle_input(KeyEventKind::Up, code);
                }
                if let Some(code) = want {
                    game.handle_input(KeyEventKind::Down, code);
                }
                held = want;
            }

            now += frame_ms;
            let started = Instant::now();
            let outcome = game.tick(now);
            game.record_update_time(started.elapsed().as_secs_f64() * 1000.0);

            sink.clear_commands();
            game.render(&mut sink);

            if !outcome.keep_running {
                if outcome.new_high_score {
                    log::info!("New high score!");
                }
                break;
            }
            if now >= MAX_SESSION_MS {
                log::info!("Autopilot survived the full session");
                break;
            }
        }

        let stats = game.stats();
        let pool = game.obstacles().pool_stats();
        let grid = game.obstacles().grid_stats();
        println!("Survived {}", format_score(game.score()));
        println!(
            "Dodged {} blocks, {} close calls, max speed {:.1}x, moved {:.0}px",
            stats.blocks_dodged, stats.close_calls, stats.max_speed, stats.distance_moved
        );
        println!(
            "Pool {}/{} active, grid {} cells, last frame {} draw calls",
            pool.active,
            pool.total,
            grid.cells,
            sink.commands.len()
        );
        for line in game.frame_stats().debug_lines() {
            println!("{}", line);
        }
        for (i, entry) in game.high_scores().entries().iter().enumerate() {
            println!("#{}: {} ({})", i + 1, format_score(entry.score), entry.date);
        }
        Ok(())
    }
}
