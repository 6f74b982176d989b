//! Star Strike entry point
//!
//! The browser build drives the game from `requestAnimationFrame` and draws on
//! a 2D canvas. The native build plays a headless session with an autopilot.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent};

    use star_strike::audio::WebAudio;
    use star_strike::consts::CAMPAIGN_WAVES;
    use star_strike::highscores::Leaderboard;
    use star_strike::persistence::{KeyValueStore, LocalStorageStore, MemoryStore};
    use star_strike::platform::web::{CanvasRenderer, bind_keyboard};
    use star_strike::platform::{InputState, ScoreSink};
    use star_strike::score::ScoreBoard;
    use star_strike::sim::{SessionPhase, WaveTable};
    use star_strike::{Game, Settings, sounds};

    /// Everything the frame callback needs between frames
    struct App {
        game: Game,
        input: Rc<RefCell<InputState>>,
        audio: WebAudio,
        score: ScoreBoard,
        leaderboard: Leaderboard<Box<dyn KeyValueStore>>,
        renderer: Option<CanvasRenderer>,
        restart_requested: Rc<Cell<bool>>,
        last_time: f64,
        show_fps: bool,
    }

    impl App {
        fn frame(&mut self, time: f64) {
            let elapsed = if self.last_time > 0.0 {
                time - self.last_time
            } else {
                0.0
            };
            self.last_time = time;

            if self.restart_requested.replace(false) && self.game.world().phase().is_finished() {
                self.score.reset();
                self.game.restart(js_sys::Date::now() as u64);
            }

            let input = *self.input.borrow();
            self.game.frame(
                elapsed,
                &input,
                &mut self.audio,
                &mut self.score,
                &mut self.leaderboard,
            );
            if let Some(renderer) = self.renderer.as_mut() {
                self.game.render(renderer);
            }
            self.update_hud();
        }

        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let set_text = |selector: &str, text: &str| {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    el.set_text_content(Some(text));
                }
            };

            let world = self.game.world();
            set_text("#hud-score .hud-value", &self.score.current_score().to_string());
            set_text("#hud-wave .hud-value", &world.wave().to_string());
            set_text("#hud-health .hud-value", &world.player().health.to_string());
            if self.show_fps {
                set_text(
                    "#hud-fps .hud-value",
                    &format!("{:.0}", self.game.clock().fps()),
                );
            }
            let best = self.leaderboard.scores().top_score().unwrap_or(0);
            set_text("#hud-best .hud-value", &best.to_string());

            let banner = match world.phase() {
                SessionPhase::Paused => "Paused",
                SessionPhase::GameOver => "Game Over - press Enter",
                SessionPhase::Victory => "Victory! - press Enter",
                SessionPhase::Halted => "Wave data missing",
                SessionPhase::Playing | SessionPhase::Breather => "",
            };
            if let Some(el) = document.get_element_by_id("banner") {
                el.set_text_content(Some(banner));
                let class = if banner.is_empty() { "hidden" } else { "" };
                let _ = el.set_attribute("class", class);
            }
        }
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        match LocalStorageStore::open() {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("LocalStorage unavailable ({}), progress will not persist", e);
                Box::new(MemoryStore::new())
            }
        }
    }

    fn find_canvas(game: &Game) -> Option<CanvasRenderer> {
        let canvas: HtmlCanvasElement = web_sys::window()?
            .document()?
            .get_element_by_id("canvas")?
            .dyn_into()
            .ok()?;
        match CanvasRenderer::new(&canvas, game.world().field()) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                log::warn!("Canvas unavailable: {}", e);
                None
            }
        }
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Star Strike starting...");

        let store = open_store();
        let settings = Settings::load(&*store);
        let seed = settings
            .seed
            .unwrap_or_else(|| js_sys::Date::now() as u64);

        let mut game = Game::new(&settings, WaveTable::campaign(CAMPAIGN_WAVES), seed)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        game.resolve_builtin_assets();

        let audio = WebAudio::new(settings.master_volume, settings.sfx_volume, settings.muted);
        if !audio.is_available() {
            for id in sounds::ALL {
                game.assets_mut().mark_failed(id, "no AudioContext");
            }
        }

        let renderer = find_canvas(&game);

        let input = Rc::new(RefCell::new(InputState::default()));
        bind_keyboard(input.clone())?;

        let restart_requested = Rc::new(Cell::new(false));
        bind_restart(restart_requested.clone())?;

        let app = App {
            game,
            input,
            audio,
            score: ScoreBoard::new(),
            leaderboard: Leaderboard::open(store),
            renderer,
            restart_requested,
            last_time: 0.0,
            show_fps: settings.show_fps,
        };

        if let Some(loading) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("loading"))
        {
            let _ = loading.set_attribute("class", "hidden");
        }

        request_animation_frame(Rc::new(RefCell::new(app)));
        log::info!("Star Strike running!");
        Ok(())
    }

    fn bind_restart(flag: Rc<Cell<bool>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if matches!(event.key().as_str(), "Enter" | "r" | "R") {
                flag.set(true);
            }
        });
        window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            log::error!("No window, game loop stopped");
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        app.borrow_mut().frame(time);
        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use star_strike::audio::LogAudio;
    use star_strike::consts::CAMPAIGN_WAVES;
    use star_strike::error::RenderError;
    use star_strike::highscores::Leaderboard;
    use star_strike::persistence::{FileStore, KeyValueStore, MemoryStore};
    use star_strike::platform::{Action, InputSource, RenderItem, RenderSink, ScoreSink};
    use star_strike::score::ScoreBoard;
    use star_strike::sim::{WaveTable, World};
    use star_strike::{Game, Settings};

    /// Longest simulated session before giving up
    const SESSION_CAP_MS: f64 = 10.0 * 60.0 * 1000.0;
    /// Uneven frame lengths, as a real display would deliver them
    const FRAME_PATTERN_MS: [f64; 4] = [15.0, 17.0, 16.0, 33.0];

    /// Slides under the lowest enemy and holds the trigger
    struct Autopilot {
        target_x: Option<f32>,
        player_x: f32,
    }

    impl Autopilot {
        fn observe(world: &World) -> Self {
            let player = world.player().pos;
            let target_x = world
                .scheduler()
                .enemies()
                .iter()
                .filter(|e| e.is_active())
                .max_by(|a, b| a.pos.y.total_cmp(&b.pos.y))
                .map(|e| e.pos.x);
            Self {
                target_x,
                player_x: player.x,
            }
        }
    }

    impl InputSource for Autopilot {
        fn is_action_active(&self, action: Action) -> bool {
            let offset = self.target_x.map_or(0.0, |x| x - self.player_x);
            match action {
                Action::MoveLeft => offset < -4.0,
                Action::MoveRight => offset > 4.0,
                Action::Fire => self.target_x.is_some(),
                Action::MoveUp | Action::MoveDown | Action::Pause => false,
            }
        }
    }

    /// Counts draw calls instead of drawing
    #[derive(Default)]
    struct CountingRenderer {
        frames: u64,
        items: u64,
    }

    impl RenderSink for CountingRenderer {
        fn begin(&mut self) -> Result<(), RenderError> {
            self.frames += 1;
            Ok(())
        }

        fn draw(&mut self, _item: &RenderItem<'_>) -> Result<(), RenderError> {
            self.items += 1;
            Ok(())
        }
    }

    fn open_store() -> Box<dyn KeyValueStore> {
        let dir = std::env::var("STAR_STRIKE_DATA").unwrap_or_else(|_| ".star-strike".into());
        match FileStore::new(&dir) {
            Ok(store) => Box::new(store),
            Err(e) => {
                log::warn!("Cannot use {} for saves ({}), keeping them in memory", dir, e);
                Box::new(MemoryStore::new())
            }
        }
    }

    fn load_waves(path: Option<String>) -> Result<WaveTable, String> {
        let Some(path) = path else {
            return Ok(WaveTable::campaign(CAMPAIGN_WAVES));
        };
        let json = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
        let table = WaveTable::from_json(&json).map_err(|e| format!("{path}: {e}"))?;
        log::info!("Loaded {} waves from {}", table.len(), path);
        Ok(table)
    }

    pub fn run() -> Result<(), String> {
        let store = open_store();
        let settings = Settings::load(&*store);
        let table = load_waves(std::env::args().nth(1))?;
        let seed = settings.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |d| d.as_millis() as u64)
        });

        let mut game = Game::new(&settings, table, seed).map_err(|e| e.to_string())?;
        game.resolve_builtin_assets();

        let mut audio = LogAudio::new();
        audio.set_muted(settings.muted);
        let mut score = ScoreBoard::new();
        let mut leaderboard = Leaderboard::open(store);
        let mut renderer = CountingRenderer::default();

        let mut elapsed = 0.0;
        for frame_ms in FRAME_PATTERN_MS.iter().cycle() {
            if game.world().phase().is_finished() || elapsed >= SESSION_CAP_MS {
                break;
            }
            let pilot = Autopilot::observe(game.world());
            game.frame(*frame_ms, &pilot, &mut audio, &mut score, &mut leaderboard);
            game.render(&mut renderer);
            elapsed += frame_ms;
        }

        let world = game.world();
        log::info!(
            "Finished in {:?} after {:.1}s: wave {}, {} points, {} kills, {} waves cleared, {} sounds, {} items over {} frames",
            world.phase(),
            elapsed / 1000.0,
            world.wave(),
            score.current_score(),
            score.kills(),
            score.waves_cleared(),
            audio.played().len(),
            renderer.items,
            renderer.frames
        );
        if let Some(best) = leaderboard.scores().top_score() {
            log::info!("Best score on record: {}", best);
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Star Strike (native) starting...");

    if let Err(e) = headless::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
