//! Game context
//!
//! Owns the loop controller, the world and the asset registry, and is handed
//! its collaborators (input, audio, score, persistence, renderer) on every
//! call instead of reaching for globals.

use std::convert::Infallible;
use std::f32::consts::FRAC_PI_2;

use glam::Vec2;

use crate::assets::{AssetKind, AssetRegistry, AssetState};
use crate::error::SimError;
use crate::interpolate;
use crate::platform::{
    AudioSink, InputSource, PersistenceSink, RenderItem, RenderSink, ScoreSink, poll,
};
use crate::settings::Settings;
use crate::sim::{
    FixedTimestep, FramePlan, GameEvent, SessionPhase, Shape, WaveEvent, WaveTable, World,
};
use crate::sounds;

pub const PLAYER_SPRITE: &str = "player";
pub const PLAYER_SHOT_SPRITE: &str = "player_shot";
pub const ENEMY_SHOT_SPRITE: &str = "enemy_shot";

pub struct Game {
    clock: FixedTimestep,
    world: World,
    assets: AssetRegistry,
    last_plan: FramePlan,
    /// Whether the finished session's score was handed to persistence
    result_recorded: bool,
}

impl Game {
    pub fn new(settings: &Settings, table: WaveTable, seed: u64) -> Result<Self, SimError> {
        settings.validate()?;
        let clock = settings.timestep()?;
        let world = World::new(table, settings.world_config(seed));

        let mut assets = AssetRegistry::new();
        for sprite in [PLAYER_SPRITE, PLAYER_SHOT_SPRITE, ENEMY_SHOT_SPRITE] {
            assets.request(sprite, AssetKind::Sprite);
        }
        for wave in world.scheduler().table().iter() {
            for template in &wave.enemies {
                assets.request(&template.name, AssetKind::Sprite);
            }
        }
        for sound in sounds::ALL {
            assets.request(sound, AssetKind::Sound);
        }

        log::info!(
            "Game initialized: seed {}, {} waves, {} sprites, {} sounds, step {:.3}ms",
            seed,
            world.scheduler().table().len(),
            assets.count(AssetKind::Sprite),
            assets.count(AssetKind::Sound),
            clock.step_ms()
        );
        Ok(Self {
            clock,
            world,
            assets,
            last_plan: FramePlan {
                fixed_steps: 0,
                render_interpolation: 0.0,
            },
            result_recorded: false,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &FixedTimestep {
        &self.clock
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    /// Mark every pending asset as loaded. For hosts that draw and
    /// synthesize everything procedurally.
    pub fn resolve_builtin_assets(&mut self) {
        let pending: Vec<String> = self.assets.pending().into_iter().map(String::from).collect();
        for id in pending {
            self.assets.mark_ready(&id);
        }
    }

    pub fn set_target_fps(&mut self, fps: u32) -> Result<(), SimError> {
        self.clock.set_target_fps(fps)
    }

    /// Stop scheduling fixed updates
    pub fn stop(&mut self) {
        self.clock.stop();
    }

    /// Start a new session
    pub fn restart(&mut self, seed: u64) {
        self.world.reset(seed);
        self.clock.start();
        self.result_recorded = false;
        log::info!("Started new game with seed: {}", seed);
    }

    /// Run one rendered frame's worth of fixed updates.
    ///
    /// Input is polled once per fixed update; events are routed to the audio
    /// and score sinks as they happen.
    pub fn frame(
        &mut self,
        raw_elapsed_ms: f64,
        input: &dyn InputSource,
        audio: &mut dyn AudioSink,
        score: &mut dyn ScoreSink,
        persistence: &mut dyn PersistenceSink,
    ) -> FramePlan {
        let world = &mut self.world;
        let assets = &self.assets;
        let plan = self
            .clock
            .run(raw_elapsed_ms, |step_ms| -> Result<(), Infallible> {
                let tick = poll(input);
                for event in world.step(step_ms, &tick) {
                    dispatch(assets, event, audio, score);
                }
                Ok(())
            })
            .unwrap_or_else(|never| match never {});

        if self.world.phase().is_finished() && !self.result_recorded {
            self.result_recorded = true;
            let final_score = score.current_score();
            log::info!(
                "Session ended ({:?}) on wave {} with {} points (best {})",
                self.world.phase(),
                self.world.wave(),
                final_score,
                persistence.load_high_score()
            );
            persistence.save_high_score(final_score, self.world.wave());
        }

        self.last_plan = plan;
        plan
    }

    /// Drawable items for the current state, blended by the last frame's
    /// interpolation factor. Items whose sprite is not loaded are left out.
    pub fn render_items(&self) -> Vec<RenderItem<'_>> {
        let alpha = match self.world.phase() {
            SessionPhase::Playing | SessionPhase::Breather => self.last_plan.render_interpolation,
            _ => 1.0,
        };
        let mut items = Vec::new();

        for (_, p) in self.world.projectiles().iter_active() {
            let sprite = match p.faction {
                crate::sim::Faction::Player => PLAYER_SHOT_SPRITE,
                crate::sim::Faction::Enemy => ENEMY_SHOT_SPRITE,
            };
            items.push(RenderItem {
                pos: interpolate(p.prev_pos, p.pos, alpha),
                shape: Shape::Circle { radius: p.radius },
                heading: p.vel.y.atan2(p.vel.x),
                sprite,
                frame: 0,
            });
        }

        for e in self.world.scheduler().enemies().iter().filter(|e| e.is_active()) {
            items.push(RenderItem {
                pos: interpolate(e.prev_pos, e.pos, alpha),
                shape: e.shape,
                heading: if e.vel == Vec2::ZERO {
                    FRAC_PI_2
                } else {
                    e.vel.y.atan2(e.vel.x)
                },
                sprite: &e.kind,
                frame: (e.age * 8.0) as u32 % 4,
            });
        }

        let player = self.world.player();
        if player.is_alive() {
            let blink = player.invulnerable_ms > 0.0 && (player.invulnerable_ms / 100.0) as u32 % 2 == 1;
            items.push(RenderItem {
                pos: interpolate(player.prev_pos, player.pos, alpha),
                shape: Shape::Circle {
                    radius: player.radius,
                },
                heading: -FRAC_PI_2,
                sprite: PLAYER_SPRITE,
                frame: u32::from(blink),
            });
        }

        items.retain(|item| self.assets.is_ready(item.sprite));
        items
    }

    /// Draw the current frame. Render failures are logged and skipped.
    /// Returns the number of items drawn.
    pub fn render(&self, sink: &mut dyn RenderSink) -> usize {
        if let Err(e) = sink.begin() {
            log::warn!("{}", e);
            return 0;
        }
        let mut drawn = 0;
        for item in self.render_items() {
            match sink.draw(&item) {
                Ok(()) => drawn += 1,
                Err(e) => log::warn!("Skipping `{}`: {}", item.sprite, e),
            }
        }
        drawn
    }
}

fn dispatch(
    assets: &AssetRegistry,
    event: GameEvent,
    audio: &mut dyn AudioSink,
    score: &mut dyn ScoreSink,
) {
    match event {
        GameEvent::Sound(id) => match assets.state(id) {
            // Unregistered ids go through so the sink can report them
            Some(AssetState::Ready) | None => audio.play_sound(id),
            Some(_) => log::trace!("Sound `{}` not loaded, skipped", id),
        },
        GameEvent::Points { amount, event } => score.add_points(amount, event),
        GameEvent::Wave(WaveEvent::Failed { wave, error }) => {
            log::error!("Wave {} failed: {}", wave, error)
        }
        GameEvent::Wave(WaveEvent::Completed { wave }) => {
            log::info!("Wave {} cleared, score {}", wave, score.current_score())
        }
        GameEvent::PhaseChanged { phase } => log::info!("Phase: {:?}", phase),
        GameEvent::Wave(_)
        | GameEvent::PlayerHit { .. }
        | GameEvent::EnemyDestroyed { .. }
        | GameEvent::SpawnSkipped { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::highscores::Leaderboard;
    use crate::persistence::MemoryStore;
    use crate::platform::{Action, InputState};
    use crate::score::ScoreBoard;
    use crate::sim::patterns::MovementPattern;
    use crate::sim::waves::{EnemyTemplate, SpawnPoint, WaveConfig};

    #[derive(Default)]
    struct Recorder {
        sounds: Vec<String>,
    }

    impl AudioSink for Recorder {
        fn play_sound(&mut self, id: &str) {
            self.sounds.push(id.to_string());
        }
    }

    #[derive(Default)]
    struct Canvas {
        drawn: Vec<String>,
    }

    impl RenderSink for Canvas {
        fn draw(&mut self, item: &RenderItem<'_>) -> Result<(), RenderError> {
            self.drawn.push(item.sprite.to_string());
            Ok(())
        }
    }

    struct BrokenCanvas;

    impl RenderSink for BrokenCanvas {
        fn draw(&mut self, _item: &RenderItem<'_>) -> Result<(), RenderError> {
            Err(RenderError("context lost".into()))
        }
    }

    fn one_target() -> WaveTable {
        target_table(MovementPattern::linear(0.0, 0.0).unwrap())
    }

    fn target_table(movement: MovementPattern) -> WaveTable {
        WaveTable::new(vec![WaveConfig {
            id: 1,
            enemy_count: 1,
            spawn_interval_ms: 100.0,
            enemies: vec![EnemyTemplate {
                name: "target".into(),
                health: 1,
                score_value: 10,
                shape: Shape::Circle { radius: 12.0 },
                movement: movement.into(),
                shooting: None,
                fire_interval_ms: 0.0,
            }],
            spawn_points: vec![SpawnPoint {
                x: 0.5,
                y: 0.2,
                delay_ms: 0.0,
            }],
        }])
        .unwrap()
    }

    struct Harness {
        game: Game,
        input: InputState,
        audio: Recorder,
        score: ScoreBoard,
        board: Leaderboard<MemoryStore>,
    }

    impl Harness {
        fn new(table: WaveTable) -> Self {
            Self {
                game: Game::new(&Settings::default(), table, 3).unwrap(),
                input: InputState::default(),
                audio: Recorder::default(),
                score: ScoreBoard::new(),
                board: Leaderboard::open(MemoryStore::new()),
            }
        }

        fn frame(&mut self, ms: f64) -> FramePlan {
            self.game.frame(
                ms,
                &self.input,
                &mut self.audio,
                &mut self.score,
                &mut self.board,
            )
        }
    }

    #[test]
    fn test_frame_runs_due_steps() {
        let mut h = Harness::new(one_target());
        let plan = h.frame(40.0);
        assert_eq!(plan.fixed_steps, 2);
        assert!((plan.render_interpolation - 0.4).abs() < 1e-3);
        assert!((h.game.world().time_ms() - 2.0 * h.game.clock().step_ms()).abs() < 1e-9);
    }

    #[test]
    fn test_unloaded_sprites_are_not_drawn() {
        let mut h = Harness::new(one_target());
        h.frame(20.0);
        let mut canvas = Canvas::default();
        assert_eq!(h.game.render(&mut canvas), 0);

        h.game.assets_mut().mark_ready(PLAYER_SPRITE);
        assert_eq!(h.game.render(&mut canvas), 1);
        assert_eq!(canvas.drawn, vec![PLAYER_SPRITE.to_string()]);
    }

    #[test]
    fn test_items_face_their_direction_of_travel() {
        // Drifts right
        let mut h = Harness::new(target_table(MovementPattern::linear(40.0, 0.0).unwrap()));
        h.game.resolve_builtin_assets();
        for _ in 0..10 {
            h.frame(20.0);
        }
        let items = h.game.render_items();
        let target = items.iter().find(|i| i.sprite == "target").unwrap();
        assert!(target.heading.abs() < 1e-3);
        let player = items.iter().find(|i| i.sprite == PLAYER_SPRITE).unwrap();
        assert!((player.heading + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_failed_sprite_is_permanently_skipped() {
        let mut h = Harness::new(one_target());
        h.game.resolve_builtin_assets();
        h.game.assets_mut().mark_failed(PLAYER_SPRITE, "404");
        h.frame(20.0);
        let mut canvas = Canvas::default();
        assert_eq!(h.game.render(&mut canvas), 0);
    }

    #[test]
    fn test_render_failure_is_not_fatal() {
        let mut h = Harness::new(one_target());
        h.game.resolve_builtin_assets();
        h.frame(20.0);
        assert_eq!(h.game.render(&mut BrokenCanvas), 0);
        // The loop carries on
        assert_eq!(h.frame(20.0).fixed_steps, 1);
    }

    #[test]
    fn test_sounds_wait_for_assets() {
        let mut h = Harness::new(one_target());
        h.input.press(Action::Fire);
        h.frame(20.0);
        assert!(h.audio.sounds.is_empty());

        h.game.resolve_builtin_assets();
        // Past the fire cooldown
        for _ in 0..5 {
            h.frame(100.0);
        }
        assert!(h.audio.sounds.iter().any(|s| s == sounds::SHOOT));
    }

    #[test]
    fn test_session_result_is_recorded_once() {
        let mut h = Harness::new(one_target());
        h.game.resolve_builtin_assets();
        h.input.press(Action::Fire);
        for _ in 0..200 {
            h.frame(40.0);
        }
        assert_eq!(h.game.world().phase(), SessionPhase::Victory);
        assert_eq!(h.score.current_score(), 110);
        assert_eq!(h.score.kills(), 1);
        assert_eq!(h.board.load_high_score(), 110);
        assert_eq!(h.board.scores().entries.len(), 1);
        assert!(h.audio.sounds.iter().any(|s| s == sounds::VICTORY));

        h.game.restart(4);
        assert_eq!(h.game.world().phase(), SessionPhase::Playing);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = Settings {
            target_fps: 10,
            ..Default::default()
        };
        assert!(Game::new(&settings, one_target(), 0).is_err());
    }

    #[test]
    fn test_stop_halts_updates() {
        let mut h = Harness::new(one_target());
        h.game.stop();
        assert_eq!(h.frame(100.0).fixed_steps, 0);
        assert_eq!(h.game.world().time_ms(), 0.0);
    }
}
