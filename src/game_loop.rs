//! 游戏循环：每帧一次输入 → 一次模拟 → 一次渲染，按 tick_rate 限速。
//!
//! `Simulation` 跑一层地牢的系统管线；`Game` 是外层状态机
//! （说明页 → 游戏中 → 过关 / 死亡，或限时探索 → 结算）；`run` 负责驱动两者。

use dungeon::GenerationError;
use hero::Player;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use save::{PlayerRecord, SaveData, SaveSystem};
use std::process;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

use crate::audio::AudioSink;
use crate::config::GameConfig;
use crate::ecs::{ECSWorld, TickEvents};
use crate::explorer::{Explorer, ExplorerOutcome, MAP_CELL_SIZE, export_map};
use crate::input::{InputSnapshot, InputSource};
use crate::level::build_level;
use crate::renderer::{Clock, Renderer};
use crate::systems::{System, SystemResult, default_systems};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelOutcome {
    InProgress,
    /// No enemy left, dying ones included
    Cleared,
    PlayerDied,
}

/// One level's worth of simulation
pub struct Simulation {
    pub ecs: ECSWorld,
    systems: Vec<Box<dyn System>>,
}

impl Simulation {
    pub fn new(ecs: ECSWorld) -> Self {
        Self {
            ecs,
            systems: default_systems(),
        }
    }

    /// Generate the level for `depth` from the configured difficulty
    pub fn for_level(config: &GameConfig, depth: u32, seed: u64) -> Result<Self, GenerationError> {
        let mut ecs = build_level(&config.difficulty.generator_config(), depth, seed)?;
        ecs.resources.pursue_out_of_sight = config.pursue_out_of_sight;
        ecs.resources.screen = config.screen_size();
        Ok(Self::new(ecs))
    }

    /// Advance one tick. Sounds are handed to `audio` before returning.
    pub fn tick(&mut self, input: &InputSnapshot, audio: &mut dyn AudioSink) -> TickEvents {
        let ECSWorld { world, resources } = &mut self.ecs;
        resources.input = input.clone();
        resources.events = TickEvents::default();
        resources.ticks += 1;

        for system in self.systems.iter_mut() {
            match system.run(world, resources) {
                SystemResult::Continue => {}
                SystemResult::Stop => break,
                SystemResult::Error(msg) => {
                    warn!(system = system.name(), %msg, "system failed");
                }
            }
        }

        let events = std::mem::take(&mut resources.events);
        for &effect in &events.sounds {
            audio.play(effect);
        }
        events
    }

    /// 玩家死亡优先于清场
    pub fn outcome(&self) -> LevelOutcome {
        if self.ecs.resources.player.is_dead() {
            LevelOutcome::PlayerDied
        } else if self.ecs.enemy_count() == 0 {
            LevelOutcome::Cleared
        } else {
            LevelOutcome::InProgress
        }
    }

    pub fn player(&self) -> &Player {
        &self.ecs.resources.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.ecs.resources.player
    }

    pub fn depth(&self) -> u32 {
        self.ecs.resources.depth
    }

    pub fn kills(&self) -> u32 {
        self.ecs.resources.kills
    }

    pub fn ticks(&self) -> u64 {
        self.ecs.resources.ticks
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    #[default]
    Instructions,
    Running,
    LevelCleared,
    GameOver,
    /// Timed 2D walk to the down stairs
    Exploring,
    ExplorerFinished,
}

/// 外层状态机
pub struct Game {
    config: GameConfig,
    status: GameStatus,
    simulation: Option<Simulation>,
    explorer: Option<Explorer>,
    saves: SaveSystem,
    rng: Pcg32,
    total_kills: u32,
    notice: Option<String>,
    quit: bool,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        let seed = config.seed.unwrap_or_else(fresh_seed);
        info!(seed, difficulty = %config.difficulty, "game created");
        Self {
            saves: SaveSystem::new(config.save_path.clone()),
            config,
            status: GameStatus::Instructions,
            simulation: None,
            explorer: None,
            rng: Pcg32::seed_from_u64(seed),
            total_kills: 0,
            notice: None,
            quit: false,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn explorer(&self) -> Option<&Explorer> {
        self.explorer.as_ref()
    }

    /// Last one-line message for the status bar (map export result)
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn saves(&self) -> &SaveSystem {
        &self.saves
    }

    /// Kills across every level of this run
    pub fn total_kills(&self) -> u32 {
        self.total_kills
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Seconds spent on the current level
    pub fn level_seconds(&self) -> u64 {
        self.simulation
            .as_ref()
            .map(|sim| sim.ticks() / u64::from(self.config.tick_rate.max(1)))
            .unwrap_or_default()
    }

    /// One frame of game logic
    pub fn update(&mut self, input: &InputSnapshot, audio: &mut dyn AudioSink) {
        if input.quit {
            info!("quit requested");
            self.quit = true;
            return;
        }

        if input.export_map {
            self.export_current_map();
        }

        match self.status {
            GameStatus::Instructions => {
                if let Some(difficulty) = input.select {
                    if difficulty != self.config.difficulty {
                        info!(%difficulty, "difficulty selected");
                        self.config.difficulty = difficulty;
                    }
                }
                if input.explore {
                    self.start_explorer();
                } else if input.confirm {
                    self.start_or_resume();
                }
            }
            GameStatus::Running => self.run_tick(input, audio),
            GameStatus::LevelCleared => {
                if input.confirm {
                    self.advance();
                }
            }
            GameStatus::GameOver => {
                if input.restart {
                    self.total_kills = 0;
                    self.enter_level(1, None);
                }
            }
            GameStatus::Exploring => {
                let outcome = match self.explorer.as_mut() {
                    Some(explorer) => explorer.update(input),
                    None => {
                        self.status = GameStatus::Instructions;
                        return;
                    }
                };
                if outcome != ExplorerOutcome::InProgress {
                    self.status = GameStatus::ExplorerFinished;
                }
            }
            GameStatus::ExplorerFinished => {
                if input.restart {
                    self.start_explorer();
                } else if input.confirm {
                    self.explorer = None;
                    self.status = GameStatus::Instructions;
                }
            }
        }
    }

    /// E on the menu, R after a timed run: fresh map, full countdown
    fn start_explorer(&mut self) {
        let seed = self.rng.random();
        match Explorer::generate(self.config.difficulty, self.config.tick_rate, seed) {
            Ok(explorer) => {
                info!(
                    difficulty = %self.config.difficulty,
                    start = ?explorer.player(),
                    target = ?explorer.target(),
                    "explorer started"
                );
                self.explorer = Some(explorer);
                self.notice = None;
                self.status = GameStatus::Exploring;
            }
            Err(err) => error!(%err, "explorer map generation failed"),
        }
    }

    /// M: write whichever map is on screen to `map_export_path`
    fn export_current_map(&mut self) {
        let grid = match self.status {
            GameStatus::Exploring | GameStatus::ExplorerFinished => {
                self.explorer.as_ref().map(Explorer::grid)
            }
            GameStatus::Running | GameStatus::LevelCleared | GameStatus::GameOver => {
                self.simulation.as_ref().map(|sim| &sim.ecs.resources.grid)
            }
            GameStatus::Instructions => None,
        };
        let Some(grid) = grid else {
            return;
        };
        let path = &self.config.map_export_path;
        self.notice = Some(match export_map(grid, path, MAP_CELL_SIZE) {
            Ok(()) => format!("Map saved to {}", path.display()),
            Err(err) => {
                warn!(err = %format!("{err:#}"), "map export failed");
                "Map export failed".to_string()
            }
        });
    }

    fn run_tick(&mut self, input: &InputSnapshot, audio: &mut dyn AudioSink) {
        let Some(sim) = self.simulation.as_mut() else {
            self.status = GameStatus::Instructions;
            return;
        };
        let events = sim.tick(input, audio);
        self.total_kills += events.enemies_killed;

        match sim.outcome() {
            LevelOutcome::InProgress => {}
            LevelOutcome::Cleared => {
                info!(depth = sim.depth(), kills = sim.kills(), ticks = sim.ticks(), "level cleared");
                self.status = GameStatus::LevelCleared;
            }
            LevelOutcome::PlayerDied => {
                info!(depth = sim.depth(), total_kills = self.total_kills, "player died");
                if let Err(err) = self.saves.delete() {
                    warn!(%err, "failed to delete save");
                }
                self.status = GameStatus::GameOver;
            }
        }
    }

    /// SPACE on the instructions screen: resume from a usable save, else
    /// start at depth 1.
    fn start_or_resume(&mut self) {
        match self.saves.load() {
            Ok(Some(data)) => {
                info!(
                    depth = data.game.current_level_to_resume_at,
                    level = data.player.level,
                    "resuming saved game"
                );
                self.total_kills = data.game.total_enemies_killed;
                self.enter_level(data.game.current_level_to_resume_at, Some(data.player));
            }
            Ok(None) => {
                self.total_kills = 0;
                self.enter_level(1, None);
            }
            Err(err) => {
                warn!(%err, "no usable save, starting a new game");
                self.total_kills = 0;
                self.enter_level(1, None);
            }
        }
    }

    /// SPACE after clearing: next depth, same hero, then auto-save
    fn advance(&mut self) {
        let Some(sim) = self.simulation.as_ref() else {
            self.enter_level(1, None);
            return;
        };
        let carried = PlayerRecord::from(sim.player());
        let next = sim.depth() + 1;
        self.enter_level(next, Some(carried));

        if let Some(sim) = self.simulation.as_ref() {
            let data = SaveData::new(sim.player(), next, self.total_kills);
            if let Err(err) = self.saves.save(&data) {
                warn!(%err, "auto-save failed");
            }
        }
    }

    fn enter_level(&mut self, depth: u32, carried: Option<PlayerRecord>) {
        let seed = self.rng.random();
        match Simulation::for_level(&self.config, depth, seed) {
            Ok(mut sim) => {
                if let Some(record) = carried {
                    record.apply_to(sim.player_mut());
                }
                self.simulation = Some(sim);
                self.notice = None;
                self.status = GameStatus::Running;
            }
            Err(err) => {
                // 配置非法时留在当前界面
                error!(%err, depth, "level generation failed");
            }
        }
    }
}

fn fresh_seed() -> u64 {
    let time = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    (time ^ u128::from(process::id())) as u64
}

/// Frame loop. Returns only after the player quits.
///
/// Input, render and timing errors are logged and the loop carries on.
pub fn run<R, I, C>(
    game: &mut Game,
    renderer: &mut R,
    input: &mut I,
    audio: &mut dyn AudioSink,
    clock: &C,
) -> anyhow::Result<()>
where
    R: Renderer,
    I: InputSource,
    C: Clock,
{
    renderer.init()?;
    let tick = clock.tick_rate();
    let canvas = (game.config.canvas_width, game.config.canvas_height);
    let mut budget = tick;

    while !game.should_quit() {
        let started = clock.now();

        let snapshot = match input.poll(budget) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "input poll failed");
                InputSnapshot::default()
            }
        };
        let waited = clock.elapsed(started);
        if waited < budget {
            clock.sleep(budget - waited);
        }

        let work_started = clock.now();
        game.update(&snapshot, audio);
        if game.should_quit() {
            break;
        }
        if let Err(err) = renderer.draw(game) {
            warn!(%err, "render failed");
        }
        if let Some(viewport) = renderer.canvas_viewport() {
            input.set_viewport(viewport, canvas);
        }

        budget = tick.saturating_sub(clock.elapsed(work_started)).max(Duration::from_millis(1));
    }

    renderer.cleanup()?;
    info!(total_kills = game.total_kills(), "game loop finished");
    Ok(())
}
