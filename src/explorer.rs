//! Timed 2D explorer: walk from the up stairs to the down stairs of a
//! freshly generated map before the countdown runs out. Also owns the
//! top-down map colours and the PNG export.

use anyhow::Context;
use dungeon::{CellKind, DungeonGenerator, GenerationError, GridMap, shortest_path};
use image::{Rgb as Pixel, RgbImage};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::path::Path;
use tracing::{debug, info};

use crate::config::Difficulty;
use crate::input::InputSnapshot;
use crate::renderer::Rgb;

/// Pixels per cell in exported maps
pub const MAP_CELL_SIZE: u32 = 10;
/// 起点和终点不连通时最多重新生成几次
const MAP_ATTEMPTS: u32 = 10;

pub const TARGET_COLOR: Rgb = [255, 0, 0];
pub const EXPLORER_COLOR: Rgb = [255, 255, 0];

pub fn cell_color(kind: CellKind) -> Rgb {
    match kind {
        CellKind::Empty => [0, 0, 0],
        CellKind::Room => [200, 200, 200],
        CellKind::Corridor => [100, 100, 255],
        CellKind::StairsUp => [0, 255, 0],
        CellKind::StairsDown => [255, 0, 0],
    }
}

/// Top-down picture of the grid, `cell_size` pixels per cell
pub fn map_image(grid: &GridMap, cell_size: u32) -> RgbImage {
    let cell_size = cell_size.max(1);
    let width = grid.width().max(0) as u32 * cell_size;
    let height = grid.height().max(0) as u32 * cell_size;
    RgbImage::from_fn(width, height, |px, py| {
        let kind = grid
            .cell((px / cell_size) as i32, (py / cell_size) as i32)
            .unwrap_or_default();
        Pixel(cell_color(kind))
    })
}

/// Write the map as an image; the format follows the file extension.
pub fn export_map(grid: &GridMap, path: &Path, cell_size: u32) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    map_image(grid, cell_size)
        .save(path)
        .with_context(|| format!("Failed to write map image {}", path.display()))?;
    info!(path = %path.display(), width = grid.width(), height = grid.height(), "map exported");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerOutcome {
    InProgress,
    /// Reached the target in time
    Won,
    TimeUp,
}

#[derive(Debug, Clone)]
pub struct Explorer {
    grid: GridMap,
    difficulty: Difficulty,
    player: (i32, i32),
    target: (i32, i32),
    ticks: u64,
    limit_ticks: u64,
    tick_rate: u32,
    move_repeat: u32,
    cooldown: u32,
    outcome: ExplorerOutcome,
}

impl Explorer {
    /// Generate a map with stairs for `difficulty`. Maps whose stairs are not
    /// connected are rerolled a few times before one is accepted anyway.
    pub fn generate(difficulty: Difficulty, tick_rate: u32, seed: u64) -> Result<Self, GenerationError> {
        let mut config = difficulty.generator_config();
        config.place_stairs = true;
        let generator = DungeonGenerator::new(config);
        let mut rng = Pcg32::seed_from_u64(seed);

        let mut attempt = 1;
        loop {
            let explorer = Self::from_grid(generator.generate(&mut rng)?, difficulty, tick_rate);
            if explorer.target_reachable() || attempt >= MAP_ATTEMPTS {
                debug!(attempt, start = ?explorer.player, target = ?explorer.target, "explorer map ready");
                return Ok(explorer);
            }
            attempt += 1;
        }
    }

    /// Start on the up stairs, aim for the down stairs. Without stairs the
    /// first and last room centres are used, then fixed fallbacks.
    pub fn from_grid(grid: GridMap, difficulty: Difficulty, tick_rate: u32) -> Self {
        let (w, h) = (grid.width(), grid.height());
        let (player, target) = match grid.stairs() {
            Some(stairs) => (stairs.up, stairs.down),
            None => {
                let rooms = grid.rooms();
                let start = rooms.first().map(|r| r.center()).unwrap_or((w / 2, h / 2));
                let target = match rooms {
                    [_, .., last] => last.center(),
                    _ => (w - 5, h - 5),
                };
                (start, target)
            }
        };

        let tick_rate = tick_rate.max(1);
        let limit_ticks = difficulty.explorer_time_limit().as_secs() * u64::from(tick_rate);
        Self {
            grid,
            difficulty,
            player,
            target,
            ticks: 0,
            limit_ticks,
            tick_rate,
            move_repeat: (tick_rate / 10).max(1),
            cooldown: 0,
            outcome: ExplorerOutcome::InProgress,
        }
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn player(&self) -> (i32, i32) {
        self.player
    }

    pub fn target(&self) -> (i32, i32) {
        self.target
    }

    pub fn outcome(&self) -> ExplorerOutcome {
        self.outcome
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whole seconds left, rounded down
    pub fn remaining_seconds(&self) -> u64 {
        self.limit_ticks.saturating_sub(self.ticks) / u64::from(self.tick_rate)
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.ticks as f32 / self.tick_rate as f32
    }

    pub fn target_reachable(&self) -> bool {
        self.player == self.target || !shortest_path(&self.grid, self.player, self.target).is_empty()
    }

    /// One tick. Held direction keys repeat every `tick_rate / 10` ticks.
    pub fn update(&mut self, input: &InputSnapshot) -> ExplorerOutcome {
        if self.outcome != ExplorerOutcome::InProgress {
            return self.outcome;
        }
        self.ticks += 1;

        if self.cooldown > 0 {
            self.cooldown -= 1;
        } else if let Some((dx, dy)) = direction(input) {
            if self.try_move(dx, dy) {
                self.cooldown = self.move_repeat;
            }
        }

        if self.player == self.target {
            self.outcome = ExplorerOutcome::Won;
        } else if self.ticks >= self.limit_ticks {
            self.outcome = ExplorerOutcome::TimeUp;
        }
        if self.outcome != ExplorerOutcome::InProgress {
            info!(
                outcome = ?self.outcome,
                difficulty = %self.difficulty,
                seconds = self.elapsed_seconds(),
                "explorer finished"
            );
        }
        self.outcome
    }

    /// 一次走一格；墙和地图外都走不过去
    fn try_move(&mut self, dx: i32, dy: i32) -> bool {
        let next = (self.player.0 + dx, self.player.1 + dy);
        if self.grid.is_wall_cell(next.0, next.1) {
            return false;
        }
        self.player = next;
        true
    }
}

/// 4 连通：同时按下时横向优先
fn direction(input: &InputSnapshot) -> Option<(i32, i32)> {
    let dx = (input.strafe_axis() + input.turn_axis()).clamp(-1.0, 1.0) as i32;
    let dy = -input.forward_axis() as i32;
    match (dx, dy) {
        (0, 0) => None,
        (0, dy) => Some((0, dy)),
        (dx, _) => Some((dx, 0)),
    }
}
