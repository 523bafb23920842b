//! Level setup: generate the grid, then place the player, enemies and potions.

use combat::Enemy;
use dungeon::{DungeonGenerator, GenerationError, GeneratorConfig, GridMap, cell_of, shortest_path};
use hero::Player;
use items::Potion;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::ecs::ECSWorld;

/// Tries per entity before giving up on it
pub const PLACEMENT_ATTEMPTS: usize = 50;
/// Enemies placed anywhere on the map after the one-per-room pass
pub const EXTRA_ENEMIES: usize = 3;
pub const POTIONS_PER_LEVEL: usize = 6;
pub const MIN_PLAYER_DISTANCE: f32 = 5.0;
pub const MIN_ENEMY_DISTANCE: f32 = 2.0;
/// Room enemies need this many clear cells around them
pub const WALL_CLEARANCE: i32 = 2;

/// Build a fresh level. The same seed always produces the same level.
pub fn build_level(
    config: &GeneratorConfig,
    depth: u32,
    seed: u64,
) -> Result<ECSWorld, GenerationError> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let grid = DungeonGenerator::new(config.clone()).generate(&mut rng)?;

    let player = match grid.rooms().first() {
        Some(room) => Player::new((room.x + 1) as f32, (room.y + 1) as f32),
        None => Player::new(1.0, 1.0),
    };

    let mut placer = Placer::new(&grid, (player.x, player.y));
    let enemies = placer.place_enemies(depth, &mut rng);
    let potions = placer.place_potions(&enemies, &mut rng);

    info!(
        depth,
        rooms = grid.room_count(),
        enemies = enemies.len(),
        potions = potions.len(),
        "level generated"
    );

    let mut ecs = ECSWorld::new(grid, player, depth, rng.random());
    ecs.world.spawn_batch(enemies.into_iter().map(|e| (e,)));
    ecs.world.spawn_batch(potions.into_iter().map(|p| (p,)));
    Ok(ecs)
}

/// Placement rules shared by enemies and potions
struct Placer<'a> {
    grid: &'a GridMap,
    player: (f32, f32),
    spawn_cell: (i32, i32),
    reachable: HashMap<(i32, i32), bool>,
}

impl<'a> Placer<'a> {
    fn new(grid: &'a GridMap, player: (f32, f32)) -> Self {
        Self {
            grid,
            player,
            spawn_cell: cell_of(player.0, player.1),
            reachable: HashMap::new(),
        }
    }

    fn is_reachable(&mut self, cell: (i32, i32)) -> bool {
        if cell == self.spawn_cell {
            return true;
        }
        let grid = self.grid;
        let from = self.spawn_cell;
        *self
            .reachable
            .entry(cell)
            .or_insert_with(|| !shortest_path(grid, from, cell).is_empty())
    }

    fn near_wall(&self, x: i32, y: i32) -> bool {
        (-WALL_CLEARANCE..=WALL_CLEARANCE).any(|dx| {
            (-WALL_CLEARANCE..=WALL_CLEARANCE).any(|dy| self.grid.is_wall_cell(x + dx, y + dy))
        })
    }

    fn enemy_spot_ok(&mut self, x: i32, y: i32, placed: &[Enemy], check_walls: bool) -> bool {
        if !self.grid.in_bounds(x, y) || self.grid.is_wall_cell(x, y) {
            return false;
        }
        if check_walls && self.near_wall(x, y) {
            return false;
        }
        let (fx, fy) = (x as f32, y as f32);
        if distance((fx, fy), self.player) < MIN_PLAYER_DISTANCE {
            return false;
        }
        if placed
            .iter()
            .any(|e| distance((fx, fy), (e.x, e.y)) < MIN_ENEMY_DISTANCE)
        {
            return false;
        }
        self.is_reachable((x, y))
    }

    /// One enemy per room except the first, then a few anywhere
    fn place_enemies(&mut self, depth: u32, rng: &mut Pcg32) -> Vec<Enemy> {
        let mut enemies: Vec<Enemy> = Vec::new();
        let rooms = self.grid.rooms().to_vec();

        for room in rooms.iter().skip(1) {
            for _ in 0..PLACEMENT_ATTEMPTS {
                let x = rng.random_range(room.x..room.x + room.w);
                let y = rng.random_range(room.y..room.y + room.h);
                if self.enemy_spot_ok(x, y, &enemies, true) {
                    enemies.push(spawn_enemy(x, y, depth, rng));
                    break;
                }
            }
        }

        if let Some((xs, ys)) = interior(self.grid) {
            for _ in 0..EXTRA_ENEMIES {
                for _ in 0..PLACEMENT_ATTEMPTS {
                    let x = rng.random_range(xs.clone());
                    let y = rng.random_range(ys.clone());
                    if self.enemy_spot_ok(x, y, &enemies, false) {
                        enemies.push(spawn_enemy(x, y, depth, rng));
                        break;
                    }
                }
            }
        }

        enemies
    }

    fn place_potions(&mut self, enemies: &[Enemy], rng: &mut Pcg32) -> Vec<Potion> {
        let mut potions = Vec::new();
        let Some((xs, ys)) = interior(self.grid) else {
            return potions;
        };
        for _ in 0..POTIONS_PER_LEVEL {
            for _ in 0..PLACEMENT_ATTEMPTS {
                let x = rng.random_range(xs.clone());
                let y = rng.random_range(ys.clone());
                let (fx, fy) = (x as f32, y as f32);
                if self.grid.is_wall_cell(x, y) {
                    continue;
                }
                if !apart((fx, fy), self.player) {
                    continue;
                }
                if !enemies.iter().all(|e| apart((fx, fy), (e.x, e.y))) {
                    continue;
                }
                if !self.is_reachable((x, y)) {
                    continue;
                }
                potions.push(Potion::new(fx, fy, rng));
                break;
            }
        }
        potions
    }
}

fn spawn_enemy(x: i32, y: i32, depth: u32, rng: &mut Pcg32) -> Enemy {
    let mut enemy = Enemy::random(x as f32, y as f32, rng);
    enemy.scale_for_depth(depth);
    debug!(kind = %enemy.kind, x, y, hp = enemy.hp, "enemy placed");
    enemy
}

/// Cells `1..=w-2` by `1..=h-2`; `None` when the map has no interior
fn interior(
    grid: &GridMap,
) -> Option<(
    std::ops::RangeInclusive<i32>,
    std::ops::RangeInclusive<i32>,
)> {
    (grid.width() >= 3 && grid.height() >= 3)
        .then(|| (1..=grid.width() - 2, 1..=grid.height() - 2))
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// At least one cell apart on both axes
fn apart(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() >= 1.0 && (a.1 - b.1).abs() >= 1.0
}
