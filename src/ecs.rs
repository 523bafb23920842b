//! ECS world for one dungeon level.
//!
//! Enemies, bullets and potions live as components in a `hecs::World`; the
//! grid, the player and the per-tick bookkeeping are shared resources.

use combat::Enemy;
use dungeon::GridMap;
use hecs::World;
use hero::Player;
use items::{Bullet, Potion};
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::audio::SoundEffect;
use crate::input::InputSnapshot;

/// Main ECS world container
pub struct ECSWorld {
    pub world: World,
    pub resources: Resources,
}

impl ECSWorld {
    pub fn new(grid: GridMap, player: Player, depth: u32, seed: u64) -> Self {
        Self {
            world: World::new(),
            resources: Resources {
                grid,
                player,
                depth,
                kills: 0,
                rng: Pcg32::seed_from_u64(seed),
                pursue_out_of_sight: false,
                screen: (800.0, 600.0),
                input: InputSnapshot::default(),
                events: TickEvents::default(),
                ticks: 0,
            },
        }
    }

    /// Enemies still in the level, dying ones included
    pub fn enemy_count(&self) -> usize {
        self.world.query::<&Enemy>().iter().count()
    }

    /// Enemies that can still be shot
    pub fn living_enemy_count(&self) -> usize {
        self.world
            .query::<&Enemy>()
            .iter()
            .filter(|(_, e)| e.is_targetable())
            .count()
    }

    pub fn bullet_count(&self) -> usize {
        self.world.query::<&Bullet>().iter().count()
    }

    pub fn potion_count(&self) -> usize {
        self.world.query::<&Potion>().iter().count()
    }

    /// Copies of every enemy, in no particular order
    pub fn enemies(&self) -> Vec<Enemy> {
        self.world
            .query::<&Enemy>()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn bullets(&self) -> Vec<Bullet> {
        self.world.query::<&Bullet>().iter().map(|(_, b)| *b).collect()
    }

    pub fn potions(&self) -> Vec<Potion> {
        self.world.query::<&Potion>().iter().map(|(_, p)| *p).collect()
    }
}

/// Global resources that are shared across systems
pub struct Resources {
    pub grid: GridMap,
    pub player: Player,
    /// Dungeon level, starting at 1
    pub depth: u32,
    /// Kills on this level
    pub kills: u32,
    pub rng: Pcg32,
    pub pursue_out_of_sight: bool,
    /// Canvas size in pixels; maps click positions to view angles
    pub screen: (f32, f32),
    /// This tick's input
    pub input: InputSnapshot,
    /// What happened this tick
    pub events: TickEvents,
    pub ticks: u64,
}

/// Everything observable that happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickEvents {
    pub sounds: Vec<SoundEffect>,
    pub shots_fired: u32,
    pub enemy_shots: u32,
    pub enemies_hit: u32,
    pub enemies_killed: u32,
    pub xp_gained: u32,
    pub levels_gained: u32,
    pub damage_taken: u32,
    pub potions_picked: u32,
    /// HP restored by drinking a potion
    pub healed: Option<u32>,
}

impl TickEvents {
    pub fn sound(&mut self, effect: SoundEffect) {
        self.sounds.push(effect);
    }
}
