// src/combat/src/dice.rs

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `count`d`faces` dice expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub count: u32,
    pub faces: u32,
}

impl Dice {
    pub const fn new(count: u32, faces: u32) -> Self {
        Self { count, faces }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        roll_dice(self.count, self.faces, rng)
    }

    /// Smallest and largest possible totals
    pub fn range(&self) -> (u32, u32) {
        if self.faces == 0 {
            return (0, 0);
        }
        (self.count, self.count * self.faces)
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.faces)
    }
}

/// Sum of `count` rolls of `1..=faces`; zero faces rolls nothing
pub fn roll_dice<R: Rng + ?Sized>(count: u32, faces: u32, rng: &mut R) -> u32 {
    if faces == 0 {
        return 0;
    }
    (0..count).map(|_| rng.random_range(1..=faces)).sum()
}

/// Base dice of the player's shot
pub const PLAYER_BASE_DICE: Dice = Dice::new(2, 6);
/// One extra die is added every this many player levels
pub const PLAYER_BONUS_DIE_EVERY: u32 = 3;

/// Dice the player rolls at `level`: the base dice plus one bonus die per
/// three levels.
pub fn player_dice(level: u32) -> Dice {
    Dice::new(
        PLAYER_BASE_DICE.count + level / PLAYER_BONUS_DIE_EVERY,
        PLAYER_BASE_DICE.faces,
    )
}

/// Player damage: `player_dice(level)` plus a flat bonus equal to the level
pub fn player_damage<R: Rng + ?Sized>(level: u32, rng: &mut R) -> u32 {
    player_dice(level).roll(rng) + level
}
