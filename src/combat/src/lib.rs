// src/combat/src/lib.rs
//! Dice combat, enemies and XP progression.

use rand::Rng;
use tracing::debug;

pub mod combatant;
pub mod dice;
pub mod enemy;
pub mod progression;

pub use crate::combatant::Combatant;
pub use crate::dice::{Dice, player_damage, player_dice, roll_dice};
pub use crate::enemy::{
    DamageOutcome, Enemy, EnemyContext, EnemyKind, EnemyShot, EnemyState, EnemyStats, Shooter,
};
pub use crate::progression::{HP_PER_LEVEL, Progression};

/// Upper clamp for any attack
pub const MAX_ACCURACY: i32 = 95;
/// Accuracy change per level of difference between attacker and defender
pub const ACCURACY_PER_LEVEL: i32 = 5;

/// Result of one attack roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Miss,
    Hit { damage: u32 },
}

impl AttackOutcome {
    pub fn damage(self) -> u32 {
        match self {
            AttackOutcome::Miss => 0,
            AttackOutcome::Hit { damage } => damage,
        }
    }

    pub fn is_hit(self) -> bool {
        matches!(self, AttackOutcome::Hit { .. })
    }
}

/// Resolves hit and damage rolls between two combatants
pub struct CombatResolver;

impl CombatResolver {
    /// Attacker accuracy adjusted by level difference and clamped to
    /// `[attacker.accuracy_floor(), 95]`.
    pub fn effective_accuracy<A: Combatant, D: Combatant>(attacker: &A, defender: &D) -> i32 {
        let diff = attacker.combat_level() as i64 - defender.combat_level() as i64;
        let adjusted = attacker.base_accuracy() as i64 + diff * ACCURACY_PER_LEVEL as i64;
        let floor = attacker.accuracy_floor();
        adjusted.clamp(floor as i64, MAX_ACCURACY as i64) as i32
    }

    /// Percentage roll `1..=100 <= accuracy`; a hit rolls the attacker's damage.
    pub fn resolve_attack<A, D, R>(attacker: &A, defender: &D, rng: &mut R) -> AttackOutcome
    where
        A: Combatant,
        D: Combatant,
        R: Rng + ?Sized,
    {
        if !attacker.is_alive() || !defender.is_alive() {
            return AttackOutcome::Miss;
        }
        let accuracy = Self::effective_accuracy(attacker, defender);
        let roll: i32 = rng.random_range(1..=100);
        let outcome = if roll <= accuracy {
            AttackOutcome::Hit {
                damage: attacker.roll_damage(rng),
            }
        } else {
            AttackOutcome::Miss
        };
        debug!(
            attacker = attacker.name(),
            defender = defender.name(),
            accuracy,
            roll,
            ?outcome,
            "attack resolved"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enemy::ENEMY_ACCURACY_FLOOR;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Minimal combatant with configurable numbers
    struct Dummy {
        level: u32,
        accuracy: i32,
        floor: i32,
        damage: u32,
    }

    impl Combatant for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }
        fn combat_level(&self) -> u32 {
            self.level
        }
        fn base_accuracy(&self) -> i32 {
            self.accuracy
        }
        fn accuracy_floor(&self) -> i32 {
            self.floor
        }
        fn roll_damage<R: Rng + ?Sized>(&self, _rng: &mut R) -> u32 {
            self.damage
        }
        fn is_alive(&self) -> bool {
            true
        }
    }

    fn dummy(level: u32, accuracy: i32, floor: i32) -> Dummy {
        Dummy {
            level,
            accuracy,
            floor,
            damage: 7,
        }
    }

    #[test]
    fn level_difference_shifts_accuracy() {
        let a = dummy(5, 60, 15);
        let d = dummy(2, 0, 10);
        assert_eq!(CombatResolver::effective_accuracy(&a, &d), 75);
        assert_eq!(CombatResolver::effective_accuracy(&d, &a), 10);
    }

    #[test]
    fn certain_hit_rolls_damage() {
        let mut rng = Pcg32::seed_from_u64(11);
        let a = dummy(30, 90, 15);
        let d = dummy(1, 0, 10);
        for _ in 0..50 {
            let outcome = CombatResolver::resolve_attack(&a, &d, &mut rng);
            // 95% cap: an occasional miss is allowed
            if outcome.is_hit() {
                assert_eq!(outcome.damage(), 7);
            }
        }
    }

    #[test]
    fn dead_defender_is_never_hit() {
        let mut rng = Pcg32::seed_from_u64(2);
        let a = dummy(1, 95, 15);
        let mut orc = Enemy::new(1.0, 1.0, EnemyKind::Orc);
        orc.take_damage(1000);
        assert_eq!(
            CombatResolver::resolve_attack(&a, &orc, &mut rng),
            AttackOutcome::Miss
        );
    }

    #[test]
    fn shooter_keeps_kind_accuracy() {
        let shooter = EnemyKind::Goblin.shooter(1);
        let target = dummy(1, 0, 15);
        assert_eq!(CombatResolver::effective_accuracy(&shooter, &target), 65);
        assert_eq!(shooter.name(), "goblin");
    }

    proptest! {
        #[test]
        fn enemy_accuracy_stays_clamped(
            a_level in 0u32..200,
            d_level in 0u32..200,
            base in -50i32..200,
        ) {
            let attacker = dummy(a_level, base, ENEMY_ACCURACY_FLOOR);
            let defender = dummy(d_level, 0, 15);
            let acc = CombatResolver::effective_accuracy(&attacker, &defender);
            prop_assert!((10..=95).contains(&acc));
        }

        #[test]
        fn player_accuracy_stays_clamped(
            a_level in 0u32..200,
            d_level in 0u32..200,
            base in -50i32..200,
        ) {
            let attacker = dummy(a_level, base, 15);
            let defender = dummy(d_level, 0, ENEMY_ACCURACY_FLOOR);
            let acc = CombatResolver::effective_accuracy(&attacker, &defender);
            prop_assert!((15..=95).contains(&acc));
        }
    }
}
