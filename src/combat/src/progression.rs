// src/combat/src/progression.rs

use serde::{Deserialize, Serialize};

/// Max HP gained per level
pub const HP_PER_LEVEL: u32 = 25;
/// XP needed to go from level 1 to level 2
pub const FIRST_THRESHOLD: u32 = 100;
/// Each threshold is the previous one times this, truncated
pub const THRESHOLD_GROWTH: f64 = 1.5;

/// Level / XP bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub xp: u32,
    pub xp_to_next_level: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_to_next_level: FIRST_THRESHOLD,
        }
    }
}

impl Progression {
    /// Add XP and consume as many thresholds as it covers.
    ///
    /// Returns how many levels were gained; one grant may cross several.
    pub fn grant(&mut self, amount: u32) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        let mut gained = 0;
        while self.xp_to_next_level > 0 && self.xp >= self.xp_to_next_level {
            self.xp -= self.xp_to_next_level;
            self.level += 1;
            self.xp_to_next_level = (self.xp_to_next_level as f64 * THRESHOLD_GROWTH) as u32;
            gained += 1;
        }
        gained
    }

    /// Fraction of the way to the next level, for the XP bar
    pub fn fraction(&self) -> f32 {
        if self.xp_to_next_level == 0 {
            return 0.0;
        }
        (self.xp as f32 / self.xp_to_next_level as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_grant_can_cross_several_levels() {
        let mut p = Progression::default();
        assert_eq!(p.grant(250), 2);
        assert_eq!(p.level, 3);
        assert_eq!(p.xp, 0);
        assert_eq!(p.xp_to_next_level, 225);
    }

    #[test]
    fn remainder_carries_over() {
        let mut p = Progression::default();
        assert_eq!(p.grant(130), 1);
        assert_eq!((p.level, p.xp, p.xp_to_next_level), (2, 30, 150));
        assert_eq!(p.grant(119), 0);
        assert_eq!(p.grant(1), 1);
        assert_eq!((p.level, p.xp, p.xp_to_next_level), (3, 0, 225));
    }

    #[test]
    fn threshold_growth_truncates() {
        let mut p = Progression {
            level: 3,
            xp: 0,
            xp_to_next_level: 225,
        };
        p.grant(225);
        assert_eq!(p.xp_to_next_level, 337);
    }
}
