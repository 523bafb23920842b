//src/items/src/potion.rs
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// 治疗量范围
pub const HEAL_RANGE: RangeInclusive<u32> = 20..=40;
/// 拾取判定的半边长
pub const PICKUP_BOX: f32 = 0.5;

/// 地上的治疗药水
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Potion {
    pub x: f32,
    pub y: f32,
    /// Rolled at spawn and only reported on pickup. The hero carries potions
    /// as a plain count (that is what saves store), so the amount actually
    /// restored is rolled again from `HEAL_RANGE` when one is drunk.
    pub heal_amount: u32,
}

impl Potion {
    pub fn new<R: Rng + ?Sized>(x: f32, y: f32, rng: &mut R) -> Self {
        Self {
            x,
            y,
            heal_amount: rng.random_range(HEAL_RANGE),
        }
    }

    /// 玩家是否站在可拾取范围内（轴对齐方框）
    pub fn in_pickup_range(&self, x: f32, y: f32) -> bool {
        (self.x - x).abs() < PICKUP_BOX && (self.y - y).abs() < PICKUP_BOX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn heal_amount_in_range() {
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..100 {
            let p = Potion::new(1.0, 1.0, &mut rng);
            assert!(HEAL_RANGE.contains(&p.heal_amount));
        }
    }

    #[test]
    fn pickup_box_is_square() {
        let p = Potion {
            x: 5.0,
            y: 5.0,
            heal_amount: 30,
        };
        assert!(p.in_pickup_range(5.4, 4.6));
        assert!(!p.in_pickup_range(5.6, 5.0));
        // 对角线距离 > 0.5 但仍在方框内
        assert!(p.in_pickup_range(5.45, 5.45));
    }
}
