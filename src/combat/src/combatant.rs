// src/combat/src/combatant.rs

use rand::Rng;

/// 可以参加战斗的活体
pub trait Combatant {
    /// 名称（用于战斗日志）
    fn name(&self) -> &str;

    /// 战斗等级，参与命中率的等级差修正
    fn combat_level(&self) -> u32;

    /// 基础命中率（百分比）
    fn base_accuracy(&self) -> i32;

    /// 命中率下限：敌人 10，玩家 15
    fn accuracy_floor(&self) -> i32;

    /// 掷一次伤害骰
    fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> u32;

    /// 是否存活
    fn is_alive(&self) -> bool;
}
