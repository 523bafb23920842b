// src/combat/src/enemy.rs

use dungeon::{GridMap, cell_of, has_line_of_sight, shortest_path};
use rand::Rng;
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::combatant::Combatant;
use crate::dice::Dice;

/// 敌人在此距离内停下射击
pub const ATTACK_RANGE: f32 = 4.0;
/// 射击计时器超过该值时开火
pub const SHOOT_THRESHOLD: u32 = 120;
pub const SHOOT_ANIMATION_TICKS: u32 = 15;
pub const HIT_ANIMATION_TICKS: u32 = 10;
pub const DEATH_TICKS: u32 = 20;
/// 两个敌人之间的最小间距
pub const SEPARATION: f32 = 0.5;
pub const ENEMY_HEIGHT: f32 = 2.2;
pub const ENEMY_ACCURACY_FLOOR: i32 = 10;

/// 每深一层，生命与经验增加 1/5
const DEPTH_SCALING_DIVISOR: u32 = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum EnemyKind {
    Goblin,
    Skeleton,
    Orc,
    Troll,
}

/// 敌人种类的基础数值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub max_hp: u32,
    pub damage: Dice,
    pub accuracy: i32,
    pub xp_value: u32,
    pub speed: f32,
    pub level: u32,
}

impl EnemyKind {
    pub fn stats(self) -> EnemyStats {
        match self {
            EnemyKind::Goblin => EnemyStats {
                max_hp: 30,
                damage: Dice::new(3, 6),
                accuracy: 65,
                xp_value: 20,
                speed: 0.12,
                level: 1,
            },
            EnemyKind::Skeleton => EnemyStats {
                max_hp: 45,
                damage: Dice::new(3, 8),
                accuracy: 60,
                xp_value: 30,
                speed: 0.10,
                level: 1,
            },
            EnemyKind::Orc => EnemyStats {
                max_hp: 60,
                damage: Dice::new(4, 6),
                accuracy: 70,
                xp_value: 45,
                speed: 0.10,
                level: 2,
            },
            EnemyKind::Troll => EnemyStats {
                max_hp: 90,
                damage: Dice::new(4, 8),
                accuracy: 55,
                xp_value: 70,
                speed: 0.08,
                level: 3,
            },
        }
    }

    /// 随机选择一个种类
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        EnemyKind::iter().choose(rng).unwrap_or(EnemyKind::Orc)
    }

    /// 子弹落地时用来结算的攻击者
    pub fn shooter(self, level: u32) -> Shooter {
        Shooter { kind: self, level }
    }
}

/// 已射出子弹的敌人（可能已死亡）的战斗属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shooter {
    pub kind: EnemyKind,
    pub level: u32,
}

impl Combatant for Shooter {
    fn name(&self) -> &str {
        <&'static str>::from(self.kind)
    }

    fn combat_level(&self) -> u32 {
        self.level
    }

    fn base_accuracy(&self) -> i32 {
        self.kind.stats().accuracy
    }

    fn accuracy_floor(&self) -> i32 {
        ENEMY_ACCURACY_FLOOR
    }

    fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.kind.stats().damage.roll(rng)
    }

    fn is_alive(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnemyState {
    /// 看得见玩家但不在射程内，靠近
    Approach,
    /// 射程内，累积射击计时
    Attack,
    /// 看不见玩家，只播放动画
    #[default]
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    Survived,
    Killed,
    AlreadyDead,
}

/// 敌人开火请求；由模拟循环生成子弹
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyShot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
}

/// 一次更新需要的外部信息
#[derive(Debug, Clone, Copy)]
pub struct EnemyContext<'a> {
    pub player: (f32, f32),
    pub grid: &'a GridMap,
    /// 其它存活敌人的位置（不含自己）
    pub others: &'a [(f32, f32)],
    /// 看不见玩家时沿 A* 路径追击
    pub pursue_out_of_sight: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub kind: EnemyKind,
    pub hp: u32,
    pub max_hp: u32,
    pub level: u32,
    pub xp_value: u32,
    pub damage: Dice,
    pub accuracy: i32,
    pub speed: f32,
    pub height: f32,
    pub state: EnemyState,
    pub shoot_timer: u32,
    pub shoot_animation: u32,
    pub hit_animation: u32,
    death_countdown: Option<u32>,
    depth: u32,
}

impl Enemy {
    pub fn new(x: f32, y: f32, kind: EnemyKind) -> Self {
        let stats = kind.stats();
        Self {
            x,
            y,
            z: 0.0,
            kind,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            level: stats.level,
            xp_value: stats.xp_value,
            damage: stats.damage,
            accuracy: stats.accuracy,
            speed: stats.speed,
            height: ENEMY_HEIGHT,
            state: EnemyState::Idle,
            shoot_timer: 0,
            shoot_animation: 0,
            hit_animation: 0,
            death_countdown: None,
            depth: 1,
        }
    }

    pub fn random<R: Rng + ?Sized>(x: f32, y: f32, rng: &mut R) -> Self {
        Self::new(x, y, EnemyKind::random(rng))
    }

    /// 按地牢深度放大生命、等级和经验值。
    ///
    /// 只在放置时调用一次；重复调用不会叠加。
    pub fn scale_for_depth(&mut self, depth: u32) {
        if self.depth != 1 || depth <= 1 {
            return;
        }
        let extra = depth - 1;
        let scale = |v: u32| v * (DEPTH_SCALING_DIVISOR + extra) / DEPTH_SCALING_DIVISOR;
        self.max_hp = scale(self.max_hp);
        self.hp = self.max_hp;
        self.level += extra;
        self.xp_value = scale(self.xp_value);
        self.depth = depth;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// 正在播放死亡动画
    pub fn is_dying(&self) -> bool {
        self.death_countdown.is_some()
    }

    pub fn death_countdown(&self) -> Option<u32> {
        self.death_countdown
    }

    /// 可以被子弹选中
    pub fn is_targetable(&self) -> bool {
        self.hp > 0 && !self.is_dying()
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt()
    }

    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if !self.is_targetable() {
            return DamageOutcome::AlreadyDead;
        }
        self.hp = self.hp.saturating_sub(amount);
        self.hit_animation = HIT_ANIMATION_TICKS;
        if self.hp == 0 {
            self.death_countdown = Some(DEATH_TICKS);
            self.state = EnemyState::Idle;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Survived
        }
    }

    /// 推进死亡倒计时；返回 true 表示可以移除
    pub fn tick_death(&mut self) -> bool {
        match self.death_countdown {
            Some(0) => true,
            Some(n) => {
                self.death_countdown = Some(n - 1);
                n == 1
            }
            None => false,
        }
    }

    /// 一帧的 AI：靠近、射击或待机。
    ///
    /// Sight is sampled from the player towards the enemy, the same way the
    /// renderer culls sprites. Animations only count down while idle or
    /// approaching; an enemy in attack range holds its flashes.
    pub fn update(&mut self, ctx: &EnemyContext<'_>) -> Option<EnemyShot> {
        if !self.is_targetable() {
            return None;
        }

        let (px, py) = ctx.player;
        let distance = self.distance_to(px, py);

        if !has_line_of_sight(ctx.player, (self.x, self.y), ctx.grid) {
            self.state = EnemyState::Idle;
            if ctx.pursue_out_of_sight {
                self.pursue(ctx);
            }
            self.tick_animations();
            return None;
        }

        if distance > ATTACK_RANGE {
            self.state = EnemyState::Approach;
            let dir = ((px - self.x) / distance, (py - self.y) / distance);
            self.try_step(dir, ctx);
            self.tick_animations();
            return None;
        }

        self.state = EnemyState::Attack;
        self.shoot_timer += 1;
        if self.shoot_timer <= SHOOT_THRESHOLD {
            return None;
        }
        self.shoot_timer = 0;
        self.shoot_animation = SHOOT_ANIMATION_TICKS;
        Some(EnemyShot {
            x: self.x,
            y: self.y,
            z: self.z + self.height / 2.0,
            angle: (py - self.y).atan2(px - self.x),
        })
    }

    fn tick_animations(&mut self) {
        self.shoot_animation = self.shoot_animation.saturating_sub(1);
        self.hit_animation = self.hit_animation.saturating_sub(1);
    }

    /// 沿单位方向走一步；撞墙或与其它敌人重叠时放弃
    fn try_step(&mut self, dir: (f32, f32), ctx: &EnemyContext<'_>) -> bool {
        let nx = self.x + dir.0 * self.speed;
        let ny = self.y + dir.1 * self.speed;
        if ctx.grid.is_wall(nx, ny) {
            return false;
        }
        let crowded = ctx
            .others
            .iter()
            .any(|&(ox, oy)| ((nx - ox).powi(2) + (ny - oy).powi(2)).sqrt() < SEPARATION);
        if crowded {
            return false;
        }
        self.x = nx;
        self.y = ny;
        true
    }

    fn pursue(&mut self, ctx: &EnemyContext<'_>) {
        let path = shortest_path(ctx.grid, cell_of(self.x, self.y), cell_of(ctx.player.0, ctx.player.1));
        let Some(&(cx, cy)) = path.first() else {
            return;
        };
        let (tx, ty) = (cx as f32 + 0.5, cy as f32 + 0.5);
        let distance = self.distance_to(tx, ty);
        if distance <= f32::EPSILON {
            return;
        }
        if self.try_step(((tx - self.x) / distance, (ty - self.y) / distance), ctx) {
            self.state = EnemyState::Approach;
        }
    }
}

impl Combatant for Enemy {
    fn name(&self) -> &str {
        <&'static str>::from(self.kind)
    }

    fn combat_level(&self) -> u32 {
        self.level
    }

    fn base_accuracy(&self) -> i32 {
        self.accuracy
    }

    fn accuracy_floor(&self) -> i32 {
        ENEMY_ACCURACY_FLOOR
    }

    fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.damage.roll(rng)
    }

    fn is_alive(&self) -> bool {
        self.is_targetable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon::Room;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::str::FromStr;

    fn open_room() -> GridMap {
        let mut grid = GridMap::new(20, 20);
        grid.try_add_room(Room::new(1, 1, 18, 18));
        grid
    }

    fn ctx<'a>(grid: &'a GridMap, player: (f32, f32), others: &'a [(f32, f32)]) -> EnemyContext<'a> {
        EnemyContext {
            player,
            grid,
            others,
            pursue_out_of_sight: false,
        }
    }

    #[test]
    fn kind_names_are_lowercase() {
        assert_eq!(EnemyKind::Troll.to_string(), "troll");
        assert_eq!(EnemyKind::from_str("goblin"), Ok(EnemyKind::Goblin));
        assert!(EnemyKind::from_str("dragon").is_err());
        assert_eq!(EnemyKind::iter().count(), 4);
    }

    #[test]
    fn lethal_damage_kills_and_clamps() {
        let mut enemy = Enemy::new(5.0, 5.0, EnemyKind::Goblin);
        enemy.hp = 1;
        assert_eq!(enemy.take_damage(5), DamageOutcome::Killed);
        assert_eq!(enemy.hp, 0);
        assert_eq!(enemy.death_countdown(), Some(DEATH_TICKS));
        assert!(!enemy.is_targetable());
        assert_eq!(enemy.take_damage(5), DamageOutcome::AlreadyDead);
    }

    #[test]
    fn death_countdown_reaches_removal() {
        let mut enemy = Enemy::new(5.0, 5.0, EnemyKind::Orc);
        enemy.take_damage(1000);
        let ticks = std::iter::repeat_with(|| enemy.tick_death())
            .take_while(|done| !done)
            .count();
        assert_eq!(ticks as u32, DEATH_TICKS - 1);
        assert!(enemy.tick_death());
    }

    #[test]
    fn dead_enemy_does_not_act() {
        let grid = open_room();
        let mut enemy = Enemy::new(3.0, 3.0, EnemyKind::Orc);
        enemy.take_damage(1000);
        enemy.shoot_timer = SHOOT_THRESHOLD;
        assert!(enemy.update(&ctx(&grid, (4.0, 3.0), &[])).is_none());
        assert_eq!((enemy.x, enemy.y), (3.0, 3.0));
    }

    #[test]
    fn approaches_when_out_of_range() {
        let grid = open_room();
        let mut enemy = Enemy::new(2.5, 5.0, EnemyKind::Skeleton);
        enemy.update(&ctx(&grid, (12.5, 5.0), &[]));
        assert_eq!(enemy.state, EnemyState::Approach);
        assert!((enemy.x - 2.6).abs() < 1e-5);
        assert!((enemy.y - 5.0).abs() < 1e-5);
    }

    #[test]
    fn blocked_by_neighbour() {
        let grid = open_room();
        let mut enemy = Enemy::new(2.5, 5.0, EnemyKind::Skeleton);
        let others = [(2.9, 5.0)];
        enemy.update(&ctx(&grid, (12.5, 5.0), &others));
        assert_eq!((enemy.x, enemy.y), (2.5, 5.0));
    }

    #[test]
    fn fires_after_threshold_in_range() {
        let grid = open_room();
        let mut enemy = Enemy::new(5.0, 5.0, EnemyKind::Goblin);
        let player = (7.0, 5.0);
        let shots: Vec<_> = (0..=SHOOT_THRESHOLD)
            .filter_map(|_| enemy.update(&ctx(&grid, player, &[])))
            .collect();
        assert_eq!(shots.len(), 1);
        let shot = shots[0];
        assert!((shot.z - ENEMY_HEIGHT / 2.0).abs() < 1e-6);
        assert!(shot.angle.abs() < 1e-6);
        assert_eq!(enemy.shoot_timer, 0);
        assert_eq!(enemy.shoot_animation, SHOOT_ANIMATION_TICKS);
        assert_eq!(enemy.state, EnemyState::Attack);
    }

    #[test]
    fn attacking_enemy_holds_its_flashes() {
        let grid = open_room();
        let mut enemy = Enemy::new(5.0, 5.0, EnemyKind::Goblin);
        let player = (7.0, 5.0);
        enemy.shoot_timer = SHOOT_THRESHOLD;
        enemy.hit_animation = 4;
        assert!(enemy.update(&ctx(&grid, player, &[])).is_some());
        assert_eq!(enemy.hit_animation, 4);
        assert_eq!(enemy.shoot_animation, SHOOT_ANIMATION_TICKS);

        assert!(enemy.update(&ctx(&grid, player, &[])).is_none());
        assert_eq!(enemy.state, EnemyState::Attack);
        assert_eq!(enemy.hit_animation, 4);
        assert_eq!(enemy.shoot_animation, SHOOT_ANIMATION_TICKS);

        // 玩家退出射程后才继续倒计时
        enemy.update(&ctx(&grid, (15.0, 5.0), &[]));
        assert_eq!(enemy.state, EnemyState::Approach);
        assert_eq!(enemy.hit_animation, 3);
        assert_eq!(enemy.shoot_animation, SHOOT_ANIMATION_TICKS - 1);
    }

    #[test]
    fn approaching_enemy_fades_its_flashes() {
        let grid = open_room();
        let mut enemy = Enemy::new(2.5, 5.0, EnemyKind::Skeleton);
        enemy.hit_animation = 2;
        enemy.update(&ctx(&grid, (15.0, 5.0), &[]));
        assert_eq!(enemy.state, EnemyState::Approach);
        assert_eq!(enemy.hit_animation, 1);
    }

    #[test]
    fn sight_is_sampled_from_the_player() {
        // 玩家站在走廊口，采样方向不同结果可能不同；AI 必须与渲染一致
        let mut grid = GridMap::new(20, 10);
        grid.try_add_room(Room::new(1, 1, 5, 5));
        grid.try_add_room(Room::new(10, 1, 5, 5));
        grid.carve_corridor((3, 3), (12, 3));
        let player = (12.5, 3.5);
        for (x, y) in [(3.5, 3.5), (4.9, 2.2), (2.1, 4.8), (11.0, 1.4)] {
            let mut enemy = Enemy::new(x, y, EnemyKind::Orc);
            enemy.update(&ctx(&grid, player, &[]));
            let visible = has_line_of_sight(player, (x, y), &grid);
            assert_eq!(enemy.state != EnemyState::Idle, visible, "enemy at ({x}, {y})");
        }
    }

    #[test]
    fn idle_without_line_of_sight() {
        let mut grid = GridMap::new(20, 10);
        grid.try_add_room(Room::new(1, 1, 5, 5));
        grid.try_add_room(Room::new(10, 1, 5, 5));
        let mut enemy = Enemy::new(3.5, 3.5, EnemyKind::Troll);
        enemy.update(&ctx(&grid, (12.5, 3.5), &[]));
        assert_eq!(enemy.state, EnemyState::Idle);
        assert_eq!((enemy.x, enemy.y), (3.5, 3.5));
    }

    #[test]
    fn pursuit_follows_corridor_when_enabled() {
        let mut grid = GridMap::new(20, 10);
        grid.try_add_room(Room::new(1, 1, 5, 5));
        grid.try_add_room(Room::new(10, 1, 5, 5));
        grid.carve_corridor((3, 3), (12, 3));
        // 挡住直线视野
        let mut enemy = Enemy::new(3.5, 1.5, EnemyKind::Goblin);
        let player = (12.5, 5.5);
        assert!(!has_line_of_sight(player, (enemy.x, enemy.y), &grid));
        let mut c = ctx(&grid, player, &[]);
        c.pursue_out_of_sight = true;
        let before = enemy.distance_to(player.0, player.1);
        for _ in 0..10 {
            enemy.update(&c);
        }
        assert!(enemy.distance_to(player.0, player.1) < before);
        assert!(!grid.is_wall(enemy.x, enemy.y));
    }

    #[test]
    fn depth_scaling_applies_once() {
        let mut enemy = Enemy::new(1.0, 1.0, EnemyKind::Orc);
        enemy.scale_for_depth(3);
        assert_eq!(enemy.max_hp, 84);
        assert_eq!(enemy.hp, 84);
        assert_eq!(enemy.level, 4);
        assert_eq!(enemy.xp_value, 63);
        enemy.scale_for_depth(3);
        assert_eq!(enemy.max_hp, 84);
        assert_eq!(enemy.depth(), 3);
    }

    #[test]
    fn random_kind_is_seeded() {
        let mut a = Pcg32::seed_from_u64(3);
        let mut b = Pcg32::seed_from_u64(3);
        let kinds_a: Vec<_> = (0..20).map(|_| EnemyKind::random(&mut a)).collect();
        let kinds_b: Vec<_> = (0..20).map(|_| EnemyKind::random(&mut b)).collect();
        assert_eq!(kinds_a, kinds_b);
    }
}
