// src/hero/src/player.rs

use combat::{Combatant, Progression, player_damage, progression::HP_PER_LEVEL};
use dungeon::GridMap;
use items::{BULLET_SPEED, Bullet, HEAL_RANGE, Owner};
use rand::Rng;
use raycast::{Viewpoint, cast_default};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::info;

pub const PLAYER_HP: u32 = 250;
pub const EYE_HEIGHT: f32 = 2.0;
pub const PLAYER_FOV: f32 = PI / 3.0;
/// 每次移动输入乘上的步长
pub const MOVE_STEP: f32 = 0.1;
/// 每帧转向弧度
pub const ROTATE_STEP: f32 = 0.05;
pub const SHOOT_COOLDOWN: u32 = 30;
pub const SHOOT_FLASH: u32 = 8;
pub const PLAYER_ACCURACY: i32 = 80;
pub const PLAYER_ACCURACY_FLOOR: i32 = 15;

/// 肩膀比眼睛低多少（子弹出膛高度）
const SHOULDER_DROP: f32 = 0.2;
/// 屏幕垂直偏移到目标高度的灵敏度
const VERTICAL_AIM_SENSITIVITY: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub angle: f32,
    pub fov: f32,
    pub eye_height: f32,
    pub hp: u32,
    pub max_hp: u32,
    pub progression: Progression,
    pub potions: u32,
    pub shoot_cooldown: u32,
    pub shoot_flash: u32,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            angle: 0.0,
            fov: PLAYER_FOV,
            eye_height: EYE_HEIGHT,
            hp: PLAYER_HP,
            max_hp: PLAYER_HP,
            progression: Progression::default(),
            potions: 0,
            shoot_cooldown: 0,
            shoot_flash: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.progression.level
    }

    pub fn viewpoint(&self) -> Viewpoint {
        Viewpoint {
            x: self.x,
            y: self.y,
            angle: self.angle,
            fov: self.fov,
        }
    }

    /// 尝试移动 `MOVE_STEP * (dx, dy)`；目标点是墙则原地不动。
    ///
    /// 两个轴一起判定：斜向撞进墙角会被整体拒绝。
    pub fn move_by(&mut self, dx: f32, dy: f32, grid: &GridMap) -> bool {
        let nx = self.x + dx * MOVE_STEP;
        let ny = self.y + dy * MOVE_STEP;
        if grid.is_wall(nx, ny) {
            return false;
        }
        self.x = nx;
        self.y = ny;
        true
    }

    /// 前进/后退（`forward` 为 ±1）与左右平移（`strafe` 为 ±1）
    pub fn walk(&mut self, forward: f32, strafe: f32, grid: &GridMap) {
        if forward != 0.0 {
            self.move_by(
                self.angle.cos() * forward,
                self.angle.sin() * forward,
                grid,
            );
        }
        if strafe != 0.0 {
            let side = self.angle + PI / 2.0;
            self.move_by(side.cos() * strafe, side.sin() * strafe, grid);
        }
    }

    pub fn rotate(&mut self, delta: f32) {
        self.angle += delta;
    }

    /// 每帧的计时器递减
    pub fn update(&mut self) {
        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);
        self.shoot_flash = self.shoot_flash.saturating_sub(1);
    }

    pub fn can_shoot(&self) -> bool {
        self.shoot_cooldown == 0
    }

    /// 朝屏幕上的 `aim` 像素开火。
    ///
    /// 水平角度由点击列决定；垂直方向由点击行相对屏幕中心的偏移换算成目标高度，
    /// 再按到墙的距离算出每帧的垂直速度。
    pub fn shoot(&mut self, aim: (f32, f32), screen: (f32, f32), grid: &GridMap) -> Option<Bullet> {
        if !self.can_shoot() {
            return None;
        }
        let (screen_w, screen_h) = screen;
        let angle = self.viewpoint().column_angle(aim.0, screen_w);
        self.shoot_cooldown = SHOOT_COOLDOWN;
        self.shoot_flash = SHOOT_FLASH;

        let shoulder = self.eye_height - SHOULDER_DROP;
        let center_y = (screen_h / 2.0).floor();
        let vertical_offset = if center_y > 0.0 {
            (aim.1 - center_y) / center_y
        } else {
            0.0
        };
        let target = shoulder - vertical_offset * VERTICAL_AIM_SENSITIVITY;

        let distance = cast_default((self.x, self.y), angle, grid).distance;
        let z_velocity = if distance > 0.0 {
            (target - shoulder) / (distance / BULLET_SPEED)
        } else {
            0.0
        };

        Some(Bullet::new(self.x, self.y, shoulder, angle, z_velocity, Owner::Player))
    }

    /// 扣血，最低到 0
    pub fn take_damage(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(amount);
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// 喝一瓶药：没有药或满血时什么都不做。返回实际恢复量。
    pub fn use_potion<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<u32> {
        if self.potions == 0 || self.hp >= self.max_hp {
            return None;
        }
        self.potions -= 1;
        let before = self.hp;
        self.hp = (self.hp + rng.random_range(HEAL_RANGE)).min(self.max_hp);
        Some(self.hp - before)
    }

    /// 获得经验，返回升了几级。每级 +25 最大生命并回满血。
    pub fn gain_xp(&mut self, amount: u32) -> u32 {
        let levels = self.progression.grant(amount);
        if levels > 0 {
            self.max_hp += HP_PER_LEVEL * levels;
            self.hp = self.max_hp;
            info!(level = self.progression.level, max_hp = self.max_hp, "player levelled up");
        }
        levels
    }
}

impl Combatant for Player {
    fn name(&self) -> &str {
        "player"
    }

    fn combat_level(&self) -> u32 {
        self.progression.level
    }

    fn base_accuracy(&self) -> i32 {
        PLAYER_ACCURACY
    }

    fn accuracy_floor(&self) -> i32 {
        PLAYER_ACCURACY_FLOOR
    }

    fn roll_damage<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        player_damage(self.progression.level, rng)
    }

    fn is_alive(&self) -> bool {
        !self.is_dead()
    }
}
