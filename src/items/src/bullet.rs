//src/items/src/bullet.rs
use combat::EnemyKind;
use dungeon::GridMap;
use serde::{Deserialize, Serialize};

pub const BULLET_SPEED: f32 = 0.3;
/// 子弹存活帧数
pub const BULLET_LIFE: u32 = 60;
/// 命中判定的半边长
pub const BULLET_HIT_BOX: f32 = 0.3;

/// 子弹归属；敌人子弹带上结算命中所需的种类和等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy(EnemyKind, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    /// 离地高度
    pub z: f32,
    pub angle: f32,
    pub z_velocity: f32,
    pub speed: f32,
    pub life: u32,
    pub owner: Owner,
}

impl Bullet {
    pub fn new(x: f32, y: f32, z: f32, angle: f32, z_velocity: f32, owner: Owner) -> Self {
        Self {
            x,
            y,
            z,
            angle,
            z_velocity,
            speed: BULLET_SPEED,
            life: BULLET_LIFE,
            owner,
        }
    }

    pub fn is_player_bullet(&self) -> bool {
        self.owner == Owner::Player
    }

    /// 前进一帧。返回 false 表示应当移除：撞墙、寿命耗尽或落到地面以下。
    pub fn advance(&mut self, grid: &GridMap) -> bool {
        self.x += self.angle.cos() * self.speed;
        self.y += self.angle.sin() * self.speed;
        self.z += self.z_velocity;
        self.life = self.life.saturating_sub(1);
        !grid.is_wall(self.x, self.y) && self.life > 0 && self.z >= 0.0
    }

    /// 是否击中位于 (x, y) 的目标（轴对齐方框）
    pub fn hits(&self, x: f32, y: f32) -> bool {
        (self.x - x).abs() < BULLET_HIT_BOX && (self.y - y).abs() < BULLET_HIT_BOX
    }
}
