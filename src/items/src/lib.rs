//src/items/src/lib.rs
//! 地面上的药水与飞行中的子弹

pub use crate::bullet::{BULLET_HIT_BOX, BULLET_LIFE, BULLET_SPEED, Bullet, Owner};
pub use crate::potion::{HEAL_RANGE, PICKUP_BOX, Potion};

pub mod bullet;
pub mod potion;
