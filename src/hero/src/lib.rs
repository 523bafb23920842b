// src/hero/src/lib.rs
//! 第一人称玩家：移动、转向、射击、喝药与升级

mod player;

pub use self::player::{
    EYE_HEIGHT, MOVE_STEP, PLAYER_ACCURACY, PLAYER_ACCURACY_FLOOR, PLAYER_FOV, PLAYER_HP,
    ROTATE_STEP, SHOOT_COOLDOWN, SHOOT_FLASH, Player,
};
