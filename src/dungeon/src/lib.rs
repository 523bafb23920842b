//src/dungeon/src/lib.rs
//! 地牢：占用网格、随机房间生成、A* 寻路与视线检测

pub mod generator;
pub mod grid;
pub mod pathfinding;
pub mod room;

pub use crate::generator::{DungeonGenerator, GenerationError, GeneratorConfig, generate};
pub use crate::grid::{CellKind, GridMap, Stairs};
pub use crate::pathfinding::{has_line_of_sight, shortest_path};
pub use crate::room::Room;

/// 连续坐标所在的格子
pub fn cell_of(x: f32, y: f32) -> (i32, i32) {
    (x.floor() as i32, y.floor() as i32)
}
