// src/dungeon/src/grid.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::room::Room;

/// 单个格子的类型
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Empty,
    Room,
    Corridor,
    StairsUp,
    StairsDown,
}

impl CellKind {
    /// 只有空格子是墙
    pub fn is_wall(self) -> bool {
        matches!(self, CellKind::Empty)
    }

    pub fn symbol(self) -> char {
        match self {
            CellKind::Empty => ' ',
            CellKind::Room => '.',
            CellKind::Corridor => '#',
            CellKind::StairsUp => '<',
            CellKind::StairsDown => '>',
        }
    }
}

/// 楼梯标记（非战斗版本使用）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stairs {
    pub up: (i32, i32),
    pub down: (i32, i32),
}

/// 占用网格，拥有房间列表和墙体查询
///
/// 生成完成后只读；唯一的修改途径是 `try_add_room`、`carve_corridor`
/// 和 `place_stairs`，三者共同维护以下不变量：
/// - 房间两两不重叠
/// - 走廊只覆盖空格子，从不覆盖房间格子
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMap {
    width: i32,
    height: i32,
    cells: Vec<CellKind>,
    rooms: Vec<Room>,
    connections: Vec<((i32, i32), (i32, i32))>,
    stairs: Option<Stairs>,
}

impl GridMap {
    /// 创建全空（全墙）的网格
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![CellKind::Empty; (width * height) as usize],
            rooms: Vec::new(),
            connections: Vec::new(),
            stairs: None,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// 已挖掘走廊的房间中心对
    pub fn connections(&self) -> &[((i32, i32), (i32, i32))] {
        &self.connections
    }

    pub fn stairs(&self) -> Option<Stairs> {
        self.stairs
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y).then(|| (y * self.width + x) as usize)
    }

    pub fn cell(&self, x: i32, y: i32) -> Option<CellKind> {
        self.index(x, y).map(|i| self.cells[i])
    }

    fn set(&mut self, x: i32, y: i32, kind: CellKind) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = kind;
        }
    }

    /// 整数格子的墙体查询，越界视为墙
    pub fn is_wall_cell(&self, x: i32, y: i32) -> bool {
        self.cell(x, y).is_none_or(CellKind::is_wall)
    }

    /// 连续坐标的墙体查询（向下取整到格子）
    pub fn is_wall(&self, x: f32, y: f32) -> bool {
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return true;
        }
        self.is_wall_cell(x.floor() as i32, y.floor() as i32)
    }

    /// 添加房间；越界或与已有房间重叠时拒绝并返回 false
    pub fn try_add_room(&mut self, room: Room) -> bool {
        if room.w <= 0 || room.h <= 0 {
            return false;
        }
        let fits = self.in_bounds(room.x, room.y)
            && self.in_bounds(room.x + room.w - 1, room.y + room.h - 1);
        if !fits || self.rooms.iter().any(|r| r.intersects(&room)) {
            return false;
        }
        for (x, y) in room.cells() {
            self.set(x, y, CellKind::Room);
        }
        self.rooms.push(room);
        true
    }

    /// 在两点之间挖掘 L 形走廊：先在起点的 y 上水平延伸，再在终点的 x 上垂直延伸
    ///
    /// 只有空格子会被改写为走廊。返回实际被挖开的格子。
    pub fn carve_corridor(&mut self, from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
        let (ax, ay) = from;
        let (bx, by) = to;
        let mut carved = Vec::new();

        for x in ax.min(bx)..=ax.max(bx) {
            if self.cell(x, ay) == Some(CellKind::Empty) {
                self.set(x, ay, CellKind::Corridor);
                carved.push((x, ay));
            }
        }
        for y in ay.min(by)..=ay.max(by) {
            if self.cell(bx, y) == Some(CellKind::Empty) {
                self.set(bx, y, CellKind::Corridor);
                carved.push((bx, y));
            }
        }

        self.connections.push((from, to));
        carved
    }

    /// 在两个不同房间的中心放置上下楼梯
    pub fn place_stairs(&mut self, up_room: usize, down_room: usize) -> Option<Stairs> {
        if up_room == down_room {
            return None;
        }
        let up = self.rooms.get(up_room)?.center();
        let down = self.rooms.get(down_room)?.center();
        self.set(up.0, up.1, CellKind::StairsUp);
        self.set(down.0, down.1, CellKind::StairsDown);
        let stairs = Stairs { up, down };
        self.stairs = Some(stairs);
        Some(stairs)
    }

    /// 所有可通行格子
    pub fn floor_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| !self.is_wall_cell(x, y))
    }

    /// 某格子所属的房间下标
    pub fn room_at(&self, x: i32, y: i32) -> Option<usize> {
        self.rooms.iter().position(|r| r.contains(x, y))
    }
}

impl fmt::Display for GridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            let row: String = (0..self.width)
                .map(|x| self.cell(x, y).unwrap_or_default().symbol())
                .collect();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
