// src/dungeon/src/pathfinding.rs

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::grid::GridMap;

const NEIGHBOURS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

fn manhattan(a: (i32, i32), b: (i32, i32)) -> u32 {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

/// 4 连通网格上的 A* 最短路径
///
/// 返回的路径不含起点、包含终点；不可达或起点即终点时返回空路径，
/// 调用方应将其视为“不移动”。开放集按 f 值排序，相同 f 值按入堆顺序。
pub fn shortest_path(grid: &GridMap, start: (i32, i32), goal: (i32, i32)) -> Vec<(i32, i32)> {
    if start == goal || grid.is_wall_cell(goal.0, goal.1) {
        return Vec::new();
    }

    let mut open = BinaryHeap::new();
    let mut sequence = 0u64;
    let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    let mut g_score: HashMap<(i32, i32), u32> = HashMap::new();

    g_score.insert(start, 0);
    open.push(Reverse((manhattan(start, goal), sequence, start)));

    while let Some(Reverse((_, _, current))) = open.pop() {
        if current == goal {
            let mut path = vec![current];
            let mut node = current;
            while let Some(&prev) = came_from.get(&node) {
                if prev == start {
                    break;
                }
                path.push(prev);
                node = prev;
            }
            path.reverse();
            return path;
        }

        let current_g = g_score.get(&current).copied().unwrap_or(u32::MAX);
        for (dx, dy) in NEIGHBOURS {
            let neighbour = (current.0 + dx, current.1 + dy);
            if grid.is_wall_cell(neighbour.0, neighbour.1) {
                continue;
            }
            let tentative = current_g.saturating_add(1);
            if g_score.get(&neighbour).is_none_or(|&g| tentative < g) {
                came_from.insert(neighbour, current);
                g_score.insert(neighbour, tentative);
                sequence += 1;
                open.push(Reverse((
                    tentative + manhattan(neighbour, goal),
                    sequence,
                    neighbour,
                )));
            }
        }
    }

    Vec::new()
}

/// 两个连续坐标点之间的视线检测
///
/// 沿线段以 `max(1, floor(距离 * 10))` 步采样，任一采样点落在墙上即返回 false。
/// 两点重合视为无遮挡。
pub fn has_line_of_sight(from: (f32, f32), to: (f32, f32), grid: &GridMap) -> bool {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let distance = (dx * dx + dy * dy).sqrt();
    if distance == 0.0 {
        return true;
    }

    let steps = ((distance * 10.0) as usize).max(1);
    let step_x = dx / steps as f32;
    let step_y = dy / steps as f32;

    let (mut x, mut y) = from;
    for _ in 0..steps {
        x += step_x;
        y += step_y;
        if grid.is_wall(x, y) {
            return false;
        }
    }
    true
}
