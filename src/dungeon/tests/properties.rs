//! Property checks for generation and path search.

use std::collections::{HashSet, VecDeque};

use dungeon::{CellKind, DungeonGenerator, GeneratorConfig, GridMap, Room, shortest_path};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg32;

fn reachable(grid: &GridMap, start: (i32, i32), goal: (i32, i32)) -> bool {
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(cell) = queue.pop_front() {
        if cell == goal {
            return true;
        }
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let next = (cell.0 + dx, cell.1 + dy);
            if !grid.is_wall_cell(next.0, next.1) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}

fn config_strategy() -> impl Strategy<Value = GeneratorConfig> {
    (10i32..60, 10i32..60, 1usize..25, 2i32..5, 0i32..5, 1u32..=10, any::<bool>()).prop_map(
        |(width, height, max_rooms, min_size, extra, ratio_tenths, place_stairs)| GeneratorConfig {
            width,
            height,
            max_rooms,
            min_size,
            max_size: min_size + extra,
            corridor_ratio: ratio_tenths as f32 / 10.0,
            place_stairs,
        },
    )
}

proptest! {
    #[test]
    fn generated_rooms_are_disjoint_and_intact(config in config_strategy(), seed in any::<u64>()) {
        let grid = DungeonGenerator::new(config).generate(&mut Pcg32::seed_from_u64(seed)).unwrap();
        let rooms = grid.rooms();
        for (i, a) in rooms.iter().enumerate() {
            for b in &rooms[i + 1..] {
                prop_assert!(!a.intersects(b));
            }
            // 走廊不会覆盖房间格子；楼梯只出现在房间中心
            for (x, y) in a.cells() {
                let cell = grid.cell(x, y).unwrap();
                prop_assert!(cell != CellKind::Corridor && cell != CellKind::Empty);
            }
        }
        for (x, y) in grid.floor_cells() {
            let cell = grid.cell(x, y).unwrap();
            if cell == CellKind::Corridor {
                prop_assert!(grid.room_at(x, y).is_none());
            }
        }
    }

    #[test]
    fn path_is_adjacent_walkable_and_matches_flood_fill(
        seed in any::<u64>(),
        sx in 0i32..12, sy in 0i32..12, gx in 0i32..12, gy in 0i32..12,
    ) {
        let mut rng = Pcg32::seed_from_u64(seed);
        let grid = DungeonGenerator::new(GeneratorConfig {
            width: 12,
            height: 12,
            max_rooms: 6,
            min_size: 2,
            max_size: 4,
            corridor_ratio: 0.6,
            place_stairs: false,
        })
        .generate(&mut rng)
        .unwrap();
        prop_assume!(!grid.is_wall_cell(sx, sy) && (sx, sy) != (gx, gy));

        let path = shortest_path(&grid, (sx, sy), (gx, gy));
        let expect = !grid.is_wall_cell(gx, gy) && reachable(&grid, (sx, sy), (gx, gy));
        prop_assert_eq!(!path.is_empty(), expect);

        let mut prev = (sx, sy);
        for &cell in &path {
            prop_assert!(!grid.is_wall_cell(cell.0, cell.1));
            prop_assert_eq!(prev.0.abs_diff(cell.0) + prev.1.abs_diff(cell.1), 1);
            prev = cell;
        }
        if expect {
            prop_assert_eq!(path.last().copied(), Some((gx, gy)));
        }
    }
}

#[test]
fn hand_built_map_round_trips_through_display() {
    let mut grid = GridMap::new(8, 4);
    assert!(grid.try_add_room(Room::new(1, 1, 2, 2)));
    assert!(grid.try_add_room(Room::new(5, 1, 2, 2)));
    grid.carve_corridor((2, 2), (5, 2));
    let text = grid.to_string();
    assert_eq!(text.lines().nth(2), Some(" ..##.. "));
}
