// src/dungeon/src/generator.rs

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::GridMap;
use crate::room::Room;

/// 生成参数错误（房间冲突不算错误）
#[derive(Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("invalid generator config: {0}")]
    InvalidConfig(String),
}

/// 地牢生成参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub width: i32,
    pub height: i32,
    pub max_rooms: usize,
    pub min_size: i32,
    pub max_size: i32,
    /// 连接的相邻房间对比例，取值 (0, 1]
    pub corridor_ratio: f32,
    /// 是否放置上下楼梯
    pub place_stairs: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            max_rooms: 10,
            min_size: 3,
            max_size: 6,
            corridor_ratio: 1.0,
            place_stairs: false,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.width <= 2 || self.height <= 2 {
            return Err(GenerationError::InvalidConfig(format!(
                "grid {}x{} is too small",
                self.width, self.height
            )));
        }
        if self.min_size <= 0 || self.min_size > self.max_size {
            return Err(GenerationError::InvalidConfig(format!(
                "room size range {}..={} is empty",
                self.min_size, self.max_size
            )));
        }
        if !(self.corridor_ratio > 0.0 && self.corridor_ratio <= 1.0) {
            return Err(GenerationError::InvalidConfig(format!(
                "corridor ratio {} outside (0, 1]",
                self.corridor_ratio
            )));
        }
        Ok(())
    }

    /// 实际连接的房间对数量：floor((n - 1) * ratio)
    pub fn connection_count(&self, room_count: usize) -> usize {
        if room_count < 2 {
            return 0;
        }
        ((room_count - 1) as f32 * self.corridor_ratio).floor() as usize
    }
}

/// 随机放置房间 + 挖掘走廊的地牢生成器
#[derive(Clone, Debug, Default)]
pub struct DungeonGenerator {
    pub config: GeneratorConfig,
}

impl DungeonGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// 生成一层地牢
    ///
    /// 每次放置尝试只进行一次，冲突即丢弃，因此最终房间数可能少于 `max_rooms`。
    /// 房间少于两个时，走廊与楼梯步骤直接跳过。
    pub fn generate(&self, rng: &mut impl Rng) -> Result<GridMap, GenerationError> {
        self.config.validate()?;
        let cfg = &self.config;
        let mut grid = GridMap::new(cfg.width, cfg.height);

        for _ in 0..cfg.max_rooms {
            if let Some(room) = sample_room(cfg, rng) {
                grid.try_add_room(room);
            }
        }

        let connections = cfg.connection_count(grid.room_count());
        let rooms = grid.rooms().to_vec();
        for pair in rooms.windows(2).take(connections) {
            grid.carve_corridor(pair[0].center(), pair[1].center());
        }

        if cfg.place_stairs && grid.room_count() >= 2 {
            let picked = index::sample(rng, grid.room_count(), 2);
            grid.place_stairs(picked.index(0), picked.index(1));
        }

        tracing::debug!(
            rooms = grid.room_count(),
            attempts = cfg.max_rooms,
            connections,
            "dungeon generated"
        );
        Ok(grid)
    }
}

/// 采样一个候选房间；当网格容不下该尺寸时返回 None（本次尝试作废）
fn sample_room(cfg: &GeneratorConfig, rng: &mut impl Rng) -> Option<Room> {
    let w = rng.random_range(cfg.min_size..=cfg.max_size);
    let h = rng.random_range(cfg.min_size..=cfg.max_size);
    let max_x = cfg.width - w - 1;
    let max_y = cfg.height - h - 1;
    if max_x < 1 || max_y < 1 {
        return None;
    }
    let x = rng.random_range(1..=max_x);
    let y = rng.random_range(1..=max_y);
    Some(Room::new(x, y, w, h))
}

/// `generate(width, height, maxRooms, minSize, maxSize)`：全连接、无楼梯
pub fn generate(
    width: i32,
    height: i32,
    max_rooms: usize,
    min_size: i32,
    max_size: i32,
    rng: &mut impl Rng,
) -> Result<GridMap, GenerationError> {
    DungeonGenerator::new(GeneratorConfig {
        width,
        height,
        max_rooms,
        min_size,
        max_size,
        corridor_ratio: 1.0,
        place_stairs: false,
    })
    .generate(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellKind;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn rng(seed: u64) -> Pcg32 {
        Pcg32::seed_from_u64(seed)
    }

    #[test]
    fn rooms_never_overlap() {
        for seed in 0..50 {
            let grid = generate(40, 40, 20, 3, 8, &mut rng(seed)).unwrap();
            let rooms = grid.rooms();
            for (i, a) in rooms.iter().enumerate() {
                for b in &rooms[i + 1..] {
                    assert!(!a.intersects(b), "seed {seed}: {a:?} overlaps {b:?}");
                }
            }
        }
    }

    #[test]
    fn full_ratio_connects_every_consecutive_pair() {
        let grid = generate(40, 40, 15, 3, 6, &mut rng(7)).unwrap();
        assert_eq!(grid.connections().len(), grid.room_count().saturating_sub(1));
    }

    #[test]
    fn corridor_ratio_reduces_connections() {
        let config = GeneratorConfig {
            width: 80,
            height: 80,
            max_rooms: 25,
            min_size: 3,
            max_size: 8,
            corridor_ratio: 0.5,
            place_stairs: false,
        };
        let grid = DungeonGenerator::new(config.clone()).generate(&mut rng(3)).unwrap();
        let expected = ((grid.room_count() - 1) as f32 * 0.5).floor() as usize;
        assert_eq!(grid.connections().len(), expected);
        assert_eq!(config.connection_count(1), 0);
        assert_eq!(config.connection_count(5), 2);
    }

    #[test]
    fn single_room_dungeon_skips_corridors_and_stairs() {
        // 8x8 的房间在 10x10 网格中只有一个可能位置，第二次尝试必然冲突
        let config = GeneratorConfig {
            width: 10,
            height: 10,
            max_rooms: 5,
            min_size: 8,
            max_size: 8,
            corridor_ratio: 1.0,
            place_stairs: true,
        };
        let grid = DungeonGenerator::new(config).generate(&mut rng(11)).unwrap();
        assert_eq!(grid.room_count(), 1);
        assert!(grid.connections().is_empty());
        assert_eq!(grid.stairs(), None);
        assert!(grid.floor_cells().all(|(x, y)| grid.cell(x, y) == Some(CellKind::Room)));
    }

    #[test]
    fn oversized_rooms_place_nothing() {
        let grid = generate(6, 6, 10, 5, 5, &mut rng(1)).unwrap();
        assert_eq!(grid.room_count(), 0);
        assert_eq!(grid.floor_cells().count(), 0);
    }

    #[test]
    fn stairs_land_on_distinct_room_centres() {
        let config = GeneratorConfig {
            width: 50,
            height: 50,
            max_rooms: 20,
            min_size: 3,
            max_size: 8,
            corridor_ratio: 1.0,
            place_stairs: true,
        };
        let grid = DungeonGenerator::new(config).generate(&mut rng(5)).unwrap();
        let stairs = grid.stairs().unwrap();
        assert_ne!(stairs.up, stairs.down);
        let centres: Vec<_> = grid.rooms().iter().map(Room::center).collect();
        assert!(centres.contains(&stairs.up));
        assert!(centres.contains(&stairs.down));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = GeneratorConfig {
            min_size: 6,
            max_size: 3,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            DungeonGenerator::new(bad).generate(&mut rng(0)),
            Err(GenerationError::InvalidConfig(_))
        ));

        let zero_ratio = GeneratorConfig {
            corridor_ratio: 0.0,
            ..GeneratorConfig::default()
        };
        assert!(zero_ratio.validate().is_err());
    }
}
