//! Runtime configuration, read from an optional JSON file.

use anyhow::Context;
use dungeon::GeneratorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};

/// Env var overriding the config file location
pub const CONFIG_ENV: &str = "DUNGEON_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "dungeon.json";

/// Dungeon size presets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    /// 20x20, 10 rooms, every neighbour connected
    #[default]
    Classic,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn generator_config(self) -> GeneratorConfig {
        let (size, max_rooms, corridor_ratio) = match self {
            Difficulty::Classic => (20, 10, 1.0),
            Difficulty::Easy => (40, 15, 1.0),
            Difficulty::Medium => (60, 20, 0.7),
            Difficulty::Hard => (80, 25, 0.5),
        };
        GeneratorConfig {
            width: size,
            height: size,
            max_rooms,
            corridor_ratio,
            ..GeneratorConfig::default()
        }
    }

    /// Countdown for the timed explorer
    pub fn explorer_time_limit(self) -> Duration {
        let secs = match self {
            Difficulty::Classic | Difficulty::Easy => 30,
            Difficulty::Medium => 20,
            Difficulty::Hard => 15,
        };
        Duration::from_secs(secs)
    }

    /// Menu hotkey: 0 classic, 1 easy, 2 medium, 3 hard
    pub fn from_hotkey(key: char) -> Option<Self> {
        match key {
            '0' => Some(Difficulty::Classic),
            '1' => Some(Difficulty::Easy),
            '2' => Some(Difficulty::Medium),
            '3' => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    /// Simulation ticks per second; 30 or 60
    pub tick_rate: u32,
    /// Logical pixel resolution of the 3D view
    pub canvas_width: u16,
    pub canvas_height: u16,
    pub save_path: PathBuf,
    pub sprite_dir: PathBuf,
    pub log_path: PathBuf,
    /// Where `M` writes the PNG of the current map
    pub map_export_path: PathBuf,
    pub seed: Option<u64>,
    /// Enemies without line of sight follow the A* path to the player
    pub pursue_out_of_sight: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Classic,
            tick_rate: 30,
            canvas_width: 160,
            canvas_height: 120,
            save_path: PathBuf::from("saves/progress.json"),
            sprite_dir: PathBuf::from("assets/enemies"),
            log_path: PathBuf::from("dungeon.log"),
            map_export_path: PathBuf::from("dungeon.png"),
            seed: None,
            pursue_out_of_sight: false,
        }
    }
}

impl GameConfig {
    /// Where to look for the config file
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Read a config file. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: GameConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(Some(config.sanitized()))
    }

    /// Load from the default location, falling back to defaults on any
    /// failure. The error is handed back so it can be logged once logging
    /// is up.
    pub fn load() -> (Self, Option<anyhow::Error>) {
        match Self::load_from(&Self::path_from_env()) {
            Ok(config) => (config.unwrap_or_default(), None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    /// Clamp values the game cannot run with
    pub fn sanitized(mut self) -> Self {
        if self.tick_rate != 30 && self.tick_rate != 60 {
            self.tick_rate = if self.tick_rate > 45 { 60 } else { 30 };
        }
        self.canvas_width = self.canvas_width.clamp(32, 800);
        self.canvas_height = self.canvas_height.clamp(24, 600);
        self
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    pub fn screen_size(&self) -> (f32, f32) {
        (self.canvas_width as f32, self.canvas_height as f32)
    }
}
