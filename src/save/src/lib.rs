// src/save/src/lib.rs

use anyhow::Context;
use bincode::{Decode, Encode, config};
use error::GameError;
use hero::Player;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info};

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// 玩家进度
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub level: u32,
    pub xp: u32,
    pub xp_to_next_level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub potions: u32,
}

impl From<&Player> for PlayerRecord {
    fn from(player: &Player) -> Self {
        Self {
            level: player.progression.level,
            xp: player.progression.xp,
            xp_to_next_level: player.progression.xp_to_next_level,
            hp: player.hp,
            max_hp: player.max_hp,
            potions: player.potions,
        }
    }
}

impl PlayerRecord {
    /// 把存档里的进度写回一个新放置的玩家
    pub fn apply_to(&self, player: &mut Player) {
        player.progression.level = self.level;
        player.progression.xp = self.xp;
        player.progression.xp_to_next_level = self.xp_to_next_level;
        player.max_hp = self.max_hp;
        player.hp = self.hp;
        player.potions = self.potions;
    }
}

/// 关卡进度
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct GameRecord {
    pub current_level_to_resume_at: u32,
    pub total_enemies_killed: u32,
}

/// 存档数据
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    /// 秒（UNIX 时间）
    pub timestamp: u64,
    pub player: PlayerRecord,
    pub game: GameRecord,
}

impl SaveData {
    pub fn new(player: &Player, current_level_to_resume_at: u32, total_enemies_killed: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            version: SAVE_VERSION,
            timestamp,
            player: PlayerRecord::from(player),
            game: GameRecord {
                current_level_to_resume_at,
                total_enemies_killed,
            },
        }
    }

    /// Validate save data integrity
    pub fn validate(&self) -> Result<(), GameError> {
        if self.version != SAVE_VERSION {
            return Err(GameError::VersionMismatch(self.version));
        }
        let p = &self.player;
        if p.level == 0 {
            return Err(GameError::InvalidSaveData("level must be at least 1".into()));
        }
        if p.hp == 0 {
            return Err(GameError::InvalidSaveData("a dead hero cannot be resumed".into()));
        }
        if p.max_hp == 0 || p.hp > p.max_hp {
            return Err(GameError::InvalidSaveData(format!(
                "hp {} out of range for max {}",
                p.hp, p.max_hp
            )));
        }
        if p.xp_to_next_level == 0 || p.xp >= p.xp_to_next_level {
            return Err(GameError::InvalidSaveData("xp exceeds threshold".into()));
        }
        if self.game.current_level_to_resume_at == 0 {
            return Err(GameError::InvalidSaveData("dungeon depth must be at least 1".into()));
        }
        Ok(())
    }
}

/// 存档编码方式，由文件扩展名决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Json,
    Binary,
}

impl SaveFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SaveFormat::Json,
            _ => SaveFormat::Binary,
        }
    }

    pub fn encode(self, data: &SaveData) -> Result<Vec<u8>, GameError> {
        match self {
            SaveFormat::Json => serde_json::to_vec_pretty(data)
                .map_err(|e| GameError::SerializationError(e.to_string())),
            SaveFormat::Binary => Ok(bincode::encode_to_vec(data, config::standard())?),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<SaveData, GameError> {
        match self {
            SaveFormat::Json => Ok(serde_json::from_slice(bytes)?),
            SaveFormat::Binary => {
                let (data, _) = bincode::decode_from_slice(bytes, config::standard())?;
                Ok(data)
            }
        }
    }
}

/// 单文件存档系统
#[derive(Debug, Clone)]
pub struct SaveSystem {
    path: PathBuf,
    format: SaveFormat,
}

impl SaveSystem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = SaveFormat::for_path(&path);
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    pub fn has_save(&self) -> bool {
        self.path.exists()
    }

    /// 保存：先写临时文件再原子重命名
    pub fn save(&self, data: &SaveData) -> Result<(), GameError> {
        let bytes = self.format.encode(data)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).context("Failed to create save directory")?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file =
            fs::File::create(&temp_path).context("Failed to create temporary save file")?;
        file.write_all(&bytes).context("Failed to write save data")?;
        // 确保数据写入磁盘
        file.sync_all().context("Failed to flush save data")?;
        drop(file);

        // 原子性重命名
        fs::rename(&temp_path, &self.path).context("Failed to commit save file")?;

        info!(path = %self.path.display(), depth = data.game.current_level_to_resume_at, "game saved");
        Ok(())
    }

    /// 读取存档。文件不存在返回 `Ok(None)`；损坏、字段不合法或版本不符返回错误。
    pub fn load(&self) -> Result<Option<SaveData>, GameError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no save file");
            return Ok(None);
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read save file: {}", self.path.display()))?;
        let data = self.format.decode(&bytes)?;
        data.validate()?;
        Ok(Some(data))
    }

    /// 删除存档；不存在时什么都不做
    pub fn delete(&self) -> Result<(), GameError> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to delete save file")?;
            info!(path = %self.path.display(), "save deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> SaveData {
        let mut player = Player::new(1.5, 1.5);
        player.gain_xp(130);
        player.potions = 3;
        player.hp = 200;
        SaveData::new(&player, 4, 17)
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SaveFormat::for_path(Path::new("a/save.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::for_path(Path::new("save.JSON")), SaveFormat::Json);
        assert_eq!(SaveFormat::for_path(Path::new("save.sav")), SaveFormat::Binary);
        assert_eq!(SaveFormat::for_path(Path::new("save")), SaveFormat::Binary);
    }

    #[test]
    fn json_save_then_load() {
        let dir = tempdir().unwrap();
        let system = SaveSystem::new(dir.path().join("save.json"));
        let data = sample();
        system.save(&data).unwrap();
        assert_eq!(system.load().unwrap(), Some(data));
        assert!(!dir.path().join("save.tmp").exists());

        let text = fs::read_to_string(system.path()).unwrap();
        assert!(text.contains("current_level_to_resume_at"));
    }

    #[test]
    fn dead_hero_is_rejected() {
        let mut player = Player::new(1.5, 1.5);
        player.hp = 0;
        let data = SaveData::new(&player, 2, 3);
        assert!(matches!(data.validate(), Err(GameError::InvalidSaveData(_))));

        // 磁盘上的死档同样读不回来
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, serde_json::to_vec(&data).unwrap()).unwrap();
        let err = SaveSystem::new(&path).load().unwrap_err();
        assert!(err.is_unusable_save());
    }

    #[test]
    fn binary_save_then_load() {
        let dir = tempdir().unwrap();
        let system = SaveSystem::new(dir.path().join("nested").join("save.sav"));
        let data = sample();
        system.save(&data).unwrap();
        assert_eq!(system.load().unwrap(), Some(data));
    }

    #[test]
    fn missing_file_is_no_save() {
        let dir = tempdir().unwrap();
        let system = SaveSystem::new(dir.path().join("absent.json"));
        assert!(!system.has_save());
        assert_eq!(system.load().unwrap(), None);
        system.delete().unwrap();
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = SaveSystem::new(&path).load().unwrap_err();
        assert!(err.is_unusable_save(), "{err}");
    }

    #[test]
    fn wrong_version_is_rejected() {
        let dir = tempdir().unwrap();
        let system = SaveSystem::new(dir.path().join("save.json"));
        let mut data = sample();
        data.version = 99;
        system.save(&data).unwrap();
        assert!(matches!(system.load(), Err(GameError::VersionMismatch(99))));
    }

    #[test]
    fn inconsistent_hp_is_rejected() {
        let mut data = sample();
        data.player.hp = data.player.max_hp + 1;
        assert!(matches!(data.validate(), Err(GameError::InvalidSaveData(_))));
    }

    #[test]
    fn record_applies_back_to_player() {
        let data = sample();
        let mut fresh = Player::new(3.5, 3.5);
        data.player.apply_to(&mut fresh);
        assert_eq!(PlayerRecord::from(&fresh), data.player);
        assert_eq!(fresh.level(), 2);
    }

    #[test]
    fn delete_removes_file() {
        let dir = tempdir().unwrap();
        let system = SaveSystem::new(dir.path().join("save.sav"));
        system.save(&sample()).unwrap();
        assert!(system.has_save());
        system.delete().unwrap();
        assert!(!system.has_save());
    }
}
