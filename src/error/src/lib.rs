//! 游戏错误处理模块
//!
//! 存档读写、序列化与资源加载中可能出现的错误。

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

/// 游戏运行过程中可能出现的错误类型
#[derive(Debug, Error)]
pub enum GameError {
    /// 存档系统错误
    #[error("Save system error: {0}")]
    SaveError(#[from] anyhow::Error),

    /// IO操作错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 反序列化错误
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// 存档数据损坏
    #[error("Corrupted save data")]
    CorruptedSave,

    /// 存档版本不兼容
    #[error("Incompatible save version: {0}")]
    VersionMismatch(u32),

    /// 存档字段不合法
    #[error("Invalid save data: {0}")]
    InvalidSaveData(String),

    /// 资源加载失败
    #[error("Asset error: {0}")]
    AssetError(String),
}

impl GameError {
    /// 可以当作“没有可用存档”处理的错误
    pub fn is_unusable_save(&self) -> bool {
        matches!(
            self,
            GameError::CorruptedSave
                | GameError::DeserializationError(_)
                | GameError::VersionMismatch(_)
                | GameError::InvalidSaveData(_)
        )
    }
}

impl From<DecodeError> for GameError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnexpectedEnd { .. } | DecodeError::Utf8 { .. } => GameError::CorruptedSave,
            other => GameError::DeserializationError(other.to_string()),
        }
    }
}

impl From<EncodeError> for GameError {
    fn from(err: EncodeError) -> Self {
        GameError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            GameError::IoError(err.into())
        } else if err.is_eof() {
            GameError::CorruptedSave
        } else {
            GameError::DeserializationError(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_json_is_corrupted() {
        let err: GameError = serde_json::from_str::<serde_json::Value>("{\"version\":")
            .map(|_| ())
            .map_err(GameError::from)
            .unwrap_err();
        assert!(matches!(err, GameError::CorruptedSave));
        assert!(err.is_unusable_save());
    }

    #[test]
    fn io_errors_are_not_unusable_saves() {
        let err = GameError::from(std::io::Error::other("disk"));
        assert!(!err.is_unusable_save());
        assert!(err.to_string().contains("disk"));
    }
}
