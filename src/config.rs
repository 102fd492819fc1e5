use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// 每个分块的默认字节数
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// 单次会话默认允许写入的最大字节数（64MB）
pub const DEFAULT_MAX_SESSION_BYTES: u64 = 64 * 1024 * 1024;

/// 桥接配置
/// 客户端和宿主共用同一份配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 分块大小（字节）
    pub chunk_size: usize,
    /// 工作目录名称，位于 `work_root` 之下
    pub work_dir_name: String,
    /// 工作目录的父目录，为空时使用系统临时目录
    pub work_root: Option<PathBuf>,
    /// 单次会话允许写入的最大字节数
    pub max_session_bytes: u64,
    /// 表情目录 API 地址
    pub api_base_url: String,
    /// 表情资源 CDN 地址
    pub cdn_base_url: String,
    /// 网络请求超时（秒）
    pub timeout_seconds: Option<u64>,
    /// 宿主启动时是否清理工作目录
    pub purge_on_start: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            work_dir_name: "emote_bridge".to_string(),
            work_root: None,
            max_session_bytes: DEFAULT_MAX_SESSION_BYTES,
            api_base_url: "https://7tv.io/v3".to_string(),
            cdn_base_url: "https://cdn.7tv.app/emote".to_string(),
            timeout_seconds: None,
            purge_on_start: true,
        }
    }
}

impl BridgeConfig {
    /// 从默认值出发，读取环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|name| std::env::var(name).ok())
    }

    /// 使用给定的查找函数覆盖配置，便于测试时注入
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EMOTE_BRIDGE_CHUNK_SIZE") {
            self.chunk_size = parse_env("EMOTE_BRIDGE_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("EMOTE_BRIDGE_WORK_ROOT") {
            self.work_root = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("EMOTE_BRIDGE_MAX_SESSION_BYTES") {
            self.max_session_bytes = parse_env("EMOTE_BRIDGE_MAX_SESSION_BYTES", &value)?;
        }
        if let Some(value) = lookup("EMOTE_BRIDGE_TIMEOUT") {
            self.timeout_seconds = Some(parse_env("EMOTE_BRIDGE_TIMEOUT", &value)?);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_session_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_session_bytes must be greater than zero".to_string(),
            ));
        }
        if self.work_dir_name.is_empty() || self.work_dir_name.contains(|c| c == '/' || c == '\\') {
            return Err(ConfigError::Invalid(format!(
                "work_dir_name must be a single path component: {:?}",
                self.work_dir_name
            )));
        }
        Ok(())
    }

    /// 工作目录的完整路径
    pub fn work_dir(&self) -> PathBuf {
        let root = self
            .work_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        root.join(&self.work_dir_name)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(work_root.into());
        self
    }

    pub fn with_max_session_bytes(mut self, max_session_bytes: u64) -> Self {
        self.max_session_bytes = max_session_bytes;
        self
    }

    pub fn with_purge_on_start(mut self, purge_on_start: bool) -> Self {
        self.purge_on_start = purge_on_start;
        self
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Env {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
