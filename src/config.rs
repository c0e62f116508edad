//! 负责处理应用的持久化配置。
//!
//! 用户配置以 TOML 保存在 `<config_dir>/lyrics-sync/config.toml`；
//! 平台会话之类的缓存以带时间戳的 JSON 保存在同一目录。

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    converter::OutputFormat,
    error::{LyricsError, Result},
    matching::collaborators::WriteMode,
    model::{lyrics::Channel, song::Platform},
};

const APP_DIR_NAME: &str = "lyrics-sync";
const CONFIG_FILENAME: &str = "config.toml";

/// 默认的匹配阈值。
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.6;

/// 获取应用配置目录下指定文件的完整路径，目录不存在时会被创建。
///
/// # 参数
/// * `filename` - 目标配置文件的名称，例如 "`kugou_session.json`"。
pub fn get_config_file_path(filename: &str) -> Result<PathBuf> {
    let mut config_dir = dirs::config_dir()
        .ok_or_else(|| LyricsError::Config("无法找到用户配置目录".to_string()))?;
    config_dir.push(APP_DIR_NAME);
    fs::create_dir_all(&config_dir)?;
    config_dir.push(filename);
    Ok(config_dir)
}

/// 通用的、带时间戳的缓存配置结构。
#[derive(Serialize, Deserialize, Debug)]
pub struct CachedConfig<T> {
    /// 缓存的数据。
    pub data: T,
    /// 最后更新的时间戳。
    pub last_updated: DateTime<Utc>,
}

pub fn load_cached_config<T: for<'de> Deserialize<'de>>(filename: &str) -> Result<CachedConfig<T>> {
    let config_path = get_config_file_path(filename)?;
    let content = fs::read_to_string(config_path)?;
    let config: CachedConfig<T> = serde_json::from_str(&content)?;
    Ok(config)
}

pub fn save_cached_config<T: Serialize>(filename: &str, data: &T) -> Result<()> {
    let config_path = get_config_file_path(filename)?;
    let cached_config = CachedConfig {
        data,
        last_updated: Utc::now(),
    };
    let content = serde_json::to_string_pretty(&cached_config)?;
    fs::write(config_path, content)?;
    Ok(())
}

/// 本地文件匹配相关的配置项。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// 置信度阈值，低于该值的候选会被拒绝。
    pub threshold: f64,
    /// 匹配成功后是否获取歌词。
    pub fetch_lyrics: bool,
    /// 歌词写回方式。
    pub write_mode: WriteMode,
    /// 手动指定的批量并发数，留空时按设备档位决定。
    pub max_concurrency: Option<usize>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            fetch_lyrics: true,
            write_mode: WriteMode::SeparateFile,
            max_concurrency: None,
        }
    }
}

/// 应用配置。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 聚合搜索结果时的平台优先级。
    pub platform_priority: Vec<Platform>,
    /// 渲染 SRT/ASS 时的声道优先级。
    pub channel_priority: Vec<Channel>,
    /// 匹配本地文件时使用的平台。
    pub primary_platform: Platform,
    /// 输出格式。
    pub output_format: OutputFormat,
    /// 匹配配置。
    pub matching: MatchingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform_priority: Platform::DEFAULT_PRIORITY.to_vec(),
            channel_priority: Channel::DEFAULT_PRIORITY.to_vec(),
            primary_platform: Platform::QqMusic,
            output_format: OutputFormat::VerbatimLrc,
            matching: MatchingConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从 TOML 文本解析配置，缺失的字段使用默认值。
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| LyricsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从指定路径加载配置。文件不存在时返回默认配置。
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content)?;
                info!(path = %path.display(), "已加载配置文件");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "未找到配置文件，使用默认配置");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 从默认位置加载配置。
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_file_path(CONFIG_FILENAME)?)
    }

    /// 保存到指定路径。
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| LyricsError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.matching.threshold) {
            return Err(LyricsError::Config(format!(
                "匹配阈值必须位于 [0, 1] 之间，当前为 {}",
                self.matching.threshold
            )));
        }
        if self.matching.max_concurrency == Some(0) {
            return Err(LyricsError::Config("并发数不能为 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.platform_priority,
            vec![Platform::QqMusic, Platform::Kugou, Platform::Netease]
        );
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_toml_str(
            r#"
platform_priority = ["netease", "qq"]
output_format = "srt"

[matching]
threshold = 0.75
write_mode = "both"
"#,
        )
        .unwrap();
        assert_eq!(
            config.platform_priority,
            vec![Platform::Netease, Platform::QqMusic]
        );
        assert_eq!(config.output_format, OutputFormat::Srt);
        assert!((config.matching.threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.matching.write_mode, WriteMode::Both);
        assert!(config.matching.fetch_lyrics);
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let result = AppConfig::from_toml_str("[matching]\nthreshold = 1.5\n");
        assert!(matches!(result, Err(LyricsError::Config(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.primary_platform = Platform::Kugou;
        config.matching.max_concurrency = Some(4);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
