//! 匹配流程依赖的外部协作者：标签写入与设备档位。

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

use crate::{
    converter::{OutputFormat, write_lyrics_file},
    error::{LyricsError, Result},
};

/// 歌词写回方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WriteMode {
    /// 写入音频文件的标签。
    Embedded,
    /// 在音频文件旁边写一个 `.lrc` 文件。
    SeparateFile,
    /// 两者都写。
    Both,
}

impl WriteMode {
    #[must_use]
    pub const fn wants_embedded(self) -> bool {
        matches!(self, Self::Embedded | Self::Both)
    }

    #[must_use]
    pub const fn wants_separate_file(self) -> bool {
        matches!(self, Self::SeparateFile | Self::Both)
    }
}

/// 一次写回的结果。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagWriteOutcome {
    /// 是否写进了音频标签。
    pub embedded: bool,
    /// 写出的独立歌词文件。
    pub separate_file: Option<PathBuf>,
}

impl TagWriteOutcome {
    /// 是否至少保存了一份。
    #[must_use]
    pub const fn saved(&self) -> bool {
        self.embedded || self.separate_file.is_some()
    }
}

/// 把歌词写回音频文件的协作者。
pub trait TagWriter: Send + Sync + Debug {
    /// # 参数
    /// * `audio_path` - 音频文件路径。
    /// * `lyrics` - 渲染好的歌词文本。
    /// * `mode` - 写回方式。
    fn write_lyrics(&self, audio_path: &Path, lyrics: &str, mode: WriteMode)
    -> Result<TagWriteOutcome>;
}

/// 只负责独立歌词文件的写入器，写出与音频同名的 UTF-8 `.lrc`。
///
/// 不支持写入音频标签，`Embedded` 部分会被跳过。
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarFileWriter;

impl TagWriter for SidecarFileWriter {
    fn write_lyrics(
        &self,
        audio_path: &Path,
        lyrics: &str,
        mode: WriteMode,
    ) -> Result<TagWriteOutcome> {
        let mut outcome = TagWriteOutcome::default();

        if mode.wants_embedded() {
            debug!(path = %audio_path.display(), "SidecarFileWriter 不写入音频标签");
        }

        if mode.wants_separate_file() {
            let stem = audio_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    LyricsError::Internal(format!("无法确定文件名: {}", audio_path.display()))
                })?;
            let dir = audio_path.parent().unwrap_or_else(|| Path::new("."));
            outcome.separate_file =
                Some(write_lyrics_file(dir, &stem, OutputFormat::VerbatimLrc, lyrics)?);
        }

        Ok(outcome)
    }
}

/// 设备性能档位，决定批量匹配的并发数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum DeviceTier {
    Low,
    Medium,
    High,
    Premium,
}

const GIB: u64 = 1024 * 1024 * 1024;

impl DeviceTier {
    /// 该档位允许的并发数。
    #[must_use]
    pub const fn permits(self) -> usize {
        match self {
            Self::Low => 3,
            Self::Medium => 5,
            Self::High => 8,
            Self::Premium => 10,
        }
    }

    /// 按内存与核心数分档。内存未知时只看核心数。
    #[must_use]
    pub const fn classify(total_memory_bytes: Option<u64>, cpu_cores: usize) -> Self {
        if cpu_cores <= 4 {
            return Self::Low;
        }
        match total_memory_bytes {
            None => Self::Medium,
            Some(mem) if mem < 3 * GIB => Self::Low,
            Some(mem) if mem < 6 * GIB => Self::Medium,
            Some(mem) if mem < 8 * GIB => Self::High,
            Some(_) => Self::Premium,
        }
    }
}

/// 提供设备硬件信息的协作者。
pub trait DeviceInfo: Send + Sync {
    /// 物理内存总量，字节。
    fn total_memory_bytes(&self) -> Option<u64>;

    /// 可用的 CPU 核心数。
    fn cpu_cores(&self) -> usize;

    fn tier(&self) -> DeviceTier {
        DeviceTier::classify(self.total_memory_bytes(), self.cpu_cores())
    }
}

/// 读取当前系统的硬件信息。内存来自 `/proc/meminfo`，其他系统上视为未知。
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDeviceInfo;

impl DeviceInfo for SystemDeviceInfo {
    fn total_memory_bytes(&self) -> Option<u64> {
        match fs::read_to_string("/proc/meminfo") {
            Ok(content) => parse_meminfo_total(&content),
            Err(e) => {
                warn!(error = %e, "无法读取 /proc/meminfo");
                None
            }
        }
    }

    fn cpu_cores(&self) -> usize {
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// 解析 `MemTotal:  16318460 kB` 一行。
fn parse_meminfo_total(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kib * 1024)
    })
}
