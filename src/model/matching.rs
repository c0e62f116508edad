//! 本地文件匹配相关的数据结构。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::song::SongInfo;

/// 一个待匹配的本地音乐文件，以及从标签中读出的元数据。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTrack {
    /// 文件路径。
    pub path: PathBuf,
    /// 标题。
    pub title: Option<String>,
    /// 艺术家。
    pub artist: Option<String>,
    /// 专辑。
    pub album: Option<String>,
    /// 时长，毫秒。
    pub duration_ms: Option<u64>,
}

impl LocalTrack {
    /// 只有路径、没有标签信息的文件。
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// 去掉空白后非空的标题。
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        non_blank(self.artist.as_deref())
    }

    #[must_use]
    pub fn album(&self) -> Option<&str> {
        non_blank(self.album.as_deref())
    }

    /// 用于搜索的关键词：有标题时为 `标题 艺术家`，否则退回到文件名（不含扩展名）。
    #[must_use]
    pub fn search_keyword(&self) -> String {
        self.title().map_or_else(
            || file_stem(&self.path),
            |title| match self.artist() {
                Some(artist) => format!("{title} {artist}"),
                None => title.to_string(),
            },
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .unwrap_or_default()
}

/// 单个文件的匹配状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStatus {
    /// 找到了置信度足够的候选。
    Matched,
    /// 没有结果，或最佳候选的置信度低于阈值。
    Failed,
    /// 处理过程中出现错误。
    Error,
}

/// 单个文件的匹配结果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// 被匹配的本地文件。
    pub track: LocalTrack,
    /// 最佳候选。
    pub song: Option<SongInfo>,
    /// 置信度，范围 [0, 1]。
    pub confidence: f64,
    /// 匹配状态。
    pub status: MatchStatus,
    /// 出错时的错误信息。
    pub error: Option<String>,
    /// 渲染好的歌词文本。
    pub lyrics: Option<String>,
    /// 歌词是否已经写回。
    pub lyrics_saved: bool,
}

impl MatchResult {
    /// 匹配失败的结果。
    #[must_use]
    pub const fn failed(track: LocalTrack, song: Option<SongInfo>, confidence: f64) -> Self {
        Self {
            track,
            song,
            confidence,
            status: MatchStatus::Failed,
            error: None,
            lyrics: None,
            lyrics_saved: false,
        }
    }

    /// 出错的结果。
    #[must_use]
    pub fn error(track: LocalTrack, message: impl Into<String>) -> Self {
        Self {
            track,
            song: None,
            confidence: 0.0,
            status: MatchStatus::Error,
            error: Some(message.into()),
            lyrics: None,
            lyrics_saved: false,
        }
    }
}
