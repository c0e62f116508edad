//! 统一的逐字歌词模型。
//!
//! 所有方言解析后都落到这里的 `LyricsDocument`，生成器只依赖这些类型。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use super::song::LyricDialect;

/// 一个字（或一个音节）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricWord {
    /// 开始时间，毫秒。
    pub start_ms: Option<u64>,
    /// 结束时间，毫秒。
    pub end_ms: Option<u64>,
    /// 文本。
    pub text: String,
}

impl LyricWord {
    /// 创建一个字。当开始和结束都存在时，结束时间不会早于开始时间。
    #[must_use]
    pub fn new(start_ms: Option<u64>, end_ms: Option<u64>, text: impl Into<String>) -> Self {
        let end_ms = match (start_ms, end_ms) {
            (Some(start), Some(end)) => Some(end.max(start)),
            (_, end) => end,
        };
        Self {
            start_ms,
            end_ms,
            text: text.into(),
        }
    }

    /// 创建一个没有时间信息的字。
    #[must_use]
    pub fn untimed(text: impl Into<String>) -> Self {
        Self::new(None, None, text)
    }
}

/// 一行歌词。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// 开始时间，毫秒。
    pub start_ms: Option<u64>,
    /// 结束时间，毫秒。
    pub end_ms: Option<u64>,
    /// 按开始时间排列的字。
    pub words: Vec<LyricWord>,
}

impl LyricLine {
    /// 创建一行歌词。
    #[must_use]
    pub const fn new(start_ms: Option<u64>, end_ms: Option<u64>, words: Vec<LyricWord>) -> Self {
        Self {
            start_ms,
            end_ms,
            words,
        }
    }

    /// 只有一个字、且只有行时间的歌词行。空文本会得到没有字的行。
    #[must_use]
    pub fn line_timed(start_ms: Option<u64>, end_ms: Option<u64>, text: &str) -> Self {
        let words = if text.is_empty() {
            Vec::new()
        } else {
            vec![LyricWord::new(start_ms, end_ms, text)]
        };
        Self::new(start_ms, end_ms, words)
    }

    /// 拼接后的整行文本。
    #[must_use]
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    /// 是否没有任何可见文本（例如间奏行）。
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.words.iter().all(|w| w.text.trim().is_empty())
    }
}

/// 按播放顺序排列的歌词行。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsDocument {
    /// 歌词行，插入顺序即播放顺序。
    pub lines: Vec<LyricLine>,
}

impl LyricsDocument {
    #[must_use]
    pub const fn new(lines: Vec<LyricLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.lines.len()
    }

    /// 是否有任何一行带有逐字时间。
    #[must_use]
    pub fn has_word_timing(&self) -> bool {
        self.lines.iter().any(|line| {
            line.words.len() > 1 || line.words.iter().any(|w| w.start_ms != line.start_ms)
        })
    }
}

/// 歌词声道。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// 原文。
    #[strum(to_string = "orig", serialize = "original")]
    Orig,
    /// 翻译。
    #[strum(to_string = "ts", serialize = "translation")]
    Ts,
    /// 罗马音。
    #[strum(to_string = "roma", serialize = "romanization")]
    Roma,
}

impl Channel {
    /// 默认的声道优先级。
    pub const DEFAULT_PRIORITY: [Self; 3] = [Self::Orig, Self::Ts, Self::Roma];
}

/// 声道名到歌词文档的映射。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiTrackLyrics {
    channels: BTreeMap<Channel, LyricsDocument>,
}

impl MultiTrackLyrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个声道。空文档会被忽略。
    pub fn insert(&mut self, channel: Channel, document: LyricsDocument) {
        if !document.is_empty() {
            self.channels.insert(channel, document);
        }
    }

    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&LyricsDocument> {
        self.channels.get(&channel)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// 按给定优先级列出存在的声道；不在列表中的声道排在最后。
    #[must_use]
    pub fn ordered(&self, priority: &[Channel]) -> Vec<(Channel, &LyricsDocument)> {
        let mut ordered: Vec<(Channel, &LyricsDocument)> = priority
            .iter()
            .filter_map(|c| self.channels.get(c).map(|doc| (*c, doc)))
            .collect();
        for (channel, doc) in &self.channels {
            if !ordered.iter().any(|(c, _)| c == channel) {
                ordered.push((*channel, doc));
            }
        }
        ordered
    }
}

/// 从 `[key:value]` 头部行中提取出的元数据，保持出现顺序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMap(Vec<(String, String)>);

impl TagMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个标签。已存在的键会在原位置被覆盖。
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// 按键查找，不区分大小写。
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 解析器的输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLyrics {
    /// 识别出的方言。
    pub dialect: LyricDialect,
    /// 头部标签。
    pub tags: TagMap,
    /// 平行轨道。只有 LRC 可能产生多于一条轨道。
    pub tracks: Vec<LyricsDocument>,
    /// 歌词内嵌的其他声道，例如 KRC `language` 标签中的翻译和罗马音。
    pub embedded: BTreeMap<Channel, LyricsDocument>,
}

impl ParsedLyrics {
    /// 第一条轨道。
    #[must_use]
    pub fn main_track(&self) -> Option<&LyricsDocument> {
        self.tracks.first()
    }
}
