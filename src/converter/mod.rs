//! 歌词格式转换。
//!
//! 解析器把各种方言读入统一的 `LyricsDocument`，生成器再把它写成目标格式。

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, warn};

use crate::{
    error::Result,
    model::{
        lyrics::{Channel, LyricsDocument, MultiTrackLyrics, ParsedLyrics, TagMap},
        song::{DecryptedLyrics, LyricDialect},
    },
};

pub mod generators;
pub mod parsers;
pub mod utils;

pub use self::{
    generators::lrc_generator::{LrcStyle, TimePrecision},
    parsers::{detect_dialect, parse_as, parse_lyrics},
};

/// 输出格式。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OutputFormat {
    /// 逐行 LRC。
    Lrc,
    /// 逐字 LRC，方括号时间戳。
    #[strum(to_string = "verbatim_lrc", serialize = "verbatim")]
    VerbatimLrc,
    /// 增强型 LRC，尖括号时间戳。
    #[strum(to_string = "enhanced_lrc", serialize = "enhanced")]
    EnhancedLrc,
    Srt,
    Ass,
}

impl OutputFormat {
    /// 文件扩展名，不含点。
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Lrc | Self::VerbatimLrc | Self::EnhancedLrc => "lrc",
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }

    const fn lrc_style(self) -> Option<LrcStyle> {
        match self {
            Self::Lrc => Some(LrcStyle::LineByLine),
            Self::VerbatimLrc => Some(LrcStyle::Verbatim),
            Self::EnhancedLrc => Some(LrcStyle::Enhanced),
            Self::Srt | Self::Ass => None,
        }
    }
}

/// 渲染选项。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// LRC 时间戳精度。
    pub precision: TimePrecision,
    /// 是否在歌词前输出头部标签。
    pub include_tags: bool,
    /// 多声道格式的声道顺序。LRC 只输出其中第一个存在的声道。
    pub channel_priority: Vec<Channel>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            precision: TimePrecision::default(),
            include_tags: true,
            channel_priority: Channel::DEFAULT_PRIORITY.to_vec(),
        }
    }
}

/// 一首歌完整的歌词：头部标签和各声道。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsBundle {
    /// 主歌词中的头部标签。
    pub tags: TagMap,
    /// 各声道的歌词。
    pub channels: MultiTrackLyrics,
}

impl LyricsBundle {
    /// 从一份解析结果组装，不单独提供翻译和罗马音。
    #[must_use]
    pub fn from_parsed(parsed: ParsedLyrics) -> Self {
        Self::assemble(parsed, None, None)
    }

    /// 解析解密后的各声道并组装。
    #[must_use]
    pub fn from_decrypted(decrypted: &DecryptedLyrics) -> Self {
        let main = parse_main(&decrypted.main, decrypted.dialect);
        let translation = decrypted.translation.as_deref().and_then(parse_side_channel);
        let romanization = decrypted.romanization.as_deref().and_then(parse_side_channel);
        Self::assemble(main, translation, romanization)
    }

    /// 组装声道。
    ///
    /// 没有单独的翻译或罗马音时，依次退回到歌词内嵌的声道和 LRC 的平行轨道
    /// （第二条轨道为翻译，第三条为罗马音）。
    fn assemble(
        mut main: ParsedLyrics,
        translation: Option<LyricsDocument>,
        romanization: Option<LyricsDocument>,
    ) -> Self {
        let mut tracks = std::mem::take(&mut main.tracks).into_iter();
        let orig = tracks.next();
        let parallel_ts = tracks.next();
        let parallel_roma = tracks.next();
        let dropped = tracks.count();
        if dropped > 0 {
            warn!(dropped, "平行轨道超过三条，多余的轨道已丢弃");
        }

        let mut channels = MultiTrackLyrics::new();
        if let Some(orig) = orig {
            channels.insert(Channel::Orig, orig);
        }
        if let Some(ts) = translation
            .or_else(|| main.embedded.remove(&Channel::Ts))
            .or(parallel_ts)
        {
            channels.insert(Channel::Ts, ts);
        }
        if let Some(roma) = romanization
            .or_else(|| main.embedded.remove(&Channel::Roma))
            .or(parallel_roma)
        {
            channels.insert(Channel::Roma, roma);
        }

        Self {
            tags: main.tags,
            channels,
        }
    }

    /// 渲染为指定格式。
    pub fn render(&self, format: OutputFormat, options: &RenderOptions) -> Result<String> {
        render(&self.channels, &self.tags, format, options)
    }
}

impl MultiTrackLyrics {
    /// 由解密后的各声道组装，见 `LyricsBundle::from_decrypted`。
    #[must_use]
    pub fn from_decrypted(decrypted: &DecryptedLyrics) -> Self {
        LyricsBundle::from_decrypted(decrypted).channels
    }
}

/// 主歌词先按文本识别方言；识别为纯文本时改用平台给出的方言。
fn parse_main(text: &str, hint: LyricDialect) -> ParsedLyrics {
    let detected = detect_dialect(text);
    if detected == LyricDialect::PlainText && hint != LyricDialect::PlainText {
        debug!(%hint, "按平台给出的方言解析主歌词");
        return parse_as(text, hint);
    }
    parse_as(text, detected)
}

fn parse_side_channel(text: &str) -> Option<LyricsDocument> {
    parse_lyrics(text)
        .tracks
        .into_iter()
        .next()
        .filter(|doc| !doc.is_empty())
}

/// 把多声道歌词渲染为指定格式。
///
/// LRC 系列只输出优先级最高的声道；SRT 与 ASS 输出全部声道。
pub fn render(
    lyrics: &MultiTrackLyrics,
    tags: &TagMap,
    format: OutputFormat,
    options: &RenderOptions,
) -> Result<String> {
    let tags = options.include_tags.then_some(tags);

    if let Some(style) = format.lrc_style() {
        let empty = LyricsDocument::default();
        let document = lyrics
            .ordered(&options.channel_priority)
            .first()
            .map_or(&empty, |(_, doc)| *doc);
        return generators::lrc_generator::generate_lrc(document, tags, style, options.precision);
    }

    match format {
        OutputFormat::Srt => {
            generators::srt_generator::generate_srt(lyrics, &options.channel_priority)
        }
        _ => generators::ass_generator::generate_ass(lyrics, tags, &options.channel_priority),
    }
}

/// 把渲染好的歌词写入 `dir/stem.<扩展名>`，返回完整路径。
///
/// # 参数
/// * `dir` - 目标目录，不存在时会被创建。
/// * `stem` - 不含扩展名的文件名。
pub fn write_lyrics_file(dir: &Path, stem: &str, format: OutputFormat, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{stem}.{}", format.extension()));
    fs::write(&path, text)?;
    debug!(path = %path.display(), "歌词已写入文件");
    Ok(path)
}
