//! 歌词方言的识别与解析。
//!
//! 每种方言都解析到同一个 `LyricsDocument` 模型。解析不会失败：
//! 无法识别的行会被跳过并记录警告，无法识别的文本按纯文本处理。

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use tracing::debug;

use crate::model::{
    lyrics::{LyricLine, LyricsDocument, ParsedLyrics, TagMap},
    song::LyricDialect,
};

pub mod krc_parser;
pub mod lrc_parser;
pub mod qrc_parser;
pub mod yrc_parser;

/// 行首的 `[开始,持续]` 标记。
static LINE_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\[\d+,\d+\]").expect("编译 LINE_MARKER_REGEX 失败"));

/// KRC 的 `<偏移,持续,0>` 逐字标记。
static KRC_WORD_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\d+,\d+,\d+>").expect("编译 KRC_WORD_MARKER_REGEX 失败"));

/// YRC 的 `(开始,持续,0)` 逐字标记。
static YRC_WORD_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+,\d+,0\)").expect("编译 YRC_WORD_MARKER_REGEX 失败"));

/// 行首的 `[mm:ss` 时间戳。
static LRC_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\[\d+:\d+").expect("编译 LRC_HEADER_REGEX 失败"));

/// 判断歌词文本的方言，按顺序检查，第一个命中的规则生效。
#[must_use]
pub fn detect_dialect(text: &str) -> LyricDialect {
    if text.contains("<?xml") || text.contains("LyricContent=") {
        return LyricDialect::Qrc;
    }

    let has_line_markers = LINE_MARKER_REGEX.is_match(text);
    if has_line_markers && KRC_WORD_MARKER_REGEX.is_match(text) && !text.contains("[00:") {
        return LyricDialect::Krc;
    }
    if has_line_markers && YRC_WORD_MARKER_REGEX.is_match(text) {
        return LyricDialect::Yrc;
    }
    if text.contains("[00:") || LRC_HEADER_REGEX.is_match(text) {
        return LyricDialect::Lrc;
    }
    LyricDialect::PlainText
}

/// 识别方言并解析。
#[must_use]
pub fn parse_lyrics(text: &str) -> ParsedLyrics {
    let dialect = detect_dialect(text);
    debug!(%dialect, "识别出歌词方言");
    parse_as(text, dialect)
}

/// 按指定的方言解析。
#[must_use]
pub fn parse_as(text: &str, dialect: LyricDialect) -> ParsedLyrics {
    match dialect {
        LyricDialect::Lrc => lrc_parser::parse_lrc(text),
        LyricDialect::Qrc => qrc_parser::parse_qrc(text),
        LyricDialect::Krc => krc_parser::parse_krc(text),
        LyricDialect::Yrc => yrc_parser::parse_yrc(text),
        LyricDialect::PlainText => parse_plain_text(text),
    }
}

/// 每个非空行成为一个没有时间的歌词行。
#[must_use]
pub fn parse_plain_text(text: &str) -> ParsedLyrics {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LyricLine::line_timed(None, None, line))
        .collect();

    single_track(LyricDialect::PlainText, TagMap::new(), LyricsDocument::new(lines))
}

pub(crate) fn single_track(
    dialect: LyricDialect,
    tags: TagMap,
    document: LyricsDocument,
) -> ParsedLyrics {
    ParsedLyrics {
        dialect,
        tags,
        tracks: vec![document],
        embedded: BTreeMap::new(),
    }
}

/// 行开始时间不晚于第一个字的开始时间。
pub(crate) fn clamp_line_start(line: &mut LyricLine) {
    if let (Some(line_start), Some(first_start)) =
        (line.start_ms, line.words.first().and_then(|w| w.start_ms))
        && first_start < line_start
    {
        line.start_ms = Some(first_start);
    }
}
