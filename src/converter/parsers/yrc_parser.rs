//! # YRC 格式解析器
//!
//! 网易云的逐字歌词。逐字标记 `(开始,持续,0)` 位于文字之前，
//! 字的绝对开始时间为行开始时间加上标记中的开始时间。

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::{
    converter::utils::{parse_tag_line, split_line_header},
    model::{
        lyrics::{LyricLine, LyricWord, LyricsDocument, ParsedLyrics, TagMap},
        song::LyricDialect,
    },
};

static YRC_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((?P<start>\d+),(?P<duration>\d+),0\)").expect("编译 YRC_WORD_REGEX 失败")
});

/// 解析 YRC 文本。`{"t":...}` 形式的 JSON 元数据行会被跳过。
#[must_use]
pub fn parse_yrc(content: &str) -> ParsedLyrics {
    let mut tags = TagMap::new();
    let mut lines = Vec::new();

    for (line_num, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('{') {
            continue;
        }
        if let Some((key, value)) = parse_tag_line(line) {
            tags.insert(key, value);
            continue;
        }
        match split_line_header(line) {
            Some((start, duration, body)) => lines.push(parse_line(start, duration, body)),
            None => warn!(line = line_num + 1, content = %line, "跳过无法解析的 YRC 行"),
        }
    }

    super::single_track(LyricDialect::Yrc, tags, LyricsDocument::new(lines))
}

fn parse_line(start: u64, duration: u64, body: &str) -> LyricLine {
    let markers: Vec<_> = YRC_WORD_REGEX.captures_iter(body).collect();

    let mut words = Vec::with_capacity(markers.len());
    for (i, caps) in markers.iter().enumerate() {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let text_end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(body.len(), |m| m.start());
        let text = &body[whole.end()..text_end];
        if text.is_empty() {
            continue;
        }
        let (Ok(relative_start), Ok(word_duration)) =
            (caps["start"].parse::<u64>(), caps["duration"].parse::<u64>())
        else {
            continue;
        };
        let word_start = start + relative_start;
        words.push(LyricWord::new(
            Some(word_start),
            Some(word_start + word_duration),
            text,
        ));
    }

    LyricLine::new(Some(start), Some(start + duration), words)
}
