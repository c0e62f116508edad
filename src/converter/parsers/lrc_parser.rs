//! # LRC 格式解析器
//!
//! 支持普通 LRC、带 `<mm:ss.xx>` 逐字标记的增强型 LRC，
//! 以及一行带多个时间戳的写法。
//!
//! 共享时间戳的行（例如原文和翻译写在同一时间）会被拆到不同的轨道中。

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use tracing::warn;

use crate::{
    converter::utils::{parse_tag_line, time2ms},
    model::{
        lyrics::{LyricLine, LyricWord, LyricsDocument, ParsedLyrics, TagMap},
        song::LyricDialect,
    },
};

/// 一行开头的全部时间戳，以及余下的正文。
static LRC_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:\[\d+:\d{1,2}(?:[.:]\d{1,3})?\])+)(.*)$").expect("编译 LRC_LINE_REGEX 失败")
});

static LRC_TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+):(\d{1,2})(?:[.:](\d{1,3}))?\]").expect("编译 LRC_TIMESTAMP_REGEX 失败")
});

/// 增强型 LRC 的逐字时间标记。
static ENHANCED_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(\d+):(\d{1,2})(?:[.:](\d{1,3}))?>").expect("编译 ENHANCED_MARKER_REGEX 失败")
});

/// 一条轨道，以及已经占用的开始时间。
#[derive(Default)]
struct Track {
    lines: Vec<LyricLine>,
    starts: HashSet<u64>,
}

/// 解析 LRC 文本。
#[must_use]
pub fn parse_lrc(content: &str) -> ParsedLyrics {
    let mut tags = TagMap::new();
    let mut lines = Vec::new();

    for (line_num, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = parse_tag_line(line) {
            tags.insert(key, value);
            continue;
        }

        let Some(caps) = LRC_LINE_REGEX.captures(line) else {
            continue;
        };
        let timestamps = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        match parse_timestamps(timestamps) {
            Some(starts) => lines.extend(expand_line(&starts, body)),
            None => warn!(line = line_num + 1, content = %line, "跳过时间戳无效的 LRC 行"),
        }
    }

    ParsedLyrics {
        dialect: LyricDialect::Lrc,
        tags,
        tracks: merge_into_tracks(lines),
        embedded: Default::default(),
    }
}

fn parse_timestamps(group: &str) -> Option<Vec<u64>> {
    LRC_TIMESTAMP_REGEX
        .captures_iter(group)
        .map(|ts| {
            let seconds = &ts[2];
            if seconds.parse::<u64>().ok()? >= 60 {
                return None;
            }
            time2ms(&ts[1], seconds, ts.get(3).map_or("", |m| m.as_str())).ok()
        })
        .collect()
}

/// 为每个时间戳生成一行，逐字时间按与第一个时间戳的差值平移。
fn expand_line(starts: &[u64], body: &str) -> Vec<LyricLine> {
    let Some(&first_start) = starts.first() else {
        return Vec::new();
    };
    let template = parse_body(first_start, body);

    starts
        .iter()
        .map(|&start| {
            let shift = |t: Option<u64>| t.map(|t| (t + start).saturating_sub(first_start));
            LyricLine {
                start_ms: Some(start),
                end_ms: shift(template.end_ms),
                words: template
                    .words
                    .iter()
                    .map(|w| LyricWord::new(shift(w.start_ms), shift(w.end_ms), w.text.clone()))
                    .collect(),
            }
        })
        .collect()
}

/// 解析正文。没有逐字标记时整行是一个字。
fn parse_body(line_start: u64, body: &str) -> LyricLine {
    let markers: Vec<(usize, usize, Option<u64>)> = ENHANCED_MARKER_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let time = time2ms(&caps[1], &caps[2], caps.get(3).map_or("", |m| m.as_str())).ok();
            Some((whole.start(), whole.end(), time))
        })
        .collect();

    if markers.is_empty() {
        return LyricLine::line_timed(Some(line_start), None, body);
    }

    let mut words: Vec<LyricWord> = Vec::new();
    let leading = &body[..markers[0].0];
    if !leading.is_empty() {
        words.push(LyricWord::new(Some(line_start), markers[0].2, leading));
    }

    for (i, &(_, text_start, time)) in markers.iter().enumerate() {
        let text_end = markers.get(i + 1).map_or(body.len(), |next| next.0);
        let text = &body[text_start..text_end];
        if text.is_empty() {
            continue;
        }
        let end = markers.get(i + 1).and_then(|next| next.2);
        words.push(LyricWord::new(time, end, text));
    }

    let line_end = words.last().and_then(|w| w.end_ms);
    let mut line = LyricLine::new(Some(line_start), line_end, words);
    super::clamp_line_start(&mut line);
    line
}

/// 按输入顺序把行放进第一个还没有用过该开始时间的轨道。
///
/// 没有轨道可放时，非空行会开启新轨道，空行被丢弃。
fn merge_into_tracks(lines: Vec<LyricLine>) -> Vec<LyricsDocument> {
    let mut tracks: Vec<Track> = Vec::new();

    for line in lines {
        let start = line.start_ms.unwrap_or_default();
        if let Some(track) = tracks.iter_mut().find(|t| !t.starts.contains(&start)) {
            track.starts.insert(start);
            track.lines.push(line);
        } else if !line.text().is_empty() {
            let mut track = Track::default();
            track.starts.insert(start);
            track.lines.push(line);
            tracks.push(track);
        }
    }

    tracks
        .into_iter()
        .map(|t| LyricsDocument::new(t.lines))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_lines_and_tags() {
        let parsed = parse_lrc("[ti:晴天]\n[ar:周杰伦]\n[00:01.50]故事的小黄花\n[00:05.123]从出生那年就飘着");
        assert_eq!(parsed.tags.get("ti"), Some("晴天"));
        assert_eq!(parsed.tracks.len(), 1);
        let doc = &parsed.tracks[0];
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.lines[0].start_ms, Some(1500));
        assert_eq!(doc.lines[1].start_ms, Some(5123));
        assert_eq!(doc.lines[1].text(), "从出生那年就飘着");
    }

    #[test]
    fn test_shared_timestamps_become_tracks() {
        let content = "[00:20.00]Hello world\n[00:20.00]你好世界\n[00:22.00]Next line\n[00:22.00]下一行";
        let parsed = parse_lrc(content);
        assert_eq!(parsed.tracks.len(), 2);
        assert_eq!(parsed.tracks[0].lines[0].text(), "Hello world");
        assert_eq!(parsed.tracks[0].lines[1].text(), "Next line");
        assert_eq!(parsed.tracks[1].lines[0].text(), "你好世界");
        assert_eq!(parsed.tracks[1].lines[1].text(), "下一行");
    }

    #[test]
    fn test_merge_is_order_sensitive() {
        let content = "[00:01.00]a\n[00:02.00]b\n[00:01.00]c\n[00:03.00]d";
        let parsed = parse_lrc(content);
        let texts: Vec<Vec<String>> = parsed
            .tracks
            .iter()
            .map(|t| t.lines.iter().map(LyricLine::text).collect())
            .collect();
        assert_eq!(texts, vec![vec!["a", "b", "d"], vec!["c"]]);
    }

    #[test]
    fn test_blank_line_without_room_is_dropped() {
        let parsed = parse_lrc("[00:01.00]a\n[00:01.00]\n[00:02.00]");
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.tracks[0].len(), 2);
        assert!(parsed.tracks[0].lines[1].is_blank());
    }

    #[test]
    fn test_multiple_timestamps_spawn_lines() {
        let parsed = parse_lrc("[00:01.00][00:10.00]副歌\n[00:05.00]主歌");
        let doc = &parsed.tracks[0];
        let starts: Vec<_> = doc.lines.iter().map(|l| l.start_ms).collect();
        assert_eq!(starts, vec![Some(1000), Some(10000), Some(5000)]);
        assert_eq!(doc.lines[1].text(), "副歌");
    }

    #[test]
    fn test_enhanced_words() {
        let parsed = parse_lrc("[00:01.00]<00:01.00>Hello <00:01.50>world<00:02.00>");
        let line = &parsed.tracks[0].lines[0];
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.words[0].text, "Hello ");
        assert_eq!(line.words[0].start_ms, Some(1000));
        assert_eq!(line.words[0].end_ms, Some(1500));
        assert_eq!(line.words[1].start_ms, Some(1500));
        assert_eq!(line.words[1].end_ms, Some(2000));
        assert_eq!(line.end_ms, Some(2000));
    }

    #[test]
    fn test_enhanced_last_word_open_ended() {
        let parsed = parse_lrc("[00:01.00]<00:01.00>a<00:01.20>b");
        let line = &parsed.tracks[0].lines[0];
        assert_eq!(line.words[1].end_ms, None);
        assert_eq!(line.end_ms, None);
    }

    #[test]
    fn test_invalid_seconds_skipped() {
        let parsed = parse_lrc("[00:75.00]坏行\n[00:01.00]好行");
        assert_eq!(parsed.tracks[0].len(), 1);
        assert_eq!(parsed.tracks[0].lines[0].text(), "好行");
    }

    #[test]
    fn test_fraction_scaling() {
        let parsed = parse_lrc("[00:01.5]a\n[00:02.25]b\n[00:03:125]c\n[00:04]d");
        let starts: Vec<_> = parsed.tracks[0].lines.iter().map(|l| l.start_ms).collect();
        assert_eq!(starts, vec![Some(1500), Some(2250), Some(3125), Some(4000)]);
    }
}
