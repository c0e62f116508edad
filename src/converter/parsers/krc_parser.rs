//! # KRC 格式解析器
//!
//! 行头 `[开始,持续]` 为绝对时间，逐字标记 `<偏移,持续,0>` 的偏移相对于行开始。
//! `[language:...]` 标签是 Base64 编码的 JSON，内含翻译和罗马音。

use std::{collections::BTreeMap, sync::LazyLock};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use regex::Regex;
use tracing::warn;

use crate::{
    converter::utils::{parse_tag_line, split_line_header},
    error::{LyricsError, Result},
    model::{
        lyrics::{Channel, LyricLine, LyricWord, LyricsDocument, ParsedLyrics, TagMap},
        song::LyricDialect,
    },
    providers::kugou::models::KrcLanguageRoot,
};

static KRC_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?P<offset>\d+),(?P<duration>\d+),\d+>").expect("编译 KRC_WORD_REGEX 失败")
});

const LANGUAGE_TAG: &str = "language";
const LANGUAGE_TYPE_ROMANIZATION: i32 = 0;
const LANGUAGE_TYPE_TRANSLATION: i32 = 1;

/// 解析 KRC 文本。
#[must_use]
pub fn parse_krc(content: &str) -> ParsedLyrics {
    let mut tags = TagMap::new();
    let mut language_payload = None;
    let mut lines = Vec::new();

    for (line_num, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = parse_tag_line(line) {
            if key.eq_ignore_ascii_case(LANGUAGE_TAG) {
                language_payload = Some(value.to_string());
            } else {
                tags.insert(key, value);
            }
            continue;
        }
        match split_line_header(line) {
            Some((start, duration, body)) => lines.push(parse_line(start, duration, body)),
            None if line.starts_with('[') => {
                warn!(line = line_num + 1, content = %line, "跳过无法解析的 KRC 行");
            }
            None => {}
        }
    }

    let embedded = match language_payload.as_deref().map(|p| decode_language(p, &lines)) {
        Some(Ok(embedded)) => embedded,
        Some(Err(e)) => {
            warn!(error = %e, "KRC language 标签无法解析，已忽略");
            BTreeMap::new()
        }
        None => BTreeMap::new(),
    };

    ParsedLyrics {
        dialect: LyricDialect::Krc,
        tags,
        tracks: vec![LyricsDocument::new(lines)],
        embedded,
    }
}

fn parse_line(start: u64, duration: u64, body: &str) -> LyricLine {
    let markers: Vec<(usize, usize, u64, u64)> = KRC_WORD_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let offset = caps["offset"].parse().ok()?;
            let word_duration = caps["duration"].parse().ok()?;
            Some((whole.start(), whole.end(), offset, word_duration))
        })
        .collect();

    let words = markers
        .iter()
        .enumerate()
        .filter_map(|(i, &(_, text_start, offset, word_duration))| {
            let text_end = markers.get(i + 1).map_or(body.len(), |next| next.0);
            let text = &body[text_start..text_end];
            (!text.is_empty()).then(|| {
                let word_start = start + offset;
                LyricWord::new(Some(word_start), Some(word_start + word_duration), text)
            })
        })
        .collect();

    LyricLine::new(Some(start), Some(start + duration), words)
}

/// 把 `language` 标签展开为翻译与罗马音声道，行时间取自对应的原文行。
fn decode_language(
    payload: &str,
    lines: &[LyricLine],
) -> Result<BTreeMap<Channel, LyricsDocument>> {
    let decoded = BASE64.decode(payload.trim())?;
    let root: KrcLanguageRoot = serde_json::from_slice(&decoded)
        .map_err(|e| LyricsError::Parser(format!("KRC language JSON 无效: {e}")))?;

    let mut embedded = BTreeMap::new();
    for item in root.content {
        let (channel, document) = match item.kind {
            LANGUAGE_TYPE_TRANSLATION => (Channel::Ts, translation_document(&item.lyric_content, lines)),
            LANGUAGE_TYPE_ROMANIZATION => (Channel::Roma, romanization_document(&item.lyric_content, lines)),
            other => {
                warn!(kind = other, "未知的 KRC language 类型");
                continue;
            }
        };
        if !document.is_empty() {
            embedded.insert(channel, document);
        }
    }
    Ok(embedded)
}

fn translation_document(entries: &[Vec<String>], lines: &[LyricLine]) -> LyricsDocument {
    LyricsDocument::new(
        lines
            .iter()
            .zip(entries)
            .map(|(line, entry)| LyricLine::line_timed(line.start_ms, line.end_ms, &entry.concat()))
            .collect(),
    )
}

/// 罗马音按字拆开。字数与原文一致时沿用每个字的时间，否则整行作为一个字。
fn romanization_document(entries: &[Vec<String>], lines: &[LyricLine]) -> LyricsDocument {
    LyricsDocument::new(
        lines
            .iter()
            .zip(entries)
            .map(|(line, pieces)| {
                if pieces.len() == line.words.len() {
                    let words = line
                        .words
                        .iter()
                        .zip(pieces)
                        .map(|(word, piece)| LyricWord::new(word.start_ms, word.end_ms, piece.as_str()))
                        .collect();
                    LyricLine::new(line.start_ms, line.end_ms, words)
                } else {
                    LyricLine::line_timed(line.start_ms, line.end_ms, &pieces.concat())
                }
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn language_tag() -> String {
        let json = r#"{"content":[{"type":1,"lyricContent":[["Story"],["Flower"]]},{"type":0,"lyricContent":[["gu ","shi"],["hua"]]}],"version":1}"#;
        format!("[language:{}]", BASE64.encode(json))
    }

    #[test]
    fn test_relative_word_offsets() {
        let parsed = parse_krc("[ar:周杰伦]\n[1000,800]<0,300,0>故<300,500,0>事");
        let line = &parsed.main_track().unwrap().lines[0];
        assert_eq!(parsed.tags.get("ar"), Some("周杰伦"));
        assert_eq!(line.words[1].start_ms, Some(1300));
        assert_eq!(line.words[1].end_ms, Some(1800));
        assert_eq!(line.end_ms, Some(1800));
        assert_eq!(line.text(), "故事");
    }

    #[test]
    fn test_language_channels() {
        let content = format!(
            "{}\n[1000,800]<0,300,0>故<300,500,0>事\n[2000,500]<0,500,0>花",
            language_tag()
        );
        let parsed = parse_krc(&content);
        assert!(parsed.tags.get("language").is_none());

        let ts = &parsed.embedded[&Channel::Ts];
        assert_eq!(ts.lines[1].text(), "Flower");
        assert_eq!(ts.lines[1].start_ms, Some(2000));

        let roma = &parsed.embedded[&Channel::Roma];
        assert_eq!(roma.lines[0].words.len(), 2);
        assert_eq!(roma.lines[0].words[1].text, "shi");
        assert_eq!(roma.lines[0].words[1].start_ms, Some(1300));
    }

    #[test]
    fn test_broken_language_tag_is_ignored() {
        let parsed = parse_krc("[language:!!!]\n[0,100]<0,100,0>a");
        assert!(parsed.embedded.is_empty());
        assert_eq!(parsed.main_track().unwrap().len(), 1);
    }
}
