//! # QRC 格式解析器
//!
//! QQ 音乐解密后的歌词是一段 XML，真正的歌词在 `LyricContent` 属性里。
//! 行头 `[开始,持续]` 和逐字标记 `字(开始,持续)` 都是绝对时间。

use std::sync::LazyLock;

use quick_xml::{Reader, events::Event};
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    converter::utils::{parse_tag_line, split_line_header},
    model::{
        lyrics::{LyricLine, LyricWord, LyricsDocument, ParsedLyrics, TagMap},
        song::LyricDialect,
    },
};

/// 未转义的 `&`。合法的实体引用会被第一个分组捕获。
static AMPERSAND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#\d+;|#x[0-9a-fA-F]+;|[A-Za-z]+;)?").expect("编译 AMPERSAND_REGEX 失败")
});

/// XML 解析失败时使用的兜底提取。贪婪匹配到最后一个 `"/>`，可以容忍正文中的引号。
static LYRIC_CONTENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)LyricContent\s*=\s*"(.*)"\s*/>"#).expect("编译 LYRIC_CONTENT_REGEX 失败")
});

static QRC_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(?P<text>.*?)\((?P<start>\d+),(?P<duration>\d+)\)")
        .expect("编译 QRC_WORD_REGEX 失败")
});

static QRC_INTERLUDE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+,\d+\)$").expect("编译 QRC_INTERLUDE_REGEX 失败"));

/// 解析 QRC 文本。没有 XML 包装时直接把输入当作歌词正文。
#[must_use]
pub fn parse_qrc(content: &str) -> ParsedLyrics {
    let body = extract_lyric_content(content).unwrap_or_else(|| content.to_string());

    let mut tags = TagMap::new();
    let mut lines = Vec::new();

    for (line_num, raw_line) in body.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = parse_tag_line(line) {
            tags.insert(key, value);
            continue;
        }
        match split_line_header(line) {
            Some((start, duration, text)) => lines.push(parse_line(start, duration, text)),
            None if line.starts_with('[') => {
                warn!(line = line_num + 1, content = %line, "跳过无法解析的 QRC 行");
            }
            None => {}
        }
    }

    super::single_track(LyricDialect::Qrc, tags, LyricsDocument::new(lines))
}

/// 从 QRC 的 XML 包装中取出 `LyricContent` 属性。
///
/// 先修复未转义的 `&` 后交给 quick-xml；仍然失败时（通常是正文中有未转义的引号）
/// 改用正则提取。
pub fn extract_lyric_content(xml: &str) -> Option<String> {
    if !xml.contains("LyricContent") {
        return None;
    }

    let repaired = AMPERSAND_REGEX.replace_all(xml, |caps: &regex::Captures| {
        caps.get(1)
            .map_or_else(|| "&amp;".to_string(), |entity| format!("&{}", entity.as_str()))
    });

    match read_attribute(&repaired) {
        Ok(Some(content)) => return Some(content),
        Ok(None) => debug!("XML 中没有 LyricContent 属性，改用正则提取"),
        Err(e) => debug!(error = %e, "QRC XML 解析失败，改用正则提取"),
    }

    let raw = LYRIC_CONTENT_REGEX.captures(xml)?.get(1)?.as_str();
    Some(
        quick_xml::escape::unescape(raw)
            .map_or_else(|_| raw.to_string(), |text| text.into_owned()),
    )
}

fn read_attribute(xml: &str) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                // 读完整个标签的属性，正文里的引号会让后面的属性报错
                let mut content = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"LyricContent" {
                        content = Some(
                            attr.decode_and_unescape_value(reader.decoder())?
                                .into_owned(),
                        );
                    }
                }
                if content.is_some() {
                    return Ok(content);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn parse_line(start: u64, duration: u64, body: &str) -> LyricLine {
    let line_end = Some(start + duration);

    if QRC_INTERLUDE_REGEX.is_match(body.trim()) {
        return LyricLine::new(Some(start), line_end, Vec::new());
    }

    let mut words = Vec::new();
    let mut consumed = 0;
    for caps in QRC_WORD_REGEX.captures_iter(body) {
        if let Some(whole) = caps.get(0) {
            consumed = whole.end();
        }
        let text = &caps["text"];
        if text.is_empty() {
            continue;
        }
        let (Ok(word_start), Ok(word_duration)) =
            (caps["start"].parse::<u64>(), caps["duration"].parse::<u64>())
        else {
            continue;
        };
        words.push(LyricWord::new(
            Some(word_start),
            Some(word_start + word_duration),
            text,
        ));
    }

    let trailing = &body[consumed..];
    if !trailing.trim().is_empty() {
        words.push(LyricWord::untimed(trailing));
    }

    let mut line = LyricLine::new(Some(start), line_end, words);
    super::clamp_line_start(&mut line);
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<QrcInfos>
<QrcHeadInfo SaveTime="1" Version="100"/>
<LyricInfo LyricCount="1">
<Lyric_1 LyricType="1" LyricContent="[ti:晴天]
[ar:周杰伦]
[1000,2000]故(1000,500)事(1500,500)的(2000,1000)
[3000,1000](3000,1000)
[4000,1500]Rock &amp; Roll(4000,1500)
"/>
</LyricInfo>
</QrcInfos>"#;

    #[test]
    fn test_parse_wrapped_qrc() {
        let parsed = parse_qrc(SAMPLE);
        assert_eq!(parsed.dialect, LyricDialect::Qrc);
        assert_eq!(parsed.tags.get("ar"), Some("周杰伦"));

        let doc = parsed.main_track().unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.lines[0].text(), "故事的");
        assert_eq!(doc.lines[0].words[1].start_ms, Some(1500));
        assert_eq!(doc.lines[0].words[1].end_ms, Some(2000));
        assert_eq!(doc.lines[0].end_ms, Some(3000));
        assert!(doc.lines[1].words.is_empty());
        assert_eq!(doc.lines[2].text(), "Rock & Roll");
    }

    #[test]
    fn test_unescaped_content_is_repaired() {
        let xml = r#"<Lyric_1 LyricType="1" LyricContent="[0,1000]Tom & "Jerry"(0,1000)"/>"#;
        let content = extract_lyric_content(xml).unwrap();
        assert_eq!(content, r#"[0,1000]Tom & "Jerry"(0,1000)"#);
    }

    #[test]
    fn test_bare_qrc_body() {
        let parsed = parse_qrc("[500,1000]a(500,300)b(800,700)");
        let line = &parsed.main_track().unwrap().lines[0];
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.start_ms, Some(500));
    }
}
