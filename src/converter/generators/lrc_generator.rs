//! # LRC 格式生成器
//!
//! 支持逐行、逐字（方括号时间戳）与增强型（尖括号时间戳）三种写法。

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::{
    converter::utils::{ms2formattime, ms2roundedtime},
    error::Result,
    model::lyrics::{LyricLine, LyricsDocument, TagMap},
};

/// 时间戳精度。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePrecision {
    /// `mm:ss.xx`，四舍五入。
    #[default]
    Centiseconds,
    /// `mm:ss.xxx`，截断。
    Milliseconds,
}

impl TimePrecision {
    fn format(self, ms: u64) -> String {
        match self {
            Self::Centiseconds => ms2roundedtime(ms),
            Self::Milliseconds => ms2formattime(ms),
        }
    }
}

/// LRC 的写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrcStyle {
    /// 每行一个时间戳。
    LineByLine,
    /// 行内用 `[mm:ss.xx]` 标记每个字。
    Verbatim,
    /// 行内用 `<mm:ss.xx>` 标记每个字。
    Enhanced,
}

/// 生成 LRC 文本。
///
/// # 参数
/// * `document` - 要输出的歌词。没有开始时间的行只输出文本。
/// * `tags` - 输出在歌词之前的头部标签，`None` 时不输出。
pub fn generate_lrc(
    document: &LyricsDocument,
    tags: Option<&TagMap>,
    style: LrcStyle,
    precision: TimePrecision,
) -> Result<String> {
    let mut output = String::with_capacity(document.len() * 48);

    if let Some(tags) = tags {
        for (key, value) in tags.iter() {
            writeln!(output, "[{key}:{value}]")?;
        }
    }

    for line in &document.lines {
        if let Some(start) = line.start_ms {
            write!(output, "[{}]", precision.format(start))?;
        }
        match style {
            LrcStyle::LineByLine => output.push_str(&line.text()),
            LrcStyle::Verbatim => write_word_markers(&mut output, line, precision, ('[', ']'), true)?,
            LrcStyle::Enhanced => write_word_markers(&mut output, line, precision, ('<', '>'), false)?,
        }
        writeln!(output)?;
    }

    Ok(output)
}

/// 写出一行的逐字标记。
///
/// 字的开始时间与上一个结束时间不同时在字前写开始标记，有结束时间时在字后写结束标记。
/// 最后一个字没有结束标记时，用行结束时间补上。
fn write_word_markers(
    output: &mut String,
    line: &LyricLine,
    precision: TimePrecision,
    (open, close): (char, char),
    seed_with_line_start: bool,
) -> Result<()> {
    let mut last_end = if seed_with_line_start {
        line.start_ms
    } else {
        None
    };
    let mut ends_with_marker = false;

    for word in &line.words {
        if let Some(start) = word.start_ms
            && Some(start) != last_end
        {
            write!(output, "{open}{}{close}", precision.format(start))?;
        }
        output.push_str(&word.text);
        ends_with_marker = false;

        last_end = word.end_ms;
        if let Some(end) = word.end_ms {
            write!(output, "{open}{}{close}", precision.format(end))?;
            ends_with_marker = true;
        }
    }

    if !ends_with_marker
        && !line.words.is_empty()
        && let Some(end) = line.end_ms
    {
        write!(output, "{open}{}{close}", precision.format(end))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::lyrics::LyricWord;

    fn sample() -> LyricsDocument {
        LyricsDocument::new(vec![LyricLine::new(
            Some(1000),
            Some(3000),
            vec![
                LyricWord::new(Some(1000), Some(1500), "故"),
                LyricWord::new(Some(1500), Some(2000), "事"),
                LyricWord::new(Some(2200), Some(3000), "的"),
            ],
        )])
    }

    #[test]
    fn test_line_by_line_with_tags() {
        let mut tags = TagMap::new();
        tags.insert("ti", "晴天");
        let lrc = generate_lrc(
            &sample(),
            Some(&tags),
            LrcStyle::LineByLine,
            TimePrecision::Centiseconds,
        )
        .unwrap();
        assert_eq!(lrc, "[ti:晴天]\n[00:01.00]故事的\n");
    }

    #[test]
    fn test_verbatim_markers() {
        let lrc = generate_lrc(&sample(), None, LrcStyle::Verbatim, TimePrecision::Centiseconds)
            .unwrap();
        assert_eq!(lrc, "[00:01.00]故[00:01.50]事[00:02.00][00:02.20]的[00:03.00]\n");
    }

    #[test]
    fn test_enhanced_markers() {
        let lrc = generate_lrc(&sample(), None, LrcStyle::Enhanced, TimePrecision::Milliseconds)
            .unwrap();
        assert_eq!(
            lrc,
            "[00:01.000]<00:01.000>故<00:01.500>事<00:02.000><00:02.200>的<00:03.000>\n"
        );
    }

    #[test]
    fn test_line_end_appended_for_open_word() {
        let doc = LyricsDocument::new(vec![LyricLine::new(
            Some(0),
            Some(2000),
            vec![LyricWord::new(Some(0), None, "la")],
        )]);
        let lrc = generate_lrc(&doc, None, LrcStyle::Verbatim, TimePrecision::Centiseconds).unwrap();
        assert_eq!(lrc, "[00:00.00]la[00:02.00]\n");
    }
}
