//! 歌词格式生成器。

use crate::model::lyrics::{LyricLine, LyricsDocument};

pub mod ass_generator;
pub mod lrc_generator;
pub mod srt_generator;

/// 最后一行没有结束时间时的默认持续时间。
pub const DEFAULT_LAST_LINE_DURATION_MS: u64 = 5000;

/// 字幕格式中的一条字幕。
pub(crate) struct Cue<'a> {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    pub line: &'a LyricLine,
}

/// 取出有开始时间且有文本的行，并补全结束时间。
///
/// 缺少结束时间时使用下一行的开始时间，没有下一行时使用开始时间加 5 秒。
pub(crate) fn timed_cues(document: &LyricsDocument) -> Vec<Cue<'_>> {
    let lines = &document.lines;
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let start_ms = line.start_ms?;
            if line.is_blank() {
                return None;
            }
            let end_ms = line
                .end_ms
                .or_else(|| lines[i + 1..].iter().find_map(|next| next.start_ms))
                .unwrap_or(start_ms + DEFAULT_LAST_LINE_DURATION_MS)
                .max(start_ms);
            Some(Cue {
                start_ms,
                end_ms,
                text: line.text(),
                line,
            })
        })
        .collect()
}
