//! ASS 格式生成器

use std::fmt::Write;

use crate::{
    error::Result,
    model::lyrics::{Channel, LyricLine, MultiTrackLyrics, TagMap},
};

use super::timed_cues;

/// 生成 ASS 字幕。
///
/// 每个声道使用同名样式（`orig`、`ts`、`roma`）。带逐字时间的声道会写出 `\k` 卡拉 OK 标签。
pub fn generate_ass(
    lyrics: &MultiTrackLyrics,
    tags: Option<&TagMap>,
    channel_priority: &[Channel],
) -> Result<String> {
    let mut output = String::with_capacity(2048);

    write_ass_header(&mut output)?;

    writeln!(output, "[Events]")?;
    writeln!(
        output,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    )?;

    if let Some(tags) = tags {
        for (key, value) in tags.iter() {
            writeln!(
                output,
                "Comment: 0,0:00:00.00,0:00:00.00,meta,,0,0,0,,{key}: {value}"
            )?;
        }
    }

    for (channel, document) in lyrics.ordered(channel_priority) {
        let karaoke = document.has_word_timing();
        for cue in timed_cues(document) {
            let text = if karaoke {
                karaoke_text(cue.line, cue.start_ms)?
            } else {
                escape_ass_text(&cue.text)
            };
            writeln!(
                output,
                "Dialogue: 0,{},{},{channel},,0,0,0,,{text}",
                format_ass_time(cue.start_ms),
                format_ass_time(cue.end_ms)
            )?;
        }
    }

    Ok(output)
}

fn write_ass_header(output: &mut String) -> Result<()> {
    writeln!(output, "[Script Info]")?;
    writeln!(output, "ScriptType: v4.00+")?;
    writeln!(output, "PlayResX: 1920")?;
    writeln!(output, "PlayResY: 1080")?;
    writeln!(output)?;

    writeln!(output, "[V4+ Styles]")?;
    writeln!(
        output,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    )?;
    writeln!(
        output,
        "Style: orig,Arial,100,&H00FFFFFF,&H003F3F3F,&H00000000,&H00000000,-1,0,0,0,100,100,0,0,1,2,1,2,10,10,10,1"
    )?;
    writeln!(
        output,
        "Style: ts,Arial,55,&H00D3D3D3,&H000000FF,&H00000000,&H99000000,0,0,0,0,100,100,0,0,1,2,1,2,10,10,50,1"
    )?;
    writeln!(
        output,
        "Style: roma,Arial,55,&H00D3D3D3,&H000000FF,&H00000000,&H99000000,0,0,0,0,100,100,0,0,1,2,1,2,10,10,50,1"
    )?;
    writeln!(
        output,
        "Style: meta,Arial,40,&H00C0C0C0,&H000000FF,&H00000000,&H99000000,0,0,0,0,100,100,0,0,1,1,0,5,10,10,10,1"
    )?;
    writeln!(output)?;
    Ok(())
}

/// 把逐字时间写成 `{\kNN}` 标签，字与字之间的空隙写成空的 `\k`。
fn karaoke_text(line: &LyricLine, line_start_ms: u64) -> Result<String> {
    let mut text = String::new();
    let mut cursor = line_start_ms;

    for word in &line.words {
        let escaped = escape_ass_text(&word.text);
        let (Some(start), Some(end)) = (word.start_ms, word.end_ms) else {
            text.push_str(&escaped);
            continue;
        };
        if start > cursor {
            write!(text, "{{\\k{}}}", (start - cursor) / 10)?;
        }
        write!(text, "{{\\k{}}}{escaped}", end.saturating_sub(start) / 10)?;
        cursor = cursor.max(end);
    }

    Ok(text)
}

/// `H:MM:SS.cc`
fn format_ass_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

fn escape_ass_text(text: &str) -> String {
    text.replace('\n', "\\N").replace('{', "\\{").replace('}', "\\}")
}
