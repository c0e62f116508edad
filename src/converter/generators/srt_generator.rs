//! SRT 格式生成器

use std::fmt::Write;

use crate::{
    error::Result,
    model::lyrics::{Channel, MultiTrackLyrics},
};

use super::timed_cues;

/// 生成 SRT 字幕。每个声道是一段连续的字幕块，按 `channel_priority` 排列。
pub fn generate_srt(lyrics: &MultiTrackLyrics, channel_priority: &[Channel]) -> Result<String> {
    let mut output = String::new();
    let mut index = 1;

    for (_, document) in lyrics.ordered(channel_priority) {
        for cue in timed_cues(document) {
            writeln!(output, "{index}")?;
            writeln!(
                output,
                "{} --> {}",
                format_srt_time(cue.start_ms),
                format_srt_time(cue.end_ms)
            )?;
            writeln!(output, "{}", cue.text)?;
            writeln!(output)?;
            index += 1;
        }
    }

    Ok(output)
}

/// `HH:MM:SS,mmm`
fn format_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}
