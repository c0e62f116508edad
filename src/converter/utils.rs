//! 时间文本与头部标签的辅助函数。

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{LyricsError, Result};

/// `[key:value]` 形式的头部标签行。键以字母开头，因此不会与 `[00:12.34]` 混淆。
static TAG_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([A-Za-z][A-Za-z0-9_]*):(.*)\]$").expect("编译 TAG_LINE_REGEX 失败")
});

/// 把 `分:秒.小数` 三段转换为毫秒。
///
/// 小数部分按位数缩放：1 位乘 100，2 位乘 10，3 位不变；空字符串视为 0。
///
/// # 参数
/// * `minutes` - 分钟，可以超过两位。
/// * `seconds` - 秒。
/// * `fraction` - 小数部分，0 到 3 位数字。
pub fn time2ms(minutes: &str, seconds: &str, fraction: &str) -> Result<u64> {
    let minutes: u64 = minutes.parse()?;
    let seconds: u64 = seconds.parse()?;
    let fraction_ms = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u64>()? * 100,
        2 => fraction.parse::<u64>()? * 10,
        3 => fraction.parse::<u64>()?,
        _ => {
            return Err(LyricsError::Parser(format!(
                "时间戳的小数部分过长: {fraction}"
            )));
        }
    };
    Ok((minutes * 60 + seconds) * 1000 + fraction_ms)
}

/// 毫秒转为 `mm:ss.xxx`。
#[must_use]
pub fn ms2formattime(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// 毫秒四舍五入到百分秒后转为 `mm:ss.xx`，进位会传递到秒和分。
#[must_use]
pub fn ms2roundedtime(ms: u64) -> String {
    let centis_total = (ms + 5) / 10;
    let minutes = centis_total / 6000;
    let seconds = (centis_total % 6000) / 100;
    let centis = centis_total % 100;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

/// 如果是头部标签行，返回去掉空白的键和值。
pub fn parse_tag_line(line: &str) -> Option<(&str, &str)> {
    let caps = TAG_LINE_REGEX.captures(line.trim())?;
    let key = caps.get(1)?.as_str();
    let value = caps.get(2)?.as_str().trim();
    Some((key, value))
}

/// 解析形如 `[123,456]` 的行头，返回开始时间、持续时间和余下的正文。
pub(crate) fn split_line_header(line: &str) -> Option<(u64, u64, &str)> {
    let rest = line.strip_prefix('[')?;
    let (header, body) = rest.split_once(']')?;
    let (start, duration) = header.split_once(',')?;
    let start = start.trim().parse().ok()?;
    let duration = duration.trim().parse().ok()?;
    Some((start, duration, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time2ms_scales_fraction() {
        assert_eq!(time2ms("01", "02", "003").unwrap(), 62003);
        assert_eq!(time2ms("01", "02", "3").unwrap(), 62300);
        assert_eq!(time2ms("01", "02", "03").unwrap(), 62030);
        assert_eq!(time2ms("00", "05", "").unwrap(), 5000);
        assert!(time2ms("00", "05", "1234").is_err());
        assert!(time2ms("aa", "05", "12").is_err());
    }

    #[test]
    fn test_format_times() {
        assert_eq!(ms2formattime(62003), "01:02.003");
        assert_eq!(ms2roundedtime(62003), "01:02.00");
        assert_eq!(ms2roundedtime(59_996), "01:00.00");
        assert_eq!(ms2roundedtime(62_345), "01:02.35");
        assert_eq!(ms2formattime(6_000_000), "100:00.000");
    }

    #[test]
    fn test_tag_line() {
        assert_eq!(parse_tag_line("[ti: 晴天 ]"), Some(("ti", "晴天")));
        assert_eq!(parse_tag_line("[offset:+100]"), Some(("offset", "+100")));
        assert_eq!(parse_tag_line("[00:12.34]歌词"), None);
        assert_eq!(parse_tag_line("[00:12.34]"), None);
    }

    #[test]
    fn test_line_header() {
        assert_eq!(split_line_header("[1000,2500]abc"), Some((1000, 2500, "abc")));
        assert_eq!(split_line_header("[00:01.00]abc"), None);
    }
}
