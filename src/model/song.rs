//! 平台、歌曲信息与原始歌词载荷。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    error::Result,
    providers::{kugou::decrypter, qq::qrc_codec},
};

/// 支持的音乐平台。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    /// QQ 音乐。
    #[serde(rename = "qq", alias = "qm")]
    #[strum(to_string = "qq", serialize = "qm", serialize = "qqmusic")]
    QqMusic,
    /// 酷狗音乐。
    #[serde(rename = "kugou", alias = "kg")]
    #[strum(to_string = "kugou", serialize = "kg")]
    Kugou,
    /// 网易云音乐。
    #[serde(rename = "netease", alias = "ne")]
    #[strum(to_string = "netease", serialize = "ne", serialize = "163")]
    Netease,
}

impl Platform {
    /// 默认的平台优先级：QQ 音乐、酷狗、网易云。
    pub const DEFAULT_PRIORITY: [Self; 3] = [Self::QqMusic, Self::Kugou, Self::Netease];
}

/// 搜索接口返回的一首歌曲。
///
/// 由 `search` 产生，之后只读，作为 `fetch_lyrics` 的输入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    /// 平台内的歌曲 ID。QQ 音乐为 `mid`，酷狗为文件 hash，网易云为数字 ID。
    pub id: String,
    /// 歌曲名。
    pub title: String,
    /// 艺术家列表。
    pub artists: Vec<String>,
    /// 专辑名。
    pub album: Option<String>,
    /// 时长，单位毫秒。
    pub duration_ms: Option<u64>,
    /// 来源平台。
    pub platform: Platform,
    /// 平台特有的其他标识符。
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl SongInfo {
    /// 以 `/` 连接的艺术家名称。
    #[must_use]
    pub fn artist_line(&self) -> String {
        self.artists.join("/")
    }

    /// 读取一个平台特有的标识符。
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// 歌词文本的方言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum LyricDialect {
    /// QQ 音乐逐字歌词，包裹在 XML 中。
    Qrc,
    /// 酷狗逐字歌词。
    Krc,
    /// 网易云逐字歌词。
    Yrc,
    /// LRC，包括增强型 LRC。
    Lrc,
    /// 不带时间戳的纯文本。
    #[strum(serialize = "text")]
    PlainText,
}

/// 平台返回的、尚未解密的歌词内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricPayload {
    /// QQ 音乐的十六进制密文。部分接口直接返回 Base64 文本。
    Qrc(String),
    /// 酷狗的 Base64 密文。
    Krc(String),
    /// 明文。
    Plain(String),
}

impl LyricPayload {
    /// 解密载荷，得到歌词文本。
    pub fn decrypt(&self) -> Result<String> {
        match self {
            Self::Qrc(encrypted) => qrc_codec::decrypt_with_fallback(encrypted),
            Self::Krc(encrypted) => decrypter::decrypt_krc(encrypted),
            Self::Plain(text) => Ok(text.clone()),
        }
    }
}

/// `fetch_lyrics` 的结果：各声道的原始载荷和方言提示。
#[derive(Debug, Clone)]
pub struct RawLyrics {
    /// 来源平台。
    pub platform: Platform,
    /// 主歌词的方言提示。
    pub dialect: LyricDialect,
    /// 主歌词。
    pub main: LyricPayload,
    /// 翻译。
    pub translation: Option<LyricPayload>,
    /// 罗马音。
    pub romanization: Option<LyricPayload>,
}

impl RawLyrics {
    /// 解密所有声道。空的翻译与罗马音会被丢弃。
    pub fn decrypt(&self) -> Result<DecryptedLyrics> {
        let decrypt_optional = |payload: Option<&LyricPayload>| -> Result<Option<String>> {
            match payload {
                Some(p) => {
                    let text = p.decrypt()?;
                    Ok((!text.trim().is_empty()).then_some(text))
                }
                None => Ok(None),
            }
        };

        Ok(DecryptedLyrics {
            platform: self.platform,
            dialect: self.dialect,
            main: self.main.decrypt()?,
            translation: decrypt_optional(self.translation.as_ref())?,
            romanization: decrypt_optional(self.romanization.as_ref())?,
        })
    }
}

/// 解密后的歌词文本。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedLyrics {
    /// 来源平台。
    pub platform: Platform,
    /// 主歌词的方言提示。
    pub dialect: LyricDialect,
    /// 主歌词。
    pub main: String,
    /// 翻译。
    pub translation: Option<String>,
    /// 罗马音。
    pub romanization: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_platform_names() {
        assert_eq!(Platform::from_str("QM").unwrap(), Platform::QqMusic);
        assert_eq!(Platform::from_str("kg").unwrap(), Platform::Kugou);
        assert_eq!(Platform::from_str("NetEase").unwrap(), Platform::Netease);
        assert_eq!(Platform::Kugou.to_string(), "kugou");
        assert!(Platform::from_str("spotify").is_err());
    }

    #[test]
    fn test_plain_payload_passthrough() {
        let raw = RawLyrics {
            platform: Platform::Netease,
            dialect: LyricDialect::Lrc,
            main: LyricPayload::Plain("[00:01.00]a".to_string()),
            translation: Some(LyricPayload::Plain("  ".to_string())),
            romanization: None,
        };
        let decrypted = raw.decrypt().unwrap();
        assert_eq!(decrypted.main, "[00:01.00]a");
        assert!(decrypted.translation.is_none());
    }
}
