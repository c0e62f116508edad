//! 酷狗音乐接口的响应模型。
//! 接口来源于 <https://github.com/MakcRe/KuGouMusicApi>

use serde::{Deserialize, Deserializer};

/// 设备注册接口的响应。
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    /// `1` 表示成功。
    pub status: i32,
    pub data: Option<RegisterData>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterData {
    pub dfid: String,
}

// =================================================================
// 歌曲搜索 (`/v3/search/song`)
// =================================================================

/// 歌曲搜索接口的顶层响应。
#[derive(Debug, Deserialize)]
pub struct SearchSongResponse {
    /// `1` 表示成功。
    pub status: i32,

    /// `0` 表示成功。
    pub error_code: Option<i32>,

    #[serde(rename = "error_msg")]
    pub error: Option<String>,

    pub data: Option<SearchSongData>,
}

#[derive(Debug, Deserialize)]
pub struct SearchSongData {
    #[serde(default)]
    pub lists: Vec<SongItem>,
}

/// 搜索结果中的一首歌曲。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SongItem {
    /// 文件哈希，获取歌词时使用。
    pub file_hash: String,

    #[serde(rename = "OriSongName")]
    pub song_name: String,

    #[serde(default)]
    pub album_name: String,

    /// 时长，单位秒。
    #[serde(default)]
    pub duration: u64,

    #[serde(rename = "AlbumID", default)]
    pub album_id: String,

    #[serde(rename = "Audioid", default)]
    pub audio_id: u64,

    #[serde(default)]
    pub singers: Vec<SingerInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SingerInfo {
    #[serde(default)]
    pub id: u64,
    pub name: String,
}

// =================================================================
// 歌词搜索与下载 (`lyrics.kugou.com`)
// =================================================================

/// 按 hash 搜索歌词的响应，`200` 表示成功。
#[derive(Debug, Deserialize)]
pub struct SearchLyricsResponse {
    pub status: i32,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// 一个可下载的歌词版本。
#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub accesskey: String,
}

/// 歌词下载接口的响应。
#[derive(Debug, Deserialize)]
pub struct LyricDownloadResponse {
    /// Base64 编码的 KRC 密文。
    #[serde(default)]
    pub content: String,
}

// =================================================================
// KRC `[language:...]` 标签中的内嵌翻译
// =================================================================

/// `language` 标签解码后的 JSON。
#[derive(Debug, Deserialize)]
pub struct KrcLanguageRoot {
    #[serde(default)]
    pub content: Vec<KrcLanguageItem>,
}

/// 一种内嵌歌词。
#[derive(Debug, Deserialize)]
pub struct KrcLanguageItem {
    /// `1` 为翻译，`0` 为罗马音。
    #[serde(rename = "type")]
    pub kind: i32,
    /// 每行一个数组；翻译每行只有一个元素，罗马音按字拆开。
    #[serde(rename = "lyricContent", default)]
    pub lyric_content: Vec<Vec<String>>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_id_accepts_numbers() {
        let resp: SearchLyricsResponse = serde_json::from_str(
            r#"{"status":200,"candidates":[{"id":12345,"accesskey":"ABC"},{"id":"678","accesskey":"D"}]}"#,
        )
        .unwrap();
        assert_eq!(resp.candidates[0].id, "12345");
        assert_eq!(resp.candidates[1].id, "678");
    }
}
