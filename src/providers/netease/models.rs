//! 网易云音乐 EAPI 接口的请求与响应模型。
//! API 来源于 <https://github.com/NeteaseCloudMusicApiReborn/api>

use serde::{Deserialize, Serialize};

/// 所有接口都带有的返回码，`200` 表示成功。
#[derive(Debug, Deserialize)]
pub struct ApiCode {
    pub code: i64,
    #[serde(alias = "msg")]
    pub message: Option<String>,
}

// =================================================================
// 匿名登录 (`/api/register/anonimous`)
// =================================================================

#[derive(Debug, Serialize)]
pub struct AnonymousLoginPayload<'a> {
    pub username: &'a str,
}

// =================================================================
// 搜索 (`/api/cloudsearch/pc`)
// =================================================================

/// 字段顺序即序列化后的 JSON 顺序，参与签名。
#[derive(Debug, Serialize)]
pub struct SearchPayload<'a> {
    pub s: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub limit: u32,
    pub offset: u32,
    pub total: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub code: i64,
    pub result: Option<SearchResultData>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResultData {
    #[serde(default)]
    pub songs: Vec<Song>,
}

/// 搜索结果中的一首歌。
#[derive(Debug, Deserialize)]
pub struct Song {
    pub id: u64,
    pub name: String,
    #[serde(rename = "ar", default)]
    pub artists: Vec<Artist>,
    #[serde(rename = "al")]
    pub album: Option<Album>,
    /// 时长，单位毫秒。
    #[serde(rename = "dt", default)]
    pub duration: u64,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

// =================================================================
// 歌词 (`/api/song/lyric/v1`)
// =================================================================

#[derive(Debug, Serialize)]
pub struct LyricPayload<'a> {
    pub id: &'a str,
    pub cp: &'static str,
    pub lv: &'static str,
    pub kv: &'static str,
    pub tv: &'static str,
    pub rv: &'static str,
    pub yv: &'static str,
    pub ytv: &'static str,
    pub yrv: &'static str,
    pub csrf_token: &'static str,
}

impl<'a> LyricPayload<'a> {
    /// 请求所有声道的最新版本。
    pub const fn all_channels(id: &'a str) -> Self {
        Self {
            id,
            cp: "false",
            lv: "0",
            kv: "0",
            tv: "0",
            rv: "0",
            yv: "0",
            ytv: "0",
            yrv: "0",
            csrf_token: "",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LyricResult {
    pub code: i64,
    /// 逐行 LRC。
    pub lrc: Option<LyricData>,
    /// 翻译。
    pub tlyric: Option<LyricData>,
    /// 罗马音。
    pub romalrc: Option<LyricData>,
    /// 逐字 YRC。
    pub yrc: Option<LyricData>,
}

#[derive(Debug, Deserialize)]
pub struct LyricData {
    #[serde(default)]
    pub lyric: String,
}

impl LyricData {
    /// 去掉空白后非空的歌词文本。
    pub fn non_empty(data: Option<Self>) -> Option<String> {
        data.map(|d| d.lyric).filter(|text| !text.trim().is_empty())
    }
}
