//! QQ 音乐 `musicu.fcg` 接口的响应模型。
//! 接口来源于 <https://github.com/luren-dc/QQMusicApi>

use serde::Deserialize;

/// 每个业务对象都带有的 `code` 字段。
#[derive(Debug, Deserialize)]
pub struct BusinessCode {
    /// 0 表示成功。
    pub code: i64,
}

// =================================================================
// 搜索 ( `music.search.SearchCgiService.DoSearchForQQMusicMobile` )
// =================================================================

#[derive(Debug, Deserialize)]
pub struct SearchResult {
    pub data: Option<SearchData>,
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub body: Option<SearchBody>,
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub item_song: Vec<Song>,
}

/// 搜索结果中的一首歌。
#[derive(Debug, Deserialize, Clone)]
pub struct Song {
    /// 数字 ID。
    pub id: Option<u64>,
    /// 媒体 ID，获取歌词时优先使用。
    pub mid: String,
    pub title: String,
    #[serde(default)]
    pub singer: Vec<Singer>,
    pub album: Option<Album>,
    /// 时长，单位秒。
    #[serde(default)]
    pub interval: u64,
    /// 同一首歌的其他版本。
    #[serde(rename = "grp")]
    pub group: Option<Vec<Self>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Singer {
    #[serde(alias = "singerName")]
    pub name: String,
    #[serde(alias = "singerMID")]
    pub mid: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Album {
    pub mid: Option<String>,
    #[serde(default)]
    pub name: String,
}

// =================================================================
// 歌词 ( `music.musichallSong.PlayLyricInfo.GetPlayLyricInfo` )
// =================================================================

#[derive(Debug, Deserialize)]
pub struct LyricResult {
    pub data: LyricData,
}

/// 三个声道的密文。没有内容的声道是空字符串。
#[derive(Debug, Deserialize)]
pub struct LyricData {
    #[serde(default)]
    pub lyric: String,
    #[serde(default)]
    pub trans: String,
    #[serde(default)]
    pub roma: String,
}
