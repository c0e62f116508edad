//! QQ 音乐客户端。
//!
//! 所有请求都发往 `musicu.fcg`，请求体是带 `comm` 公共字段的 JSON 信封，
//! 并以 `sign` 查询参数携带签名。
//! API 来源于 <https://github.com/luren-dc/QQMusicApi>

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::{
    error::{LyricsError, Result},
    http::{HttpClient, HttpMethod},
    model::{
        session::{Grant, SessionStore},
        song::{LyricDialect, LyricPayload, Platform, RawLyrics, SongInfo},
    },
    providers::{LyricsProvider, checked_response, ensure_platform, parse_platform_json},
};

pub mod models;
pub mod qrc_codec;
pub mod sign;

const MUSIC_U_FCG_URL: &str = "https://u.y.qq.com/cgi-bin/musicu.fcg";
const QQ_MUSIC_REFERER: &str = "https://y.qq.com/";

const SEARCH_MODULE: &str = "music.search.SearchCgiService";
const SEARCH_METHOD: &str = "DoSearchForQQMusicMobile";

const GET_LYRIC_MODULE: &str = "music.musichallSong.PlayLyricInfo";
const GET_LYRIC_METHOD: &str = "GetPlayLyricInfo";

/// 业务码：歌曲没有歌词。
const CODE_NO_LYRICS: i64 = 24001;
const SEARCH_PAGE_SIZE: u32 = 20;
const DEVICE_LIFETIME_HOURS: i64 = 24;

/// 本地生成的设备身份，作为请求的 `comm` 字段发送。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QqDevice {
    /// 36 位的 QIMEI 风格设备 ID。
    pub qimei36: String,
    /// 32 位十六进制 GUID。
    pub guid: String,
}

impl QqDevice {
    /// 生成一个新的随机设备。
    #[must_use]
    pub fn generate() -> Self {
        let qimei: String = Uuid::new_v4().simple().to_string();
        // 与官方客户端相同的 36 位长度：32 位十六进制加 4 位随机后缀
        let suffix: String = Uuid::new_v4().simple().to_string()[..4].to_string();
        Self {
            qimei36: format!("{qimei}{suffix}"),
            guid: Uuid::new_v4().simple().to_string().to_uppercase(),
        }
    }
}

/// QQ 音乐客户端。
#[derive(Debug)]
pub struct QqMusic {
    http_client: Arc<dyn HttpClient>,
    session: SessionStore<QqDevice>,
}

impl QqMusic {
    /// 使用给定的 HTTP 客户端创建，会话在第一次请求时建立。
    #[must_use]
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            session: SessionStore::new(),
        }
    }

    /// 当前会话，可用于观察认证状态。
    #[must_use]
    pub const fn session(&self) -> &SessionStore<QqDevice> {
        &self.session
    }

    async fn device(&self) -> Result<QqDevice> {
        self.session
            .get_or_authenticate(|| async {
                let device = QqDevice::generate();
                debug!(qimei36 = %device.qimei36, "已生成新的 QQ 音乐设备身份");
                Ok(Grant {
                    credentials: device,
                    expires_at: Utc::now() + Duration::hours(DEVICE_LIFETIME_HOURS),
                })
            })
            .await
    }

    fn build_comm(device: &QqDevice) -> serde_json::Value {
        json!({
            "cv": 13_020_508,
            "ct": 11,
            "v": 13_020_508,
            "QIMEI36": device.qimei36,
            "guid": device.guid,
            "tmeAppID": "qqmusic",
            "inCharset": "utf-8",
            "outCharset": "utf-8",
        })
    }

    /// 发送一个 `musicu.fcg` 请求并取出对应的业务对象。
    ///
    /// 业务码为 `24001` 时返回 `LyricNotFound`，其余非 0 业务码返回 `Api`。
    #[instrument(skip(self, param), fields(module = %module, method = %method))]
    async fn execute_api_request(
        &self,
        module: &str,
        method: &str,
        param: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let device = self.device().await?;
        let request_key = format!("{module}.{method}");

        let payload = json!({
            "comm": Self::build_comm(&device),
            &request_key: {
                "module": module,
                "method": method,
                "param": param,
            }
        });

        let signature = sign::sign(&payload)?;
        let body = serde_json::to_vec(&payload)?;
        let url = format!("{MUSIC_U_FCG_URL}?sign={signature}");
        let headers = [
            ("Content-Type", "application/json"),
            ("Referer", QQ_MUSIC_REFERER),
        ];

        let response = checked_response(
            Platform::QqMusic,
            self.http_client
                .request_with_headers(HttpMethod::Post, &url, &headers, Some(&body))
                .await,
        )?;

        let response_text = response.text()?;
        trace!(request_key = %request_key, response.body = %response_text, "原始 JSON 响应");

        let mut response_value: serde_json::Value =
            parse_platform_json(Platform::QqMusic, &response_text)?;

        let business_object = response_value
            .get_mut(&request_key)
            .map(serde_json::Value::take)
            .ok_or_else(|| {
                LyricsError::api(
                    Platform::QqMusic,
                    -1,
                    format!("响应中缺少业务对象 '{request_key}'"),
                )
            })?;

        let business_code: models::BusinessCode =
            serde_json::from_value(business_object.clone()).map_err(|e| {
                LyricsError::api(Platform::QqMusic, -1, format!("业务对象缺少 code: {e}"))
            })?;

        match business_code.code {
            0 => Ok(business_object),
            CODE_NO_LYRICS => Err(LyricsError::LyricNotFound),
            code => Err(LyricsError::api(
                Platform::QqMusic,
                code,
                format!("{request_key} 业务错误"),
            )),
        }
    }
}

impl From<&models::Song> for SongInfo {
    fn from(song: &models::Song) -> Self {
        let mut extra = std::collections::BTreeMap::new();
        extra.insert("mid".to_string(), song.mid.clone());
        if let Some(id) = song.id {
            extra.insert("song_id".to_string(), id.to_string());
        }
        if let Some(album_mid) = song.album.as_ref().and_then(|a| a.mid.clone())
            && !album_mid.is_empty()
        {
            extra.insert("album_mid".to_string(), album_mid);
        }

        Self {
            id: song.mid.clone(),
            title: song.title.clone(),
            artists: song.singer.iter().map(|s| s.name.clone()).collect(),
            album: song
                .album
                .as_ref()
                .map(|a| a.name.clone())
                .filter(|name| !name.is_empty()),
            duration_ms: (song.interval > 0).then(|| song.interval * 1000),
            platform: Platform::QqMusic,
            extra,
        }
    }
}

#[async_trait]
impl LyricsProvider for QqMusic {
    fn platform(&self) -> Platform {
        Platform::QqMusic
    }

    /// 搜索歌曲。同一首歌的其他版本紧跟在主条目之后。
    #[instrument(skip(self), fields(platform = "qq"))]
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>> {
        let param = json!({
            "num_per_page": SEARCH_PAGE_SIZE,
            "page_num": page.max(1),
            "query": keyword,
            "search_type": 0,
            "grp": 1,
            "highlight": 1,
        });

        let response_val = self
            .execute_api_request(SEARCH_MODULE, SEARCH_METHOD, param)
            .await?;
        let search: models::SearchResult = serde_json::from_value(response_val)
            .map_err(|e| LyricsError::api(Platform::QqMusic, -1, format!("搜索结果格式错误: {e}")))?;

        let Some(body) = search.data.and_then(|d| d.body) else {
            return Ok(Vec::new());
        };

        Ok(body
            .item_song
            .iter()
            .flat_map(|song| {
                std::iter::once(SongInfo::from(song))
                    .chain(song.group.iter().flatten().map(SongInfo::from))
            })
            .collect())
    }

    #[instrument(skip(self, song), fields(platform = "qq", song_id = %song.id))]
    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        ensure_platform(Platform::QqMusic, song)?;

        let mut param = serde_json::Map::new();
        if let Ok(numeric_id) = song.id.parse::<u64>() {
            param.insert("songId".to_string(), json!(numeric_id));
        } else {
            param.insert("songMid".to_string(), json!(song.id));
        }
        param.insert("qrc".to_string(), json!(1));
        param.insert("trans".to_string(), json!(1));
        param.insert("roma".to_string(), json!(1));

        let response_val = self
            .execute_api_request(
                GET_LYRIC_MODULE,
                GET_LYRIC_METHOD,
                serde_json::Value::Object(param),
            )
            .await?;
        let lyric: models::LyricResult = serde_json::from_value(response_val)
            .map_err(|e| LyricsError::api(Platform::QqMusic, -1, format!("歌词结果格式错误: {e}")))?;

        let data = lyric.data;
        if data.lyric.trim().is_empty() {
            return Err(LyricsError::LyricNotFound);
        }

        let optional = |text: String| (!text.trim().is_empty()).then_some(LyricPayload::Qrc(text));

        Ok(RawLyrics {
            platform: Platform::QqMusic,
            dialect: LyricDialect::Qrc,
            main: LyricPayload::Qrc(data.lyric),
            translation: optional(data.trans),
            romanization: optional(data.roma),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_device_shape() {
        let device = QqDevice::generate();
        assert_eq!(device.qimei36.len(), 36);
        assert_eq!(device.guid.len(), 32);
        assert_ne!(device, QqDevice::generate());
    }

    #[test]
    fn test_song_conversion_keeps_identifiers() {
        let song: models::Song = serde_json::from_value(json!({
            "id": 97773,
            "mid": "0039MnYb0qxYhV",
            "title": "晴天",
            "singer": [{"name": "周杰伦", "mid": "0025NhlN2yWrP4"}],
            "album": {"mid": "000MkMni19ClKG", "name": "叶惠美"},
            "interval": 269
        }))
        .unwrap();

        let info = SongInfo::from(&song);
        assert_eq!(info.id, "0039MnYb0qxYhV");
        assert_eq!(info.artists, vec!["周杰伦"]);
        assert_eq!(info.album.as_deref(), Some("叶惠美"));
        assert_eq!(info.duration_ms, Some(269_000));
        assert_eq!(info.extra("song_id"), Some("97773"));
        assert_eq!(info.extra("album_mid"), Some("000MkMni19ClKG"));
    }
}
