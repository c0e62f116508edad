//! 网易云音乐客户端。
//!
//! 只使用 EAPI：请求参数以 AES-128-ECB 加密后放在 `params` 表单字段中，
//! 身份是匿名登录换来的 `MUSIC_A` Cookie。
//! API 来源于 <https://github.com/NeteaseCloudMusicApiReborn/api>

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::{
    error::{LyricsError, Result},
    http::HttpClient,
    model::{
        session::{Grant, SessionStore},
        song::{LyricDialect, LyricPayload, Platform, RawLyrics, SongInfo},
    },
    providers::{LyricsProvider, checked_response, ensure_platform, parse_platform_json},
};

pub mod crypto;
pub mod models;

const ANONYMOUS_LOGIN_PATH: &str = "/api/register/anonimous";
const ANONYMOUS_LOGIN_URL: &str = "https://interface.music.163.com/eapi/register/anonimous";

const SEARCH_PATH: &str = "/api/cloudsearch/pc";
const SEARCH_URL: &str = "https://interface.music.163.com/eapi/cloudsearch/pc";

const LYRIC_PATH: &str = "/api/song/lyric/v1";
const LYRIC_URL: &str = "https://interface3.music.163.com/eapi/song/lyric/v1";

const EAPI_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Safari/537.36 Chrome/91.0.4472.164 NeteaseMusicDesktop/2.10.2.200154";
const NETEASE_REFERER: &str = "https://music.163.com";

const MUSIC_A_COOKIE: &str = "MUSIC_A";
const SUCCESS_CODE: i64 = 200;
const SEARCH_PAGE_SIZE: u32 = 30;
const TOKEN_LIFETIME_DAYS: i64 = 7;

/// 网易云音乐客户端。
#[derive(Debug)]
pub struct NeteaseClient {
    http_client: Arc<dyn HttpClient>,
    /// 匿名登录得到的 `MUSIC_A`。
    session: SessionStore<String>,
}

impl NeteaseClient {
    /// 使用给定的 HTTP 客户端创建，匿名登录在第一次请求时进行。
    #[must_use]
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            session: SessionStore::new(),
        }
    }

    /// 当前会话，可用于观察认证状态。
    #[must_use]
    pub const fn session(&self) -> &SessionStore<String> {
        &self.session
    }

    async fn music_a(&self) -> Result<String> {
        self.session
            .get_or_authenticate(|| async {
                let token = self.anonymous_login().await?;
                Ok(Grant {
                    credentials: token,
                    expires_at: Utc::now() + Duration::days(TOKEN_LIFETIME_DAYS),
                })
            })
            .await
    }

    /// 用随机设备 ID 做一次匿名登录，返回 `MUSIC_A`。
    #[instrument(skip(self))]
    async fn anonymous_login(&self) -> Result<String> {
        let device_id = Uuid::new_v4().simple().to_string().to_uppercase();
        let username = crypto::anonymous_username(&device_id);
        let payload = models::AnonymousLoginPayload {
            username: &username,
        };

        let response = self
            .post_eapi(ANONYMOUS_LOGIN_PATH, ANONYMOUS_LOGIN_URL, &payload, None)
            .await?;

        let status: models::ApiCode = parse_platform_json(Platform::Netease, &response.body)?;
        if status.code != SUCCESS_CODE {
            return Err(LyricsError::api(
                Platform::Netease,
                status.code,
                status.message.unwrap_or_else(|| "匿名登录失败".to_string()),
            ));
        }

        let token = response.music_a.ok_or_else(|| {
            LyricsError::api(Platform::Netease, -1, "匿名登录响应中没有 MUSIC_A")
        })?;

        debug!("网易云匿名登录成功");
        Ok(token)
    }

    fn build_cookie(music_a: Option<&str>) -> String {
        let now_ms = Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen_range(0..1000);

        let mut cookie = format!(
            "os=pc; appver=8.0.0; buildver={}; requestId={now_ms}_{suffix:04}",
            now_ms / 1000
        );
        if let Some(token) = music_a {
            cookie.push_str(&format!("; {MUSIC_A_COOKIE}={token}"));
        }
        cookie
    }

    /// 发送一个 EAPI 请求。响应体若不是 JSON，按 EAPI 密文解密。
    async fn post_eapi<T: Serialize>(
        &self,
        url_path: &str,
        url: &str,
        payload: &T,
        music_a: Option<&str>,
    ) -> Result<EapiResponse> {
        let params = crypto::prepare_eapi_params(url_path, payload)?;
        let cookie = Self::build_cookie(music_a);
        let headers = [
            ("User-Agent", EAPI_USER_AGENT),
            ("Referer", NETEASE_REFERER),
            ("Cookie", cookie.as_str()),
        ];

        let response = checked_response(
            Platform::Netease,
            self.http_client
                .post_form(url, &[("params", params.as_str())], &headers)
                .await,
        )?;

        let body = if response.body.trim_ascii_start().starts_with(b"{") {
            response.text()?
        } else {
            crypto::eapi_decrypt(&response.body).map_err(|e| {
                LyricsError::api(Platform::Netease, -1, format!("无法识别的响应: {e}"))
            })?
        };
        trace!(url_path = %url_path, response.body = %body, "原始 JSON 响应");

        Ok(EapiResponse {
            music_a: response.cookie(MUSIC_A_COOKIE),
            body,
        })
    }

    /// 带会话的 EAPI 请求，并把响应解析为模型。
    async fn request<T: Serialize, R: DeserializeOwned>(
        &self,
        url_path: &str,
        url: &str,
        payload: &T,
    ) -> Result<R> {
        let token = self.music_a().await?;
        let response = self.post_eapi(url_path, url, payload, Some(&token)).await?;
        parse_platform_json(Platform::Netease, &response.body)
    }
}

struct EapiResponse {
    music_a: Option<String>,
    body: String,
}

impl From<models::Song> for SongInfo {
    fn from(song: models::Song) -> Self {
        let mut extra = std::collections::BTreeMap::new();
        let album = song.album.and_then(|album| {
            if album.id != 0 {
                extra.insert("album_id".to_string(), album.id.to_string());
            }
            (!album.name.is_empty()).then_some(album.name)
        });

        Self {
            id: song.id.to_string(),
            title: song.name,
            artists: song.artists.into_iter().map(|a| a.name).collect(),
            album,
            duration_ms: (song.duration > 0).then_some(song.duration),
            platform: Platform::Netease,
            extra,
        }
    }
}

#[async_trait]
impl LyricsProvider for NeteaseClient {
    fn platform(&self) -> Platform {
        Platform::Netease
    }

    #[instrument(skip(self), fields(platform = "netease"))]
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>> {
        let payload = models::SearchPayload {
            s: keyword,
            kind: "1",
            limit: SEARCH_PAGE_SIZE,
            offset: page.saturating_sub(1) * SEARCH_PAGE_SIZE,
            total: true,
        };

        let result: models::SearchResult = self.request(SEARCH_PATH, SEARCH_URL, &payload).await?;
        if result.code != SUCCESS_CODE {
            return Err(LyricsError::api(
                Platform::Netease,
                result.code,
                "搜索接口返回错误",
            ));
        }

        Ok(result
            .result
            .map(|data| data.songs.into_iter().map(SongInfo::from).collect())
            .unwrap_or_default())
    }

    #[instrument(skip(self, song), fields(platform = "netease", song_id = %song.id))]
    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        ensure_platform(Platform::Netease, song)?;

        let payload = models::LyricPayload::all_channels(&song.id);
        let result: models::LyricResult = self.request(LYRIC_PATH, LYRIC_URL, &payload).await?;
        if result.code != SUCCESS_CODE {
            return Err(LyricsError::api(
                Platform::Netease,
                result.code,
                "歌词接口返回错误",
            ));
        }

        let (dialect, main) = match (
            models::LyricData::non_empty(result.yrc),
            models::LyricData::non_empty(result.lrc),
        ) {
            (Some(yrc), _) => (LyricDialect::Yrc, yrc),
            (None, Some(lrc)) => (LyricDialect::Lrc, lrc),
            (None, None) => {
                warn!("歌曲没有逐字或逐行歌词");
                return Err(LyricsError::LyricNotFound);
            }
        };

        Ok(RawLyrics {
            platform: Platform::Netease,
            dialect,
            main: LyricPayload::Plain(main),
            translation: models::LyricData::non_empty(result.tlyric).map(LyricPayload::Plain),
            romanization: models::LyricData::non_empty(result.romalrc).map(LyricPayload::Plain),
        })
    }
}
