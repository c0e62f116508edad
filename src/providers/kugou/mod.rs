//! 酷狗音乐客户端。
//!
//! API 来源于 <https://github.com/MakcRe/KuGouMusicApi>
//!
//! 会话是一个注册过的设备 DFID，`mid` 与 `uuid` 都由它派生。
//! 获取歌词分两步：先按文件 hash 搜索歌词候选，再下载第一个候选的 KRC 密文。

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use const_format::formatcp;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{info, instrument, trace, warn};

use crate::{
    config::{load_cached_config, save_cached_config},
    error::{LyricsError, Result},
    http::{HttpClient, HttpMethod},
    model::{
        session::{Grant, SessionStore},
        song::{LyricDialect, LyricPayload, Platform, RawLyrics, SongInfo},
    },
    providers::{LyricsProvider, checked_response, ensure_platform, parse_platform_json},
};

pub mod decrypter;
pub mod models;
pub mod signature;

const KUGOU_ANDROID_USER_AGENT: &str = "Android15-1070-11083-46-0-DiscoveryDRADProtocol-wifi";
const APP_ID: &str = "1005";
const CLIENT_VER: &str = "12569";
const REGISTER_APP_ID: &str = "1014";
const KG_TID: &str = "255";

const KUGOU_API_GATEWAY: &str = "https://gateway.kugou.com";
const USER_SERVICE_URL: &str = "https://userservice.kugou.com";
const LYRICS_API_URL: &str = "https://lyrics.kugou.com";

const API_URL_REGISTER_DEV: &str = formatcp!("{USER_SERVICE_URL}/risk/v1/r_register_dev");
const API_URL_SEARCH_SONG: &str = formatcp!("{KUGOU_API_GATEWAY}/v3/search/song");
const API_URL_LYRICS_SEARCH: &str = formatcp!("{LYRICS_API_URL}/search");
const API_URL_LYRICS_DOWNLOAD: &str = formatcp!("{LYRICS_API_URL}/download");

const X_ROUTER_COMPLEX_SEARCH: &str = "complexsearch.kugou.com";

const CACHE_FILENAME: &str = "kugou_session.json";
const DFID_LIFETIME_DAYS: i64 = 7;
const SEARCH_PAGE_SIZE: u32 = 30;

/// 磁盘上缓存的设备信息。
#[derive(Serialize, Deserialize, Debug, Clone)]
struct KugouCache {
    dfid: String,
}

/// 一个注册过的酷狗设备。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KugouDevice {
    pub dfid: String,
    /// `md5(dfid)`
    pub mid: String,
    /// `md5(dfid + mid)`
    pub uuid: String,
}

impl KugouDevice {
    #[must_use]
    pub fn from_dfid(dfid: impl Into<String>) -> Self {
        let dfid = dfid.into();
        let mid = hex::encode(Md5::digest(dfid.as_bytes()));
        let uuid = hex::encode(Md5::digest(format!("{dfid}{mid}").as_bytes()));
        Self { dfid, mid, uuid }
    }
}

fn current_timestamp_sec() -> String {
    Utc::now().timestamp().to_string()
}

/// 酷狗音乐客户端。
#[derive(Debug)]
pub struct KugouMusic {
    http_client: Arc<dyn HttpClient>,
    session: SessionStore<KugouDevice>,
    persist_session: bool,
}

impl KugouMusic {
    /// 使用给定的 HTTP 客户端创建，不读写磁盘缓存。
    #[must_use]
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            session: SessionStore::new(),
            persist_session: false,
        }
    }

    /// 创建客户端，并尝试复用磁盘上七天内注册的 DFID。新注册的 DFID 也会写回缓存。
    #[must_use]
    pub fn with_cached_session(http_client: Arc<dyn HttpClient>) -> Self {
        let session = match load_cached_config::<KugouCache>(CACHE_FILENAME) {
            Ok(cached) => {
                let expires_at = cached.last_updated + Duration::days(DFID_LIFETIME_DAYS);
                if expires_at > Utc::now() {
                    info!("使用缓存的酷狗 DFID");
                } else {
                    info!("酷狗 DFID 缓存已过期");
                }
                SessionStore::with_grant(Grant {
                    credentials: KugouDevice::from_dfid(cached.data.dfid),
                    expires_at,
                })
            }
            Err(_) => SessionStore::new(),
        };

        Self {
            http_client,
            session,
            persist_session: true,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore<KugouDevice> {
        &self.session
    }

    async fn device(&self) -> Result<KugouDevice> {
        self.session
            .get_or_authenticate(|| async {
                info!("正在为酷狗注册新设备");
                let device = self.register_device().await?;
                if self.persist_session
                    && let Err(e) = save_cached_config(
                        CACHE_FILENAME,
                        &KugouCache {
                            dfid: device.dfid.clone(),
                        },
                    )
                {
                    warn!(error = %e, "保存酷狗 DFID 失败");
                }
                Ok(Grant {
                    credentials: device,
                    expires_at: Utc::now() + Duration::days(DFID_LIFETIME_DAYS),
                })
            })
            .await
    }

    async fn register_device(&self) -> Result<KugouDevice> {
        let payload = json!({
            "mid": "",
            "uuid": "",
            "appid": REGISTER_APP_ID,
            "userid": "0",
        });
        let encoded_payload = STANDARD.encode(payload.to_string());

        let mut params = BTreeMap::new();
        params.insert("appid".to_string(), REGISTER_APP_ID.to_string());
        params.insert("clientver".to_string(), CLIENT_VER.to_string());
        params.insert("clienttime".to_string(), current_timestamp_sec());
        params.insert("dfid".to_string(), "-".to_string());
        params.insert("mid".to_string(), String::new());
        params.insert("uuid".to_string(), String::new());
        params.insert("userid".to_string(), "0".to_string());
        params.insert("platid".to_string(), "4".to_string());
        params.insert("p.token".to_string(), String::new());

        let signature = signature::signature_register_params(&params, REGISTER_APP_ID);
        params.insert("signature".to_string(), signature);

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| LyricsError::Internal(format!("无法编码查询参数: {e}")))?;
        let url = format!("{API_URL_REGISTER_DEV}?{query}");

        let header_mid = hex::encode(Md5::digest(b"-"));
        let headers = [
            ("User-Agent", KUGOU_ANDROID_USER_AGENT),
            ("mid", header_mid.as_str()),
        ];

        let response = checked_response(
            Platform::Kugou,
            self.http_client
                .request_with_headers(
                    HttpMethod::Post,
                    &url,
                    &headers,
                    Some(encoded_payload.as_bytes()),
                )
                .await,
        )?;

        let text = response.text()?;
        trace!(response.body = %text, "设备注册响应");

        let register: models::RegisterResponse = parse_platform_json(Platform::Kugou, &text)?;
        match register.data {
            Some(data) if register.status == 1 && !data.dfid.is_empty() => {
                Ok(KugouDevice::from_dfid(data.dfid))
            }
            _ => Err(LyricsError::api(
                Platform::Kugou,
                i64::from(register.status),
                "设备注册失败",
            )),
        }
    }

    /// 执行需要安卓签名的 GET 请求。
    async fn execute_signed_get<R>(
        &self,
        url: &str,
        mut params: BTreeMap<String, String>,
        x_router: Option<&str>,
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let device = self.device().await?;
        params.insert("appid".to_string(), APP_ID.to_string());
        params.insert("clientver".to_string(), CLIENT_VER.to_string());
        params.insert("clienttime".to_string(), current_timestamp_sec());
        params.insert("dfid".to_string(), device.dfid);
        params.insert("mid".to_string(), device.mid);
        params.insert("uuid".to_string(), device.uuid);
        params.insert("userid".to_string(), "0".to_string());

        let signature = signature::signature_android_params(&params, "");
        params.insert("signature".to_string(), signature);

        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| LyricsError::Internal(format!("无法编码查询参数: {e}")))?;
        let full_url = format!("{url}?{query}");

        let mut headers = vec![("User-Agent", KUGOU_ANDROID_USER_AGENT), ("kg-tid", KG_TID)];
        if let Some(router) = x_router {
            headers.push(("x-router", router));
        }

        let response = checked_response(
            Platform::Kugou,
            self.http_client
                .request_with_headers(HttpMethod::Get, &full_url, &headers, None)
                .await,
        )?;

        let text = response.text()?;
        trace!(url = url, response.body = %text, "原始 JSON 响应");
        parse_platform_json(Platform::Kugou, &text)
    }

    async fn get_json<R: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<R> {
        let response = checked_response(
            Platform::Kugou,
            self.http_client
                .get_with_params_and_headers(url, params, &[("User-Agent", KUGOU_ANDROID_USER_AGENT)])
                .await,
        )?;

        let text = response.text()?;
        trace!(url = url, response.body = %text, "原始 JSON 响应");
        parse_platform_json(Platform::Kugou, &text)
    }
}

impl From<models::SongItem> for SongInfo {
    fn from(song: models::SongItem) -> Self {
        let mut extra = std::collections::BTreeMap::new();
        extra.insert("hash".to_string(), song.file_hash.clone());
        if !song.album_id.is_empty() {
            extra.insert("album_id".to_string(), song.album_id);
        }
        if song.audio_id != 0 {
            extra.insert("album_audio_id".to_string(), song.audio_id.to_string());
        }

        Self {
            id: song.file_hash,
            title: song.song_name,
            artists: song.singers.into_iter().map(|s| s.name).collect(),
            album: (!song.album_name.is_empty()).then_some(song.album_name),
            duration_ms: (song.duration > 0).then(|| song.duration * 1000),
            platform: Platform::Kugou,
            extra,
        }
    }
}

#[async_trait]
impl LyricsProvider for KugouMusic {
    fn platform(&self) -> Platform {
        Platform::Kugou
    }

    #[instrument(skip(self), fields(platform = "kugou"))]
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>> {
        let mut params = BTreeMap::new();
        params.insert("iscorrection".to_string(), "1".to_string());
        params.insert("keyword".to_string(), keyword.to_string());
        params.insert("page".to_string(), page.max(1).to_string());
        params.insert("pagesize".to_string(), SEARCH_PAGE_SIZE.to_string());
        params.insert("platform".to_string(), "AndroidFilter".to_string());
        params.insert("albumhide".to_string(), "0".to_string());
        params.insert("nocollect".to_string(), "0".to_string());

        let resp: models::SearchSongResponse = self
            .execute_signed_get(API_URL_SEARCH_SONG, params, Some(X_ROUTER_COMPLEX_SEARCH))
            .await?;

        if resp.status != 1 || resp.error_code != Some(0) {
            return Err(LyricsError::api(
                Platform::Kugou,
                resp.error_code.map_or(-1, i64::from),
                resp.error.unwrap_or_else(|| "搜索失败".to_string()),
            ));
        }

        Ok(resp
            .data
            .map(|data| data.lists.into_iter().map(SongInfo::from).collect())
            .unwrap_or_default())
    }

    /// 按文件 hash 获取 KRC 密文。
    #[instrument(skip(self, song), fields(platform = "kugou", hash = %song.id))]
    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        ensure_platform(Platform::Kugou, song)?;
        let hash = song.extra("hash").unwrap_or(song.id.as_str());

        let search: models::SearchLyricsResponse = self
            .get_json(
                API_URL_LYRICS_SEARCH,
                &[
                    ("ver", "1"),
                    ("man", "yes"),
                    ("client", "pc"),
                    ("keyword", ""),
                    ("hash", hash),
                ],
            )
            .await?;

        if search.status != 200 {
            return Err(LyricsError::api(
                Platform::Kugou,
                i64::from(search.status),
                "歌词搜索失败",
            ));
        }

        let candidate = search
            .candidates
            .first()
            .ok_or(LyricsError::LyricNotFound)?;

        let download: models::LyricDownloadResponse = self
            .get_json(
                API_URL_LYRICS_DOWNLOAD,
                &[
                    ("ver", "1"),
                    ("client", "pc"),
                    ("id", candidate.id.as_str()),
                    ("accesskey", candidate.accesskey.as_str()),
                    ("fmt", "krc"),
                    ("charset", "utf8"),
                ],
            )
            .await?;

        if download.content.trim().is_empty() {
            return Err(LyricsError::LyricNotFound);
        }

        Ok(RawLyrics {
            platform: Platform::Kugou,
            dialect: LyricDialect::Krc,
            main: LyricPayload::Krc(download.content),
            translation: None,
            romanization: None,
        })
    }
}
