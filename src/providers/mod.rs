//! 音乐平台客户端。
//!
//! 每个平台只实现两件事：搜索歌曲、获取原始歌词载荷。
//! 解密、解析与格式转换都在平台之外完成。

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{
    error::{LyricsError, Result},
    http::{HttpClient, HttpResponse, ReqwestClient},
    model::song::{Platform, RawLyrics, SongInfo},
};

pub mod kugou;
pub mod netease;
pub mod qq;

pub use self::{kugou::KugouMusic, netease::NeteaseClient, qq::QqMusic};

/// 所有平台客户端共同实现的能力。
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    /// 客户端对应的平台。
    fn platform(&self) -> Platform;

    /// 按关键词搜索歌曲，`page` 从 1 开始。返回的顺序即平台给出的排名。
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>>;

    /// 获取一首歌的原始歌词载荷。
    ///
    /// # 参数
    /// * `song` - 由同一平台的 `search` 返回的歌曲。
    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics>;
}

/// 三个平台客户端的封闭集合，按 `Platform` 选择。
#[derive(Debug)]
pub enum PlatformClient {
    QqMusic(QqMusic),
    Kugou(KugouMusic),
    Netease(NeteaseClient),
}

impl PlatformClient {
    /// 使用共享的 HTTP 客户端创建指定平台的客户端。
    ///
    /// 酷狗会尝试读取磁盘上缓存的设备 ID；其余平台的会话都在第一次请求时建立。
    pub fn for_platform(platform: Platform, http_client: Arc<dyn HttpClient>) -> Self {
        match platform {
            Platform::QqMusic => Self::QqMusic(QqMusic::with_http_client(http_client)),
            Platform::Kugou => Self::Kugou(KugouMusic::with_cached_session(http_client)),
            Platform::Netease => Self::Netease(NeteaseClient::with_http_client(http_client)),
        }
    }

    /// 使用默认的 `reqwest` 客户端创建。
    pub fn new(platform: Platform) -> Result<Self> {
        Ok(Self::for_platform(platform, Arc::new(ReqwestClient::new()?)))
    }

    /// 为列表中的每个平台各创建一个客户端，顺序不变。
    pub fn for_platforms(platforms: &[Platform], http_client: &Arc<dyn HttpClient>) -> Vec<Self> {
        platforms
            .iter()
            .map(|&p| Self::for_platform(p, Arc::clone(http_client)))
            .collect()
    }

    fn inner(&self) -> &dyn LyricsProvider {
        match self {
            Self::QqMusic(client) => client,
            Self::Kugou(client) => client,
            Self::Netease(client) => client,
        }
    }
}

#[async_trait]
impl LyricsProvider for PlatformClient {
    fn platform(&self) -> Platform {
        self.inner().platform()
    }

    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>> {
        self.inner().search(keyword, page).await
    }

    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        self.inner().fetch_lyrics(song).await
    }
}

/// 检查一次请求的结果。连接失败和非 2xx 状态码都视为平台错误。
pub(crate) fn checked_response(
    platform: Platform,
    result: Result<HttpResponse>,
) -> Result<HttpResponse> {
    let response = result.map_err(|e| match e {
        LyricsError::Http(message) => LyricsError::api(platform, -1, message),
        other => other,
    })?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(LyricsError::api(
            platform,
            i64::from(response.status),
            format!("HTTP 状态码 {}", response.status),
        ))
    }
}

/// 把平台返回的 JSON 文本解析为模型，空响应和格式不符都视为平台错误。
pub(crate) fn parse_platform_json<T: DeserializeOwned>(platform: Platform, text: &str) -> Result<T> {
    if text.trim().is_empty() {
        return Err(LyricsError::api(platform, -1, "空响应"));
    }
    serde_json::from_str(text)
        .map_err(|e| LyricsError::api(platform, -1, format!("无法识别的响应: {e}")))
}

/// 确认歌曲来自期望的平台。
pub(crate) fn ensure_platform(expected: Platform, song: &SongInfo) -> Result<()> {
    if song.platform == expected {
        Ok(())
    } else {
        Err(LyricsError::Internal(format!(
            "歌曲 {} 来自 {}，不能交给 {expected} 获取歌词",
            song.id, song.platform
        )))
    }
}

#[async_trait]
impl<P: LyricsProvider + ?Sized> LyricsProvider for Arc<P> {
    fn platform(&self) -> Platform {
        (**self).platform()
    }

    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<SongInfo>> {
        (**self).search(keyword, page).await
    }

    async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        (**self).fetch_lyrics(song).await
    }
}
