//! 多平台并发搜索与结果合并。

use std::sync::Arc;

use futures::future;
use tracing::{info, instrument, warn};

use crate::{
    config::AppConfig,
    error::{LyricsError, Result},
    http::HttpClient,
    model::song::{Platform, RawLyrics, SongInfo},
    providers::{LyricsProvider, PlatformClient},
};

pub mod matcher;

pub use self::matcher::{confidence, similarity};

/// 把同一个关键词同时发给所有平台，并按平台优先级轮流合并结果。
#[derive(Debug)]
pub struct SearchAggregator<P = PlatformClient> {
    providers: Vec<P>,
    priority: Vec<Platform>,
}

impl SearchAggregator<PlatformClient> {
    /// 按配置中的平台优先级创建三个平台的客户端。
    pub fn from_config(config: &AppConfig, http_client: &Arc<dyn HttpClient>) -> Self {
        let mut platforms = config.platform_priority.clone();
        for platform in Platform::DEFAULT_PRIORITY {
            if !platforms.contains(&platform) {
                platforms.push(platform);
            }
        }
        Self::new(PlatformClient::for_platforms(&platforms, http_client))
            .with_priority(config.platform_priority.clone())
    }
}

impl<P: LyricsProvider> SearchAggregator<P> {
    /// 使用默认优先级（QQ 音乐、酷狗、网易云）。
    #[must_use]
    pub fn new(providers: Vec<P>) -> Self {
        Self {
            providers,
            priority: Platform::DEFAULT_PRIORITY.to_vec(),
        }
    }

    /// 设置合并时的平台优先级。不在列表中的平台按注册顺序排在最后。
    #[must_use]
    pub fn with_priority(mut self, priority: Vec<Platform>) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    /// 指定平台的客户端。
    #[must_use]
    pub fn provider(&self, platform: Platform) -> Option<&P> {
        self.providers.iter().find(|p| p.platform() == platform)
    }

    /// 并发搜索所有平台并合并。单个平台失败只会让该平台的结果为空。
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str, page: u32) -> Vec<SongInfo> {
        let per_platform = self.search_per_platform(keyword, page).await;
        let merged = merge_round_robin(per_platform, &self.priority);
        info!(count = merged.len(), "多平台搜索完成");
        merged
    }

    /// 并发搜索所有平台，按注册顺序返回每个平台的结果。
    pub async fn search_per_platform(
        &self,
        keyword: &str,
        page: u32,
    ) -> Vec<(Platform, Vec<SongInfo>)> {
        let search_futures = self.providers.iter().map(|provider| async move {
            let platform = provider.platform();
            let songs = match provider.search(keyword, page).await {
                Ok(songs) => songs,
                Err(e) => {
                    warn!(%platform, error = %e, "平台搜索失败，按空结果处理");
                    Vec::new()
                }
            };
            (platform, songs)
        });

        future::join_all(search_futures).await
    }

    /// 交给歌曲所属平台的客户端获取歌词。
    pub async fn fetch_lyrics(&self, song: &SongInfo) -> Result<RawLyrics> {
        let provider = self.provider(song.platform).ok_or_else(|| {
            LyricsError::Internal(format!("没有 {} 平台的客户端", song.platform))
        })?;
        provider.fetch_lyrics(song).await
    }
}

/// 轮流合并各平台的结果：先取每个平台的第 0 条，再取第 1 条，以此类推。
///
/// 平台顺序由 `priority` 决定，不在其中的平台按 `results` 中的顺序排在后面。
#[must_use]
pub fn merge_round_robin(
    results: Vec<(Platform, Vec<SongInfo>)>,
    priority: &[Platform],
) -> Vec<SongInfo> {
    let mut remaining: Vec<Option<(Platform, Vec<SongInfo>)>> =
        results.into_iter().map(Some).collect();

    let mut ordered: Vec<std::vec::IntoIter<SongInfo>> = Vec::with_capacity(remaining.len());
    for platform in priority {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|(p, _)| p == platform))
            && let Some((_, songs)) = slot.take()
        {
            ordered.push(songs.into_iter());
        }
    }
    ordered.extend(remaining.into_iter().flatten().map(|(_, songs)| songs.into_iter()));

    let total = ordered.iter().map(ExactSizeIterator::len).sum();
    let mut merged = Vec::with_capacity(total);
    while merged.len() < total {
        for songs in &mut ordered {
            if let Some(song) = songs.next() {
                merged.push(song);
            }
        }
    }
    merged
}
