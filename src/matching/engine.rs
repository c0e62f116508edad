//! 单个本地文件的匹配流程：搜索、评分、获取歌词、写回。

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    config::{AppConfig, DEFAULT_MATCH_THRESHOLD},
    converter::{LyricsBundle, OutputFormat, RenderOptions},
    error::{LyricsError, Result},
    http::HttpClient,
    model::{
        matching::{LocalTrack, MatchResult, MatchStatus},
        song::SongInfo,
    },
    providers::{LyricsProvider, PlatformClient},
    search::confidence,
};

use super::collaborators::{TagWriter, WriteMode};

/// 匹配选项。
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    /// 最低置信度。
    pub threshold: f64,
    /// 匹配成功后是否获取歌词。
    pub fetch_lyrics: bool,
    /// 歌词写回方式。
    pub write_mode: WriteMode,
    /// 写回时使用的歌词格式。
    pub output_format: OutputFormat,
    pub render: RenderOptions,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            fetch_lyrics: true,
            write_mode: WriteMode::SeparateFile,
            output_format: OutputFormat::VerbatimLrc,
            render: RenderOptions::default(),
        }
    }
}

impl MatchOptions {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            threshold: config.matching.threshold,
            fetch_lyrics: config.matching.fetch_lyrics,
            write_mode: config.matching.write_mode,
            output_format: config.output_format,
            render: RenderOptions {
                channel_priority: config.channel_priority.clone(),
                ..RenderOptions::default()
            },
        }
    }
}

/// 在主平台上为本地文件寻找歌词。
#[derive(Debug)]
pub struct MatchEngine<P = PlatformClient> {
    provider: P,
    tag_writer: Option<Arc<dyn TagWriter>>,
    options: MatchOptions,
}

impl MatchEngine<PlatformClient> {
    /// 使用配置中的主平台创建。
    pub fn from_config(config: &AppConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let provider = PlatformClient::for_platform(config.primary_platform, http_client);
        Self::new(provider).with_options(MatchOptions::from_config(config))
    }
}

impl<P: LyricsProvider> MatchEngine<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            tag_writer: None,
            options: MatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// 设置写回歌词的协作者。没有设置时歌词只保存在结果里。
    #[must_use]
    pub fn with_tag_writer(mut self, tag_writer: Arc<dyn TagWriter>) -> Self {
        self.tag_writer = Some(tag_writer);
        self
    }

    #[must_use]
    pub const fn options(&self) -> &MatchOptions {
        &self.options
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// 为一个本地文件匹配歌曲。
    ///
    /// 没有搜索结果或最佳候选置信度不足时返回 `failed`，不算错误。
    /// 搜索、获取歌词和写回中的错误都会原样返回。
    #[instrument(skip(self, track), fields(path = %track.path.display(), platform = %self.provider.platform()))]
    pub async fn match_track(&self, track: &LocalTrack) -> Result<MatchResult> {
        let keyword = track.search_keyword();
        if keyword.trim().is_empty() {
            debug!("没有可用于搜索的关键词");
            return Ok(MatchResult::failed(track.clone(), None, 0.0));
        }

        let candidates = self.provider.search(&keyword, 1).await?;
        let Some(best) = candidates.into_iter().next() else {
            info!(%keyword, "没有搜索结果");
            return Ok(MatchResult::failed(track.clone(), None, 0.0));
        };

        let score = confidence(track, &best);
        if score < self.options.threshold {
            info!(
                %keyword,
                candidate = %best.title,
                confidence = score,
                "最佳候选置信度不足"
            );
            return Ok(MatchResult::failed(track.clone(), Some(best), score));
        }

        info!(candidate = %best.title, confidence = score, "匹配成功");

        let mut result = MatchResult {
            track: track.clone(),
            song: None,
            confidence: score,
            status: MatchStatus::Matched,
            error: None,
            lyrics: None,
            lyrics_saved: false,
        };

        if self.options.fetch_lyrics {
            result.lyrics = self.lyrics_for(&best).await?;
            if let (Some(lyrics), Some(writer)) = (result.lyrics.as_deref(), &self.tag_writer) {
                let outcome = writer.write_lyrics(&track.path, lyrics, self.options.write_mode)?;
                result.lyrics_saved = outcome.saved();
            }
        }

        result.song = Some(best);
        Ok(result)
    }

    /// 获取、解密、解析并渲染一首歌的歌词。平台没有歌词时返回 `None`。
    async fn lyrics_for(&self, song: &SongInfo) -> Result<Option<String>> {
        let raw = match self.provider.fetch_lyrics(song).await {
            Ok(raw) => raw,
            Err(LyricsError::LyricNotFound) => {
                warn!(song_id = %song.id, "匹配到的歌曲没有歌词");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let decrypted = raw.decrypt()?;
        let bundle = LyricsBundle::from_decrypted(&decrypted);
        if bundle.channels.is_empty() {
            warn!(song_id = %song.id, "歌词解析后为空");
            return Ok(None);
        }

        let text = bundle.render(self.options.output_format, &self.options.render)?;
        Ok(Some(text))
    }
}
