//! # Lyrics Sync RS
//!
//! 从 QQ音乐、酷狗音乐、网易云音乐搜索歌曲、获取并解密逐字歌词，
//! 把它们解析成统一的时间轴模型后转换为 LRC、SRT、ASS，并为本地音乐文件批量匹配歌词。
//!
//! ## 主要功能
//!
//! - **歌词获取**: 三个平台的搜索与歌词接口，包括各自的请求签名与会话管理。
//! - **歌词解密**: QRC（三重 DES 变体）、KRC（异或 + zlib）、网易云 EAPI（AES-ECB）。
//! - **歌词转换**: 解析 LRC / QRC / KRC / YRC / 纯文本，输出逐行、逐字、增强型 LRC 以及 SRT、ASS。
//! - **批量匹配**: 按相似度为本地文件挑选候选歌曲，并发数随设备档位调整，可随时取消。
//!
//! ## 搜索并获取歌词
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lyrics_sync_rs::{
//!     AppConfig, LyricsBundle, OutputFormat, RenderOptions, SearchAggregator,
//!     http::{HttpClient, ReqwestClient},
//! };
//!
//! #[tokio::main]
//! async fn main() -> lyrics_sync_rs::Result<()> {
//!     let config = AppConfig::default();
//!     let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
//!     let aggregator = SearchAggregator::from_config(&config, &http_client);
//!
//!     let songs = aggregator.search("晴天 周杰伦", 1).await;
//!     if let Some(song) = songs.first() {
//!         let decrypted = aggregator.fetch_lyrics(song).await?.decrypt()?;
//!         let bundle = LyricsBundle::from_decrypted(&decrypted);
//!         println!("{}", bundle.render(OutputFormat::VerbatimLrc, &RenderOptions::default())?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## 格式转换
//!
//! ```rust
//! use lyrics_sync_rs::{LyricsBundle, OutputFormat, RenderOptions, parse_lyrics};
//!
//! let parsed = parse_lyrics("[00:01.00]Hello\n[00:02.00]World");
//! let bundle = LyricsBundle::from_parsed(parsed);
//! let srt = bundle.render(OutputFormat::Srt, &RenderOptions::default()).unwrap();
//! assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\nHello\n"));
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod http;
pub mod matching;
pub mod model;
pub mod providers;
pub mod search;

pub use crate::{
    config::AppConfig,
    converter::{LyricsBundle, OutputFormat, RenderOptions, parse_lyrics, render},
    error::{LyricsError, Result},
    matching::{BatchReport, BatchRunner, MatchEngine},
    model::{
        lyrics::{Channel, LyricLine, LyricWord, LyricsDocument, MultiTrackLyrics, TagMap},
        matching::{LocalTrack, MatchResult, MatchStatus},
        song::{Platform, RawLyrics, SongInfo},
    },
    providers::{LyricsProvider, PlatformClient},
    search::SearchAggregator,
};
