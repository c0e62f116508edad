mod common;

use std::{fs, sync::Arc};

use lyrics_sync_rs::{
    AppConfig, LocalTrack, MatchEngine, MatchStatus, Platform, PlatformClient, SearchAggregator,
    http::HttpClient,
    matching::{BatchRunner, MatchOptions, SidecarFileWriter, WriteMode},
    providers::{KugouMusic, NeteaseClient, QqMusic, qq::qrc_codec::encrypt_qrc},
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use common::{MockHttpClient, init_tracing};

const QQ_SEARCH: &str = include_str!("test_data/qq_search.json");
const KUGOU_REGISTER: &str = include_str!("test_data/kugou_register.json");
const KUGOU_SEARCH: &str = include_str!("test_data/kugou_search.json");

const QRC_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<QrcInfos>
<LyricInfo LyricCount="1">
<Lyric_1 LyricType="1" LyricContent="[1000,1000]故(1000,500)事(1500,500)
"/>
</LyricInfo>
</QrcInfos>"#;

fn qq_mock() -> MockHttpClient {
    let lyric = json!({
        "code": 0,
        "music.musichallSong.PlayLyricInfo.GetPlayLyricInfo": {
            "code": 0,
            "data": { "lyric": encrypt_qrc(QRC_XML).unwrap(), "trans": "", "roma": "" }
        }
    })
    .to_string();

    MockHttpClient::new()
        .route("DoSearchForQQMusicMobile", 200, QQ_SEARCH)
        .route("GetPlayLyricInfo", 200, lyric)
}

fn clients(http: &Arc<dyn HttpClient>) -> Vec<PlatformClient> {
    vec![
        PlatformClient::Netease(NeteaseClient::with_http_client(Arc::clone(http))),
        PlatformClient::QqMusic(QqMusic::with_http_client(Arc::clone(http))),
        PlatformClient::Kugou(KugouMusic::with_http_client(Arc::clone(http))),
    ]
}

#[tokio::test]
async fn test_aggregator_merges_and_tolerates_failures() {
    init_tracing();
    let http: Arc<dyn HttpClient> = Arc::new(
        qq_mock()
            .route("r_register_dev", 200, KUGOU_REGISTER)
            .route("v3/search/song", 200, KUGOU_SEARCH)
            .fail("interface.music.163.com"),
    );
    let aggregator = SearchAggregator::new(clients(&http));

    let songs = aggregator.search("晴天", 1).await;
    let ids: Vec<(Platform, &str)> = songs.iter().map(|s| (s.platform, s.id.as_str())).collect();
    assert_eq!(
        ids,
        vec![
            (Platform::QqMusic, "0039MnYb0qxYhV"),
            (Platform::Kugou, "B3A4F5D0C1E2F3A4B5C6D7E8F9A0B1C2"),
            (Platform::QqMusic, "002LIVE0001"),
            (Platform::QqMusic, "004Z8Ihr0JIu5s"),
        ]
    );

    let per_platform = aggregator.search_per_platform("晴天", 1).await;
    let netease = per_platform
        .iter()
        .find(|(p, _)| *p == Platform::Netease)
        .unwrap();
    assert!(netease.1.is_empty());
}

#[tokio::test]
async fn test_aggregator_respects_custom_priority() {
    let http: Arc<dyn HttpClient> = Arc::new(
        qq_mock()
            .route("r_register_dev", 200, KUGOU_REGISTER)
            .route("v3/search/song", 200, KUGOU_SEARCH)
            .fail("interface.music.163.com"),
    );
    let aggregator = SearchAggregator::new(clients(&http))
        .with_priority(vec![Platform::Kugou, Platform::QqMusic]);

    let songs = aggregator.search("晴天", 1).await;
    assert_eq!(songs[0].platform, Platform::Kugou);
    assert_eq!(songs[1].platform, Platform::QqMusic);

    let lyrics = aggregator.fetch_lyrics(&songs[1]).await.unwrap();
    assert_eq!(lyrics.platform, Platform::QqMusic);
}

#[tokio::test]
async fn test_match_engine_writes_sidecar_lrc() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let audio = dir.path().join("晴天.flac");
    fs::write(&audio, b"fLaC").unwrap();

    let http: Arc<dyn HttpClient> = Arc::new(qq_mock());
    let engine = MatchEngine::new(QqMusic::with_http_client(http))
        .with_tag_writer(Arc::new(SidecarFileWriter));

    let track = LocalTrack {
        path: audio.clone(),
        title: Some("晴天".to_string()),
        artist: Some("周杰伦".to_string()),
        album: Some("叶惠美".to_string()),
        duration_ms: None,
    };
    let result = engine.match_track(&track).await.unwrap();

    assert_eq!(result.status, MatchStatus::Matched);
    assert!((result.confidence - 1.0).abs() < 1e-9);
    assert_eq!(result.song.as_ref().unwrap().id, "0039MnYb0qxYhV");
    assert!(result.lyrics_saved);

    let lyrics = result.lyrics.unwrap();
    assert!(lyrics.contains("[00:01.00]故[00:01.50]事[00:02.00]"));
    let written = fs::read_to_string(dir.path().join("晴天.lrc")).unwrap();
    assert_eq!(written, lyrics);
}

#[tokio::test]
async fn test_match_engine_rejects_low_confidence() {
    let http: Arc<dyn HttpClient> = Arc::new(qq_mock());
    let engine = MatchEngine::new(QqMusic::with_http_client(http.clone())).with_options(
        MatchOptions {
            threshold: 0.95,
            ..MatchOptions::default()
        },
    );

    let track = LocalTrack {
        path: "/music/unknown.mp3".into(),
        title: Some("晴天天".to_string()),
        artist: Some("某人".to_string()),
        ..Default::default()
    };
    let result = engine.match_track(&track).await.unwrap();
    assert_eq!(result.status, MatchStatus::Failed);
    assert!(result.confidence < 0.95);
    assert!(result.lyrics.is_none());
}

#[tokio::test]
async fn test_match_without_lyrics_fetch() {
    let http = Arc::new(qq_mock());
    let engine = MatchEngine::new(QqMusic::with_http_client(http.clone())).with_options(
        MatchOptions {
            fetch_lyrics: false,
            write_mode: WriteMode::Both,
            ..MatchOptions::default()
        },
    );

    let result = engine
        .match_track(&LocalTrack::from_path("/music/晴天.mp3"))
        .await
        .unwrap();
    assert_eq!(result.status, MatchStatus::Matched);
    assert!(result.lyrics.is_none());
    assert!(!result.lyrics_saved);
    assert_eq!(http.count("GetPlayLyricInfo"), 0);
}

#[tokio::test]
async fn test_batch_over_mocked_platform() {
    let dir = tempfile::tempdir().unwrap();
    let http: Arc<dyn HttpClient> = Arc::new(qq_mock());
    let engine = Arc::new(
        MatchEngine::new(QqMusic::with_http_client(http)).with_tag_writer(Arc::new(SidecarFileWriter)),
    );

    let tracks = vec![
        LocalTrack::from_path(dir.path().join("晴天.flac")),
        LocalTrack::from_path(dir.path().join("完全不相关的名字 xyz.flac")),
        LocalTrack::from_path(dir.path().join("七里香.mp3")),
    ];
    let report = BatchRunner::new(engine, 3)
        .run(tracks.clone(), CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.matched + report.failed + report.errors, 3);
    assert_eq!(report.results[0].status, MatchStatus::Matched);
    assert_eq!(report.results[1].status, MatchStatus::Failed);
    for (result, track) in report.results.iter().zip(&tracks) {
        assert_eq!(result.track.path, track.path);
    }
    assert!(dir.path().join("晴天.lrc").exists());
}

#[tokio::test]
async fn test_engine_from_config_uses_primary_platform() {
    let mut config = AppConfig::default();
    config.primary_platform = Platform::Kugou;
    config.matching.threshold = 0.8;

    let http: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new());
    let engine = MatchEngine::from_config(&config, http);
    assert_eq!(lyrics_sync_rs::LyricsProvider::platform(engine.provider()), Platform::Kugou);
    assert!((engine.options().threshold - 0.8).abs() < f64::EPSILON);
}
