use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lyrics_sync_rs::{
    AppConfig, BatchRunner, LocalTrack, LyricsBundle, LyricsProvider, MatchEngine, MatchStatus,
    OutputFormat, Platform, PlatformClient, RenderOptions, Result, SearchAggregator, SongInfo,
    converter::write_lyrics_file,
    http::{HttpClient, ReqwestClient},
    matching::{SidecarFileWriter, SystemDeviceInfo},
    parse_lyrics,
};

const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "flac", "m4a", "ogg", "opus", "wav", "ape"];

#[derive(Debug, Parser)]
#[command(name = "lyrics-sync", version, about = "获取、解密、转换逐字歌词，并为本地音乐批量匹配歌词")]
struct Cli {
    /// 配置文件路径，默认为用户配置目录下的 lyrics-sync/config.toml。
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 在所有平台搜索歌曲。
    Search {
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// 获取一首歌的歌词。
    Lyrics {
        /// 平台：qq、kugou、netease。
        #[arg(long)]
        platform: Platform,
        /// 平台内的歌曲 ID（QQ 音乐为 mid，酷狗为 hash）。
        id: String,
        #[arg(long)]
        format: Option<OutputFormat>,
        /// 输出目录，不指定时打印到标准输出。
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 转换本地歌词文件的格式。
    Convert {
        input: PathBuf,
        #[arg(long)]
        format: Option<OutputFormat>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 为本地音乐文件匹配歌词，结果写在音频文件旁边。
    Match {
        /// 音乐文件或目录。
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// 主平台，默认使用配置中的设置。
        #[arg(long)]
        platform: Option<Platform>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,lyrics_sync_rs=info"));
    let _ = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);

    match cli.command {
        Command::Search { keyword, page } => {
            let aggregator = SearchAggregator::from_config(&config, &http_client);
            let songs = aggregator.search(&keyword, page).await;
            if songs.is_empty() {
                println!("没有找到结果");
            }
            for song in &songs {
                print_song(song);
            }
        }
        Command::Lyrics {
            platform,
            id,
            format,
            output,
        } => {
            let client = PlatformClient::for_platform(platform, http_client);
            let song = SongInfo {
                id: id.clone(),
                title: id.clone(),
                artists: Vec::new(),
                album: None,
                duration_ms: None,
                platform,
                extra: Default::default(),
            };
            let decrypted = client.fetch_lyrics(&song).await?.decrypt()?;
            let bundle = LyricsBundle::from_decrypted(&decrypted);
            let format = format.unwrap_or(config.output_format);
            let text = bundle.render(format, &render_options(&config))?;
            emit(&text, output.as_deref(), &id, format)?;
        }
        Command::Convert {
            input,
            format,
            output,
        } => {
            let content = fs::read_to_string(&input)?;
            let parsed = parse_lyrics(&content);
            info!(dialect = %parsed.dialect, "已识别歌词格式");
            let bundle = LyricsBundle::from_parsed(parsed);
            let format = format.unwrap_or(config.output_format);
            let text = bundle.render(format, &render_options(&config))?;
            let stem = input
                .file_stem()
                .map_or_else(|| "lyrics".to_string(), |s| s.to_string_lossy().into_owned());
            emit(&text, output.as_deref(), &stem, format)?;
        }
        Command::Match {
            paths,
            platform,
            threshold,
            concurrency,
        } => {
            if let Some(platform) = platform {
                config.primary_platform = platform;
            }
            if let Some(threshold) = threshold {
                config.matching.threshold = threshold;
            }
            let override_concurrency = concurrency.or(config.matching.max_concurrency);
            run_match(&config, http_client, &paths, override_concurrency).await?;
        }
    }

    Ok(())
}

async fn run_match(
    config: &AppConfig,
    http_client: Arc<dyn HttpClient>,
    paths: &[PathBuf],
    override_concurrency: Option<usize>,
) -> Result<()> {
    let tracks: Vec<LocalTrack> = collect_audio_files(paths)?
        .into_iter()
        .map(LocalTrack::from_path)
        .collect();
    if tracks.is_empty() {
        warn!("没有找到音乐文件");
        return Ok(());
    }

    let engine = MatchEngine::from_config(config, http_client)
        .with_tag_writer(Arc::new(SidecarFileWriter));
    let runner =
        BatchRunner::for_device(Arc::new(engine), &SystemDeviceInfo, override_concurrency);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let report = runner
        .run(tracks, cancel, |progress| {
            eprintln!(
                "[{}/{}] {}",
                progress.completed,
                progress.total,
                progress
                    .current
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        })
        .await?;

    for result in &report.results {
        let detail = match result.status {
            MatchStatus::Matched => result
                .song
                .as_ref()
                .map(|s| format!("{} - {}", s.artist_line(), s.title))
                .unwrap_or_default(),
            MatchStatus::Failed => "置信度不足或无结果".to_string(),
            MatchStatus::Error => result.error.clone().unwrap_or_default(),
        };
        println!(
            "{:<8} {:.2}  {}  {detail}",
            result.status,
            result.confidence,
            result.track.path.display()
        );
    }
    println!(
        "成功 {}，失败 {}，出错 {}",
        report.matched, report.failed, report.errors
    );
    Ok(())
}

fn render_options(config: &AppConfig) -> RenderOptions {
    RenderOptions {
        channel_priority: config.channel_priority.clone(),
        ..RenderOptions::default()
    }
}

fn emit(text: &str, output: Option<&Path>, stem: &str, format: OutputFormat) -> Result<()> {
    match output {
        Some(dir) => {
            let path = write_lyrics_file(dir, stem, format, text)?;
            println!("已写入 {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn print_song(song: &SongInfo) {
    let album = song.album.as_deref().unwrap_or("-");
    println!(
        "[{}] {}  {} - {}  ({album})",
        song.platform,
        song.id,
        song.artist_line(),
        song.title
    );
}

/// 展开目录，收集扩展名是音频格式的文件。
fn collect_audio_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .collect();
            entries.sort();
            files.extend(collect_audio_files(&entries)?);
        } else if is_audio_file(path) {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}
