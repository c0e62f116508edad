//! 批量匹配。
//!
//! 并发数由信号量控制。每个工作任务把结果连同自己的许可一起发给汇总方，
//! 汇总方更新计数、发出进度之后才释放许可，计数只在汇总方修改。

use std::{path::PathBuf, sync::Arc};

use serde::Serialize;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, mpsc},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    error::{LyricsError, Result},
    model::matching::{LocalTrack, MatchResult, MatchStatus},
    providers::{LyricsProvider, PlatformClient},
};

use super::{collaborators::DeviceInfo, engine::MatchEngine};

/// 每处理完一个文件发出一次的进度快照。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub matched: usize,
    pub failed: usize,
    pub errors: usize,
    /// 刚处理完的文件。
    pub current: Option<PathBuf>,
}

impl BatchProgress {
    const fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            matched: 0,
            failed: 0,
            errors: 0,
            current: None,
        }
    }

    fn record(&mut self, result: &MatchResult) {
        self.completed += 1;
        match result.status {
            MatchStatus::Matched => self.matched += 1,
            MatchStatus::Failed => self.failed += 1,
            MatchStatus::Error => self.errors += 1,
        }
        self.current = Some(result.track.path.clone());
    }
}

/// 一次批量匹配的结果，顺序与输入一致。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<MatchResult>,
    pub matched: usize,
    pub failed: usize,
    pub errors: usize,
}

impl BatchReport {
    fn from_results(results: Vec<MatchResult>) -> Self {
        let count = |status| results.iter().filter(|r| r.status == status).count();
        Self {
            matched: count(MatchStatus::Matched),
            failed: count(MatchStatus::Failed),
            errors: count(MatchStatus::Error),
            results,
        }
    }
}

type WorkerMessage = (usize, MatchResult, OwnedSemaphorePermit);

/// 批量匹配的执行者。
#[derive(Debug)]
pub struct BatchRunner<P = PlatformClient> {
    engine: Arc<MatchEngine<P>>,
    concurrency: usize,
}

impl<P: LyricsProvider + 'static> BatchRunner<P> {
    /// # 参数
    /// * `concurrency` - 同时处理的文件数，至少为 1。
    #[must_use]
    pub fn new(engine: Arc<MatchEngine<P>>, concurrency: usize) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
        }
    }

    /// 按设备档位决定并发数，`override_concurrency` 优先。
    #[must_use]
    pub fn for_device(
        engine: Arc<MatchEngine<P>>,
        device: &dyn DeviceInfo,
        override_concurrency: Option<usize>,
    ) -> Self {
        let concurrency = match override_concurrency.filter(|&n| n > 0) {
            Some(n) => n,
            None => {
                let tier = device.tier();
                info!(%tier, permits = tier.permits(), "按设备档位设置并发数");
                tier.permits()
            }
        };
        Self::new(engine, concurrency)
    }

    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 匹配所有文件。
    ///
    /// 单个文件的错误记为 `error` 结果，不会中断整批。
    /// `cancel` 被触发时中止所有进行中的任务并返回 `LyricsError::Cancelled`。
    ///
    /// # 参数
    /// * `tracks` - 待匹配的文件。
    /// * `cancel` - 取消令牌。
    /// * `on_progress` - 每完成一个文件调用一次。
    pub async fn run<F>(
        &self,
        tracks: Vec<LocalTrack>,
        cancel: CancellationToken,
        mut on_progress: F,
    ) -> Result<BatchReport>
    where
        F: FnMut(&BatchProgress),
    {
        let total = tracks.len();
        info!(total, concurrency = self.concurrency, "开始批量匹配");

        let (tx, mut rx) = mpsc::channel::<WorkerMessage>(self.concurrency);
        let producer = tokio::spawn(produce(
            Arc::clone(&self.engine),
            tracks.clone(),
            Arc::new(Semaphore::new(self.concurrency)),
            tx,
            cancel.clone(),
        ));

        let mut results: Vec<Option<MatchResult>> = vec![None; total];
        let mut progress = BatchProgress::new(total);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    producer.abort();
                    warn!(completed = progress.completed, total, "批量匹配已取消");
                    return Err(LyricsError::Cancelled);
                }
                received = rx.recv() => {
                    let Some((index, result, permit)) = received else {
                        break;
                    };
                    progress.record(&result);
                    on_progress(&progress);
                    results[index] = Some(result);
                    drop(permit);
                }
            }
        }

        if let Err(e) = producer.await {
            error!(error = %e, "批量匹配的调度任务异常退出");
        }

        let results: Vec<MatchResult> = results
            .into_iter()
            .zip(tracks)
            .map(|(result, track)| {
                result.unwrap_or_else(|| MatchResult::error(track, "任务意外终止"))
            })
            .collect();

        let report = BatchReport::from_results(results);
        info!(
            matched = report.matched,
            failed = report.failed,
            errors = report.errors,
            "批量匹配完成"
        );
        Ok(report)
    }
}

/// 按顺序为每个文件取得许可后派生工作任务，等待所有任务结束。
///
/// 本任务被中止时，`JoinSet` 随之销毁并中止所有工作任务。
async fn produce<P: LyricsProvider + 'static>(
    engine: Arc<MatchEngine<P>>,
    tracks: Vec<LocalTrack>,
    semaphore: Arc<Semaphore>,
    tx: mpsc::Sender<WorkerMessage>,
    cancel: CancellationToken,
) {
    let mut workers = JoinSet::new();

    for (index, track) in tracks.into_iter().enumerate() {
        let permit = tokio::select! {
            () = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let engine = Arc::clone(&engine);
        let tx = tx.clone();
        let cancel = cancel.clone();
        workers.spawn(async move {
            let outcome = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = engine.match_track(&track) => outcome,
            };
            let result = outcome.unwrap_or_else(|e| {
                warn!(path = %track.path.display(), error = %e, "文件匹配出错");
                MatchResult::error(track, e.to_string())
            });
            if tx.send((index, result, permit)).await.is_err() {
                warn!(index, "汇总方已停止接收结果");
            }
        });
    }

    drop(tx);
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined
            && e.is_panic()
        {
            error!(error = %e, "匹配任务 panic");
        }
    }
}
