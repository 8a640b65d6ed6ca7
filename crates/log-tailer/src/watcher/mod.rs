//! 감시 집합 -- 활성 파일 감시자들의 등록과 생명주기 관리
//!
//! # 아키텍처
//! - [`WatchSet`]: 경로별 감시자 레지스트리, 시작/중지/전체 종료 코디네이터
//! - [`file`]: 파일 하나의 증분 읽기 및 재동기화
//!
//! 감시자마다 독립된 tokio 태스크가 폴링 루프를 실행합니다.
//! 레지스트리 잠금은 감시자의 폴링 I/O 동안 잡히지 않습니다.

pub mod file;

pub use file::{FileWatcher, WatcherState, WatcherStats};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use logwatch_core::metrics as m;

use crate::bus::{AlertBus, BusStats};
use crate::config::TailerConfig;
use crate::error::TailerError;
use crate::rule::RuleEngine;

/// 레지스트리 항목
struct WatchHandle {
    watcher: Arc<FileWatcher>,
    cancel: CancellationToken,
}

/// 레지스트리 잠금 아래의 상태
struct Registry {
    watchers: HashMap<PathBuf, WatchHandle>,
    /// `stop()` 이후 `None` -- 이 송신측이 사라져야 채널이 닫힘
    bus: Option<AlertBus>,
}

/// 감시 집합 전체 카운터 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSetStats {
    /// 감시 중인 파일 수
    pub watched_files: usize,
    /// 읽은 라인 수 (현재 감시자 합계)
    pub lines_read: u64,
    /// 제출한 알림 수 (현재 감시자 합계)
    pub alerts_emitted: u64,
    /// 재동기화 횟수 (현재 감시자 합계)
    pub resyncs: u64,
    /// 흡수된 폴링 에러 수 (현재 감시자 합계)
    pub poll_errors: u64,
    /// 큐가 받아들인 알림 수
    pub alerts_delivered: u64,
    /// 큐가 가득 차 버린 알림 수
    pub alerts_dropped: u64,
}

/// 감시 집합
///
/// # 사용 예시
/// ```ignore
/// let (bus, mut stream) = AlertBus::new(config.alert_queue_capacity);
/// let watch_set = WatchSet::new(config, engine, bus);
///
/// watch_set.start_watching("/var/log/app.log").await?;
/// // ...
/// watch_set.stop().await; // 모든 태스크 종료 후 큐 닫힘
/// ```
pub struct WatchSet {
    config: TailerConfig,
    engine: Arc<RuleEngine>,
    registry: Mutex<Registry>,
    bus_stats: Arc<BusStats>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    stopped: AtomicBool,
}

impl WatchSet {
    /// 새 감시 집합을 생성합니다.
    ///
    /// `bus`의 다른 복제본을 호출자가 들고 있으면 `stop()` 이후에도
    /// 스트림이 닫히지 않으므로, 보통 그대로 넘깁니다.
    pub fn new(config: TailerConfig, engine: Arc<RuleEngine>, bus: AlertBus) -> Self {
        Self {
            config,
            engine,
            bus_stats: bus.stats(),
            registry: Mutex::new(Registry {
                watchers: HashMap::new(),
                bus: Some(bus),
            }),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// 경로 감시를 시작합니다.
    ///
    /// 등록이 끝나면 반환하며 첫 폴링을 기다리지 않습니다.
    ///
    /// # Errors
    /// - `AlreadyWatching`: 이미 감시 중인 경로
    /// - `Watch`: 파일 생성/열기 실패 (다른 경로에는 영향 없음)
    /// - `Stopped`: `stop()` 이후 호출
    pub async fn start_watching(&self, path: impl AsRef<Path>) -> Result<(), TailerError> {
        let path = path.as_ref().to_path_buf();
        let mut registry = self.registry.lock().await;

        if self.stopped.load(Ordering::Acquire) {
            return Err(TailerError::Stopped);
        }
        let Some(bus) = registry.bus.clone() else {
            return Err(TailerError::Stopped);
        };
        if registry.watchers.contains_key(&path) {
            return Err(TailerError::AlreadyWatching {
                path: path.display().to_string(),
            });
        }

        let cancel = self.shutdown.child_token();
        let watcher = Arc::new(FileWatcher::new(
            path.clone(),
            Arc::clone(&self.engine),
            bus,
            self.config.poll_interval(),
            cancel.clone(),
        ));
        watcher.open().await?;

        self.tracker.spawn(Arc::clone(&watcher).run());
        registry
            .watchers
            .insert(path.clone(), WatchHandle { watcher, cancel });
        metrics::gauge!(m::TAILER_WATCHED_FILES).set(registry.watchers.len() as f64);

        tracing::info!(path = %path.display(), "started watching file");
        Ok(())
    }

    /// 경로 감시를 중지합니다. 감시 중이 아니면 아무것도 하지 않습니다.
    ///
    /// 레지스트리에서 즉시 제거하며, 태스크는 비동기로 종료됩니다.
    pub async fn stop_watching(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut registry = self.registry.lock().await;
        if let Some(handle) = registry.watchers.remove(path) {
            handle.cancel.cancel();
            metrics::gauge!(m::TAILER_WATCHED_FILES).set(registry.watchers.len() as f64);
            tracing::info!(path = %path.display(), "stopped watching file");
        }
    }

    /// 모든 감시자를 정지하고, 모든 태스크가 끝날 때까지 기다린 뒤 큐를 닫습니다.
    ///
    /// 종료 상태이며 이후 `start_watching`은 `Stopped`를 반환합니다.
    /// 두 번째 호출은 경고만 남기고 바로 반환합니다.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            tracing::warn!("watch set stop called more than once, ignoring");
            return;
        }

        tracing::info!("stopping watch set");
        self.shutdown.cancel();

        let drained: Vec<WatchHandle> = {
            let mut registry = self.registry.lock().await;
            registry.watchers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &drained {
            handle.cancel.cancel();
        }

        self.tracker.close();
        self.tracker.wait().await;
        drop(drained);

        // 모든 생산자가 끝난 뒤에만 마지막 송신측을 놓음
        self.registry.lock().await.bus = None;
        metrics::gauge!(m::TAILER_WATCHED_FILES).set(0.0);
        tracing::info!("watch set stopped, alert queue closed");
    }

    /// 감시 중인 경로 스냅샷 (순서 없음)
    pub async fn get_watched_files(&self) -> Vec<PathBuf> {
        self.registry.lock().await.watchers.keys().cloned().collect()
    }

    /// 경로 감시 여부
    pub async fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.registry
            .lock()
            .await
            .watchers
            .contains_key(path.as_ref())
    }

    /// 경로의 현재 소비 오프셋
    ///
    /// 감시자 잠금을 잡으므로 진행 중인 읽기가 끝난 뒤의 값입니다.
    pub async fn watch_offset(&self, path: impl AsRef<Path>) -> Option<u64> {
        let watcher = self.watcher(path.as_ref()).await?;
        Some(watcher.offset().await)
    }

    /// 경로별 감시자 카운터
    pub async fn watcher_stats(&self, path: impl AsRef<Path>) -> Option<Arc<WatcherStats>> {
        self.watcher(path.as_ref()).await.map(|w| w.stats())
    }

    /// 전체 카운터 스냅샷
    pub async fn stats(&self) -> WatchSetStats {
        let registry = self.registry.lock().await;
        let mut stats = WatchSetStats {
            watched_files: registry.watchers.len(),
            alerts_delivered: self.bus_stats.delivered(),
            alerts_dropped: self.bus_stats.dropped(),
            ..WatchSetStats::default()
        };
        for handle in registry.watchers.values() {
            let s = handle.watcher.stats();
            stats.lines_read += s.lines_read();
            stats.alerts_emitted += s.alerts_emitted();
            stats.resyncs += s.resyncs();
            stats.poll_errors += s.poll_errors();
        }
        stats
    }

    /// 알림 큐 카운터
    pub fn bus_stats(&self) -> Arc<BusStats> {
        Arc::clone(&self.bus_stats)
    }

    /// 규칙 엔진
    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    /// `stop()`이 호출되었는지 여부
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn watcher(&self, path: &Path) -> Option<Arc<FileWatcher>> {
        self.registry
            .lock()
            .await
            .watchers
            .get(path)
            .map(|handle| Arc::clone(&handle.watcher))
    }
}

impl Drop for WatchSet {
    fn drop(&mut self) {
        // stop() 없이 버려져도 폴링 태스크가 남지 않도록
        self.shutdown.cancel();
    }
}
