//! 파일 감시자 -- 파일 하나의 증분 읽기 상태
//!
//! `tail -f`와 유사한 동작을 고정 주기 폴링으로 구현합니다.
//!
//! # 상태 전이
//! `Created -> Opened -> Polling -> Stopped` (종료 상태, 재시작 없음)
//!
//! # 잘림/교체 감지
//! - 경로의 현재 크기가 소비한 오프셋보다 작으면 파일을 다시 열고
//!   오프셋을 새 크기로 맞춥니다 (감지 이전 내용은 전달하지 않음)
//! - 예상보다 적게 읽힌 경우도 같은 방식으로 재동기화합니다
//! - 폴링 중 I/O 에러는 호출자에게 전달되지 않고 카운터와 로그로만 남습니다

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logwatch_core::metrics as m;
use logwatch_core::types::Alert;

use crate::bus::AlertBus;
use crate::error::TailerError;
use crate::rule::RuleEngine;

/// 감시자 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// 생성됨, 아직 파일을 열지 않음
    Created,
    /// 파일을 열고 끝으로 이동함
    Opened,
    /// 폴링 루프 실행 중
    Polling,
    /// 정지됨 (파일 핸들 해제됨)
    Stopped,
}

impl WatcherState {
    /// 상태 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Opened => "opened",
            Self::Polling => "polling",
            Self::Stopped => "stopped",
        }
    }
}

/// 감시자별 카운터
#[derive(Debug, Default)]
pub struct WatcherStats {
    lines_read: AtomicU64,
    alerts_emitted: AtomicU64,
    resyncs: AtomicU64,
    poll_errors: AtomicU64,
}

impl WatcherStats {
    /// 읽은 비어 있지 않은 라인 수
    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    /// 큐에 제출한 알림 수 (드롭 포함)
    pub fn alerts_emitted(&self) -> u64 {
        self.alerts_emitted.load(Ordering::Relaxed)
    }

    /// 잘림/교체/짧은 읽기로 인한 재동기화 횟수
    pub fn resyncs(&self) -> u64 {
        self.resyncs.load(Ordering::Relaxed)
    }

    /// 흡수된 폴링 I/O 에러 수
    pub fn poll_errors(&self) -> u64 {
        self.poll_errors.load(Ordering::Relaxed)
    }
}

/// 감시자 잠금 아래의 가변 상태
#[derive(Debug)]
struct WatchState {
    file: Option<File>,
    offset: u64,
    phase: WatcherState,
}

/// 파일 감시자
///
/// 파일 핸들과 오프셋을 독점 소유합니다. stat, seek, read, reopen 순서는
/// 모두 감시자 자신의 잠금 아래에서 직렬화됩니다.
#[derive(Debug)]
pub struct FileWatcher {
    path: PathBuf,
    engine: Arc<RuleEngine>,
    bus: AlertBus,
    poll_interval: Duration,
    cancel: CancellationToken,
    state: Mutex<WatchState>,
    stats: Arc<WatcherStats>,
}

impl FileWatcher {
    /// 새 감시자를 생성합니다. 파일은 아직 열지 않습니다.
    pub fn new(
        path: impl Into<PathBuf>,
        engine: Arc<RuleEngine>,
        bus: AlertBus,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            path: path.into(),
            engine,
            bus,
            poll_interval,
            cancel,
            state: Mutex::new(WatchState {
                file: None,
                offset: 0,
                phase: WatcherState::Created,
            }),
            stats: Arc::new(WatcherStats::default()),
        }
    }

    /// 파일을 열고 끝으로 이동합니다.
    ///
    /// 파일이 없으면 상위 디렉토리와 빈 파일을 만든 뒤 엽니다.
    /// 기존 내용은 전달하지 않습니다.
    pub async fn open(&self) -> Result<(), TailerError> {
        let mut state = self.state.lock().await;
        if state.phase != WatcherState::Created {
            return Err(TailerError::Watch {
                path: self.path.display().to_string(),
                reason: format!("cannot open watcher in state {}", state.phase.as_str()),
            });
        }

        ensure_exists(&self.path)
            .await
            .map_err(|e| self.watch_error("failed to create file", &e))?;
        let (file, size) = open_at_end(&self.path)
            .await
            .map_err(|e| self.watch_error("failed to open file", &e))?;

        state.file = Some(file);
        state.offset = size;
        state.phase = WatcherState::Opened;

        tracing::debug!(path = %self.path.display(), offset = size, "watcher opened");
        Ok(())
    }

    /// 정지 신호가 올 때까지 폴링 루프를 실행합니다.
    ///
    /// 종료 시 파일 핸들은 항상 해제됩니다.
    pub async fn run(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            if state.phase == WatcherState::Opened {
                state.phase = WatcherState::Polling;
            }
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
            }
        }

        let mut state = self.state.lock().await;
        state.file = None;
        state.phase = WatcherState::Stopped;
        tracing::debug!(path = %self.path.display(), "watcher stopped");
    }

    /// 폴링 한 주기를 수행합니다.
    pub async fn poll_once(&self) {
        let mut state = self.state.lock().await;
        if state.phase == WatcherState::Stopped {
            return;
        }

        let current_size = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.record_poll_error("stat failed", &e);
                return;
            }
        };

        if state.file.is_none() {
            // 이전 재오픈 실패, 지금 보이는 내용은 건너뜀
            self.resync(&mut state, current_size).await;
            return;
        }

        if current_size < state.offset {
            tracing::warn!(
                path = %self.path.display(),
                offset = state.offset,
                size = current_size,
                "file truncated or replaced, resyncing"
            );
            self.resync(&mut state, current_size).await;
            return;
        }

        if current_size == state.offset {
            return;
        }

        let expected = current_size - state.offset;
        let chunk = match read_range(&mut state, expected).await {
            Ok(chunk) if chunk.len() as u64 == expected => chunk,
            Ok(chunk) => {
                tracing::warn!(
                    path = %self.path.display(),
                    expected,
                    read = chunk.len(),
                    "short read, resyncing"
                );
                self.resync(&mut state, current_size).await;
                return;
            }
            Err(e) => {
                self.record_poll_error("read failed", &e);
                self.resync(&mut state, current_size).await;
                return;
            }
        };

        state.offset += expected;
        self.process_chunk(&chunk);
    }

    /// 소비한 바이트 오프셋
    pub async fn offset(&self) -> u64 {
        self.state.lock().await.offset
    }

    /// 현재 상태
    pub async fn state(&self) -> WatcherState {
        self.state.lock().await.phase
    }

    /// 감시 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 감시자 카운터
    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }

    fn process_chunk(&self, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        for raw in text.split('\n') {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            self.stats.lines_read.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(m::TAILER_LINES_READ_TOTAL).increment(1);

            let matched = self.engine.match_rules(line);
            if matched.is_empty() {
                continue;
            }

            for rule in &matched {
                metrics::counter!(m::TAILER_RULE_MATCHES_TOTAL, m::LABEL_RULE => rule.name.clone())
                    .increment(1);
            }

            let alert = Alert::new(
                Utc::now(),
                self.path.clone(),
                line,
                matched.into_iter().map(|rule| (rule.name, rule.severity)),
            );
            tracing::debug!(
                path = %self.path.display(),
                severity = %alert.severity(),
                rules = alert.matched_rules().len(),
                "line matched"
            );
            self.stats.alerts_emitted.fetch_add(1, Ordering::Relaxed);
            self.bus.offer(alert);
        }
    }

    /// 핸들을 닫고 다시 열어 오프셋을 현재 크기로 맞춥니다.
    ///
    /// 재오픈에 실패하면 핸들 없이 `fallback_size`를 오프셋으로 두고
    /// 다음 주기에 다시 시도합니다.
    async fn resync(&self, state: &mut WatchState, fallback_size: u64) {
        state.file = None;
        self.stats.resyncs.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::TAILER_RESYNCS_TOTAL).increment(1);

        match open_at_end(&self.path).await {
            Ok((file, size)) => {
                state.file = Some(file);
                state.offset = size;
            }
            Err(e) => {
                state.offset = fallback_size;
                self.record_poll_error("reopen failed", &e);
            }
        }
    }

    fn record_poll_error(&self, what: &str, err: &io::Error) {
        self.stats.poll_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::TAILER_POLL_ERRORS_TOTAL).increment(1);
        tracing::warn!(path = %self.path.display(), error = %err, "{what}");
    }

    fn watch_error(&self, what: &str, err: &io::Error) -> TailerError {
        TailerError::Watch {
            path: self.path.display().to_string(),
            reason: format!("{what}: {err}"),
        }
    }
}

/// 파일이 없으면 상위 디렉토리와 빈 파일을 만듭니다.
async fn ensure_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        Err(_) => {}
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(())
}

/// 읽기 전용으로 열고 끝으로 이동합니다. (핸들, 끝 오프셋)을 반환합니다.
async fn open_at_end(path: &Path) -> io::Result<(File, u64)> {
    let mut file = File::open(path).await?;
    let size = file.seek(SeekFrom::End(0)).await?;
    Ok((file, size))
}

/// 현재 오프셋에서 최대 `len` 바이트를 읽습니다.
async fn read_range(state: &mut WatchState, len: u64) -> io::Result<Vec<u8>> {
    let offset = state.offset;
    let file = state
        .file
        .as_mut()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file handle not open"))?;

    file.seek(SeekFrom::Start(offset)).await?;
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(usize::MAX).min(1 << 20));
    file.take(len).read_to_end(&mut buf).await?;
    Ok(buf)
}
