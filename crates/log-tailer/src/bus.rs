//! 알림 큐 -- 감시자(생산자)와 단일 소비자를 잇는 용량 제한 채널
//!
//! # 드롭 정책
//! 생산자는 절대 블로킹되지 않습니다. 큐가 가득 차면 새로 들어온 알림을
//! 버리고(drop-newest) 카운터를 올린 뒤 폴링을 계속합니다.
//!
//! # 종료
//! 채널은 마지막 [`AlertBus`] 복제본이 drop될 때 닫힙니다.
//! [`WatchSet::stop`](crate::watcher::WatchSet::stop)은 모든 감시 태스크가
//! 종료된 뒤에만 자신의 송신측을 놓으므로, 소비자는 그 시점에 스트림 끝을 관찰합니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use logwatch_core::metrics as m;
use logwatch_core::types::Alert;

/// 알림 큐 카운터
#[derive(Debug, Default)]
pub struct BusStats {
    offered: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl BusStats {
    /// 큐에 제출된 알림 수
    pub fn offered(&self) -> u64 {
        self.offered.load(Ordering::Relaxed)
    }

    /// 큐에 들어간 알림 수
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// 큐가 가득 차 버려진 알림 수
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// 알림 큐 송신측
///
/// 복제해서 여러 감시자가 공유합니다.
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: mpsc::Sender<Alert>,
    stats: Arc<BusStats>,
    capacity: usize,
}

impl AlertBus {
    /// 지정 용량의 알림 큐를 생성합니다.
    ///
    /// 용량 0은 1로 올립니다.
    pub fn new(capacity: usize) -> (Self, AlertStream) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let bus = Self {
            tx,
            stats: Arc::new(BusStats::default()),
            capacity,
        };
        (bus, AlertStream { rx })
    }

    /// 알림을 큐에 넣습니다. 블로킹하지 않습니다.
    ///
    /// 큐에 들어가면 `true`, 드롭되면 `false`를 반환합니다.
    pub fn offer(&self, alert: Alert) -> bool {
        self.stats.offered.fetch_add(1, Ordering::Relaxed);
        let severity = alert.severity();

        match self.tx.try_send(alert) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(m::BUS_ALERTS_SENT_TOTAL, m::LABEL_SEVERITY => severity.as_str())
                    .increment(1);
                true
            }
            Err(TrySendError::Full(alert)) => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!(m::BUS_ALERTS_DROPPED_TOTAL).increment(1);
                tracing::warn!(
                    source = %alert.source().display(),
                    capacity = self.capacity,
                    dropped,
                    "alert queue full, dropped newest alert"
                );
                false
            }
            Err(TrySendError::Closed(alert)) => {
                tracing::error!(
                    source = %alert.source().display(),
                    "alert offered after the queue was closed"
                );
                false
            }
        }
    }

    /// 공유 카운터
    pub fn stats(&self) -> Arc<BusStats> {
        Arc::clone(&self.stats)
    }

    /// 큐 용량
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 소비자가 스트림을 놓았는지 여부
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 알림 큐 수신측 (단일 소비자)
#[derive(Debug)]
pub struct AlertStream {
    rx: mpsc::Receiver<Alert>,
}

impl AlertStream {
    /// 다음 알림을 기다립니다. 큐가 닫히고 비면 `None`.
    pub async fn recv(&mut self) -> Option<Alert> {
        self.rx.recv().await
    }

    /// 대기 없이 하나를 꺼냅니다.
    pub fn try_recv(&mut self) -> Option<Alert> {
        self.rx.try_recv().ok()
    }

    /// 현재 큐에 쌓인 알림 수
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// 큐가 비었는지 여부
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
