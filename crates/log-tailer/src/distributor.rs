//! 알림 배포기 -- 이력 보관 및 구독자 팬아웃
//!
//! [`AlertStream`]의 단일 소비자로 동작합니다. 각 알림에 요약을 붙여
//! [`AlertRecord`]로 만들고, 최근 이력을 제한된 크기로 보관하며,
//! 살아 있는 구독자 모두에게 전달합니다.
//!
//! # 구독자 정책
//! - 새 구독자는 최근 `replay_limit`건을 먼저 받습니다
//! - 전달이 실패한 구독자(채널 닫힘 또는 가득 참)는 즉시 제거됩니다

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use logwatch_core::metrics as m;
use logwatch_core::types::{Alert, Severity};

use crate::bus::AlertStream;
use crate::error::TailerError;
use crate::parser::summarize_line;

/// 배포기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributorConfig {
    /// 보관할 최대 이력 수
    pub history_limit: usize,
    /// 새 구독자에게 먼저 보낼 최근 알림 수
    pub replay_limit: usize,
    /// 구독자별 채널 용량
    pub subscriber_capacity: usize,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            history_limit: 1_000,
            replay_limit: 50,
            subscriber_capacity: 256,
        }
    }
}

impl DistributorConfig {
    /// core의 `DistributorSection`에서 설정을 생성합니다.
    pub fn from_core(core: &logwatch_core::config::DistributorSection) -> Self {
        Self {
            history_limit: core.history_limit,
            replay_limit: core.replay_limit,
            subscriber_capacity: core.subscriber_capacity,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailerError> {
        if self.history_limit == 0 {
            return Err(TailerError::Config {
                field: "history_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.replay_limit > self.history_limit {
            return Err(TailerError::Config {
                field: "replay_limit".to_owned(),
                reason: "must not exceed history_limit".to_owned(),
            });
        }
        if self.subscriber_capacity == 0 || self.subscriber_capacity < self.replay_limit {
            return Err(TailerError::Config {
                field: "subscriber_capacity".to_owned(),
                reason: "must be greater than 0 and at least replay_limit".to_owned(),
            });
        }
        Ok(())
    }
}

/// 요약이 붙은 알림
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// 원본 알림
    #[serde(flatten)]
    pub alert: Alert,
    /// 라인 요약
    pub summary: String,
}

impl AlertRecord {
    /// 알림에 요약을 붙입니다.
    pub fn new(alert: Alert) -> Self {
        let summary = summarize_line(alert.line());
        Self { alert, summary }
    }
}

/// 구독 핸들
#[derive(Debug)]
pub struct Subscription {
    /// 구독 ID (`unsubscribe`에 사용)
    pub id: Uuid,
    /// 알림 수신 채널. 배포기가 끝나거나 구독이 제거되면 닫힙니다.
    pub receiver: mpsc::Receiver<Arc<AlertRecord>>,
}

#[derive(Default)]
struct Inner {
    history: VecDeque<Arc<AlertRecord>>,
    subscribers: HashMap<Uuid, mpsc::Sender<Arc<AlertRecord>>>,
    received: u64,
    closed: bool,
}

/// 알림 배포기
pub struct AlertDistributor {
    config: DistributorConfig,
    inner: Mutex<Inner>,
}

impl AlertDistributor {
    /// 새 배포기를 생성합니다.
    pub fn new(config: DistributorConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// 스트림 끝까지 알림을 소비합니다.
    ///
    /// 끝나면 모든 구독 채널을 닫습니다.
    pub async fn run(self: Arc<Self>, mut stream: AlertStream) {
        tracing::info!("alert distributor started");
        while let Some(alert) = stream.recv().await {
            self.publish(alert);
        }

        let remaining = {
            let mut inner = self.lock();
            inner.closed = true;
            let count = inner.subscribers.len();
            inner.subscribers.clear();
            count
        };
        metrics::gauge!(m::DISTRIBUTOR_SUBSCRIBERS).set(0.0);
        tracing::info!(
            subscribers = remaining,
            "alert stream ended, distributor stopped"
        );
    }

    /// 알림 하나를 이력에 넣고 모든 구독자에게 전달합니다.
    pub fn publish(&self, alert: Alert) -> Arc<AlertRecord> {
        let record = Arc::new(AlertRecord::new(alert));
        let mut inner = self.lock();

        inner.received += 1;
        inner.history.push_back(Arc::clone(&record));
        while inner.history.len() > self.config.history_limit {
            inner.history.pop_front();
        }

        let mut evicted = Vec::new();
        for (id, tx) in &inner.subscribers {
            if tx.try_send(Arc::clone(&record)).is_err() {
                evicted.push(*id);
            }
        }
        for id in &evicted {
            inner.subscribers.remove(id);
            tracing::warn!(subscriber = %id, "alert delivery failed, evicting subscriber");
        }
        if !evicted.is_empty() {
            metrics::counter!(m::DISTRIBUTOR_EVICTIONS_TOTAL).increment(evicted.len() as u64);
            metrics::gauge!(m::DISTRIBUTOR_SUBSCRIBERS).set(inner.subscribers.len() as f64);
        }
        metrics::gauge!(m::DISTRIBUTOR_HISTORY_SIZE).set(inner.history.len() as f64);

        tracing::debug!(
            source = %record.alert.source().display(),
            severity = %record.alert.severity(),
            subscribers = inner.subscribers.len(),
            "alert distributed"
        );
        record
    }

    /// 새 구독자를 등록하고 최근 알림으로 채웁니다.
    ///
    /// 스트림이 이미 끝났다면 이력만 담긴 채 닫힌 채널을 돌려줍니다.
    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4();
        let capacity = self.config.subscriber_capacity.max(1);
        let (tx, receiver) = mpsc::channel(capacity);

        let mut inner = self.lock();
        let skip = inner.history.len().saturating_sub(self.config.replay_limit);
        for record in inner.history.iter().skip(skip).take(capacity) {
            // 용량 안쪽이므로 실패하지 않음
            let _ = tx.try_send(Arc::clone(record));
        }

        if !inner.closed {
            inner.subscribers.insert(id, tx);
            metrics::gauge!(m::DISTRIBUTOR_SUBSCRIBERS).set(inner.subscribers.len() as f64);
        }
        tracing::debug!(subscriber = %id, "subscriber added");

        Subscription { id, receiver }
    }

    /// 구독을 해제합니다. 없는 ID면 `false`.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let mut inner = self.lock();
        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            metrics::gauge!(m::DISTRIBUTOR_SUBSCRIBERS).set(inner.subscribers.len() as f64);
            tracing::debug!(subscriber = %id, "subscriber removed");
        }
        removed
    }

    /// 최근 `limit`건을 도착 순서로 반환합니다.
    pub fn recent(&self, limit: usize) -> Vec<Arc<AlertRecord>> {
        let inner = self.lock();
        let skip = inner.history.len().saturating_sub(limit);
        inner.history.iter().skip(skip).cloned().collect()
    }

    /// 이력 내 심각도별 건수
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let inner = self.lock();
        let mut counts = BTreeMap::new();
        for record in &inner.history {
            *counts.entry(record.alert.severity()).or_insert(0) += 1;
        }
        counts
    }

    /// 이력에 보관 중인 알림 수
    pub fn total_alerts(&self) -> usize {
        self.lock().history.len()
    }

    /// 시작 이후 받은 전체 알림 수
    pub fn received(&self) -> u64 {
        self.lock().received
    }

    /// 현재 구독자 수
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::AlertBus;
    use chrono::Utc;
    use std::time::Duration;

    fn alert(n: usize, severity: Severity) -> Alert {
        Alert::new(
            Utc::now(),
            "/var/log/app.log",
            format!("app[7]: ERROR event {n}"),
            [("r", severity)],
        )
    }

    fn small_config() -> DistributorConfig {
        DistributorConfig {
            history_limit: 5,
            replay_limit: 3,
            subscriber_capacity: 4,
        }
    }

    #[test]
    fn default_config_is_valid() {
        DistributorConfig::default().validate().unwrap();
    }

    #[test]
    fn config_rejects_replay_above_history() {
        let config = DistributorConfig {
            history_limit: 2,
            replay_limit: 3,
            subscriber_capacity: 4,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn record_carries_summary() {
        let record = AlertRecord::new(alert(1, Severity::Low));
        assert_eq!(record.summary, "ERROR event 1");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["summary"], "ERROR event 1");
        assert_eq!(json["severity"], "low");
        assert!(json["matchedRules"].is_array());
    }

    #[test]
    fn history_is_bounded() {
        let distributor = AlertDistributor::new(small_config());
        for n in 0..8 {
            distributor.publish(alert(n, Severity::Low));
        }
        assert_eq!(distributor.total_alerts(), 5);
        assert_eq!(distributor.received(), 8);

        let recent = distributor.recent(2);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].alert.line().ends_with("event 6"));
        assert!(recent[1].alert.line().ends_with("event 7"));
    }

    #[tokio::test]
    async fn subscriber_is_seeded_with_recent_history() {
        let distributor = AlertDistributor::new(small_config());
        for n in 0..5 {
            distributor.publish(alert(n, Severity::Low));
        }

        let mut sub = distributor.subscribe();
        let seeded: Vec<String> = (0..3)
            .map(|_| sub.receiver.try_recv().unwrap().alert.line().to_owned())
            .collect();
        assert!(seeded[0].ends_with("event 2"));
        assert!(seeded[2].ends_with("event 4"));
        assert!(sub.receiver.try_recv().is_err());

        distributor.publish(alert(5, Severity::High));
        let live = sub.receiver.recv().await.unwrap();
        assert!(live.alert.line().ends_with("event 5"));
    }

    #[tokio::test]
    async fn failed_delivery_evicts_subscriber() {
        let distributor = AlertDistributor::new(small_config());
        let dropped = distributor.subscribe();
        let _kept = distributor.subscribe();
        drop(dropped);
        assert_eq!(distributor.subscriber_count(), 2);

        distributor.publish(alert(0, Severity::Low));
        assert_eq!(distributor.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn full_subscriber_is_evicted() {
        let distributor = AlertDistributor::new(small_config());
        let _slow = distributor.subscribe();
        for n in 0..5 {
            distributor.publish(alert(n, Severity::Low));
        }
        // 용량 4를 넘는 다섯 번째 전달에서 제거됨
        assert_eq!(distributor.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_removes() {
        let distributor = AlertDistributor::new(small_config());
        let sub = distributor.subscribe();
        assert!(distributor.unsubscribe(sub.id));
        assert!(!distributor.unsubscribe(sub.id));
    }

    #[test]
    fn severity_counts_over_history() {
        let distributor = AlertDistributor::new(small_config());
        distributor.publish(alert(0, Severity::Low));
        distributor.publish(alert(1, Severity::Critical));
        distributor.publish(alert(2, Severity::Critical));
        let counts = distributor.severity_counts();
        assert_eq!(counts.get(&Severity::Critical), Some(&2));
        assert_eq!(counts.get(&Severity::Low), Some(&1));
        assert_eq!(counts.get(&Severity::High), None);
    }

    #[tokio::test]
    async fn run_drains_stream_and_closes_subscribers() {
        let distributor = Arc::new(AlertDistributor::new(DistributorConfig::default()));
        let (bus, stream) = AlertBus::new(10);
        let mut sub = distributor.subscribe();

        let task = tokio::spawn(Arc::clone(&distributor).run(stream));
        bus.offer(alert(0, Severity::Medium));
        bus.offer(alert(1, Severity::High));
        drop(bus);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(distributor.total_alerts(), 2);
        assert!(sub.receiver.recv().await.is_some());
        assert!(sub.receiver.recv().await.is_some());
        assert!(sub.receiver.recv().await.is_none());

        // 종료 후 구독은 이력만 받고 닫힘
        let mut late = distributor.subscribe();
        assert!(late.receiver.recv().await.is_some());
        assert!(late.receiver.recv().await.is_some());
        assert!(late.receiver.recv().await.is_none());
    }
}
