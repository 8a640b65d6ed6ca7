//! 테일러 설정
//!
//! [`TailerConfig`]는 core의 [`TailerSection`](logwatch_core::config::TailerSection)을
//! 기반으로 감시 집합이 사용하는 런타임 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logwatch_core::config::LogwatchConfig;
//! use logwatch_tailer::config::TailerConfig;
//!
//! let core_config = LogwatchConfig::default();
//! let config = TailerConfig::from_core(&core_config.tailer);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use logwatch_core::config::MAX_POLL_INTERVAL_MS;

use crate::error::TailerError;

/// 테일러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailerConfig {
    /// 규칙/로그 파일 목록 YAML 경로
    pub rules_path: PathBuf,
    /// 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 알림 큐 용량
    pub alert_queue_capacity: usize,
    /// 시작 시 활성 로그 파일 자동 감시
    pub auto_start: bool,
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("rules.yaml"),
            poll_interval_ms: 1_000,
            alert_queue_capacity: 100,
            auto_start: true,
        }
    }
}

impl TailerConfig {
    /// core의 `TailerSection`에서 테일러 설정을 생성합니다.
    pub fn from_core(core: &logwatch_core::config::TailerSection) -> Self {
        Self {
            rules_path: PathBuf::from(&core.rules_path),
            poll_interval_ms: core.poll_interval_ms,
            alert_queue_capacity: core.alert_queue_capacity,
            auto_start: core.auto_start,
        }
    }

    /// 폴링 주기
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailerError> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(TailerError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{MAX_POLL_INTERVAL_MS}"),
            });
        }

        if self.alert_queue_capacity == 0 {
            return Err(TailerError::Config {
                field: "alert_queue_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 테일러 설정 빌더
#[derive(Default)]
pub struct TailerConfigBuilder {
    config: TailerConfig,
}

impl TailerConfigBuilder {
    /// 기본값으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙 파일 경로를 설정합니다.
    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = path.into();
        self
    }

    /// 폴링 주기를 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 알림 큐 용량을 설정합니다.
    pub fn alert_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.alert_queue_capacity = capacity;
        self
    }

    /// 자동 시작 여부를 설정합니다.
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.config.auto_start = auto_start;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<TailerConfig, TailerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
