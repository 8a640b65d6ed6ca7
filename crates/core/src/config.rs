//! 설정 관리 -- logwatch.toml 파싱 및 런타임 설정
//!
//! [`LogwatchConfig`]는 데몬과 CLI가 공유하는 최상위 설정 구조체입니다.
//! 규칙 집합(YAML)은 별도 파일이며 `logwatch-tailer`가 로드합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGWATCH_TAILER_POLL_INTERVAL_MS=500` 형식)
//! 3. 설정 파일 (`logwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logwatch_core::error::LogwatchError> {
//! use logwatch_core::config::LogwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogwatchConfig::load("logwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogwatchError};

/// 폴링 주기 상한 (밀리초)
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Logwatch 통합 설정
///
/// `logwatch.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파일 테일러 설정
    #[serde(default)]
    pub tailer: TailerSection,
    /// 알림 배포기 설정
    #[serde(default)]
    pub distributor: DistributorSection,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 순서: 파일 파싱 → 환경변수 오버라이드 → 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogwatchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            LogwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGWATCH_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGWATCH_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.pid_file, "LOGWATCH_GENERAL_PID_FILE");

        // Tailer
        override_string(&mut self.tailer.rules_path, "LOGWATCH_TAILER_RULES_PATH");
        override_u64(
            &mut self.tailer.poll_interval_ms,
            "LOGWATCH_TAILER_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.tailer.alert_queue_capacity,
            "LOGWATCH_TAILER_ALERT_QUEUE_CAPACITY",
        );
        override_bool(&mut self.tailer.auto_start, "LOGWATCH_TAILER_AUTO_START");

        // Distributor
        override_usize(
            &mut self.distributor.history_limit,
            "LOGWATCH_DISTRIBUTOR_HISTORY_LIMIT",
        );
        override_usize(
            &mut self.distributor.replay_limit,
            "LOGWATCH_DISTRIBUTOR_REPLAY_LIMIT",
        );
        override_usize(
            &mut self.distributor.subscriber_capacity,
            "LOGWATCH_DISTRIBUTOR_SUBSCRIBER_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGWATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.tailer.poll_interval_ms == 0 || self.tailer.poll_interval_ms > MAX_POLL_INTERVAL_MS
        {
            return Err(invalid(
                "tailer.poll_interval_ms",
                format!("must be between 1 and {MAX_POLL_INTERVAL_MS}"),
            ));
        }

        if self.tailer.alert_queue_capacity == 0 {
            return Err(invalid(
                "tailer.alert_queue_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.distributor.history_limit == 0 {
            return Err(invalid(
                "distributor.history_limit",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.distributor.replay_limit > self.distributor.history_limit {
            return Err(invalid(
                "distributor.replay_limit",
                "must not exceed distributor.history_limit".to_owned(),
            ));
        }

        // 시드 알림이 구독 채널에 모두 들어가야 함
        if self.distributor.subscriber_capacity < self.distributor.replay_limit.max(1) {
            return Err(invalid(
                "distributor.subscriber_capacity",
                "must be at least distributor.replay_limit and greater than 0".to_owned(),
            ));
        }

        if self.metrics.enabled && self.metrics.listen_addr.is_empty() {
            return Err(invalid(
                "metrics.listen_addr",
                "must not be empty when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LogwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// PID 파일 경로 (빈 문자열이면 사용하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 파일 테일러 설정 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailerSection {
    /// 규칙/로그 파일 목록 YAML 경로
    pub rules_path: String,
    /// 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 알림 큐 용량
    pub alert_queue_capacity: usize,
    /// 시작 시 활성화된 모든 로그 파일 감시 시작
    pub auto_start: bool,
}

impl Default for TailerSection {
    fn default() -> Self {
        Self {
            rules_path: "rules.yaml".to_owned(),
            poll_interval_ms: 1_000,
            alert_queue_capacity: 100,
            auto_start: true,
        }
    }
}

/// 알림 배포기 설정 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorSection {
    /// 메모리에 보관할 최대 알림 수
    pub history_limit: usize,
    /// 새 구독자에게 먼저 보낼 최근 알림 수
    pub replay_limit: usize,
    /// 구독자별 채널 용량
    pub subscriber_capacity: usize,
}

impl Default for DistributorSection {
    fn default() -> Self {
        Self {
            history_limit: 1_000,
            replay_limit: 50,
            subscriber_capacity: 256,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = LogwatchConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.tailer.poll_interval_ms, 1_000);
        assert_eq!(config.tailer.alert_queue_capacity, 100);
        assert!(config.tailer.auto_start);
        assert_eq!(config.distributor.history_limit, 1_000);
        assert_eq!(config.distributor.replay_limit, 50);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        LogwatchConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = LogwatchConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.tailer.rules_path, "rules.yaml");
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[tailer]
poll_interval_ms = 250
"#;
        let config = LogwatchConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.tailer.poll_interval_ms, 250);
        assert_eq!(config.tailer.alert_queue_capacity, 100);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
log_level = "warn"
log_format = "pretty"
pid_file = "/run/logwatch.pid"

[tailer]
rules_path = "/etc/logwatch/rules.yaml"
poll_interval_ms = 500
alert_queue_capacity = 64
auto_start = false

[distributor]
history_limit = 200
replay_limit = 20
subscriber_capacity = 32

[metrics]
enabled = true
listen_addr = "0.0.0.0"
port = 9200
"#;
        let config = LogwatchConfig::parse(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.pid_file, "/run/logwatch.pid");
        assert_eq!(config.tailer.rules_path, "/etc/logwatch/rules.yaml");
        assert!(!config.tailer.auto_start);
        assert_eq!(config.distributor.replay_limit, 20);
        assert_eq!(config.metrics.port, 9200);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = LogwatchConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LogwatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LogwatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = LogwatchConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = LogwatchConfig::default();
        config.tailer.poll_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn validate_rejects_poll_interval_over_limit() {
        let mut config = LogwatchConfig::default();
        config.tailer.poll_interval_ms = MAX_POLL_INTERVAL_MS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_queue_capacity() {
        let mut config = LogwatchConfig::default();
        config.tailer.alert_queue_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alert_queue_capacity"));
    }

    #[test]
    fn validate_rejects_replay_above_history() {
        let mut config = LogwatchConfig::default();
        config.distributor.history_limit = 10;
        config.distributor.replay_limit = 11;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("replay_limit"));
    }

    #[test]
    fn validate_rejects_subscriber_capacity_below_replay() {
        let mut config = LogwatchConfig::default();
        config.distributor.subscriber_capacity = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("subscriber_capacity"));
    }

    #[test]
    fn validate_rejects_empty_metrics_addr_when_enabled() {
        let mut config = LogwatchConfig::default();
        config.metrics.enabled = true;
        config.metrics.listen_addr = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn env_overrides_apply_to_sections() {
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe {
            std::env::set_var("LOGWATCH_TAILER_POLL_INTERVAL_MS", "250");
            std::env::set_var("LOGWATCH_TAILER_AUTO_START", "false");
            std::env::set_var("LOGWATCH_DISTRIBUTOR_HISTORY_LIMIT", "500");
            std::env::set_var("LOGWATCH_METRICS_PORT", "9300");
        }
        let mut config = LogwatchConfig::default();
        config.apply_env_overrides();
        // SAFETY: 위와 동일
        unsafe {
            std::env::remove_var("LOGWATCH_TAILER_POLL_INTERVAL_MS");
            std::env::remove_var("LOGWATCH_TAILER_AUTO_START");
            std::env::remove_var("LOGWATCH_DISTRIBUTOR_HISTORY_LIMIT");
            std::env::remove_var("LOGWATCH_METRICS_PORT");
        }
        assert_eq!(config.tailer.poll_interval_ms, 250);
        assert!(!config.tailer.auto_start);
        assert_eq!(config.distributor.history_limit, 500);
        assert_eq!(config.metrics.port, 9300);
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe { std::env::set_var("TEST_LOGWATCH_STR", "overridden") };
        override_string(&mut val, "TEST_LOGWATCH_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LOGWATCH_STR") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_keeps_original() {
        let mut flag = false;
        let mut number = 7u64;
        // SAFETY: serial 테스트로 환경변수 동시 접근이 없습니다.
        unsafe {
            std::env::set_var("TEST_LOGWATCH_BOOL_BAD", "not-a-bool");
            std::env::set_var("TEST_LOGWATCH_U64_BAD", "seven");
        }
        override_bool(&mut flag, "TEST_LOGWATCH_BOOL_BAD");
        override_u64(&mut number, "TEST_LOGWATCH_U64_BAD");
        assert!(!flag);
        assert_eq!(number, 7);
        unsafe {
            std::env::remove_var("TEST_LOGWATCH_BOOL_BAD");
            std::env::remove_var("TEST_LOGWATCH_U64_BAD");
        }
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = "original".to_owned();
        override_string(&mut val, "TEST_LOGWATCH_NONEXISTENT_12345");
        assert_eq!(val, "original");
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LogwatchConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LogwatchConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.tailer.poll_interval_ms, parsed.tailer.poll_interval_ms);
        assert_eq!(
            config.distributor.history_limit,
            parsed.distributor.history_limit
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LogwatchConfig::from_file("/nonexistent/path/logwatch.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LogwatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logwatch.toml");
        std::fs::write(&path, "[tailer]\npoll_interval_ms = 300\n").unwrap();
        let config = LogwatchConfig::from_file(&path).await.unwrap();
        assert_eq!(config.tailer.poll_interval_ms, 300);
    }
}
