//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logwatch_`
//! - 모듈명: `tailer_`, `bus_`, `distributor_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logwatch_core::metrics::TAILER_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (unknown, low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 규칙 이름 레이블 키
pub const LABEL_RULE: &str = "rule";

// ─── Tailer 메트릭 ─────────────────────────────────────────────────

/// Tailer: 감시 중인 파일 수 (gauge)
pub const TAILER_WATCHED_FILES: &str = "logwatch_tailer_watched_files";

/// Tailer: 읽은 전체 라인 수 (counter)
pub const TAILER_LINES_READ_TOTAL: &str = "logwatch_tailer_lines_read_total";

/// Tailer: 규칙 매칭 수 (counter, label: rule)
pub const TAILER_RULE_MATCHES_TOTAL: &str = "logwatch_tailer_rule_matches_total";

/// Tailer: 잘림/교체 감지 후 재동기화 횟수 (counter)
pub const TAILER_RESYNCS_TOTAL: &str = "logwatch_tailer_resyncs_total";

/// Tailer: 폴링 중 발생한 I/O 에러 수 (counter)
pub const TAILER_POLL_ERRORS_TOTAL: &str = "logwatch_tailer_poll_errors_total";

/// Tailer: 로드된 활성 규칙 수 (gauge)
pub const TAILER_RULES_LOADED: &str = "logwatch_tailer_rules_loaded";

// ─── Alert Bus 메트릭 ──────────────────────────────────────────────

/// Bus: 큐에 들어간 알림 수 (counter, label: severity)
pub const BUS_ALERTS_SENT_TOTAL: &str = "logwatch_bus_alerts_sent_total";

/// Bus: 큐가 가득 차 드롭된 알림 수 (counter)
pub const BUS_ALERTS_DROPPED_TOTAL: &str = "logwatch_bus_alerts_dropped_total";

// ─── Distributor 메트릭 ────────────────────────────────────────────

/// Distributor: 현재 구독자 수 (gauge)
pub const DISTRIBUTOR_SUBSCRIBERS: &str = "logwatch_distributor_subscribers";

/// Distributor: 이력에 보관 중인 알림 수 (gauge)
pub const DISTRIBUTOR_HISTORY_SIZE: &str = "logwatch_distributor_history_size";

/// Distributor: 전달 실패로 제거된 구독자 수 (counter)
pub const DISTRIBUTOR_EVICTIONS_TOTAL: &str = "logwatch_distributor_evictions_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logwatch_daemon_uptime_seconds";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logwatch_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logwatch-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Tailer
    describe_gauge!(
        TAILER_WATCHED_FILES,
        "Number of log files currently being tailed"
    );
    describe_counter!(
        TAILER_LINES_READ_TOTAL,
        "Total number of non-empty lines read from watched files"
    );
    describe_counter!(
        TAILER_RULE_MATCHES_TOTAL,
        "Total number of rule matches per rule"
    );
    describe_counter!(
        TAILER_RESYNCS_TOTAL,
        "Total number of truncation or replacement resyncs"
    );
    describe_counter!(
        TAILER_POLL_ERRORS_TOTAL,
        "Total number of I/O errors encountered while polling"
    );
    describe_gauge!(TAILER_RULES_LOADED, "Number of enabled rules currently loaded");

    // Alert Bus
    describe_counter!(
        BUS_ALERTS_SENT_TOTAL,
        "Total number of alerts accepted by the alert queue"
    );
    describe_counter!(
        BUS_ALERTS_DROPPED_TOTAL,
        "Total number of alerts dropped because the queue was full"
    );

    // Distributor
    describe_gauge!(
        DISTRIBUTOR_SUBSCRIBERS,
        "Number of live alert subscribers"
    );
    describe_gauge!(
        DISTRIBUTOR_HISTORY_SIZE,
        "Number of alerts retained in history"
    );
    describe_counter!(
        DISTRIBUTOR_EVICTIONS_TOTAL,
        "Total number of subscribers evicted after a failed delivery"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Logwatch daemon uptime in seconds");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
