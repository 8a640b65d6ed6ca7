//! 탐지 규칙 엔진 -- YAML 기반 라인 매칭
//!
//! 정규식 규칙을 로드하여 로그 라인 하나에 대해 모든 활성 규칙을
//! 선언 순서대로 평가합니다.
//!
//! # 규칙 파일 형식
//! ```yaml
//! rules:
//!   - name: disk_errors
//!     pattern: "disk (failure|error)"
//!     exclude_pattern: "smartd"
//!     severity: high
//!     description: Disk hardware failures
//!     enabled: true
//! log_files:
//!   - path: /var/log/syslog
//!     type: syslog
//!     enabled: true
//! ```
//!
//! # 아키텍처
//! - [`RuleEngine`]: 규칙 스냅샷 관리 및 매칭 코디네이터
//! - [`loader`]: YAML 파일 로딩 및 유효성 검증
//! - [`matcher`]: 정규식 사전 컴파일 및 제외 패턴 처리
//! - [`types`]: 규칙 데이터 구조 정의

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::RuleLoader;
pub use matcher::CompiledRule;
pub use types::{LogFileSpec, Rule, RuleSetConfig};

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::TailerError;

/// 한 번의 로드로 만들어진 불변 규칙 스냅샷
#[derive(Debug, Default)]
struct RuleSnapshot {
    /// 선언된 모든 규칙 (비활성 포함)
    rules: Vec<Rule>,
    /// 로그 파일 목록
    log_files: Vec<LogFileSpec>,
    /// 활성 규칙만 컴파일한 목록 (선언 순서 유지)
    compiled: Vec<CompiledRule>,
}

/// 규칙 엔진 -- 컴파일된 규칙 집합 소유 및 라인 평가
///
/// 읽기 위주 구조입니다. 매칭은 읽기 락 아래에서 스냅샷 `Arc`만 복제한 뒤
/// 락 없이 수행하므로 여러 감시자가 동시에 호출해도 블로킹되지 않습니다.
/// 로드는 새 스냅샷을 모두 컴파일한 뒤에만 교체합니다.
///
/// # 사용 예시
/// ```ignore
/// let engine = RuleEngine::new();
/// let set = RuleLoader::load_file("rules.yaml").await?;
/// engine.load(set.rules, set.log_files)?;
///
/// for rule in engine.match_rules("ERROR disk failure") {
///     println!("{} ({})", rule.name, rule.severity);
/// }
/// ```
#[derive(Debug, Default)]
pub struct RuleEngine {
    snapshot: RwLock<Arc<RuleSnapshot>>,
}

impl RuleEngine {
    /// 빈 규칙 엔진을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 규칙과 로그 파일 목록을 로드합니다.
    ///
    /// 활성 규칙의 패턴을 모두 컴파일한 뒤 한 번에 교체합니다.
    /// 하나라도 실패하면 에러를 반환하고 기존 상태는 그대로 유지됩니다.
    /// 성공 시 컴파일된 활성 규칙 수를 반환합니다.
    pub fn load(&self, rules: Vec<Rule>, log_files: Vec<LogFileSpec>) -> Result<usize, TailerError> {
        let mut compiled = Vec::new();
        for rule in rules.iter().filter(|rule| rule.enabled) {
            rule.validate()?;
            compiled.push(CompiledRule::compile(rule)?);
        }

        let count = compiled.len();
        let snapshot = Arc::new(RuleSnapshot {
            rules,
            log_files,
            compiled,
        });

        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;

        metrics::gauge!(logwatch_core::metrics::TAILER_RULES_LOADED).set(count as f64);
        tracing::info!(enabled_rules = count, "rule set loaded");
        Ok(count)
    }

    /// 파싱된 규칙 파일 전체를 로드합니다.
    pub fn load_config(&self, config: RuleSetConfig) -> Result<usize, TailerError> {
        self.load(config.rules, config.log_files)
    }

    /// 규칙 파일을 다시 읽어 교체합니다. 실패 시 기존 규칙이 유지됩니다.
    pub async fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<usize, TailerError> {
        let config = RuleLoader::load_file(path).await?;
        self.load_config(config)
    }

    /// 라인에 매칭되는 활성 규칙을 평가 순서대로 반환합니다.
    ///
    /// 매칭이 없으면 빈 목록을 반환합니다.
    pub fn match_rules(&self, line: &str) -> Vec<Rule> {
        let snapshot = self.current();
        snapshot
            .compiled
            .iter()
            .filter(|compiled| compiled.matches(line))
            .map(|compiled| compiled.rule().clone())
            .collect()
    }

    /// 선언된 모든 규칙의 복사본
    pub fn get_rules(&self) -> Vec<Rule> {
        self.current().rules.clone()
    }

    /// 활성 규칙의 복사본
    pub fn get_enabled_rules(&self) -> Vec<Rule> {
        self.current()
            .rules
            .iter()
            .filter(|rule| rule.enabled)
            .cloned()
            .collect()
    }

    /// 로그 파일 목록의 복사본
    pub fn get_log_files(&self) -> Vec<LogFileSpec> {
        self.current().log_files.clone()
    }

    /// 활성 로그 파일 목록의 복사본
    pub fn get_enabled_log_files(&self) -> Vec<LogFileSpec> {
        self.current()
            .log_files
            .iter()
            .filter(|file| file.enabled)
            .cloned()
            .collect()
    }

    /// 컴파일된 활성 규칙 수
    pub fn rule_count(&self) -> usize {
        self.current().compiled.len()
    }

    fn current(&self) -> Arc<RuleSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }
}
