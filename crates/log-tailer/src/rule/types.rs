//! 규칙 데이터 타입
//!
//! YAML 규칙 파일에서 역직렬화되는 구조체들을 정의합니다.

use logwatch_core::types::Severity;
use serde::{Deserialize, Serialize};

use crate::error::TailerError;

/// 규칙 이름 최대 길이
const MAX_RULE_NAME_LEN: usize = 256;

/// 탐지 규칙 -- 정규식 하나와 선택적 제외 정규식
///
/// # YAML 스키마
/// ```yaml
/// name: disk_errors
/// pattern: "(?i)disk (failure|error)"
/// exclude_pattern: "smartd"
/// severity: high
/// description: Disk hardware failures
/// enabled: true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// 규칙 이름 (알림의 `matched_rules`에 기록됨)
    pub name: String,
    /// 매칭 정규식
    pub pattern: String,
    /// 제외 정규식 (같은 라인에 매칭되면 규칙 불일치)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_pattern: Option<String>,
    /// 심각도 (미지정 시 `unknown`)
    #[serde(default)]
    pub severity: Severity,
    /// 규칙 설명
    #[serde(default)]
    pub description: String,
    /// 활성화 여부 (미지정 시 비활성)
    #[serde(default)]
    pub enabled: bool,
}

impl Rule {
    /// 규칙의 유효성을 검증합니다.
    ///
    /// 정규식 컴파일은 [`RuleEngine::load`](super::RuleEngine::load)에서 수행합니다.
    pub fn validate(&self) -> Result<(), TailerError> {
        if self.name.trim().is_empty() {
            return Err(TailerError::RuleValidation {
                rule: "(empty)".to_owned(),
                reason: "rule name must not be empty".to_owned(),
            });
        }

        if self.name.len() > MAX_RULE_NAME_LEN {
            return Err(TailerError::RuleValidation {
                rule: self.name.clone(),
                reason: format!("rule name must not exceed {MAX_RULE_NAME_LEN} characters"),
            });
        }

        Ok(())
    }

    /// 비어 있지 않은 제외 패턴
    pub fn exclude(&self) -> Option<&str> {
        self.exclude_pattern
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
    }
}

/// 감시 대상 로그 파일 (정적 설정)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileSpec {
    /// 파일 경로
    pub path: String,
    /// 로그 종류 태그 (syslog, nginx 등 자유 형식)
    #[serde(rename = "type", default)]
    pub kind: String,
    /// 활성화 여부
    #[serde(default)]
    pub enabled: bool,
}

/// 규칙 파일 최상위 구조
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetConfig {
    /// 탐지 규칙 (평가 순서 = 선언 순서)
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// 로그 파일 목록
    #[serde(default)]
    pub log_files: Vec<LogFileSpec>,
}
