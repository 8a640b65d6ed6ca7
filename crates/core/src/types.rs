//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 테일러, 배포기, CLI가 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다
/// (`Unknown < Low < Medium < High < Critical`).
/// 인식할 수 없거나 비어 있는 값은 `Unknown`(순위 0)이며,
/// 표시 문자열도 `"unknown"`으로 순위와 일치합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 미지정 또는 인식할 수 없는 값
    #[default]
    Unknown,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적, 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 모든 심각도 (순위 오름차순)
    pub const ALL: [Severity; 5] = [
        Self::Unknown,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자와 앞뒤 공백을 무시하며, 터키어 레이블
    /// (`kritik`, `yüksek`, `orta`, `düşük`)도 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "crit" | "kritik" => Some(Self::Critical),
            "high" | "yüksek" => Some(Self::High),
            "medium" | "med" | "orta" => Some(Self::Medium),
            "low" | "düşük" => Some(Self::Low),
            _ => None,
        }
    }

    /// 비교용 정수 순위 (critical=4 ... unknown=0)
    pub fn rank(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// 여러 심각도 중 최댓값을 반환합니다. 비어 있으면 `Unknown`.
    ///
    /// 누적하지 않고 항상 최댓값만 취합니다.
    pub fn escalate<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        severities.into_iter().max().unwrap_or_default()
    }

    /// 소문자 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(Self::from_str_loose)
            .unwrap_or_default())
    }
}

/// 로그 알림
///
/// 감시 중인 파일에 새로 추가된 한 줄이 하나 이상의 규칙에 매칭될 때 생성됩니다.
/// 생성 후에는 변경할 수 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// 탐지 시각 (라인 내용이 아닌 수집 시각)
    timestamp: DateTime<Utc>,
    /// 원본 파일 경로
    source: PathBuf,
    /// 원본 라인 (앞뒤 공백 제거됨)
    line: String,
    /// 매칭된 규칙 이름 (규칙 평가 순서, 중복 제거 없음)
    matched_rules: Vec<String>,
    /// 매칭된 규칙들의 최대 심각도
    severity: Severity,
}

impl Alert {
    /// 새 알림을 생성합니다.
    ///
    /// `matches`는 평가 순서대로의 (규칙 이름, 심각도) 쌍입니다.
    /// 알림 심각도는 그 중 최댓값입니다.
    pub fn new<I, S>(
        timestamp: DateTime<Utc>,
        source: impl Into<PathBuf>,
        line: impl Into<String>,
        matches: I,
    ) -> Self
    where
        I: IntoIterator<Item = (S, Severity)>,
        S: Into<String>,
    {
        let mut matched_rules = Vec::new();
        let mut severity = Severity::Unknown;
        for (name, rule_severity) in matches {
            matched_rules.push(name.into());
            severity = severity.max(rule_severity);
        }

        Self {
            timestamp,
            source: source.into(),
            line: line.into(),
            matched_rules,
            severity,
        }
    }

    /// 탐지 시각
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 원본 파일 경로
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// 원본 라인
    pub fn line(&self) -> &str {
        &self.line
    }

    /// 매칭된 규칙 이름 목록
    pub fn matched_rules(&self) -> &[String] {
        &self.matched_rules
    }

    /// 알림 심각도
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (rules: {}) {}",
            self.severity,
            self.source.display(),
            self.matched_rules.join(", "),
            self.line,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Unknown < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_rank_matches_ordering() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
        }
        assert_eq!(Severity::Critical.rank(), 4);
        assert_eq!(Severity::Unknown.rank(), 0);
    }

    #[test]
    fn severity_default_is_unknown() {
        assert_eq!(Severity::default(), Severity::Unknown);
        assert_eq!(Severity::default().to_string(), "unknown");
    }

    #[test]
    fn severity_from_str_loose() {
        assert_eq!(Severity::from_str_loose("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose(" crit "), Some(Severity::Critical));
        assert_eq!(Severity::from_str_loose("kritik"), Some(Severity::Critical));
        assert_eq!(Severity::from_str_loose("Yüksek"), Some(Severity::High));
        assert_eq!(Severity::from_str_loose("orta"), Some(Severity::Medium));
        assert_eq!(Severity::from_str_loose("düşük"), Some(Severity::Low));
        assert_eq!(Severity::from_str_loose("info"), None);
        assert_eq!(Severity::from_str_loose(""), None);
    }

    #[test]
    fn severity_deserialize_unknown_is_lowest() {
        let s: Severity = serde_json::from_str("\"whatever\"").unwrap();
        assert_eq!(s, Severity::Unknown);
        let s: Severity = serde_json::from_str("null").unwrap();
        assert_eq!(s, Severity::Unknown);
        let s: Severity = serde_json::from_str("\"Critical\"").unwrap();
        assert_eq!(s, Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }

    #[test]
    fn escalate_takes_maximum() {
        let s = Severity::escalate([Severity::Medium, Severity::Critical, Severity::Low]);
        assert_eq!(s, Severity::Critical);
        assert_eq!(Severity::escalate(std::iter::empty()), Severity::Unknown);
    }

    #[test]
    fn alert_keeps_rule_order_and_max_severity() {
        let alert = Alert::new(
            Utc::now(),
            "/var/log/app.log",
            "ERROR disk failure",
            [
                ("disk", Severity::Medium),
                ("error", Severity::Critical),
                ("disk", Severity::Low),
            ],
        );
        assert_eq!(alert.matched_rules(), ["disk", "error", "disk"]);
        assert_eq!(alert.severity(), Severity::Critical);
        assert_eq!(alert.source(), Path::new("/var/log/app.log"));
    }

    #[test]
    fn alert_with_unset_severities_is_unknown() {
        let alert = Alert::new(Utc::now(), "/tmp/a", "x", [("r", Severity::Unknown)]);
        assert_eq!(alert.severity(), Severity::Unknown);
    }

    #[test]
    fn alert_serializes_camel_case() {
        let alert = Alert::new(Utc::now(), "/tmp/a.log", "boom", [("r1", Severity::High)]);
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["matchedRules"][0], "r1");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["source"], "/tmp/a.log");
    }

    #[test]
    fn alert_display() {
        let alert = Alert::new(Utc::now(), "/tmp/a.log", "boom", [("r1", Severity::High)]);
        let display = alert.to_string();
        assert!(display.contains("high"));
        assert!(display.contains("r1"));
        assert!(display.contains("boom"));
    }
}
