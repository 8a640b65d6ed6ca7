//! 규칙 파일 로더 -- YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! 하나의 문서에 `rules`와 `log_files` 목록이 함께 들어 있습니다.
//! 규칙 하나라도 검증에 실패하면 전체 로드가 실패합니다.

use std::collections::HashSet;
use std::path::Path;

use crate::error::TailerError;

use super::types::RuleSetConfig;

const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULES_COUNT: usize = 10_000;

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// YAML 규칙 파일을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 10MB를 초과하는 경우
    /// - YAML 파싱 또는 규칙 검증에 실패한 경우
    pub async fn load_file(path: impl AsRef<Path>) -> Result<RuleSetConfig, TailerError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| TailerError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(TailerError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| TailerError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let set = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            rules = set.rules.len(),
            log_files = set.log_files.len(),
            "loaded rule file"
        );

        Ok(set)
    }

    /// YAML 문자열을 파싱하여 규칙 집합을 생성합니다.
    pub fn parse_yaml(yaml_str: &str, source: &str) -> Result<RuleSetConfig, TailerError> {
        let set: RuleSetConfig =
            serde_yaml::from_str(yaml_str).map_err(|e| TailerError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        if set.rules.len() > MAX_RULES_COUNT {
            return Err(TailerError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }

        let mut seen = HashSet::new();
        for rule in &set.rules {
            // 비활성 규칙은 로드만 하고 검증하지 않음
            if rule.enabled {
                rule.validate()?;
            }
            if !seen.insert(rule.name.as_str()) {
                // 같은 이름이 두 번 나오면 알림에도 두 번 기록됨
                tracing::warn!(rule = %rule.name, source, "duplicate rule name");
            }
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwatch_core::types::Severity;

    #[test]
    fn parse_valid_yaml() {
        let yaml = r#"
rules:
  - name: test_rule
    pattern: "ERROR"
    severity: Medium
    enabled: true
log_files:
  - path: /var/log/syslog
    type: syslog
    enabled: true
"#;
        let set = RuleLoader::parse_yaml(yaml, "test.yaml").unwrap();
        assert_eq!(set.rules[0].name, "test_rule");
        assert_eq!(set.rules[0].severity, Severity::Medium);
        assert_eq!(set.log_files[0].path, "/var/log/syslog");
    }

    #[test]
    fn parse_empty_document_yields_empty_set() {
        let set = RuleLoader::parse_yaml("{}", "empty.yaml").unwrap();
        assert!(set.rules.is_empty());
        assert!(set.log_files.is_empty());
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = RuleLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yaml");
        assert!(matches!(result, Err(TailerError::RuleLoad { .. })));
    }

    #[test]
    fn parse_rule_with_empty_name_fails() {
        let yaml = r#"
rules:
  - name: ""
    pattern: "x"
    enabled: true
"#;
        let result = RuleLoader::parse_yaml(yaml, "empty_name.yaml");
        assert!(matches!(result, Err(TailerError::RuleValidation { .. })));
    }

    #[test]
    fn disabled_rule_is_not_validated() {
        let yaml = r#"
rules:
  - name: ""
    pattern: "x"
    enabled: false
  - name: live
    pattern: "ERROR"
    enabled: true
"#;
        let set = RuleLoader::parse_yaml(yaml, "disabled.yaml").unwrap();
        assert_eq!(set.rules.len(), 2);

        let engine = crate::rule::RuleEngine::new();
        assert_eq!(engine.load_config(set).unwrap(), 1);
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = RuleLoader::load_file("/nonexistent/path/rules.yaml").await;
        assert!(matches!(result, Err(TailerError::RuleLoad { .. })));
    }

    #[tokio::test]
    async fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(
            &path,
            "rules:\n  - name: r\n    pattern: \"x\"\n    enabled: true\n",
        )
        .unwrap();
        let set = RuleLoader::load_file(&path).await.unwrap();
        assert_eq!(set.rules.len(), 1);
    }
}
