//! 규칙 매칭 로직 -- 정규식 사전 컴파일
//!
//! [`CompiledRule`]은 활성 규칙 하나의 매칭 정규식과 제외 정규식을
//! 로드 시점에 한 번만 컴파일하여 보관합니다.

use regex::Regex;

use super::types::Rule;
use crate::error::TailerError;

/// 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    rule: Rule,
    pattern: Regex,
    exclude: Option<Regex>,
}

impl CompiledRule {
    /// 규칙의 정규식을 컴파일합니다.
    ///
    /// 실패하면 규칙 이름을 포함한 `RuleValidation` 에러를 반환합니다.
    pub fn compile(rule: &Rule) -> Result<Self, TailerError> {
        let pattern = Regex::new(&rule.pattern).map_err(|e| TailerError::RuleValidation {
            rule: rule.name.clone(),
            reason: format!("invalid pattern: {e}"),
        })?;

        let exclude = rule
            .exclude()
            .map(|raw| {
                Regex::new(raw).map_err(|e| TailerError::RuleValidation {
                    rule: rule.name.clone(),
                    reason: format!("invalid exclude pattern: {e}"),
                })
            })
            .transpose()?;

        Ok(Self {
            rule: rule.clone(),
            pattern,
            exclude,
        })
    }

    /// 패턴이 매칭되고 제외 패턴이 매칭되지 않으면 `true`
    pub fn matches(&self, line: &str) -> bool {
        if !self.pattern.is_match(line) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(line),
            None => true,
        }
    }

    /// 원본 규칙
    pub fn rule(&self) -> &Rule {
        &self.rule
    }
}
