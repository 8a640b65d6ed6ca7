#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use logwatch_core::types::Severity;
use logwatch_tailer::{Rule, RuleEngine};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 규칙 목록 (최대 8개로 제한)
    rules: Vec<FuzzRule>,
    /// 매칭 대상 라인
    line: String,
}

#[derive(Arbitrary, Debug)]
struct FuzzRule {
    pattern: String,
    exclude_pattern: Option<String>,
    severity: u8,
    enabled: bool,
}

fuzz_target!(|input: FuzzInput| {
    let rules: Vec<Rule> = input
        .rules
        .into_iter()
        .take(8)
        .enumerate()
        .map(|(i, r)| Rule {
            name: format!("fuzz_{i}"),
            pattern: r.pattern,
            exclude_pattern: r.exclude_pattern,
            severity: Severity::ALL[usize::from(r.severity) % Severity::ALL.len()],
            description: String::new(),
            enabled: r.enabled,
        })
        .collect();

    let engine = RuleEngine::new();

    // 잘못된 정규식은 Err로 끝나야 함
    if engine.load(rules, Vec::new()).is_err() {
        return;
    }

    let matched = engine.match_rules(&input.line);
    assert!(matched.iter().all(|rule| rule.enabled));
});
