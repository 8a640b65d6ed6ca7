#![no_main]

use libfuzzer_sys::fuzz_target;
use logwatch_tailer::{RuleEngine, RuleLoader};

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        if let Ok(rule_set) = RuleLoader::parse_yaml(yaml_str, "fuzz-input.yaml") {
            // 컴파일 실패는 Err이어야 하며 패닉이면 안 됨
            let _ = RuleEngine::new().load_config(rule_set);
        }
    }
});
