#![no_main]

use libfuzzer_sys::fuzz_target;
use logwatch_tailer::parser::{resolve_timestamp, summarize_line};

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 항상 값을 반환해야 한다
    let summary = summarize_line(&line);
    // 요약이 비면 원본 라인을 그대로 돌려줌
    if summary != line {
        assert!(!summary.contains("  "));
    }
    let _ = resolve_timestamp(&line);
});
