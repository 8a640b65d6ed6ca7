//! 라인 요약

use std::sync::LazyLock;

use regex::Regex;

/// `sshd[1234]:` 같은 선행 프로세스 토큰
static PROCESS_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\w.\-]+\[\d+\]:?\s*").ok());

static WHITESPACE_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// 라인에서 첫 번째 의미 있는 절을 요약으로 추출합니다.
///
/// 1. `"]: "` 뒤의 텍스트, 없으면 `": "` 뒤의 텍스트 (비어 있지 않을 때)
/// 2. 선행 `proc[pid]:` 토큰 제거
/// 3. 연속 공백을 하나로 축약
///
/// 결과가 비면 원본 라인을 그대로 돌려줍니다.
pub fn summarize_line(line: &str) -> String {
    if line.is_empty() {
        return String::new();
    }

    let mut s = line.trim();
    if let Some(idx) = s.find("]: ") {
        s = s[idx + 3..].trim();
    } else if let Some(idx) = s.find(": ") {
        let after = s[idx + 2..].trim();
        if !after.is_empty() {
            s = after;
        }
    }

    let stripped = match PROCESS_PREFIX.as_ref() {
        Some(re) => re.replace(s, "").into_owned(),
        None => s.to_owned(),
    };
    let stripped = stripped.trim();

    let collapsed = match WHITESPACE_RUN.as_ref() {
        Some(re) => re.replace_all(stripped, " ").into_owned(),
        None => stripped.to_owned(),
    };

    if collapsed.is_empty() {
        line.to_owned()
    } else {
        collapsed
    }
}
