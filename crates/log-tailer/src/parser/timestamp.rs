//! 타임스탬프 휴리스틱
//!
//! 일괄 분석 전용입니다. 실시간 감시는 수집 시각을 사용합니다.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// 라인 앞부분에서 타임스탬프로 보이는 텍스트를 찾습니다.
///
/// 공백 토큰이 3개 이상일 때만 판단합니다.
/// - 첫 토큰 3바이트 이하, 둘째 토큰 2바이트 이하: syslog 형식 `"Jan 5 10:00:00"`
/// - 첫 토큰에 `T` 또는 `-` 포함: ISO-8601 형식
pub fn extract_timestamp(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    let (first, second, third) = (tokens.next()?, tokens.next()?, tokens.next()?);

    if first.len() <= 3 && second.len() <= 2 {
        return Some(format!("{first} {second} {third}"));
    }
    if first.contains('T') || first.contains('-') {
        return Some(first.to_owned());
    }
    None
}

/// 라인에서 타임스탬프를 추정합니다. 찾지 못하면 현재 시각.
///
/// 반환값은 (해석된 시각, 표시용 텍스트)입니다. 텍스트는 추출한 원문이며,
/// 추출 실패 시 현재 시각의 RFC 3339 문자열입니다.
pub fn resolve_timestamp(line: &str) -> (DateTime<Utc>, String) {
    let now = Utc::now();
    match extract_timestamp(line) {
        Some(text) => {
            let parsed = parse_timestamp(&text, now.year()).unwrap_or(now);
            (parsed, text)
        }
        None => (now, now.to_rfc3339()),
    }
}

/// 알려진 형식으로 해석합니다. 연도가 없는 syslog 형식은 `year`를 씁니다.
fn parse_timestamp(text: &str, year: i32) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }

    let with_year = format!("{year} {text}");
    ["%Y %b %d %H:%M:%S", "%Y %b %e %H:%M:%S"]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&with_year, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn extracts_syslog_prefix() {
        let line = "Jan  5 10:00:01 host sshd[1]: Failed password";
        assert_eq!(extract_timestamp(line).as_deref(), Some("Jan 5 10:00:01"));
    }

    #[test]
    fn extracts_iso_token() {
        let line = "2024-03-01T12:30:00Z ERROR something broke";
        assert_eq!(
            extract_timestamp(line).as_deref(),
            Some("2024-03-01T12:30:00Z")
        );
    }

    #[test]
    fn short_line_has_no_timestamp() {
        assert_eq!(extract_timestamp("ERROR boom"), None);
        assert_eq!(extract_timestamp(""), None);
    }

    #[test]
    fn token_length_counts_bytes() {
        // "Şub"은 3글자지만 4바이트
        assert_eq!(extract_timestamp("Şub 5 10:00:00 host boot"), None);
        assert_eq!(
            extract_timestamp("Feb 5 10:00:00 host boot").as_deref(),
            Some("Feb 5 10:00:00")
        );
    }

    #[test]
    fn plain_words_have_no_timestamp() {
        assert_eq!(extract_timestamp("ERROR disk failure on sda"), None);
    }

    #[test]
    fn resolves_rfc3339() {
        let (ts, text) = resolve_timestamp("2024-03-01T12:30:00Z ERROR x y");
        assert_eq!(text, "2024-03-01T12:30:00Z");
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 12);
    }

    #[test]
    fn resolves_syslog_with_given_year() {
        let parsed = parse_timestamp("Mar 7 08:15:00", 2023).unwrap();
        assert_eq!(parsed.year(), 2023);
        assert_eq!(parsed.month(), 3);
        assert_eq!(parsed.day(), 7);
        assert_eq!(parsed.minute(), 15);
    }

    #[test]
    fn resolves_naive_iso() {
        let parsed = parse_timestamp("2024-01-02T03:04:05", 2000).unwrap();
        assert_eq!(parsed.day(), 2);
        assert_eq!(parsed.second(), 5);
    }

    #[test]
    fn unparsable_text_falls_back_to_now() {
        let before = Utc::now();
        let (ts, text) = resolve_timestamp("abc de fgh ERROR");
        assert_eq!(text, "abc de fgh");
        assert!(ts >= before);
    }

    #[test]
    fn missing_timestamp_uses_now_text() {
        let (ts, text) = resolve_timestamp("ERROR boom");
        assert_eq!(text, ts.to_rfc3339());
    }
}
