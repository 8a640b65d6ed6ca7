//! 일괄 분석 -- 파일 전체를 한 번 훑어 규칙 매칭 결과를 모읍니다.
//!
//! 실시간 감시와 달리 타임스탬프를 라인 내용에서 추정합니다
//! ([`resolve_timestamp`](crate::parser::resolve_timestamp)).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use logwatch_core::types::Severity;

use crate::error::TailerError;
use crate::parser::{resolve_timestamp, summarize_line};
use crate::rule::RuleEngine;

/// 분석 결과 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    /// 라인에서 추정한 시각 (실패 시 분석 시각)
    pub timestamp: DateTime<Utc>,
    /// 추정에 사용한 원문 텍스트
    pub timestamp_text: String,
    /// 파일 이름
    pub source: String,
    /// 전체 파일 경로
    pub log_file: PathBuf,
    /// 원본 라인
    pub line: String,
    /// 요약
    pub summary: String,
    /// 매칭된 규칙 이름 (평가 순서)
    pub matched_rules: Vec<String>,
    /// 최대 심각도
    pub severity: Severity,
}

/// 일괄 분석기
#[derive(Debug, Clone)]
pub struct Analyzer {
    engine: Arc<RuleEngine>,
}

impl Analyzer {
    /// 규칙 엔진을 공유하는 분석기를 생성합니다.
    pub fn new(engine: Arc<RuleEngine>) -> Self {
        Self { engine }
    }

    /// 파일 하나를 분석합니다.
    ///
    /// 잘못된 UTF-8은 대체 문자로 바꿔 읽고, 빈 라인은 건너뜁니다.
    pub async fn analyze_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Vec<AnalysisEntry>, TailerError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| analyze_error(path, "failed to open file", &e))?;
        let mut reader = BufReader::new(file);

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut entries = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| analyze_error(path, "error reading file", &e))?;
            if read == 0 {
                break;
            }

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }

            let matched = self.engine.match_rules(line);
            if matched.is_empty() {
                continue;
            }

            let (timestamp, timestamp_text) = resolve_timestamp(line);
            entries.push(AnalysisEntry {
                timestamp,
                timestamp_text,
                source: source.clone(),
                log_file: path.to_path_buf(),
                line: line.to_owned(),
                summary: summarize_line(line),
                severity: Severity::escalate(matched.iter().map(|rule| rule.severity)),
                matched_rules: matched.into_iter().map(|rule| rule.name).collect(),
            });
        }

        tracing::debug!(path = %path.display(), matches = entries.len(), "analyzed file");
        Ok(entries)
    }

    /// 여러 파일을 분석합니다. 읽을 수 없는 파일은 경고 후 건너뜁니다.
    pub async fn analyze_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<AnalysisEntry> {
        let mut all = Vec::new();
        for path in paths {
            match self.analyze_file(path).await {
                Ok(entries) => all.extend(entries),
                Err(e) => {
                    tracing::warn!(path = %path.as_ref().display(), error = %e, "skipping file");
                }
            }
        }
        all
    }
}

fn analyze_error(path: &Path, what: &str, err: &std::io::Error) -> TailerError {
    TailerError::Analyze {
        path: path.display().to_string(),
        reason: format!("{what}: {err}"),
    }
}
