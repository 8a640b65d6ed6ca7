//! `logwatch analyze` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use logwatch_core::types::Severity;
use logwatch_tailer::{AnalysisEntry, Analyzer, RuleEngine};

use crate::cli::AnalyzeArgs;
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_label, truncate};

/// Longest line shown in text output.
const MAX_LINE_DISPLAY: usize = 100;

/// Execute the `analyze` command.
pub async fn execute(
    args: AnalyzeArgs,
    ctx: &CommandContext,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let report = build_report(&args, ctx).await?;
    writer.render(&report)
}

/// Run the analysis and build the report without printing it.
pub async fn build_report(
    args: &AnalyzeArgs,
    ctx: &CommandContext,
) -> Result<AnalyzeReport, CliError> {
    let min_severity = match args.min_severity.as_deref() {
        Some(raw) => Severity::from_str_loose(raw).ok_or_else(|| {
            CliError::Command(format!(
                "unknown severity '{}' (expected: low, medium, high, critical)",
                raw
            ))
        })?,
        None => Severity::Unknown,
    };

    let rule_set = ctx.load_rule_set().await?;
    let engine = Arc::new(RuleEngine::new());
    let compiled = engine.load_config(rule_set)?;

    let files: Vec<PathBuf> = if args.files.is_empty() {
        engine
            .get_enabled_log_files()
            .into_iter()
            .map(|file| PathBuf::from(file.path))
            .collect()
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        return Err(CliError::Command(
            "no log files to analyze: pass files or enable log_files in the rule file".to_owned(),
        ));
    }

    info!(files = files.len(), rules = compiled, "analyzing log files");

    let analyzer = Analyzer::new(engine);
    let mut analyzed = Vec::new();
    let mut skipped = Vec::new();
    let mut matches = Vec::new();
    for path in &files {
        match analyzer.analyze_file(path).await {
            Ok(entries) => {
                analyzed.push(path.display().to_string());
                matches.extend(entries);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                skipped.push(SkippedFile {
                    file: path.display().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    if analyzed.is_empty() {
        return Err(CliError::Command(format!(
            "none of the {} log files could be read",
            files.len()
        )));
    }

    matches.retain(|entry| entry.severity >= min_severity);

    let mut severity_counts = BTreeMap::new();
    for entry in &matches {
        *severity_counts.entry(entry.severity).or_insert(0usize) += 1;
    }

    let total_matches = matches.len();
    let keep_from = if args.limit == 0 {
        0
    } else {
        total_matches.saturating_sub(args.limit)
    };
    let entries = matches.split_off(keep_from);

    Ok(AnalyzeReport {
        files: analyzed,
        skipped,
        total_matches,
        severity_counts,
        entries,
    })
}

/// Result of a batch analysis.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReport {
    /// Files read successfully.
    pub files: Vec<String>,
    /// Files that could not be read.
    pub skipped: Vec<SkippedFile>,
    /// Matching lines across all files (after severity filter).
    pub total_matches: usize,
    /// Matching lines per severity.
    pub severity_counts: BTreeMap<Severity, usize>,
    /// Latest entries, in file order.
    pub entries: Vec<AnalysisEntry>,
}

/// A file that could not be analyzed.
#[derive(Debug, Serialize)]
pub struct SkippedFile {
    /// File path as given.
    pub file: String,
    /// Why it was skipped.
    pub error: String,
}

impl Render for AnalyzeReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Analyzed {} file(s): {} matching line(s)",
            self.files.len(),
            self.total_matches.to_string().bold()
        )?;
        for skipped in &self.skipped {
            writeln!(w, "  {} {}: {}", "skipped".yellow(), skipped.file, skipped.error)?;
        }

        if !self.severity_counts.is_empty() {
            writeln!(w)?;
            writeln!(w, "Summary:")?;
            for (severity, count) in self.severity_counts.iter().rev() {
                writeln!(w, "  {} {}", severity_label(*severity), count)?;
            }
        }

        if self.entries.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(w, "Latest {} match(es):", self.entries.len())?;
        for entry in &self.entries {
            writeln!(w)?;
            writeln!(
                w,
                "[{}] {} - {}",
                severity_label(entry.severity),
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.matched_rules.join(", ")
            )?;
            writeln!(w, "  File:    {}", entry.source)?;
            writeln!(w, "  Summary: {}", entry.summary)?;
            writeln!(w, "  Line:    {}", truncate(&entry.line, MAX_LINE_DISPLAY).dimmed())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(severity: Severity, line: &str) -> AnalysisEntry {
        AnalysisEntry {
            timestamp: Utc::now(),
            timestamp_text: String::new(),
            source: "auth.log".to_owned(),
            log_file: PathBuf::from("/var/log/auth.log"),
            line: line.to_owned(),
            summary: line.to_owned(),
            matched_rules: vec!["ssh_fail".to_owned()],
            severity,
        }
    }

    #[test]
    fn test_render_text_shows_summary_and_entries() {
        colored::control::set_override(false);
        let mut severity_counts = BTreeMap::new();
        severity_counts.insert(Severity::High, 2);
        let report = AnalyzeReport {
            files: vec!["/var/log/auth.log".to_owned()],
            skipped: vec![SkippedFile {
                file: "/var/log/missing.log".to_owned(),
                error: "not found".to_owned(),
            }],
            total_matches: 2,
            severity_counts,
            entries: vec![entry(Severity::High, "Failed password for root")],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");

        assert!(output.contains("Analyzed 1 file(s): 2 matching line(s)"));
        assert!(output.contains("skipped /var/log/missing.log"));
        assert!(output.contains("high"));
        assert!(output.contains("ssh_fail"));
        assert!(output.contains("Failed password for root"));
    }

    #[test]
    fn test_report_json_uses_severity_keys() {
        let mut severity_counts = BTreeMap::new();
        severity_counts.insert(Severity::Critical, 1);
        let report = AnalyzeReport {
            files: vec![],
            skipped: vec![],
            total_matches: 1,
            severity_counts,
            entries: vec![entry(Severity::Critical, "x")],
        };
        let json = serde_json::to_value(&report).expect("should serialize");
        assert_eq!(json["severityCounts"]["critical"], 1);
        assert_eq!(json["entries"][0]["matchedRules"][0], "ssh_fail");
    }
}
