//! `logwatch rules` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use logwatch_core::types::Severity;
use logwatch_tailer::RuleEngine;

use crate::cli::{RulesAction, RulesArgs};
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_label, truncate};

/// Execute the `rules` command.
pub async fn execute(
    args: RulesArgs,
    ctx: &CommandContext,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { enabled } => {
            let report = build_list_report(ctx, enabled).await?;
            writer.render(&report)
        }
        RulesAction::Validate => {
            let report = build_validation_report(ctx).await;
            writer.render(&report)?;
            if !report.valid {
                return Err(CliError::Rule(format!(
                    "rule file {} is invalid",
                    report.path
                )));
            }
            Ok(())
        }
    }
}

/// List rules in declaration order.
pub async fn build_list_report(
    ctx: &CommandContext,
    enabled_only: bool,
) -> Result<RuleListReport, CliError> {
    info!(path = %ctx.rules_path.display(), "listing detection rules");

    let rule_set = ctx.load_rule_set().await?;
    let rules: Vec<RuleEntry> = rule_set
        .rules
        .into_iter()
        .filter(|rule| !enabled_only || rule.enabled)
        .map(|rule| RuleEntry {
            exclude_pattern: rule.exclude().map(str::to_owned),
            name: rule.name,
            pattern: rule.pattern,
            severity: rule.severity,
            enabled: rule.enabled,
            description: rule.description,
        })
        .collect();

    Ok(RuleListReport {
        path: ctx.rules_path.display().to_string(),
        total: rules.len(),
        rules,
    })
}

/// Parse the rule file and compile every enabled rule.
///
/// Never fails: problems are reported in the result.
pub async fn build_validation_report(ctx: &CommandContext) -> RuleValidationReport {
    info!(path = %ctx.rules_path.display(), "validating detection rules");

    let path = ctx.rules_path.display().to_string();
    let outcome = match ctx.load_rule_set().await {
        Ok(rule_set) => {
            let total = rule_set.rules.len();
            let log_files = rule_set.log_files.len();
            RuleEngine::new()
                .load_config(rule_set)
                .map(|compiled| (total, compiled, log_files))
                .map_err(|e| e.to_string())
        }
        Err(e) => Err(e.to_string()),
    };

    match outcome {
        Ok((total_rules, compiled, log_files)) => RuleValidationReport {
            path,
            valid: true,
            total_rules,
            compiled,
            log_files,
            error: None,
        },
        Err(error) => RuleValidationReport {
            path,
            valid: false,
            total_rules: 0,
            compiled: 0,
            log_files: 0,
            error: Some(error),
        },
    }
}

#[derive(Debug, Serialize)]
pub struct RuleListReport {
    pub path: String,
    pub total: usize,
    pub rules: Vec<RuleEntry>,
}

#[derive(Debug, Serialize)]
pub struct RuleEntry {
    pub name: String,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_pattern: Option<String>,
    pub severity: Severity,
    pub enabled: bool,
    pub description: String,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Detection Rules ({} total, {})",
            self.total.to_string().bold(),
            self.path
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<24} {:<8} {:<9} {:<36} Description",
            "Name", "Severity", "Status", "Pattern"
        )?;
        writeln!(w, "{}", "-".repeat(100))?;

        for r in &self.rules {
            let status = if r.enabled {
                format!("{:<9}", "enabled").green()
            } else {
                format!("{:<9}", "disabled").yellow()
            };

            writeln!(
                w,
                "{:<24} {} {} {:<36} {}",
                truncate(&r.name, 24),
                severity_label(r.severity),
                status,
                truncate(&r.pattern, 36),
                r.description
            )?;
            if let Some(exclude) = &r.exclude_pattern {
                writeln!(w, "{:<24} {}", "", format!("exclude: {}", exclude).dimmed())?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub valid: bool,
    pub total_rules: usize,
    pub compiled: usize,
    pub log_files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            writeln!(
                w,
                "  Rules: {} total, {} enabled and compiled",
                self.total_rules, self.compiled
            )?;
            writeln!(w, "  Log files: {}", self.log_files)?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            if let Some(error) = &self.error {
                writeln!(w, "  Error: {}", error.red())?;
            }
        }

        Ok(())
    }
}
