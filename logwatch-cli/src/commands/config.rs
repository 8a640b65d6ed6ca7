//! `logwatch config` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
pub const SECTIONS: [&str; 4] = ["general", "tailer", "distributor", "metrics"];

/// Execute the `config` command.
///
/// `ctx` is the already-resolved context; loading failures surface here as
/// a `validate` report instead of an early exit.
pub async fn execute(
    args: ConfigArgs,
    ctx: Result<CommandContext, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => {
            let report = build_validation_report(ctx);
            writer.render(&report)?;
            if !report.valid {
                return Err(CliError::Config("configuration is invalid".to_owned()));
            }
            Ok(())
        }
        ConfigAction::Show { section } => {
            let report = build_show_report(&ctx?, section.as_deref())?;
            writer.render(&report)
        }
    }
}

/// Turn a context load result into a validation report.
pub fn build_validation_report(ctx: Result<CommandContext, CliError>) -> ConfigValidationReport {
    match ctx {
        Ok(ctx) => {
            info!(source = %ctx.config_source, "configuration is valid");
            ConfigValidationReport {
                source: ctx.config_source,
                valid: true,
                errors: Vec::new(),
            }
        }
        Err(e) => ConfigValidationReport {
            source: "(config)".to_owned(),
            valid: false,
            errors: vec![e.to_string()],
        },
    }
}

/// Serialize the effective configuration, or one section of it.
pub fn build_show_report(
    ctx: &CommandContext,
    section: Option<&str>,
) -> Result<ConfigReport, CliError> {
    let config = &ctx.config;
    let config_toml = match section {
        None => to_toml(config),
        Some("general") => to_toml(&config.general),
        Some("tailer") => to_toml(&config.tailer),
        Some("distributor") => to_toml(&config.distributor),
        Some("metrics") => to_toml(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: ctx.config_source.clone(),
        section: section.map(str::to_owned),
        config: serde_json::to_value(config)?,
        config_toml,
    })
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering; JSON output carries
/// the structured `config` instead.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Full effective configuration
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logwatch_core::config::LogwatchConfig;
    use std::path::PathBuf;

    fn ctx() -> CommandContext {
        CommandContext {
            config: LogwatchConfig::default(),
            config_source: "test.toml".to_owned(),
            rules_path: PathBuf::from("rules.yaml"),
        }
    }

    #[test]
    fn test_show_full_config() {
        let report = build_show_report(&ctx(), None).expect("should build");
        assert!(report.section.is_none());
        assert!(report.config_toml.contains("[tailer]"));
        assert!(report.config_toml.contains("poll_interval_ms = 1000"));
        assert_eq!(report.config["tailer"]["alert_queue_capacity"], 100);
    }

    #[test]
    fn test_show_single_section() {
        let report = build_show_report(&ctx(), Some("distributor")).expect("should build");
        assert_eq!(report.section.as_deref(), Some("distributor"));
        assert!(report.config_toml.contains("history_limit = 1000"));
        assert!(!report.config_toml.contains("poll_interval_ms"));
    }

    #[test]
    fn test_show_unknown_section() {
        let err = build_show_report(&ctx(), Some("storage")).unwrap_err();
        assert!(err.to_string().contains("unknown section: storage"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validation_report_from_error() {
        let report = build_validation_report(Err(CliError::Config("bad".to_owned())));
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_config_report_render_text_specific_section() {
        colored::control::set_override(false);
        let report = build_show_report(&ctx(), Some("metrics")).expect("should build");

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("Configuration [metrics] (source: test.toml)"));
        assert!(output.contains("port = 9100"));
    }

    #[test]
    fn test_config_validation_report_render_valid() {
        colored::control::set_override(false);
        let report = build_validation_report(Ok(ctx()));

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("should render");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("VALID"));
        assert!(!output.contains("INVALID"));
    }
}
