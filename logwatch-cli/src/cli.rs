//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Logwatch -- log file analysis and rule-based alerting.
///
/// Use `logwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logwatch.toml configuration file.
    ///
    /// When omitted, `logwatch.toml` is used if present, otherwise defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the rule file path from the configuration.
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze log files once and report every matching line.
    Analyze(AnalyzeArgs),

    /// Follow log files and print alerts until Ctrl+C.
    Tail(TailArgs),

    /// Inspect detection rules.
    Rules(RulesArgs),

    /// Inspect configured log files.
    Files(FilesArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- analyze ----

/// Batch-analyze log files against the rule set.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Files to analyze (default: every enabled log file in the rule set).
    pub files: Vec<PathBuf>,

    /// Only report entries at or above this severity (low, medium, high, critical).
    #[arg(long)]
    pub min_severity: Option<String>,

    /// Show at most this many of the latest entries (0 = all).
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

// ---- tail ----

/// Follow log files and print alerts as lines are appended.
#[derive(Args, Debug)]
pub struct TailArgs {
    /// Files to follow (default: every enabled log file in the rule set).
    pub files: Vec<PathBuf>,
}

// ---- rules ----

/// Inspect detection rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List detection rules from the rule file.
    List {
        /// Show only enabled rules.
        #[arg(long)]
        enabled: bool,
    },
    /// Compile every enabled rule and report errors.
    Validate,
}

// ---- files ----

/// Inspect the log files declared in the rule file.
#[derive(Args, Debug)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub action: FilesAction,
}

#[derive(Subcommand, Debug)]
pub enum FilesAction {
    /// List configured log files.
    List {
        /// Show only enabled log files.
        #[arg(long)]
        enabled: bool,
    },
}

// ---- config ----

/// Manage logwatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tailer, distributor, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_analyze_without_files() {
        let cli = Cli::try_parse_from(["logwatch", "analyze"]).expect("should parse 'analyze'");
        match cli.command {
            Commands::Analyze(args) => {
                assert!(args.files.is_empty(), "files should default to empty");
                assert!(args.min_severity.is_none());
                assert_eq!(args.limit, 10);
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parse_analyze_with_files_and_filters() {
        let cli = Cli::try_parse_from([
            "logwatch",
            "analyze",
            "/var/log/auth.log",
            "/var/log/syslog",
            "--min-severity",
            "high",
            "--limit",
            "20",
        ])
        .expect("should parse analyze with files");
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.files[0], PathBuf::from("/var/log/auth.log"));
                assert_eq!(args.min_severity.as_deref(), Some("high"));
                assert_eq!(args.limit, 20);
            }
            _ => panic!("expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parse_tail() {
        let cli = Cli::try_parse_from(["logwatch", "tail", "/var/log/syslog"])
            .expect("should parse tail");
        match cli.command {
            Commands::Tail(args) => assert_eq!(args.files, vec![PathBuf::from("/var/log/syslog")]),
            _ => panic!("expected Tail command"),
        }
    }

    #[test]
    fn test_cli_parse_rules_list_enabled() {
        let cli = Cli::try_parse_from(["logwatch", "rules", "list", "--enabled"])
            .expect("should parse rules list");
        match cli.command {
            Commands::Rules(RulesArgs {
                action: RulesAction::List { enabled },
            }) => assert!(enabled),
            _ => panic!("expected Rules List command"),
        }
    }

    #[test]
    fn test_cli_parse_rules_validate() {
        let cli = Cli::try_parse_from(["logwatch", "rules", "validate"])
            .expect("should parse rules validate");
        assert!(matches!(
            cli.command,
            Commands::Rules(RulesArgs {
                action: RulesAction::Validate
            })
        ));
    }

    #[test]
    fn test_cli_parse_files_list() {
        let cli = Cli::try_parse_from(["logwatch", "files", "list"])
            .expect("should parse files list");
        match cli.command {
            Commands::Files(FilesArgs {
                action: FilesAction::List { enabled },
            }) => assert!(!enabled),
            _ => panic!("expected Files List command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["logwatch", "config", "show", "--section", "tailer"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("tailer")),
            _ => panic!("expected Config Show command"),
        }
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logwatch",
            "rules",
            "list",
            "--output",
            "json",
            "--rules",
            "/tmp/rules.yaml",
            "-c",
            "/tmp/lw.toml",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.rules, Some(PathBuf::from("/tmp/rules.yaml")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lw.toml")));
    }

    #[test]
    fn test_cli_output_default_is_text() {
        let cli = Cli::try_parse_from(["logwatch", "config", "validate"]).expect("should parse");
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_output() {
        assert!(Cli::try_parse_from(["logwatch", "--output", "xml", "config", "validate"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["logwatch"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
