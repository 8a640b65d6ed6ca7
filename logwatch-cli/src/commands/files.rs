//! `logwatch files` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::cli::{FilesAction, FilesArgs};
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `files` command.
pub async fn execute(
    args: FilesArgs,
    ctx: &CommandContext,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        FilesAction::List { enabled } => {
            let report = build_list_report(ctx, enabled).await?;
            writer.render(&report)
        }
    }
}

/// List log files declared in the rule file.
pub async fn build_list_report(
    ctx: &CommandContext,
    enabled_only: bool,
) -> Result<FileListReport, CliError> {
    info!(path = %ctx.rules_path.display(), "listing log files");

    let rule_set = ctx.load_rule_set().await?;
    let mut files = Vec::new();
    for spec in rule_set.log_files {
        if enabled_only && !spec.enabled {
            continue;
        }
        let exists = tokio::fs::try_exists(Path::new(&spec.path))
            .await
            .unwrap_or(false);
        files.push(FileEntry {
            path: spec.path,
            kind: spec.kind,
            enabled: spec.enabled,
            exists,
        });
    }

    Ok(FileListReport {
        total: files.len(),
        files,
    })
}

#[derive(Debug, Serialize)]
pub struct FileListReport {
    pub total: usize,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
    /// Whether the file exists right now.
    pub exists: bool,
}

impl Render for FileListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Log Files ({} total)", self.total.to_string().bold())?;
        writeln!(w)?;
        writeln!(w, "{:<4} {:<48} {:<12} {:<9} Exists", "#", "Path", "Type", "Status")?;
        writeln!(w, "{}", "-".repeat(84))?;

        for (i, f) in self.files.iter().enumerate() {
            let status = if f.enabled {
                format!("{:<9}", "enabled").green()
            } else {
                format!("{:<9}", "disabled").yellow()
            };
            let exists = if f.exists { "yes".normal() } else { "no".red() };
            writeln!(
                w,
                "{:<4} {:<48} {:<12} {} {}",
                i + 1,
                f.path,
                f.kind,
                status,
                exists
            )?;
        }

        Ok(())
    }
}
