//! `logwatch tail` command handler
//!
//! Starts a watcher per file, prints every alert as it arrives and stops
//! cleanly on Ctrl+C. Alerts already queued at shutdown are still printed.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use logwatch_core::types::Alert;
use logwatch_tailer::{AlertBus, AlertStream, RuleEngine, TailerConfig, WatchSet};

use crate::cli::{OutputFormat, TailArgs};
use crate::commands::CommandContext;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, severity_label, truncate};

/// Longest line shown in text output.
const MAX_LINE_DISPLAY: usize = 120;

/// Execute the `tail` command.
pub async fn execute(
    args: TailArgs,
    ctx: &CommandContext,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let session = TailSession::start(&args.files, ctx).await?;

    if writer.format() == OutputFormat::Text {
        eprintln!(
            "Watching {} file(s), press Ctrl+C to stop",
            session.files().len()
        );
    }

    let mut stdout = std::io::stdout();
    session
        .follow(writer.format(), &mut stdout, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
        })
        .await?;
    Ok(())
}

/// Running set of watchers plus the consumer side of their alert queue.
pub struct TailSession {
    set: WatchSet,
    stream: AlertStream,
    files: Vec<PathBuf>,
}

impl TailSession {
    /// Load and compile the rule set, then start watching `files`
    /// (or every enabled log file when empty).
    ///
    /// Files that cannot be opened are skipped with a warning; it is an
    /// error only when none can be watched.
    pub async fn start(files: &[PathBuf], ctx: &CommandContext) -> Result<Self, CliError> {
        let rule_set = ctx.load_rule_set().await?;
        let engine = Arc::new(RuleEngine::new());
        let compiled = engine.load_config(rule_set)?;

        let targets: Vec<PathBuf> = if files.is_empty() {
            engine
                .get_enabled_log_files()
                .into_iter()
                .map(|file| PathBuf::from(file.path))
                .collect()
        } else {
            files.to_vec()
        };
        if targets.is_empty() {
            return Err(CliError::Command(
                "no log files to tail: pass files or enable log_files in the rule file".to_owned(),
            ));
        }

        let mut config = TailerConfig::from_core(&ctx.config.tailer);
        config.rules_path = ctx.rules_path.clone();
        config.validate()?;

        let (bus, stream) = AlertBus::new(config.alert_queue_capacity);
        let set = WatchSet::new(config, engine, bus);

        let mut started = Vec::new();
        for path in targets {
            match set.start_watching(&path).await {
                Ok(()) => started.push(path),
                Err(e) => warn!(path = %path.display(), error = %e, "cannot watch file"),
            }
        }

        if started.is_empty() {
            set.stop().await;
            return Err(CliError::Command(
                "none of the requested log files could be watched".to_owned(),
            ));
        }

        info!(files = started.len(), rules = compiled, "tailing log files");
        Ok(Self {
            set,
            stream,
            files: started,
        })
    }

    /// Files actually being watched.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Print alerts until `shutdown` completes, then stop every watcher,
    /// drain the queue and print a summary.
    pub async fn follow<F>(
        mut self,
        format: OutputFormat,
        w: &mut dyn Write,
        shutdown: F,
    ) -> Result<TailSummary, CliError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut printed = 0u64;

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                alert = self.stream.recv() => match alert {
                    Some(alert) => {
                        write_alert(format, w, &alert)?;
                        printed += 1;
                    }
                    None => break,
                },
            }
        }

        self.set.stop().await;
        while let Some(alert) = self.stream.recv().await {
            write_alert(format, w, &alert)?;
            printed += 1;
        }

        let stats = self.set.bus_stats();
        let summary = TailSummary {
            files: self.files.len(),
            alerts: printed,
            dropped: stats.dropped(),
        };

        match format {
            OutputFormat::Text => {
                writeln!(w)?;
                summary.render_text(w)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *w, &summary)?;
                writeln!(w)?;
            }
        }
        w.flush()?;

        Ok(summary)
    }
}

fn write_alert(format: OutputFormat, w: &mut dyn Write, alert: &Alert) -> Result<(), CliError> {
    match format {
        OutputFormat::Text => {
            use colored::Colorize;

            writeln!(
                w,
                "[{}] {} {} ({}) {}",
                severity_label(alert.severity()),
                alert.timestamp().format("%Y-%m-%d %H:%M:%S"),
                alert.source().display().to_string().cyan(),
                alert.matched_rules().join(", "),
                truncate(alert.line(), MAX_LINE_DISPLAY)
            )?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *w, alert)?;
            writeln!(w)?;
        }
    }
    w.flush()?;
    Ok(())
}

/// Totals printed when tailing stops.
#[derive(Debug, Clone, Serialize)]
pub struct TailSummary {
    /// Files that were watched.
    pub files: usize,
    /// Alerts printed.
    pub alerts: u64,
    /// Alerts lost because the queue was full.
    pub dropped: u64,
}

impl Render for TailSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        write!(
            w,
            "Stopped after {} alert(s) from {} file(s)",
            self.alerts.to_string().bold(),
            self.files
        )?;
        if self.dropped > 0 {
            write!(w, ", {} dropped", self.dropped.to_string().yellow())?;
        }
        writeln!(w)
    }
}
