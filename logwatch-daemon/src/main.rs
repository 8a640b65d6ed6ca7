use anyhow::Result;
use clap::Parser;

use logwatch_core::LogwatchConfig;
use logwatch_daemon::cli::DaemonCli;
use logwatch_daemon::logging;
use logwatch_daemon::orchestrator::Orchestrator;
use logwatch_tailer::{RuleEngine, RuleLoader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = LogwatchConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    logging::init_tracing(&config.general)?;

    if cli.validate {
        return validate_only(&config).await;
    }

    tracing::info!(
        config = %cli.config.display(),
        version = env!("CARGO_PKG_VERSION"),
        "logwatch-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    orchestrator.run().await?;

    Ok(())
}

/// Check config and rule file, then exit without starting any task.
async fn validate_only(config: &LogwatchConfig) -> Result<()> {
    let rule_set = RuleLoader::load_file(&config.tailer.rules_path)
        .await
        .map_err(|e| anyhow::anyhow!("rule file invalid: {}", e))?;
    let compiled = RuleEngine::new()
        .load_config(rule_set)
        .map_err(|e| anyhow::anyhow!("rule file invalid: {}", e))?;

    tracing::info!(
        compiled_rules = compiled,
        rules_path = %config.tailer.rules_path,
        "configuration is valid"
    );
    Ok(())
}
