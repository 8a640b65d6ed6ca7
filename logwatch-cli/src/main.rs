use clap::Parser;
use tracing_subscriber::EnvFilter;

use logwatch_cli::cli::{Cli, Commands};
use logwatch_cli::commands::{self, CommandContext};
use logwatch_cli::error::CliError;
use logwatch_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for command output
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log_level.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let ctx = CommandContext::load(cli.config.as_deref(), cli.rules.as_deref()).await;

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, ctx, &writer).await,
        Commands::Analyze(args) => commands::analyze::execute(args, &ctx?, &writer).await,
        Commands::Tail(args) => commands::tail::execute(args, &ctx?, &writer).await,
        Commands::Rules(args) => commands::rules::execute(args, &ctx?, &writer).await,
        Commands::Files(args) => commands::files::execute(args, &ctx?, &writer).await,
    }
}
