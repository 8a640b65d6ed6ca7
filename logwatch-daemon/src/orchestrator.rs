//! Daemon orchestration -- assembly, task wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `logwatch-daemon`.
//! It loads the rule set, builds the watch set and alert distributor,
//! starts tailing, and tears everything down in order on shutdown.
//!
//! # Startup Order (consumers before producers)
//!
//! 1. Alert distributor task (drains the alert queue)
//! 2. Alert logger task (subscribes to the distributor)
//! 3. File watchers for every enabled log file (produce alerts)
//!
//! # Shutdown Order (producers first)
//!
//! 1. Watch set stop: every watcher task exits, then the alert queue closes
//! 2. Distributor observes end-of-stream and closes all subscriptions
//! 3. Alert logger drains its subscription and exits

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use logwatch_core::config::LogwatchConfig;
use logwatch_tailer::{
    AlertBus, AlertDistributor, AlertStream, DistributorConfig, RuleEngine, RuleLoader,
    Subscription, TailerConfig, WatchSet, WatchSetStats,
};

use crate::metrics_server;

/// Why the main loop woke up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// SIGTERM or SIGINT: shut down.
    Terminate(&'static str),
    /// SIGHUP: reload the rule file.
    Reload,
}

/// The main daemon orchestrator.
///
/// Owns the rule engine, the watch set and the alert distributor, plus
/// the background tasks that connect them.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: LogwatchConfig,
    /// Shared rule engine (also used by every watcher).
    engine: Arc<RuleEngine>,
    /// Set of tailed files; owns the producer side of the alert queue.
    watch_set: WatchSet,
    /// Fan-out and history of alerts.
    distributor: Arc<AlertDistributor>,
    /// Consumer side of the alert queue, handed to the distributor on start.
    stream: Option<AlertStream>,
    /// Shutdown broadcast sender (signals auxiliary tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
    distributor_task: Option<JoinHandle<()>>,
    alert_logger_task: Option<JoinHandle<()>>,
    uptime_task: Option<JoinHandle<()>>,
    pid_written: bool,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read, parsed or validated
    /// - The rule file cannot be loaded or any enabled rule fails to compile
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogwatchConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: LogwatchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Install metrics recorder before anything records
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let tailer_config = TailerConfig::from_core(&config.tailer);
        tailer_config
            .validate()
            .map_err(|e| anyhow::anyhow!("tailer config validation failed: {}", e))?;
        let distributor_config = DistributorConfig::from_core(&config.distributor);
        distributor_config
            .validate()
            .map_err(|e| anyhow::anyhow!("distributor config validation failed: {}", e))?;

        let engine = Arc::new(RuleEngine::new());
        let rule_set = RuleLoader::load_file(&tailer_config.rules_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load rules: {}", e))?;
        let compiled = engine
            .load_config(rule_set)
            .map_err(|e| anyhow::anyhow!("failed to compile rules: {}", e))?;

        let (bus, stream) = AlertBus::new(tailer_config.alert_queue_capacity);
        let watch_set = WatchSet::new(tailer_config, Arc::clone(&engine), bus);
        let distributor = Arc::new(AlertDistributor::new(distributor_config));
        let (shutdown_tx, _) = broadcast::channel(4);

        tracing::info!(
            compiled_rules = compiled,
            log_files = engine.get_log_files().len(),
            "orchestrator initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics();
        }

        Ok(Self {
            config,
            engine,
            watch_set,
            distributor,
            stream: Some(stream),
            shutdown_tx,
            start_time: Instant::now(),
            distributor_task: None,
            alert_logger_task: None,
            uptime_task: None,
            pid_written: false,
        })
    }

    /// Start all tasks and enter the main event loop.
    ///
    /// Blocks until SIGTERM or SIGINT, reloading rules on SIGHUP.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        // Listeners live for the whole loop so signals arriving during a
        // reload are queued instead of lost
        let mut signals = match SignalListener::install() {
            Ok(signals) => signals,
            Err(e) => {
                self.shutdown().await;
                return Err(e);
            }
        };

        tracing::info!("entering main event loop");
        loop {
            match signals.recv().await {
                DaemonSignal::Reload => {
                    if let Err(e) = self.reload_rules().await {
                        tracing::error!(error = %e, "rule reload failed, keeping previous rules");
                    }
                }
                DaemonSignal::Terminate(signal) => {
                    tracing::info!(signal = signal, "shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Write the PID file, spawn the consumer tasks and start tailing.
    ///
    /// Individual files that fail to open are logged and skipped.
    pub async fn start(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Err(anyhow::anyhow!("orchestrator already started"));
        }

        if !self.config.general.pid_file.is_empty() {
            write_pid_file(Path::new(&self.config.general.pid_file))?;
            self.pid_written = true;
        }

        let Some(stream) = self.stream.take() else {
            return Err(anyhow::anyhow!("orchestrator already started"));
        };
        self.distributor_task = Some(tokio::spawn(Arc::clone(&self.distributor).run(stream)));
        self.alert_logger_task = Some(spawn_alert_logger(self.distributor.subscribe()));

        if self.config.metrics.enabled {
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.uptime_task = Some(spawn_uptime_updater(self.start_time, shutdown_rx));
        }

        if self.config.tailer.auto_start {
            let started = self.watch_enabled_files().await;
            tracing::info!(watched_files = started, "auto-start complete");
        } else {
            tracing::info!("auto-start disabled, no files watched");
        }

        Ok(())
    }

    /// Start watching every enabled log file from the rule set.
    ///
    /// Returns how many files are now being watched by this call.
    pub async fn watch_enabled_files(&self) -> usize {
        let mut started = 0;
        for file in self.engine.get_enabled_log_files() {
            match self.watch_set.start_watching(&file.path).await {
                Ok(()) => started += 1,
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "failed to start watching log file");
                }
            }
        }
        started
    }

    /// Re-read the rule file and swap the rule set.
    ///
    /// Newly enabled log files start being watched when auto-start is on.
    /// Files already watched keep running with the new rules.
    pub async fn reload_rules(&self) -> Result<usize> {
        let rules_path = Path::new(&self.config.tailer.rules_path);
        let compiled = self
            .engine
            .reload_from_file(rules_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to reload rules: {}", e))?;
        tracing::info!(compiled_rules = compiled, "rules reloaded");

        if self.config.tailer.auto_start {
            for file in self.engine.get_enabled_log_files() {
                if self.watch_set.is_watching(&file.path).await {
                    continue;
                }
                if let Err(e) = self.watch_set.start_watching(&file.path).await {
                    tracing::warn!(path = %file.path, error = %e, "failed to start watching log file");
                }
            }
        }
        Ok(compiled)
    }

    /// Graceful shutdown in producer-first order.
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&mut self) {
        tracing::info!("stopping watch set");
        if !self.watch_set.is_stopped() {
            self.watch_set.stop().await;
        }
        // Never started: nobody owns the stream, drop it so the queue is gone too.
        self.stream = None;

        if let Some(task) = self.distributor_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "alert distributor task failed");
            }
        }
        if let Some(task) = self.alert_logger_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "alert logger task failed");
            }
        }

        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.uptime_task.take() {
            let _ = task.await;
        }

        if self.pid_written {
            remove_pid_file(Path::new(&self.config.general.pid_file));
            self.pid_written = false;
        }

        tracing::info!(
            total_alerts = self.distributor.received(),
            "logwatch-daemon shut down"
        );
    }

    /// Aggregated tailing statistics.
    pub async fn stats(&self) -> WatchSetStats {
        self.watch_set.stats().await
    }

    /// The watch set (for inspection).
    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// The alert distributor (for subscriptions and history).
    pub fn distributor(&self) -> &Arc<AlertDistributor> {
        &self.distributor
    }

    /// The shared rule engine.
    pub fn engine(&self) -> &Arc<RuleEngine> {
        &self.engine
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &LogwatchConfig {
        &self.config
    }

    /// Seconds since the orchestrator was built.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Wait for SIGTERM, SIGINT or SIGHUP.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
struct SignalListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

impl SignalListener {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())
                .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?,
            sigint: signal(SignalKind::interrupt())
                .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?,
            sighup: signal(SignalKind::hangup())
                .map_err(|e| anyhow::anyhow!("failed to install SIGHUP handler: {}", e))?,
        })
    }

    /// Wait for the next signal of interest.
    ///
    /// A closed signal stream is treated as termination.
    async fn recv(&mut self) -> DaemonSignal {
        tokio::select! {
            _ = self.sigterm.recv() => DaemonSignal::Terminate("SIGTERM"),
            _ = self.sigint.recv() => DaemonSignal::Terminate("SIGINT"),
            _ = self.sighup.recv() => DaemonSignal::Reload,
        }
    }
}

/// Write the current process PID to a file.
///
/// Used to prevent duplicate daemon instances.
///
/// # Security
///
/// - Uses `create_new(true)` to atomically create file (prevents TOCTOU races)
/// - Verifies the created file is a regular file
/// - Creates parent directory with restrictive permissions (0o700)
///
/// # Errors
///
/// Returns an error if the PID file exists or cannot be written.
pub fn write_pid_file(path: &Path) -> Result<()> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            let mut builder = fs::DirBuilder::new();
            builder.mode(0o700).recursive(true);
            builder.create(parent)?;
        }
        #[cfg(not(unix))]
        {
            fs::create_dir_all(parent)?;
        }
    }

    let pid = std::process::id();

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing_pid = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(anyhow::anyhow!(
                "PID file {} already exists with PID: {}. Is another instance running?",
                path.display(),
                existing_pid.trim()
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let metadata = file.metadata()?;
    if !metadata.is_file() {
        let _ = fs::remove_file(path);
        return Err(anyhow::anyhow!(
            "PID file {} is not a regular file",
            path.display()
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    writeln!(file, "{}", pid)?;

    tracing::info!(pid = pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
pub fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove PID file"
        );
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}

/// Spawn a task that logs every distributed alert.
///
/// Exits when the distributor closes the subscription at end-of-stream.
fn spawn_alert_logger(mut subscription: Subscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = subscription.receiver.recv().await {
            tracing::info!(
                source = %record.alert.source().display(),
                severity = %record.alert.severity(),
                rules = %record.alert.matched_rules().join(","),
                summary = %record.summary,
                "alert"
            );
        }
        tracing::debug!(subscriber = %subscription.id, "alert subscription closed, exiting logger");
    })
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use logwatch_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    use logwatch_core::metrics as m;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let uptime_secs = start_time.elapsed().as_secs();
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(uptime_secs as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
