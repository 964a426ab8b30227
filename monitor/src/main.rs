//! tailhook - forward lines appended to a file to a webhook.
//!
//! Watches one file and POSTs every newly appended line to a webhook as a
//! JSON notification.
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Url;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tailhook_monitor::config::{Config, ConfigOverrides, LogFormat};
use tailhook_monitor::forwarder::Forwarder;
use tailhook_monitor::watcher::{FileWatcher, WatchSignal};

/// Capacity of the channel between the notify callback and the event loop.
const SIGNAL_BUFFER_SIZE: usize = 1000;

/// tailhook - forward lines appended to a file to a webhook.
///
/// Watches a file and POSTs each newly appended line to a webhook as
/// `{"text": <file>, "attachments": [{"title": <line>, "color": <color>}]}`.
#[derive(Parser, Debug)]
#[command(name = "tailhook")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TAILHOOK_FILE                  File to monitor
    TAILHOOK_WEBHOOK_URL           Webhook URL
    TAILHOOK_COLOR                 Attachment color (default: info)
    TAILHOOK_NOTIFY_EXISTING_TAIL  Notify for the existing last line on startup
    TAILHOOK_WORKERS               Concurrent deliveries (default: 4)
    TAILHOOK_QUEUE_SIZE            Pending notification capacity (default: 100)
    TAILHOOK_REQUEST_TIMEOUT_SECS  HTTP timeout in seconds (default: 30)
    TAILHOOK_LOG_FORMAT            text or json (default: text)
    RUST_LOG                       Log filter (default: info)

EXAMPLES:
    # Forward new lines of an application log
    tailhook -f /var/log/app.log -w https://hooks.example.com/in/abc

    # Flag errors in red and send the current last line right away
    tailhook -f /var/log/app-error.log -w https://hooks.example.com/in/abc \\
        -c error --notify-existing-tail
")]
struct Cli {
    /// File to monitor.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Webhook URL to POST notifications to.
    #[arg(short, long)]
    webhook: Option<String>,

    /// Attachment color [info|error|...].
    #[arg(short, long)]
    color: Option<String>,

    /// Send the line already at the end of the file when starting.
    #[arg(long)]
    notify_existing_tail: bool,

    /// Number of concurrent webhook deliveries.
    #[arg(long)]
    workers: Option<usize>,

    /// Notifications that may wait for a free worker before new ones are dropped.
    #[arg(long)]
    queue_size: Option<usize>,

    /// HTTP request timeout in seconds.
    #[arg(long = "request-timeout")]
    request_timeout_secs: Option<u64>,

    /// Log format: text or json.
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            file: self.file,
            webhook_url: self.webhook,
            color: self.color,
            notify_existing_tail: self.notify_existing_tail,
            workers: self.workers,
            queue_size: self.queue_size,
            request_timeout_secs: self.request_timeout_secs,
            log_format: self.log_format,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::resolve(cli.into_overrides()).context("Failed to load configuration")?;

    init_logging(config.log_format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run_monitor(config))
}

/// Runs the monitor until a shutdown signal arrives.
async fn run_monitor(config: Config) -> Result<()> {
    info!("Starting tailhook");

    info!(
        file = %config.file.display(),
        webhook_host = %webhook_host(&config.webhook_url),
        color = %config.color,
        workers = config.dispatcher.workers,
        queue_size = config.dispatcher.queue_size,
        "Configuration loaded"
    );

    let (signal_tx, mut signal_rx) = mpsc::channel::<WatchSignal>(SIGNAL_BUFFER_SIZE);

    // Attached before the baseline: a line appended in between is absorbed
    // into it instead of waiting for the next append.
    let _watcher = FileWatcher::new(config.file.clone(), signal_tx).context(format!(
        "Failed to watch {}",
        config.file.display()
    ))?;

    let mut forwarder =
        Forwarder::from_config(&config).context("Failed to create webhook client")?;

    forwarder
        .start(config.startup_policy)
        .context(format!("Failed to read {}", config.file.display()))?;

    info!("Monitor running. Press Ctrl+C to stop.");

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }

            received = signal_rx.recv() => {
                match received {
                    Some(watch_signal) => {
                        forwarder.handle_signal(watch_signal);
                    }
                    None => {
                        warn!("Watch channel closed");
                        break;
                    }
                }
            }
        }
    }

    let stats = forwarder.dispatcher().stats();
    let pending = forwarder.dispatcher().pending();
    info!(
        delivered = stats.delivered(),
        failed = stats.failed(),
        dropped = stats.dropped(),
        "Monitor stopped"
    );
    if pending > 0 {
        warn!(pending, "Exiting with undelivered notifications");
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Host part of the webhook URL, keeping path tokens out of the logs.
fn webhook_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
