//! DeviceInfo HTTP service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{error, info};

use deviceinfo_common::init_tracing;
use deviceinfo_service::host::Shell;
use deviceinfo_service::platform::host_facilities;
use deviceinfo_service::{DeviceInfo, HttpServer, LocalShell, ServiceConfig};

/// Serve device telemetry as JSON over HTTP.
#[derive(Parser, Debug)]
#[command(name = "deviceinfo")]
#[command(about = "Serve device telemetry as JSON over HTTP")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long, default_value = "deviceinfo.json5")]
    config: PathBuf,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration, falling back to defaults when no file exists
    let config_found = args.config.exists();
    let mut config = if config_found {
        ServiceConfig::load_from_file(&args.config)?
    } else {
        ServiceConfig::default()
    };

    if let Some(listen) = args.listen {
        config.http.listen = listen;
        config.validate()?;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting DeviceInfo");
    if !config_found {
        info!(path = %args.config.display(), "No configuration file, using defaults");
    }

    let listen_addr = config.listen_addr()?;

    // Bind the plugin to the standalone host
    let shell: Arc<dyn Shell> = Arc::new(LocalShell::new(config.shell_config()));
    let plugin = Arc::new(RwLock::new(DeviceInfo::new(host_facilities())));

    let failure = plugin.write().initialize(shell.clone());
    if !failure.is_empty() {
        error!(reason = %failure, "DeviceInfo failed to initialize");
        plugin.write().deinitialize(&shell);
        anyhow::bail!("DeviceInfo failed to initialize: {}", failure);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(plugin.clone(), listen_addr, config.http.web_prefix.clone());
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    let server_exited = tokio::select! {
        _ = &mut http_task => {
            error!("HTTP server exited unexpectedly");
            true
        }
        _ = shutdown_signal() => false,
    };

    if !server_exited {
        let _ = shutdown_tx.send(true);
        let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;
    }

    plugin.write().deinitialize(&shell);

    info!("DeviceInfo stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
