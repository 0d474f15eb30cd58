//! sessiongate - a session-authenticated API gateway.
//!
//! Authenticates users against a chain of modules, keeps their sessions in a
//! cookie-keyed store and proxies API calls to the configured backends.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sessiongate_core::auth::hash_password;
use sessiongate_core::{Gateway, GatewayConfig};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the daily rolling log file
const LOG_FILE_PREFIX: &str = "sessiongate.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and also to a daily file under `log_dir` when set. The
/// returned guard must live as long as the process for file logs to flush.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--hash-password" {
        return print_password_hash();
    }

    let config_path = std::env::var_os("SESSIONGATE_CONFIG").map(PathBuf::from);
    let mut config = GatewayConfig::load(config_path.as_deref())?;
    if let Ok(listen) = std::env::var("SESSIONGATE_LISTEN") {
        config.listen_addr = listen;
    }
    if let Some(dir) = std::env::var_os("SESSIONGATE_LOG_DIR") {
        config.log_dir = Some(PathBuf::from(dir));
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!("sessiongate starting");

    let gateway = Arc::new(Gateway::from_config(&config)?);
    let app = sessiongate_server::app(gateway, &config.session.cookie_name);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("sessiongate shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Read a password from stdin and print its Argon2 hash for the local
/// credential file.
fn print_password_hash() -> Result<()> {
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    println!("{}", hash_password(password)?);
    Ok(())
}
