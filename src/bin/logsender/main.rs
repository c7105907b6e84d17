// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use logsender::init::args::TailArgs;
use logsender::init::config::load_config;
use logsender::tail::{DefaultHandlers, EventLoop, FileWatcher, WatchRegistry, create_watcher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing::{error, info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

type DaemonLoop = EventLoop<Box<dyn FileWatcher + Send>, DefaultHandlers>;

const EXIT_USAGE: u8 = 1;
const EXIT_RUNTIME: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_WATCHER_INIT: u8 = 3;
const EXIT_UNKNOWN_HANDLER: u8 = 4;

// The event loop notices cancellation within one poll interval
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "logsender")]
#[command(bin_name = "logsender")]
#[command(version, about, long_about = None)]
struct Arguments {
    /// Path to the JSON configuration document
    #[arg(default_value = "config.json")]
    config: PathBuf,

    #[arg(value_enum, long, env = "LOGSENDER_LOG_FORMAT", default_value = "text")]
    /// Log format
    log_format: LogFormatArg,

    #[command(flatten)]
    tail: TailArgs,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = match Arguments::try_parse() {
        Ok(opt) => opt,
        Err(e) => {
            // Help and version requests also land here
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let _guard = match setup_logging(&opt.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let (tail_config, watcher_config) =
        match (opt.tail.tail_config(), opt.tail.watcher_config()) {
            (Ok(t), Ok(w)) => (t, w),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Invalid arguments.");
                return ExitCode::from(EXIT_USAGE);
            }
        };

    let config = match load_config(&opt.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %opt.config.display(), error = %e, "Failed to load configuration.");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    config.log_run_config();

    // Every identifier is resolved before any file is opened
    let specs = match config.monitor_specs() {
        Ok(specs) => specs,
        Err(e) if e.is_unknown_handler() => {
            error!(error = %e, "Unknown handler configured.");
            return ExitCode::from(EXIT_UNKNOWN_HANDLER);
        }
        Err(e) => {
            error!(error = %e, "Invalid monitor configuration.");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let watcher = match create_watcher(&watcher_config) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!(error = %e, "Failed to initialize file watcher.");
            return ExitCode::from(EXIT_WATCHER_INIT);
        }
    };
    info!(backend = watcher.backend_name(), "File watcher initialized");

    let mut registry = WatchRegistry::new(watcher, tail_config);
    let opened = registry.register_all(&specs);
    info!(
        monitors = specs.len(),
        opened = opened,
        "Registered monitored files"
    );

    let event_loop = EventLoop::new(registry, watcher_config.poll_interval);
    match run(event_loop) {
        Ok(_) => {}
        Err(e) => {
            error!(error = %e, "Event loop failed.");
            return ExitCode::from(EXIT_RUNTIME);
        }
    }

    ExitCode::SUCCESS
}

#[tokio::main]
async fn run(mut event_loop: DaemonLoop) -> Result<(), BoxError> {
    let cancel_token = CancellationToken::new();

    // Reads and publishes are blocking, keep them off the runtime workers
    let mut handle = {
        let token = cancel_token.clone();
        tokio::task::spawn_blocking(move || event_loop.run(token))
    };

    select! {
        _ = signal_wait() => {
            info!("Shutdown signal received.");
            cancel_token.cancel();
        },
        res = &mut handle => {
            return match res {
                Ok(Ok(())) => {
                    warn!("Unexpected early exit of event loop.");
                    Ok(())
                }
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            };
        },
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Err(_) => Err("timed out waiting for event loop to stop".into()),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(res)) => res.map_err(|e| e.into()),
    }
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

fn setup_logging(log_format: &LogFormatArg) -> Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?
        .add_directive("notify=warn".parse()?);

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), get_version());
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        use std::io;
        use std::io::IsTerminal;

        // Skip color codes when not in a terminal
        let use_ansi = io::stdout().is_terminal();

        let stdout_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(stdout_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}

fn get_version() -> String {
    // Set during CI
    let version_build = option_env!("BUILD_SHORT_SHA").unwrap_or("dev");

    format!("{}-{}", env!("CARGO_PKG_VERSION"), version_build)
}

async fn signal_wait() {
    let (mut sig_term, mut sig_int) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Unable to install signal handlers.");
                return std::future::pending().await;
            }
        };

    select! {
        _ = sig_term.recv() => {},
        _ = sig_int.recv() => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(EXIT_RUNTIME, 1);
        assert_eq!(EXIT_CONFIG, 2);
        assert_eq!(EXIT_WATCHER_INIT, 3);
        assert_eq!(EXIT_UNKNOWN_HANDLER, 4);
    }

    #[test]
    fn test_extra_positional_is_a_usage_error() {
        let err = Arguments::try_parse_from(["logsender", "a.json", "b.json"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
