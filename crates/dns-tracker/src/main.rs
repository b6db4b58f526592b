// # dns_tracker - DNS Propagation Tracker
//
// Thin integration layer over dnstrack-core:
// 1. Parsing and validating the command line
// 2. Initializing logging and the runtime
// 3. Registering the resolver backend and opening the export file
// 4. Running the supervisor and redrawing the view on every event
//
// All tracking logic lives in dnstrack-core.
//
// ## Environment
//
// - `DNS_TRACKER_LOG_LEVEL`: trace, debug, info, warn or error (default warn).
//   Logs go to stderr so they never mix with the screen refresh.
// - `NO_COLOR`: disable colored output
//
// ## Example
//
// ```bash
// dns_tracker -t A -n example.com -s 192.0.2.53 198.51.100.53:5353 -c 30 --export
// ```

mod cli;
mod display;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dnstrack_core::aggregator::Aggregator;
use dnstrack_core::export::default_export_path;
use dnstrack_core::traits::{ExportSink, Resolver};
use dnstrack_core::{Completion, CsvExportSink, ResolverRegistry, Supervisor, TrackerConfig, TrackerOutcome};
use std::env;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::cli::Cli;
use crate::display::Display;

const LOG_LEVEL_ENV: &str = "DNS_TRACKER_LOG_LEVEL";

/// Exit codes for the different ways a measurement ends
#[derive(Debug, Clone, Copy)]
enum TrackerExitCode {
    /// Measurement completed, was interrupted, or help was shown
    Completed = 0,
    /// Invalid arguments, unsupported type, or export file not opened
    UsageError = 1,
    /// Runtime error (unexpected)
    RuntimeError = 2,
}

impl From<TrackerExitCode> for ExitCode {
    fn from(code: TrackerExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version print to stdout and are not failures
            let code = if e.use_stderr() {
                TrackerExitCode::UsageError
            } else {
                TrackerExitCode::Completed
            };
            let _ = e.print();
            return code.into();
        }
    };

    let log_level = match parse_log_level(env::var(LOG_LEVEL_ENV).ok().as_deref()) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            return TrackerExitCode::UsageError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return TrackerExitCode::RuntimeError.into();
    }

    let config = match cli.tracker_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return exit_code_for(&e).into();
        }
    };

    info!(
        "Tracking {} {} on {} server(s)",
        config.query.record_type,
        config.query.name,
        config.servers.len()
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TrackerExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let export = match open_export(&cli).await {
            Ok(export) => export,
            Err(e) => {
                eprintln!("{:#}", e);
                return TrackerExitCode::UsageError;
            }
        };

        match run_measurement(&cli, config, export).await {
            Ok(completion) => {
                for report in completion.failed() {
                    if let TrackerOutcome::Failed(message) = &report.outcome {
                        debug!("{} ended with failure: {}", report.server, message);
                    }
                }
                TrackerExitCode::Completed
            }
            Err(e) => {
                error!("Measurement error: {:#}", e);
                eprintln!("{:#}", e);
                TrackerExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Usage errors stop the process before tracking; anything else is a runtime failure
fn exit_code_for(err: &dnstrack_core::Error) -> TrackerExitCode {
    if err.is_fatal_at_startup() {
        TrackerExitCode::UsageError
    } else {
        TrackerExitCode::RuntimeError
    }
}

/// Map the log level variable to a tracing level; unset means warn
fn parse_log_level(value: Option<&str>) -> Result<Level> {
    let Some(value) = value else {
        return Ok(Level::WARN);
    };

    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            LOG_LEVEL_ENV,
            value
        ),
    }
}

/// Open the export file before any tracker starts
async fn open_export(cli: &Cli) -> Result<Option<Arc<dyn ExportSink>>> {
    let Some(requested) = &cli.export else {
        return Ok(None);
    };

    let path = match requested {
        Some(path) => path.clone(),
        None => default_export_path()?,
    };

    let sink = CsvExportSink::create(&path)
        .await
        .with_context(|| format!("Cannot export to {}", path.display()))?;
    info!("Exporting answers to {}", sink.path().display());

    Ok(Some(Arc::new(sink)))
}

/// Run the supervisor and redraw the view until every tracker is done
async fn run_measurement(
    cli: &Cli,
    config: TrackerConfig,
    export: Option<Arc<dyn ExportSink>>,
) -> Result<Completion> {
    let registry = ResolverRegistry::new();
    dnstrack_resolver_hickory::register(&registry);

    let resolver: Arc<dyn Resolver> = Arc::from(
        registry
            .create_resolver(&config.resolver)
            .context("Failed to create resolver")?,
    );

    let live = std::io::stdout().is_terminal();
    let display = Display::new(config.query.name.clone(), config.query.record_type, Utc::now())
        .with_interval(cli.interval())
        .with_verbose(config.verbose)
        .with_color(live && env::var_os("NO_COLOR").is_none());

    let (supervisor, mut events) = Supervisor::new(config, resolver)?;
    let supervisor = match export {
        Some(sink) => supervisor.with_export(sink),
        None => supervisor,
    };

    let aggregator = Aggregator::new(cli.view_mode());
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_signal(cancel.clone()));

    let run = supervisor.run(cancel.clone());
    tokio::pin!(run);

    let completion = loop {
        tokio::select! {
            completion = &mut run => break completion,
            Some(event) = events.recv() => {
                aggregator.apply(&event).await;
                if live {
                    display
                        .refresh(&aggregator.snapshot().await)
                        .context("Failed to refresh display")?;
                }
            }
        }
    };

    // Events sent just before the last tracker ended
    while let Some(event) = events.recv().await {
        aggregator.apply(&event).await;
    }

    cancel.cancel();
    let _ = interrupt.await;

    let snapshot = aggregator.snapshot().await;
    if live {
        display.refresh(&snapshot).context("Failed to refresh display")?;
    } else {
        print!("{}", display.render(&snapshot));
    }

    info!(
        "Measurement finished: {} changed, {} failed",
        completion.changed().count(),
        completion.failed().count()
    );

    Ok(completion)
}

/// Cancel the measurement on SIGINT or SIGTERM
///
/// Returns once `cancel` fires for any reason.
#[cfg(unix)]
async fn cancel_on_signal(cancel: CancellationToken) {
    let (mut sigterm, mut sigint) = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to set up signal handlers: {}", e);
            cancel.cancelled().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, stopping trackers");
            cancel.cancel();
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, stopping trackers");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}

/// Cancel the measurement on Ctrl-C
#[cfg(not(unix))]
async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                info!("Received Ctrl-C, stopping trackers");
                cancel.cancel();
            }
            Err(e) => {
                warn!("Failed to listen for Ctrl-C: {}", e);
                cancel.cancelled().await;
            }
        },
        _ = cancel.cancelled() => {}
    }
}
