//! Navigator daemon
//!
//! Composition root for the monitoring engine: loads configuration, sets up
//! tracing, assembles the production collaborators, starts the session, and
//! tears everything down on ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use navigator_core::config::default_data_dir;
use navigator_core::{Navigator, NavigatorConfig, NavigatorContext};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "navigatord", about = "Background file-monitoring service")]
struct Args {
	/// Data directory for configuration, logs, and session state
	#[arg(long, env = "NAVIGATOR_DATA_DIR")]
	data_dir: Option<PathBuf>,

	/// Override the configured watch root
	#[arg(long)]
	watch_root: Option<PathBuf>,

	/// Override the configured destination root
	#[arg(long)]
	destination: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let data_dir = match args.data_dir {
		Some(dir) => dir,
		None => default_data_dir()?,
	};
	let mut config = NavigatorConfig::load_from(&data_dir).context("failed to load config")?;
	if let Some(watch_root) = args.watch_root {
		config.watch_root = watch_root;
	}
	if let Some(destination) = args.destination {
		config.destination_root = destination;
	}

	let _log_guard = init_tracing(&config)?;
	config.ensure_directories()?;

	info!("Starting Navigator daemon");
	info!("Data directory: {:?}", config.data_dir);
	info!("Watch root: {:?}", config.watch_root);
	info!("Destination root: {:?}", config.destination_root);

	let context = NavigatorContext::production(&config)?;
	let navigator = Navigator::new(Arc::new(config), context);

	// Mirror every running-state transition into the log, starting with the
	// replayed current value.
	let mut running = navigator.running().subscribe();
	tokio::spawn(async move {
		loop {
			let active = *running.borrow_and_update();
			info!(active, "Monitoring state");
			if running.changed().await.is_err() {
				break;
			}
		}
	});

	if let Err(e) = navigator.start().await {
		error!(error = %e, "Failed to start monitoring");
		navigator.shutdown().await;
		return Err(e.into());
	}

	tokio::signal::ctrl_c()
		.await
		.context("failed to listen for shutdown signal")?;
	info!("Shutdown signal received");

	if let Err(e) = navigator.stop().await {
		error!(error = %e, "Failed to stop monitoring cleanly");
	}
	navigator.shutdown().await;

	Ok(())
}

/// Layered tracing: env-filtered stdout plus a daily-rolling file under
/// `<data_dir>/logs`. The returned guard must live for the process.
fn init_tracing(
	config: &NavigatorConfig,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
	use tracing_appender::rolling::{RollingFileAppender, Rotation};
	use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

	let logs_dir = config.logs_dir();
	std::fs::create_dir_all(&logs_dir).context("failed to create logs directory")?;

	let default_filter = format!(
		"warn,navigator_core={level},navigatord={level}",
		level = config.log_level
	);
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "daemon.log");
	let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_target(true).with_writer(std::io::stdout))
		.with(fmt::layer().with_ansi(false).with_writer(non_blocking))
		.try_init()
		.context("failed to initialize tracing")?;

	Ok(guard)
}
