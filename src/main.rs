//! Portaria Obras - construction-site gatehouse log for visitors and deliveries.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use portaria_obras as app;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use app::client::BackendClient;
use app::config::{self, AppConfig, ConfigLoadResult};
use app::ui::{App, RecoveryApp, SetupApp, SetupWizard};

/// Construction-site gatehouse log for visitors and deliveries.
#[derive(Parser)]
#[command(name = "portaria-obras")]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,
}

/// Application launch mode.
enum LaunchMode {
    /// Normal operation with valid config.
    Normal(AppConfig),
    /// Setup wizard for first run or invalid config.
    Setup(SetupWizard, Option<String>),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging();

    tracing::info!("Portaria Obras starting...");

    // Determine config path based on mode
    let config_path = if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };
    tracing::info!("Config path: {:?}", config_path);

    let launch_mode = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => {
            tracing::info!("Config loaded successfully");
            LaunchMode::Normal(config)
        }
        ConfigLoadResult::Missing => {
            tracing::info!("Config missing, starting setup wizard");
            LaunchMode::Setup(SetupWizard::new(), None)
        }
        ConfigLoadResult::Invalid(e) => {
            tracing::warn!("Config invalid: {}", e);
            LaunchMode::Setup(SetupWizard::new(), Some(e.to_string()))
        }
    };

    let config = match launch_mode {
        LaunchMode::Normal(config) => config,
        LaunchMode::Setup(wizard, error) => {
            run_setup_wizard(wizard, error, config_path.clone())?;
            match AppConfig::try_load(&config_path) {
                ConfigLoadResult::Loaded(config) => config,
                _ => {
                    tracing::info!("Setup closed without a valid config");
                    return Ok(());
                }
            }
        }
    };

    run_main_app(config)
}

/// Stderr output plus a daily log file under the data directory.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let appender = config::data_dir().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("portaria-obras")
            .filename_suffix("log")
            .build(dir.join("logs"))
            .inspect_err(|e| eprintln!("File logging disabled: {e}"))
            .ok()
    });
    let (file_writer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_writer.map(|writer| fmt::layer().with_writer(writer).with_ansi(false)))
        .init();

    guard
}

fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
    ctx.set_fonts(fonts);
}

/// Run the setup wizard.
fn run_setup_wizard(wizard: SetupWizard, initial_error: Option<String>, config_path: PathBuf) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Portaria Obras - Configuração")
            .with_inner_size([640.0, 620.0])
            .with_min_inner_size([520.0, 480.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "Portaria Obras - Setup",
        options,
        Box::new(|cc| {
            install_fonts(&cc.egui_ctx);
            Ok(Box::new(SetupApp::new(wizard, initial_error, config_path, rt)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Setup window failed: {e}"))
}

/// Runtime and backend client for the main window.
fn start_backend(config: &AppConfig) -> anyhow::Result<(tokio::runtime::Runtime, BackendClient)> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("portaria-worker")
        .build()
        .context("Failed to create tokio runtime")?;
    let client = BackendClient::new(&config.backend).context("Failed to create backend client")?;

    // Log reachability only; the app works with an unreachable backend and reports per request
    match rt.block_on(client.health()) {
        Ok(()) => tracing::info!("Backend reachable: {}", client.base_url()),
        Err(e) => tracing::warn!("Backend not reachable at start-up: {e}"),
    }

    Ok((rt, client))
}

/// Run the main application, offering a retry when start-up fails.
fn run_main_app(config: AppConfig) -> anyhow::Result<()> {
    loop {
        match start_backend(&config) {
            Ok((rt, client)) => {
                let options = eframe::NativeOptions {
                    viewport: egui::ViewportBuilder::default()
                        .with_title("Portaria Obras")
                        .with_inner_size([1280.0, 820.0])
                        .with_min_inner_size([960.0, 640.0]),
                    ..Default::default()
                };

                return eframe::run_native(
                    "Portaria Obras",
                    options,
                    Box::new(|cc| {
                        install_fonts(&cc.egui_ctx);
                        Ok(Box::new(App::new(config, rt, client)))
                    }),
                )
                .map_err(|e| anyhow::anyhow!("Main window failed: {e}"));
            }
            Err(e) => {
                tracing::error!("Start-up failed: {e:#}");
                if !run_recovery(format!("{e:#}"))? {
                    return Ok(());
                }
                tracing::info!("Retrying start-up");
            }
        }
    }
}

/// Show the recovery window. Returns whether the user asked to retry.
fn run_recovery(error: String) -> anyhow::Result<bool> {
    let retry = Arc::new(AtomicBool::new(false));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Portaria Obras")
            .with_inner_size([520.0, 320.0])
            .with_resizable(false),
        ..Default::default()
    };

    let flag = retry.clone();
    eframe::run_native(
        "Portaria Obras - Recovery",
        options,
        Box::new(|cc| {
            install_fonts(&cc.egui_ctx);
            Ok(Box::new(RecoveryApp::new(error, flag)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Recovery window failed: {e}"))?;

    Ok(retry.load(Ordering::SeqCst))
}
