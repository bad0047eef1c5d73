mod app;
mod catalog;
mod chart;
mod config;
mod data;
mod error;
mod gui;
mod metrics;
mod pipeline;
mod range;
mod tui;
mod ui;

use anyhow::Context;
use app::App;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use config::{DataProvider, Settings};
use data::DataSource;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, ValueEnum)]
enum GuiRendererChoice {
    Auto,
    Wgpu,
    Glow,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "coinchart: crypto price dashboard with candlestick, line and volume charts",
    after_help = "EXAMPLES:
    # Terminal dashboard
    cargo run --release

    # Desktop dashboard
    cargo run --release -- --gui

    # Offline, synthetic data
    cargo run --release -- --provider mock"
)]
struct Args {
    /// Launch the desktop dashboard instead of the terminal one
    #[arg(long)]
    gui: bool,

    /// GUI renderer backend (auto|wgpu|glow). Useful for RDP compatibility.
    #[arg(long, value_enum, default_value_t = GuiRendererChoice::Auto)]
    gui_renderer: GuiRendererChoice,

    /// Enable GUI safe mode for remote desktop (disables vsync/MSAA and hardware acceleration).
    #[arg(long)]
    gui_safe_mode: bool,

    /// Market data provider; overrides COINCHART_DATA_PROVIDER
    #[arg(long, value_enum)]
    provider: Option<DataProvider>,

    /// Where terminal-mode logs are written (the terminal itself is taken by the dashboard)
    #[arg(long, default_value = config::DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));

    if args.gui {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    } else {
        let file = std::fs::File::create(&args.log_file)
            .with_context(|| format!("failed to create log file {}", args.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_logging(&args)?;

    catalog::validate().context("startup check failed")?;
    let settings = Settings::from_env()?.with_provider_override(args.provider);
    let source = DataSource::from_settings(&settings)?;
    let today = Utc::now().date_naive();

    if args.gui {
        let mut options = eframe::NativeOptions::default();
        options.renderer = match args.gui_renderer {
            GuiRendererChoice::Auto => eframe::Renderer::Wgpu,
            GuiRendererChoice::Wgpu => eframe::Renderer::Wgpu,
            GuiRendererChoice::Glow => eframe::Renderer::Glow,
        };

        if args.gui_safe_mode {
            options.vsync = false;
            options.multisampling = 0;
            options.depth_buffer = 0;
            options.stencil_buffer = 0;
            options.hardware_acceleration = eframe::HardwareAcceleration::Off;
        }

        info!(
            "Launching GUI with renderer: {:?}, safe_mode={}",
            args.gui_renderer,
            args.gui_safe_mode
        );
        eframe::run_native(
            config::APP_TITLE,
            options,
            Box::new(move |_cc| Ok(Box::new(gui::GuiApp::new(App::new(source, today))))),
        )
        .map_err(|e| anyhow::anyhow!("GUI failed: {}", e))?;
        return Ok(());
    }

    let mut terminal = tui::init()?;
    let mut app = App::new(source, today);
    let res = app.run(&mut terminal).await;

    tui::restore()?;

    if let Err(e) = res {
        error!("Error: {:?}", e);
        return Err(e.into());
    }

    info!("Terminal dashboard exited");
    Ok(())
}
