mod backend_bridge;
mod config;
mod controller;
mod ui;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use crossbeam_channel::{bounded, unbounded};
use tracing_subscriber::EnvFilter;

use crate::{
    backend_bridge::{commands::BackendCommand, runtime},
    config::{load_settings, normalize_backend_url},
    controller::events::UiEvent,
    ui::LilaApp,
};

#[derive(Parser, Debug)]
#[command(about = "Lila log summary checker")]
struct Args {
    /// Websocket endpoint of the Lila backend.
    #[arg(long)]
    backend_url: Option<String>,
    /// Settings file; defaults to `lila.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(url) = args.backend_url {
        settings.backend_url = normalize_backend_url(&url)?;
    }

    let filter =
        EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(backend = %settings.backend_url, "starting lila desktop");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = unbounded::<UiEvent>();
    let title = settings.window_title.clone();
    runtime::launch(cmd_rx, ui_tx, settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title.clone())
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(LilaApp::bootstrap(cmd_tx, ui_rx)))),
    )
    .map_err(|err| anyhow!("failed to run desktop window: {err}"))
}
