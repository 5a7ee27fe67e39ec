mod app;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use callmap::config::Config;
use callmap::source::HttpServer;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON call dataset to open instead of the built-in sample.
    dataset: Option<PathBuf>,

    /// TOML file with layout, viewport and source settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of a call-graph server providing /api/relations and /api/search.
    #[arg(long)]
    server: Option<String>,

    #[arg(long)]
    page_size: Option<usize>,

    #[arg(long)]
    debounce_ms: Option<u64>,

    #[arg(long)]
    zoom_min: Option<f32>,

    #[arg(long)]
    zoom_max: Option<f32>,

    /// Log filter, e.g. `callmap=debug`. Defaults to RUST_LOG, then `callmap=info`.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.source.server_url = Some(server.clone());
        }
        if let Some(page_size) = self.page_size {
            config.source.page_size = page_size;
        }
        if let Some(debounce_ms) = self.debounce_ms {
            config.source.debounce_ms = debounce_ms;
        }
        if let Some(zoom_min) = self.zoom_min {
            config.viewport.zoom_min = zoom_min;
        }
        if let Some(zoom_max) = self.zoom_max {
            config.viewport.zoom_max = zoom_max;
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("callmap=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate().context("invalid settings")?;

    let server = config
        .source
        .server_url
        .as_deref()
        .map(HttpServer::new)
        .transpose()
        .context("failed to set up the server client")?;
    tracing::info!(
        server = config.source.server_url.as_deref().unwrap_or("none"),
        dataset = ?args.dataset,
        "starting callmap"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 920.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let dataset = args.dataset;
    eframe::run_native(
        "callmap",
        options,
        Box::new(move |cc| Ok(Box::new(app::CallMapApp::new(cc, config, server, dataset)))),
    )
    .map_err(|error| anyhow!("viewer failed: {error}"))
}
