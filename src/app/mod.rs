use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui::{Context, Vec2};

use callmap::command::{Command, Effect, ExplorerState, update};
use callmap::config::Config;
use callmap::source::{DataSourceCoordinator, FetchWorker, HttpServer};

mod graph;
mod render_utils;
mod ui;

/// A dataset file read off the UI thread: display label and raw JSON.
type LoadResult = Result<(String, String), String>;

pub struct CallMapApp {
    model: ViewModel,
    load_rx: Option<Receiver<LoadResult>>,
}

struct ViewModel {
    explorer: ExplorerState,
    worker: Option<FetchWorker>,
    download_url: Option<String>,
    server_url: Option<String>,
    search: String,
    open_path: String,
    notice: Option<String>,
    canvas_size: Vec2,
    show_details: bool,
}

impl CallMapApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: Config,
        server: Option<HttpServer>,
        dataset: Option<PathBuf>,
    ) -> Self {
        let coordinator = DataSourceCoordinator::with_sample(config.source.clone());
        let explorer = ExplorerState::new(config.layout, config.viewport, coordinator);

        let download_url = server
            .as_ref()
            .and_then(|server| server.download_url().ok())
            .map(|url| url.to_string());
        let server_url = server
            .as_ref()
            .map(|server| server.base_url().to_string());
        let worker = server.map(|server| FetchWorker::new(Arc::new(server)));

        let open_path = dataset
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let load_rx = dataset.map(Self::spawn_load);

        Self {
            model: ViewModel {
                explorer,
                worker,
                download_url,
                server_url,
                search: String::new(),
                open_path,
                notice: None,
                canvas_size: Vec2::ZERO,
                show_details: true,
            },
            load_rx,
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let label = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let result = fs::read_to_string(&path)
                .map(|raw| (label, raw))
                .map_err(|error| format!("Failed to read {}: {error}", path.display()));
            let _ = tx.send(result);
        });

        rx
    }
}

impl ViewModel {
    fn dispatch(&mut self, command: Command) {
        for effect in update(&mut self.explorer, command) {
            match effect {
                Effect::Fetch(request) => match &self.worker {
                    Some(worker) => worker.spawn(request),
                    None => tracing::warn!(seq = request.seq, "no server configured, fetch dropped"),
                },
            }
        }
    }

    fn poll_background(&mut self, ctx: &Context) {
        let outcomes = self
            .worker
            .as_ref()
            .map(FetchWorker::poll)
            .unwrap_or_default();
        for outcome in outcomes {
            self.dispatch(Command::FetchCompleted { outcome });
        }

        let now = Instant::now();
        self.dispatch(Command::Tick { now });

        let coordinator = self.explorer.coordinator();
        if coordinator.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
        if let Some(deadline) = coordinator.debounce_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn load_text(&mut self, label: String, raw: String) {
        self.notice = None;
        self.dispatch(Command::LoadUpload { label, raw });
        self.search = self.explorer.coordinator().query().to_string();
    }
}

impl eframe::App for CallMapApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(rx) = self.load_rx.take() {
            match rx.try_recv() {
                Ok(Ok((label, raw))) => self.model.load_text(label, raw),
                Ok(Err(error)) => {
                    tracing::warn!(%error, "dataset load failed");
                    self.model.notice = Some(error);
                }
                Err(TryRecvError::Empty) => {
                    self.load_rx = Some(rx);
                    ctx.request_repaint_after(Duration::from_millis(50));
                }
                Err(TryRecvError::Disconnected) => {
                    self.model.notice = Some("Background load worker disconnected".to_owned());
                }
            }
        }

        let mut open_requested = None;
        self.model.show(ctx, self.load_rx.is_some(), &mut open_requested);
        if let Some(path) = open_requested
            && self.load_rx.is_none()
        {
            self.load_rx = Some(Self::spawn_load(path));
        }
    }
}
