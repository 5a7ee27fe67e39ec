use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use super::coordinator::{FetchKind, FetchOutcome, FetchRequest, ServerPage};
use super::server::{CallGraphServer, FetchError, PageResponse};

fn roots_page(response: PageResponse, request: &FetchRequest) -> ServerPage {
    ServerPage {
        records: response.data,
        total: response.total_roots,
        page: response.page.unwrap_or(request.page),
        page_size: response.page_size.unwrap_or(request.page_size),
        query: None,
    }
}

/// Runs one request against `server` on the calling thread.
pub fn execute(server: &dyn CallGraphServer, request: &FetchRequest) -> Result<ServerPage, FetchError> {
    match &request.kind {
        FetchKind::Page => Ok(roots_page(
            server.fetch_page(request.page, request.page_size)?,
            request,
        )),
        FetchKind::Search { query } => {
            let response = server.search(query, request.page, request.page_size)?;
            Ok(ServerPage {
                records: response.data,
                total: response.total_results,
                page: response.page.unwrap_or(request.page),
                page_size: response.page_size.unwrap_or(request.page_size),
                query: Some(query.clone()),
            })
        }
        FetchKind::Reload => {
            server.reload()?;
            Ok(roots_page(
                server.fetch_page(request.page, request.page_size)?,
                request,
            ))
        }
    }
}

/// Executes fetches on short-lived background threads; results come back
/// over a channel polled from the UI thread.
pub struct FetchWorker {
    server: Arc<dyn CallGraphServer>,
    tx: Sender<FetchOutcome>,
    rx: Receiver<FetchOutcome>,
}

impl FetchWorker {
    pub fn new(server: Arc<dyn CallGraphServer>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { server, tx, rx }
    }

    pub fn spawn(&self, request: FetchRequest) {
        let server = Arc::clone(&self.server);
        let tx = self.tx.clone();

        thread::spawn(move || {
            let result = execute(server.as_ref(), &request);
            let _ = tx.send(FetchOutcome {
                seq: request.seq,
                result,
            });
        });
    }

    /// Every outcome that has arrived since the last poll.
    pub fn poll(&self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        outcomes
    }

    pub fn wait(&self, timeout: Duration) -> Option<FetchOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}
