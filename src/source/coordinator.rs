use std::time::{Duration, Instant};

use serde::Deserialize;

use super::debounce::Debouncer;
use super::local::{count_roots, local_page};
use super::server::FetchError;
use crate::callgraph::{CallForest, DatasetError, FunctionKey, FunctionRecord, parse_records};
use crate::util::page_count;

pub const SAMPLE_LABEL: &str = "EmployeeApp (sample)";

const SAMPLE_JSON: &str = include_str!("../../assets/sample.json");

/// The dataset shown when nothing has been uploaded.
pub fn sample_records() -> Result<Vec<FunctionRecord>, DatasetError> {
    parse_records(SAMPLE_JSON)
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the call-graph server. Server mode is unavailable without it.
    pub server_url: Option<String>,
    pub page_size: usize,
    pub page_size_choices: Vec<usize>,
    /// Uploads with more roots than this are paginated locally.
    pub local_page_threshold: usize,
    pub debounce_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            page_size: 5,
            page_size_choices: vec![5, 10, 15, 20, 50],
            local_page_threshold: 10,
            debounce_ms: 1500,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceMode {
    Upload,
    LocalPaged,
    LocalSearch,
    ServerPaged,
    ServerSearch,
}

impl SourceMode {
    pub fn is_search(self) -> bool {
        matches!(self, Self::LocalSearch | Self::ServerSearch)
    }

    pub fn is_paginated(self) -> bool {
        self != Self::Upload
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::LocalPaged => "Local pages",
            Self::LocalSearch => "Local search",
            Self::ServerPaged => "Server pages",
            Self::ServerSearch => "Server search",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    /// Roots (or search results) across all pages.
    pub total: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            total: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }
}

/// The record list currently handed to the graph builder.
#[derive(Clone, Debug, Default)]
pub struct ActiveDataset {
    pub label: String,
    pub records: Vec<FunctionRecord>,
    /// Roots decided over a larger set than `records` (a local page or search
    /// slice). `None` means roots follow from `records` alone.
    pub roots: Option<Vec<FunctionKey>>,
    /// Bumped on every replacement so views can drop derived state.
    pub revision: u64,
}

impl ActiveDataset {
    pub fn forest(&self) -> CallForest {
        match &self.roots {
            Some(roots) => CallForest::build_with_roots(&self.records, roots),
            None => CallForest::build(&self.records),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
    Page,
    Search { query: String },
    /// Invalidate the server cache, then fetch the requested roots page.
    Reload,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: u64,
    pub kind: FetchKind,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Clone, Debug)]
pub struct ServerPage {
    pub records: Vec<FunctionRecord>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    /// Set when the page answers a search.
    pub query: Option<String>,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub seq: u64,
    pub result: Result<ServerPage, FetchError>,
}

struct Upload {
    label: String,
    records: Vec<FunctionRecord>,
}

fn search_label(query: &str, matches: usize, page: usize) -> String {
    format!("Search: \"{query}\" ({matches} matches, page {page})")
}

/// Decides where the active dataset comes from and keeps pagination, search
/// and debouncing consistent.
///
/// Network work is never done here: operations that need the server return a
/// [`FetchRequest`], and the caller feeds the result back through
/// [`DataSourceCoordinator::complete`]. Only the most recently issued request
/// is accepted.
pub struct DataSourceCoordinator {
    config: SourceConfig,
    upload: Upload,
    server_enabled: bool,
    mode: SourceMode,
    pagination: Pagination,
    query: String,
    applied_query: String,
    debounce: Debouncer<String>,
    active: ActiveDataset,
    last_seq: u64,
    in_flight: Option<u64>,
    error: Option<String>,
}

impl DataSourceCoordinator {
    pub fn new(config: SourceConfig, label: impl Into<String>, records: Vec<FunctionRecord>) -> Self {
        let debounce = Debouncer::new(Duration::from_millis(config.debounce_ms));
        let pagination = Pagination::new(config.page_size);
        let mut coordinator = Self {
            config,
            upload: Upload {
                label: label.into(),
                records,
            },
            server_enabled: false,
            mode: SourceMode::Upload,
            pagination,
            query: String::new(),
            applied_query: String::new(),
            debounce,
            active: ActiveDataset::default(),
            last_seq: 0,
            in_flight: None,
            error: None,
        };
        coordinator.apply_local();
        coordinator
    }

    pub fn with_sample(config: SourceConfig) -> Self {
        let records = sample_records().unwrap_or_else(|error| {
            tracing::error!(%error, "built-in sample dataset is invalid");
            Vec::new()
        });
        Self::new(config, SAMPLE_LABEL, records)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn active(&self) -> &ActiveDataset {
        &self.active
    }

    /// The search text as typed, which may not be applied yet.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query the active dataset reflects.
    pub fn applied_query(&self) -> &str {
        &self.applied_query
    }

    pub fn server_enabled(&self) -> bool {
        self.server_enabled
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Parses `raw` and, on success, replaces the uploaded dataset. A
    /// malformed file is reported and leaves everything as it was.
    pub fn load_upload_json(&mut self, label: &str, raw: &str) -> Result<(), DatasetError> {
        match parse_records(raw) {
            Ok(records) => {
                self.load_upload(label, records);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(label, %error, "rejected uploaded dataset");
                self.error = Some(format!("Could not load {label}: {error}"));
                Err(error)
            }
        }
    }

    /// Replaces the uploaded dataset and leaves server mode.
    pub fn load_upload(&mut self, label: impl Into<String>, records: Vec<FunctionRecord>) {
        let label = label.into();
        tracing::info!(
            label = %label,
            records = records.len(),
            roots = count_roots(&records),
            "loaded dataset"
        );

        self.upload = Upload { label, records };
        self.server_enabled = false;
        self.in_flight = None;
        self.error = None;
        self.debounce.cancel();
        self.query.clear();
        self.applied_query.clear();
        self.pagination = Pagination::new(self.pagination.page_size);
        self.apply_local();
    }

    /// Switching in either direction clears the query and the totals of the
    /// abandoned mode. Enabling issues a fetch for the first page.
    pub fn set_server_enabled(&mut self, enabled: bool) -> Option<FetchRequest> {
        if enabled == self.server_enabled {
            return None;
        }

        self.server_enabled = enabled;
        self.in_flight = None;
        self.error = None;
        self.debounce.cancel();
        self.query.clear();
        self.applied_query.clear();
        self.pagination = Pagination::new(self.pagination.page_size);

        if enabled {
            tracing::info!("switched to server mode");
            self.mode = SourceMode::ServerPaged;
            Some(self.issue(FetchKind::Page, 1, self.pagination.page_size))
        } else {
            tracing::info!(label = %self.upload.label, "left server mode");
            self.apply_local();
            None
        }
    }

    /// Records typed search text. It is applied once `tick` observes the quiet
    /// period has passed with no newer text.
    pub fn set_query(&mut self, query: impl Into<String>, now: Instant) {
        self.query = query.into();
        self.debounce.schedule(self.query.trim().to_string(), now);
    }

    /// Applies the typed text right away, dropping any pending debounce.
    pub fn submit_query(&mut self) -> Option<FetchRequest> {
        self.debounce.cancel();
        let query = self.query.trim().to_string();
        self.apply_query(query)
    }

    pub fn clear_query(&mut self) -> Option<FetchRequest> {
        self.query.clear();
        self.debounce.cancel();
        self.apply_query(String::new())
    }

    pub fn tick(&mut self, now: Instant) -> Option<FetchRequest> {
        let query = self.debounce.poll(now)?;
        tracing::debug!(query = %query, "debounced query fired");
        self.apply_query(query)
    }

    pub fn set_page(&mut self, page: usize) -> Option<FetchRequest> {
        let page = page.clamp(1, self.pagination.page_count());
        if self.server_enabled {
            let kind = self.query_kind();
            return Some(self.issue(kind, page, self.pagination.page_size));
        }
        if self.mode == SourceMode::Upload {
            return None;
        }

        self.pagination.page = page;
        self.apply_local();
        None
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        if !self.pagination.has_next() {
            return None;
        }
        self.set_page(self.pagination.page + 1)
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        if !self.pagination.has_prev() {
            return None;
        }
        self.set_page(self.pagination.page - 1)
    }

    /// Changes the page size and goes back to the first page.
    pub fn set_page_size(&mut self, page_size: usize) -> Option<FetchRequest> {
        let page_size = page_size.max(1);
        if self.server_enabled {
            let kind = self.query_kind();
            return Some(self.issue(kind, 1, page_size));
        }

        self.pagination.page_size = page_size;
        self.pagination.page = 1;
        self.apply_local();
        None
    }

    /// Re-issues the current page or search.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        if self.server_enabled {
            let kind = self.query_kind();
            return Some(self.issue(kind, self.pagination.page, self.pagination.page_size));
        }
        self.apply_local();
        None
    }

    /// Asks the server to rebuild its dataset, then refetches page 1.
    pub fn reload(&mut self) -> Option<FetchRequest> {
        if !self.server_enabled {
            return None;
        }
        self.debounce.cancel();
        self.query.clear();
        self.applied_query.clear();
        Some(self.issue(FetchKind::Reload, 1, self.pagination.page_size))
    }

    /// Applies a fetch result. Returns `false` when the response belongs to a
    /// request that has since been superseded and was therefore ignored.
    pub fn complete(&mut self, outcome: FetchOutcome) -> bool {
        let seq = outcome.seq;
        if self.in_flight != Some(seq) {
            tracing::debug!(seq, latest = ?self.in_flight, "dropping stale response");
            return false;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(page) => {
                tracing::info!(
                    seq,
                    page = page.page,
                    records = page.records.len(),
                    total = page.total,
                    "fetch complete"
                );
                let label = match &page.query {
                    Some(query) => search_label(query, page.total, page.page),
                    None => format!("Server Roots Page {}", page.page),
                };
                self.mode = if page.query.is_some() {
                    SourceMode::ServerSearch
                } else {
                    SourceMode::ServerPaged
                };
                self.pagination = Pagination {
                    page: page.page.max(1),
                    page_size: page.page_size.max(1),
                    total: page.total,
                };
                self.error = None;
                self.replace_active(label, page.records, None);
            }
            Err(error) => {
                tracing::warn!(seq, %error, "fetch failed");
                self.error = Some(format!("Server request failed: {error}"));
            }
        }
        true
    }

    fn query_kind(&self) -> FetchKind {
        if self.applied_query.is_empty() {
            FetchKind::Page
        } else {
            FetchKind::Search {
                query: self.applied_query.clone(),
            }
        }
    }

    fn issue(&mut self, kind: FetchKind, page: usize, page_size: usize) -> FetchRequest {
        self.last_seq += 1;
        let seq = self.last_seq;
        self.in_flight = Some(seq);
        tracing::debug!(seq, page, page_size, ?kind, "issuing fetch");
        FetchRequest {
            seq,
            kind,
            page,
            page_size,
        }
    }

    fn apply_query(&mut self, query: String) -> Option<FetchRequest> {
        self.applied_query = query;
        if self.server_enabled {
            let kind = self.query_kind();
            return Some(self.issue(kind, 1, self.pagination.page_size));
        }

        self.pagination.page = 1;
        self.apply_local();
        None
    }

    /// Derives the active dataset from the upload, paging it locally when it
    /// is filtered or has too many roots.
    fn apply_local(&mut self) {
        let query = self.applied_query.clone();
        let searching = !query.is_empty();
        let total_roots = count_roots(&self.upload.records);

        if !searching && total_roots <= self.config.local_page_threshold {
            self.mode = SourceMode::Upload;
            self.pagination.page = 1;
            self.pagination.total = total_roots;
            let label = self.upload.label.clone();
            let records = self.upload.records.clone();
            self.replace_active(label, records, None);
            return;
        }

        let filter = searching.then_some(query.as_str());
        let page_size = self.pagination.page_size;
        let mut slice = local_page(&self.upload.records, filter, self.pagination.page, page_size);
        let last_page = page_count(slice.total_roots, page_size);
        if slice.page > last_page {
            slice = local_page(&self.upload.records, filter, last_page, page_size);
        }

        self.mode = if searching {
            SourceMode::LocalSearch
        } else {
            SourceMode::LocalPaged
        };
        self.pagination.page = slice.page;
        self.pagination.total = slice.total_roots;

        let label = if searching {
            search_label(&query, slice.total_roots, slice.page)
        } else {
            format!("{} (roots page {})", self.upload.label, slice.page)
        };
        self.replace_active(label, slice.records, Some(slice.roots));
    }

    fn replace_active(
        &mut self,
        label: String,
        records: Vec<FunctionRecord>,
        roots: Option<Vec<FunctionKey>>,
    ) {
        self.active.label = label;
        self.active.records = records;
        self.active.roots = roots;
        self.active.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::CallRef;

    fn roots(count: usize) -> Vec<FunctionRecord> {
        (0..count)
            .map(|index| {
                FunctionRecord::new(format!("pkg.Root{index}"), "pkg/root.go", 1)
                    .with_call(CallRef::new("pkg.helper", "pkg/helper.go"))
            })
            .chain([FunctionRecord::new("pkg.helper", "pkg/helper.go", 2)])
            .collect()
    }

    fn page_of(request: &FetchRequest, total: usize) -> FetchOutcome {
        FetchOutcome {
            seq: request.seq,
            result: Ok(ServerPage {
                records: roots(1),
                total,
                page: request.page,
                page_size: request.page_size,
                query: match &request.kind {
                    FetchKind::Search { query } => Some(query.clone()),
                    _ => None,
                },
            }),
        }
    }

    #[test]
    fn sample_dataset_parses() {
        let records = sample_records().unwrap();
        assert_eq!(count_roots(&records), 1);
        let coordinator = DataSourceCoordinator::with_sample(SourceConfig::default());
        assert_eq!(coordinator.mode(), SourceMode::Upload);
        assert_eq!(coordinator.active().label, SAMPLE_LABEL);
    }

    #[test]
    fn small_upload_is_shown_whole() {
        let coordinator = DataSourceCoordinator::new(SourceConfig::default(), "small.json", roots(10));
        assert_eq!(coordinator.mode(), SourceMode::Upload);
        assert_eq!(coordinator.active().records.len(), 11);
        assert_eq!(coordinator.pagination().total, 10);
    }

    #[test]
    fn large_upload_is_paged_locally() {
        let mut coordinator = DataSourceCoordinator::new(SourceConfig::default(), "big.json", roots(12));
        assert_eq!(coordinator.mode(), SourceMode::LocalPaged);
        assert_eq!(coordinator.pagination().page_count(), 3);
        // five roots plus the shared helper
        assert_eq!(coordinator.active().records.len(), 6);
        assert_eq!(coordinator.active().label, "big.json (roots page 1)");

        assert!(coordinator.next_page().is_none());
        assert!(coordinator.next_page().is_none());
        assert_eq!(coordinator.pagination().page, 3);
        assert_eq!(coordinator.active().records.len(), 3);
        assert!(!coordinator.pagination().has_next());
        coordinator.next_page();
        assert_eq!(coordinator.pagination().page, 3);
    }

    #[test]
    fn local_search_filters_and_clears() {
        let mut coordinator = DataSourceCoordinator::new(SourceConfig::default(), "big.json", roots(12));
        coordinator.set_page(2);
        coordinator.set_query("root1", Instant::now());
        assert!(coordinator.submit_query().is_none());
        assert_eq!(coordinator.mode(), SourceMode::LocalSearch);
        // Root1, Root10, Root11
        assert_eq!(coordinator.pagination().total, 3);
        assert_eq!(coordinator.pagination().page, 1);
        assert_eq!(
            coordinator.active().label,
            "Search: \"root1\" (3 matches, page 1)"
        );

        coordinator.clear_query();
        assert_eq!(coordinator.mode(), SourceMode::LocalPaged);
        assert_eq!(coordinator.pagination().total, 12);
    }

    #[test]
    fn page_size_change_returns_to_first_page() {
        let mut coordinator = DataSourceCoordinator::new(SourceConfig::default(), "big.json", roots(12));
        coordinator.set_page(3);
        coordinator.set_page_size(10);
        assert_eq!(coordinator.pagination().page, 1);
        assert_eq!(coordinator.pagination().page_count(), 2);
    }

    #[test]
    fn server_pagination_advances_only_on_success() {
        let mut coordinator = DataSourceCoordinator::with_sample(SourceConfig::default());
        let first = coordinator.set_server_enabled(true).unwrap();
        assert_eq!(first.kind, FetchKind::Page);
        assert!(coordinator.complete(page_of(&first, 12)));
        assert_eq!(coordinator.active().label, "Server Roots Page 1");

        let second = coordinator.next_page().unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(coordinator.pagination().page, 1);
        assert!(coordinator.complete(FetchOutcome {
            seq: second.seq,
            result: Err(FetchError::Status(502)),
        }));
        assert_eq!(coordinator.pagination().page, 1);
        assert!(coordinator.error().unwrap().contains("502"));
        assert_eq!(coordinator.active().label, "Server Roots Page 1");

        let retry = coordinator.next_page().unwrap();
        assert!(coordinator.complete(page_of(&retry, 12)));
        assert_eq!(coordinator.pagination().page, 2);
        assert!(coordinator.error().is_none());
    }

    #[test]
    fn superseded_response_is_ignored() {
        let mut coordinator = DataSourceCoordinator::with_sample(SourceConfig::default());
        let first = coordinator.set_server_enabled(true).unwrap();
        coordinator.set_query("handler", Instant::now());
        let search = coordinator.submit_query().unwrap();

        assert!(coordinator.complete(page_of(&search, 4)));
        assert!(!coordinator.complete(page_of(&first, 99)));
        assert_eq!(coordinator.mode(), SourceMode::ServerSearch);
        assert_eq!(coordinator.pagination().total, 4);
    }

    #[test]
    fn leaving_server_mode_restores_upload() {
        let mut coordinator = DataSourceCoordinator::new(SourceConfig::default(), "mine.json", roots(2));
        let request = coordinator.set_server_enabled(true).unwrap();
        coordinator.complete(page_of(&request, 40));
        coordinator.set_query("x", Instant::now());

        assert!(coordinator.set_server_enabled(false).is_none());
        assert_eq!(coordinator.mode(), SourceMode::Upload);
        assert_eq!(coordinator.query(), "");
        assert_eq!(coordinator.pagination().total, 2);
        assert_eq!(coordinator.active().label, "mine.json");
        assert!(coordinator.debounce_deadline().is_none());
    }

    #[test]
    fn reload_refetches_first_page() {
        let mut coordinator = DataSourceCoordinator::with_sample(SourceConfig::default());
        assert!(coordinator.reload().is_none());
        let request = coordinator.set_server_enabled(true).unwrap();
        coordinator.complete(page_of(&request, 40));
        let third = coordinator.set_page(3).unwrap();
        coordinator.complete(page_of(&third, 40));
        assert_eq!(coordinator.pagination().page, 3);

        let reload = coordinator.reload().unwrap();
        assert_eq!(reload.kind, FetchKind::Reload);
        assert_eq!(reload.page, 1);
    }

    #[test]
    fn malformed_upload_keeps_previous_dataset() {
        let mut coordinator = DataSourceCoordinator::new(SourceConfig::default(), "good.json", roots(3));
        let revision = coordinator.active().revision;
        assert!(coordinator.load_upload_json("bad.json", "{ not json").is_err());
        assert_eq!(coordinator.active().revision, revision);
        assert_eq!(coordinator.active().label, "good.json");
        assert!(coordinator.error().unwrap().contains("bad.json"));

        coordinator.dismiss_error();
        assert!(coordinator.error().is_none());
    }

    fn chain_behind_non_match() -> Vec<FunctionRecord> {
        vec![
            FunctionRecord::new("foo.A", "a.go", 1).with_call(CallRef::new("bar.C", "c.go")),
            FunctionRecord::new("bar.C", "c.go", 2).with_call(CallRef::new("baz.D", "foo/d.go")),
            FunctionRecord::new("baz.D", "foo/d.go", 3),
        ]
    }

    fn shown_roots(coordinator: &DataSourceCoordinator) -> Vec<String> {
        let forest = coordinator.active().forest();
        forest
            .roots()
            .iter()
            .map(|&index| forest.node(index).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn search_root_reached_through_non_match_is_still_drawn() {
        let mut coordinator =
            DataSourceCoordinator::new(SourceConfig::default(), "chain.json", chain_behind_non_match());
        coordinator.set_query("foo", Instant::now());
        coordinator.submit_query();

        assert_eq!(coordinator.active().label, "Search: \"foo\" (2 matches, page 1)");
        assert_eq!(shown_roots(&coordinator), ["foo.A", "baz.D"]);
        assert_eq!(shown_roots(&coordinator).len(), coordinator.pagination().total);
        // bar.C keeps its own call list inside the closure
        assert_eq!(coordinator.active().records.len(), 3);
    }

    #[test]
    fn filtered_pages_show_each_match_once() {
        let mut coordinator =
            DataSourceCoordinator::new(SourceConfig::default(), "chain.json", chain_behind_non_match());
        coordinator.set_page_size(1);
        coordinator.set_query("foo", Instant::now());
        coordinator.submit_query();
        assert_eq!(coordinator.pagination().page_count(), 2);

        let mut drawn = shown_roots(&coordinator);
        assert!(coordinator.next_page().is_none());
        assert_eq!(coordinator.pagination().page, 2);
        drawn.extend(shown_roots(&coordinator));

        assert_eq!(drawn, ["foo.A", "baz.D"]);
    }
}
