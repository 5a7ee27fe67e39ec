mod coordinator;
mod debounce;
mod local;
mod server;
mod worker;

pub use coordinator::{
    ActiveDataset, DataSourceCoordinator, FetchKind, FetchOutcome, FetchRequest, Pagination,
    SAMPLE_LABEL, ServerPage, SourceConfig, SourceMode, sample_records,
};
pub use debounce::Debouncer;
pub use local::{LocalPage, count_roots, local_page, search_records};
pub use server::{CallGraphServer, FetchError, HttpServer, PageResponse, SearchResponse};
pub use worker::{FetchWorker, execute};
