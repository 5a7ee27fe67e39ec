use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

use crate::callgraph::FunctionRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of the server's root list. `data` already holds the closure of
/// the page's roots.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<FunctionRecord>,
    #[serde(default)]
    pub total_roots: usize,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<FunctionRecord>,
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

/// The remote side of the paginated and search feeds.
pub trait CallGraphServer: Send + Sync {
    fn fetch_page(&self, page: usize, page_size: usize) -> Result<PageResponse, FetchError>;

    fn search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchResponse, FetchError>;

    /// Asks the server to drop its cached dataset and rebuild it.
    fn reload(&self) -> Result<(), FetchError>;
}

pub struct HttpServer {
    client: Client,
    base: Url,
}

impl HttpServer {
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn relations_url(&self, page: usize, page_size: usize) -> Result<Url, FetchError> {
        let mut url = self.base.join("api/relations")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());
        Ok(url)
    }

    pub fn search_url(&self, query: &str, page: usize, page_size: usize) -> Result<Url, FetchError> {
        let mut url = self.base.join("api/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("page", &page.to_string())
            .append_pair("pageSize", &page_size.to_string());
        Ok(url)
    }

    /// Link to the full server-side dataset as a file.
    pub fn download_url(&self) -> Result<Url, FetchError> {
        Ok(self.base.join("api/download")?)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl CallGraphServer for HttpServer {
    fn fetch_page(&self, page: usize, page_size: usize) -> Result<PageResponse, FetchError> {
        self.get_json(self.relations_url(page, page_size)?)
    }

    fn search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<SearchResponse, FetchError> {
        self.get_json(self.search_url(query, page, page_size)?)
    }

    fn reload(&self) -> Result<(), FetchError> {
        let url = self.base.join("api/reload")?;
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Status(status.as_u16()))
        }
    }
}
