//! Bounded fetches against the data search backend.
use crate::error::{CrateError, Result};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::{Map, Value};
use std::time::Duration;

pub const USER_AGENT: &str = concat!("taxa-kit/", env!("CARGO_PKG_VERSION"), " reqwest/0.12");

/// One result row: column name to value, in the order the backend sent them.
pub type ExportRow = Map<String, Value>;

/// What a requester asked to download. Fixed once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportQuery {
    pub query_string: Option<String>,
    pub attribute_uri: String,
    /// Human label of the attribute, used for file names.
    pub attribute_name: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<String>,
    pub language: String,
}

/// Parameters of the single request sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query_string: Option<String>,
    pub attribute: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<String>,
    pub per_page: usize,
    pub for_download: bool,
    pub language: String,
}

impl SearchRequest {
    pub fn for_download(query: &ExportQuery, per_page: usize) -> Self {
        Self {
            query_string: query.query_string.clone(),
            attribute: query.attribute_uri.clone(),
            from: query.from.clone(),
            to: query.to.clone(),
            sort: query.sort.clone(),
            per_page,
            for_download: true,
            language: query.language.clone(),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("attribute", self.attribute.clone())];
        let optional = [
            ("q", &self.query_string),
            ("from", &self.from),
            ("to", &self.to),
            ("sort", &self.sort),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_ref().filter(|v| !v.trim().is_empty()) {
                pairs.push((key, value.clone()));
            }
        }
        pairs.push(("per_page", self.per_page.to_string()));
        pairs.push(("for_download", self.for_download.to_string()));
        pairs.push(("language", self.language.clone()));
        pairs
    }
}

/// A single page of results plus the backend's count of every match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub total_entries: u64,
    pub results: Vec<ExportRow>,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage>;
}

/// Issues one bounded request (`per_page = limit`) and returns the rows with
/// the true match count. Rows past `limit` are dropped.
pub async fn fetch(
    backend: &dyn SearchBackend,
    query: &ExportQuery,
    limit: usize,
) -> Result<SearchPage> {
    let request = SearchRequest::for_download(query, limit);
    let mut page = backend.search(&request).await?;
    if page.results.len() > limit {
        warn!(
            "Search backend returned {} rows for a page of {}; truncating",
            page.results.len(),
            limit
        );
        page.results.truncate(limit);
    }
    info!(
        "Fetched {} of {} matching rows for attribute {}",
        page.results.len(),
        page.total_entries,
        query.attribute_uri
    );
    Ok(page)
}

pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(CrateError::SearchRequestError)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchPage> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&request.query_pairs())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(CrateError::SearchRequestError)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrateError::SearchStatusError {
                status,
                query: request.query_string.clone().unwrap_or_default(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(CrateError::SearchJsonDecodeError)?;
        parse_search_page(body)
    }
}

/// Reads `{"total_entries": n, "results": [{..}, ..]}`.
///
/// A missing `results` array or a non-object row is a format error, not an
/// empty page. A missing `total_entries` falls back to the row count.
pub fn parse_search_page(body: Value) -> Result<SearchPage> {
    let Value::Object(mut body) = body else {
        return Err(CrateError::SearchResponseFormatError(
            "response body is not a JSON object".to_string(),
        ));
    };

    let results = match body.remove("results") {
        Some(Value::Array(results)) => results,
        _ => {
            return Err(CrateError::SearchResponseFormatError(
                "missing or invalid 'results' array".to_string(),
            ));
        }
    };

    let rows = results
        .into_iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(row) => Ok(row),
            other => Err(CrateError::SearchResponseFormatError(format!(
                "result {} is not an object: {}",
                index, other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let total_entries = body
        .get("total_entries")
        .and_then(Value::as_u64)
        .unwrap_or(rows.len() as u64);

    Ok(SearchPage {
        total_entries,
        results: rows,
    })
}
