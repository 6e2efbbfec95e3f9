//! Resource Fetcher
//!
//! Paginated, cancellable GETs against GCP list APIs.

use crate::error::CollectError;
use crate::gcp::client::GcpClient;
use anyhow::Result;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// How a list API hands out continuation tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Google APIs: `pageToken` query parameter, `nextPageToken` in the body
    PageToken,
    /// Kubernetes-style APIs (Cloud Run v1): `continue` / `metadata.continue`
    Continue,
    /// Single response, no paging
    None,
}

impl Pagination {
    fn query_param(self) -> Option<&'static str> {
        match self {
            Pagination::PageToken => Some("pageToken"),
            Pagination::Continue => Some("continue"),
            Pagination::None => None,
        }
    }

    fn next_token(self, response: &Value) -> Option<String> {
        let token = match self {
            Pagination::PageToken => response.get("nextPageToken"),
            Pagination::Continue => json_path(response, "metadata.continue"),
            Pagination::None => None,
        };

        token
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// A list endpoint and where its items live in the response
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub url: String,
    pub items_path: String,
    pub pagination: Pagination,
}

impl ListRequest {
    pub fn new(url: String, items_path: &str) -> Self {
        Self {
            url,
            items_path: items_path.to_string(),
            pagination: Pagination::PageToken,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// Result of paginated fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Run `fut` unless the run is cancelled first
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CollectError::Cancelled.into()),
        result = fut => result,
    }
}

/// Single GET that honours cancellation
pub async fn fetch_one(client: &GcpClient, url: &str, cancel: &CancellationToken) -> Result<Value> {
    cancellable(cancel, client.get(url)).await
}

/// Fetch all items (auto-paginate)
pub async fn fetch_all(
    client: &GcpClient,
    request: &ListRequest,
    cancel: &CancellationToken,
) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let result = fetch_page(client, request, page_token.as_deref(), cancel).await?;
        all_items.extend(result.items);

        if result.next_token.is_none() {
            break;
        }
        page_token = result.next_token;
    }

    tracing::debug!("Fetched {} items from {}", all_items.len(), request.url);
    Ok(all_items)
}

/// Fetch one page of items
pub async fn fetch_page(
    client: &GcpClient,
    request: &ListRequest,
    page_token: Option<&str>,
    cancel: &CancellationToken,
) -> Result<PaginatedResult> {
    let url = match (page_token, request.pagination.query_param()) {
        (Some(token), Some(param)) => add_query_param(&request.url, param, token),
        _ => request.url.clone(),
    };

    let response = fetch_one(client, &url, cancel).await?;

    Ok(PaginatedResult {
        items: extract_items(&response, &request.items_path),
        next_token: request.pagination.next_token(&response),
    })
}

/// Extract items from response using a dot-separated path
pub fn extract_items(response: &Value, path: &str) -> Vec<Value> {
    let target = if path.is_empty() {
        Some(response)
    } else {
        json_path(response, path)
    };

    target
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Walk a dot-notation path (numeric segments index arrays)
pub fn json_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, part| match part.parse::<usize>() {
        Ok(idx) if current.is_array() => current.get(idx),
        _ => current.get(part),
    })
}

/// String field at a dot-notation path
pub fn json_str<'a>(item: &'a Value, path: &str) -> Option<&'a str> {
    json_path(item, path).and_then(Value::as_str)
}

/// Append one query parameter, encoding the value
pub fn add_query_param(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, key, urlencoding::encode(value))
}
