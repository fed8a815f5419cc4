//! reqwest-backed clients for the progress, activity and bookmark services
//!
//! Endpoints:
//! - `GET  {base}/progress/{lessonId}` returns `{ "position", "duration" }`, 404 when unset
//! - `PUT  {base}/progress/{lessonId}` with `{ "position", "duration" }`
//! - `POST {base}/activity` with an [`ActivityEvent`]
//! - `POST {base}/bookmarks` with `{ "lessonId", "timestamp" }`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::traits::{ActivitySink, BookmarkStore, ProgressStore};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{ActivityEvent, Bookmark, Checkpoint, SavedPosition};

/// Shared HTTP plumbing: one connection pool, timeout and bearer token
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    token: Option<String>,
}

impl ServiceClient {
    pub fn new(timeout: Duration, token: Option<String>) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lesson-player/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, token })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Append path segments to a base URL, percent-encoding each one
    pub fn endpoint(base: &Url, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(service: &str, response: Response) -> ServiceResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        Err(ServiceError::status(service, status.as_u16(), message))
    }
}

#[derive(Debug, Serialize)]
struct PositionBody {
    position: f64,
    duration: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookmarkBody<'a> {
    lesson_id: &'a str,
    timestamp: f64,
}

pub struct HttpProgressStore {
    base: Url,
    client: ServiceClient,
}

impl HttpProgressStore {
    pub fn new(base: Url, client: ServiceClient) -> Self {
        Self { base, client }
    }
}

#[async_trait]
impl ProgressStore for HttpProgressStore {
    async fn load(&self, lesson_id: &str) -> ServiceResult<Option<SavedPosition>> {
        let url = ServiceClient::endpoint(&self.base, &["progress", lesson_id])?;
        debug!("Fetching saved position from {}", url);

        let response = self.client.authorize(self.client.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ServiceClient::check("progress", response).await?;
        Ok(Some(response.json::<SavedPosition>().await?))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> ServiceResult<()> {
        let url = ServiceClient::endpoint(&self.base, &["progress", &checkpoint.lesson_id])?;
        let body = PositionBody {
            position: checkpoint.position,
            duration: checkpoint.duration,
        };

        let response = self
            .client
            .authorize(self.client.client.put(url))
            .json(&body)
            .send()
            .await?;
        ServiceClient::check("progress", response).await?;
        Ok(())
    }
}

pub struct HttpActivitySink {
    base: Url,
    client: ServiceClient,
}

impl HttpActivitySink {
    pub fn new(base: Url, client: ServiceClient) -> Self {
        Self { base, client }
    }
}

#[async_trait]
impl ActivitySink for HttpActivitySink {
    async fn post(&self, event: &ActivityEvent) -> ServiceResult<()> {
        let url = ServiceClient::endpoint(&self.base, &["activity"])?;
        let response = self
            .client
            .authorize(self.client.client.post(url))
            .json(event)
            .send()
            .await?;
        ServiceClient::check("activity", response).await?;
        Ok(())
    }
}

pub struct HttpBookmarkStore {
    base: Url,
    client: ServiceClient,
}

impl HttpBookmarkStore {
    pub fn new(base: Url, client: ServiceClient) -> Self {
        Self { base, client }
    }
}

#[async_trait]
impl BookmarkStore for HttpBookmarkStore {
    async fn create(&self, bookmark: &Bookmark) -> ServiceResult<()> {
        let url = ServiceClient::endpoint(&self.base, &["bookmarks"])?;
        let body = BookmarkBody {
            lesson_id: &bookmark.lesson_id,
            timestamp: bookmark.timestamp,
        };
        let response = self
            .client
            .authorize(self.client.client.post(url))
            .json(&body)
            .send()
            .await?;
        ServiceClient::check("bookmarks", response).await?;
        Ok(())
    }
}
