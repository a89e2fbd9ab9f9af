//! The REST backend.

use async_trait::async_trait;
use futures::stream;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{AuthService, FileService, LoginResponse, SearchService, SuggestService, UploadRequest};
use crate::core::{Category, SearchRequest, SearchResponse, ServiceError, UserProfile};

/// Upload bodies are streamed in chunks of this size so progress can be reported.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Deserialize)]
struct SuggestBody {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct MeBody {
    user: UserProfile,
}

/// Talks to the catalog REST API and keeps the bearer token of the current session.
pub struct HttpFilesApi {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpFilesApi {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("catalog-search/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.read().unwrap_or_else(|e| e.into_inner()).as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and maps non-success statuses to `ServiceError`.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = self.with_auth(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(error_from_status(status, &body))
    }
}

/// Query parameters for `GET /api/search`. Categories repeat, one pair each.
pub fn search_params(request: &SearchRequest) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if !request.q.is_empty() {
        params.push(("q", request.q.clone()));
    }
    params.extend(
        request
            .categories
            .iter()
            .map(|c| ("categories", c.as_str().to_string())),
    );
    params.push(("sortField", request.sort_field.as_str().to_string()));
    params.push(("sortDir", request.sort_dir.as_str().to_string()));
    params.push(("page", request.page.max(1).to_string()));
    params.push(("size", request.size.max(1).to_string()));
    params
}

/// Maps a failed response to the error taxonomy. The body text is the message when present.
pub fn error_from_status(status: StatusCode, body: &str) -> ServiceError {
    let message = if body.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        body.trim().to_string()
    };
    match status {
        StatusCode::UNAUTHORIZED => ServiceError::Unauthenticated,
        StatusCode::FORBIDDEN => ServiceError::PermissionDenied(message),
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::Validation(message)
        }
        _ => ServiceError::Server {
            status: status.as_u16(),
            message,
        },
    }
}

/// Percentage of `sent` over `total`, 100 for an empty body.
fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

#[async_trait]
impl SearchService for HttpFilesApi {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, ServiceError> {
        let builder = self
            .client
            .get(self.url("/api/search"))
            .query(&search_params(request));
        let response = self.send(builder).await?;
        Ok(response.json::<SearchResponse>().await?)
    }
}

#[async_trait]
impl SuggestService for HttpFilesApi {
    async fn suggest(&self, q: &str, categories: &[Category]) -> Result<Vec<String>, ServiceError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if !q.is_empty() {
            params.push(("q", q.to_string()));
        }
        params.extend(categories.iter().map(|c| ("categories", c.as_str().to_string())));

        let builder = self
            .client
            .get(self.url("/api/search/suggest"))
            .query(&params);
        let body: SuggestBody = self.send(builder).await?.json().await?;
        Ok(body.suggestions)
    }
}

#[async_trait]
impl AuthService for HttpFilesApi {
    async fn login(
        &self,
        email: &str,
        password: &str,
        remember: bool,
    ) -> Result<LoginResponse, ServiceError> {
        let builder = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password, "remember": remember }));
        let response: LoginResponse = self.send(builder).await?.json().await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    async fn logout(&self) -> Result<(), ServiceError> {
        let result = self.send(self.client.post(self.url("/api/auth/logout"))).await;
        self.set_token(None);
        result.map(|_| ())
    }

    async fn me(&self) -> Result<UserProfile, ServiceError> {
        let body: MeBody = self
            .send(self.client.get(self.url("/api/auth/me")))
            .await?
            .json()
            .await?;
        Ok(body.user)
    }

    fn restore_token(&self, token: Option<&str>) {
        self.set_token(token.map(str::to_string));
    }
}

#[async_trait]
impl FileService for HttpFilesApi {
    async fn upload(
        &self,
        upload: UploadRequest,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<Value, ServiceError> {
        let total = upload.content.len() as u64;
        let mime = mime_guess::from_path(&upload.file_name).first_or_octet_stream();

        // The multipart body is polled from another task, so progress is relayed
        // through a shared counter and reported from here once the send settles.
        let sent = Arc::new(AtomicU64::new(0));
        let chunks: Vec<Vec<u8>> = upload
            .content
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();
        let counter = sent.clone();
        let body_stream = stream::iter(chunks.into_iter().map(move |chunk| {
            counter.fetch_add(chunk.len() as u64, Ordering::SeqCst);
            Ok::<_, std::io::Error>(chunk)
        }));

        let file_part = multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(body_stream),
            total,
        )
        .file_name(upload.file_name.clone())
        .mime_str(mime.essence_str())?;

        let form = multipart::Form::new()
            .part("file", file_part)
            .text("title", upload.title)
            .text("category", upload.category.as_str().to_string())
            .text("metadataText", upload.metadata_text);

        on_progress(0);
        let send = self.send(self.client.post(self.url("/api/files/upload")).multipart(form));
        tokio::pin!(send);

        let mut last = 0u8;
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(100));
        let response = loop {
            tokio::select! {
                result = &mut send => break result?,
                _ = ticker.tick() => {
                    let current = percent(sent.load(Ordering::SeqCst), total).min(99);
                    if current > last {
                        last = current;
                        on_progress(current);
                    }
                }
            }
        };
        on_progress(100);

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        let path = format!("/api/files/{}", url_segment(file_id));
        self.send(self.client.delete(self.url(&path))).await?;
        Ok(())
    }
}

/// Percent-encodes a single path segment.
fn url_segment(segment: &str) -> String {
    let mut url = match url::Url::parse("http://placeholder/") {
        Ok(url) => url,
        Err(_) => return segment.to_string(),
    };
    url.path_segments_mut()
        .map(|mut segments| {
            segments.pop_if_empty().push(segment);
        })
        .ok();
    url.path().trim_start_matches('/').to_string()
}
