use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::api_types::{
    Cursor, EnqueueTaskRequest, EnqueueTaskResponse, ExportFormat, ExportOptions, ExportRequest,
    ExportTask, GetTasksRequest, GetTasksResponse, LoadPageChunkRequest, LoadPageChunkResponse,
    RecordMap,
};
use super::page::Page;
use super::PageSource;
use crate::config::{ApiConfig, DEFAULT_BASE_URL};
use crate::error::{EpcError, Result};
use crate::page_id::PageId;

const CHUNK_LIMIT: u32 = 100;
const MAX_CHUNKS: u32 = 512;

#[derive(Debug, Clone)]
pub struct NotionAuth {
    token_v2: String,
}

impl NotionAuth {
    pub fn new(token_v2: impl Into<String>) -> Self {
        Self {
            token_v2: token_v2.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        match std::env::var("NOTION_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Some(Self::new(token.trim())),
            _ => None,
        }
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(COOKIE, format!("token_v2={}", self.token_v2))
    }
}

#[derive(Debug, Clone)]
pub struct NotionClient {
    http: Client,
    auth: Option<NotionAuth>,
    base_url: Url,
    export_timeout: Duration,
    poll_interval: Duration,
}

impl NotionClient {
    pub fn new(auth: Option<NotionAuth>) -> Result<Self> {
        Self::from_config(auth, &ApiConfig::default())
    }

    pub fn from_config(auth: Option<NotionAuth>, config: &ApiConfig) -> Result<Self> {
        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            config.base_url.as_str()
        };
        let base_url = Url::parse(base)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(EpcError::Network)?;

        Ok(Self {
            http,
            auth,
            base_url,
            export_timeout: config.export_timeout,
            poll_interval: config.export_poll_interval,
        })
    }

    pub async fn load_page_chunk(&self, request: &LoadPageChunkRequest) -> Result<LoadPageChunkResponse> {
        self.post_json("/api/v3/loadPageChunk", request).await
    }

    /// Download every chunk of a page, following the cursor until it runs dry.
    pub async fn download_page(&self, id: &PageId) -> Result<Page> {
        let mut record_map = RecordMap::default();
        let mut cursor = Cursor::default();
        let mut chunk_number = 0;

        loop {
            if chunk_number >= MAX_CHUNKS {
                return Err(EpcError::api(
                    None,
                    format!("page {id} did not finish loading after {MAX_CHUNKS} chunks"),
                ));
            }
            let request = LoadPageChunkRequest {
                page_id: id.dashed(),
                limit: CHUNK_LIMIT,
                cursor,
                chunk_number,
                vertical_columns: false,
            };
            let response = self.load_page_chunk(&request).await?;
            record_map.merge(response.record_map);
            chunk_number += 1;
            debug!(page = %id, chunk = chunk_number, "loaded page chunk");

            if response.cursor.stack.is_empty() {
                break;
            }
            cursor = response.cursor;
        }

        let page = Page::new(id.clone(), record_map, chunk_number as usize);
        if page.root().is_none() {
            return Err(EpcError::api(
                None,
                format!("page {id} is missing from the downloaded records"),
            ));
        }
        Ok(page)
    }

    pub async fn enqueue_export(&self, id: &PageId, format: ExportFormat) -> Result<String> {
        let request = EnqueueTaskRequest {
            task: ExportTask {
                event_name: "exportBlock".to_string(),
                request: ExportRequest {
                    block_id: id.dashed(),
                    recursive: true,
                    export_options: ExportOptions {
                        export_type: format,
                        time_zone: "America/Los_Angeles".to_string(),
                        locale: "en".to_string(),
                    },
                },
            },
        };
        let response: EnqueueTaskResponse = self.post_json("/api/v3/enqueueTask", &request).await?;
        Ok(response.task_id)
    }

    /// Poll an export task until it yields a download URL.
    pub async fn wait_for_export(&self, task_id: &str) -> Result<String> {
        let deadline = Instant::now() + self.export_timeout;
        loop {
            let request = GetTasksRequest {
                task_ids: vec![task_id.to_string()],
            };
            let response: GetTasksResponse = self.post_json("/api/v3/getTasks", &request).await?;
            let task = response
                .results
                .into_iter()
                .find(|t| t.id == task_id)
                .ok_or_else(|| EpcError::api(None, format!("export task {task_id} vanished")))?;

            match task.state.as_str() {
                "success" => {
                    return task
                        .status
                        .and_then(|s| s.export_url)
                        .ok_or_else(|| {
                            EpcError::api(None, format!("export task {task_id} has no export URL"))
                        });
                }
                "failure" => {
                    return Err(EpcError::api(
                        None,
                        format!(
                            "export task {task_id} failed: {}",
                            task.error.unwrap_or_else(|| "no error message".to_string())
                        ),
                    ));
                }
                state => {
                    let exported = task.status.and_then(|s| s.pages_exported).unwrap_or(0);
                    debug!(task = task_id, state, exported, "export in progress");
                }
            }

            if Instant::now() >= deadline {
                return Err(EpcError::ExportTimeout {
                    task_id: task_id.to_string(),
                    seconds: self.export_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn download_export(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(EpcError::Network)?;
        let status = response.status();

        if status.is_success() {
            return response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(EpcError::Network);
        }

        let body = response.text().await.unwrap_or_default();
        Err(EpcError::api(
            Some(status),
            format!(
                "failed to download export (status {}): {}",
                status.as_u16(),
                body
            ),
        ))
    }

    pub async fn export_page(&self, id: &PageId, format: ExportFormat) -> Result<Vec<u8>> {
        if self.auth.is_none() {
            return Err(EpcError::Config(
                "NOTION_TOKEN is required to export pages".to_string(),
            ));
        }
        let task_id = self.enqueue_export(id, format).await?;
        debug!(page = %id, task = %task_id, "export enqueued");
        let url = self.wait_for_export(&task_id).await?;
        self.download_export(&url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(EpcError::InvalidUrl)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut request = self.http.post(url).json(body);
        if let Some(auth) = &self.auth {
            request = auth.apply(request);
        }
        self.send_json(request).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(EpcError::Network)?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str(&body).map_err(EpcError::Serialization);
        }

        Err(EpcError::api(
            Some(status),
            error_message(status, &body, retry_after.as_deref()),
        ))
    }
}

#[async_trait]
impl PageSource for NotionClient {
    async fn fetch_export(&self, root: &PageId, format: ExportFormat) -> Result<Vec<u8>> {
        self.export_page(root, format).await
    }

    async fn fetch_page(&self, id: &PageId) -> Result<Page> {
        self.download_page(id).await
    }
}

fn error_message(status: StatusCode, body: &str, retry_after: Option<&str>) -> String {
    let fallback = format!("remote API returned status {}", status.as_u16());
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_body = parsed
        .as_ref()
        .and_then(|value| value.get("message").or_else(|| value.get("name")))
        .and_then(Value::as_str)
        .map(str::to_owned);

    match (status, retry_after, from_body) {
        (StatusCode::TOO_MANY_REQUESTS, Some(retry), Some(msg)) => {
            format!("{msg} (rate limited, retry after {retry}s)")
        }
        (StatusCode::TOO_MANY_REQUESTS, Some(retry), None) => {
            format!("rate limited, retry after {retry}s")
        }
        (_, _, Some(msg)) => msg,
        _ => fallback,
    }
}
