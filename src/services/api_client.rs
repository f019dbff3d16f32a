use futures::StreamExt;
use reqwest::{header, multipart::Form, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::config::ApiConfig;
use crate::errors::{ApiError, GenolabResult};
use crate::models::{AnalysisRecord, TaskHandle, TaskStatus};

/// Outbound calls to the GenoLab backend. Cheap to clone; the underlying connection
/// pool is shared.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // Single exit point for every request: logs the exchange and turns non-2xx answers
    // into ApiError::Status with the server's detail.
    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder
            .build()
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!("Request: {} {}", method, url);

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::error!("Request error: {} {}: {}", method, url, e);
            ApiError::from_reqwest(e, self.timeout_secs)
        })?;

        let status = response.status();
        tracing::debug!("Response: {} {}", status.as_u16(), url);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body);
        match status.as_u16() {
            401 => tracing::warn!("Session expired for {}", url),
            403 => tracing::warn!("Access denied for {}", url),
            code if code >= 500 => tracing::error!("Server error {} for {}: {}", code, url, body),
            code => tracing::warn!("Request {} {} rejected with {}: {}", method, url, code, body),
        }

        Err(ApiError::Status {
            status: status.as_u16(),
            detail,
        })
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, path)).await?;
        self.decode(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::POST, path).json(body)).await?;
        self.decode(response).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::PUT, path).json(body)).await?;
        self.decode(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::DELETE, path)).await?;
        self.decode(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::POST, path).multipart(form))
            .await?;
        self.decode(response).await
    }

    pub async fn task_status(&self, handle: &TaskHandle) -> Result<TaskStatus, ApiError> {
        let path = format!(
            "/api/analysis/tasks/{}",
            urlencoding::encode(handle.as_str())
        );
        self.get_json(&path).await
    }

    pub async fn analyses_for_strain(&self, strain_id: i64) -> Result<Vec<AnalysisRecord>, ApiError> {
        self.get_json(&format!("/api/analysis/strain/{}", strain_id))
            .await
    }

    /// Plain-text export of an analysis' results, saved into `dir`.
    pub async fn download_results_txt(&self, analysis_id: i64, dir: &Path) -> GenolabResult<PathBuf> {
        self.download(
            &format!("/api/analysis/{}/results/download-txt", analysis_id),
            dir,
            &format!("analysis_results_{}.txt", analysis_id),
        )
        .await
    }

    /// The originally uploaded file behind an analysis, saved into `dir`.
    pub async fn download_original(&self, analysis_id: i64, dir: &Path) -> GenolabResult<PathBuf> {
        self.download(
            &format!("/api/analysis/{}/download", analysis_id),
            dir,
            &format!("analysis_{}", analysis_id),
        )
        .await
    }

    // Streams the body chunk by chunk to disk instead of buffering it.
    async fn download(&self, path: &str, dir: &Path, default_name: &str) -> GenolabResult<PathBuf> {
        tracing::info!("Starting download: {}", path);
        let response = self.send(self.request(Method::GET, path)).await?;

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| default_name.to_string());
        let target = dir.join(filename);

        let mut file = tokio::fs::File::create(&target).await.map_err(|e| {
            tracing::error!("Failed to create {}: {}", target.display(), e);
            e
        })?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!("Saved {} ({} bytes)", target.display(), written);
        Ok(target)
    }
}

// FastAPI-style error bodies: {"detail": "..."} or {"detail": [...validation errors...]}
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn filename_from_disposition(value: &str) -> Option<String> {
    let raw = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    // never let the server pick a directory
    Path::new(raw)
        .file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
