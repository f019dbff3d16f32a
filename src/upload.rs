use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::UploadConfig;
use crate::errors::{GenolabError, GenolabResult, ValidationError};
use crate::models::{AnalysisType, SubmitOutcome, TaskHandle, UploadFile, UploadRequest};
use crate::services::ApiClient;

// Answer to a `raw` upload: the file is stored synchronously
#[derive(Debug, Deserialize)]
struct StoredUploadResponse {
    #[serde(default)]
    file_url: Option<String>,
    #[serde(default)]
    analysis_id: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

// Answer to every other analysis type: a queued job
#[derive(Debug, Deserialize)]
struct QueuedUploadResponse {
    task_id: String,
    #[serde(default)]
    message: Option<String>,
}

/// Validated upload, ready to go on the wire.
#[derive(Debug)]
pub struct ValidatedUpload<'a> {
    pub file: &'a UploadFile,
    pub strain_id: i64,
    pub analysis_type: AnalysisType,
}

/// Packages a file plus its metadata into one multipart POST.
#[derive(Clone, Debug)]
pub struct UploadSubmitter {
    client: ApiClient,
    config: UploadConfig,
}

impl UploadSubmitter {
    pub fn new(client: ApiClient, config: UploadConfig) -> Self {
        Self { client, config }
    }

    /// Checks every precondition that can be checked without the server.
    pub fn validate<'a>(&self, request: &'a UploadRequest) -> Result<ValidatedUpload<'a>, ValidationError> {
        let file = request.file.as_ref().ok_or(ValidationError::MissingFile)?;

        let strain_id = request
            .strain_id
            .filter(|id| *id > 0)
            .ok_or(ValidationError::MissingStrain)?;

        if request.analysis_type.trim().is_empty() {
            return Err(ValidationError::MissingAnalysisType);
        }

        if file.name.trim().is_empty() {
            return Err(ValidationError::MissingFileName);
        }

        // a name without a dot has no extension and never matches the allow-list
        let allowed = file.extension().is_some_and(|extension| {
            self.config
                .allowed_extensions
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(&extension))
        });
        if !allowed {
            return Err(ValidationError::DisallowedExtension {
                filename: file.name.clone(),
                allowed: self.config.allowed_extensions.join(", "),
            });
        }

        if file.size() == 0 {
            return Err(ValidationError::EmptyFile(file.name.clone()));
        }

        if file.size() > self.config.max_file_size {
            return Err(ValidationError::FileTooLarge {
                filename: file.name.clone(),
                size: file.size(),
                max: self.config.max_file_size,
            });
        }

        let analysis_type = AnalysisType::from(request.analysis_type.trim());

        Ok(ValidatedUpload {
            file,
            strain_id,
            analysis_type,
        })
    }

    /// Validates, then issues exactly one POST. Never retries.
    pub async fn submit(&self, request: &UploadRequest) -> GenolabResult<SubmitOutcome> {
        let upload = self.validate(request).map_err(|e| {
            tracing::warn!("Upload rejected before submission: {}", e);
            GenolabError::Validation(e)
        })?;

        tracing::info!(
            "Uploading {} ({} bytes) for strain {} as {}",
            upload.file.name,
            upload.file.size(),
            upload.strain_id,
            upload.analysis_type
        );

        let path = format!(
            "/api/analysis/upload/{}",
            urlencoding::encode(upload.analysis_type.as_str())
        );
        let form = build_form(upload.file, upload.strain_id);

        if upload.analysis_type.is_raw() {
            let stored: StoredUploadResponse = self
                .client
                .post_multipart(&path, form)
                .await
                .map_err(GenolabError::submission)?;
            tracing::info!(
                "File stored at {} (analysis {:?})",
                stored.file_url.as_deref().unwrap_or("n/a"),
                stored.analysis_id
            );
            Ok(SubmitOutcome::Stored {
                file_url: stored.file_url,
                analysis_id: stored.analysis_id,
                message: stored.message,
            })
        } else {
            let queued: QueuedUploadResponse = self
                .client
                .post_multipart(&path, form)
                .await
                .map_err(GenolabError::submission)?;
            tracing::info!("Analysis queued as task {}", queued.task_id);
            Ok(SubmitOutcome::Task {
                handle: TaskHandle::new(queued.task_id),
                message: queued.message,
            })
        }
    }
}

fn build_form(file: &UploadFile, strain_id: i64) -> Form {
    let part = Part::bytes(file.contents.to_vec()).file_name(file.name.clone());
    Form::new()
        .text("strain_id", strain_id.to_string())
        .part("file", part)
}
