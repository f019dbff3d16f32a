use bytes::Bytes;
use std::path::Path;

/// A file picked for upload, held in memory.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub contents: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(name, contents))
    }

    /// Lower-cased extension with its leading dot, taken after the last `.`.
    /// `None` when the name has no dot at all.
    pub fn extension(&self) -> Option<String> {
        let (_, last) = self.name.rsplit_once('.')?;
        Some(format!(".{}", last.to_lowercase()))
    }

    pub fn size(&self) -> usize {
        self.contents.len()
    }
}

/// Form state behind an upload: every field may still be unset when the user hits submit.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadFile>,
    pub strain_id: Option<i64>,
    pub analysis_type: String,
}

impl UploadRequest {
    pub fn new(file: UploadFile, strain_id: i64, analysis_type: impl Into<String>) -> Self {
        Self {
            file: Some(file),
            strain_id: Some(strain_id),
            analysis_type: analysis_type.into(),
        }
    }
}
