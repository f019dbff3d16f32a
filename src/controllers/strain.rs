use std::path::{Path, PathBuf};

use crate::errors::GenolabResult;
use crate::models::{AnalysisRecord, Strain};
use crate::render::{render, RenderedView};
use crate::services::{ApiClient, CepariumService};

/// A stored analysis together with its rendering.
#[derive(Debug, Clone)]
pub struct AnalysisEntry {
    pub record: AnalysisRecord,
    pub view: RenderedView,
}

/// Controller behind a strain's analysis history.
#[derive(Clone, Debug)]
pub struct StrainAnalysesView {
    client: ApiClient,
    ceparium: CepariumService,
}

impl StrainAnalysesView {
    pub fn new(client: ApiClient) -> Self {
        Self {
            ceparium: CepariumService::new(client.clone()),
            client,
        }
    }

    pub async fn strain(&self, strain_id: i64) -> GenolabResult<Strain> {
        Ok(self.ceparium.get_strain(strain_id).await?)
    }

    /// Fetches every analysis of `strain_id`, newest first, each rendered.
    pub async fn load(&self, strain_id: i64) -> GenolabResult<Vec<AnalysisEntry>> {
        let mut records = self.client.analyses_for_strain(strain_id).await.map_err(|e| {
            tracing::error!("Failed to load analyses for strain {}: {}", strain_id, e);
            e
        })?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        tracing::info!("Loaded {} analyses for strain {}", records.len(), strain_id);

        Ok(records
            .into_iter()
            .map(|record| AnalysisEntry {
                view: render(&record.analysis_type, &record.results),
                record,
            })
            .collect())
    }

    pub async fn download_results(&self, analysis_id: i64, dir: &Path) -> GenolabResult<PathBuf> {
        self.client.download_results_txt(analysis_id, dir).await
    }

    pub async fn download_original(&self, analysis_id: i64, dir: &Path) -> GenolabResult<PathBuf> {
        self.client.download_original(analysis_id, dir).await
    }
}
