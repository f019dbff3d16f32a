use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Server-side processing algorithm selected for an upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisType {
    /// Plain storage upload, answered synchronously.
    Raw,
    FastaCount,
    FastaGcContent,
    FastqStats,
    GenbankStats,
    GffStats,
    Other(String),
}

impl AnalysisType {
    pub fn as_str(&self) -> &str {
        match self {
            AnalysisType::Raw => "raw",
            AnalysisType::FastaCount => "fasta_count",
            AnalysisType::FastaGcContent => "fasta_gc_content",
            AnalysisType::FastqStats => "fastq_stats",
            AnalysisType::GenbankStats => "genbank_stats",
            AnalysisType::GffStats => "gff_stats",
            AnalysisType::Other(name) => name,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, AnalysisType::Raw)
    }
}

impl From<&str> for AnalysisType {
    fn from(s: &str) -> Self {
        match s {
            // stored records of raw uploads carry "raw_file"
            "raw" | "raw_file" => AnalysisType::Raw,
            "fasta_count" => AnalysisType::FastaCount,
            "fasta_gc_content" => AnalysisType::FastaGcContent,
            "fastq_stats" => AnalysisType::FastqStats,
            "genbank_stats" => AnalysisType::GenbankStats,
            "gff_stats" => AnalysisType::GffStats,
            other => AnalysisType::Other(other.to_string()),
        }
    }
}

impl FromStr for AnalysisType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AnalysisType::from(s))
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted analysis, created server-side and read-only here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub id: i64,
    pub analysis_type: String,
    #[serde(default)]
    pub results: Value,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub strain_id: i64,
    pub owner_id: i64,
}

// The backend emits naive timestamps (no offset) for UTC values; accept both forms.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
