use serde_json::{Map, Value};

use crate::models::AnalysisType;

#[derive(Debug, Clone, PartialEq)]
pub enum GcContent {
    PerSequence(Vec<f64>),
    Average(f64),
}

/// A result payload matched against the shape its analysis type is known to produce.
/// Shapes that do not match end up as `Unrecognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutput {
    FastaCount {
        sequence_count: f64,
    },
    GcContent(GcContent),
    GffStats {
        feature_counts: Vec<(String, f64)>,
    },
    FastqStats {
        avg_sequence_length: Option<f64>,
        overall_avg_quality: Option<f64>,
    },
    GenbankStats {
        sequence_length: Option<f64>,
        feature_count: Option<f64>,
    },
    RawFile {
        filename: Option<String>,
        file_size: Option<String>,
        upload_status: Option<String>,
        message: Option<String>,
    },
    Unrecognized,
}

impl AnalysisOutput {
    pub fn parse(kind: &AnalysisType, fields: &Map<String, Value>) -> Self {
        let parsed = match kind {
            AnalysisType::FastaCount => number(fields, "sequence_count")
                .map(|sequence_count| AnalysisOutput::FastaCount { sequence_count }),
            AnalysisType::FastaGcContent => gc_content(fields).map(AnalysisOutput::GcContent),
            AnalysisType::GffStats => feature_counts(fields)
                .map(|feature_counts| AnalysisOutput::GffStats { feature_counts }),
            AnalysisType::FastqStats => {
                let avg_sequence_length = number(fields, "avg_sequence_length");
                let overall_avg_quality = number(fields, "overall_avg_quality");
                (avg_sequence_length.is_some() || overall_avg_quality.is_some()).then_some(
                    AnalysisOutput::FastqStats {
                        avg_sequence_length,
                        overall_avg_quality,
                    },
                )
            }
            AnalysisType::GenbankStats => {
                let sequence_length = number(fields, "sequence_length");
                let feature_count = number(fields, "feature_count");
                (sequence_length.is_some() || feature_count.is_some()).then_some(
                    AnalysisOutput::GenbankStats {
                        sequence_length,
                        feature_count,
                    },
                )
            }
            AnalysisType::Raw => Some(AnalysisOutput::RawFile {
                filename: truthy_text(fields.get("filename")),
                file_size: truthy_text(fields.get("file_size")),
                upload_status: truthy_text(fields.get("upload_status")),
                message: truthy_text(fields.get("message")),
            }),
            AnalysisType::Other(_) => None,
        };

        parsed.unwrap_or_else(|| {
            if !matches!(kind, AnalysisType::Other(_)) {
                tracing::debug!("{} payload does not have the expected shape", kind);
            }
            AnalysisOutput::Unrecognized
        })
    }
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

// Per-sequence values win over the aggregate when both are present.
fn gc_content(fields: &Map<String, Value>) -> Option<GcContent> {
    let per_sequence = fields
        .get("individual_gc_contents")
        .and_then(Value::as_array)
        .filter(|values| !values.is_empty())
        .and_then(|values| values.iter().map(Value::as_f64).collect::<Option<Vec<_>>>());

    per_sequence
        .map(GcContent::PerSequence)
        .or_else(|| number(fields, "average_gc_content").map(GcContent::Average))
}

// Counts sent as strings are parsed; anything unparseable counts as zero.
fn feature_counts(fields: &Map<String, Value>) -> Option<Vec<(String, f64)>> {
    let counts = fields.get("feature_counts")?.as_object()?;
    if counts.is_empty() {
        return None;
    }
    Some(
        counts
            .iter()
            .map(|(feature, count)| {
                let value = match count {
                    Value::Number(n) => n.as_f64().unwrap_or(0.0),
                    Value::String(s) => s.trim().parse::<i64>().map(|v| v as f64).unwrap_or(0.0),
                    _ => 0.0,
                };
                (feature.clone(), value)
            })
            .collect(),
    )
}

// Empty strings, zero, false and null all count as "not provided".
fn truthy_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(_) | Value::Object(_) => value.map(Value::to_string),
        _ => None,
    }
}
