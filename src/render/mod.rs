//! Turns a finished analysis payload into something a view can show.
//!
//! Rendering is a pure function of `(analysis_type, result)`: recognized payload shapes get
//! a chart or a file card, everything else degrades to a generic key-value listing. It never
//! fails.

pub mod format;
pub mod output;
pub mod svg;
mod text;

use serde_json::{Map, Value};

use crate::models::AnalysisType;
use output::{AnalysisOutput, GcContent};

pub use format::DisplayValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub kind: ChartKind,
    pub title: String,
    pub series_label: String,
    pub points: Vec<DataPoint>,
}

/// One line of the stored-file card; `None` shows as "n/a".
#[derive(Debug, Clone, PartialEq)]
pub struct CardRow {
    pub label: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileCard {
    pub rows: Vec<CardRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericEntry {
    pub key: String,
    pub label: String,
    pub value: DisplayValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericView {
    pub entries: Vec<GenericEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedView {
    Chart(ChartView),
    FileCard(FileCard),
    Generic(GenericView),
    NoResults,
}

impl RenderedView {
    pub fn as_chart(&self) -> Option<&ChartView> {
        match self {
            RenderedView::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericView> {
        match self {
            RenderedView::Generic(view) => Some(view),
            _ => None,
        }
    }
}

impl GenericView {
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let entries = fields
            .iter()
            .map(|(key, value)| GenericEntry {
                key: key.clone(),
                label: format::humanize_label(key),
                value: format::format_value(key, value),
            })
            .collect();
        Self { entries }
    }

    pub fn entry(&self, key: &str) -> Option<&GenericEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

/// Renders a successful result payload for `analysis_type`.
pub fn render(analysis_type: &str, result: &Value) -> RenderedView {
    let fields = match result {
        Value::Null => return RenderedView::NoResults,
        Value::Object(fields) => fields,
        other => {
            let mut single = Map::new();
            single.insert("result".to_string(), other.clone());
            return RenderedView::Generic(GenericView::from_fields(&single));
        }
    };

    let kind = AnalysisType::from(analysis_type);
    let view = match AnalysisOutput::parse(&kind, fields) {
        AnalysisOutput::FastaCount { sequence_count } => bar_chart(
            "Conteo de Secuencias FASTA",
            "Número de Secuencias",
            vec![point("Secuencias", sequence_count)],
        ),
        AnalysisOutput::GcContent(GcContent::PerSequence(values)) => bar_chart(
            "GC Content por Secuencia",
            "GC Content (%)",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| point(&format!("Seq {}", i + 1), *v))
                .collect(),
        ),
        AnalysisOutput::GcContent(GcContent::Average(average)) => bar_chart(
            "GC Content Promedio",
            "GC Content (%)",
            vec![point("GC Promedio", average)],
        ),
        AnalysisOutput::GffStats { feature_counts } => RenderedView::Chart(ChartView {
            kind: ChartKind::Pie,
            title: "Distribución de Features GFF".to_string(),
            series_label: "Cantidad".to_string(),
            points: feature_counts
                .into_iter()
                .map(|(label, value)| DataPoint { label, value })
                .collect(),
        }),
        AnalysisOutput::FastqStats {
            avg_sequence_length,
            overall_avg_quality,
        } => bar_chart(
            "Estadísticas FASTQ",
            "Valores",
            present_points(&[
                ("Longitud Promedio", avg_sequence_length),
                ("Calidad Promedio", overall_avg_quality),
            ]),
        ),
        AnalysisOutput::GenbankStats {
            sequence_length,
            feature_count,
        } => bar_chart(
            "Estadísticas GenBank",
            "Valores",
            present_points(&[
                ("Longitud Secuencia", sequence_length),
                ("Cantidad de Features", feature_count),
            ]),
        ),
        AnalysisOutput::RawFile {
            filename,
            file_size,
            upload_status,
            message,
        } => RenderedView::FileCard(FileCard {
            rows: vec![
                card_row("Tipo de archivo", filename),
                card_row("Tamaño", file_size.map(|size| format!("{} bytes", size))),
                card_row(
                    "Estado",
                    upload_status.map(|status| match status.as_str() {
                        "completed" => "Completado".to_string(),
                        _ => status,
                    }),
                ),
                card_row("Descripción", message),
            ],
        }),
        AnalysisOutput::Unrecognized => RenderedView::Generic(GenericView::from_fields(fields)),
    };

    tracing::debug!("Rendered {} result as {}", analysis_type, view_name(&view));
    view
}

fn view_name(view: &RenderedView) -> &'static str {
    match view {
        RenderedView::Chart(ChartView { kind: ChartKind::Bar, .. }) => "bar chart",
        RenderedView::Chart(ChartView { kind: ChartKind::Pie, .. }) => "pie chart",
        RenderedView::FileCard(_) => "file card",
        RenderedView::Generic(_) => "generic listing",
        RenderedView::NoResults => "empty view",
    }
}

fn bar_chart(title: &str, series_label: &str, points: Vec<DataPoint>) -> RenderedView {
    RenderedView::Chart(ChartView {
        kind: ChartKind::Bar,
        title: title.to_string(),
        series_label: series_label.to_string(),
        points,
    })
}

fn point(label: &str, value: f64) -> DataPoint {
    DataPoint {
        label: label.to_string(),
        value,
    }
}

fn present_points(candidates: &[(&str, Option<f64>)]) -> Vec<DataPoint> {
    candidates
        .iter()
        .filter_map(|(label, value)| value.map(|v| point(label, v)))
        .collect()
}

fn card_row(label: &str, value: Option<String>) -> CardRow {
    CardRow {
        label: label.to_string(),
        value,
    }
}
