// Plain-text rendering for terminals.
use std::fmt;

use super::{ChartKind, ChartView, FileCard, GenericView, RenderedView};
use super::format::group_thousands;

const BAR_WIDTH: f64 = 40.0;

impl fmt::Display for RenderedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedView::Chart(chart) => fmt::Display::fmt(chart, f),
            RenderedView::FileCard(card) => fmt::Display::fmt(card, f),
            RenderedView::Generic(view) => fmt::Display::fmt(view, f),
            RenderedView::NoResults => f.write_str("No hay resultados disponibles."),
        }
    }
}

impl fmt::Display for ChartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.series_label)?;

        let label_width = self.points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
        let total: f64 = self.points.iter().map(|p| p.value.max(0.0)).sum();
        let max = self.points.iter().map(|p| p.value).fold(0.0_f64, f64::max);

        for point in &self.points {
            match self.kind {
                ChartKind::Bar => {
                    let width = if max > 0.0 {
                        ((point.value.max(0.0) / max) * BAR_WIDTH).round() as usize
                    } else {
                        0
                    };
                    writeln!(
                        f,
                        "  {:<label_width$}  {} {}",
                        point.label,
                        "#".repeat(width),
                        group_thousands(point.value),
                    )?;
                }
                ChartKind::Pie => {
                    let share = if total > 0.0 {
                        point.value.max(0.0) / total * 100.0
                    } else {
                        0.0
                    };
                    writeln!(
                        f,
                        "  {:<label_width$}  {:>6.2}%  ({})",
                        point.label,
                        share,
                        group_thousands(point.value),
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for FileCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(f, "{}: {}", row.label, row.value.as_deref().unwrap_or("n/a"))?;
        }
        Ok(())
    }
}

impl fmt::Display for GenericView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}: {}", entry.label, entry.value)?;
        }
        Ok(())
    }
}
