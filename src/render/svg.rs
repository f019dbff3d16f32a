use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::path::Path;

use super::{ChartKind, ChartView};
use crate::errors::{GenolabError, GenolabResult};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 480;

const PALETTE: [RGBColor; 6] = [
    RGBColor(255, 99, 132),
    RGBColor(54, 162, 235),
    RGBColor(255, 205, 86),
    RGBColor(75, 192, 192),
    RGBColor(153, 102, 255),
    RGBColor(255, 159, 64),
];

fn chart_err<E: std::fmt::Display>(err: E) -> GenolabError {
    GenolabError::ChartExport(err.to_string())
}

/// Renders a chart view to an SVG document.
pub fn chart_to_svg(chart: &ChartView) -> GenolabResult<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;
        match chart.kind {
            ChartKind::Bar => draw_bars(&root, chart)?,
            ChartKind::Pie => draw_pie(&root, chart)?,
        }
        root.present().map_err(chart_err)?;
    }
    Ok(svg)
}

/// Writes a chart view as an SVG file.
pub async fn write_chart(chart: &ChartView, path: &Path) -> GenolabResult<()> {
    let svg = chart_to_svg(chart)?;
    tokio::fs::write(path, svg).await?;
    tracing::info!("Chart \"{}\" written to {}", chart.title, path.display());
    Ok(())
}

fn draw_bars(root: &DrawingArea<SVGBackend<'_>, Shift>, chart: &ChartView) -> GenolabResult<()> {
    let count = chart.points.len().max(1);
    let max = chart.points.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    let y_max = if max > 0.0 { max * 1.15 } else { 1.0 };
    let labels: Vec<&str> = chart.points.iter().map(|p| p.label.as_str()).collect();

    let mut ctx = ChartBuilder::on(root)
        .caption(&chart.title, ("sans-serif", 22).into_font())
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(64)
        .build_cartesian_2d((0..count).into_segmented(), 0f64..y_max)
        .map_err(chart_err)?;

    let label_of = |v: &SegmentValue<usize>| match v {
        SegmentValue::CenterOf(i) => labels.get(*i).map(|s| s.to_string()).unwrap_or_default(),
        _ => String::new(),
    };
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(count)
        .x_label_formatter(&label_of)
        .y_desc(chart.series_label.as_str())
        .draw()
        .map_err(chart_err)?;

    let fill = PALETTE[3].mix(0.5).filled();
    ctx.draw_series(chart.points.iter().enumerate().map(|(i, p)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), p.value.max(0.0))],
            fill,
        );
        bar.set_margin(0, 0, 12, 12);
        bar
    }))
    .map_err(chart_err)?;

    ctx.draw_series(chart.points.iter().enumerate().map(|(i, p)| {
        Text::new(
            super::format::group_thousands(p.value),
            (SegmentValue::CenterOf(i), p.value.max(0.0)),
            ("sans-serif", 14).into_font(),
        )
    }))
    .map_err(chart_err)?;

    Ok(())
}

fn draw_pie(root: &DrawingArea<SVGBackend<'_>, Shift>, chart: &ChartView) -> GenolabResult<()> {
    let area = root
        .titled(&chart.title, ("sans-serif", 22).into_font())
        .map_err(chart_err)?;
    let (width, height) = area.dim_in_pixel();
    let center = ((width as f64 * 0.35), (height as f64 / 2.0));
    let radius = (height.min(width) as f64 / 2.0 - 20.0).max(10.0);

    let total: f64 = chart.points.iter().map(|p| p.value.max(0.0)).sum();
    let mut start = -PI / 2.0;

    for (i, point) in chart.points.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let share = if total > 0.0 { point.value.max(0.0) / total } else { 0.0 };

        if share > 0.0 {
            let sweep = share * 2.0 * PI;
            let steps = ((share * 120.0).ceil() as usize).max(2);
            let mut wedge = vec![(center.0 as i32, center.1 as i32)];
            for step in 0..=steps {
                let angle = start + sweep * step as f64 / steps as f64;
                wedge.push((
                    (center.0 + radius * angle.cos()) as i32,
                    (center.1 + radius * angle.sin()) as i32,
                ));
            }
            area.draw(&Polygon::new(wedge, color.mix(0.6).filled()))
                .map_err(chart_err)?;
            start += sweep;
        }

        let legend_y = 30 + i as i32 * 24;
        let legend_x = (width as f64 * 0.72) as i32;
        area.draw(&Rectangle::new(
            [(legend_x, legend_y), (legend_x + 14, legend_y + 14)],
            color.filled(),
        ))
        .map_err(chart_err)?;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", point.label, share * 100.0),
            (legend_x + 22, legend_y),
            ("sans-serif", 14).into_font(),
        ))
        .map_err(chart_err)?;
    }

    Ok(())
}
