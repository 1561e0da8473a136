//! Chart rendering with plotters.

use super::{data_ranges, Series};
use crate::config::PlotConfig;
use crate::error::PlotError;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::element::DashedPathElement;
use plotters::series::DashedLineSeries;
use std::path::Path;
use tracing::info;

/// Line colors, one per distinct hue value (cycled).
const PALETTE: [RGBColor; 10] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
    RGBColor(218, 139, 195),
    RGBColor(140, 140, 140),
    RGBColor(204, 185, 116),
    RGBColor(100, 181, 205),
];

/// Dash pattern, one per distinct style value (cycled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dash {
    Solid,
    /// Dash length and gap in pixels.
    Dashed(i32, i32),
}

const DASHES: [Dash; 4] = [
    Dash::Solid,
    Dash::Dashed(12, 6),
    Dash::Dashed(3, 5),
    Dash::Dashed(24, 8),
];

/// Length of the line drawn next to each legend label, in pixels.
const LEGEND_SAMPLE: i32 = 40;

fn color_for(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

fn dash_for(index: usize) -> Dash {
    DASHES[index % DASHES.len()]
}

fn render_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

/// Render `series` to `plot.output`; the file extension selects PNG or SVG.
pub fn render(series: &[Series], plot: &PlotConfig) -> Result<(), PlotError> {
    let ext = plot
        .output
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ext != "png" && ext != "svg" {
        return Err(PlotError::UnsupportedFormat(ext));
    }
    if data_ranges(series).is_none() {
        return Err(PlotError::NoData);
    }

    let size = (plot.width, plot.height);
    let path: &Path = &plot.output;
    if ext == "svg" {
        draw(SVGBackend::new(path, size).into_drawing_area(), series, plot)?;
    } else {
        draw(BitMapBackend::new(path, size).into_drawing_area(), series, plot)?;
    }

    info!("Chart written to {}", path.display());
    Ok(())
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    series: &[Series],
    plot: &PlotConfig,
) -> Result<(), PlotError> {
    let (x_range, y_range) = data_ranges(series).ok_or(PlotError::NoData)?;

    root.fill(&WHITE).map_err(render_err)?;

    let mut builder = ChartBuilder::on(&root);
    builder
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70);
    if let Some(ref title) = plot.title {
        builder.caption(title, ("sans-serif", 22));
    }

    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.effective_y_label())
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(render_err)?;

    for line in series {
        let style = color_for(line.hue_index).stroke_width(2);
        let points = line.points.clone();

        match dash_for(line.style_index) {
            Dash::Solid => {
                chart
                    .draw_series(LineSeries::new(points, style))
                    .map_err(render_err)?
                    .label(line.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + LEGEND_SAMPLE, y)], style)
                    });
            }
            Dash::Dashed(size, spacing) => {
                chart
                    .draw_series(DashedLineSeries::new(points, size, spacing, style))
                    .map_err(render_err)?
                    .label(line.label.as_str())
                    .legend(move |(x, y)| {
                        DashedPathElement::new(
                            vec![(x, y), (x + LEGEND_SAMPLE, y)],
                            size,
                            spacing,
                            style,
                        )
                    });
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .legend_area_size(LEGEND_SAMPLE + 10)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}
