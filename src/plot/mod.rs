//! Line charts of aggregated fitness statistics.
//!
//! The aggregated table is split into one [`Series`] per distinct
//! (hue, style) pair, which the renderer draws with plotters.

pub mod renderer;
pub mod viewer;

pub use renderer::render;
pub use viewer::open_blocking;

use crate::config::PlotConfig;
use crate::error::PlotError;
use crate::models::{AggregatedRow, AggregatedTable, KeyValue};
use std::collections::BTreeMap;
use std::ops::Range;

/// One line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub hue: Option<KeyValue>,
    pub style: Option<KeyValue>,
    /// Position of `hue` among the distinct hue values; picks the color.
    pub hue_index: usize,
    /// Position of `style` among the distinct style values; picks the dash pattern.
    pub style_index: usize,
    /// Points sorted by x.
    pub points: Vec<(f64, f64)>,
    pub label: String,
}

/// A table column usable as a chart axis.
#[derive(Debug, Clone, Copy)]
enum Axis {
    Key(usize),
    Value(usize),
}

impl Axis {
    fn resolve(table: &AggregatedTable, name: &str) -> Result<Self, PlotError> {
        table
            .key_index(name)
            .map(Axis::Key)
            .or_else(|| table.value_index(name).map(Axis::Value))
            .ok_or_else(|| PlotError::UnknownColumn(name.to_string()))
    }

    fn value(&self, row: &AggregatedRow, name: &str) -> Result<f64, PlotError> {
        match self {
            Axis::Value(i) => Ok(row.values[*i]),
            Axis::Key(i) => row.key[*i]
                .as_f64()
                .ok_or_else(|| PlotError::NonNumericAxis {
                    column: name.to_string(),
                    value: row.key[*i].to_string(),
                }),
        }
    }
}

fn key_column(table: &AggregatedTable, name: Option<&str>) -> Result<Option<usize>, PlotError> {
    name.map(|n| {
        table
            .key_index(n)
            .ok_or_else(|| PlotError::UnknownColumn(n.to_string()))
    })
    .transpose()
}

/// Split the table into one series per distinct (hue, style) pair.
pub fn build_series(table: &AggregatedTable, plot: &PlotConfig) -> Result<Vec<Series>, PlotError> {
    let x_axis = Axis::resolve(table, &plot.x)?;
    let y_axis = Axis::resolve(table, &plot.y)?;
    let hue = key_column(table, plot.hue.as_deref())?;
    let style = key_column(table, plot.style.as_deref())?;

    let mut lines: BTreeMap<(Option<KeyValue>, Option<KeyValue>), Vec<(f64, f64)>> =
        BTreeMap::new();
    for row in &table.rows {
        let x = x_axis.value(row, &plot.x)?;
        let y = y_axis.value(row, &plot.y)?;
        let key = (
            hue.map(|i| row.key[i].clone()),
            style.map(|i| row.key[i].clone()),
        );
        lines.entry(key).or_default().push((x, y));
    }

    let hues = distinct(lines.keys().map(|(h, _)| h.clone()));
    let styles = distinct(lines.keys().map(|(_, s)| s.clone()));

    Ok(lines
        .into_iter()
        .map(|((h, s), points)| {
            let points = mean_per_x(points);
            let label = series_label(plot, h.as_ref(), s.as_ref());
            Series {
                hue_index: hues.iter().position(|v| *v == h).unwrap_or(0),
                style_index: styles.iter().position(|v| *v == s).unwrap_or(0),
                hue: h,
                style: s,
                points,
                label,
            }
        })
        .collect())
}

/// Sort by x and replace points sharing an x with their mean y.
///
/// Key columns not covered by hue or style (e.g. `run`) leave several rows
/// per x in one line.
fn mean_per_x(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64, usize)> = Vec::with_capacity(points.len());
    for (x, y) in points {
        match merged.last_mut() {
            Some((last_x, sum, count)) if *last_x == x => {
                *sum += y;
                *count += 1;
            }
            _ => merged.push((x, y, 1)),
        }
    }

    merged
        .into_iter()
        .map(|(x, sum, count)| (x, sum / count as f64))
        .collect()
}

fn distinct<T: Ord>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut values: Vec<T> = values.collect();
    values.sort();
    values.dedup();
    values
}

/// Legend text, e.g. `mprob=0.3, mcauchy=true`.
fn series_label(plot: &PlotConfig, hue: Option<&KeyValue>, style: Option<&KeyValue>) -> String {
    let mut parts = Vec::new();
    if let (Some(column), Some(value)) = (plot.hue.as_deref(), hue) {
        parts.push(format!("{}={}", column, value));
    }
    if let (Some(column), Some(value)) = (plot.style.as_deref(), style) {
        parts.push(format!("{}={}", column, value));
    }
    if parts.is_empty() {
        plot.y.clone()
    } else {
        parts.join(", ")
    }
}

/// Axis ranges covering every point, with some headroom on y.
pub fn data_ranges(series: &[Series]) -> Option<(Range<f64>, Range<f64>)> {
    let mut points = series.iter().flat_map(|s| s.points.iter());
    let &(x0, y0) = points.next()?;

    let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if x_max <= x_min {
        x_min -= 0.5;
        x_max += 0.5;
    }

    let pad = if y_max > y_min {
        (y_max - y_min) * 0.05
    } else {
        (y_max.abs() * 0.05).max(1.0)
    };

    Some((x_min..x_max, (y_min - pad)..(y_max + pad)))
}
