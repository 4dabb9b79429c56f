use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::data::{Dataset, Row};
use crate::numeric::{compare_cells, is_numeric, parse_number};
use crate::view::RowView;

/// Maximum number of rows plotted per series before striding kicks in.
pub const POINT_BUDGET: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Scatter,
    Line,
    Boxplot,
}

/// Column bindings for the chart. Columns are positions in the header list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub x_col: Option<usize>,
    pub y_col: Option<usize>,
    pub y2_col: Option<usize>,
    #[serde(default)]
    pub kind: ChartKind,
}

impl ChartConfig {
    pub fn new(kind: ChartKind, x_col: usize, y_col: usize) -> Self {
        Self { x_col: Some(x_col), y_col: Some(y_col), y2_col: None, kind }
    }

    pub fn with_y2(mut self, y2_col: usize) -> Self {
        self.y2_col = Some(y2_col);
        self
    }

    fn y_columns(&self) -> Vec<usize> {
        self.y_col.into_iter().chain(self.y2_col).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum XAxis {
    Numeric,
    /// Positions on the axis are indices into `labels`.
    Categorical { labels: Vec<String> },
}

impl XAxis {
    pub fn is_categorical(&self) -> bool {
        matches!(self, XAxis::Categorical { .. })
    }

    pub fn labels(&self) -> &[String] {
        match self {
            XAxis::Categorical { labels } => labels,
            XAxis::Numeric => &[],
        }
    }
}

/// A plotted point. `original_index` ties it back to its dataset row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
    pub original_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub column: usize,
    pub name: String,
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Samples for one category of a boxplot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub label: String,
    /// Position on the categorical axis.
    pub position: f64,
    pub samples: Vec<f64>,
    /// `None` when every value of the group was blank or non-numeric.
    pub stats: Option<BoxStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSeries {
    pub column: usize,
    pub name: String,
    pub groups: Vec<BoxGroup>,
}

/// Renderable output of chart binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub kind: ChartKind,
    pub x_col: usize,
    pub x_name: String,
    pub x_axis: XAxis,
    /// Row step used when the view exceeded the point budget (1 = every row).
    pub stride: usize,
    pub series: Vec<Series>,
    pub boxes: Vec<BoxSeries>,
}

/// Data-space extent of a plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl PlotSeries {
    pub fn points(&self) -> impl Iterator<Item = &PlotPoint> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Min/max over everything drawn. Categorical x spans every label slot.
    pub fn bounds(&self) -> Bounds {
        let mut x = MinMax::default();
        let mut y = MinMax::default();

        for p in self.points() {
            x.add(p.x);
            y.add(p.y);
        }
        for group in self.boxes.iter().flat_map(|b| b.groups.iter()) {
            for &v in &group.samples {
                y.add(v);
            }
        }

        let x = match &self.x_axis {
            XAxis::Categorical { labels } => (0.0, labels.len().saturating_sub(1) as f64),
            XAxis::Numeric => x.finish(),
        };
        Bounds { x, y: y.finish() }
    }
}

struct MinMax {
    min: f64,
    max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        Self { min: f64::INFINITY, max: f64::NEG_INFINITY }
    }
}

impl MinMax {
    fn add(&mut self, v: f64) {
        if v < self.min {
            self.min = v;
        }
        if v > self.max {
            self.max = v;
        }
    }

    fn finish(&self) -> (f64, f64) {
        if self.min > self.max {
            (0.0, 1.0)
        } else {
            (self.min, self.max)
        }
    }
}

/// Row step that keeps a view of `n` rows within `budget` while covering its full range.
pub fn downsample_stride(n: usize, budget: usize) -> usize {
    let budget = budget.max(1);
    if n > budget {
        n.div_ceil(budget)
    } else {
        1
    }
}

/// Sorted distinct labels, padded when there is a single category so it renders centered.
/// Returns the labels and the axis position of the first real category.
fn categorical_labels<'a, I>(values: I) -> (Vec<String>, usize)
where
    I: IntoIterator<Item = &'a str>,
{
    let mut labels: Vec<String> = values.into_iter().map(str::to_string).collect();
    // equal numbers spelled differently ("1", "1.0") stay separate labels
    labels.sort_by(|a, b| compare_cells(a, b).then_with(|| a.cmp(b)));
    labels.dedup();

    if labels.len() == 1 {
        let only = labels.remove(0);
        (vec![String::new(), only, " ".to_string()], 1)
    } else {
        (labels, 0)
    }
}

fn label_positions(labels: &[String], offset: usize, count: usize) -> HashMap<&str, f64> {
    labels[offset..offset + count]
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), (i + offset) as f64))
        .collect()
}

fn column_name(dataset: &Dataset, col: usize) -> String {
    dataset
        .headers()
        .get(col)
        .cloned()
        .unwrap_or_else(|| format!("#{col}"))
}

/// Bind a row view to a chart. Returns `None` when the x column or every y column is unset.
pub fn bind(dataset: &Dataset, view: &RowView, config: &ChartConfig, budget: usize) -> Option<PlotSeries> {
    let x_col = config.x_col?;
    let y_cols = config.y_columns();
    if y_cols.is_empty() {
        return None;
    }

    let series = match config.kind {
        ChartKind::Boxplot => bind_boxplot(dataset, view, x_col, &y_cols),
        ChartKind::Scatter | ChartKind::Line => {
            bind_points(dataset, view, config.kind, x_col, &y_cols, budget)
        }
    };

    debug!(
        "Bound {:?} chart: {} points, {} box series, stride {}, categorical x: {}",
        series.kind,
        series.point_count(),
        series.boxes.len(),
        series.stride,
        series.x_axis.is_categorical()
    );
    Some(series)
}

fn bind_points(
    dataset: &Dataset,
    view: &RowView,
    kind: ChartKind,
    x_col: usize,
    y_cols: &[usize],
    budget: usize,
) -> PlotSeries {
    let stride = downsample_stride(view.len(), budget);
    let sampled: Vec<&Row> = view.rows(dataset).step_by(stride).collect();
    if stride > 1 {
        trace!("Downsampled {} rows to {} (stride {})", view.len(), sampled.len(), stride);
    }

    let all_numeric = sampled.iter().all(|row| is_numeric(row.cell(x_col)));

    let (x_axis, positions) = if all_numeric {
        (XAxis::Numeric, HashMap::new())
    } else {
        let (labels, offset) = categorical_labels(sampled.iter().map(|row| row.cell(x_col)));
        let count = if offset == 0 { labels.len() } else { 1 };
        let positions: HashMap<String, f64> = label_positions(&labels, offset, count)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        (XAxis::Categorical { labels }, positions)
    };

    let series = y_cols
        .iter()
        .map(|&y_col| {
            let mut points: Vec<PlotPoint> = sampled
                .iter()
                .filter_map(|row| {
                    let y = parse_number(row.cell(y_col))?;
                    let x = if all_numeric {
                        parse_number(row.cell(x_col))?
                    } else {
                        *positions.get(row.cell(x_col))?
                    };
                    Some(PlotPoint { x, y, original_index: row.original_index })
                })
                .collect();

            if kind == ChartKind::Line {
                points.sort_by(|a, b| a.x.total_cmp(&b.x));
            }

            Series { column: y_col, name: column_name(dataset, y_col), points }
        })
        .collect();

    PlotSeries {
        kind,
        x_col,
        x_name: column_name(dataset, x_col),
        x_axis,
        stride,
        series,
        boxes: Vec::new(),
    }
}

fn bind_boxplot(dataset: &Dataset, view: &RowView, x_col: usize, y_cols: &[usize]) -> PlotSeries {
    let rows: Vec<&Row> = view.rows(dataset).collect();
    let (labels, offset) = categorical_labels(rows.iter().map(|row| row.cell(x_col)));
    let count = if offset == 0 { labels.len() } else { 1 };

    let boxes = y_cols
        .iter()
        .map(|&y_col| {
            let mut samples: HashMap<&str, Vec<f64>> = HashMap::new();
            for row in &rows {
                let entry = samples.entry(row.cell(x_col)).or_default();
                if let Some(v) = parse_number(row.cell(y_col)) {
                    entry.push(v);
                }
            }

            let groups = labels[offset..offset + count]
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let values = samples.remove(label.as_str()).unwrap_or_default();
                    BoxGroup {
                        label: label.clone(),
                        position: (i + offset) as f64,
                        stats: box_stats(&values),
                        samples: values,
                    }
                })
                .collect();

            BoxSeries { column: y_col, name: column_name(dataset, y_col), groups }
        })
        .collect();

    PlotSeries {
        kind: ChartKind::Boxplot,
        x_col,
        x_name: column_name(dataset, x_col),
        x_axis: XAxis::Categorical { labels },
        stride: 1,
        series: Vec::new(),
        boxes,
    }
}

/// Quartiles with 1.5 IQR whiskers. `None` for an empty sample.
pub fn box_stats(samples: &[f64]) -> Option<BoxStats> {
    if samples.is_empty() {
        return None;
    }
    let mut ys = samples.to_vec();
    ys.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&ys, 0.25);
    let median = percentile(&ys, 0.50);
    let q3 = percentile(&ys, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // ys is sorted, so the first/last in-fence values are the whisker ends
    let lower_whisker = ys.iter().copied().find(|&v| v >= lower_fence).unwrap_or(q1);
    let upper_whisker = ys.iter().rev().copied().find(|&v| v <= upper_fence).unwrap_or(q3);
    let outliers = ys
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();

    Some(BoxStats { lower_whisker, q1, median, q3, upper_whisker, outliers })
}

fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted_data[0];
    }

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}
