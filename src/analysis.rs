//! Column ranking and simple aggregation.
//!
//! Ranking columns against a target is normally delegated to an external
//! advanced-analysis service behind [`ColumnRanker`]; the engine only consumes the
//! ranking to reorder the selectable columns. [`PearsonRanker`] is an in-process
//! ranker for when no service is configured.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Dataset;
use crate::error::Result;
use crate::numeric::parse_number;
use crate::view::RowView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScore {
    pub column: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingAlgorithm {
    #[default]
    Correlation,
    MutualInformation,
    FeatureImportance,
}

/// Boundary to the advanced-analysis collaborator.
pub trait ColumnRanker {
    fn rank(&self, target: &str, algorithm: RankingAlgorithm) -> Result<Vec<ColumnScore>>;
}

/// An entry of the column picker after ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChoice {
    pub index: usize,
    pub name: String,
    pub score: Option<f64>,
    pub is_target: bool,
}

/// Target first, then ranked columns by descending score, then the rest in header order.
pub fn order_columns(headers: &[String], target: &str, ranking: &[ColumnScore]) -> Vec<ColumnChoice> {
    let score_of = |name: &str| {
        ranking
            .iter()
            .find(|s| s.column.eq_ignore_ascii_case(name))
            .map(|s| s.score)
    };

    let mut choices: Vec<ColumnChoice> = headers
        .iter()
        .enumerate()
        .map(|(index, name)| ColumnChoice {
            index,
            name: name.clone(),
            score: score_of(name),
            is_target: name.eq_ignore_ascii_case(target),
        })
        .collect();

    // stable: unranked columns keep header order
    choices.sort_by(|a, b| {
        b.is_target.cmp(&a.is_target).then_with(|| match (a.score, b.score) {
            (Some(sa), Some(sb)) => sb.total_cmp(&sa),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        })
    });
    choices
}

/// Pearson correlation coefficient. `None` for fewer than two pairs or zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / nf;
    let mean_y = ys[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Pairs of numeric values from two columns over a view, skipping rows where either is missing.
fn numeric_pairs(dataset: &Dataset, view: &RowView, a: usize, b: usize) -> (Vec<f64>, Vec<f64>) {
    view.rows(dataset)
        .filter_map(|row| Some((parse_number(row.cell(a))?, parse_number(row.cell(b))?)))
        .unzip()
}

/// Ranks every other column by the absolute Pearson correlation with the target.
pub struct PearsonRanker<'a> {
    dataset: &'a Dataset,
    view: RowView,
}

impl<'a> PearsonRanker<'a> {
    pub fn new(dataset: &'a Dataset, view: RowView) -> Self {
        Self { dataset, view }
    }
}

impl ColumnRanker for PearsonRanker<'_> {
    fn rank(&self, target: &str, algorithm: RankingAlgorithm) -> Result<Vec<ColumnScore>> {
        let target_idx = self.dataset.column_index(target)?;
        if algorithm != RankingAlgorithm::Correlation {
            debug!("{:?} not available in-process, ranking by correlation", algorithm);
        }

        let mut scores: Vec<ColumnScore> = self
            .dataset
            .headers()
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != target_idx)
            .filter_map(|(idx, name)| {
                let (xs, ys) = numeric_pairs(self.dataset, &self.view, target_idx, idx);
                let r = pearson(&xs, &ys)?;
                Some(ColumnScore { column: name.clone(), score: r.abs() })
            })
            .collect();

        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scores)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub blank: usize,
    pub numeric: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: f64,
    pub mean: Option<f64>,
}

/// Count, blank count and numeric aggregates of a column over a view.
pub fn summarize_column(dataset: &Dataset, view: &RowView, col: usize) -> ColumnSummary {
    let mut summary = ColumnSummary {
        count: 0,
        blank: 0,
        numeric: 0,
        min: None,
        max: None,
        sum: 0.0,
        mean: None,
    };

    for row in view.rows(dataset) {
        let cell = row.cell(col);
        summary.count += 1;
        if cell.trim().is_empty() {
            summary.blank += 1;
        }
        if let Some(v) = parse_number(cell) {
            summary.numeric += 1;
            summary.sum += v;
            summary.min = Some(summary.min.map_or(v, |m| m.min(v)));
            summary.max = Some(summary.max.map_or(v, |m| m.max(v)));
        }
    }

    if summary.numeric > 0 {
        summary.mean = Some(summary.sum / summary.numeric as f64);
    }
    summary
}
