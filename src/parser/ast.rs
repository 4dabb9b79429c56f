// Abstract Syntax Tree for the rowlens query language

use crate::chart::ChartKind;

/// A complete query: stages in the order they were written
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub stages: Vec<Stage>,
}

impl Query {
    pub fn filters(&self) -> impl Iterator<Item = &FilterExpr> {
        self.stages.iter().filter_map(|s| match s {
            Stage::Filter(f) => Some(f),
            _ => None,
        })
    }

    /// The last sort stage wins
    pub fn sort(&self) -> Option<&SortExpr> {
        self.stages.iter().rev().find_map(|s| match s {
            Stage::Sort(sort) => Some(sort),
            _ => None,
        })
    }

    /// The last chart stage wins
    pub fn chart(&self) -> Option<&ChartExpr> {
        self.stages.iter().rev().find_map(|s| match s {
            Stage::Chart(chart) => Some(chart),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Filter(FilterExpr),
    Sort(SortExpr),
    Chart(ChartExpr),
}

/// Filter stages, with columns still given by name
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Text { column: String, needle: String },
    NotEmpty { column: String },
    Range { column: String, min: f64, max: f64 },
    ExcludeRange { column: String, min: f64, max: f64 },
    Keep { column: String, indices: Vec<usize> },
    Drop { column: String, indices: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortExpr {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartExpr {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub y2: Option<String>,
}
