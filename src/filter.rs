//! Filter engine.
//!
//! Predicates are grouped by column. Groups are ANDed together; inside a group the
//! combination depends on which predicate kinds are present:
//!
//! 1. index predicates (`Indices` / `ExcludeIndices`) are the only logic for their
//!    column while present; every other kind on that column is ignored
//! 2. otherwise `Text`, `NotEmpty` and `ExcludeRange` are ANDed
//! 3. and, if any `Range` exists, at least one of them must also match
//!
//! Evaluation always starts from the full dataset, so the result does not depend on
//! predicate order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Dataset, Row};
use crate::numeric::parse_number;
use crate::view::RowView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterPredicate {
    /// Case-insensitive substring match.
    Text { col: usize, needle: String },
    /// Cell is non-blank after trimming.
    NotEmpty { col: usize },
    /// Inclusive numeric membership. Non-numeric cells fail.
    Range { col: usize, min: f64, max: f64 },
    /// Numeric non-membership. Non-numeric cells pass.
    ExcludeRange { col: usize, min: f64, max: f64 },
    /// Row identity is in the set.
    Indices { col: usize, set: BTreeSet<usize> },
    /// Row identity is not in the set.
    ExcludeIndices { col: usize, set: BTreeSet<usize> },
}

impl FilterPredicate {
    pub fn column(&self) -> usize {
        match self {
            Self::Text { col, .. }
            | Self::NotEmpty { col }
            | Self::Range { col, .. }
            | Self::ExcludeRange { col, .. }
            | Self::Indices { col, .. }
            | Self::ExcludeIndices { col, .. } => *col,
        }
    }

    pub fn is_index_predicate(&self) -> bool {
        matches!(self, Self::Indices { .. } | Self::ExcludeIndices { .. })
    }

    /// Human readable form for the active-filter list.
    pub fn describe(&self, headers: &[String]) -> String {
        let name = headers
            .get(self.column())
            .cloned()
            .unwrap_or_else(|| format!("#{}", self.column()));
        match self {
            Self::Text { needle, .. } => format!("{name} contains \"{needle}\""),
            Self::NotEmpty { .. } => format!("{name} is not empty"),
            Self::Range { min, max, .. } => format!("{name} in [{min}, {max}]"),
            Self::ExcludeRange { min, max, .. } => format!("{name} not in [{min}, {max}]"),
            Self::Indices { set, .. } => format!("{name}: keep {} selected rows", set.len()),
            Self::ExcludeIndices { set, .. } => format!("{name}: exclude {} selected rows", set.len()),
        }
    }
}

fn text_matches(cell: &str, needle: &str) -> bool {
    cell.to_lowercase().contains(&needle.to_lowercase())
}

fn in_range(cell: &str, min: f64, max: f64) -> Option<bool> {
    parse_number(cell).map(|v| v >= min && v <= max)
}

/// Ordered list of predicates. Order only matters for display and removal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    predicates: Vec<FilterPredicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, predicate: FilterPredicate) {
        self.predicates.push(predicate);
    }

    pub fn remove(&mut self, position: usize) -> Option<FilterPredicate> {
        if position < self.predicates.len() {
            Some(self.predicates.remove(position))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.predicates.clear();
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterPredicate> {
        self.predicates.iter()
    }

    pub fn as_slice(&self) -> &[FilterPredicate] {
        &self.predicates
    }
}

impl FromIterator<FilterPredicate> for FilterSet {
    fn from_iter<T: IntoIterator<Item = FilterPredicate>>(iter: T) -> Self {
        Self { predicates: iter.into_iter().collect() }
    }
}

/// Predicates of a single column, split by how they combine.
#[derive(Default)]
struct ColumnGroup<'a> {
    keep: Vec<&'a BTreeSet<usize>>,
    exclude: Vec<&'a BTreeSet<usize>>,
    others: Vec<&'a FilterPredicate>,
    ranges: Vec<(f64, f64)>,
}

impl ColumnGroup<'_> {
    fn matches(&self, col: usize, row: &Row) -> bool {
        if !self.keep.is_empty() || !self.exclude.is_empty() {
            let id = row.original_index;
            return self.keep.iter().all(|set| set.contains(&id))
                && !self.exclude.iter().any(|set| set.contains(&id));
        }

        let cell = row.cell(col);
        let pass_others = self.others.iter().all(|p| match p {
            FilterPredicate::Text { needle, .. } => text_matches(cell, needle),
            FilterPredicate::NotEmpty { .. } => !cell.trim().is_empty(),
            FilterPredicate::ExcludeRange { min, max, .. } => {
                !in_range(cell, *min, *max).unwrap_or(false)
            }
            // ranges and index sets are collected separately
            _ => true,
        });

        pass_others
            && (self.ranges.is_empty()
                || self
                    .ranges
                    .iter()
                    .any(|(min, max)| in_range(cell, *min, *max).unwrap_or(false)))
    }
}

fn group_by_column(filters: &FilterSet) -> BTreeMap<usize, ColumnGroup<'_>> {
    let mut groups: BTreeMap<usize, ColumnGroup<'_>> = BTreeMap::new();
    for predicate in filters.iter() {
        let group = groups.entry(predicate.column()).or_default();
        match predicate {
            FilterPredicate::Indices { set, .. } => group.keep.push(set),
            FilterPredicate::ExcludeIndices { set, .. } => group.exclude.push(set),
            FilterPredicate::Range { min, max, .. } => group.ranges.push((*min, *max)),
            FilterPredicate::Text { .. }
            | FilterPredicate::NotEmpty { .. }
            | FilterPredicate::ExcludeRange { .. } => group.others.push(predicate),
        }
    }
    groups
}

/// Evaluate a filter set against the full dataset.
pub fn apply(dataset: &Dataset, filters: &FilterSet) -> RowView {
    if filters.is_empty() {
        return RowView::all(dataset);
    }

    let groups = group_by_column(filters);
    let indices: Vec<usize> = dataset
        .rows()
        .iter()
        .filter(|row| groups.iter().all(|(col, group)| group.matches(*col, row)))
        .map(|row| row.original_index)
        .collect();

    debug!(
        "Applied {} predicates over {} columns: {} of {} rows survive",
        filters.len(),
        groups.len(),
        indices.len(),
        dataset.len()
    );

    RowView::from_indices(indices)
}
