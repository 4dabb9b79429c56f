// Row views, sorting and pagination

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::data::{Dataset, Row};
use crate::numeric::compare_cells;

/// Rows per table page.
pub const PAGE_SIZE: usize = 100;

/// Ordered subsequence of dataset rows, referenced by stable identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowView {
    indices: Vec<usize>,
}

impl RowView {
    pub fn all(dataset: &Dataset) -> Self {
        Self { indices: (0..dataset.len()).collect() }
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolve the view against the dataset it was derived from.
    pub fn rows<'a>(&'a self, dataset: &'a Dataset) -> impl Iterator<Item = &'a Row> + 'a {
        self.indices.iter().filter_map(move |&idx| dataset.row(idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Active sort. The absence of a spec means original order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub col: usize,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(col: usize) -> Self {
        Self { col, direction: SortDirection::Asc }
    }

    pub fn desc(col: usize) -> Self {
        Self { col, direction: SortDirection::Desc }
    }
}

/// Stable sort of a view. Cells that both parse as numbers compare numerically,
/// anything else compares in locale order.
pub fn sort(dataset: &Dataset, view: &RowView, spec: Option<SortSpec>) -> RowView {
    let Some(spec) = spec else {
        return view.clone();
    };

    let rows = dataset.rows();
    let cell = |idx: usize| rows.get(idx).map(|r| r.cell(spec.col)).unwrap_or("");

    let mut indices = view.indices.clone();
    indices.sort_by(|&a, &b| {
        let ord = compare_cells(cell(a), cell(b));
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    trace!("Sorted {} rows by column {} {:?}", indices.len(), spec.col, spec.direction);
    RowView { indices }
}

/// One window of a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Identities of the rows on this page, in view order.
    pub rows: Vec<usize>,
    /// 1-based page number after clamping.
    pub page: usize,
    /// Never less than 1, so an empty view reads as "page 1 of 1".
    pub total_pages: usize,
    pub total_rows: usize,
}

/// Window a view. Out-of-range page numbers clamp into `[1, total_pages]`.
pub fn paginate(view: &RowView, page_size: usize, page_number: usize) -> Page {
    let page_size = page_size.max(1);
    let total_rows = view.len();
    let total_pages = total_rows.div_ceil(page_size).max(1);
    let page = page_number.clamp(1, total_pages);

    let start = ((page - 1) * page_size).min(total_rows);
    let end = (start + page_size).min(total_rows);

    Page {
        rows: view.indices[start..end].to_vec(),
        page,
        total_pages,
        total_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RaggedRowPolicy;

    fn dataset() -> Dataset {
        Dataset::from_delimited(
            "k,tag\n10,b\n9,a\n10,c\napple,d\n2,e\nBanana,f\n",
            b',',
            RaggedRowPolicy::Pad,
        )
        .unwrap()
    }

    #[test]
    fn test_sort_none_preserves_order() {
        let ds = dataset();
        let view = RowView::all(&ds);
        assert_eq!(sort(&ds, &view, None), view);
    }

    #[test]
    fn test_sort_numeric_aware_ascending() {
        let ds = dataset();
        let sorted = sort(&ds, &RowView::all(&ds), Some(SortSpec::asc(0)));
        // 2 < 9 < 10 == 10 (stable), numbers before letters, case-folded words
        assert_eq!(sorted.indices(), &[4, 1, 0, 2, 3, 5]);
    }

    #[test]
    fn test_sort_descending_keeps_equal_keys_stable() {
        let ds = dataset();
        let sorted = sort(&ds, &RowView::all(&ds), Some(SortSpec::desc(0)));
        assert_eq!(sorted.indices(), &[5, 3, 0, 2, 1, 4]);
    }

    #[test]
    fn test_sort_does_not_touch_dataset_identity() {
        let ds = dataset();
        let sorted = sort(&ds, &RowView::all(&ds), Some(SortSpec::desc(1)));
        for row in sorted.rows(&ds) {
            assert_eq!(ds.rows()[row.original_index].cells, row.cells);
        }
    }

    #[test]
    fn test_paginate_clamps_high_page() {
        let view = RowView::from_indices((0..150).collect());
        let page = paginate(&view, PAGE_SIZE, 99);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.rows.len(), 50);
        assert_eq!(page.rows[0], 100);
    }

    #[test]
    fn test_paginate_clamps_page_zero() {
        let view = RowView::from_indices((0..10).collect());
        let page = paginate(&view, PAGE_SIZE, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.rows.len(), 10);
    }

    #[test]
    fn test_paginate_empty_view() {
        let page = paginate(&RowView::default(), PAGE_SIZE, 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn test_pages_cover_view_exactly() {
        let view = RowView::from_indices((0..257).rev().collect());
        let first = paginate(&view, PAGE_SIZE, 1);
        let mut all = Vec::new();
        for n in 1..=first.total_pages {
            all.extend(paginate(&view, PAGE_SIZE, n).rows);
        }
        assert_eq!(all, view.indices());
    }
}
