// Paged table projection for display

use std::collections::BTreeSet;

use serde::Serialize;

use crate::data::Dataset;
use crate::view::{paginate, RowView, PAGE_SIZE};

const MAX_CELL_WIDTH: usize = 40;

/// Display-only column toggles. Export ignores these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    hidden: BTreeSet<usize>,
}

impl ColumnVisibility {
    pub fn hide(&mut self, col: usize) {
        self.hidden.insert(col);
    }

    pub fn show(&mut self, col: usize) {
        self.hidden.remove(&col);
    }

    pub fn toggle(&mut self, col: usize) {
        if !self.hidden.remove(&col) {
            self.hidden.insert(col);
        }
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    pub fn is_visible(&self, col: usize) -> bool {
        !self.hidden.contains(&col)
    }

    pub fn visible_columns(&self, column_count: usize) -> Vec<usize> {
        (0..column_count).filter(|c| self.is_visible(*c)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub original_index: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub headers: Vec<String>,
    pub columns: Vec<usize>,
    pub rows: Vec<TableRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

impl TablePage {
    pub fn label(&self) -> String {
        format!("page {} of {}", self.page, self.total_pages)
    }

    /// Fixed-width plain text rendering with a trailing page footer.
    pub fn render_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| display_width(h)).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(&row.cells) {
                *w = (*w).max(display_width(cell));
            }
        }
        let id_width = self
            .rows
            .iter()
            .map(|r| r.original_index.to_string().len())
            .max()
            .unwrap_or(1)
            .max(1);

        let mut out = String::new();
        out.push_str(&format!("{:>id_width$}", "#"));
        for (header, w) in self.headers.iter().zip(&widths) {
            out.push_str("  ");
            out.push_str(&pad(header, *w));
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{:>id_width$}", row.original_index));
            for (cell, w) in row.cells.iter().zip(&widths) {
                out.push_str("  ");
                out.push_str(&pad(cell, *w));
            }
            out.push('\n');
        }

        out.push_str(&format!("{} ({} rows)\n", self.label(), self.total_rows));
        out
    }
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() > MAX_CELL_WIDTH {
        let mut s: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
        s.push('…');
        s
    } else {
        cell.to_string()
    }
}

fn display_width(cell: &str) -> usize {
    cell.chars().count().min(MAX_CELL_WIDTH)
}

fn pad(cell: &str, width: usize) -> String {
    let cell = truncate(cell);
    let fill = width.saturating_sub(cell.chars().count());
    format!("{}{}", cell, " ".repeat(fill))
}

/// Project one page of a view onto the visible columns.
pub fn project(
    dataset: &Dataset,
    view: &RowView,
    page_number: usize,
    visibility: &ColumnVisibility,
) -> TablePage {
    let page = paginate(view, PAGE_SIZE, page_number);
    let columns = visibility.visible_columns(dataset.column_count());

    let headers = columns.iter().map(|&c| dataset.headers()[c].clone()).collect();
    let rows = page
        .rows
        .iter()
        .filter_map(|&idx| dataset.row(idx))
        .map(|row| TableRow {
            original_index: row.original_index,
            cells: columns.iter().map(|&c| row.cell(c).to_string()).collect(),
        })
        .collect();

    TablePage {
        headers,
        columns,
        rows,
        page: page.page,
        total_pages: page.total_pages,
        total_rows: page.total_rows,
    }
}
