// Cell coercion and comparison shared by filtering, sorting and chart binding

use std::cmp::Ordering;

/// Parse a cell as a finite float. Blank, non-numeric and non-finite cells yield `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn is_numeric(cell: &str) -> bool {
    parse_number(cell).is_some()
}

/// Case-folded comparison with a raw tiebreak so the order stays total.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

/// Numeric when both sides parse, otherwise locale order. Blank cells come first,
/// then numbers, then other text, so the order stays total for `sort_by`.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    let blank_a = a.trim().is_empty();
    let blank_b = b.trim().is_empty();
    if blank_a || blank_b {
        return blank_b.cmp(&blank_a).then_with(|| a.cmp(b));
    }
    match (parse_number(a), parse_number(b)) {
        (Some(fa), Some(fb)) => fa.total_cmp(&fb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => locale_cmp(a, b),
    }
}
