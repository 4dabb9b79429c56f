// Runtime executor for rowlens queries

use crate::chart::ChartConfig;
use crate::data::Dataset;
use crate::filter::FilterPredicate;
use crate::parser::{self, ChartExpr, FilterExpr, Query, SortExpr};
use crate::session::AnalysisSession;
use crate::view::SortSpec;
use anyhow::{anyhow, Context, Result};
use tracing::debug;

/// Parse a query string, reporting where parsing stopped on failure
pub fn parse(input: &str) -> Result<Query> {
    match parser::parse_query(input) {
        Ok((_, query)) => Ok(query),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let remaining = e.input.trim();
            if remaining.is_empty() {
                Err(anyhow!("Parse error: unexpected end of query"))
            } else {
                Err(anyhow!("Parse error at: '{}'", remaining))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err(anyhow!("Parse error: incomplete query")),
    }
}

fn column(dataset: &Dataset, name: &str) -> Result<usize> {
    dataset
        .column_index(name)
        .with_context(|| format!("Failed to resolve column '{}'", name))
}

/// Turn a named filter into a predicate over column positions
pub fn resolve_filter(dataset: &Dataset, expr: &FilterExpr) -> Result<FilterPredicate> {
    let predicate = match expr {
        FilterExpr::Text { column: c, needle } => FilterPredicate::Text {
            col: column(dataset, c)?,
            needle: needle.clone(),
        },
        FilterExpr::NotEmpty { column: c } => FilterPredicate::NotEmpty { col: column(dataset, c)? },
        FilterExpr::Range { column: c, min, max } => {
            check_bounds(*min, *max)?;
            FilterPredicate::Range { col: column(dataset, c)?, min: *min, max: *max }
        }
        FilterExpr::ExcludeRange { column: c, min, max } => {
            check_bounds(*min, *max)?;
            FilterPredicate::ExcludeRange { col: column(dataset, c)?, min: *min, max: *max }
        }
        FilterExpr::Keep { column: c, indices } => FilterPredicate::Indices {
            col: column(dataset, c)?,
            set: indices.iter().copied().collect(),
        },
        FilterExpr::Drop { column: c, indices } => FilterPredicate::ExcludeIndices {
            col: column(dataset, c)?,
            set: indices.iter().copied().collect(),
        },
    };
    Ok(predicate)
}

fn check_bounds(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        anyhow::bail!("Range bounds must be finite numbers");
    }
    if min > max {
        anyhow::bail!("Range minimum {} is greater than maximum {}", min, max);
    }
    Ok(())
}

pub fn resolve_sort(dataset: &Dataset, expr: &SortExpr) -> Result<SortSpec> {
    let col = column(dataset, &expr.column)?;
    Ok(if expr.descending { SortSpec::desc(col) } else { SortSpec::asc(col) })
}

/// Chart bindings may be partial; missing axes simply leave nothing to plot
pub fn resolve_chart(dataset: &Dataset, expr: &ChartExpr) -> Result<ChartConfig> {
    let resolve = |name: &Option<String>| name.as_deref().map(|n| column(dataset, n)).transpose();
    Ok(ChartConfig {
        x_col: resolve(&expr.x)?,
        y_col: resolve(&expr.y)?,
        y2_col: resolve(&expr.y2)?,
        kind: expr.kind,
    })
}

/// Apply every stage of a query to a session. Columns are resolved before anything
/// is applied, so an unknown column leaves the session untouched.
pub fn run_query(session: &mut AnalysisSession, query: &Query) -> Result<()> {
    let dataset = session.dataset();
    let filters = query
        .filters()
        .map(|f| resolve_filter(dataset, f))
        .collect::<Result<Vec<_>>>()?;
    let sort = query.sort().map(|s| resolve_sort(dataset, s)).transpose()?;
    let chart = query.chart().map(|c| resolve_chart(dataset, c)).transpose()?;

    debug!(
        "Running query: {} filters, sort {:?}, chart {:?}",
        filters.len(),
        sort,
        chart.as_ref().map(|c| c.kind)
    );

    for predicate in filters {
        session.add_filter(predicate);
    }
    if sort.is_some() {
        session.set_sort(sort);
    }
    if let Some(config) = chart {
        if session.set_chart(config).is_none() {
            debug!("Chart bindings incomplete, nothing plotted");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::config::EngineConfig;

    fn session() -> AnalysisSession {
        let mut s = AnalysisSession::new("t", EngineConfig::default());
        s.load_text("t.csv", "Name,Score,Age\nann,12,30\nbob,7,41\ncid,15,25\ndee,,33\n")
            .unwrap();
        s
    }

    #[test]
    fn test_parse_reports_remainder() {
        let err = parse("sort(a) | bogus(b)").unwrap_err().to_string();
        assert!(err.contains("bogus(b)"), "{}", err);
        assert!(parse("").is_err());
    }

    #[test]
    fn test_run_query_filters_and_sorts() {
        let mut s = session();
        let query = parse("not_empty(score) | range(Score, 5, 13) | sort(score, desc)").unwrap();
        run_query(&mut s, &query).unwrap();
        assert_eq!(s.filters().len(), 2);
        assert_eq!(s.view().indices(), &[0, 1]);
    }

    #[test]
    fn test_run_query_chart() {
        let mut s = session();
        let query = parse("scatter(x: age, y: score)").unwrap();
        run_query(&mut s, &query).unwrap();
        assert_eq!(s.chart_config().kind, ChartKind::Scatter);
        assert_eq!(s.plotted().map(|p| p.point_count()), Some(3));
    }

    #[test]
    fn test_unknown_column_leaves_session_untouched() {
        let mut s = session();
        let query = parse("range(score, 1, 2) | sort(height)").unwrap();
        let err = run_query(&mut s, &query).unwrap_err();
        assert!(format!("{:#}", err).contains("height"));
        assert!(s.filters().is_empty());
        assert!(s.sort_spec().is_none());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let s = session();
        let expr = FilterExpr::Range { column: "score".into(), min: 5.0, max: 1.0 };
        assert!(resolve_filter(s.dataset(), &expr).is_err());
    }

    #[test]
    fn test_keep_and_drop_resolve_to_index_sets() {
        let s = session();
        let keep = resolve_filter(s.dataset(), &FilterExpr::Keep { column: "Name".into(), indices: vec![3, 1, 3] }).unwrap();
        assert!(keep.is_index_predicate());
        if let FilterPredicate::Indices { set, .. } = keep {
            assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 3]);
        }
    }
}
