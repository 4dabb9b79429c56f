// Pipeline parser for the rowlens query language

use super::ast::{Query, Stage};
use super::command::{parse_chart, parse_sort};
use super::filter::parse_filter;
use super::lexer::ws;
use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{eof, map, opt},
    multi::separated_list1,
    IResult,
};

fn parse_stage(input: &str) -> IResult<&str, Stage> {
    alt((
        map(parse_filter, Stage::Filter),
        map(parse_sort, Stage::Sort),
        map(parse_chart, Stage::Chart),
    ))(input)
}

/// Parse a complete query
/// Format: stage | stage | ...
pub fn parse_query(input: &str) -> IResult<&str, Query> {
    // If input starts with "|", consume it
    let (input, _) = opt(ws(tag("|")))(input)?;

    let (input, stages) = separated_list1(ws(tag("|")), parse_stage)(input)?;

    // Consume trailing whitespace and ensure end of input
    let (input, _) = ws(eof)(input)?;

    Ok((input, Query { stages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::parser::ast::FilterExpr;

    #[test]
    fn test_parse_single_filter() {
        let (_, query) = parse_query("range(a, 1, 2)").unwrap();
        assert_eq!(query.stages.len(), 1);
        assert_eq!(query.filters().count(), 1);
        assert!(query.sort().is_none());
    }

    #[test]
    fn test_parse_full_pipeline() {
        let input = r#"text(name, "a") | range(score, 10, 20) | sort(score, desc) | scatter(x: score, y: age)"#;
        let (_, query) = parse_query(input).unwrap();
        assert_eq!(query.stages.len(), 4);
        assert_eq!(query.filters().count(), 2);
        assert!(query.sort().unwrap().descending);
        assert_eq!(query.chart().unwrap().kind, ChartKind::Scatter);
    }

    #[test]
    fn test_last_sort_and_chart_win() {
        let (_, query) = parse_query("sort(a) | sort(b) | line(x: a, y: b) | boxplot(x: c, y: d)").unwrap();
        assert_eq!(query.sort().unwrap().column, "b");
        assert_eq!(query.chart().unwrap().kind, ChartKind::Boxplot);
    }

    #[test]
    fn test_filter_order_preserved() {
        let (_, query) = parse_query("not_empty(b) | keep(a, 1)").unwrap();
        let filters: Vec<&FilterExpr> = query.filters().collect();
        assert!(matches!(filters[0], FilterExpr::NotEmpty { .. }));
        assert!(matches!(filters[1], FilterExpr::Keep { .. }));
    }

    #[test]
    fn test_leading_pipe_allowed() {
        assert!(parse_query("| sort(a)").is_ok());
    }

    #[test]
    fn test_trailing_pipe_fails() {
        assert!(parse_query("sort(a) |").is_err());
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(parse_query("").is_err());
    }

    #[test]
    fn test_unknown_stage_fails() {
        assert!(parse_query("sort(a) | frobnicate(b)").is_err());
    }
}
