// Sort and chart command parsers

use super::ast::{ChartExpr, SortExpr};
use super::lexer::{column_ref, ws};
use crate::chart::ChartKind;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, opt, value},
    multi::separated_list0,
    sequence::preceded,
    IResult,
};

/// Parse a sort command
/// Format: sort(col) or sort(col, desc) or sort(col, asc)
pub fn parse_sort(input: &str) -> IResult<&str, SortExpr> {
    let (input, _) = ws(tag("sort"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, column) = ws(column_ref)(input)?;

    let (input, descending) = opt(preceded(
        ws(char(',')),
        ws(alt((value(true, tag("desc")), value(false, tag("asc"))))),
    ))(input)?;

    let (input, _) = ws(char(')'))(input)?;

    Ok((
        input,
        SortExpr {
            column,
            descending: descending.unwrap_or(false),
        },
    ))
}

fn chart_kind(input: &str) -> IResult<&str, ChartKind> {
    ws(alt((
        value(ChartKind::Scatter, tag("scatter")),
        value(ChartKind::Line, tag("line")),
        value(ChartKind::Boxplot, tag("boxplot")),
    )))(input)
}

/// Parse a chart command
/// Format: scatter(x: col, y: col) or line(x: col, y: col, y2: col) or boxplot(...)
pub fn parse_chart(input: &str) -> IResult<&str, ChartExpr> {
    let (input, kind) = chart_kind(input)?;
    let (input, _) = ws(char('('))(input)?;

    // Parse optional named arguments
    let (input, args) = separated_list0(
        ws(char(',')),
        alt((
            map(preceded(ws(tag("x:")), ws(column_ref)), |c| ("x", c)),
            map(preceded(ws(tag("y2:")), ws(column_ref)), |c| ("y2", c)),
            map(preceded(ws(tag("y:")), ws(column_ref)), |c| ("y", c)),
        )),
    )(input)?;

    let (input, _) = ws(char(')'))(input)?;

    let mut chart = ChartExpr { kind, x: None, y: None, y2: None };

    for (key, column) in args {
        match key {
            "x" => chart.x = Some(column),
            "y" => chart.y = Some(column),
            "y2" => chart.y2 = Some(column),
            _ => {}
        }
    }

    Ok((input, chart))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort() {
        assert_eq!(
            parse_sort("sort(price)"),
            Ok(("", SortExpr { column: "price".into(), descending: false }))
        );
        assert_eq!(
            parse_sort(r#"sort("unit price", desc)"#),
            Ok(("", SortExpr { column: "unit price".into(), descending: true }))
        );
        assert!(parse_sort("sort()").is_err());
        assert!(parse_sort("sort(a, sideways)").is_err());
    }

    #[test]
    fn test_parse_chart() {
        let (_, chart) = parse_chart("scatter(x: a, y: b)").unwrap();
        assert_eq!(chart.kind, ChartKind::Scatter);
        assert_eq!(chart.x.as_deref(), Some("a"));
        assert_eq!(chart.y.as_deref(), Some("b"));
        assert_eq!(chart.y2, None);
    }

    #[test]
    fn test_parse_chart_any_order_and_y2() {
        let (_, chart) = parse_chart(r#"line(y2: "c d", y: b, x: a)"#).unwrap();
        assert_eq!(chart.kind, ChartKind::Line);
        assert_eq!(chart.x.as_deref(), Some("a"));
        assert_eq!(chart.y2.as_deref(), Some("c d"));
    }

    #[test]
    fn test_parse_chart_without_bindings() {
        let (_, chart) = parse_chart("boxplot()").unwrap();
        assert_eq!(chart.kind, ChartKind::Boxplot);
        assert!(chart.x.is_none() && chart.y.is_none());
    }
}
