// Filter stage parsers

use super::ast::FilterExpr;
use super::lexer::{column_ref, index_literal, number_literal, string_literal, ws};
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alphanumeric1, char},
    combinator::{map, not},
    multi::separated_list1,
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

/// A stage keyword that is not the prefix of a longer identifier
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    ws(terminated(tag(word), not(alt((alphanumeric1, tag("_"))))))
}

fn args<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(ws(char('(')), inner, ws(char(')')))
}

/// Format: text(col, "needle")
pub fn parse_text(input: &str) -> IResult<&str, FilterExpr> {
    map(
        preceded(
            keyword("text"),
            args(tuple((ws(column_ref), preceded(ws(char(',')), ws(string_literal))))),
        ),
        |(column, needle)| FilterExpr::Text { column, needle },
    )(input)
}

/// Format: not_empty(col)
pub fn parse_not_empty(input: &str) -> IResult<&str, FilterExpr> {
    map(preceded(keyword("not_empty"), args(ws(column_ref))), |column| {
        FilterExpr::NotEmpty { column }
    })(input)
}

fn bounds(input: &str) -> IResult<&str, (String, f64, f64)> {
    args(tuple((
        ws(column_ref),
        preceded(ws(char(',')), ws(number_literal)),
        preceded(ws(char(',')), ws(number_literal)),
    )))(input)
}

/// Format: range(col, min, max)
pub fn parse_range(input: &str) -> IResult<&str, FilterExpr> {
    map(preceded(keyword("range"), bounds), |(column, min, max)| {
        FilterExpr::Range { column, min, max }
    })(input)
}

/// Format: exclude_range(col, min, max)
pub fn parse_exclude_range(input: &str) -> IResult<&str, FilterExpr> {
    map(preceded(keyword("exclude_range"), bounds), |(column, min, max)| {
        FilterExpr::ExcludeRange { column, min, max }
    })(input)
}

fn index_list(input: &str) -> IResult<&str, (String, Vec<usize>)> {
    args(tuple((
        ws(column_ref),
        preceded(ws(char(',')), separated_list1(ws(char(',')), ws(index_literal))),
    )))(input)
}

/// Format: keep(col, 0, 4, 7)
pub fn parse_keep(input: &str) -> IResult<&str, FilterExpr> {
    map(preceded(keyword("keep"), index_list), |(column, indices)| {
        FilterExpr::Keep { column, indices }
    })(input)
}

/// Format: drop(col, 3)
pub fn parse_drop(input: &str) -> IResult<&str, FilterExpr> {
    map(preceded(keyword("drop"), index_list), |(column, indices)| {
        FilterExpr::Drop { column, indices }
    })(input)
}

pub fn parse_filter(input: &str) -> IResult<&str, FilterExpr> {
    alt((
        parse_text,
        parse_not_empty,
        parse_range,
        parse_exclude_range,
        parse_keep,
        parse_drop,
    ))(input)
}
