// Token-level parsers shared by the query stages

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0_count,
    number::complete::double,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Identifier: letter or underscore, then letters, digits, underscores
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    )(input)
}

/// Double-quoted string with \" \\ and \n escapes. `""` is the empty string.
pub fn string_literal(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

/// Signed decimal number, exponent allowed
pub fn number_literal(input: &str) -> IResult<&str, f64> {
    double(input)
}

/// Unsigned integer, used for row indices
pub fn index_literal(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

/// A column reference: bare identifier or quoted header name
pub fn column_ref(input: &str) -> IResult<&str, String> {
    alt((string_literal, identifier))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("price_2 rest"), Ok((" rest", "price_2".to_string())));
        assert_eq!(identifier("_x"), Ok(("", "_x".to_string())));
        assert!(identifier("2x").is_err());
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal(r#""hello world""#), Ok(("", "hello world".to_string())));
        assert_eq!(string_literal(r#""say \"hi\"""#), Ok(("", "say \"hi\"".to_string())));
        assert_eq!(string_literal(r#""""#), Ok(("", String::new())));
        assert!(string_literal(r#""open"#).is_err());
    }

    #[test]
    fn test_number_literal() {
        assert_eq!(number_literal("42)"), Ok((")", 42.0)));
        assert_eq!(number_literal("-1.5e2"), Ok(("", -150.0)));
        assert!(number_literal("abc").is_err());
    }

    #[test]
    fn test_index_literal() {
        assert_eq!(index_literal("17,"), Ok((",", 17)));
        assert!(index_literal("-1").is_err());
    }

    #[test]
    fn test_column_ref() {
        assert_eq!(column_ref(r#""Unit Price""#), Ok(("", "Unit Price".to_string())));
        assert_eq!(column_ref("qty"), Ok(("", "qty".to_string())));
        assert_eq!(ws(column_ref)("  qty  ,"), Ok((",", "qty".to_string())));
    }
}
