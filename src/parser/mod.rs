// rowlens query language parser

pub mod ast;
pub mod command;
pub mod filter;
pub mod lexer;
pub mod pipeline;

// Public API re-exports
pub use ast::{ChartExpr, FilterExpr, Query, SortExpr, Stage};
pub use pipeline::parse_query;
