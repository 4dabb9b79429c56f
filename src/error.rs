use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// Unparseable delimited text, empty header, or a row rejected by the ragged-row policy.
    Parse { line: Option<usize>, message: String },
    /// The ingestion collaborator could not deliver the file. Never retried here.
    Network { source_name: String, message: String },
    /// Serializing a row view back to delimited text failed.
    Export(String),
    /// A user-supplied column name did not match any header.
    UnknownColumn(String),
    Config(String),
    Render(String),
}

impl EngineError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { line: None, message: message.into() }
    }

    pub fn parse_at(line: usize, message: impl Into<String>) -> Self {
        Self::Parse { line: Some(line), message: message.into() }
    }

    pub fn network(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network { source_name: source_name.into(), message: message.into() }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { line: Some(line), message } => write!(f, "parse error on line {line}: {message}"),
            Self::Parse { line: None, message } => write!(f, "parse error: {message}"),
            Self::Network { source_name, message } => {
                write!(f, "failed to fetch '{source_name}': {message}")
            }
            Self::Export(msg) => write!(f, "export failed: {msg}"),
            Self::UnknownColumn(name) => write!(f, "column '{name}' not found"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Render(msg) => write!(f, "render error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line() as usize);
        Self::Parse { line, message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_parse_with_line() {
        let err = EngineError::parse_at(4, "expected 3 cells, found 5");
        assert_eq!(err.to_string(), "parse error on line 4: expected 3 cells, found 5");
    }

    #[test]
    fn test_display_network() {
        let err = EngineError::network("sales.csv", "connection reset");
        assert!(err.to_string().contains("sales.csv"));
        assert!(err.to_string().contains("connection reset"));
    }
}
