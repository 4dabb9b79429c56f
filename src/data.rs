use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};

/// What to do with a row whose cell count differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaggedRowPolicy {
    /// Pad short rows with empty cells. Long rows cannot be padded and are rejected.
    #[default]
    Pad,
    /// Reject every row whose cell count differs from the header.
    Reject,
}

/// A loaded row. `original_index` is assigned once at load time and never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub original_index: usize,
    pub cells: Vec<String>,
}

impl Row {
    /// Cell at a column position; columns past the end read as blank.
    pub fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }
}

/// A source row skipped during load, kept so callers can report it.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRow {
    pub line: usize,
    pub cells: usize,
    pub expected: usize,
}

/// Header list plus rows with stable identities. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
    rejected: Vec<RejectedRow>,
}

impl Dataset {
    /// Build from already split cells. Every row must match the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| {
                if cells.len() != width {
                    return Err(EngineError::parse_at(
                        idx + 2,
                        format!("expected {} cells, found {}", width, cells.len()),
                    ));
                }
                Ok(Row { original_index: idx, cells })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, rows, rejected: Vec::new() })
    }

    /// Parse a header line and data lines handed over by the ingestion collaborator.
    pub fn load<I, S>(header_line: &str, row_lines: I, delimiter: u8, policy: RaggedRowPolicy) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::from(header_line);
        for line in row_lines {
            text.push('\n');
            text.push_str(line.as_ref());
        }
        Self::from_delimited(&text, delimiter, policy)
    }

    /// Parse a whole delimited document whose first record is the header.
    pub fn from_delimited(text: &str, delimiter: u8, policy: RaggedRowPolicy) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
            None => return Err(EngineError::parse("missing header line")),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(EngineError::parse_at(1, "header line is empty"));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        let mut rejected = Vec::new();

        for record in records {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();

            let accept = match (cells.len().cmp(&width), policy) {
                (std::cmp::Ordering::Equal, _) => true,
                (std::cmp::Ordering::Less, RaggedRowPolicy::Pad) => {
                    cells.resize(width, String::new());
                    true
                }
                _ => false,
            };

            if accept {
                rows.push(Row { original_index: rows.len(), cells });
            } else {
                warn!("Rejecting line {}: expected {} cells, found {}", line, width, cells.len());
                rejected.push(RejectedRow { line, cells: cells.len(), expected: width });
            }
        }

        info!(
            "Loaded {} rows x {} columns ({} rejected)",
            rows.len(),
            width,
            rejected.len()
        );

        Ok(Self { headers, rows, rejected })
    }

    /// Create a Dataset from a JSON array of objects
    pub fn from_json(value: &Value) -> Result<Self> {
        let array = value
            .as_array()
            .ok_or_else(|| EngineError::parse("input data must be a JSON array of objects"))?;

        let first_obj = array
            .first()
            .ok_or_else(|| EngineError::parse("input data array is empty"))?
            .as_object()
            .ok_or_else(|| EngineError::parse("items in array must be objects"))?;

        // key order of the first object, as written in the file
        let headers: Vec<String> = first_obj.keys().cloned().collect();

        let mut rows = Vec::with_capacity(array.len());
        for (idx, item) in array.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| EngineError::parse_at(idx + 1, "items in array must be objects"))?;

            let mut cells = Vec::with_capacity(headers.len());
            for header in &headers {
                let cell = match obj.get(header) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    Some(Value::Null) | None => String::new(),
                    _ => {
                        return Err(EngineError::parse_at(
                            idx + 1,
                            format!("unsupported value type for field '{}'", header),
                        ))
                    }
                };
                cells.push(cell);
            }
            rows.push(Row { original_index: idx, cells });
        }

        debug!("Loaded {} rows from JSON", rows.len());
        Ok(Self { headers, rows, rejected: Vec::new() })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Row by stable identity. Identities are dense, so this is a direct index.
    pub fn row(&self, original_index: usize) -> Option<&Row> {
        self.rows.get(original_index)
    }

    /// Resolve a user's column choice to its position (case-insensitive).
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_assigns_original_index_in_order() {
        let ds = Dataset::load("a,b", ["1,x", "2,y", "3,z"], b',', RaggedRowPolicy::Pad).unwrap();
        assert_eq!(ds.headers(), &["a".to_string(), "b".to_string()]);
        let idx: Vec<usize> = ds.rows().iter().map(|r| r.original_index).collect();
        assert_eq!(idx, vec![0, 1, 2]);
        assert_eq!(ds.rows()[2].cell(1), "z");
    }

    #[test]
    fn test_pad_policy_pads_short_rows() {
        let ds = Dataset::from_delimited("a,b,c\n1,2\n4,5,6\n", b',', RaggedRowPolicy::Pad).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].cells, vec!["1", "2", ""]);
        assert!(ds.rejected().is_empty());
    }

    #[test]
    fn test_pad_policy_rejects_long_rows_individually() {
        let ds = Dataset::from_delimited("a,b\n1,2\n3,4,5\n6,7\n", b',', RaggedRowPolicy::Pad).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rejected().len(), 1);
        assert_eq!(ds.rejected()[0].line, 3);
        assert_eq!(ds.rejected()[0].cells, 3);
        // identities stay dense over accepted rows
        assert_eq!(ds.rows()[1].original_index, 1);
        assert_eq!(ds.rows()[1].cell(0), "6");
    }

    #[test]
    fn test_reject_policy_rejects_short_rows() {
        let ds = Dataset::from_delimited("a,b\n1\n2,3\n", b',', RaggedRowPolicy::Reject).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rejected().len(), 1);
        assert_eq!(ds.rejected()[0].expected, 2);
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        let result = Dataset::from_delimited("", b',', RaggedRowPolicy::Pad);
        assert!(matches!(result, Err(EngineError::Parse { .. })));
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let ds = Dataset::from_delimited("x,y\n", b',', RaggedRowPolicy::Pad).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn test_semicolon_delimiter_and_quotes() {
        let ds = Dataset::from_delimited("name;note\n\"a;b\";ok\n", b';', RaggedRowPolicy::Pad).unwrap();
        assert_eq!(ds.rows()[0].cell(0), "a;b");
    }

    #[test]
    fn test_new_rejects_mismatched_width() {
        let result = Dataset::new(vec!["a".into()], vec![vec!["1".into(), "2".into()]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_json() {
        let value: Value = serde_json::from_str(r#"[{"x": 1, "y": "a"}, {"x": 2.5, "y": null}]"#).unwrap();
        let ds = Dataset::from_json(&value).unwrap();
        assert_eq!(ds.len(), 2);
        let x = ds.column_index("x").unwrap();
        let y = ds.column_index("y").unwrap();
        assert_eq!(ds.rows()[1].cell(x), "2.5");
        assert_eq!(ds.rows()[1].cell(y), "");
    }

    #[test]
    fn test_from_json_keeps_file_column_order() {
        let value: Value = serde_json::from_str(r#"[{"zeta": 1, "alpha": 2, "mid": 3}, {"alpha": 4}]"#).unwrap();
        let ds = Dataset::from_json(&value).unwrap();
        assert_eq!(ds.headers(), &["zeta", "alpha", "mid"]);
        assert_eq!(ds.rows()[0].cells, vec!["1", "2", "3"]);
        assert_eq!(ds.rows()[1].cells, vec!["", "4", ""]);
    }

    #[test]
    fn test_column_index_case_insensitive() {
        let ds = Dataset::load("Price,Name", Vec::<String>::new(), b',', RaggedRowPolicy::Pad).unwrap();
        assert_eq!(ds.column_index("price").unwrap(), 0);
        assert!(matches!(ds.column_index("missing"), Err(EngineError::UnknownColumn(_))));
    }
}
