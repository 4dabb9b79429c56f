use tracing::debug;

use crate::data::Dataset;
use crate::error::{EngineError, Result};
use crate::view::RowView;

/// Serialize the headers and every row of a view back to delimited text.
/// All columns are written; display visibility does not apply here.
pub fn export_delimited(dataset: &Dataset, view: &RowView, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    let export_err = |e: csv::Error| EngineError::Export(e.to_string());
    writer.write_record(dataset.headers()).map_err(export_err)?;
    for row in view.rows(dataset) {
        writer.write_record(&row.cells).map_err(export_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| EngineError::Export(e.to_string()))?;
    debug!("Exported {} rows ({} bytes)", view.len(), bytes.len());

    String::from_utf8(bytes).map_err(|e| EngineError::Export(e.to_string()))
}
