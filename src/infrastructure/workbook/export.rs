use csv::WriterBuilder;
use serde_json::Value;

use crate::domain::activity::ActivityRecord;
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{cell_text, SheetRow};
use crate::infrastructure::db::rows::collect_headers;

/// CSV with the union of row headers, in first-seen order.
pub fn rows_to_csv(rows: &[SheetRow]) -> Result<String> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let headers = collect_headers(rows);
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(&headers)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV headers: {}", e)))?;

    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|header| match row.get(header) {
                Some(Value::Array(_)) | Some(Value::Object(_)) => {
                    row.get(header).map(Value::to_string).unwrap_or_default()
                }
                _ => cell_text(row, header),
            })
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("Invalid CSV output: {}", e)))
}

/// Activity log export with the sheet column names.
pub fn activity_to_csv(records: &[ActivityRecord]) -> Result<String> {
    let rows: Vec<SheetRow> = records
        .iter()
        .map(|record| match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(SheetRow::new()),
            Err(e) => Err(AppError::from(e)),
        })
        .collect::<Result<_>>()?;
    rows_to_csv(&rows)
}
