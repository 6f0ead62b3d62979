use std::path::Path;

use calamine::{open_workbook, DataType, Reader, Xlsx};
use serde_json::Value;

use crate::domain::error::{AppError, Result};
use crate::domain::sheet::SheetRow;

/// Reads the first worksheet. Row one holds the column headers.
pub fn parse_xlsx(path: &Path) -> Result<Vec<SheetRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
        AppError::ParseError(format!("Failed to open Excel file {}: {}", path.display(), e))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))?;

    let mut cells = range.rows().map(|row| {
        row.iter()
            .map(|cell| {
                cell.as_string()
                    .map(|s| s.trim().to_string())
                    .unwrap_or_else(|| format!("{}", cell).trim().to_string())
            })
            .collect::<Vec<String>>()
    });

    let Some(headers) = cells.next() else {
        return Ok(Vec::new());
    };

    Ok(cells
        .filter_map(|values| rows_from_cells(&headers, values))
        .collect())
}

fn rows_from_cells(headers: &[String], values: Vec<String>) -> Option<SheetRow> {
    if values.iter().all(|v| v.is_empty()) {
        return None;
    }
    let mut row = SheetRow::new();
    for (column, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let value = values.get(column).cloned().unwrap_or_default();
        row.insert(header.clone(), Value::String(value));
    }
    Some(row)
}
