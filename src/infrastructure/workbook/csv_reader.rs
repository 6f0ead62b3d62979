// ============================================================
// CSV WORKBOOK READER
// ============================================================
// Sheet exports from the ministry arrive as CSV with `,` or `;`
// and either UTF-8 or Windows-1252 text.

use csv::{ReaderBuilder, Trim};
use serde_json::Value;

use crate::domain::error::{AppError, Result};
use crate::domain::sheet::SheetRow;

/// Decode bytes as UTF-8 (BOM stripped), falling back to Windows-1252.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Detect delimiter from content (comma, semicolon, tab, pipe)
pub fn detect_delimiter(content: &str) -> u8 {
    let candidates = [b',', b';', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();
    if sample_lines.is_empty() {
        return b',';
    }

    let mut best_delimiter = b',';
    let mut best_score = 0.0f32;

    for &delimiter in &candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| line.bytes().filter(|&b| b == delimiter).count())
            .collect();

        // Frequent and consistent across lines wins.
        let avg = counts.iter().sum::<usize>() as f32 / counts.len() as f32;
        let variance =
            counts.iter().map(|&x| (x as f32 - avg).powi(2)).sum::<f32>() / counts.len() as f32;
        let score = avg / (1.0 + variance.sqrt());

        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

/// First record is the header row. Blank header cells and blank rows are skipped.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<SheetRow>> {
    let content = decode_text(bytes);
    let delimiter = detect_delimiter(&content);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 2, e))
        })?;

        let mut row = SheetRow::new();
        for (column, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = record.get(column).unwrap_or("");
            row.insert(header.to_string(), Value::String(value.to_string()));
        }
        if row.values().all(|v| v.as_str().map(str::is_empty).unwrap_or(false)) {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}
