// Workbook import and export for the sheet store.
//
// A workbook file is named after the sheet it loads (`Sedes.csv`,
// `Empresas.xlsx`, ...). Only catalog sheets are importable.

pub mod csv_reader;
pub mod export;
pub mod xlsx_reader;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{Sheet, SheetRow};
use crate::infrastructure::db::rows::RowRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Csv,
    Xlsx,
}

impl WorkbookFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub sheet: String,
    pub file: String,
    pub rows: usize,
}

/// Rows of a workbook file. Format follows the extension.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetRow>> {
    match WorkbookFormat::from_path(path) {
        Some(WorkbookFormat::Csv) => {
            let bytes = std::fs::read(path)?;
            csv_reader::parse_csv(&bytes)
        }
        Some(WorkbookFormat::Xlsx) => xlsx_reader::parse_xlsx(path),
        None => Err(AppError::ValidationError(format!(
            "Formato de archivo no soportado: {}",
            path.display()
        ))),
    }
}

/// Catalog sheet a workbook file loads into, from its file stem.
pub fn sheet_for_file(path: &Path) -> Option<Sheet> {
    WorkbookFormat::from_path(path)?;
    let stem = path.file_stem()?.to_str()?;
    Sheet::from_name(stem).filter(Sheet::is_catalog)
}

/// Replaces `sheet` with the rows of `path`.
pub async fn import_file(
    repo: &RowRepository,
    sheet: Sheet,
    path: &Path,
    actor: &str,
) -> Result<ImportSummary> {
    if !sheet.is_catalog() {
        return Err(AppError::Forbidden(format!(
            "La hoja '{}' no admite importación",
            sheet.name()
        )));
    }
    let rows = read_workbook(path)?;
    if rows.is_empty() {
        return Err(AppError::ValidationError(format!(
            "El archivo {} no contiene filas",
            path.display()
        )));
    }
    let count = repo.replace_rows(sheet, rows, actor).await?;
    info!(sheet = sheet.name(), file = %path.display(), rows = count, "Workbook imported");
    Ok(ImportSummary {
        sheet: sheet.name().to_string(),
        file: file_name(path),
        rows: count,
    })
}

/// Resolves a caller-supplied file name inside `dir`. Paths that would
/// leave the directory are rejected.
pub fn resolve_in_dir(dir: &Path, file: &str) -> Result<PathBuf> {
    let candidate = Path::new(file.trim());
    let simple = candidate.components().count() == 1
        && candidate
            .file_name()
            .map(|name| name == candidate.as_os_str())
            .unwrap_or(false);
    if !simple {
        return Err(AppError::SecurityError(format!(
            "Nombre de archivo no permitido: {}",
            file
        )));
    }
    let path = dir.join(candidate);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("Archivo no encontrado: {}", file)));
    }
    Ok(path)
}

/// Imports every workbook in `dir` whose name matches a catalog sheet.
/// A file that fails is logged and skipped.
pub async fn import_dir(repo: &RowRepository, dir: &Path, actor: &str) -> Result<Vec<ImportSummary>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let mut summaries = Vec::new();
    for path in entries {
        let Some(sheet) = sheet_for_file(&path) else {
            continue;
        };
        match import_file(repo, sheet, &path, actor).await {
            Ok(summary) => summaries.push(summary),
            Err(e) => warn!(file = %path.display(), error = %e, "Skipping workbook"),
        }
    }
    Ok(summaries)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}
