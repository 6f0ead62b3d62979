use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{
    cell_text, numeric_id, Sheet, SheetRow, CREATED_AT_COLUMN, CREATED_BY_COLUMN,
    UPDATED_AT_COLUMN, UPDATED_BY_COLUMN,
};

/// Sheet-style CRUD over the `sheet_rows` table. Every row is a JSON object
/// keyed by column header; ids live in the sheet's id column.
pub struct RowRepository {
    pool: SqlitePool,
    // Id generation reads then writes; writers go one at a time.
    write_lock: Mutex<()>,
}

#[derive(sqlx::FromRow)]
struct RowEntity {
    data: String,
}

impl RowEntity {
    fn into_row(self) -> Result<SheetRow> {
        serde_json::from_str(&self.data)
            .map_err(|e| AppError::DatabaseError(format!("Corrupt row data: {}", e)))
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl RowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_all_rows(&self, sheet: Sheet) -> Result<Vec<SheetRow>> {
        let entities = sqlx::query_as::<_, RowEntity>(
            "SELECT data FROM sheet_rows WHERE sheet = ? ORDER BY position ASC",
        )
        .bind(sheet.name())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(format!("Failed to read sheet '{}': {}", sheet.name(), e))
        })?;

        entities.into_iter().map(RowEntity::into_row).collect()
    }

    pub async fn get_row_by_id(&self, sheet: Sheet, id: &str) -> Result<Option<SheetRow>> {
        let entity = sqlx::query_as::<_, RowEntity>(
            "SELECT data FROM sheet_rows WHERE sheet = ? AND row_id = ?",
        )
        .bind(sheet.name())
        .bind(id.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read row {}: {}", id, e)))?;

        entity.map(RowEntity::into_row).transpose()
    }

    /// First row whose `column` equals `value`, ignoring case and surrounding spaces.
    pub async fn find_row(&self, sheet: Sheet, column: &str, value: &str) -> Result<Option<SheetRow>> {
        let needle = value.trim().to_lowercase();
        let rows = self.get_all_rows(sheet).await?;
        Ok(rows
            .into_iter()
            .find(|row| cell_text(row, column).trim().to_lowercase() == needle))
    }

    /// Appends a row. A missing or blank id gets `max(numeric ids) + 1`.
    pub async fn add_row(&self, sheet: Sheet, mut row: SheetRow, actor: &str) -> Result<SheetRow> {
        let _guard = self.write_lock.lock().await;
        let id_column = sheet.id_column();

        let id = match row.get(id_column).map(value_as_id) {
            Some(id) if !id.is_empty() => id,
            _ => {
                let next = self.next_numeric_id(sheet).await?;
                row.insert(id_column.to_string(), Value::from(next));
                next.to_string()
            }
        };

        let now = now_iso();
        row.insert(CREATED_AT_COLUMN.to_string(), Value::String(now.clone()));
        row.insert(CREATED_BY_COLUMN.to_string(), Value::String(actor.to_string()));

        let data = serde_json::to_string(&row)?;
        let result = sqlx::query(
            r#"
            INSERT INTO sheet_rows (sheet, row_id, position, data, created_at)
            VALUES (?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM sheet_rows WHERE sheet = ?), ?, ?)
            "#,
        )
        .bind(sheet.name())
        .bind(&id)
        .bind(sheet.name())
        .bind(&data)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(sheet = sheet.name(), id = %id, "Row added");
                Ok(row)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
                format!("Ya existe un registro con {} '{}' en '{}'", id_column, id, sheet.name()),
            )),
            Err(e) => Err(AppError::DatabaseError(format!(
                "Failed to add row to '{}': {}",
                sheet.name(),
                e
            ))),
        }
    }

    /// Merges `updates` into the stored row. The id column is never rewritten.
    /// Returns `None` when no row has that id.
    pub async fn update_row(
        &self,
        sheet: Sheet,
        id: &str,
        updates: SheetRow,
        actor: &str,
    ) -> Result<Option<SheetRow>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut row) = self.get_row_by_id(sheet, id).await? else {
            return Ok(None);
        };

        let id_column = sheet.id_column();
        for (column, value) in updates {
            if column == id_column {
                continue;
            }
            row.insert(column, value);
        }

        let now = now_iso();
        row.insert(UPDATED_AT_COLUMN.to_string(), Value::String(now.clone()));
        row.insert(UPDATED_BY_COLUMN.to_string(), Value::String(actor.to_string()));

        let data = serde_json::to_string(&row)?;
        sqlx::query("UPDATE sheet_rows SET data = ?, updated_at = ? WHERE sheet = ? AND row_id = ?")
            .bind(&data)
            .bind(&now)
            .bind(sheet.name())
            .bind(id.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to update row {}: {}", id, e)))?;

        Ok(Some(row))
    }

    pub async fn delete_row(&self, sheet: Sheet, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM sheet_rows WHERE sheet = ? AND row_id = ?")
            .bind(sheet.name())
            .bind(id.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete row {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    /// Distinct non-empty trimmed values of a column, in sheet order.
    pub async fn get_values_for_list(&self, sheet: Sheet, column: &str) -> Result<Vec<String>> {
        let rows = self.get_all_rows(sheet).await?;
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for row in &rows {
            let value = cell_text(row, column).trim().to_string();
            if !value.is_empty() && seen.insert(value.clone()) {
                values.push(value);
            }
        }
        if values.is_empty() && !rows.iter().any(|r| r.contains_key(column)) {
            debug!(sheet = sheet.name(), column, "Column not present in sheet");
        }
        Ok(values)
    }

    pub async fn count_rows(&self, sheet: Sheet) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sheet_rows WHERE sheet = ?")
            .bind(sheet.name())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count rows: {}", e)))
    }

    /// Swaps the whole sheet for `rows` in one transaction. Rows without an
    /// id are numbered from 1 in order.
    pub async fn replace_rows(&self, sheet: Sheet, rows: Vec<SheetRow>, actor: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let id_column = sheet.id_column();
        let now = now_iso();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to start transaction: {}", e)))?;

        sqlx::query("DELETE FROM sheet_rows WHERE sheet = ?")
            .bind(sheet.name())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to clear sheet: {}", e)))?;

        let mut next_generated = rows
            .iter()
            .filter_map(|r| r.get(id_column).and_then(numeric_id))
            .max()
            .unwrap_or(0)
            + 1;

        let mut seen_ids = HashSet::new();
        let total = rows.len();
        for (index, mut row) in rows.into_iter().enumerate() {
            let id = match row.get(id_column).map(value_as_id) {
                Some(id) if !id.is_empty() => id,
                _ => {
                    let id = next_generated;
                    next_generated += 1;
                    row.insert(id_column.to_string(), Value::from(id));
                    id.to_string()
                }
            };
            if !seen_ids.insert(id.clone()) {
                return Err(AppError::ValidationError(format!(
                    "{} '{}' se repite en la fila {}",
                    id_column,
                    id,
                    index + 2
                )));
            }
            row.insert(CREATED_AT_COLUMN.to_string(), Value::String(now.clone()));
            row.insert(CREATED_BY_COLUMN.to_string(), Value::String(actor.to_string()));
            let data = serde_json::to_string(&row)?;

            sqlx::query(
                "INSERT INTO sheet_rows (sheet, row_id, position, data, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(sheet.name())
            .bind(&id)
            .bind(index as i64 + 1)
            .bind(&data)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to insert row {}: {}", id, e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit import: {}", e)))?;

        info!(sheet = sheet.name(), rows = total, "Sheet replaced");
        Ok(total)
    }

    /// Column headers in first-seen order across rows.
    pub async fn headers(&self, sheet: Sheet) -> Result<Vec<String>> {
        let rows = self.get_all_rows(sheet).await?;
        Ok(collect_headers(&rows))
    }

    async fn next_numeric_id(&self, sheet: Sheet) -> Result<i64> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT row_id FROM sheet_rows WHERE sheet = ?")
            .bind(sheet.name())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to read ids: {}", e)))?;

        let max = ids
            .into_iter()
            .filter_map(|id| numeric_id(&Value::String(id)))
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }
}

pub fn collect_headers(rows: &[SheetRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.clone()) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

fn value_as_id(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::init_memory_db;
    use serde_json::json;

    fn row(value: Value) -> SheetRow {
        value.as_object().cloned().unwrap()
    }

    async fn repo() -> RowRepository {
        RowRepository::new(init_memory_db().await.unwrap())
    }

    #[tokio::test]
    async fn test_add_row_generates_sequential_ids() {
        let repo = repo().await;
        let first = repo
            .add_row(Sheet::Agents, row(json!({"Nombre": "Ana"})), "admin@x.sv")
            .await
            .unwrap();
        let second = repo
            .add_row(Sheet::Agents, row(json!({"Nombre": "Luis"})), "admin@x.sv")
            .await
            .unwrap();

        assert_eq!(first["ID_Agente"], json!(1));
        assert_eq!(second["ID_Agente"], json!(2));
        assert_eq!(first[CREATED_BY_COLUMN], json!("admin@x.sv"));
        assert!(first.contains_key(CREATED_AT_COLUMN));
    }

    #[tokio::test]
    async fn test_generated_id_skips_non_numeric() {
        let repo = repo().await;
        repo.add_row(Sheet::Companies, row(json!({"ID_REGEMP": "E-001"})), "s")
            .await
            .unwrap();
        repo.add_row(Sheet::Companies, row(json!({"ID_REGEMP": "7"})), "s")
            .await
            .unwrap();
        let generated = repo
            .add_row(Sheet::Companies, row(json!({"ID_REGEMP": ""})), "s")
            .await
            .unwrap();
        assert_eq!(generated["ID_REGEMP"], json!(8));
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let repo = repo().await;
        repo.add_row(Sheet::Offices, row(json!({"ID": "S01"})), "s")
            .await
            .unwrap();
        let err = repo
            .add_row(Sheet::Offices, row(json!({"ID": "S01"})), "s")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_row_by_id_compares_as_text() {
        let repo = repo().await;
        repo.add_row(Sheet::Agents, row(json!({"Nombre": "Ana"})), "s")
            .await
            .unwrap();
        let found = repo.get_row_by_id(Sheet::Agents, "1").await.unwrap();
        assert_eq!(found.unwrap()["Nombre"], json!("Ana"));
        assert!(repo.get_row_by_id(Sheet::Agents, "2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let repo = repo().await;
        repo.add_row(
            Sheet::Agents,
            row(json!({"Nombre": "Ana", "Estado": "Activo"})),
            "creator",
        )
        .await
        .unwrap();

        let updated = repo
            .update_row(
                Sheet::Agents,
                "1",
                row(json!({"Estado": "Inactivo", "ID_Agente": 99})),
                "editor",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["Nombre"], json!("Ana"));
        assert_eq!(updated["Estado"], json!("Inactivo"));
        assert_eq!(updated["ID_Agente"], json!(1));
        assert_eq!(updated[UPDATED_BY_COLUMN], json!("editor"));
        assert_eq!(updated[CREATED_BY_COLUMN], json!("creator"));

        let missing = repo
            .update_row(Sheet::Agents, "42", SheetRow::new(), "editor")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_row() {
        let repo = repo().await;
        repo.add_row(Sheet::Directorates, row(json!({"ID_DIRECCION": "DIR-01"})), "s")
            .await
            .unwrap();
        assert!(repo.delete_row(Sheet::Directorates, "DIR-01").await.unwrap());
        assert!(!repo.delete_row(Sheet::Directorates, "DIR-01").await.unwrap());
        assert_eq!(repo.count_rows(Sheet::Directorates).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_values_for_list_are_unique_and_trimmed() {
        let repo = repo().await;
        for value in ["AGENTE", " SUPERVISOR ", "AGENTE", "", "ADMINISTRADOR"] {
            repo.add_row(Sheet::Configuration, row(json!({"ROLES_AGENTE": value})), "s")
                .await
                .unwrap();
        }
        let values = repo
            .get_values_for_list(Sheet::Configuration, "ROLES_AGENTE")
            .await
            .unwrap();
        assert_eq!(values, vec!["AGENTE", "SUPERVISOR", "ADMINISTRADOR"]);

        let missing = repo
            .get_values_for_list(Sheet::Configuration, "NO_EXISTE")
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_replace_rows_keeps_order_and_rejects_duplicates() {
        let repo = repo().await;
        repo.add_row(Sheet::Offices, row(json!({"ID": "OLD"})), "s")
            .await
            .unwrap();

        let imported = repo
            .replace_rows(
                Sheet::Offices,
                vec![row(json!({"ID": "S02"})), row(json!({"ID": "S01"})), row(json!({}))],
                "import",
            )
            .await
            .unwrap();
        assert_eq!(imported, 3);

        let rows = repo.get_all_rows(Sheet::Offices).await.unwrap();
        let ids: Vec<String> = rows.iter().map(|r| cell_text(r, "ID")).collect();
        assert_eq!(ids, vec!["S02", "S01", "1"]);

        let err = repo
            .replace_rows(
                Sheet::Offices,
                vec![row(json!({"ID": "S01"})), row(json!({"ID": "S01"}))],
                "import",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        // Failed import leaves the previous contents.
        assert_eq!(repo.count_rows(Sheet::Offices).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_row_ignores_case() {
        let repo = repo().await;
        repo.add_row(
            Sheet::Agents,
            row(json!({"Email_Google": "Ana@Trabajo.gob.sv"})),
            "s",
        )
        .await
        .unwrap();
        let found = repo
            .find_row(Sheet::Agents, "Email_Google", " ana@trabajo.gob.sv ")
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn test_collect_headers_first_seen_order() {
        let rows = vec![
            row(json!({"B": 1, "A": 2})),
            row(json!({"C": 3, "A": 4})),
        ];
        let headers = collect_headers(&rows);
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[2], "C");
    }
}
