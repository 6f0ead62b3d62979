//! Reference data behind the intake form
//!
//! Read access to every catalog sheet plus the few mutations the call
//! center performs from the form itself:
//! - Companies registered on the fly while filing a complaint
//! - Workers saved after a document lookup misses
//! - Services and configuration lists maintained by administrators

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::application::use_cases::audit_service::AuditService;
use crate::domain::activity::{actions, ActivityEntry};
use crate::domain::agent::Agent;
use crate::domain::catalog::{Company, WorkerRecord};
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{cell_text, Sheet, SheetRow};
use crate::domain::validation::{issues_from_errors, summarize};
use crate::infrastructure::db::rows::{now_iso, RowRepository};
use crate::shared::text::contains_folded;

pub const SERVICE_STATUS_COLUMN: &str = "ESTADO";
pub const SERVICE_ACTIVE: &str = "ACTIVO";
pub const SERVICE_INACTIVE: &str = "INACTIVO";

static CONFIG_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

pub struct CatalogService {
    rows: Arc<RowRepository>,
    audit: Arc<AuditService>,
}

impl CatalogService {
    pub fn new(rows: Arc<RowRepository>, audit: Arc<AuditService>) -> Self {
        Self { rows, audit }
    }

    pub async fn list(&self, sheet: Sheet) -> Result<Vec<SheetRow>> {
        self.rows.get_all_rows(sheet).await
    }

    pub async fn get(&self, sheet: Sheet, id: &str) -> Result<Option<SheetRow>> {
        self.rows.get_row_by_id(sheet, id).await
    }

    // Services

    pub async fn list_active_services(&self) -> Result<Vec<SheetRow>> {
        let rows = self.rows.get_all_rows(Sheet::Services).await?;
        Ok(rows
            .into_iter()
            .filter(|row| {
                cell_text(row, SERVICE_STATUS_COLUMN)
                    .trim()
                    .eq_ignore_ascii_case(SERVICE_ACTIVE)
            })
            .collect())
    }

    pub async fn create_service(&self, mut data: SheetRow, actor: &Agent) -> Result<SheetRow> {
        if cell_text(&data, "NOMBRE_SERVICIO").trim().is_empty() {
            return Err(AppError::ValidationError(
                "El nombre del servicio es requerido.".to_string(),
            ));
        }
        if cell_text(&data, SERVICE_STATUS_COLUMN).trim().is_empty() {
            data.insert(SERVICE_STATUS_COLUMN.to_string(), json!(SERVICE_ACTIVE));
        }

        let row = self.rows.add_row(Sheet::Services, data, &actor.email).await?;
        let id = cell_text(&row, Sheet::Services.id_column());
        self.log(
            actor,
            actions::CREATE_SERVICE,
            Sheet::Services,
            &id,
            format!("Servicio creado: {}", cell_text(&row, "NOMBRE_SERVICIO")),
        )
        .await;
        Ok(row)
    }

    pub async fn update_service(&self, id: &str, data: SheetRow, actor: &Agent) -> Result<SheetRow> {
        let row = self
            .rows
            .update_row(Sheet::Services, id, data, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Servicio no encontrado".to_string()))?;
        self.log(
            actor,
            actions::UPDATE_SERVICE,
            Sheet::Services,
            id,
            format!("Servicio actualizado: {}", cell_text(&row, "NOMBRE_SERVICIO")),
        )
        .await;
        Ok(row)
    }

    pub async fn deactivate_service(&self, id: &str, actor: &Agent) -> Result<SheetRow> {
        let mut updates = SheetRow::new();
        updates.insert(SERVICE_STATUS_COLUMN.to_string(), json!(SERVICE_INACTIVE));
        let row = self
            .rows
            .update_row(Sheet::Services, id, updates, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Servicio no encontrado".to_string()))?;
        self.log(
            actor,
            actions::DEACTIVATE_SERVICE,
            Sheet::Services,
            id,
            format!("Servicio desactivado: {}", cell_text(&row, "NOMBRE_SERVICIO")),
        )
        .await;
        Ok(row)
    }

    // Companies

    pub async fn companies(&self) -> Result<Vec<Company>> {
        self.rows
            .get_all_rows(Sheet::Companies)
            .await?
            .into_iter()
            .map(typed)
            .collect()
    }

    /// Companies whose legal or trade name contains `query`, ignoring case
    /// and extra spaces. An empty query returns every company.
    pub async fn search_companies(&self, query: &str) -> Result<Vec<Company>> {
        Ok(self
            .companies()
            .await?
            .into_iter()
            .filter(|c| {
                contains_folded(&c.razon_social, query) || contains_folded(&c.nombre_comercial, query)
            })
            .collect())
    }

    /// Registers a company. Both timestamps are set to now.
    pub async fn create_company(&self, mut data: SheetRow, actor: &Agent) -> Result<Company> {
        data.remove(Sheet::Companies.id_column());
        check::<Company>(&data)?;

        let now = now_iso();
        data.insert("FECHA_REGISTRO".to_string(), json!(now));
        data.insert("FECHA_MODIFICACION".to_string(), json!(now));

        let row = self.rows.add_row(Sheet::Companies, data, &actor.email).await?;
        let company: Company = typed(row)?;
        self.log(
            actor,
            actions::CREATE_COMPANY,
            Sheet::Companies,
            &company.id,
            format!("Empresa registrada: {}", company.razon_social),
        )
        .await;
        info!(company_id = %company.id, "Company registered");
        Ok(company)
    }

    pub async fn update_company(&self, id: &str, mut data: SheetRow, actor: &Agent) -> Result<Company> {
        let Some(mut merged) = self.rows.get_row_by_id(Sheet::Companies, id).await? else {
            return Err(AppError::NotFound("Empresa no encontrada".to_string()));
        };
        data.remove("FECHA_REGISTRO");
        data.insert("FECHA_MODIFICACION".to_string(), json!(now_iso()));
        for (column, value) in &data {
            merged.insert(column.clone(), value.clone());
        }
        check::<Company>(&merged)?;

        let row = self
            .rows
            .update_row(Sheet::Companies, id, data, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Empresa no encontrada".to_string()))?;
        let company: Company = typed(row)?;
        self.log(
            actor,
            actions::UPDATE_COMPANY,
            Sheet::Companies,
            id,
            format!("Empresa actualizada: {}", company.razon_social),
        )
        .await;
        Ok(company)
    }

    // Workers

    /// Lookup by `KEY_ATUS`, e.g. `DUI-014735502`. The key is upper-cased first.
    pub async fn find_user_by_key(&self, key: &str) -> Result<Option<WorkerRecord>> {
        let key = key.trim().to_uppercase();
        if key.is_empty() {
            return Ok(None);
        }
        self.rows
            .get_row_by_id(Sheet::Users, &key)
            .await?
            .map(typed)
            .transpose()
    }

    pub async fn create_user(&self, mut data: SheetRow, actor: &Agent) -> Result<WorkerRecord> {
        let worker: WorkerRecord = check(&data)?;
        let key = worker.derived_key();
        data.insert(Sheet::Users.id_column().to_string(), json!(key));

        let row = self.rows.add_row(Sheet::Users, data, &actor.email).await?;
        let worker: WorkerRecord = typed(row)?;
        self.log(
            actor,
            actions::CREATE_USER,
            Sheet::Users,
            &worker.key,
            format!(
                "Usuario registrado: {} {}",
                worker.nombre_usuario, worker.apellido_usuario
            ),
        )
        .await;
        Ok(worker)
    }

    /// The key never changes, even when the document columns do.
    pub async fn update_user(&self, key: &str, data: SheetRow, actor: &Agent) -> Result<WorkerRecord> {
        let key = key.trim().to_uppercase();
        let row = self
            .rows
            .update_row(Sheet::Users, &key, data, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuario no encontrado".to_string()))?;
        let worker: WorkerRecord = typed(row)?;
        self.log(
            actor,
            actions::UPDATE_USER,
            Sheet::Users,
            &key,
            format!(
                "Usuario actualizado: {} {}",
                worker.nombre_usuario, worker.apellido_usuario
            ),
        )
        .await;
        Ok(worker)
    }

    // Configuration

    pub async fn config_list(&self, key: &str) -> Result<Vec<String>> {
        let key = config_key(key)?;
        self.rows.get_values_for_list(Sheet::Configuration, &key).await
    }

    /// Appends `value` to the list under `key`, filling the first row whose
    /// cell in that column is empty.
    pub async fn add_config_value(&self, key: &str, value: &str, actor: &Agent) -> Result<SheetRow> {
        let key = config_key(key)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::ValidationError(
                "El valor de configuración es requerido.".to_string(),
            ));
        }

        let rows = self.rows.get_all_rows(Sheet::Configuration).await?;
        if rows.iter().any(|r| cell_text(r, &key).trim() == value) {
            return Err(AppError::Conflict(format!(
                "El valor '{}' ya existe en '{}'.",
                value, key
            )));
        }

        let mut cell = SheetRow::new();
        cell.insert(key.clone(), Value::String(value.to_string()));
        let free = rows
            .iter()
            .find(|r| cell_text(r, &key).trim().is_empty())
            .map(|r| cell_text(r, Sheet::Configuration.id_column()));

        let row = match free {
            Some(id) => self
                .rows
                .update_row(Sheet::Configuration, &id, cell, &actor.email)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Fila de configuración {} no encontrada", id)))?,
            None => self.rows.add_row(Sheet::Configuration, cell, &actor.email).await?,
        };

        let id = cell_text(&row, Sheet::Configuration.id_column());
        self.log(
            actor,
            actions::UPDATE_CONFIGURATION,
            Sheet::Configuration,
            &id,
            format!("Valor '{}' agregado a {}", value, key),
        )
        .await;
        Ok(row)
    }

    pub async fn update_config_row(&self, id: &str, data: SheetRow, actor: &Agent) -> Result<SheetRow> {
        for column in data.keys() {
            config_key(column)?;
        }
        let columns = data.keys().cloned().collect::<Vec<_>>().join(", ");
        let row = self
            .rows
            .update_row(Sheet::Configuration, id, data, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fila de configuración {} no encontrada", id)))?;
        self.log(
            actor,
            actions::UPDATE_CONFIGURATION,
            Sheet::Configuration,
            id,
            format!("Configuración actualizada: {}", columns),
        )
        .await;
        Ok(row)
    }

    async fn log(&self, actor: &Agent, action: &str, sheet: Sheet, id: &str, details: String) {
        self.audit
            .log_activity(
                ActivityEntry::new(action, sheet.name(), details)
                    .by(Some(&actor.id), Some(&actor.email))
                    .on(Some(id)),
            )
            .await;
    }
}

fn typed<T: DeserializeOwned>(row: SheetRow) -> Result<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| AppError::DatabaseError(format!("Invalid catalog row: {}", e)))
}

/// Parses and validates a row as `T`.
fn check<T: DeserializeOwned + Validate>(data: &SheetRow) -> Result<T> {
    let record: T = serde_json::from_value(Value::Object(data.clone()))
        .map_err(|e| AppError::ValidationError(e.to_string()))?;
    if let Err(errors) = record.validate() {
        let issues = issues_from_errors(&errors, &[]);
        return Err(AppError::ValidationError(summarize(&issues)));
    }
    Ok(record)
}

fn config_key(key: &str) -> Result<String> {
    let key = key.trim().to_uppercase();
    if CONFIG_KEY_RE.is_match(&key) && key != Sheet::Configuration.id_column() {
        return Ok(key);
    }
    Err(AppError::ValidationError(format!(
        "Clave de configuración inválida: '{}'",
        key
    )))
}
