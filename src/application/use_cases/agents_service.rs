use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::application::use_cases::audit_service::AuditService;
use crate::domain::activity::{actions, ActivityEntry};
use crate::domain::agent::{Agent, AgentStatus, Role};
use crate::domain::contact::is_valid_email;
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{cell_text, Sheet, SheetRow};
use crate::infrastructure::db::rows::RowRepository;

pub const ROLES_CONFIG_KEY: &str = "ROLES_AGENTE";
const REQUIRED_FIELDS: &[&str] = &["Nombre", "Apellido", "Email_Google", "Rol", "Estado"];
const ALLOWED_STATES: &str = "Activo, Inactivo";

pub fn agent_from_row(row: SheetRow) -> Result<Agent> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| AppError::DatabaseError(format!("Invalid agent row: {}", e)))
}

/// Administration of the `Agentes` sheet.
pub struct AgentsService {
    rows: Arc<RowRepository>,
    audit: Arc<AuditService>,
}

impl AgentsService {
    pub fn new(rows: Arc<RowRepository>, audit: Arc<AuditService>) -> Self {
        Self { rows, audit }
    }

    pub async fn create(&self, mut data: SheetRow, actor: &Agent) -> Result<Agent> {
        let missing = REQUIRED_FIELDS
            .iter()
            .any(|field| cell_text(&data, field).trim().is_empty());
        if missing {
            return Err(AppError::ValidationError(format!(
                "Datos incompletos para crear un agente. Se requieren: {}",
                REQUIRED_FIELDS.join(", ")
            )));
        }

        let email = cell_text(&data, "Email_Google").trim().to_string();
        check_email_format(&email, "El email")?;
        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "El email '{}' ya está registrado para otro agente.",
                email
            )));
        }
        self.check_role(&cell_text(&data, "Rol")).await?;
        check_state(&cell_text(&data, "Estado"))?;

        data.remove(Sheet::Agents.id_column());
        data.insert("Email_Google".to_string(), json!(email));
        let row = self.rows.add_row(Sheet::Agents, data, &actor.email).await?;
        let agent = agent_from_row(row)?;

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::CREATE_AGENT,
                    Sheet::Agents.name(),
                    format!("Nuevo agente creado: {} ({})", agent.full_name(), agent.email),
                )
                .by(Some(&actor.id), Some(&actor.email))
                .on(Some(&agent.id)),
            )
            .await;

        info!(agent_id = %agent.id, "Agent created");
        Ok(agent)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Agent>> {
        check_numeric_id(id, "ID de agente inválido. Debe ser numérico.")?;
        self.rows
            .get_row_by_id(Sheet::Agents, id)
            .await?
            .map(agent_from_row)
            .transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Agent>> {
        check_email_format(email, "El email")?;
        self.find_by_email(email).await
    }

    pub async fn update(&self, id: &str, mut data: SheetRow, actor: &Agent) -> Result<Option<Agent>> {
        check_numeric_id(id, "ID de agente inválido para actualizar. Debe ser numérico.")?;
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let new_email = cell_text(&data, "Email_Google").trim().to_string();
        if !new_email.is_empty() && !new_email.eq_ignore_ascii_case(existing.email.trim()) {
            check_email_format(&new_email, "El nuevo email")?;
            if let Some(other) = self.find_by_email(&new_email).await? {
                if other.id != existing.id {
                    return Err(AppError::Conflict(format!(
                        "El email '{}' ya está registrado para otro agente.",
                        new_email
                    )));
                }
            }
            data.insert("Email_Google".to_string(), json!(new_email));
        }

        let role = cell_text(&data, "Rol");
        if !role.trim().is_empty() {
            self.check_role(&role).await?;
        }
        let state = cell_text(&data, "Estado");
        if !state.trim().is_empty() {
            check_state(&state)?;
        }

        let Some(row) = self.rows.update_row(Sheet::Agents, id, data, &actor.email).await? else {
            return Ok(None);
        };
        let updated = agent_from_row(row)?;

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::UPDATE_AGENT,
                    Sheet::Agents.name(),
                    format!(
                        "Agente actualizado: {} a {}",
                        existing.full_name(),
                        updated.full_name()
                    ),
                )
                .by(Some(&actor.id), Some(&actor.email))
                .on(Some(id)),
            )
            .await;

        Ok(Some(updated))
    }

    pub async fn list(&self, status: Option<&str>) -> Result<Vec<Agent>> {
        let wanted = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(AgentStatus::parse(raw).ok_or_else(|| {
                AppError::ValidationError(format!(
                    "El filtro de estado '{}' no es válido. Use 'Activo' o 'Inactivo'.",
                    raw
                ))
            })?),
            None => None,
        };

        let agents = self
            .rows
            .get_all_rows(Sheet::Agents)
            .await?
            .into_iter()
            .map(agent_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(match wanted {
            Some(status) => agents
                .into_iter()
                .filter(|a| a.estado.trim() == status.as_str())
                .collect(),
            None => agents,
        })
    }

    /// Agents are never removed; they are marked `Inactivo`.
    pub async fn deactivate(&self, id: &str, actor: &Agent) -> Result<Option<Agent>> {
        check_numeric_id(id, "ID de agente inválido para desactivar. Debe ser numérico.")?;
        let mut updates = SheetRow::new();
        updates.insert("Estado".to_string(), json!(AgentStatus::Inactivo.as_str()));

        let Some(row) = self.rows.update_row(Sheet::Agents, id, updates, &actor.email).await? else {
            return Ok(None);
        };
        let agent = agent_from_row(row)?;

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::DEACTIVATE_AGENT,
                    Sheet::Agents.name(),
                    format!("Agente desactivado: {}", agent.full_name()),
                )
                .by(Some(&actor.id), Some(&actor.email))
                .on(Some(id)),
            )
            .await;

        Ok(Some(agent))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Agent>> {
        self.rows
            .find_row(Sheet::Agents, "Email_Google", email)
            .await?
            .map(agent_from_row)
            .transpose()
    }

    /// Roles come from the configuration sheet; the built-in hierarchy
    /// applies when that list is empty.
    async fn check_role(&self, role: &str) -> Result<()> {
        let mut allowed = self
            .rows
            .get_values_for_list(Sheet::Configuration, ROLES_CONFIG_KEY)
            .await?;
        if allowed.is_empty() {
            allowed = Role::HIERARCHY.iter().map(|r| r.as_str().to_string()).collect();
        }
        if allowed.iter().any(|r| r == role.trim()) {
            return Ok(());
        }
        Err(AppError::ValidationError(format!(
            "El rol '{}' no es un rol permitido. Roles válidos: {}.",
            role,
            allowed.join(", ")
        )))
    }
}

fn check_email_format(email: &str, subject: &str) -> Result<()> {
    if is_valid_email(email) {
        return Ok(());
    }
    Err(AppError::ValidationError(format!(
        "{} '{}' no tiene un formato válido.",
        subject, email
    )))
}

fn check_state(state: &str) -> Result<()> {
    if AgentStatus::parse(state).is_some() {
        return Ok(());
    }
    Err(AppError::ValidationError(format!(
        "El estado '{}' no es un estado permitido. Estados válidos: {}.",
        state, ALLOWED_STATES
    )))
}

pub(crate) fn check_numeric_id(id: &str, message: &str) -> Result<()> {
    let id = id.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    Err(AppError::ValidationError(message.to_string()))
}
