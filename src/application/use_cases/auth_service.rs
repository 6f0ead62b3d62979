use std::sync::Arc;
use tracing::warn;

use crate::application::use_cases::agents_service::agent_from_row;
use crate::application::use_cases::audit_service::AuditService;
use crate::domain::activity::{actions, ActivityEntry};
use crate::domain::agent::{Agent, Role};
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::Sheet;
use crate::infrastructure::db::rows::RowRepository;

pub const AUTH_ENTITY: &str = "AUTH";

pub const UNIDENTIFIED: &str = "No se pudo identificar al usuario autenticado. Asegúrese de haber iniciado sesión con su cuenta de Google.";
pub const NOT_REGISTERED: &str =
    "Acceso denegado: Su cuenta de correo electrónico no está registrada como agente en el sistema.";
pub const INACTIVE: &str = "Su cuenta de agente está inactiva. Contacte a un administrador.";
pub const UNKNOWN_ROLE: &str = "Acceso denegado: Su rol de agente es desconocido o inválido.";

/// Resolves the caller's identity to an active agent and checks roles.
pub struct AuthService {
    rows: Arc<RowRepository>,
    audit: Arc<AuditService>,
}

impl AuthService {
    pub fn new(rows: Arc<RowRepository>, audit: Arc<AuditService>) -> Self {
        Self { rows, audit }
    }

    pub async fn authenticate(&self, email: Option<&str>) -> Result<Agent> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            self.audit
                .log_activity(ActivityEntry::new(
                    actions::AUTH_FAILED,
                    AUTH_ENTITY,
                    "No se pudo obtener el email del usuario activo.",
                ))
                .await;
            return Err(AppError::Unauthorized(UNIDENTIFIED.to_string()));
        };

        let agent = self
            .rows
            .find_row(Sheet::Agents, "Email_Google", email)
            .await?
            .map(agent_from_row)
            .transpose()?;

        let Some(agent) = agent else {
            warn!(email = %email, "Unregistered account attempted access");
            self.audit
                .log_activity(
                    ActivityEntry::new(
                        actions::AUTH_FAILED,
                        Sheet::Agents.name(),
                        format!("Intento de acceso de email no registrado: {}", email),
                    )
                    .by(None, Some(email)),
                )
                .await;
            return Err(AppError::Forbidden(NOT_REGISTERED.to_string()));
        };

        if !agent.is_active() {
            self.audit
                .log_activity(
                    ActivityEntry::new(
                        actions::AUTH_FAILED,
                        Sheet::Agents.name(),
                        format!("Intento de acceso de agente inactivo: {}", email),
                    )
                    .by(Some(&agent.id), Some(email))
                    .on(Some(&agent.id)),
                )
                .await;
            return Err(AppError::Forbidden(INACTIVE.to_string()));
        }

        Ok(agent)
    }

    /// Passes when the agent's role is at or above `required` in the hierarchy.
    pub async fn authorize(&self, agent: &Agent, required: Role, entity: &str, action: &str) -> Result<()> {
        let Some(role) = agent.role() else {
            self.audit
                .log_activity(
                    ActivityEntry::new(
                        actions::AUTH_FAILED_UNKNOWN_ROLE,
                        entity,
                        format!(
                            "Rol desconocido '{}' para la acción '{}'. Rol requerido: {}",
                            agent.rol,
                            action,
                            required.as_str()
                        ),
                    )
                    .by(Some(&agent.id), Some(&agent.email)),
                )
                .await;
            return Err(AppError::Forbidden(UNKNOWN_ROLE.to_string()));
        };

        if role.satisfies(required) {
            return Ok(());
        }

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::AUTH_FAILED_DENIED,
                    entity,
                    format!(
                        "Acceso denegado a '{}'. Rol del agente: {}, rol requerido: {}",
                        action,
                        role.as_str(),
                        required.as_str()
                    ),
                )
                .by(Some(&agent.id), Some(&agent.email)),
            )
            .await;
        Err(AppError::Forbidden(format!(
            "Acceso denegado: No tiene los permisos necesarios (Rol requerido: {}).",
            required.as_str()
        )))
    }
}

/// Exact role match, ignoring case.
pub fn has_role(agent: &Agent, role: Role) -> bool {
    agent.rol.trim().eq_ignore_ascii_case(role.as_str())
}
