use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::submission::SubmitOutcome;
use crate::domain::activity::{actions, ActivityEntry};
use crate::domain::agent::Agent;
use crate::domain::error::{AppError, Result};
use crate::domain::options::ANONYMOUS_NAME;
use crate::domain::sheet::{cell_text, Sheet, SheetRow};
use crate::domain::suggestion::{SuggestionBoxForm, SuggestionStatus};
use crate::infrastructure::db::rows::RowRepository;
use crate::shared::text::{normalize_text, normalize_upper};

pub const STATUS_COLUMN: &str = "Estado";

/// Buzón de Quejas y Sugerencias: complaints about the ministry itself.
pub struct SuggestionBoxService {
    rows: Arc<RowRepository>,
    audit: Arc<AuditService>,
}

impl SuggestionBoxService {
    pub fn new(rows: Arc<RowRepository>, audit: Arc<AuditService>) -> Self {
        Self { rows, audit }
    }

    pub async fn submit(&self, form: &SuggestionBoxForm, agent: &Agent) -> Result<SubmitOutcome> {
        let issues = form.issues();
        if !issues.is_empty() {
            return Ok(SubmitOutcome::Rejected { issues });
        }

        let name = if form.es_anonimo {
            ANONYMOUS_NAME.to_string()
        } else {
            normalize_upper(&form.nombre)
        };

        let mut row = SheetRow::new();
        row.insert("Es_Anonimo".to_string(), json!(form.es_anonimo));
        row.insert("Nombre".to_string(), json!(name));
        row.insert("Email".to_string(), json!(normalize_text(&form.email)));
        row.insert("Sede".to_string(), json!(normalize_text(&form.sede_denunciada)));
        row.insert("Direcciones".to_string(), json!(join(&form.direcciones_denunciadas)));
        row.insert(
            "Servicio".to_string(),
            json!(normalize_text(&form.servicio_inconveniente)),
        );
        row.insert(
            "Funcionarios".to_string(),
            json!(join(&form.funcionario_denunciado).to_uppercase()),
        );
        row.insert(
            "Nombre_Funcionario".to_string(),
            json!(normalize_upper(&form.nombre_funcionario)),
        );
        row.insert("Comentario".to_string(), json!(form.consulta_usuario.trim()));
        row.insert("Respuesta_Agente".to_string(), json!(form.respuesta_agente.trim()));
        row.insert(
            STATUS_COLUMN.to_string(),
            json!(SuggestionStatus::Pendiente.as_str()),
        );
        row.insert("Agente_Email".to_string(), json!(agent.email));

        let stored = self.rows.add_row(Sheet::Feedback, row, &agent.email).await?;
        let id = cell_text(&stored, Sheet::Feedback.id_column());

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::SUBMIT_FEEDBACK,
                    Sheet::Feedback.entity(),
                    format!("Sugerencia {} sobre {}", id, form.sede_denunciada.trim()),
                )
                .by(Some(&agent.id), Some(&agent.email))
                .on(Some(&id)),
            )
            .await;

        info!(id = %id, "Suggestion box entry stored");
        Ok(SubmitOutcome::Created { id, row: stored })
    }

    /// Entries, optionally narrowed to one status.
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<SheetRow>> {
        let wanted = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(SuggestionStatus::parse(raw).ok_or_else(|| {
                AppError::ValidationError(format!("Estado de sugerencia inválido: {}", raw))
            })?),
            None => None,
        };

        let rows = self.rows.get_all_rows(Sheet::Feedback).await?;
        Ok(rows
            .into_iter()
            .filter(|row| match wanted {
                Some(status) => SuggestionStatus::parse(&cell_text(row, STATUS_COLUMN)) == Some(status),
                None => true,
            })
            .collect())
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: SuggestionStatus,
        note: Option<&str>,
        agent: &Agent,
    ) -> Result<SheetRow> {
        let mut updates = SheetRow::new();
        updates.insert(STATUS_COLUMN.to_string(), json!(status.as_str()));
        if let Some(note) = note.map(str::trim).filter(|n| !n.is_empty()) {
            updates.insert("Nota_Seguimiento".to_string(), json!(note));
        }

        let updated = self
            .rows
            .update_row(Sheet::Feedback, id, updates, &agent.email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sugerencia {} no encontrada", id)))?;

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::UPDATE_FEEDBACK_STATUS,
                    Sheet::Feedback.entity(),
                    format!("Estado cambiado a {}", status.as_str()),
                )
                .by(Some(&agent.id), Some(&agent.email))
                .on(Some(id)),
            )
            .await;

        Ok(updated)
    }
}

fn join(values: &[String]) -> String {
    values
        .iter()
        .map(|v| normalize_text(v))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}
