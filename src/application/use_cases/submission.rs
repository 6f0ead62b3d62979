//! Case submission
//!
//! A submitted form is normalized, validated and reduced to the fields the
//! agent could actually see. The stored row keeps a few key columns for
//! listing plus the full payload under `Datos`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::case_validation::CaseValidator;
use crate::application::use_cases::form_effects::normalize_for_submission;
use crate::application::use_cases::visibility::SectionVisibility;
use crate::domain::activity::{actions, ActivityEntry};
use crate::domain::agent::Agent;
use crate::domain::case_form::CaseForm;
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{cell_text, Sheet, SheetRow};
use crate::domain::validation::ValidationIssue;
use crate::infrastructure::db::fingerprints::FingerprintRepository;
use crate::infrastructure::db::rows::RowRepository;

pub const PAYLOAD_COLUMN: &str = "Datos";
pub const COMPANY_SIZE_FIELD: &str = "clasificacionEmpresa";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseEvaluation {
    pub visibility: SectionVisibility,
    pub visible_fields: Vec<&'static str>,
    pub issues: Vec<ValidationIssue>,
    pub company_size: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created { id: String, row: SheetRow },
    Rejected { issues: Vec<ValidationIssue> },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseFilter {
    pub agent_id: Option<String>,
    pub service: Option<String>,
}

/// Normalized form restricted to the visible fields, plus the company size
/// band for complaints.
pub fn build_payload(form: &CaseForm) -> Result<Map<String, Value>> {
    let mut form = form.clone();
    normalize_for_submission(&mut form);
    let visibility = SectionVisibility::evaluate(&form);
    let visible = visibility.visible_fields();

    let full = match serde_json::to_value(&form)? {
        Value::Object(map) => map,
        _ => return Err(AppError::Internal("Case form did not serialize to an object".to_string())),
    };

    let mut payload: Map<String, Value> = full
        .into_iter()
        .filter(|(key, _)| visible.contains(&key.as_str()))
        .collect();

    if visibility.complaint && !visibility.company_size.is_empty() {
        payload.insert(COMPANY_SIZE_FIELD.to_string(), json!(visibility.company_size));
    }
    Ok(payload)
}

/// SHA-256 of the payload JSON. Map keys are ordered, so equal payloads hash equally.
pub fn fingerprint(payload: &Map<String, Value>) -> Result<String> {
    let canonical = serde_json::to_string(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

pub struct CaseService {
    rows: Arc<RowRepository>,
    fingerprints: FingerprintRepository,
    audit: Arc<AuditService>,
    duplicate_window_secs: i64,
    /// Held from the duplicate check until the fingerprint is recorded.
    submit_lock: Mutex<()>,
}

impl CaseService {
    pub fn new(
        rows: Arc<RowRepository>,
        audit: Arc<AuditService>,
        duplicate_window_secs: u64,
    ) -> Self {
        let fingerprints = FingerprintRepository::new(rows.pool().clone());
        Self {
            rows,
            fingerprints,
            audit,
            duplicate_window_secs: duplicate_window_secs as i64,
            submit_lock: Mutex::new(()),
        }
    }

    /// Visibility and issues for the current state. No side effects.
    pub fn evaluate(&self, form: &CaseForm) -> CaseEvaluation {
        let visibility = SectionVisibility::evaluate(form);
        CaseEvaluation {
            visible_fields: visibility.visible_fields(),
            company_size: visibility.company_size,
            issues: CaseValidator::validate(form).issues,
            visibility,
        }
    }

    pub async fn submit(&self, form: &CaseForm, agent: &Agent) -> Result<SubmitOutcome> {
        let mut normalized = form.clone();
        normalize_for_submission(&mut normalized);

        let report = CaseValidator::validate(&normalized);
        if !report.is_valid() {
            info!(agent = %agent.email, issues = report.issues.len(), "Case rejected by validation");
            return Ok(SubmitOutcome::Rejected {
                issues: report.issues,
            });
        }

        let payload = build_payload(&normalized)?;
        let hash = fingerprint(&payload)?;

        let guard = self.submit_lock.lock().await;
        let now = Utc::now().timestamp();
        let since = now - self.duplicate_window_secs;

        if let Some(existing) = self.fingerprints.find_recent(&hash, &agent.id, since).await? {
            warn!(agent = %agent.email, case_id = %existing, "Duplicate case submission");
            return Err(AppError::Conflict(format!(
                "Este caso ya fue registrado (caso {}). Espere antes de reenviarlo.",
                existing
            )));
        }

        let mut row = SheetRow::new();
        row.insert("Referencia".to_string(), json!(Uuid::new_v4().to_string()));
        row.insert("Agente_ID".to_string(), json!(agent.id));
        row.insert("Agente_Email".to_string(), json!(agent.email));
        row.insert(
            "Tipo_Servicio".to_string(),
            json!(normalized.tipo_servicio.map(|s| s.code()).unwrap_or_default()),
        );
        row.insert("Contacto".to_string(), json!(normalized.contacto));
        row.insert("Nombre_Completo".to_string(), json!(normalized.nombre_completo));
        row.insert("Huella".to_string(), json!(hash));
        row.insert(PAYLOAD_COLUMN.to_string(), Value::Object(payload));

        let stored = self.rows.add_row(Sheet::Cases, row, &agent.email).await?;
        let case_id = cell_text(&stored, Sheet::Cases.id_column());

        self.fingerprints.record(&hash, &agent.id, &case_id, now).await?;
        drop(guard);
        if let Err(e) = self.fingerprints.prune(since).await {
            warn!("Failed to prune submission fingerprints: {}", e);
        }

        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::CREATE_CASE,
                    Sheet::Cases.entity(),
                    format!(
                        "Caso {} ({})",
                        case_id,
                        normalized.tipo_servicio.map(|s| s.label()).unwrap_or_default()
                    ),
                )
                .by(Some(&agent.id), Some(&agent.email))
                .on(Some(&case_id)),
            )
            .await;

        info!(case_id = %case_id, agent = %agent.email, "Case created");
        Ok(SubmitOutcome::Created {
            id: case_id,
            row: stored,
        })
    }

    pub async fn list(&self, filter: &CaseFilter) -> Result<Vec<SheetRow>> {
        let rows = self.rows.get_all_rows(Sheet::Cases).await?;
        Ok(rows
            .into_iter()
            .filter(|row| matches_filter(row, "Agente_ID", filter.agent_id.as_deref()))
            .filter(|row| matches_filter(row, "Tipo_Servicio", filter.service.as_deref()))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Option<SheetRow>> {
        self.rows.get_row_by_id(Sheet::Cases, id).await
    }
}

fn matches_filter(row: &SheetRow, column: &str, wanted: Option<&str>) -> bool {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        Some(wanted) => cell_text(row, column).eq_ignore_ascii_case(wanted),
        None => true,
    }
}
