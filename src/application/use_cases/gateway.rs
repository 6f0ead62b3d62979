//! Entity/action facade over the services
//!
//! Every request goes through the same steps:
//! 1. Authenticate the caller's e-mail to an active agent
//! 2. Look up the minimum role for the entity and action
//! 3. Authorize the agent against that role
//! 4. Dispatch to the owning service
//! 5. Wrap the result in a `{status, data}` / `{status, message}` envelope
//!
//! Failures are written to the activity log before the error envelope is
//! returned.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::application::use_cases::agents_service::AgentsService;
use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::auth_service::AuthService;
use crate::application::use_cases::catalog_service::CatalogService;
use crate::application::use_cases::form_effects::{self, PrefillRequest};
use crate::application::use_cases::phone_country::{PhoneCountryResolver, PrefixCountryResolver};
use crate::application::use_cases::submission::{CaseFilter, CaseService, SubmitOutcome};
use crate::application::use_cases::suggestion_box::SuggestionBoxService;
use crate::domain::activity::{actions, ActivityEntry, ActivityFilter};
use crate::domain::agent::{Agent, Role};
use crate::domain::case_form::CaseForm;
use crate::domain::error::{AppError, Result};
use crate::domain::sheet::{Sheet, SheetRow};
use crate::domain::suggestion::{SuggestionBoxForm, SuggestionStatus};
use crate::domain::validation::{summarize, ValidationIssue};
use crate::infrastructure::db::rows::RowRepository;
use crate::infrastructure::workbook;

pub const ACTIVITY_LOG_ENTITY: &str = "LOG_ACTIVIDADES";
pub const PHONE_COUNTRY_ENTITY: &str = "PAIS_TELEFONO";
pub const IMPORT_ACTION: &str = "import";
pub const DEFAULT_LOG_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    fn error_action(&self) -> &'static str {
        match self {
            Method::Get => actions::API_ERROR_GET,
            Method::Post => actions::API_ERROR_POST,
        }
    }
}

/// Who is calling: the e-mail asserted by the identity provider and the
/// client address, when known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub email: Option<String>,
    pub ip: Option<String>,
}

impl Caller {
    pub fn new(email: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_string),
            ip: None,
        }
    }

    pub fn from_ip(mut self, ip: Option<&str>) -> Self {
        self.ip = ip.map(str::to_string);
        self
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// Body of a gateway POST.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRequest {
    pub entity: String,
    pub action: String,
    pub data: Value,
    pub id: Option<String>,
}

/// Response body shared by every gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        data: Value,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        issues: Option<Vec<ValidationIssue>>,
    },
}

/// Why a gateway call failed. Rejected submissions carry their field issues.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFailure {
    pub error: AppError,
    pub issues: Option<Vec<ValidationIssue>>,
}

impl From<AppError> for GatewayFailure {
    fn from(error: AppError) -> Self {
        Self { error, issues: None }
    }
}

impl GatewayFailure {
    fn rejected(issues: Vec<ValidationIssue>) -> Self {
        Self {
            error: AppError::ValidationError(format!(
                "El formulario contiene errores: {}",
                summarize(&issues)
            )),
            issues: Some(issues),
        }
    }
}

pub type GatewayResult = std::result::Result<Value, GatewayFailure>;

pub fn envelope(result: &GatewayResult) -> Envelope {
    match result {
        Ok(data) => Envelope::Success { data: data.clone() },
        Err(failure) => Envelope::Error {
            message: failure.error.user_message().to_string(),
            issues: failure.issues.clone(),
        },
    }
}

/// Minimum role for an entity/action pair. Unknown entities are rejected.
pub fn required_role(method: Method, entity: &str, action: &str) -> Result<Role> {
    let unknown = || {
        AppError::ValidationError(format!(
            "Entidad '{}' no reconocida para solicitudes {}.",
            entity,
            method.as_str()
        ))
    };

    match method {
        Method::Get => match entity {
            ACTIVITY_LOG_ENTITY => Ok(Role::Supervisor),
            PHONE_COUNTRY_ENTITY => Ok(Role::Agente),
            _ if Sheet::from_entity(entity).is_some() => Ok(Role::Agente),
            _ => Err(unknown()),
        },
        Method::Post => {
            let sheet = Sheet::from_entity(entity).ok_or_else(unknown)?;
            if action == IMPORT_ACTION {
                return if sheet.is_catalog() {
                    Ok(Role::Administrador)
                } else {
                    Err(invalid_action(method, action, entity))
                };
            }
            match sheet {
                Sheet::Agents | Sheet::Services | Sheet::Configuration => Ok(Role::Administrador),
                Sheet::Companies | Sheet::Users | Sheet::Cases => Ok(Role::Agente),
                Sheet::Feedback => match action {
                    "updateStatus" | "resolve" => Ok(Role::Supervisor),
                    _ => Ok(Role::Agente),
                },
                _ => Err(invalid_action(method, action, entity)),
            }
        }
    }
}

fn invalid_action(method: Method, action: &str, entity: &str) -> AppError {
    AppError::ValidationError(format!(
        "Acción {} '{}' no válida para la entidad '{}'.",
        method.as_str(),
        action,
        entity
    ))
}

fn required_id(id: Option<&str>, action: &str, subject: &str) -> Result<String> {
    match id.map(str::trim).filter(|v| !v.is_empty()) {
        Some(id) => Ok(id.to_string()),
        None => Err(AppError::ValidationError(format!(
            "{} es requerido para '{}'.",
            subject, action
        ))),
    }
}

fn required_param<'a>(params: &'a HashMap<String, String>, name: &str, message: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ValidationError(message.to_string()))
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn as_row(data: Value) -> Result<SheetRow> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(SheetRow::new()),
        _ => Err(AppError::ValidationError(
            "El campo 'data' debe ser un objeto.".to_string(),
        )),
    }
}

fn to_data<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

pub struct ApiGateway {
    rows: Arc<RowRepository>,
    audit: Arc<AuditService>,
    auth: AuthService,
    agents: AgentsService,
    catalog: CatalogService,
    cases: CaseService,
    suggestions: SuggestionBoxService,
    resolver: Arc<dyn PhoneCountryResolver>,
    import_dir: Option<PathBuf>,
}

impl ApiGateway {
    pub fn new(
        rows: Arc<RowRepository>,
        audit: Arc<AuditService>,
        duplicate_window_secs: u64,
        import_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            auth: AuthService::new(rows.clone(), audit.clone()),
            agents: AgentsService::new(rows.clone(), audit.clone()),
            catalog: CatalogService::new(rows.clone(), audit.clone()),
            cases: CaseService::new(rows.clone(), audit.clone(), duplicate_window_secs),
            suggestions: SuggestionBoxService::new(rows.clone(), audit.clone()),
            resolver: Arc::new(PrefixCountryResolver),
            rows,
            audit,
            import_dir,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn PhoneCountryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn cases(&self) -> &CaseService {
        &self.cases
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn audit(&self) -> &AuditService {
        &self.audit
    }

    pub fn resolver(&self) -> &dyn PhoneCountryResolver {
        self.resolver.as_ref()
    }

    /// Authenticates and authorizes outside the entity/action routing.
    pub async fn agent_with_role(&self, email: Option<&str>, required: Role, entity: &str, action: &str) -> Result<Agent> {
        let agent = self.auth.authenticate(email).await?;
        self.auth.authorize(&agent, required, entity, action).await?;
        Ok(agent)
    }

    /// `params` holds the query string: `entity`, `action`, `id` and any
    /// action-specific parameters.
    pub async fn handle_get(&self, caller: &Caller, params: &HashMap<String, String>) -> GatewayResult {
        let entity = param(params, "entity").unwrap_or("N/A").to_uppercase();
        let action = param(params, "action").unwrap_or_default().to_string();
        let id = param(params, "id").map(str::to_string);

        let mut agent = None;
        let result = self
            .run_get(caller.email(), &entity, &action, id.as_deref(), params, &mut agent)
            .await;
        self.finish(Method::Get, result, agent.as_ref(), caller, &entity, &action, id.as_deref())
            .await
    }

    pub async fn handle_post(&self, caller: &Caller, request: PostRequest) -> GatewayResult {
        let entity = request.entity.trim().to_uppercase();
        let action = request.action.trim().to_string();
        let id = request
            .id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let mut agent = None;
        let result = self
            .run_post(caller.email(), &entity, &action, id.as_deref(), request.data, &mut agent)
            .await;
        self.finish(Method::Post, result, agent.as_ref(), caller, &entity, &action, id.as_deref())
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        method: Method,
        result: GatewayResult,
        agent: Option<&Agent>,
        caller: &Caller,
        entity: &str,
        action: &str,
        id: Option<&str>,
    ) -> GatewayResult {
        if let Err(failure) = &result {
            self.record_failure(method, failure, agent, caller, entity, action, id)
                .await;
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        method: Method,
        failure: &GatewayFailure,
        agent: Option<&Agent>,
        caller: &Caller,
        entity: &str,
        action: &str,
        id: Option<&str>,
    ) {
        let message = failure.error.user_message();
        error!(
            method = method.as_str(),
            entity = %entity,
            action = %action,
            agent = agent.map(|a| a.email.as_str()).or(caller.email()).unwrap_or("No Autenticado"),
            "Gateway error: {}",
            message
        );

        let audit_action = if failure.error.is_access_failure() {
            actions::AUTHORIZATION_FAILED
        } else {
            method.error_action()
        };
        let details = format!(
            "Error en {}: {} {}. Mensaje: {}.",
            method.as_str(),
            action,
            entity,
            message
        );
        self.audit
            .log_activity(
                ActivityEntry::new(audit_action, entity, details)
                    .by(
                        agent.map(|a| a.id.as_str()),
                        agent.map(|a| a.email.as_str()).or(caller.email()),
                    )
                    .on(id)
                    .from_ip(caller.ip.as_deref()),
            )
            .await;
    }

    async fn authorized(
        &self,
        method: Method,
        email: Option<&str>,
        entity: &str,
        action: &str,
        slot: &mut Option<Agent>,
    ) -> Result<Agent> {
        let agent = self.auth.authenticate(email).await?;
        *slot = Some(agent.clone());
        let required = required_role(method, entity, action)?;
        self.auth.authorize(&agent, required, entity, action).await?;
        Ok(agent)
    }

    async fn run_get(
        &self,
        email: Option<&str>,
        entity: &str,
        action: &str,
        id: Option<&str>,
        params: &HashMap<String, String>,
        slot: &mut Option<Agent>,
    ) -> GatewayResult {
        self.authorized(Method::Get, email, entity, action, slot).await?;

        let data = match entity {
            ACTIVITY_LOG_ENTITY => match action {
                "list" => {
                    let limit = param(params, "limit")
                        .and_then(|v| v.parse::<i64>().ok())
                        .unwrap_or(DEFAULT_LOG_LIMIT);
                    let filter = ActivityFilter {
                        action: param(params, "filterAction").map(str::to_string),
                        entity: param(params, "filterEntity").map(str::to_string),
                        agent_email: param(params, "agentEmail").map(str::to_string),
                    };
                    to_data(self.audit.recent(limit, &filter).await?)?
                }
                _ => return Err(invalid_action(Method::Get, action, entity).into()),
            },
            PHONE_COUNTRY_ENTITY => match action {
                "resolve" => {
                    let phone = required_param(params, "phone", "Teléfono es requerido para 'resolve'.")?;
                    to_data(self.resolver.resolve(phone).await)?
                }
                _ => return Err(invalid_action(Method::Get, action, entity).into()),
            },
            _ => {
                let sheet = Sheet::from_entity(entity).ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Entidad '{}' no reconocida para solicitudes GET.",
                        entity
                    ))
                })?;
                self.get_sheet(sheet, entity, action, id, params).await?
            }
        };

        info!(entity = %entity, action = %action, "Gateway GET served");
        Ok(data)
    }

    async fn get_sheet(
        &self,
        sheet: Sheet,
        entity: &str,
        action: &str,
        id: Option<&str>,
        params: &HashMap<String, String>,
    ) -> Result<Value> {
        match (sheet, action) {
            (Sheet::Agents, "list") => to_data(self.agents.list(param(params, "status")).await?),
            (Sheet::Agents, "getById") => {
                let id = required_id(id, action, "ID de agente")?;
                to_data(self.agents.get_by_id(&id).await?)
            }
            (Sheet::Agents, "getByEmail") => {
                let email = required_param(params, "email", "Email es requerido para 'getByEmail'.")?;
                to_data(self.agents.get_by_email(email).await?)
            }
            (Sheet::Companies, "search") => {
                to_data(self.catalog.search_companies(param(params, "q").unwrap_or_default()).await?)
            }
            (Sheet::Services, "listActive") => to_data(self.catalog.list_active_services().await?),
            (Sheet::Users, "findByKey") => {
                let key = required_param(params, "key", "Clave de usuario es requerida para 'findByKey'.")?;
                to_data(self.catalog.find_user_by_key(key).await?)
            }
            (Sheet::Configuration, "getList") => {
                let key = required_param(params, "key", "Clave de configuración es requerida.")?;
                to_data(self.catalog.config_list(key).await?)
            }
            (Sheet::Cases, "list") => {
                let filter = CaseFilter {
                    agent_id: param(params, "agentId").map(str::to_string),
                    service: param(params, "service").map(str::to_string),
                };
                to_data(self.cases.list(&filter).await?)
            }
            (Sheet::Cases, "getById") => {
                let id = required_id(id, action, "ID de caso")?;
                to_data(self.cases.get(&id).await?)
            }
            (Sheet::Feedback, "list") => to_data(self.suggestions.list(param(params, "status")).await?),
            (_, "list") if sheet.is_catalog() => to_data(self.catalog.list(sheet).await?),
            (_, "getById") if sheet.is_catalog() || sheet == Sheet::Feedback => {
                let id = required_id(id, action, "ID")?;
                to_data(self.catalog.get(sheet, &id).await?)
            }
            _ => Err(invalid_action(Method::Get, action, entity)),
        }
    }

    async fn run_post(
        &self,
        email: Option<&str>,
        entity: &str,
        action: &str,
        id: Option<&str>,
        data: Value,
        slot: &mut Option<Agent>,
    ) -> GatewayResult {
        let agent = self.authorized(Method::Post, email, entity, action, slot).await?;
        let sheet = Sheet::from_entity(entity).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Entidad '{}' no reconocida para solicitudes POST.",
                entity
            ))
        })?;

        if action == IMPORT_ACTION {
            return Ok(self.import(sheet, data, &agent).await?);
        }

        let result = match (sheet, action) {
            (Sheet::Agents, "create") => to_data(self.agents.create(as_row(data)?, &agent).await?)?,
            (Sheet::Agents, "update") => {
                let id = required_id(id, action, "ID de agente")?;
                to_data(self.agents.update(&id, as_row(data)?, &agent).await?)?
            }
            (Sheet::Agents, "deactivate") => {
                let id = required_id(id, action, "ID de agente")?;
                to_data(self.agents.deactivate(&id, &agent).await?)?
            }
            (Sheet::Services, "create") => to_data(self.catalog.create_service(as_row(data)?, &agent).await?)?,
            (Sheet::Services, "update") => {
                let id = required_id(id, action, "ID de servicio")?;
                to_data(self.catalog.update_service(&id, as_row(data)?, &agent).await?)?
            }
            (Sheet::Services, "deactivate") => {
                let id = required_id(id, action, "ID de servicio")?;
                to_data(self.catalog.deactivate_service(&id, &agent).await?)?
            }
            (Sheet::Configuration, "create") => {
                let row = as_row(data)?;
                let key = row.get("key").and_then(Value::as_str).unwrap_or_default();
                let value = row.get("value").and_then(Value::as_str).unwrap_or_default();
                to_data(self.catalog.add_config_value(key, value, &agent).await?)?
            }
            (Sheet::Configuration, "update") => {
                let id = required_id(id, action, "ID de configuración")?;
                to_data(self.catalog.update_config_row(&id, as_row(data)?, &agent).await?)?
            }
            (Sheet::Companies, "create") => to_data(self.catalog.create_company(as_row(data)?, &agent).await?)?,
            (Sheet::Companies, "update") => {
                let id = required_id(id, action, "ID de empresa")?;
                to_data(self.catalog.update_company(&id, as_row(data)?, &agent).await?)?
            }
            (Sheet::Users, "create") => to_data(self.catalog.create_user(as_row(data)?, &agent).await?)?,
            (Sheet::Users, "update") => {
                let id = required_id(id, action, "Clave de usuario")?;
                to_data(self.catalog.update_user(&id, as_row(data)?, &agent).await?)?
            }
            (Sheet::Cases, "evaluate") => {
                let form = CaseForm::from_value(data)?;
                to_data(self.cases.evaluate(&form))?
            }
            (Sheet::Cases, "prefill") => {
                let request: PrefillRequest = serde_json::from_value(data)
                    .map_err(|e| AppError::ValidationError(e.to_string()))?;
                let companies = if request.form.has_company() {
                    self.catalog.companies().await?
                } else {
                    Vec::new()
                };
                let worker = match request.form.worker_key().filter(|_| request.lookup_worker) {
                    Some(key) => self.catalog.find_user_by_key(&key).await?,
                    None => None,
                };
                to_data(
                    form_effects::prefill(request, self.resolver.as_ref(), &companies, worker.as_ref())
                        .await,
                )?
            }
            (Sheet::Cases, "create") => {
                let form = CaseForm::from_value(data)?;
                match self.cases.submit(&form, &agent).await? {
                    SubmitOutcome::Created { row, .. } => Value::Object(row),
                    SubmitOutcome::Rejected { issues } => return Err(GatewayFailure::rejected(issues)),
                }
            }
            (Sheet::Feedback, "submit") => {
                let form: SuggestionBoxForm = serde_json::from_value(data)
                    .map_err(|e| AppError::ValidationError(e.to_string()))?;
                match self.suggestions.submit(&form, &agent).await? {
                    SubmitOutcome::Created { row, .. } => Value::Object(row),
                    SubmitOutcome::Rejected { issues } => return Err(GatewayFailure::rejected(issues)),
                }
            }
            (Sheet::Feedback, "updateStatus") | (Sheet::Feedback, "resolve") => {
                let id = required_id(id, action, "ID de sugerencia")?;
                let row = as_row(data)?;
                let note = row.get("note").and_then(Value::as_str);
                let status = if action == "resolve" {
                    SuggestionStatus::Resuelto
                } else {
                    let raw = row.get("status").and_then(Value::as_str).unwrap_or_default();
                    SuggestionStatus::parse(raw).ok_or_else(|| {
                        AppError::ValidationError(format!("Estado de sugerencia inválido: {}", raw))
                    })?
                };
                to_data(self.suggestions.update_status(&id, status, note, &agent).await?)?
            }
            _ => return Err(invalid_action(Method::Post, action, entity).into()),
        };

        info!(entity = %entity, action = %action, agent = %agent.email, "Gateway POST served");
        Ok(result)
    }

    /// Replaces a catalog sheet with a workbook from the import directory.
    async fn import(&self, sheet: Sheet, data: Value, agent: &Agent) -> Result<Value> {
        let Some(dir) = self.import_dir.as_deref() else {
            return Err(AppError::ValidationError(
                "No hay una carpeta de importación configurada.".to_string(),
            ));
        };
        let row = as_row(data)?;
        let file = row
            .get("file")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                AppError::ValidationError("El nombre del archivo es requerido para 'import'.".to_string())
            })?;

        let path = workbook::resolve_in_dir(dir, file)?;
        let summary = workbook::import_file(&self.rows, sheet, &path, &agent.email).await?;
        self.audit
            .log_activity(
                ActivityEntry::new(
                    actions::IMPORT_SHEET,
                    sheet.name(),
                    format!("{} filas importadas desde {}", summary.rows, summary.file),
                )
                .by(Some(&agent.id), Some(&agent.email)),
            )
            .await;
        Ok(json!(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::db::connection::init_memory_db;
    use crate::infrastructure::db::seed::seed_catalogs;
    use std::fs;
    use tempfile::tempdir;

    const ADMIN: &str = "admin@trabajo.gob.sv";
    const AGENT: &str = "ana@trabajo.gob.sv";
    const SUPERVISOR: &str = "luis@trabajo.gob.sv";

    async fn gateway(import_dir: Option<PathBuf>) -> ApiGateway {
        let pool = init_memory_db().await.unwrap();
        let rows = Arc::new(RowRepository::new(pool.clone()));
        seed_catalogs(&rows).await.unwrap();
        for (email, rol) in [(ADMIN, "ADMINISTRADOR"), (AGENT, "AGENTE"), (SUPERVISOR, "SUPERVISOR")] {
            let row = json!({
                "Nombre": "N",
                "Apellido": "A",
                "Email_Google": email,
                "Rol": rol,
                "Estado": "Activo",
            });
            rows.add_row(Sheet::Agents, as_row(row).unwrap(), "test").await.unwrap();
        }
        let audit = Arc::new(AuditService::new(pool));
        ApiGateway::new(rows, audit, 120, import_dir)
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn post(entity: &str, action: &str, data: Value, id: Option<&str>) -> PostRequest {
        PostRequest {
            entity: entity.to_string(),
            action: action.to_string(),
            data,
            id: id.map(str::to_string),
        }
    }

    async fn last_action(gw: &ApiGateway) -> String {
        gw.audit()
            .recent(1, &ActivityFilter::default())
            .await
            .unwrap()
            .remove(0)
            .action
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(required_role(Method::Get, "EMPRESAS", "list").unwrap(), Role::Agente);
        assert_eq!(
            required_role(Method::Get, ACTIVITY_LOG_ENTITY, "list").unwrap(),
            Role::Supervisor
        );
        assert_eq!(
            required_role(Method::Post, "AGENTES", "create").unwrap(),
            Role::Administrador
        );
        assert_eq!(
            required_role(Method::Post, "SUGERENCIAS_QUEJAS", "resolve").unwrap(),
            Role::Supervisor
        );
        assert_eq!(
            required_role(Method::Post, "SEDES", IMPORT_ACTION).unwrap(),
            Role::Administrador
        );
        assert!(required_role(Method::Post, "CASOS", IMPORT_ACTION).is_err());
        assert!(required_role(Method::Post, "SEDES", "create").is_err());

        let err = required_role(Method::Get, "INTERACCIONES", "list").unwrap_err();
        assert_eq!(
            err.user_message(),
            "Entidad 'INTERACCIONES' no reconocida para solicitudes GET."
        );
    }

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(envelope(&Ok(json!([1])))).unwrap();
        assert_eq!(ok, json!({"status": "success", "data": [1]}));

        let failed: GatewayResult = Err(AppError::Forbidden("Acceso denegado".into()).into());
        let err = serde_json::to_value(envelope(&failed)).unwrap();
        assert_eq!(err, json!({"status": "error", "message": "Acceso denegado"}));
    }

    #[tokio::test]
    async fn test_get_lists_catalog_for_agent() {
        let gw = gateway(None).await;
        let data = gw
            .handle_get(&Caller::new(Some(AGENT)), &query(&[("entity", "empresas"), ("action", "list")]))
            .await
            .unwrap();
        assert!(data.as_array().map(|a| !a.is_empty()).unwrap_or(false));

        let user = gw
            .handle_get(
                &Caller::new(Some(AGENT)),
                &query(&[("entity", "USUARIOS"), ("action", "findByKey"), ("key", "dui-014735502")]),
            )
            .await
            .unwrap();
        assert_eq!(user["NOMBRE_USUARIO"], json!("ABEL IVAN"));
    }

    #[tokio::test]
    async fn test_missing_identity_is_audited_as_authorization_failure() {
        let gw = gateway(None).await;
        let failure = gw
            .handle_get(&Caller::new(None), &query(&[("entity", "EMPRESAS"), ("action", "list")]))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, AppError::Unauthorized(_)));
        assert_eq!(last_action(&gw).await, actions::AUTHORIZATION_FAILED);
    }

    #[tokio::test]
    async fn test_agent_cannot_read_activity_log() {
        let gw = gateway(None).await;
        let params = query(&[("entity", ACTIVITY_LOG_ENTITY), ("action", "list")]);
        let failure = gw.handle_get(&Caller::new(Some(AGENT)), &params).await.unwrap_err();
        assert!(failure.error.user_message().starts_with("Acceso denegado"));
        assert_eq!(last_action(&gw).await, actions::AUTHORIZATION_FAILED);

        let data = gw.handle_get(&Caller::new(Some(SUPERVISOR)), &params).await.unwrap();
        assert!(!data.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_action_is_api_error() {
        let gw = gateway(None).await;
        let failure = gw
            .handle_get(&Caller::new(Some(AGENT)), &query(&[("entity", "AGENTES"), ("action", "borrar")]))
            .await
            .unwrap_err();
        assert_eq!(
            failure.error.user_message(),
            "Acción GET 'borrar' no válida para la entidad 'AGENTES'."
        );
        assert_eq!(last_action(&gw).await, actions::API_ERROR_GET);

        let failure = gw
            .handle_get(&Caller::new(Some(AGENT)), &query(&[("entity", "AGENTES"), ("action", "getById")]))
            .await
            .unwrap_err();
        assert_eq!(
            failure.error.user_message(),
            "ID de agente es requerido para 'getById'."
        );
    }

    #[tokio::test]
    async fn test_phone_country_lookup() {
        let gw = gateway(None).await;
        let data = gw
            .handle_get(
                &Caller::new(Some(AGENT)),
                &query(&[("entity", PHONE_COUNTRY_ENTITY), ("action", "resolve"), ("phone", "+50255551234")]),
            )
            .await
            .unwrap();
        assert_eq!(data, json!({"status": "resolved", "country": "GUATEMALA"}));
    }

    #[tokio::test]
    async fn test_post_agent_requires_admin() {
        let gw = gateway(None).await;
        let body = json!({
            "Nombre": "Rosa",
            "Apellido": "Lara",
            "Email_Google": "rosa@trabajo.gob.sv",
            "Rol": "AGENTE",
            "Estado": "Activo"
        });
        let failure = gw
            .handle_post(&Caller::new(Some(AGENT)), post("AGENTES", "create", body.clone(), None))
            .await
            .unwrap_err();
        assert!(failure.error.is_access_failure());

        let created = gw
            .handle_post(&Caller::new(Some(ADMIN)), post("agentes", "create", body, None))
            .await
            .unwrap();
        assert_eq!(created["Email_Google"], json!("rosa@trabajo.gob.sv"));
    }

    #[tokio::test]
    async fn test_company_search() {
        let gw = gateway(None).await;
        let found = gw
            .handle_get(
                &Caller::new(Some(AGENT)),
                &query(&[("entity", "EMPRESAS"), ("action", "search"), ("q", "campero")]),
            )
            .await
            .unwrap();
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["ID_REGEMP"], json!("E-002"));
    }

    #[tokio::test]
    async fn test_prefill_fills_company_and_worker() {
        let gw = gateway(None).await;
        let body = json!({
            "form": {
                "contacto": "+12025550123",
                "tipoServicio": "DEN",
                "tipoDenuncia": "ESP",
                "empresaInvolucrada": "E-001",
                "trabajadorTipoDocumento": "DUI-",
                "trabajadorNumeroDocumento": "014735502"
            },
            "lookupWorker": true
        });
        let result = gw
            .handle_post(&Caller::new(Some(AGENT)), post("CASOS", "prefill", body, None))
            .await
            .unwrap();
        assert_eq!(result["form"]["lugarContacto"], json!("ESTADOS UNIDOS/CANADÁ"));
        assert_eq!(result["form"]["nombreComercial"], json!("Super Selectos"));
        assert_eq!(result["form"]["tipoRazonSocial"], json!("PJ"));
        assert_eq!(result["form"]["trabajadorNombres"], json!("ABEL IVAN"));
        assert_eq!(result["workerLocked"], json!(true));
        assert_eq!(result["service"], json!("case"));
    }

    #[tokio::test]
    async fn test_rejected_case_carries_issues() {
        let gw = gateway(None).await;
        let failure = gw
            .handle_post(&Caller::new(Some(AGENT)), post("CASOS", "create", json!({}), None))
            .await
            .unwrap_err();
        let issues = failure.issues.clone().unwrap();
        assert!(issues.iter().any(|i| i.path == "tipoServicio"));

        let body = serde_json::to_value(envelope(&Err(failure))).unwrap();
        assert_eq!(body["status"], json!("error"));
        assert!(body["issues"].is_array());
        assert_eq!(last_action(&gw).await, actions::API_ERROR_POST);
    }

    #[tokio::test]
    async fn test_suggestion_resolve_is_supervisor_only() {
        let gw = gateway(None).await;
        let form = json!({
            "esAnonimo": true,
            "sedeDenunciada": "Oficinas Centrales",
            "direccionesDenunciadas": ["DIRECCIÓN GENERAL DE TRABAJO"],
            "servicioInconveniente": "Inspección",
            "funcionarioDenunciado": ["Inspector"],
            "consultaUsuario": "No atendieron la llamada en horario"
        });
        let row = gw
            .handle_post(&Caller::new(Some(AGENT)), post("SUGERENCIAS_QUEJAS", "submit", form, None))
            .await
            .unwrap();
        let id = row["ID_Sugerencia"].to_string();

        let denied = gw
            .handle_post(&Caller::new(Some(AGENT)), post("SUGERENCIAS_QUEJAS", "resolve", Value::Null, Some(&id)))
            .await
            .unwrap_err();
        assert!(denied.error.is_access_failure());

        let resolved = gw
            .handle_post(&Caller::new(Some(SUPERVISOR)), post("SUGERENCIAS_QUEJAS", "resolve", Value::Null, Some(&id)))
            .await
            .unwrap();
        assert_eq!(resolved["Estado"], json!("RESUELTO"));
    }

    #[tokio::test]
    async fn test_import_replaces_catalog() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("sedes_nuevas.csv"),
            "ID,SEDE,TELEFONOS\nS10,Oficina Departamental Sonsonate,2451-0000\n",
        )
        .unwrap();
        let gw = gateway(Some(dir.path().to_path_buf())).await;

        let summary = gw
            .handle_post(&Caller::new(Some(ADMIN)), post("SEDES", IMPORT_ACTION, json!({"file": "sedes_nuevas.csv"}), None))
            .await
            .unwrap();
        assert_eq!(summary["rows"], json!(1));

        let sedes = gw
            .handle_get(&Caller::new(Some(AGENT)), &query(&[("entity", "SEDES"), ("action", "list")]))
            .await
            .unwrap();
        assert_eq!(sedes.as_array().unwrap().len(), 1);
        assert_eq!(last_action(&gw).await, actions::IMPORT_SHEET);

        let escape = gw
            .handle_post(&Caller::new(Some(ADMIN)), post("SEDES", IMPORT_ACTION, json!({"file": "../x.csv"}), None))
            .await
            .unwrap_err();
        assert!(matches!(escape.error, AppError::SecurityError(_)));
    }
}
