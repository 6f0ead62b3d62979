use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

/// Actions written to the activity log.
pub mod actions {
    pub const CREATE_AGENT: &str = "CREATE_AGENT";
    pub const UPDATE_AGENT: &str = "UPDATE_AGENT";
    pub const DEACTIVATE_AGENT: &str = "DEACTIVATE_AGENT";
    pub const CREATE_CASE: &str = "CREATE_CASE";
    pub const SUBMIT_FEEDBACK: &str = "SUBMIT_FEEDBACK";
    pub const UPDATE_FEEDBACK_STATUS: &str = "UPDATE_FEEDBACK_STATUS";
    pub const CREATE_COMPANY: &str = "CREATE_COMPANY";
    pub const UPDATE_COMPANY: &str = "UPDATE_COMPANY";
    pub const CREATE_USER: &str = "CREATE_USER";
    pub const UPDATE_USER: &str = "UPDATE_USER";
    pub const CREATE_SERVICE: &str = "CREATE_SERVICE";
    pub const UPDATE_SERVICE: &str = "UPDATE_SERVICE";
    pub const DEACTIVATE_SERVICE: &str = "DEACTIVATE_SERVICE";
    pub const UPDATE_CONFIGURATION: &str = "UPDATE_CONFIGURATION";
    pub const IMPORT_SHEET: &str = "IMPORT_SHEET";
    pub const AUTH_FAILED: &str = "AUTH_FAILED";
    pub const AUTH_FAILED_UNKNOWN_ROLE: &str = "AUTH_FAILED_UNKNOWN_ROLE";
    pub const AUTH_FAILED_DENIED: &str = "AUTH_FAILED_DENIED";
    pub const AUTHORIZATION_FAILED: &str = "AUTHORIZATION_FAILED";
    pub const API_ERROR_GET: &str = "API_ERROR_GET";
    pub const API_ERROR_POST: &str = "API_ERROR_POST";
}

/// What a caller hands to the audit service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub agent_id: Option<String>,
    pub agent_email: Option<String>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub details: String,
    pub ip_address: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: &str, entity: &str, details: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            entity: entity.to_string(),
            details: details.into(),
            ..Self::default()
        }
    }

    pub fn by(mut self, agent_id: Option<&str>, agent_email: Option<&str>) -> Self {
        self.agent_id = agent_id.map(str::to_string);
        self.agent_email = agent_email.map(str::to_string);
        self
    }

    pub fn on(mut self, entity_id: Option<&str>) -> Self {
        self.entity_id = entity_id.map(str::to_string);
        self
    }

    pub fn from_ip(mut self, ip_address: Option<&str>) -> Self {
        self.ip_address = ip_address.map(str::to_string);
        self
    }
}

/// A stored activity row, with the original sheet column names on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityRecord {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Agente_ID")]
    pub agent_id: String,
    #[serde(rename = "Agente_Email")]
    pub agent_email: String,
    #[serde(rename = "Accion")]
    pub action: String,
    #[serde(rename = "Entidad_Afectada")]
    pub entity: String,
    #[serde(rename = "ID_Entidad_Afectada")]
    pub entity_id: String,
    #[serde(rename = "Detalles")]
    pub details: String,
    #[serde(rename = "IP_Address")]
    pub ip_address: String,
}

/// Optional narrowing for activity queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityFilter {
    pub action: Option<String>,
    pub entity: Option<String>,
    pub agent_email: Option<String>,
}
