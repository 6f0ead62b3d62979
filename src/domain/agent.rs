use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::sheet::deserialize_cell_text;

/// Call-center roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Agente,
    Supervisor,
    Administrador,
}

impl Role {
    pub const HIERARCHY: &'static [Role] = &[Role::Agente, Role::Supervisor, Role::Administrador];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Agente => "AGENTE",
            Role::Supervisor => "SUPERVISOR",
            Role::Administrador => "ADMINISTRADOR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::HIERARCHY
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(value))
    }

    pub fn satisfies(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Activo,
    Inactivo,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Activo => "Activo",
            AgentStatus::Inactivo => "Inactivo",
        }
    }

    /// Exact match on the stored spelling.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Activo" => Some(AgentStatus::Activo),
            "Inactivo" => Some(AgentStatus::Inactivo),
            _ => None,
        }
    }
}

/// A row of the `Agentes` sheet. Role and state stay as stored text so that
/// rows with unknown values can still be read and reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    #[serde(rename = "ID_Agente", deserialize_with = "deserialize_cell_text", default)]
    pub id: String,
    #[serde(rename = "Nombre", default)]
    pub nombre: String,
    #[serde(rename = "Apellido", default)]
    pub apellido: String,
    #[serde(rename = "Email_Google", default)]
    pub email: String,
    #[serde(rename = "Rol", default)]
    pub rol: String,
    #[serde(rename = "Estado", default)]
    pub estado: String,
}

impl Agent {
    pub fn role(&self) -> Option<Role> {
        Role::parse(&self.rol)
    }

    pub fn is_active(&self) -> bool {
        self.estado.trim().eq_ignore_ascii_case("ACTIVO")
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre.trim(), self.apellido.trim())
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Administrador.satisfies(Role::Supervisor));
        assert!(Role::Supervisor.satisfies(Role::Supervisor));
        assert!(!Role::Agente.satisfies(Role::Supervisor));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse(" supervisor "), Some(Role::Supervisor));
        assert_eq!(Role::parse("Administrador"), Some(Role::Administrador));
        assert_eq!(Role::parse("GERENTE"), None);
    }

    #[test]
    fn test_agent_from_row() {
        let agent: Agent = serde_json::from_value(json!({
            "ID_Agente": 3,
            "Nombre": "Ana",
            "Apellido": "Gómez",
            "Email_Google": "ana@trabajo.gob.sv",
            "Rol": "Supervisor",
            "Estado": "activo"
        }))
        .unwrap();
        assert_eq!(agent.id, "3");
        assert_eq!(agent.role(), Some(Role::Supervisor));
        assert!(agent.is_active());
        assert_eq!(agent.full_name(), "Ana Gómez");
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!(AgentStatus::parse("Inactivo"), Some(AgentStatus::Inactivo));
        assert_eq!(AgentStatus::parse("INACTIVO"), None);
    }
}
