use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One sheet row: column header -> cell value.
pub type SheetRow = Map<String, Value>;

pub const CREATED_AT_COLUMN: &str = "Fecha_Creacion";
pub const CREATED_BY_COLUMN: &str = "Creado_Por";
pub const UPDATED_AT_COLUMN: &str = "Fecha_Actualizacion";
pub const UPDATED_BY_COLUMN: &str = "Actualizado_Por";

/// Logical sheets served by the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sheet {
    Agents,
    Cases,
    Feedback,
    Services,
    Companies,
    Locations,
    Users,
    RecreationCenters,
    Collaborators,
    ServiceCatalog,
    Offices,
    Directorates,
    Configuration,
}

impl Sheet {
    pub const ALL: &'static [Sheet] = &[
        Sheet::Agents,
        Sheet::Cases,
        Sheet::Feedback,
        Sheet::Services,
        Sheet::Companies,
        Sheet::Locations,
        Sheet::Users,
        Sheet::RecreationCenters,
        Sheet::Collaborators,
        Sheet::ServiceCatalog,
        Sheet::Offices,
        Sheet::Directorates,
        Sheet::Configuration,
    ];

    /// Name of the sheet in storage and in workbook file names.
    pub fn name(&self) -> &'static str {
        match self {
            Sheet::Agents => "Agentes",
            Sheet::Cases => "Casos",
            Sheet::Feedback => "Sugerencias_Quejas",
            Sheet::Services => "Servicios",
            Sheet::Companies => "Empresas",
            Sheet::Locations => "Ubicaciones",
            Sheet::Users => "Usuarios",
            Sheet::RecreationCenters => "Centros_Recreacion",
            Sheet::Collaborators => "Colaboradores",
            Sheet::ServiceCatalog => "Catalogo_Servicios",
            Sheet::Offices => "Sedes",
            Sheet::Directorates => "Direcciones",
            Sheet::Configuration => "Configuracion",
        }
    }

    /// Entity name used by the gateway.
    pub fn entity(&self) -> &'static str {
        match self {
            Sheet::Agents => "AGENTES",
            Sheet::Cases => "CASOS",
            Sheet::Feedback => "SUGERENCIAS_QUEJAS",
            Sheet::Services => "SERVICIOS",
            Sheet::Companies => "EMPRESAS",
            Sheet::Locations => "UBICACIONES",
            Sheet::Users => "USUARIOS",
            Sheet::RecreationCenters => "CENTROS_RECREACION",
            Sheet::Collaborators => "COLABORADORES",
            Sheet::ServiceCatalog => "CATALOGO_SERVICIOS",
            Sheet::Offices => "SEDES",
            Sheet::Directorates => "DIRECCIONES",
            Sheet::Configuration => "CONFIGURACION",
        }
    }

    pub fn id_column(&self) -> &'static str {
        match self {
            Sheet::Agents => "ID_Agente",
            Sheet::Cases => "ID_Caso",
            Sheet::Feedback => "ID_Sugerencia",
            Sheet::Services => "ID_SERVICIO",
            Sheet::Companies => "ID_REGEMP",
            Sheet::Locations => "id_distrito",
            Sheet::Users => "KEY_ATUS",
            Sheet::RecreationCenters => "ID_CENTRO",
            Sheet::Collaborators => "ID",
            Sheet::ServiceCatalog => "ID_SERVICIO",
            Sheet::Offices => "ID",
            Sheet::Directorates => "ID_DIRECCION",
            Sheet::Configuration => "ID",
        }
    }

    /// Reference data that administrators may bulk-load from workbooks.
    pub fn is_catalog(&self) -> bool {
        !matches!(self, Sheet::Agents | Sheet::Cases | Sheet::Feedback)
    }

    pub fn from_entity(entity: &str) -> Option<Self> {
        let entity = entity.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.entity().eq_ignore_ascii_case(entity))
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name) || s.entity().eq_ignore_ascii_case(name))
    }
}

/// Cell as display text. Numbers and booleans print the way the sheet shows them.
pub fn cell_text(row: &SheetRow, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Leading-digit parse used for sheet ids: `"12"` -> 12, `"7b"` -> 7, `"E-001"` -> none.
pub fn numeric_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Ids compare as strings, so `7` and `"7"` are the same row.
pub fn same_id(value: &Value, id: &str) -> bool {
    match value {
        Value::String(s) => s == id,
        Value::Null => false,
        other => other.to_string() == id,
    }
}

/// Serde helper for typed rows: any scalar cell reads as text.
pub fn deserialize_cell_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_lookup() {
        assert_eq!(Sheet::from_entity("empresas"), Some(Sheet::Companies));
        assert_eq!(Sheet::from_name("Centros_Recreacion"), Some(Sheet::RecreationCenters));
        assert_eq!(Sheet::from_entity("INTERACCIONES"), None);
        assert!(!Sheet::Agents.is_catalog());
        assert!(Sheet::Offices.is_catalog());
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id(&json!(12)), Some(12));
        assert_eq!(numeric_id(&json!("7")), Some(7));
        assert_eq!(numeric_id(&json!("7b")), Some(7));
        assert_eq!(numeric_id(&json!("E-001")), None);
        assert_eq!(numeric_id(&json!(null)), None);
    }

    #[test]
    fn test_same_id_compares_as_text() {
        assert!(same_id(&json!(7), "7"));
        assert!(same_id(&json!("7"), "7"));
        assert!(!same_id(&json!("07"), "7"));
    }
}
