use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::contact::is_valid_email;
use crate::domain::options::OFFICIAL_POSITIONS;
use crate::domain::validation::{issues_from_errors, ValidationIssue};

pub const SUGGESTION_FIELDS: &[&str] = &[
    "esAnonimo",
    "nombre",
    "email",
    "sedeDenunciada",
    "direccionesDenunciadas",
    "servicioInconveniente",
    "funcionarioDenunciado",
    "nombreFuncionario",
    "consultaUsuario",
    "respuestaAgente",
];

/// Complaint or suggestion about the ministry's own staff and offices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionBoxForm {
    pub es_anonimo: bool,
    pub nombre: String,
    #[validate(custom(function = "suggestion_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Debe seleccionar una sede."))]
    pub sede_denunciada: String,
    #[validate(length(min = 1, message = "Debe seleccionar al menos una dirección."))]
    pub direcciones_denunciadas: Vec<String>,
    #[validate(length(min = 1, message = "Debe seleccionar un servicio."))]
    pub servicio_inconveniente: String,
    #[validate(
        length(min = 1, message = "Debe seleccionar al menos un tipo de funcionario."),
        custom(function = "known_positions")
    )]
    pub funcionario_denunciado: Vec<String>,
    pub nombre_funcionario: String,
    #[validate(length(min = 10, message = "El comentario debe tener al menos 10 caracteres."))]
    pub consulta_usuario: String,
    pub respuesta_agente: String,
}

/// Review state of a submitted suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionStatus {
    Pendiente,
    EnProceso,
    Resuelto,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pendiente => "PENDIENTE",
            SuggestionStatus::EnProceso => "EN_PROCESO",
            SuggestionStatus::Resuelto => "RESUELTO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PENDIENTE" => Some(SuggestionStatus::Pendiente),
            "EN_PROCESO" => Some(SuggestionStatus::EnProceso),
            "RESUELTO" => Some(SuggestionStatus::Resuelto),
            _ => None,
        }
    }
}

impl SuggestionBoxForm {
    /// Field rules plus the anonymous/name dependency.
    pub fn issues(&self) -> Vec<ValidationIssue> {
        let mut issues = match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => issues_from_errors(&errors, SUGGESTION_FIELDS),
        };
        if !self.es_anonimo && self.nombre.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "nombre",
                "El nombre es requerido si no es anónimo.",
            ));
        }
        issues
    }
}

fn suggestion_email(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() || is_valid_email(value) {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some("Debe ser un email válido.".into());
    Err(error)
}

fn known_positions(values: &[String]) -> std::result::Result<(), ValidationError> {
    if values
        .iter()
        .all(|v| OFFICIAL_POSITIONS.contains(&v.trim().to_uppercase().as_str()))
    {
        return Ok(());
    }
    let mut error = ValidationError::new("funcionario");
    error.message = Some("Tipo de funcionario no reconocido.".into());
    Err(error)
}
