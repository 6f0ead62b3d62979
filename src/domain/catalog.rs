use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::case_form::email_or_empty;
use crate::domain::options::{DocumentType, LegalEntityType};
use crate::domain::sheet::deserialize_cell_text;

/// A row of `Empresas`. `ID_REGEMP` is the value stored in `empresaInvolucrada`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Company {
    #[serde(rename = "ID_REGEMP", deserialize_with = "deserialize_cell_text")]
    pub id: String,
    #[serde(rename = "RAZON_SOCIAL")]
    #[validate(length(min = 1, message = "La razón social es requerida"))]
    pub razon_social: String,
    #[serde(rename = "NOMBRE_COMERCIAL")]
    #[validate(length(min = 1, message = "El nombre comercial es requerido"))]
    pub nombre_comercial: String,
    #[serde(rename = "TIPO_RAZON_SOCIAL")]
    #[validate(length(min = 1, message = "El tipo de razón social es requerido"))]
    pub tipo_razon_social: String,
    #[serde(rename = "DIRECCION")]
    #[validate(length(min = 1, message = "La dirección es requerida"))]
    pub direccion: String,
    #[serde(rename = "DISTRITO")]
    #[validate(length(min = 1, message = "El distrito es requerido"))]
    pub distrito: String,
    #[serde(rename = "TELEFONO", deserialize_with = "deserialize_cell_text")]
    pub telefono: String,
    #[serde(rename = "EMAIL")]
    #[validate(custom(function = "email_or_empty"))]
    pub email: String,
    #[serde(rename = "FECHA_REGISTRO")]
    pub fecha_registro: String,
    #[serde(rename = "FECHA_MODIFICACION")]
    pub fecha_modificacion: String,
}

impl Company {
    pub fn legal_entity_type(&self) -> Option<LegalEntityType> {
        LegalEntityType::from_code(&self.tipo_razon_social)
    }
}

/// A row of `Usuarios`: workers known from earlier cases, keyed by
/// document type + number (`KEY_ATUS`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorkerRecord {
    #[serde(rename = "KEY_ATUS")]
    pub key: String,
    #[serde(rename = "TIPO_IDENTIFICACION")]
    #[validate(length(min = 1, message = "El tipo de identificación es requerido"))]
    pub tipo_identificacion: String,
    #[serde(rename = "ID_USUARIO", deserialize_with = "deserialize_cell_text")]
    #[validate(length(min = 1, message = "El número de documento es requerido"))]
    pub id_usuario: String,
    #[serde(rename = "PAIS_IDENTIFICACION")]
    pub pais_identificacion: String,
    #[serde(rename = "NOMBRE_USUARIO")]
    #[validate(length(min = 1, message = "Los nombres son requeridos"))]
    pub nombre_usuario: String,
    #[serde(rename = "APELLIDO_USUARIO")]
    #[validate(length(min = 1, message = "Los apellidos son requeridos"))]
    pub apellido_usuario: String,
    #[serde(rename = "SEXO_USUARIO")]
    pub sexo_usuario: String,
    #[serde(rename = "CARACTERISTICA_USUARIO")]
    pub caracteristica_usuario: String,
    #[serde(rename = "TEL_USUARIO", deserialize_with = "deserialize_cell_text")]
    pub tel_usuario: String,
    #[serde(rename = "EMAIL_USUARIO")]
    #[validate(custom(function = "email_or_empty"))]
    pub email_usuario: String,
    #[serde(rename = "CARGO")]
    pub cargo: String,
}

impl WorkerRecord {
    pub fn document_type(&self) -> Option<DocumentType> {
        DocumentType::from_code(&self.tipo_identificacion)
    }

    /// Key derived from the document columns, upper-cased.
    pub fn derived_key(&self) -> String {
        format!("{}{}", self.tipo_identificacion.trim(), self.id_usuario.trim()).to_uppercase()
    }
}

/// Size band of a company by head count.
pub fn company_size(employees: Option<i64>) -> &'static str {
    match employees {
        None => "",
        Some(n) if n <= 0 => "",
        Some(n) if n <= 3 => "Emprendedores",
        Some(n) if n <= 10 => "Microempresa",
        Some(n) if n <= 50 => "Pequeña Empresa",
        Some(n) if n <= 100 => "Mediana Empresa",
        Some(_) => "Gran Empresa",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_company_size_bands() {
        assert_eq!(company_size(None), "");
        assert_eq!(company_size(Some(0)), "");
        assert_eq!(company_size(Some(3)), "Emprendedores");
        assert_eq!(company_size(Some(4)), "Microempresa");
        assert_eq!(company_size(Some(10)), "Microempresa");
        assert_eq!(company_size(Some(50)), "Pequeña Empresa");
        assert_eq!(company_size(Some(100)), "Mediana Empresa");
        assert_eq!(company_size(Some(101)), "Gran Empresa");
    }

    #[test]
    fn test_company_from_row_reads_numeric_phone() {
        let company: Company = serde_json::from_value(json!({
            "ID_REGEMP": "E-001",
            "RAZON_SOCIAL": "GRUPO CALLEJA, S.A. DE C.V.",
            "NOMBRE_COMERCIAL": "Super Selectos",
            "TIPO_RAZON_SOCIAL": "PJ",
            "TELEFONO": 22222222
        }))
        .unwrap();
        assert_eq!(company.telefono, "22222222");
        assert_eq!(company.legal_entity_type(), Some(LegalEntityType::LegalPerson));
        assert_eq!(company.email, "");
    }

    #[test]
    fn test_worker_key_derivation() {
        let worker = WorkerRecord {
            tipo_identificacion: "dca-".to_string(),
            id_usuario: "hn12345".to_string(),
            ..WorkerRecord::default()
        };
        assert_eq!(worker.derived_key(), "DCA-HN12345");
        assert_eq!(worker.document_type(), Some(DocumentType::CentralAmerican));
    }

    #[test]
    fn test_company_validation() {
        let company = Company {
            razon_social: "X".into(),
            email: "malo".into(),
            ..Company::default()
        };
        let errors = company.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("nombre_comercial"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("razon_social"));
    }
}
