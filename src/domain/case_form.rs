use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::domain::contact::is_valid_email;
use crate::domain::error::{AppError, Result};
use crate::domain::options::{
    blank, ComplaintType, ContactType, DigitalMedium, DocumentType, EconomicActivity,
    LegalEntityType, ServiceType, Sex, SwitchboardOption, WorkerSex, WorkerTrait,
    WorkplaceLocation, HARASSMENT_SERVICE_ID,
};

pub const NOT_A_NUMBER: &str = "Debe ser un número";

/// Wire names of every case field, in form order.
pub const CASE_FIELDS: &[&str] = &[
    "contacto",
    "nombreCompleto",
    "sexo",
    "lugarContacto",
    "tipoContacto",
    "canalContacto",
    "medioDigital",
    "fechaContacto",
    "horaContacto",
    "tipoServicio",
    "detalleServicio",
    "empresaInvolucrada",
    "lugarDesempenoLabores",
    "nombreComercial",
    "direccionEmpresa",
    "distritoEmpresa",
    "telefonoEmpresa",
    "emailEmpresa",
    "direccionSucursal",
    "distritoSucursal",
    "telefonoSucursal",
    "emailSucursal",
    "tipoRazonSocial",
    "tipoDenuncia",
    "actividadEconomica",
    "cantidadEmpleados",
    "nombreAgresor",
    "cargoAgresor",
    "trabajadorTipoDocumento",
    "trabajadorNumeroDocumento",
    "trabajadorPaisDocumento",
    "trabajadorNombres",
    "trabajadorApellidos",
    "trabajadorSexo",
    "trabajadorCaracteristica",
    "trabajadorCargo",
    "trabajadorTelefono",
    "trabajadorEmail",
    "conmutadorOpcion",
    "conmutadorTransferenciaColaborador",
    "conmutadorInfoTramite",
    "conmutadorInfoSede",
    "centroRecreacionConsultado",
    "consultaUsuario",
    "respuestaAgente",
];

/// One intake record with every section's fields. Hidden sections keep their
/// values here; pruning happens when the payload is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseForm {
    // Contacto
    #[validate(length(min = 1, message = "El campo Contacto es requerido"))]
    pub contacto: String,
    #[validate(length(min = 1, message = "El nombre es requerido"))]
    pub nombre_completo: String,
    #[serde(with = "blank")]
    pub sexo: Option<Sex>,
    pub lugar_contacto: String,
    #[serde(with = "blank")]
    pub tipo_contacto: Option<ContactType>,
    #[validate(length(min = 1, message = "El canal de contacto es requerido"))]
    pub canal_contacto: String,
    #[serde(with = "blank")]
    pub medio_digital: Option<DigitalMedium>,
    #[serde(with = "blank")]
    pub fecha_contacto: Option<DateTime<Utc>>,
    pub hora_contacto: String,

    // Gestión
    #[serde(with = "blank")]
    pub tipo_servicio: Option<ServiceType>,
    pub detalle_servicio: Vec<String>,
    pub consulta_usuario: String,
    pub respuesta_agente: String,

    // Empresa
    pub empresa_involucrada: String,
    #[serde(deserialize_with = "blank_or_default")]
    pub lugar_desempeno_labores: WorkplaceLocation,
    pub nombre_comercial: String,
    pub direccion_empresa: String,
    pub distrito_empresa: String,
    pub telefono_empresa: String,
    #[validate(custom(function = "email_or_empty"))]
    pub email_empresa: String,
    pub direccion_sucursal: String,
    pub distrito_sucursal: String,
    pub telefono_sucursal: String,
    #[validate(custom(function = "email_or_empty"))]
    pub email_sucursal: String,

    // Denuncia
    #[serde(with = "blank")]
    pub tipo_razon_social: Option<LegalEntityType>,
    #[serde(with = "blank")]
    pub tipo_denuncia: Option<ComplaintType>,
    #[serde(with = "blank")]
    pub actividad_economica: Option<EconomicActivity>,
    #[serde(deserialize_with = "deserialize_employee_count")]
    #[validate(range(min = 1, message = "Debe ser un número positivo"))]
    pub cantidad_empleados: Option<i64>,
    pub nombre_agresor: String,
    pub cargo_agresor: String,

    // Trabajador
    #[serde(with = "blank")]
    pub trabajador_tipo_documento: Option<DocumentType>,
    pub trabajador_numero_documento: String,
    pub trabajador_pais_documento: String,
    pub trabajador_nombres: String,
    pub trabajador_apellidos: String,
    #[serde(with = "blank")]
    pub trabajador_sexo: Option<WorkerSex>,
    #[serde(with = "blank")]
    pub trabajador_caracteristica: Option<WorkerTrait>,
    pub trabajador_cargo: String,
    pub trabajador_telefono: String,
    #[validate(custom(function = "email_or_empty"))]
    pub trabajador_email: String,

    // Conmutador y centros de recreación
    #[serde(with = "blank")]
    pub conmutador_opcion: Option<SwitchboardOption>,
    pub conmutador_transferencia_colaborador: String,
    pub conmutador_info_tramite: String,
    pub conmutador_info_sede: String,
    pub centro_recreacion_consultado: String,
}

impl CaseForm {
    /// Decodes a raw form body; type errors surface as validation errors.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| AppError::ValidationError(e.to_string()))
    }

    pub fn is_service(&self, service: ServiceType) -> bool {
        self.tipo_servicio == Some(service)
    }

    pub fn is_complaint_type(&self, complaint: ComplaintType) -> bool {
        self.is_service(ServiceType::Complaint) && self.tipo_denuncia == Some(complaint)
    }

    pub fn has_detail_service(&self, service_id: &str) -> bool {
        self.detalle_servicio
            .iter()
            .any(|id| id.trim().eq_ignore_ascii_case(service_id))
    }

    pub fn reports_harassment(&self) -> bool {
        self.has_detail_service(HARASSMENT_SERVICE_ID)
    }

    pub fn has_company(&self) -> bool {
        !self.empresa_involucrada.trim().is_empty()
    }

    pub fn works_at_branch(&self) -> bool {
        self.lugar_desempeno_labores == WorkplaceLocation::Branch
    }

    /// Worker lookup key, e.g. `DUI-014735502`.
    pub fn worker_key(&self) -> Option<String> {
        let doc = self.trabajador_tipo_documento?;
        let number = self.trabajador_numero_documento.trim();
        if number.is_empty() {
            return None;
        }
        Some(format!("{}{}", doc.code(), number).to_uppercase())
    }
}

/// `nombre_completo` -> `nombreCompleto`.
pub fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Index of a wire field in form order; unknown names sort last.
pub fn field_position(wire: &str) -> usize {
    CASE_FIELDS
        .iter()
        .position(|f| *f == wire)
        .unwrap_or(CASE_FIELDS.len())
}

pub(crate) fn email_or_empty(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() || is_valid_email(value) {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some("Email inválido".into());
    Err(error)
}

fn blank_or_default<'de, T, D>(deserializer: D) -> std::result::Result<T, D::Error>
where
    T: de::DeserializeOwned + Default,
    D: Deserializer<'de>,
{
    blank::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn deserialize_employee_count<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let not_a_number = || de::Error::custom(format!("cantidadEmpleados: {}", NOT_A_NUMBER));
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            parse_whole_number(text).map(Some).ok_or_else(not_a_number)
        }
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(whole))
            .map(Some)
            .ok_or_else(not_a_number),
        Some(_) => Err(not_a_number()),
    }
}

fn parse_whole_number(text: &str) -> Option<i64> {
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().and_then(whole))
}

fn whole(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}
