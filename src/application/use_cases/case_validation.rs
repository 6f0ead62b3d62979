use serde::Serialize;
use validator::Validate;

use crate::application::use_cases::visibility::SectionVisibility;
use crate::domain::case_form::{CaseForm, CASE_FIELDS};
use crate::domain::options::{ComplaintType, ServiceType};
use crate::domain::validation::{dedup_by_path, issues_from_errors, ValidationIssue};

pub const FEEDBACK_NOT_A_CASE: &str = "Las quejas y sugerencias se registran en el buzón";
pub const DETAIL_SERVICE_REQUIRED: &str = "Seleccione al menos un servicio";
pub const COUNTRY_REQUIRED: &str = "País es requerido";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn message_for(&self, path: &str) -> Option<&str> {
        self.issues
            .iter()
            .find(|i| i.path == path)
            .map(|i| i.message.as_str())
    }
}

/// Field rules plus the cross-field rules that depend on the selected
/// service, complaint type, workplace and document type.
pub struct CaseValidator;

impl CaseValidator {
    pub fn validate(form: &CaseForm) -> ValidationReport {
        let mut issues = match form.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => issues_from_errors(&errors, CASE_FIELDS),
        };

        let visibility = SectionVisibility::evaluate(form);
        let mut rules = Rules {
            form,
            issues: &mut issues,
        };
        rules.dispatch();
        rules.management();
        if visibility.feedback {
            rules.require_text("consultaUsuario", &form.consulta_usuario);
            rules.require_text("respuestaAgente", &form.respuesta_agente);
        }
        rules.complaint();
        rules.worker();
        rules.switchboard_and_recreation();

        ValidationReport {
            issues: dedup_by_path(issues),
        }
    }
}

struct Rules<'a> {
    form: &'a CaseForm,
    issues: &'a mut Vec<ValidationIssue>,
}

impl Rules<'_> {
    fn require(&mut self, path: &str, present: bool) {
        if !present {
            self.issues.push(ValidationIssue::required(path));
        }
    }

    fn require_text(&mut self, path: &str, value: &str) {
        self.require(path, !value.trim().is_empty());
    }

    fn dispatch(&mut self) {
        match self.form.tipo_servicio {
            None => self.issues.push(ValidationIssue::required("tipoServicio")),
            Some(ServiceType::Feedback) => self
                .issues
                .push(ValidationIssue::new("tipoServicio", FEEDBACK_NOT_A_CASE)),
            Some(_) => {}
        }
        self.require("tipoContacto", self.form.tipo_contacto.is_some());
    }

    fn management(&mut self) {
        let form = self.form;
        if form.is_service(ServiceType::Advisory) || form.is_service(ServiceType::Complaint) {
            let any = form.detalle_servicio.iter().any(|s| !s.trim().is_empty());
            if !any {
                self.issues
                    .push(ValidationIssue::new("detalleServicio", DETAIL_SERVICE_REQUIRED));
            }
        }
    }

    fn complaint(&mut self) {
        let form = self.form;
        if !form.is_service(ServiceType::Complaint) {
            return;
        }
        self.require("tipoRazonSocial", form.tipo_razon_social.is_some());
        self.require("tipoDenuncia", form.tipo_denuncia.is_some());
        self.require("actividadEconomica", form.actividad_economica.is_some());
        self.require("cantidadEmpleados", form.cantidad_empleados.is_some());
        self.require_text("empresaInvolucrada", &form.empresa_involucrada);
        self.require_text("nombreComercial", &form.nombre_comercial);

        if form.works_at_branch() {
            self.require_text("direccionSucursal", &form.direccion_sucursal);
            self.require_text("distritoSucursal", &form.distrito_sucursal);
        }
        if form.reports_harassment() {
            self.require_text("nombreAgresor", &form.nombre_agresor);
            self.require_text("cargoAgresor", &form.cargo_agresor);
        }
    }

    fn worker(&mut self) {
        let form = self.form;
        if !form.is_complaint_type(ComplaintType::Special) {
            return;
        }
        self.require("trabajadorTipoDocumento", form.trabajador_tipo_documento.is_some());
        self.require_text("trabajadorNumeroDocumento", &form.trabajador_numero_documento);
        self.require_text("trabajadorNombres", &form.trabajador_nombres);
        self.require_text("trabajadorApellidos", &form.trabajador_apellidos);
        self.require("trabajadorSexo", form.trabajador_sexo.is_some());
        self.require("trabajadorCaracteristica", form.trabajador_caracteristica.is_some());
        self.require_text("trabajadorCargo", &form.trabajador_cargo);
        self.require_text("trabajadorTelefono", &form.trabajador_telefono);

        let needs_country = form
            .trabajador_tipo_documento
            .map(|doc| doc.requires_country())
            .unwrap_or(false);
        if needs_country && form.trabajador_pais_documento.trim().is_empty() {
            self.issues
                .push(ValidationIssue::new("trabajadorPaisDocumento", COUNTRY_REQUIRED));
        }
    }

    fn switchboard_and_recreation(&mut self) {
        let form = self.form;
        if form.is_service(ServiceType::Switchboard) {
            self.require("conmutadorOpcion", form.conmutador_opcion.is_some());
        }
        if form.is_service(ServiceType::RecreationCenter) {
            self.require_text("centroRecreacionConsultado", &form.centro_recreacion_consultado);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::{
        ContactType, DocumentType, EconomicActivity, LegalEntityType, SwitchboardOption,
        WorkerSex, WorkerTrait, WorkplaceLocation, HARASSMENT_SERVICE_ID,
    };
    use crate::domain::validation::REQUIRED;

    fn base() -> CaseForm {
        CaseForm {
            contacto: "22313122".into(),
            nombre_completo: "MARIA LOPEZ".into(),
            canal_contacto: "Llamada Entrante".into(),
            tipo_contacto: Some(ContactType::Worker),
            ..CaseForm::default()
        }
    }

    fn complaint() -> CaseForm {
        CaseForm {
            tipo_servicio: Some(ServiceType::Complaint),
            detalle_servicio: vec!["S-100".into()],
            tipo_razon_social: Some(LegalEntityType::LegalPerson),
            tipo_denuncia: Some(ComplaintType::Scheduled),
            actividad_economica: Some(EconomicActivity::Industry),
            cantidad_empleados: Some(40),
            empresa_involucrada: "1".into(),
            nombre_comercial: "TEXTILES DEL PACIFICO".into(),
            consulta_usuario: "Despido sin pago".into(),
            respuesta_agente: "Se programa inspección".into(),
            ..base()
        }
    }

    #[test]
    fn test_valid_advisory() {
        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Advisory),
            detalle_servicio: vec!["S-001".into()],
            consulta_usuario: "Cálculo de vacaciones".into(),
            respuesta_agente: "Se explicó el cálculo".into(),
            ..base()
        };
        let report = CaseValidator::validate(&form);
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn test_empty_form_reports_static_and_dispatch_rules() {
        let report = CaseValidator::validate(&CaseForm::default());
        assert_eq!(report.message_for("contacto"), Some("El campo Contacto es requerido"));
        assert_eq!(report.message_for("nombreCompleto"), Some("El nombre es requerido"));
        assert_eq!(report.message_for("tipoServicio"), Some(REQUIRED));
        assert_eq!(report.message_for("tipoContacto"), Some(REQUIRED));
    }

    #[test]
    fn test_feedback_service_is_rejected() {
        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Feedback),
            ..base()
        };
        let report = CaseValidator::validate(&form);
        assert_eq!(report.message_for("tipoServicio"), Some(FEEDBACK_NOT_A_CASE));
    }

    #[test]
    fn test_advisory_requires_detail_and_feedback() {
        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Advisory),
            ..base()
        };
        let report = CaseValidator::validate(&form);
        assert_eq!(report.message_for("detalleServicio"), Some(DETAIL_SERVICE_REQUIRED));
        assert_eq!(report.message_for("consultaUsuario"), Some(REQUIRED));
        assert_eq!(report.message_for("respuestaAgente"), Some(REQUIRED));
    }

    #[test]
    fn test_valid_scheduled_complaint() {
        let report = CaseValidator::validate(&complaint());
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn test_complaint_required_fields() {
        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Complaint),
            detalle_servicio: vec!["S-100".into()],
            ..base()
        };
        let report = CaseValidator::validate(&form);
        for path in [
            "tipoRazonSocial",
            "tipoDenuncia",
            "actividadEconomica",
            "cantidadEmpleados",
            "empresaInvolucrada",
            "nombreComercial",
        ] {
            assert_eq!(report.message_for(path), Some(REQUIRED), "{}", path);
        }
        // Feedback waits for the complaint type.
        assert!(report.message_for("consultaUsuario").is_none());
    }

    #[test]
    fn test_branch_and_aggressor_rules() {
        let mut form = complaint();
        form.lugar_desempeno_labores = WorkplaceLocation::Branch;
        form.detalle_servicio.push(HARASSMENT_SERVICE_ID.into());
        let report = CaseValidator::validate(&form);
        for path in ["direccionSucursal", "distritoSucursal", "nombreAgresor", "cargoAgresor"] {
            assert_eq!(report.message_for(path), Some(REQUIRED), "{}", path);
        }
    }

    #[test]
    fn test_special_complaint_requires_worker() {
        let mut form = complaint();
        form.tipo_denuncia = Some(ComplaintType::Special);
        let report = CaseValidator::validate(&form);
        assert_eq!(report.message_for("trabajadorTipoDocumento"), Some(REQUIRED));
        assert_eq!(report.message_for("trabajadorTelefono"), Some(REQUIRED));
        assert!(report.message_for("trabajadorEmail").is_none());
        assert!(report.message_for("trabajadorPaisDocumento").is_none());

        form.trabajador_tipo_documento = Some(DocumentType::Passport);
        form.trabajador_numero_documento = "X123".into();
        form.trabajador_nombres = "JUAN".into();
        form.trabajador_apellidos = "PEREZ".into();
        form.trabajador_sexo = Some(WorkerSex::Male);
        form.trabajador_caracteristica = Some(WorkerTrait::None);
        form.trabajador_cargo = "OPERARIO".into();
        form.trabajador_telefono = "77778888".into();
        let report = CaseValidator::validate(&form);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.message_for("trabajadorPaisDocumento"), Some(COUNTRY_REQUIRED));

        form.trabajador_pais_documento = "MEXICO".into();
        assert!(CaseValidator::validate(&form).is_valid());
    }

    #[test]
    fn test_stale_document_type_outside_worker_section() {
        let mut form = complaint();
        form.trabajador_tipo_documento = Some(DocumentType::CentralAmerican);
        assert!(CaseValidator::validate(&form).is_valid());
    }

    #[test]
    fn test_switchboard_and_recreation() {
        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Switchboard),
            ..base()
        };
        let report = CaseValidator::validate(&form);
        assert_eq!(report.message_for("conmutadorOpcion"), Some(REQUIRED));
        assert!(report.message_for("consultaUsuario").is_none());

        let form = CaseForm {
            tipo_servicio: Some(ServiceType::Switchboard),
            conmutador_opcion: Some(SwitchboardOption::WrongNumber),
            ..base()
        };
        assert!(CaseValidator::validate(&form).is_valid());

        let form = CaseForm {
            tipo_servicio: Some(ServiceType::RecreationCenter),
            consulta_usuario: "Tarifas".into(),
            respuesta_agente: "Entrada gratuita".into(),
            ..base()
        };
        let report = CaseValidator::validate(&form);
        assert_eq!(report.message_for("centroRecreacionConsultado"), Some(REQUIRED));
    }

    #[test]
    fn test_issues_are_unique_per_path() {
        let mut form = complaint();
        form.email_empresa = "no-es-correo".into();
        form.cantidad_empleados = Some(0);
        let report = CaseValidator::validate(&form);
        let paths: std::collections::HashSet<&str> =
            report.issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths.len(), report.issues.len());
        assert_eq!(report.message_for("emailEmpresa"), Some("Email inválido"));
        assert_eq!(
            report.message_for("cantidadEmpleados"),
            Some("Debe ser un número positivo")
        );
    }
}
