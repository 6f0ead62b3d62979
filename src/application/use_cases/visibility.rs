//! Section visibility for the case form
//!
//! Pure function of the current form state. The same evaluation drives what
//! the client renders, which cross-field rules apply and which values are
//! kept in the stored payload.

use serde::Serialize;

use crate::domain::case_form::{field_position, CaseForm};
use crate::domain::catalog::company_size;
use crate::domain::contact::{detect_contact_kind, ContactKind};
use crate::domain::options::{ComplaintType, DocumentType, ServiceType, SwitchboardOption};

/// How an always-present field behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldMode {
    Editable,
    AutoFilled,
    Disabled,
}

/// Input used for the worker's document country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CountryInput {
    Hidden,
    CentralAmericanSelect,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionVisibility {
    pub contact_kind: ContactKind,
    pub contact_place: FieldMode,
    pub digital_medium: bool,
    pub management: bool,
    pub complaint: bool,
    pub aggressor: bool,
    pub headquarters: bool,
    pub branch: bool,
    pub worker: bool,
    pub worker_country: CountryInput,
    pub switchboard: bool,
    pub switchboard_transfer: bool,
    pub switchboard_procedure: bool,
    pub switchboard_office_map: bool,
    pub switchboard_office_hours: bool,
    pub recreation_center: bool,
    pub feedback: bool,
    /// `FEE` routes to the suggestion box instead of a case.
    pub suggestion_box: bool,
    pub company_size: &'static str,
}

const CONTACT_FIELDS: &[&str] = &[
    "contacto",
    "nombreCompleto",
    "sexo",
    "lugarContacto",
    "tipoContacto",
    "canalContacto",
    "fechaContacto",
    "horaContacto",
    "tipoServicio",
];

const COMPLAINT_FIELDS: &[&str] = &[
    "empresaInvolucrada",
    "tipoRazonSocial",
    "tipoDenuncia",
    "actividadEconomica",
    "cantidadEmpleados",
];

const HEADQUARTERS_FIELDS: &[&str] = &[
    "lugarDesempenoLabores",
    "nombreComercial",
    "direccionEmpresa",
    "distritoEmpresa",
    "telefonoEmpresa",
    "emailEmpresa",
];

const BRANCH_FIELDS: &[&str] = &[
    "direccionSucursal",
    "distritoSucursal",
    "telefonoSucursal",
    "emailSucursal",
];

const AGGRESSOR_FIELDS: &[&str] = &["nombreAgresor", "cargoAgresor"];

const WORKER_FIELDS: &[&str] = &[
    "trabajadorTipoDocumento",
    "trabajadorNumeroDocumento",
    "trabajadorNombres",
    "trabajadorApellidos",
    "trabajadorSexo",
    "trabajadorCaracteristica",
    "trabajadorCargo",
    "trabajadorTelefono",
    "trabajadorEmail",
];

const FEEDBACK_FIELDS: &[&str] = &["consultaUsuario", "respuestaAgente"];

impl SectionVisibility {
    pub fn evaluate(form: &CaseForm) -> Self {
        let service = form.tipo_servicio;
        let is = |s: ServiceType| service == Some(s);

        let contact_kind = detect_contact_kind(&form.contacto);
        let contact_place = match contact_kind {
            ContactKind::Local => FieldMode::Editable,
            ContactKind::International => FieldMode::AutoFilled,
            _ => FieldMode::Disabled,
        };

        let complaint = is(ServiceType::Complaint);
        let headquarters = complaint && form.has_company();
        let worker = form.is_complaint_type(ComplaintType::Special);

        let worker_country = match form.trabajador_tipo_documento {
            Some(DocumentType::CentralAmerican) if worker => CountryInput::CentralAmericanSelect,
            Some(doc) if worker && doc.requires_country() => CountryInput::FreeText,
            _ => CountryInput::Hidden,
        };

        let switchboard = is(ServiceType::Switchboard);
        let option = |o: SwitchboardOption| switchboard && form.conmutador_opcion == Some(o);

        let feedback = is(ServiceType::Advisory)
            || form.is_complaint_type(ComplaintType::Scheduled)
            || form.is_complaint_type(ComplaintType::Special)
            || option(SwitchboardOption::NonInstitutionalAdvice)
            || option(SwitchboardOption::Transfer)
            || is(ServiceType::RecreationCenter)
            || is(ServiceType::Municipal);

        Self {
            contact_kind,
            contact_place,
            digital_medium: contact_kind == ContactKind::Digital,
            management: is(ServiceType::Advisory) || complaint,
            complaint,
            aggressor: complaint && form.reports_harassment(),
            headquarters,
            branch: headquarters && form.works_at_branch(),
            worker,
            worker_country,
            switchboard,
            switchboard_transfer: option(SwitchboardOption::Transfer),
            switchboard_procedure: option(SwitchboardOption::ProcedureInfo),
            switchboard_office_map: option(SwitchboardOption::OfficeLocation),
            switchboard_office_hours: option(SwitchboardOption::OfficeHours),
            recreation_center: is(ServiceType::RecreationCenter),
            feedback,
            suggestion_box: is(ServiceType::Feedback),
            company_size: if complaint {
                company_size(form.cantidad_empleados)
            } else {
                ""
            },
        }
    }

    /// Wire names of every visible field, in form order.
    pub fn visible_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = CONTACT_FIELDS.to_vec();
        let mut extend = |on: bool, group: &[&'static str]| {
            if on {
                fields.extend_from_slice(group);
            }
        };

        extend(self.digital_medium, &["medioDigital"]);
        extend(self.management, &["detalleServicio"]);
        extend(self.complaint, COMPLAINT_FIELDS);
        extend(self.headquarters, HEADQUARTERS_FIELDS);
        extend(self.branch, BRANCH_FIELDS);
        extend(self.aggressor, AGGRESSOR_FIELDS);
        extend(self.worker, WORKER_FIELDS);
        extend(
            self.worker_country != CountryInput::Hidden,
            &["trabajadorPaisDocumento"],
        );
        extend(self.switchboard, &["conmutadorOpcion"]);
        extend(self.switchboard_transfer, &["conmutadorTransferenciaColaborador"]);
        extend(self.switchboard_procedure, &["conmutadorInfoTramite"]);
        extend(
            self.switchboard_office_map || self.switchboard_office_hours,
            &["conmutadorInfoSede"],
        );
        extend(self.recreation_center, &["centroRecreacionConsultado"]);
        extend(self.feedback, FEEDBACK_FIELDS);

        fields.sort_by_key(|f| field_position(f));
        fields
    }

    pub fn is_visible(&self, wire: &str) -> bool {
        self.visible_fields().contains(&wire)
    }
}
