//! Reactive derivations applied to the case form while it is being filled.
//!
//! Each function takes the form by `&mut` and returns what the caller needs
//! to show (warnings, lock state, dialog routing).

use serde::{Deserialize, Serialize};

use crate::application::use_cases::phone_country::{
    PhoneCountry, PhoneCountryResolver, INVALID_INTERNATIONAL,
};
use crate::domain::case_form::CaseForm;
use crate::domain::catalog::{Company, WorkerRecord};
use crate::domain::contact::{detect_contact_kind, ContactKind};
use crate::domain::options::{
    blank, DocumentType, ServiceType, WorkerSex, WorkerTrait, ANONYMOUS_NAME, CHANNEL_DIGITAL,
    CHANNEL_OTHER,
};
use crate::shared::text::{normalize_text, normalize_upper};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactEffect {
    pub kind: ContactKind,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServiceSelection {
    Case,
    OpenSuggestionBox,
}

/// One round of form derivations requested by the client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefillRequest {
    pub form: CaseForm,
    pub anonymous: Option<bool>,
    /// New worker document type; resets the worker fields when it changes.
    #[serde(with = "blank")]
    pub document_type: Option<DocumentType>,
    pub lookup_worker: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prefill {
    pub form: CaseForm,
    pub contact: ContactEffect,
    pub service: ServiceSelection,
    pub worker_locked: bool,
}

/// Applies every derivation in form order. `worker` is the registry match
/// for the form's worker key, already looked up by the caller.
pub async fn prefill(
    request: PrefillRequest,
    resolver: &dyn PhoneCountryResolver,
    companies: &[Company],
    worker: Option<&WorkerRecord>,
) -> Prefill {
    let mut form = request.form;

    let requested = form.tipo_servicio;
    let service = select_service(&mut form, requested);
    if let Some(anonymous) = request.anonymous {
        apply_anonymous(&mut form, anonymous);
    }
    let contact = apply_contact(&mut form, resolver).await;
    apply_company(&mut form, companies);

    if let Some(document) = request.document_type {
        if form.trabajador_tipo_documento != Some(document) {
            change_document_type(&mut form, Some(document));
        }
    }
    let worker_locked = request.lookup_worker && apply_worker_lookup(&mut form, worker);

    Prefill {
        form,
        contact,
        service,
        worker_locked,
    }
}

/// Classifies `contacto` and derives channel and contact place from it.
pub async fn apply_contact(form: &mut CaseForm, resolver: &dyn PhoneCountryResolver) -> ContactEffect {
    let kind = detect_contact_kind(&form.contacto);
    let mut warning = None;

    match kind {
        ContactKind::Digital => form.canal_contacto = CHANNEL_DIGITAL.to_string(),
        ContactKind::Other if !form.contacto.trim().is_empty() => {
            form.canal_contacto = CHANNEL_OTHER.to_string()
        }
        // A channel the agent picked survives; only derived ones are cleared.
        ContactKind::Local | ContactKind::International => {
            if is_derived_channel(&form.canal_contacto) {
                form.canal_contacto.clear();
            }
        }
        ContactKind::Other => {}
    }

    if kind != ContactKind::Local {
        form.lugar_contacto.clear();
    }
    if kind != ContactKind::Digital {
        form.medio_digital = None;
    }

    if kind == ContactKind::International {
        match resolver.resolve(form.contacto.trim()).await {
            PhoneCountry::Resolved { country } => form.lugar_contacto = country,
            PhoneCountry::Rejected { error } => {
                form.lugar_contacto = INVALID_INTERNATIONAL.to_string();
                warning = Some(error);
            }
        }
    }

    ContactEffect { kind, warning }
}

fn is_derived_channel(channel: &str) -> bool {
    let channel = channel.trim();
    channel == CHANNEL_DIGITAL || channel == CHANNEL_OTHER
}

pub fn apply_anonymous(form: &mut CaseForm, anonymous: bool) {
    if anonymous {
        form.nombre_completo = ANONYMOUS_NAME.to_string();
    } else if form.nombre_completo == ANONYMOUS_NAME {
        form.nombre_completo.clear();
    }
}

/// Fills the headquarters block from the selected company, or clears it.
pub fn apply_company(form: &mut CaseForm, companies: &[Company]) {
    let selected = form.empresa_involucrada.trim();
    let company = if selected.is_empty() {
        None
    } else {
        companies.iter().find(|c| c.id.trim() == selected)
    };

    match company {
        Some(c) => {
            form.nombre_comercial = c.nombre_comercial.clone();
            form.tipo_razon_social = c.legal_entity_type();
            form.direccion_empresa = c.direccion.clone();
            form.distrito_empresa = c.distrito.clone();
            form.telefono_empresa = c.telefono.clone();
            form.email_empresa = c.email.clone();
        }
        None => {
            form.nombre_comercial.clear();
            form.tipo_razon_social = None;
            form.direccion_empresa.clear();
            form.distrito_empresa.clear();
            form.telefono_empresa.clear();
            form.email_empresa.clear();
        }
    }
}

/// Applies a worker lookup result. Returns whether the worker fields are
/// locked (filled from the registry).
pub fn apply_worker_lookup(form: &mut CaseForm, user: Option<&WorkerRecord>) -> bool {
    match user {
        Some(u) => {
            form.trabajador_nombres = u.nombre_usuario.clone();
            form.trabajador_apellidos = u.apellido_usuario.clone();
            form.trabajador_sexo = WorkerSex::from_code(&u.sexo_usuario);
            form.trabajador_caracteristica = WorkerTrait::from_code(&u.caracteristica_usuario);
            form.trabajador_pais_documento = u.pais_identificacion.clone();
            form.trabajador_cargo = u.cargo.clone();
            form.trabajador_telefono = u.tel_usuario.clone();
            form.trabajador_email = u.email_usuario.clone();
            true
        }
        None => {
            clear_worker_details(form);
            false
        }
    }
}

/// A new document type invalidates everything typed for the previous one.
pub fn change_document_type(form: &mut CaseForm, document: Option<DocumentType>) {
    form.trabajador_tipo_documento = document;
    form.trabajador_numero_documento.clear();
    clear_worker_details(form);
}

pub fn select_service(form: &mut CaseForm, service: Option<ServiceType>) -> ServiceSelection {
    if service == Some(ServiceType::Feedback) {
        form.tipo_servicio = None;
        return ServiceSelection::OpenSuggestionBox;
    }
    form.tipo_servicio = service;
    ServiceSelection::Case
}

/// Trims every text value and upper-cases the ones shown in capitals.
pub fn normalize_for_submission(form: &mut CaseForm) {
    for field in [
        &mut form.contacto,
        &mut form.canal_contacto,
        &mut form.hora_contacto,
        &mut form.empresa_involucrada,
        &mut form.distrito_empresa,
        &mut form.telefono_empresa,
        &mut form.email_empresa,
        &mut form.distrito_sucursal,
        &mut form.telefono_sucursal,
        &mut form.email_sucursal,
        &mut form.trabajador_telefono,
        &mut form.trabajador_email,
        &mut form.conmutador_transferencia_colaborador,
        &mut form.conmutador_info_tramite,
        &mut form.conmutador_info_sede,
        &mut form.centro_recreacion_consultado,
    ] {
        *field = normalize_text(field);
    }

    // Free text keeps its line breaks.
    for field in [&mut form.consulta_usuario, &mut form.respuesta_agente] {
        *field = field.trim().to_string();
    }

    for field in [
        &mut form.nombre_completo,
        &mut form.lugar_contacto,
        &mut form.nombre_comercial,
        &mut form.direccion_empresa,
        &mut form.direccion_sucursal,
        &mut form.nombre_agresor,
        &mut form.cargo_agresor,
        &mut form.trabajador_numero_documento,
        &mut form.trabajador_pais_documento,
        &mut form.trabajador_nombres,
        &mut form.trabajador_apellidos,
        &mut form.trabajador_cargo,
    ] {
        *field = normalize_upper(field);
    }

    form.detalle_servicio = form
        .detalle_servicio
        .iter()
        .map(|s| normalize_text(s))
        .filter(|s| !s.is_empty())
        .collect();
}

fn clear_worker_details(form: &mut CaseForm) {
    form.trabajador_pais_documento.clear();
    form.trabajador_nombres.clear();
    form.trabajador_apellidos.clear();
    form.trabajador_sexo = None;
    form.trabajador_caracteristica = None;
    form.trabajador_cargo.clear();
    form.trabajador_telefono.clear();
    form.trabajador_email.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::phone_country::PrefixCountryResolver;
    use crate::domain::options::{DigitalMedium, LegalEntityType};

    #[tokio::test]
    async fn test_digital_contact_sets_channel() {
        let mut form = CaseForm {
            contacto: "ana@correo.com".into(),
            lugar_contacto: "SAN SALVADOR CENTRO".into(),
            ..CaseForm::default()
        };
        let effect = apply_contact(&mut form, &PrefixCountryResolver).await;
        assert_eq!(effect.kind, ContactKind::Digital);
        assert_eq!(form.canal_contacto, CHANNEL_DIGITAL);
        assert!(form.lugar_contacto.is_empty());
    }

    #[tokio::test]
    async fn test_other_contact_and_local_reset() {
        let mut form = CaseForm {
            contacto: "ventanilla".into(),
            medio_digital: Some(DigitalMedium::Facebook),
            ..CaseForm::default()
        };
        apply_contact(&mut form, &PrefixCountryResolver).await;
        assert_eq!(form.canal_contacto, CHANNEL_OTHER);
        assert!(form.medio_digital.is_none());

        form.contacto = "22313122".into();
        form.lugar_contacto = "SANTA ANA CENTRO".into();
        let effect = apply_contact(&mut form, &PrefixCountryResolver).await;
        assert_eq!(effect.kind, ContactKind::Local);
        assert!(form.canal_contacto.is_empty());
        assert_eq!(form.lugar_contacto, "SANTA ANA CENTRO");
    }

    #[tokio::test]
    async fn test_international_contact_resolves_country() {
        let mut form = CaseForm {
            contacto: "+12025550123".into(),
            ..CaseForm::default()
        };
        let effect = apply_contact(&mut form, &PrefixCountryResolver).await;
        assert!(effect.warning.is_none());
        assert_eq!(form.lugar_contacto, "ESTADOS UNIDOS/CANADÁ");

        form.contacto = "+50322313122".into();
        let effect = apply_contact(&mut form, &PrefixCountryResolver).await;
        assert!(effect.warning.is_some());
        assert_eq!(form.lugar_contacto, INVALID_INTERNATIONAL);
    }

    #[test]
    fn test_anonymous_toggle() {
        let mut form = CaseForm::default();
        apply_anonymous(&mut form, true);
        assert_eq!(form.nombre_completo, ANONYMOUS_NAME);
        apply_anonymous(&mut form, false);
        assert!(form.nombre_completo.is_empty());

        form.nombre_completo = "JOSE".into();
        apply_anonymous(&mut form, false);
        assert_eq!(form.nombre_completo, "JOSE");
    }

    #[test]
    fn test_company_fill_and_clear() {
        let companies = vec![Company {
            id: "3".into(),
            razon_social: "INDUSTRIAS LA FE, S.A. DE C.V.".into(),
            nombre_comercial: "LA FE".into(),
            tipo_razon_social: "PJ".into(),
            direccion: "KM 10 CARRETERA AL PUERTO".into(),
            distrito: "SOYAPANGO".into(),
            telefono: "22223333".into(),
            email: "rrhh@lafe.com.sv".into(),
            ..Company::default()
        }];
        let mut form = CaseForm {
            empresa_involucrada: "3".into(),
            ..CaseForm::default()
        };
        apply_company(&mut form, &companies);
        assert_eq!(form.nombre_comercial, "LA FE");
        assert_eq!(form.tipo_razon_social, Some(LegalEntityType::LegalPerson));

        form.empresa_involucrada = "99".into();
        apply_company(&mut form, &companies);
        assert!(form.nombre_comercial.is_empty());
        assert!(form.tipo_razon_social.is_none());
    }

    #[test]
    fn test_worker_lookup_and_document_change() {
        let user = WorkerRecord {
            key: "DUI-014735502".into(),
            tipo_identificacion: "DUI-".into(),
            id_usuario: "014735502".into(),
            nombre_usuario: "CARLOS".into(),
            apellido_usuario: "MARTINEZ".into(),
            sexo_usuario: "MASCULINO".into(),
            caracteristica_usuario: "NINGUNA".into(),
            cargo: "BODEGUERO".into(),
            tel_usuario: "77001122".into(),
            ..WorkerRecord::default()
        };
        let mut form = CaseForm {
            trabajador_tipo_documento: Some(DocumentType::Dui),
            trabajador_numero_documento: "014735502".into(),
            ..CaseForm::default()
        };
        assert!(apply_worker_lookup(&mut form, Some(&user)));
        assert_eq!(form.trabajador_sexo, Some(WorkerSex::Male));
        assert_eq!(form.trabajador_cargo, "BODEGUERO");

        change_document_type(&mut form, Some(DocumentType::Passport));
        assert!(form.trabajador_numero_documento.is_empty());
        assert!(form.trabajador_nombres.is_empty());
        assert!(form.trabajador_sexo.is_none());

        form.trabajador_nombres = "MANUAL".into();
        assert!(!apply_worker_lookup(&mut form, None));
        assert!(form.trabajador_nombres.is_empty());
    }

    #[test]
    fn test_feedback_service_opens_suggestion_box() {
        let mut form = CaseForm::default();
        assert_eq!(
            select_service(&mut form, Some(ServiceType::Feedback)),
            ServiceSelection::OpenSuggestionBox
        );
        assert!(form.tipo_servicio.is_none());
        assert_eq!(
            select_service(&mut form, Some(ServiceType::Advisory)),
            ServiceSelection::Case
        );
        assert_eq!(form.tipo_servicio, Some(ServiceType::Advisory));
    }

    #[tokio::test]
    async fn test_prefill_runs_every_derivation() {
        let companies = vec![Company {
            id: "3".into(),
            nombre_comercial: "LA FE".into(),
            tipo_razon_social: "PN".into(),
            ..Company::default()
        }];
        let request = PrefillRequest {
            form: CaseForm {
                contacto: "@denunciante".into(),
                tipo_servicio: Some(ServiceType::Complaint),
                empresa_involucrada: "3".into(),
                trabajador_tipo_documento: Some(DocumentType::Dui),
                trabajador_nombres: "ESCRITO A MANO".into(),
                ..CaseForm::default()
            },
            anonymous: Some(true),
            document_type: Some(DocumentType::Passport),
            lookup_worker: true,
        };
        let result = prefill(request, &PrefixCountryResolver, &companies, None).await;

        assert_eq!(result.service, ServiceSelection::Case);
        assert_eq!(result.contact.kind, ContactKind::Digital);
        assert_eq!(result.form.nombre_completo, ANONYMOUS_NAME);
        assert_eq!(result.form.canal_contacto, CHANNEL_DIGITAL);
        assert_eq!(result.form.nombre_comercial, "LA FE");
        assert_eq!(result.form.trabajador_tipo_documento, Some(DocumentType::Passport));
        assert!(result.form.trabajador_nombres.is_empty());
        assert!(!result.worker_locked);
    }

    #[tokio::test]
    async fn test_prefill_routes_feedback_to_suggestion_box() {
        let request = PrefillRequest {
            form: CaseForm {
                tipo_servicio: Some(ServiceType::Feedback),
                ..CaseForm::default()
            },
            ..PrefillRequest::default()
        };
        let result = prefill(request, &PrefixCountryResolver, &[], None).await;
        assert_eq!(result.service, ServiceSelection::OpenSuggestionBox);
        assert!(result.form.tipo_servicio.is_none());
    }

    #[test]
    fn test_normalize_for_submission() {
        let mut form = CaseForm {
            contacto: " ana@correo.com ".into(),
            nombre_completo: "  maría   lópez ".into(),
            detalle_servicio: vec![" S-001 ".into(), "  ".into()],
            ..CaseForm::default()
        };
        normalize_for_submission(&mut form);
        assert_eq!(form.contacto, "ana@correo.com");
        assert_eq!(form.nombre_completo, "MARÍA LÓPEZ");
        assert_eq!(form.detalle_servicio, vec!["S-001"]);
    }

    #[test]
    fn test_normalize_keeps_free_text_lines() {
        let mut form = CaseForm {
            consulta_usuario: "  Consulta sobre vacaciones.\n\nNo le pagaron el recargo.  ".into(),
            respuesta_agente: "Paso 1: revisar contrato.\nPaso 2: calcular vacaciones.\n".into(),
            ..CaseForm::default()
        };
        normalize_for_submission(&mut form);
        assert_eq!(
            form.consulta_usuario,
            "Consulta sobre vacaciones.\n\nNo le pagaron el recargo."
        );
        assert_eq!(
            form.respuesta_agente,
            "Paso 1: revisar contrato.\nPaso 2: calcular vacaciones."
        );
    }

    #[tokio::test]
    async fn test_local_contact_keeps_chosen_channel() {
        let mut form = CaseForm {
            contacto: "22313122".into(),
            canal_contacto: "Llamada Entrante".into(),
            ..CaseForm::default()
        };
        apply_contact(&mut form, &PrefixCountryResolver).await;
        assert_eq!(form.canal_contacto, "Llamada Entrante");

        form.contacto = "+12025550123".into();
        apply_contact(&mut form, &PrefixCountryResolver).await;
        assert_eq!(form.canal_contacto, "Llamada Entrante");
    }

    #[tokio::test]
    async fn test_prefill_rounds_keep_chosen_channel() {
        let request = PrefillRequest {
            form: CaseForm {
                contacto: "22313122".into(),
                canal_contacto: "Llamada Entrante".into(),
                lugar_contacto: "SAN SALVADOR CENTRO".into(),
                ..CaseForm::default()
            },
            anonymous: Some(true),
            ..PrefillRequest::default()
        };
        let first = prefill(request, &PrefixCountryResolver, &[], None).await;
        assert_eq!(first.form.canal_contacto, "Llamada Entrante");

        let again = PrefillRequest {
            form: first.form,
            anonymous: Some(false),
            lookup_worker: true,
            ..PrefillRequest::default()
        };
        let second = prefill(again, &PrefixCountryResolver, &[], None).await;
        assert_eq!(second.form.canal_contacto, "Llamada Entrante");
        assert_eq!(second.form.lugar_contacto, "SAN SALVADOR CENTRO");
        assert!(second.form.nombre_completo.is_empty());
    }
}
