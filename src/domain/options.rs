use serde::de::{self, Deserializer, IntoDeserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A `{value, label}` pair as consumed by the intake form selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

macro_rules! option_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($code:expr, $label:expr)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                let code = code.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|item| item.code().eq_ignore_ascii_case(code))
            }

            pub fn options() -> Vec<SelectOption> {
                Self::ALL
                    .iter()
                    .map(|item| SelectOption::new(item.code(), item.label()))
                    .collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_code(&raw).ok_or_else(|| {
                    de::Error::custom(format!("Opción inválida '{}' para {}", raw, stringify!($name)))
                })
            }
        }
    };
}

option_enum!(
    /// Sex of the person who contacts the center.
    Sex {
        Male => ("H", "Hombre"),
        Female => ("M", "Mujer"),
    }
);

option_enum!(
    ContactType {
        Worker => ("TRA", "Trabajador/a"),
        Employer => ("EMP", "Empleador"),
        Individual => ("PAR", "Particular"),
        Student => ("EST", "Estudiante"),
    }
);

option_enum!(
    DigitalMedium {
        OnlineAssistant => ("AL", "Atención en Línea"),
        Mailbox => ("BS", "Buzón del Sitio"),
        Website => ("WI", "Sitio Web Institucional"),
        Facebook => ("FB", "Facebook"),
        Instagram => ("IN", "Instagram"),
        X => ("X", "X"),
        WhatsApp => ("WA", "WhatsApp"),
    }
);

option_enum!(
    /// Top-level dispatch key of a case.
    ServiceType {
        Advisory => ("ASE", "Asesoría"),
        Complaint => ("DEN", "Denuncia"),
        Switchboard => ("CON", "Conmutador"),
        RecreationCenter => ("CR", "Centro de Recreación"),
        Municipal => ("AM", "Alcaldía Municipal"),
        Feedback => ("FEE", "Buzón de Quejas y Sugerencias"),
    }
);

option_enum!(
    WorkplaceLocation {
        Headquarters => ("CM", "Casa Matriz"),
        Branch => ("SU", "Sucursal"),
    }
);

impl Default for WorkplaceLocation {
    fn default() -> Self {
        WorkplaceLocation::Headquarters
    }
}

option_enum!(
    LegalEntityType {
        NaturalPerson => ("PN", "Persona Natural"),
        LegalPerson => ("PJ", "Persona Jurídica"),
    }
);

option_enum!(
    ComplaintType {
        Special => ("ESP", "Denuncia Especial"),
        Scheduled => ("PRO", "Denuncia Programada"),
    }
);

option_enum!(
    EconomicActivity {
        Agriculture => ("AGR", "Agricultura"),
        Industry => ("IND", "Industria"),
        Commerce => ("COM", "Comercio"),
        Services => ("SER", "Servicios"),
        Construction => ("CON", "Construcción"),
    }
);

option_enum!(
    /// Identity document prefixes. The code is also the prefix of a worker lookup key.
    DocumentType {
        Dui => ("DUI-", "DUI"),
        Residence => ("RES-", "Carnet de Residencia"),
        CentralAmerican => ("DCA-", "Documento Centro Americano"),
        Passport => ("PAS-", "Pasaporte"),
    }
);

impl DocumentType {
    /// Foreign documents need the issuing country.
    pub fn requires_country(&self) -> bool {
        !matches!(self, DocumentType::Dui)
    }
}

option_enum!(
    WorkerSex {
        Male => ("MASCULINO", "MASCULINO"),
        Female => ("FEMENINO", "FEMENINO"),
    }
);

option_enum!(
    WorkerTrait {
        None => ("NINGUNA", "NINGUNA"),
        Disability => ("DISC", "DISCAPACIDAD"),
        Pregnant => ("MEMB", "MUJER EMBARAZADA"),
        Lactating => ("MLACT", "MUJER LACTANTE"),
        Elderly => ("AMAY", "ADULTO MAYOR"),
        ChronicIllness => ("ECRON", "ENFERMEDAD CRONICA"),
        Unionist => ("SINDI", "SINDICALISTA"),
        Adolescent => ("ADOLE", "ADOLESCENTE"),
        GenderIdentity => ("LGBTQI", "IDENTIDAD DE GENERO"),
    }
);

option_enum!(
    SwitchboardOption {
        NoAnswer => ("NC", "No Contesta"),
        WrongNumber => ("NE", "Número Equivocado"),
        Transfer => ("TR", "Transferencia"),
        ProcedureInfo => ("IT", "Información de Trámites y Servicios"),
        OfficeLocation => ("IU", "Información de Ubicación de Oficina"),
        OfficeHours => ("HA", "Horario de Atención y Números de Sedes"),
        NonInstitutionalAdvice => ("ANI", "Asesoría No Institucional"),
    }
);

pub const PHONE_CHANNELS: &[&str] = &["Llamada Entrante", "Llamada Saliente"];
pub const CHANNEL_DIGITAL: &str = "Medio Digital";
pub const CHANNEL_OTHER: &str = "Otras Gestiones";

pub const CENTRAL_AMERICAN_COUNTRIES: &[&str] = &[
    "GUATEMALA",
    "BELICE",
    "HONDURAS",
    "NICARAGUA",
    "COSTA RICA",
    "PANAMA",
];

pub const OFFICIAL_POSITIONS: &[&str] = &[
    "DIRECTOR",
    "JEFE",
    "SUPERVISOR",
    "COORDINADOR",
    "INSPECTOR",
    "DELEGADO",
    "GESTOR",
    "COLABORADOR",
    "SEGURIDAD",
];

/// Detail service that enables the aggressor fields.
pub const HARASSMENT_SERVICE_ID: &str = "S-101";

pub const ANONYMOUS_NAME: &str = "ANÓNIMO";

fn plain_options(values: &[&str]) -> Vec<SelectOption> {
    values.iter().map(|v| SelectOption::new(v, v)).collect()
}

/// Every static option list, keyed by the name the form uses for it.
pub fn form_options() -> BTreeMap<&'static str, Vec<SelectOption>> {
    let mut lists = BTreeMap::new();
    lists.insert("sexo", Sex::options());
    lists.insert("tipoContacto", ContactType::options());
    lists.insert("medioDigital", DigitalMedium::options());
    lists.insert("canalTelefono", plain_options(PHONE_CHANNELS));
    lists.insert("tipoServicio", ServiceType::options());
    lists.insert("lugarDesempenoLabores", WorkplaceLocation::options());
    lists.insert("tipoRazonSocial", LegalEntityType::options());
    lists.insert("tipoDenuncia", ComplaintType::options());
    lists.insert("actividadEconomica", EconomicActivity::options());
    lists.insert("tipoDocumento", DocumentType::options());
    lists.insert("paisCA", plain_options(CENTRAL_AMERICAN_COUNTRIES));
    lists.insert("sexoUsuario", WorkerSex::options());
    lists.insert("caracteristica", WorkerTrait::options());
    lists.insert("conmutador", SwitchboardOption::options());
    lists.insert("funcionarios", plain_options(OFFICIAL_POSITIONS));
    lists
}

/// Serde adapter for selects where `""` (or `null`) means nothing selected.
pub mod blank {
    use super::*;
    use serde::de::DeserializeOwned;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => {
                let inner: de::value::StringDeserializer<D::Error> = value.into_deserializer();
                T::deserialize(inner).map(Some)
            }
        }
    }
}
