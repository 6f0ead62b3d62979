use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const NORTH_AMERICA: &str = "ESTADOS UNIDOS/CANADÁ";
pub const INTERNATIONAL: &str = "INTERNACIONAL";
pub const INVALID_INTERNATIONAL: &str = "INTERNACIONAL (INVÁLIDO)";

const LOCAL_PREFIX: &str = "+503";

// Longer prefixes first.
const PREFIXES: &[(&str, &str)] = &[
    ("+501", "BELICE"),
    ("+502", "GUATEMALA"),
    ("+504", "HONDURAS"),
    ("+505", "NICARAGUA"),
    ("+506", "COSTA RICA"),
    ("+507", "PANAMÁ"),
    ("+52", "MÉXICO"),
    ("+34", "ESPAÑA"),
    ("+1", NORTH_AMERICA),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PhoneCountry {
    Resolved { country: String },
    Rejected { error: String },
}

impl PhoneCountry {
    pub fn country(&self) -> Option<&str> {
        match self {
            PhoneCountry::Resolved { country } => Some(country),
            PhoneCountry::Rejected { .. } => None,
        }
    }
}

/// Resolves the country of an international contact number.
#[async_trait]
pub trait PhoneCountryResolver: Send + Sync {
    async fn resolve(&self, phone: &str) -> PhoneCountry;
}

/// Offline resolver based on the dialing prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixCountryResolver;

impl PrefixCountryResolver {
    pub fn lookup(phone: &str) -> PhoneCountry {
        let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();

        if let Some(local) = phone.strip_prefix(LOCAL_PREFIX) {
            let example = if local.is_empty() { "22313122" } else { local };
            return PhoneCountry::Rejected {
                error: format!(
                    "El Número de teléfono inicia con {}, solo debe ingresar los últimos 8 digitos ya que es local ejemplo {}. Los números telefónicos internacionales inician con 1 y debe anteponer el signo ( + ), ejemplo: +12025550123",
                    phone, example
                ),
            };
        }

        let country = PREFIXES
            .iter()
            .find(|(prefix, _)| phone.starts_with(prefix))
            .map(|(_, country)| *country)
            .unwrap_or(INTERNATIONAL);

        PhoneCountry::Resolved {
            country: country.to_string(),
        }
    }
}

#[async_trait]
impl PhoneCountryResolver for PrefixCountryResolver {
    async fn resolve(&self, phone: &str) -> PhoneCountry {
        Self::lookup(phone)
    }
}
