use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LOCAL_PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[267][0-9]{7}$").unwrap());

static INTERNATIONAL_PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[0-9]+").unwrap());

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

static SOCIAL_HANDLE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@[A-Za-z0-9_]+").unwrap());

/// How the citizen reached the center, derived from the free-text contact field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Local,
    International,
    Digital,
    Other,
}

pub fn detect_contact_kind(value: &str) -> ContactKind {
    let value = value.trim();
    if value.is_empty() {
        return ContactKind::Other;
    }
    if LOCAL_PHONE_PATTERN.is_match(value) {
        ContactKind::Local
    } else if INTERNATIONAL_PHONE_PATTERN.is_match(value) {
        ContactKind::International
    } else if EMAIL_PATTERN.is_match(value) || SOCIAL_HANDLE_PATTERN.is_match(value) {
        ContactKind::Digital
    } else {
        ContactKind::Other
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}
