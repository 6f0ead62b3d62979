use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::domain::case_form::wire_name;

pub const REQUIRED: &str = "Requerido";

/// A single field problem, addressed by the field's wire name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn required(path: &str) -> Self {
        Self::new(path, REQUIRED)
    }
}

/// Flattens derive-level errors into issues ordered by `order`
/// (wire names); unknown fields go last.
pub fn issues_from_errors(errors: &ValidationErrors, order: &[&str]) -> Vec<ValidationIssue> {
    let mut issues: Vec<(usize, ValidationIssue)> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        let path = wire_name(&field.to_string());
        let position = order.iter().position(|f| *f == path).unwrap_or(order.len());
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| error.code.to_string());
            issues.push((position, ValidationIssue { path: path.clone(), message }));
        }
    }
    issues.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));
    issues.into_iter().map(|(_, issue)| issue).collect()
}

/// Keeps the first issue per path.
pub fn dedup_by_path(issues: Vec<ValidationIssue>) -> Vec<ValidationIssue> {
    let mut seen = std::collections::HashSet::new();
    issues
        .into_iter()
        .filter(|issue| seen.insert(issue.path.clone()))
        .collect()
}

/// Joined text for error envelopes.
pub fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_message() {
        let issues = vec![
            ValidationIssue::new("nombreComercial", "Requerido"),
            ValidationIssue::new("nombreComercial", "Otro"),
            ValidationIssue::required("tipoDenuncia"),
        ];
        let deduped = dedup_by_path(issues);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].message, "Requerido");
    }

    #[test]
    fn test_dedup_handles_non_adjacent_paths() {
        let issues = vec![
            ValidationIssue::new("emailEmpresa", "Email inválido"),
            ValidationIssue::required("tipoDenuncia"),
            ValidationIssue::required("emailEmpresa"),
        ];
        let deduped = dedup_by_path(issues);
        let paths: Vec<&str> = deduped.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["emailEmpresa", "tipoDenuncia"]);
        assert_eq!(deduped[0].message, "Email inválido");
    }

    #[test]
    fn test_summarize() {
        let issues = vec![
            ValidationIssue::required("contacto"),
            ValidationIssue::new("emailEmpresa", "Email inválido"),
        ];
        assert_eq!(summarize(&issues), "contacto: Requerido; emailEmpresa: Email inválido");
    }
}
