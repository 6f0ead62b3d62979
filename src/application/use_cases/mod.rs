pub mod agents_service;
pub mod audit_service;
pub mod auth_service;
pub mod case_validation;
pub mod catalog_service;
pub mod form_effects;
pub mod gateway;
pub mod phone_country;
pub mod submission;
pub mod suggestion_box;
pub mod visibility;
