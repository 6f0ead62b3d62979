pub mod activity;
pub mod agent;
pub mod case_form;
pub mod catalog;
pub mod contact;
pub mod error;
pub mod options;
pub mod sheet;
pub mod suggestion;
pub mod validation;
