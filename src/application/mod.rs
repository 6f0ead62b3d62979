pub mod use_cases;

pub use use_cases::audit_service::AuditService;
pub use use_cases::gateway::ApiGateway;
