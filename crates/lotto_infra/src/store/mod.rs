//! Durable storage: append-only payload audit log.

pub mod audit_log;

pub use audit_log::{AuditLog, AuditLogError, AuditLogMetrics, AuditRecord};
