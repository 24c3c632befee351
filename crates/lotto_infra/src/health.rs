//! Health probe.
//!
//! Response carries `ok`, `build_id` and the audit `payload_version`, so a
//! consumer can tell which payload schema this build exports.

use serde::Serialize;

use lotto_core::batch::PAYLOAD_VERSION;

use crate::config::{EngineConfig, MissingConfigError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// True when the process is up and its configuration resolves.
    pub ok: bool,
    /// Git commit SHA or build identifier.
    pub build_id: String,
    pub payload_version: String,
}

impl HealthResponse {
    pub fn healthy(build_id: impl Into<String>) -> Self {
        Self {
            ok: true,
            build_id: build_id.into(),
            payload_version: PAYLOAD_VERSION.to_string(),
        }
    }

    pub fn unhealthy(build_id: impl Into<String>) -> Self {
        Self {
            ok: false,
            build_id: build_id.into(),
            payload_version: PAYLOAD_VERSION.to_string(),
        }
    }
}

/// Healthy when the process is up.
pub fn check_health(build_id: &str) -> HealthResponse {
    HealthResponse::healthy(build_id)
}

/// Healthy only when `config` resolved.
pub fn check_health_with_config(
    build_id: &str,
    config: &Result<EngineConfig, MissingConfigError>,
) -> HealthResponse {
    match config {
        Ok(_) => HealthResponse::healthy(build_id),
        Err(err) => {
            tracing::warn!(error = %err, "health check: config unresolved");
            HealthResponse::unhealthy(build_id)
        }
    }
}

pub const EXIT_HEALTHY: i32 = 0;
pub const EXIT_UNHEALTHY: i32 = 1;

pub fn exit_code(response: &HealthResponse) -> i32 {
    if response.ok {
        EXIT_HEALTHY
    } else {
        EXIT_UNHEALTHY
    }
}
