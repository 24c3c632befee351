#![forbid(unsafe_code)]

pub mod config;
pub mod health;
pub mod limits;
pub mod pricing;
pub mod request;
pub mod store;

pub use config::{EngineConfig, EngineConfigOverrides, MissingConfigError};
pub use limits::StaticLimitsProvider;
pub use pricing::CombinatorialPricing;
pub use request::{RequestLoadError, load_request_json};
