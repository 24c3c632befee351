#![forbid(unsafe_code)]

pub mod batch;
pub mod limits;
pub mod observability;
pub mod pricing;
pub mod seed;
pub mod strategy;
pub mod ticket;

pub use batch::{
    BatchEngine, BatchGenerationError, BatchGenerationResult, EngineOptions, GenerateBatchError,
    GenerateBatchRequest, StrategyRequest,
};
