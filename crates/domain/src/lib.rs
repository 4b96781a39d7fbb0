//! Domain-level building blocks shared across the API, monitor and storage
//! crates: ledger models, environment configuration, the storage contract,
//! the subscription registry and telemetry wiring.

pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use model::*;
pub use services::*;
pub use storage::*;
