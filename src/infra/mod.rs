//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod error;
pub mod http;
pub mod notion;
pub mod relocate;
pub mod telemetry;
