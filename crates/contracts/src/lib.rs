//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: the metric event
//! model, the backend capability and the configuration model.
//! Business crates depend on this crate only; reverse dependencies are prohibited.

mod backend;
mod config;
mod error;
mod event;

pub use backend::{ConfiguredService, MetricsBackend};
pub use config::*;
pub use error::*;
pub use event::*;
