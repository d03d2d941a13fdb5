//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer,
//! managing application state, the auto-update timer and configuration.

pub mod config;
pub mod scheduler;
pub mod state;

pub use config::*;
pub use scheduler::*;
pub use state::*;
