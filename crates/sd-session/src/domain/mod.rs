//! # Domain Layer - Session Core
//!
//! Pure session logic: no I/O, no async.
//!
//! ## Components
//!
//! - `entities`: Session, Role, request bodies
//! - `access`: Capability, AccessGate, RouteTable
//! - `state`: AuthPhase, StatusTracker, epochs
//! - `validation`: registration / profile forms
//! - `config`: SessionConfig
//! - `errors`: SessionError, ValidationError

pub mod access;
pub mod config;
pub mod entities;
pub mod errors;
pub mod state;
pub mod validation;

pub use access::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use state::*;
pub use validation::*;
