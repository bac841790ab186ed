//! ## Crate layout
//! - `core`: the normalized cache, expansions, queries and observability.
//! - `config`: session tunables, loadable from TOML.
//! - `error`: public error type with a stable kind + origin taxonomy.
//! - `loader`: the boundary to whatever actually fetches data.
//! - `session`: decides cache hit vs. miss and merges loaded payloads.
//!
//! The `prelude` module mirrors what host code needs to drive a session.

pub use entityspace_core as core;

pub mod config;
pub mod error;
pub mod loader;
pub mod session;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// re-exports
pub use error::Error;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::SessionConfig,
        core::prelude::*,
        error::Error,
        loader::{LoadError, Loader},
        session::Session,
    };
}
