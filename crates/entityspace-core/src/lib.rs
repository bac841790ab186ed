//! Core of EntitySpace: a normalized, client-side cache for entity graphs,
//! plus the query algebra that decides when cached data already answers a
//! request.
//!
//! ## Crate layout
//! - `model`: entity metadata (`Schema`, navigation properties).
//! - `value`: payload values, keys and records.
//! - `expansion`: navigation trees, their grammar and superset algebra.
//! - `query`: request descriptions and the superset relation between them.
//! - `cache`: single-type row table with secondary indexes.
//! - `workspace`: one cache per entity type; graph decomposition and rehydration.
//! - `obs`: metrics events, sinks and counters.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod cache;
pub mod config;
pub mod error;
pub mod expansion;
pub mod model;
pub mod obs;
pub mod query;
pub mod value;
pub mod workspace;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only. Errors, caches and sinks stay in their modules.
///

pub mod prelude {
    pub use crate::{
        expansion::Expansion,
        model::{EntityDef, EntityId, EntityModel, Schema, SchemaBuilder},
        query::{Query, QuerySelector},
        value::{Key, Record, Value},
        workspace::Workspace,
    };
}
