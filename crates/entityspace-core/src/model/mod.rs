//! Runtime entity metadata.
//!
//! Metadata is registered once through [`SchemaBuilder`] and frozen into a
//! [`Schema`]. Every other subsystem only ever reads it:
//! - `expansion` resolves navigation names against it while parsing
//! - `query` validates index names against it
//! - `workspace` derives per-type caches and secondary indexes from it
pub mod entity;
pub mod field;
pub mod navigation;
pub mod schema;


// re-exports
pub use entity::{EntityId, EntityModel};
pub use field::PrimitiveModel;
pub use navigation::{CollectionModel, NavigationKind, NavigationModel, ReferenceModel};
pub use schema::{EntityDef, Schema, SchemaBuilder, SchemaError};
