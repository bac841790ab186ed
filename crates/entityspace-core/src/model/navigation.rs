use crate::model::entity::EntityId;
use std::fmt::{self, Display};

///
/// NavigationModel
///
/// A typed relation from the `owner` entity type to the `target` type.
/// Shared as `Arc<NavigationModel>` so expansion trees can point at it
/// without borrowing the schema.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NavigationModel {
    pub owner: EntityId,
    pub name: String,
    pub target: EntityId,
    pub kind: NavigationKind,
}

impl NavigationModel {
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self.kind, NavigationKind::Reference(_))
    }

    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.kind, NavigationKind::Collection(_))
    }
}

impl Display for NavigationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

///
/// NavigationKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NavigationKind {
    /// To-one: the owner stores the target's primary key.
    Reference(ReferenceModel),

    /// To-many: every target row stores the owner's primary key through
    /// its back-reference.
    Collection(CollectionModel),
}

///
/// ReferenceModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceModel {
    /// Foreign-key field on the owner.
    pub key_field: String,
}

///
/// CollectionModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectionModel {
    /// Name of the reference on the target type that points back to the owner.
    pub back_reference: String,
    /// Foreign-key field of that back-reference (on the target type).
    pub back_reference_key: String,
}
