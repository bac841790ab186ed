use crate::model::{
    field::PrimitiveModel,
    navigation::{CollectionModel, NavigationKind, NavigationModel, ReferenceModel},
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

///
/// EntityId
///
/// Opaque handle for one registered entity type, issued by `SchemaBuilder`.
/// Handles carry the tag of the builder that issued them, so a handle from
/// another schema never resolves.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EntityId {
    pub(crate) schema: u32,
    pub(crate) slot: u32,
}

impl EntityId {
    pub(crate) const fn new(schema: u32, slot: u32) -> Self {
        Self { schema, slot }
    }

    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.slot as usize
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.schema, self.slot)
    }
}

///
/// EntityModel
///
/// Frozen metadata for one entity type.
/// Field and navigation lookups are case-insensitive.
///

#[derive(Debug)]
pub struct EntityModel {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) primary_key: String,
    pub(crate) primitives: Vec<PrimitiveModel>,
    pub(crate) navigations: Vec<Arc<NavigationModel>>,
}

impl EntityModel {
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key field name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    #[must_use]
    pub fn primitives(&self) -> &[PrimitiveModel] {
        &self.primitives
    }

    /// Navigation properties in declaration order.
    #[must_use]
    pub fn navigations(&self) -> &[Arc<NavigationModel>] {
        &self.navigations
    }

    pub fn references(&self) -> impl Iterator<Item = (&NavigationModel, &ReferenceModel)> {
        self.navigations.iter().filter_map(|nav| match &nav.kind {
            NavigationKind::Reference(reference) => Some((nav.as_ref(), reference)),
            NavigationKind::Collection(_) => None,
        })
    }

    pub fn collections(&self) -> impl Iterator<Item = (&NavigationModel, &CollectionModel)> {
        self.navigations.iter().filter_map(|nav| match &nav.kind {
            NavigationKind::Collection(collection) => Some((nav.as_ref(), collection)),
            NavigationKind::Reference(_) => None,
        })
    }

    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&Arc<NavigationModel>> {
        self.navigations
            .iter()
            .find(|nav| nav.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn primitive(&self, name: &str) -> Option<&PrimitiveModel> {
        self.primitives
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn reference_by_name(&self, name: &str) -> Option<(&NavigationModel, &ReferenceModel)> {
        self.references()
            .find(|(nav, _)| nav.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a field that may be queried by index (primary key, primitive
    /// or foreign key) to its declared spelling.
    #[must_use]
    pub fn resolve_index_field(&self, name: &str) -> Option<&str> {
        if self.primary_key.eq_ignore_ascii_case(name) {
            return Some(&self.primary_key);
        }
        if let Some(primitive) = self.primitive(name) {
            return Some(&primitive.name);
        }

        self.references()
            .map(|(_, reference)| reference.key_field.as_str())
            .find(|key| key.eq_ignore_ascii_case(name))
    }

    /// Fields that get a secondary index: indexed primitives, then every
    /// reference foreign key. Duplicates are collapsed.
    #[must_use]
    pub fn index_fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        let indexed = self
            .primitives
            .iter()
            .filter(|p| p.indexed)
            .map(|p| p.name.as_str());
        let foreign = self.references().map(|(_, r)| r.key_field.as_str());

        for field in indexed.chain(foreign) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        fields
    }

    /// Fields kept in a stored row: primary key, primitives, foreign keys.
    #[must_use]
    pub fn stored_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.primary_key.as_str()];
        let primitives = self.primitives.iter().map(|p| p.name.as_str());
        let foreign = self.references().map(|(_, r)| r.key_field.as_str());

        for field in primitives.chain(foreign) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        fields
    }
}

impl Display for EntityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
