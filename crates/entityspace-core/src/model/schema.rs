use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{
        entity::{EntityId, EntityModel},
        field::PrimitiveModel,
        navigation::{CollectionModel, NavigationKind, NavigationModel, ReferenceModel},
    },
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};
use thiserror::Error as ThisError;

///
/// SchemaError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("entity name is empty")]
    EmptyEntityName,

    #[error("entity '{0}' already registered")]
    DuplicateEntity(String),

    #[error("field '{field}' declared more than once on '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("no metadata for entity {0} found")]
    UnknownEntity(String),

    #[error(
        "collection '{entity}.{collection}' names back-reference '{back_reference}', which is not a reference on '{target}'"
    )]
    UnknownBackReference {
        entity: String,
        collection: String,
        target: String,
        back_reference: String,
    },

    #[error(
        "collection '{entity}.{collection}' back-reference '{target}.{back_reference}' points at '{points_at}', not '{entity}'"
    )]
    BackReferenceMismatch {
        entity: String,
        collection: String,
        target: String,
        back_reference: String,
        points_at: String,
    },
}

impl SchemaError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownEntity(_) => ErrorClass::NotFound,
            _ => ErrorClass::Invalid,
        }
    }
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::new(err.class(), ErrorOrigin::Schema, err.to_string())
    }
}

///
/// EntityDef
///
/// Declarative input for one entity type: name, primary key and primitives.
/// Navigation properties are attached afterwards on the builder, once every
/// participating type has an `EntityId`.
///

#[derive(Clone, Debug)]
pub struct EntityDef {
    name: String,
    primary_key: String,
    primitives: Vec<PrimitiveModel>,
}

impl EntityDef {
    #[must_use]
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            primitives: Vec::new(),
        }
    }

    #[must_use]
    pub fn primitive(mut self, name: impl Into<String>) -> Self {
        self.primitives.push(PrimitiveModel::new(name));
        self
    }

    /// Declare a primitive that gets its own secondary index.
    #[must_use]
    pub fn indexed(mut self, name: impl Into<String>) -> Self {
        self.primitives.push(PrimitiveModel::indexed(name));
        self
    }
}

// Collection declarations are resolved at `build`, when the back-reference
// on the target type is guaranteed to be registered.
struct PendingCollection {
    owner: EntityId,
    name: String,
    target: EntityId,
    back_reference: String,
}

///
/// SchemaBuilder
///
/// One-shot registration of entity metadata.
///
/// ```ignore
/// let mut b = SchemaBuilder::new();
/// let artist = b.entity(EntityDef::new("Artist", "id").primitive("name"))?;
/// let album = b.entity(EntityDef::new("Album", "id").indexed("name"))?;
/// b.reference(album, "artist", "artistId", artist)?;
/// b.collection(artist, "albums", album, "artist")?;
/// let schema = b.build()?;
/// ```
///

// Every builder gets its own tag for the handles it issues.
static NEXT_SCHEMA_TAG: AtomicU32 = AtomicU32::new(0);

pub struct SchemaBuilder {
    tag: u32,
    defs: Vec<EntityDef>,
    references: Vec<(EntityId, Arc<NavigationModel>)>,
    collections: Vec<PendingCollection>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tag: NEXT_SCHEMA_TAG.fetch_add(1, Ordering::Relaxed),
            defs: Vec::new(),
            references: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Register an entity type and hand out its handle.
    pub fn entity(&mut self, def: EntityDef) -> Result<EntityId, SchemaError> {
        if def.name.trim().is_empty() {
            return Err(SchemaError::EmptyEntityName);
        }
        if self
            .defs
            .iter()
            .any(|existing| existing.name.eq_ignore_ascii_case(&def.name))
        {
            return Err(SchemaError::DuplicateEntity(def.name));
        }

        let id = EntityId::new(self.tag, u32::try_from(self.defs.len()).unwrap_or(u32::MAX));
        self.defs.push(def);

        Ok(id)
    }

    /// Attach a to-one navigation; `key_field` lives on `owner`.
    pub fn reference(
        &mut self,
        owner: EntityId,
        name: impl Into<String>,
        key_field: impl Into<String>,
        target: EntityId,
    ) -> Result<(), SchemaError> {
        self.def(owner)?;
        self.def(target)?;

        let nav = NavigationModel {
            owner,
            name: name.into(),
            target,
            kind: NavigationKind::Reference(ReferenceModel {
                key_field: key_field.into(),
            }),
        };
        self.references.push((owner, Arc::new(nav)));

        Ok(())
    }

    /// Attach a to-many navigation resolved through `back_reference`, a
    /// reference declared on `target` that points back at `owner`.
    pub fn collection(
        &mut self,
        owner: EntityId,
        name: impl Into<String>,
        target: EntityId,
        back_reference: impl Into<String>,
    ) -> Result<(), SchemaError> {
        self.def(owner)?;
        self.def(target)?;

        self.collections.push(PendingCollection {
            owner,
            name: name.into(),
            target,
            back_reference: back_reference.into(),
        });

        Ok(())
    }

    /// Resolve back-references, check name uniqueness and freeze.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut navigations: Vec<Vec<Arc<NavigationModel>>> = vec![Vec::new(); self.defs.len()];

        for (owner, nav) in &self.references {
            navigations[owner.index()].push(Arc::clone(nav));
        }

        for pending in &self.collections {
            let owner_name = &self.defs[pending.owner.index()].name;
            let target_name = &self.defs[pending.target.index()].name;

            let (back_nav, back_key) = self
                .references
                .iter()
                .filter(|(owner, _)| *owner == pending.target)
                .find_map(|(_, nav)| match &nav.kind {
                    NavigationKind::Reference(reference)
                        if nav.name.eq_ignore_ascii_case(&pending.back_reference) =>
                    {
                        Some((nav, reference.key_field.clone()))
                    }
                    _ => None,
                })
                .ok_or_else(|| SchemaError::UnknownBackReference {
                    entity: owner_name.clone(),
                    collection: pending.name.clone(),
                    target: target_name.clone(),
                    back_reference: pending.back_reference.clone(),
                })?;

            if back_nav.target != pending.owner {
                return Err(SchemaError::BackReferenceMismatch {
                    entity: owner_name.clone(),
                    collection: pending.name.clone(),
                    target: target_name.clone(),
                    back_reference: back_nav.name.clone(),
                    points_at: self.defs[back_nav.target.index()].name.clone(),
                });
            }

            navigations[pending.owner.index()].push(Arc::new(NavigationModel {
                owner: pending.owner,
                name: pending.name.clone(),
                target: pending.target,
                kind: NavigationKind::Collection(CollectionModel {
                    back_reference: back_nav.name.clone(),
                    back_reference_key: back_key,
                }),
            }));
        }

        let mut entities = Vec::with_capacity(self.defs.len());
        let mut by_name = HashMap::with_capacity(self.defs.len());

        for (index, (def, navigations)) in self.defs.into_iter().zip(navigations).enumerate() {
            let id = EntityId::new(self.tag, u32::try_from(index).unwrap_or(u32::MAX));
            check_unique_names(&def, &navigations)?;

            by_name.insert(def.name.to_ascii_lowercase(), id);
            entities.push(EntityModel {
                id,
                name: def.name,
                primary_key: def.primary_key,
                primitives: def.primitives,
                navigations,
            });
        }

        Ok(Schema {
            tag: self.tag,
            entities,
            by_name,
        })
    }

    fn def(&self, id: EntityId) -> Result<&EntityDef, SchemaError> {
        self.defs
            .get(id.index())
            .filter(|_| id.schema == self.tag)
            .ok_or_else(|| SchemaError::UnknownEntity(id.to_string()))
    }
}

// Primary key, primitives and navigation names share one case-insensitive
// namespace. Foreign-key fields may coincide with a declared primitive but not
// with a navigation name.
fn check_unique_names(
    def: &EntityDef,
    navigations: &[Arc<NavigationModel>],
) -> Result<(), SchemaError> {
    let mut seen: Vec<String> = vec![def.primary_key.to_ascii_lowercase()];
    let names = def
        .primitives
        .iter()
        .map(|p| p.name.as_str())
        .chain(navigations.iter().map(|n| n.name.as_str()));

    for name in names {
        let lowered = name.to_ascii_lowercase();
        if seen.contains(&lowered) {
            return Err(SchemaError::DuplicateField {
                entity: def.name.clone(),
                field: name.to_string(),
            });
        }
        seen.push(lowered);
    }

    for nav in navigations {
        if let NavigationKind::Reference(reference) = &nav.kind
            && navigations
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&reference.key_field))
        {
            return Err(SchemaError::DuplicateField {
                entity: def.name.clone(),
                field: reference.key_field.clone(),
            });
        }
    }

    Ok(())
}

///
/// Schema
///
/// Resolved metadata lookup: the only view of entity metadata the core uses.
///

#[derive(Debug)]
pub struct Schema {
    tag: u32,
    entities: Vec<EntityModel>,
    by_name: HashMap<String, EntityId>,
}

impl Schema {
    /// Look up a registered entity type by handle. Handles issued for another
    /// schema are unknown here.
    pub fn entity(&self, id: EntityId) -> Result<&EntityModel, SchemaError> {
        self.entities
            .get(id.index())
            .filter(|_| id.schema == self.tag)
            .ok_or_else(|| SchemaError::UnknownEntity(id.to_string()))
    }

    /// Look up a registered entity type by name (case-insensitive).
    pub fn entity_by_name(&self, name: &str) -> Result<&EntityModel, SchemaError> {
        let id = self.id_of(name)?;
        self.entity(id)
    }

    pub fn id_of(&self, name: &str) -> Result<EntityId, SchemaError> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
