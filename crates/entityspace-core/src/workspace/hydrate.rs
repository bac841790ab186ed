use crate::{
    expansion::Expansion,
    model::{EntityId, NavigationKind},
    value::{Key, Record, Value},
    workspace::{Workspace, WorkspaceError, check_owner},
};
use std::collections::BTreeMap;

impl Workspace {
    /// Attach navigation values to `rows` along `expansions`.
    ///
    /// Reference -> the related row, or null when the key is absent or unknown.
    /// Collection -> every row whose back-reference holds this row's key,
    /// ordered by primary key.
    pub(super) fn hydrate(
        &self,
        entity: EntityId,
        rows: &mut BTreeMap<Key, Record>,
        expansions: &[Expansion],
    ) -> Result<(), WorkspaceError> {
        let model = self.schema.entity(entity)?;
        for expansion in expansions {
            check_owner(model, expansion)?;
        }
        if rows.is_empty() {
            return Ok(());
        }

        for expansion in expansions {
            let target = expansion.property().target;

            for row in rows.values_mut() {
                let value = match &expansion.property().kind {
                    NavigationKind::Reference(reference) => match row.key(&reference.key_field) {
                        Some(fk) => {
                            let mut related = self.read(target, true, |cache| {
                                Ok(cache.get_many([&fk]))
                            })?;
                            self.hydrate(target, &mut related, expansion.children())?;

                            related
                                .into_values()
                                .next()
                                .map_or(Value::Null, Value::Record)
                        }
                        None => Value::Null,
                    },

                    NavigationKind::Collection(collection) => {
                        let items = match row.key(model.primary_key()) {
                            Some(pk) => {
                                let mut related = self.select_by_index(
                                    target,
                                    &collection.back_reference_key,
                                    &pk,
                                    true,
                                )?;
                                self.hydrate(target, &mut related, expansion.children())?;

                                related.into_values().map(Value::Record).collect()
                            }
                            None => Vec::new(),
                        };

                        Value::List(items)
                    }
                };

                row.insert(expansion.name().to_string(), value);
            }
        }

        Ok(())
    }
}
