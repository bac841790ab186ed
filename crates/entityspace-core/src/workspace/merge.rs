use crate::{
    expansion::Expansion,
    model::{EntityId, EntityModel, NavigationKind},
    obs::sink::{MetricsEvent, record},
    value::{Key, Record, Value},
    workspace::{Workspace, WorkspaceError, cache_error, check_owner, is_primary_key},
};
use std::{borrow::Cow, sync::Arc};

// Depth-first decomposition: the row itself first, then every expanded
// navigation value, recursively.
pub(super) fn add(
    ws: &mut Workspace,
    entity: EntityId,
    payload: &Record,
    expansions: &[Expansion],
) -> Result<Key, WorkspaceError> {
    let schema = Arc::clone(&ws.schema);
    let model = schema.entity(entity)?;
    for expansion in expansions {
        check_owner(model, expansion)?;
    }

    let mut row = payload.project(model.stored_fields());
    fill_foreign_keys(ws, &mut row, payload, expansions)?;

    let upsert = ws
        .cache_mut(entity)?
        .add(row)
        .map_err(|source| cache_error(model, source))?;

    record(MetricsEvent::RowUpserted {
        entity: model.name(),
        replaced: upsert.replaced,
    });
    record(MetricsEvent::IndexDelta {
        entity: model.name(),
        inserts: upsert.index.inserts,
        removes: upsert.index.removes,
    });
    tracing::trace!(
        entity = %model.name(),
        key = %upsert.key,
        replaced = upsert.replaced,
        "upserted row"
    );

    for expansion in expansions {
        let Some(value) = payload.get(expansion.name()).filter(|v| !v.is_null()) else {
            continue;
        };
        let target = expansion.property().target;

        match &expansion.property().kind {
            NavigationKind::Reference(_) => {
                let Value::Record(related) = value else {
                    return Err(malformed(model, expansion, "a record", value));
                };

                add(ws, target, related, expansion.children())?;
            }

            NavigationKind::Collection(collection) => {
                let Value::List(items) = value else {
                    return Err(malformed(model, expansion, "a list", value));
                };
                let items = items
                    .iter()
                    .map(|item| {
                        item.as_record()
                            .ok_or_else(|| malformed(model, expansion, "a list of records", item))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let Some(first) = items.first() else {
                    continue;
                };

                let back_key = collection.back_reference_key.as_str();
                let bucket = first.key(back_key).unwrap_or_else(|| upsert.key.clone());
                clear_bucket(ws, target, back_key, &bucket)?;

                for item in items {
                    let item = if item.key(back_key).is_some() {
                        Cow::Borrowed(item)
                    } else {
                        let mut filled = item.clone();
                        filled.insert(back_key.to_string(), upsert.key.clone().into());
                        Cow::Owned(filled)
                    };

                    add(ws, target, &item, expansion.children())?;
                }
            }
        }
    }

    Ok(upsert.key)
}

// An expanded reference whose foreign key is missing on the owner takes the
// key from the related payload.
fn fill_foreign_keys(
    ws: &Workspace,
    row: &mut Record,
    payload: &Record,
    expansions: &[Expansion],
) -> Result<(), WorkspaceError> {
    for expansion in expansions {
        let NavigationKind::Reference(reference) = &expansion.property().kind else {
            continue;
        };
        if row.key(&reference.key_field).is_some() {
            continue;
        }
        let Some(Value::Record(related)) = payload.get(expansion.name()) else {
            continue;
        };

        let target = ws.schema.entity(expansion.property().target)?;
        if let Some(key) = related.key(target.primary_key()) {
            row.insert(reference.key_field.clone(), key.into());
        }
    }

    Ok(())
}

// Forget the current members of a collection before its fresh items land.
fn clear_bucket(
    ws: &mut Workspace,
    target: EntityId,
    back_key: &str,
    value: &Key,
) -> Result<(), WorkspaceError> {
    let schema = Arc::clone(&ws.schema);
    let model = schema.entity(target)?;
    if is_primary_key(model, back_key) {
        return Ok(());
    }

    let cleared = ws
        .cache_mut(target)?
        .remove_by_index(back_key, value)
        .map_err(|source| cache_error(model, source))?;

    record(MetricsEvent::BucketCleared {
        entity: model.name(),
        rows: cleared as u64,
    });
    tracing::trace!(entity = %model.name(), index = back_key, %value, cleared, "cleared bucket");

    Ok(())
}

fn malformed(
    model: &EntityModel,
    expansion: &Expansion,
    expected: &'static str,
    found: &Value,
) -> WorkspaceError {
    WorkspaceError::MalformedNavigation {
        entity: model.name().to_string(),
        navigation: expansion.name().to_string(),
        expected,
        found: found.kind_label(),
    }
}
