use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters since `since_ms`.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub since_ms: u64,
}

impl EventState {
    pub(crate) fn entity(&mut self, name: &str) -> &mut EntityCounters {
        self.entities.entry(name.to_string()).or_default()
    }
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Writes
    pub rows_upserted: u64,
    pub rows_replaced: u64,
    pub rows_removed: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,
    pub buckets_cleared: u64,

    // Reads
    pub read_calls: u64,
    pub rows_read: u64,
    pub rows_hydrated: u64,

    // Session
    pub session_hits: u64,
    pub session_misses: u64,
    pub merge_failures: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub rows_upserted: u64,
    pub rows_removed: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub read_calls: u64,
    pub rows_read: u64,
    pub session_hits: u64,
    pub session_misses: u64,
    pub merge_failures: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: EventState,
    /// Per-entity counters with derived ratios.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub rows_upserted: u64,
    pub rows_removed: u64,
    pub read_calls: u64,
    pub rows_read: u64,
    pub avg_rows_per_read: f64,
    pub session_hits: u64,
    pub session_misses: u64,
    pub hit_ratio: f64,
    pub merge_failures: u64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Build a report from the in-memory counters.
#[must_use]
pub fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, c)| EntitySummary {
            entity: entity.clone(),
            rows_upserted: c.rows_upserted,
            rows_removed: c.rows_removed,
            read_calls: c.read_calls,
            rows_read: c.rows_read,
            avg_rows_per_read: ratio(c.rows_read, c.read_calls),
            session_hits: c.session_hits,
            session_misses: c.session_misses,
            hit_ratio: ratio(c.session_hits, c.session_hits.saturating_add(c.session_misses)),
            merge_failures: c.merge_failures,
        })
        .collect();

    // busiest first, then by name
    entity_counters.sort_by(|a, b| match b.rows_read.cmp(&a.rows_read) {
        Ordering::Equal => a.entity.cmp(&b.entity),
        other => other,
    });

    EventReport {
        counters: snap,
        entity_counters,
    }
}
