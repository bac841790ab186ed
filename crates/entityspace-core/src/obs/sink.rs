//! Metrics sink boundary.
//!
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.
//! This module is the only bridge between execution logic and the
//! thread-local counters in `obs::metrics`.
use crate::obs::metrics;
use std::{cell::RefCell, sync::Arc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Arc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    RowUpserted {
        entity: &'a str,
        replaced: bool,
    },
    RowRemoved {
        entity: &'a str,
    },
    IndexDelta {
        entity: &'a str,
        inserts: u64,
        removes: u64,
    },
    BucketCleared {
        entity: &'a str,
        rows: u64,
    },

    /// One cache read; `nested` marks reads issued while hydrating another row.
    Read {
        entity: &'a str,
        rows: u64,
        nested: bool,
    },
    SessionHit {
        entity: &'a str,
    },
    SessionMiss {
        entity: &'a str,
    },
    MergeFailure {
        entity: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
/// Default sink: writes into the thread-local counters.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        metrics::with_state_mut(|m| match event {
            MetricsEvent::RowUpserted { entity, replaced } => {
                m.ops.rows_upserted = m.ops.rows_upserted.saturating_add(1);
                let entry = m.entity(entity);
                entry.rows_upserted = entry.rows_upserted.saturating_add(1);
                if replaced {
                    m.ops.rows_replaced = m.ops.rows_replaced.saturating_add(1);
                }
            }

            MetricsEvent::RowRemoved { entity } => {
                m.ops.rows_removed = m.ops.rows_removed.saturating_add(1);
                let entry = m.entity(entity);
                entry.rows_removed = entry.rows_removed.saturating_add(1);
            }

            MetricsEvent::IndexDelta {
                entity,
                inserts,
                removes,
            } => {
                m.ops.index_inserts = m.ops.index_inserts.saturating_add(inserts);
                m.ops.index_removes = m.ops.index_removes.saturating_add(removes);
                let entry = m.entity(entity);
                entry.index_inserts = entry.index_inserts.saturating_add(inserts);
                entry.index_removes = entry.index_removes.saturating_add(removes);
            }

            MetricsEvent::BucketCleared { entity, rows } => {
                m.ops.buckets_cleared = m.ops.buckets_cleared.saturating_add(1);
                m.ops.index_removes = m.ops.index_removes.saturating_add(rows);
                let entry = m.entity(entity);
                entry.index_removes = entry.index_removes.saturating_add(rows);
            }

            MetricsEvent::Read {
                entity,
                rows,
                nested,
            } => {
                m.ops.read_calls = m.ops.read_calls.saturating_add(1);
                if nested {
                    m.ops.rows_hydrated = m.ops.rows_hydrated.saturating_add(rows);
                } else {
                    m.ops.rows_read = m.ops.rows_read.saturating_add(rows);
                }

                let entry = m.entity(entity);
                entry.read_calls = entry.read_calls.saturating_add(1);
                entry.rows_read = entry.rows_read.saturating_add(rows);
            }

            MetricsEvent::SessionHit { entity } => {
                m.ops.session_hits = m.ops.session_hits.saturating_add(1);
                let entry = m.entity(entity);
                entry.session_hits = entry.session_hits.saturating_add(1);
            }

            MetricsEvent::SessionMiss { entity } => {
                m.ops.session_misses = m.ops.session_misses.saturating_add(1);
                let entry = m.entity(entity);
                entry.session_misses = entry.session_misses.saturating_add(1);
            }

            MetricsEvent::MergeFailure { entity } => {
                m.ops.merge_failures = m.ops.merge_failures.saturating_add(1);
                let entry = m.entity(entity);
                entry.merge_failures = entry.merge_failures.saturating_add(1);
            }
        });
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

/// Route one event to the scoped override, or the global counters.
pub fn record(event: MetricsEvent<'_>) {
    // clone out so a sink may itself install an override
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
/// The previous override is restored on every exit, unwinding included.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
    }

    impl CountingSink {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetricsSink for CountingSink {
        fn record(&self, _: MetricsEvent<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    const EVENT: MetricsEvent<'static> = MetricsEvent::RowRemoved { entity: "Artist" };

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer = Arc::new(CountingSink::default());
        let inner = Arc::new(CountingSink::default());

        // no override installed yet
        record(EVENT);
        assert_eq!(outer.calls(), 0);
        assert_eq!(inner.calls(), 0);

        with_metrics_sink(outer.clone(), || {
            record(EVENT);
            assert_eq!(outer.calls(), 1);
            assert_eq!(inner.calls(), 0);

            with_metrics_sink(inner.clone(), || {
                record(EVENT);
            });

            // inner override was restored to outer
            record(EVENT);
        });

        assert_eq!(outer.calls(), 2);
        assert_eq!(inner.calls(), 1);

        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });

        record(EVENT);
        assert_eq!(outer.calls(), 2);
        assert_eq!(inner.calls(), 1);
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let sink = Arc::new(CountingSink::default());

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(sink.clone(), || {
                record(EVENT);
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(sink.calls(), 1);

        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });

        record(EVENT);
        assert_eq!(sink.calls(), 1);
    }

    #[test]
    fn global_sink_accumulates_per_entity() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });
        metrics_reset_all();

        record(MetricsEvent::RowUpserted {
            entity: "Album",
            replaced: true,
        });
        record(MetricsEvent::IndexDelta {
            entity: "Album",
            inserts: 2,
            removes: 1,
        });
        record(MetricsEvent::SessionMiss { entity: "Album" });

        let report = metrics_report();
        assert_eq!(report.counters.ops.rows_upserted, 1);
        assert_eq!(report.counters.ops.rows_replaced, 1);
        assert_eq!(report.counters.ops.index_inserts, 2);

        let album = &report.counters.entities["Album"];
        assert_eq!(album.index_removes, 1);
        assert_eq!(album.session_misses, 1);
    }
}
