//! Entity index counters (recorded only with the `metrics` feature).

use overworld_metrics::Counter;

pub(crate) static SEARCHES: Counter = Counter::new();
pub(crate) static TAG_DRIVEN_SEARCHES: Counter = Counter::new();
pub(crate) static CANDIDATES_VISITED: Counter = Counter::new();
pub(crate) static MATCHES_RETURNED: Counter = Counter::new();
pub(crate) static COLLIDER_UPDATES: Counter = Counter::new();
pub(crate) static MEMBERSHIP_REMOVALS: Counter = Counter::new();
pub(crate) static BACK_REFERENCE_FIXUPS: Counter = Counter::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityIndexMetrics {
    pub searches: u64,
    pub tag_driven_searches: u64,
    pub candidates_visited: u64,
    pub matches_returned: u64,
    pub collider_updates: u64,
    pub membership_removals: u64,
    pub back_reference_fixups: u64,
}

pub fn entity_index_metrics_snapshot() -> EntityIndexMetrics {
    EntityIndexMetrics {
        searches: SEARCHES.get(),
        tag_driven_searches: TAG_DRIVEN_SEARCHES.get(),
        candidates_visited: CANDIDATES_VISITED.get(),
        matches_returned: MATCHES_RETURNED.get(),
        collider_updates: COLLIDER_UPDATES.get(),
        membership_removals: MEMBERSHIP_REMOVALS.get(),
        back_reference_fixups: BACK_REFERENCE_FIXUPS.get(),
    }
}

pub fn reset_entity_index_metrics() {
    for counter in [
        &SEARCHES,
        &TAG_DRIVEN_SEARCHES,
        &CANDIDATES_VISITED,
        &MATCHES_RETURNED,
        &COLLIDER_UPDATES,
        &MEMBERSHIP_REMOVALS,
        &BACK_REFERENCE_FIXUPS,
    ] {
        counter.reset();
    }
}
