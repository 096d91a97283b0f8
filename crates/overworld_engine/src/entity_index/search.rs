//! Range queries.

use super::{metrics, ChunkSpan, EntityIndex};
use crate::entity::{EntityId, EntitySearch};
use crate::tagset::{TagId, Tagset};
use std::collections::HashSet;
use std::ops::ControlFlow;

impl EntityIndex {
    /// Write the ids of matching entities into `out` and return how many
    /// were written. Stops once `out` is full; size it with [`count`] for
    /// exhaustive results.
    ///
    /// Each entity is reported at most once. Invalid query bounds are logged
    /// and yield no results.
    ///
    /// [`count`]: EntityIndex::count
    pub fn search(&self, query: &EntitySearch, out: &mut [EntityId]) -> usize {
        if out.is_empty() {
            return 0;
        }
        let mut written = 0;
        self.scan(query, |id| {
            out[written] = id;
            written += 1;
            if written == out.len() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        written
    }

    /// Every matching id, in no particular order.
    pub fn search_all(&self, query: &EntitySearch) -> Vec<EntityId> {
        let mut ids = Vec::new();
        self.scan(query, |id| {
            ids.push(id);
            ControlFlow::Continue(())
        });
        ids
    }

    fn scan(&self, query: &EntitySearch, emit: impl FnMut(EntityId) -> ControlFlow<()>) {
        metrics! {
            metrics::SEARCHES.increment(1);
        }
        if !query.bounds.is_valid() {
            tracing::error!(bounds = %query.bounds, "invalid search bounds");
            return;
        }
        let span = self.grid.span(&query.bounds);
        if span.is_empty() {
            return;
        }

        // A rare required tag can be cheaper to walk than the chunks.
        if let Some(tag_id) = self.narrowest_tag(&query.tagset) {
            let tag_len = self.tags[tag_id as usize].len();
            if self.chunk_entries_exceed(&span, tag_len) {
                metrics! {
                    metrics::TAG_DRIVEN_SEARCHES.increment(1);
                }
                self.scan_tag(tag_id, query, emit);
                return;
            }
        }
        self.scan_chunks(&span, query, emit);
    }

    fn narrowest_tag(&self, required: &Tagset) -> Option<TagId> {
        required
            .iter()
            .min_by_key(|&tag_id| self.tags[tag_id as usize].len())
    }

    fn chunk_entries_exceed(&self, span: &ChunkSpan, limit: usize) -> bool {
        let mut total = 0;
        for chunk_id in span.iter() {
            total += self.chunks.get(&chunk_id).map_or(0, |bucket| bucket.len());
            if total > limit {
                return true;
            }
        }
        false
    }

    fn scan_tag(
        &self,
        tag_id: TagId,
        query: &EntitySearch,
        mut emit: impl FnMut(EntityId) -> ControlFlow<()>,
    ) {
        let mut visited = 0u64;
        let mut matched = 0u64;
        for &slot in &self.tags[tag_id as usize] {
            visited += 1;
            let collider = &self.slots[slot as usize].entity.collider;
            if query.matches(collider.id, &collider.bounds, &collider.tagset) {
                matched += 1;
                if emit(collider.id).is_break() {
                    break;
                }
            }
        }
        record_scan(visited, matched);
    }

    fn scan_chunks(
        &self,
        span: &ChunkSpan,
        query: &EntitySearch,
        mut emit: impl FnMut(EntityId) -> ControlFlow<()>,
    ) {
        let mut visited = 0u64;
        let mut matched = 0u64;
        // Only entities spanning several chunks can show up twice.
        let mut seen: Option<HashSet<u32>> = None;

        'chunks: for chunk_id in span.iter() {
            let Some(bucket) = self.chunks.get(&chunk_id) else {
                continue;
            };
            for entry in bucket {
                visited += 1;
                if !query.matches(entry.id, &entry.bounds, &entry.tagset) {
                    continue;
                }
                if entry.shared && !seen.get_or_insert_with(HashSet::new).insert(entry.slot) {
                    continue;
                }
                matched += 1;
                if emit(entry.id).is_break() {
                    break 'chunks;
                }
            }
        }
        record_scan(visited, matched);
    }
}

#[allow(unused_variables)]
fn record_scan(visited: u64, matched: u64) {
    metrics! {
        metrics::CANDIDATES_VISITED.increment(visited);
        metrics::MATCHES_RETURNED.increment(matched);
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{EntityCollider, EntityId, EntitySearch};
    use crate::entity_index::EntityIndex;
    use crate::tagset::{Tagset, TAG_ID_COUNT};
    use overworld_core::math::DeterministicRng;
    use overworld_core::Bounds;

    fn add(index: &mut EntityIndex, id: EntityId, bounds: Bounds, tags: &[u32]) {
        index
            .set_collider(&EntityCollider {
                id,
                bounds,
                tagset: Tagset::from_tags(tags),
            })
            .unwrap();
    }

    fn sorted(mut ids: Vec<EntityId>) -> Vec<EntityId> {
        ids.sort_unstable();
        ids
    }

    #[test]
    fn multi_chunk_entity_reported_once() {
        let mut index = EntityIndex::new();
        add(&mut index, 1, Bounds::new(10.0, 10.0, 200.0, 200.0), &[]);
        add(&mut index, 2, Bounds::new(50.0, 50.0, 60.0, 60.0), &[]);

        let query = EntitySearch::new(Bounds::new(0.0, 0.0, 256.0, 256.0));
        assert_eq!(sorted(index.search_all(&query)), vec![1, 2]);

        let mut out = [0; 16];
        assert_eq!(index.search(&query, &mut out), 2);
    }

    #[test]
    fn output_buffer_caps_results() {
        let mut index = EntityIndex::new();
        for id in 0..10 {
            add(&mut index, id, Bounds::from_size(id as f32 * 2.0, 0.0, 1.0, 1.0), &[]);
        }
        let query = EntitySearch::new(Bounds::new(0.0, 0.0, 64.0, 64.0));
        let mut small = [u32::MAX; 4];
        assert_eq!(index.search(&query, &mut small), 4);
        assert!(small.iter().all(|&id| id < 10));
        assert_eq!(index.search(&query, &mut []), 0);

        let mut full = vec![0; index.count()];
        assert_eq!(index.search(&query, &mut full), 10);
    }

    #[test]
    fn excluded_id_and_touching_edges() {
        let mut index = EntityIndex::new();
        add(&mut index, 1, Bounds::new(0.0, 0.0, 10.0, 10.0), &[]);
        add(&mut index, 2, Bounds::new(10.0, 0.0, 20.0, 10.0), &[]);
        add(&mut index, 3, Bounds::new(5.0, 5.0, 15.0, 15.0), &[]);

        let own = index.get(1).unwrap().collider.bounds;
        let query = EntitySearch::new(own).excluding(1);
        // 2 only touches entity 1's right edge.
        assert_eq!(sorted(index.search_all(&query)), vec![3]);
    }

    #[test]
    fn degenerate_queries_return_nothing() {
        let mut index = EntityIndex::new();
        add(&mut index, 1, Bounds::new(0.0, 0.0, 10.0, 10.0), &[]);
        let mut out = [0; 4];
        let line = EntitySearch::new(Bounds::new(0.0, 5.0, 10.0, 5.0));
        let inverted = EntitySearch::new(Bounds::new(10.0, 0.0, 0.0, 10.0));
        let nan = EntitySearch::new(Bounds::new(0.0, 0.0, f32::NAN, 10.0));
        assert_eq!(index.search(&line, &mut out), 0);
        assert_eq!(index.search(&inverted, &mut out), 0);
        assert_eq!(index.search(&nan, &mut out), 0);
    }

    #[test]
    fn tag_driven_and_chunk_scans_agree() {
        let mut index = EntityIndex::new();
        let mut rng = DeterministicRng::new(2024);
        let mut colliders = Vec::new();
        for id in 0..600u32 {
            let bounds = Bounds::from_size(
                rng.next_range(0.0, 512.0).floor(),
                rng.next_range(0.0, 512.0).floor(),
                1.0 + rng.next_below(48) as f32,
                1.0 + rng.next_below(48) as f32,
            );
            // tag 9 is rare, tag 0 is on everyone
            let tags: Vec<u32> = if id % 50 == 0 { vec![0, 9] } else { vec![0] };
            add(&mut index, id, bounds, &tags);
            colliders.push((id, bounds, Tagset::from_tags(&tags)));
        }

        for _ in 0..40 {
            let query_bounds = Bounds::from_size(
                rng.next_range(0.0, 400.0).floor(),
                rng.next_range(0.0, 400.0).floor(),
                1.0 + rng.next_below(200) as f32,
                1.0 + rng.next_below(200) as f32,
            );
            let tag = if rng.next_below(2) == 0 { 9 } else { rng.next_below(TAG_ID_COUNT).min(9) };
            let query = EntitySearch::new(query_bounds).with_tags(Tagset::from_tags(&[tag]));
            let expected: Vec<EntityId> = colliders
                .iter()
                .filter(|(id, bounds, tagset)| query.matches(*id, bounds, tagset))
                .map(|(id, _, _)| *id)
                .collect();
            assert_eq!(sorted(index.search_all(&query)), expected);
        }
    }
}
