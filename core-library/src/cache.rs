//! In-memory metadata cache
//!
//! One [`MediaCache`] exists per media kind. Every operation takes the
//! instance's single lock for its whole duration and releases it before
//! returning, so callers never hold the lock across provider I/O. Reads hand
//! out owned clones; mutation only happens through the methods below.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{LibraryError, Result};
use crate::models::{compare_name, CachedMediaRecord, MediaId, MediaKind};

/// What [`MediaCache::merge`] did with the incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
}

/// Thread-safe map from provider id to cached record
#[derive(Debug)]
pub struct MediaCache {
    kind: MediaKind,
    records: Mutex<HashMap<MediaId, CachedMediaRecord>>,
}

impl MediaCache {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn contains(&self, id: MediaId) -> bool {
        self.records.lock().contains_key(&id)
    }

    /// Snapshot of the record for `id`. Dirty records are returned as-is.
    pub fn get(&self, id: MediaId) -> Option<CachedMediaRecord> {
        self.records.lock().get(&id).cloned()
    }

    /// All cached ids in ascending order.
    pub fn ids(&self) -> Vec<MediaId> {
        let mut ids: Vec<MediaId> = self.records.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every record, ordered by id.
    pub fn records(&self) -> Vec<CachedMediaRecord> {
        let mut records: Vec<CachedMediaRecord> = self.records.lock().values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Reserve `id` with a dirty placeholder unless a record already exists.
    ///
    /// Returns `true` when a placeholder was inserted.
    pub fn upsert_placeholder(&self, id: MediaId) -> bool {
        let mut records = self.records.lock();
        if records.contains_key(&id) {
            return false;
        }
        records.insert(id, CachedMediaRecord::placeholder(id, self.kind));
        true
    }

    /// Store `incoming`, or fold it into the existing record for its id.
    ///
    /// # Errors
    ///
    /// [`LibraryError::KindMismatch`] when `incoming` is not of this cache's
    /// kind. The cache is left untouched.
    pub fn merge(&self, incoming: CachedMediaRecord) -> Result<MergeOutcome> {
        if incoming.kind != self.kind {
            return Err(LibraryError::KindMismatch {
                id: incoming.id,
                expected: self.kind,
                actual: incoming.kind,
            });
        }

        let mut records = self.records.lock();
        match records.get_mut(&incoming.id) {
            Some(existing) => {
                existing.merge_from(incoming);
                Ok(MergeOutcome::Updated)
            }
            None => {
                records.insert(incoming.id, incoming);
                Ok(MergeOutcome::Inserted)
            }
        }
    }

    /// Returns `true` when `id` is cached and is now dirty.
    pub fn mark_dirty(&self, id: MediaId) -> bool {
        match self.records.lock().get_mut(&id) {
            Some(record) => {
                record.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Mark every cached id in `ids` dirty; unknown ids are ignored.
    ///
    /// Returns how many records were marked.
    pub fn mark_ids_dirty(&self, ids: &[MediaId]) -> usize {
        let mut records = self.records.lock();
        let mut marked = 0;
        for id in ids {
            if let Some(record) = records.get_mut(id) {
                record.dirty = true;
                marked += 1;
            }
        }
        marked
    }

    pub fn mark_all_dirty(&self) -> usize {
        let mut records = self.records.lock();
        for record in records.values_mut() {
            record.dirty = true;
        }
        records.len()
    }

    /// Promote search-result-only records to dirty so they are fully fetched
    /// before reconciliation trusts them.
    pub fn mark_search_results_dirty(&self) -> usize {
        let mut records = self.records.lock();
        let mut promoted = 0;
        for record in records.values_mut() {
            if record.is_search_result_only && !record.dirty {
                record.dirty = true;
                promoted += 1;
            }
        }
        promoted
    }

    /// Mark records the provider never reported an update for.
    pub fn mark_placeholders_dirty(&self) -> usize {
        let mut records = self.records.lock();
        let mut marked = 0;
        for record in records.values_mut() {
            if record.server_last_updated == 0 && !record.dirty {
                record.dirty = true;
                marked += 1;
            }
        }
        marked
    }

    /// Every dirty id in ascending order.
    pub fn dirty_ids(&self) -> Vec<MediaId> {
        let mut ids: Vec<MediaId> = self
            .records
            .lock()
            .values()
            .filter(|r| r.dirty)
            .map(|r| r.id)
            .collect();
        ids.sort();
        ids
    }

    /// Dirty records that are not mere search hits.
    pub fn pending_update_count(&self) -> usize {
        self.records
            .lock()
            .values()
            .filter(|r| r.dirty && !r.is_search_result_only)
            .count()
    }

    pub fn evict(&self, id: MediaId) -> Option<CachedMediaRecord> {
        self.records.lock().remove(&id)
    }

    /// Drop every record whose id is not in `keep`.
    ///
    /// Returns the evicted ids in ascending order.
    pub fn tidy(&self, keep: &HashSet<MediaId>) -> Vec<MediaId> {
        let mut records = self.records.lock();
        let mut evicted: Vec<MediaId> = records
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &evicted {
            records.remove(id);
        }
        evicted.sort();
        if !evicted.is_empty() {
            debug!(kind = %self.kind, count = evicted.len(), "Tidied cache");
        }
        evicted
    }

    /// Remove `id`, optionally leaving a dirty placeholder so the next sync
    /// fetches it from scratch.
    ///
    /// Returns `true` when a record was removed.
    pub fn forget(&self, id: MediaId, make_placeholder: bool) -> bool {
        let mut records = self.records.lock();
        let removed = records.remove(&id).is_some();
        if make_placeholder {
            records.insert(id, CachedMediaRecord::placeholder(id, self.kind));
        }
        removed
    }

    /// Clear the cache. Returns how many records were dropped.
    pub fn forget_everything(&self) -> usize {
        let mut records = self.records.lock();
        let count = records.len();
        records.clear();
        count
    }

    /// Find the record a free-text title refers to.
    ///
    /// Exact matches on the normalised title or an alias win over partial
    /// matches. When several records match, `year` breaks the tie; a tie that
    /// remains yields `None`. Placeholders never match.
    pub fn find_by_name(&self, hint: &str, year: Option<i32>) -> Option<CachedMediaRecord> {
        let wanted = compare_name(hint);
        if wanted.is_empty() {
            return None;
        }

        let records = self.records.lock();
        let candidates: Vec<&CachedMediaRecord> =
            records.values().filter(|r| !r.is_placeholder).collect();

        let exact: Vec<&CachedMediaRecord> = candidates
            .iter()
            .copied()
            .filter(|r| r.name_matches(hint))
            .collect();
        if let Some(found) = Self::pick(&exact, year) {
            return Some(found.clone());
        }
        if exact.len() > 1 {
            return None;
        }

        let partial: Vec<&CachedMediaRecord> = candidates
            .iter()
            .copied()
            .filter(|r| compare_name(&r.name).contains(&wanted))
            .collect();
        Self::pick(&partial, year).cloned()
    }

    fn pick<'a>(
        matches: &[&'a CachedMediaRecord],
        year: Option<i32>,
    ) -> Option<&'a CachedMediaRecord> {
        match matches {
            [] => None,
            [single] => match year {
                Some(y) if single.year().is_some_and(|actual| actual != y) => None,
                _ => Some(*single),
            },
            many => {
                let y = year?;
                let mut same_year = many.iter().filter(|r| r.year() == Some(y));
                match (same_year.next(), same_year.next()) {
                    (Some(found), None) => Some(*found),
                    _ => None,
                }
            }
        }
    }

    /// Replace the whole content with `records`, e.g. from a snapshot.
    ///
    /// Records of another kind are skipped. Returns how many were loaded.
    pub fn load(&self, records: Vec<CachedMediaRecord>) -> usize {
        let mut map = self.records.lock();
        map.clear();
        for record in records {
            if record.kind != self.kind {
                warn!(id = %record.id, kind = %record.kind, expected = %self.kind, "Skipping record of wrong kind");
                continue;
            }
            map.insert(record.id, record);
        }
        map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CachedEpisode, RecordTrust};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn series(id: i64, name: &str) -> CachedMediaRecord {
        CachedMediaRecord::full(MediaId(id), MediaKind::Series, name)
    }

    #[test]
    fn test_upsert_placeholder_only_when_absent() {
        let cache = MediaCache::new(MediaKind::Series);

        assert!(cache.upsert_placeholder(MediaId(1)));
        assert!(!cache.upsert_placeholder(MediaId(1)));

        let record = cache.get(MediaId(1)).unwrap();
        assert!(record.is_placeholder);
        assert!(record.dirty);

        cache.merge(series(2, "Firefly")).unwrap();
        assert!(!cache.upsert_placeholder(MediaId(2)));
        assert_eq!(cache.get(MediaId(2)).unwrap().trust(), RecordTrust::FullFetch);
    }

    #[test]
    fn test_merge_inserts_then_updates() {
        let cache = MediaCache::new(MediaKind::Series);
        assert_eq!(cache.merge(series(1, "Lost")).unwrap(), MergeOutcome::Inserted);
        assert_eq!(
            cache
                .merge(series(1, "Lost").with_alias("Perdidos"))
                .unwrap(),
            MergeOutcome::Updated
        );
        assert!(cache.get(MediaId(1)).unwrap().aliases.contains("Perdidos"));
    }

    #[test]
    fn test_merge_rejects_wrong_kind() {
        let cache = MediaCache::new(MediaKind::Series);
        let movie = CachedMediaRecord::full(MediaId(9), MediaKind::Movie, "Heat");

        let err = cache.merge(movie).unwrap_err();
        assert!(matches!(err, LibraryError::KindMismatch { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_get_returns_snapshot_not_handle() {
        let cache = MediaCache::new(MediaKind::Series);
        cache.merge(series(1, "Lost")).unwrap();

        let mut copy = cache.get(MediaId(1)).unwrap();
        copy.name = "Changed".to_string();

        assert_eq!(cache.get(MediaId(1)).unwrap().name, "Lost");
    }

    #[test]
    fn test_dirty_marking() {
        let cache = MediaCache::new(MediaKind::Series);
        cache.merge(series(1, "A").with_server_last_updated(10)).unwrap();
        cache.merge(series(2, "B").with_server_last_updated(10)).unwrap();
        cache
            .merge(CachedMediaRecord::search_result(MediaId(3), MediaKind::Series, "C"))
            .unwrap();

        assert!(cache.dirty_ids().is_empty());
        assert!(cache.mark_dirty(MediaId(1)));
        assert!(!cache.mark_dirty(MediaId(99)));
        assert_eq!(cache.dirty_ids(), vec![MediaId(1)]);

        assert_eq!(cache.mark_search_results_dirty(), 1);
        assert_eq!(cache.dirty_ids(), vec![MediaId(1), MediaId(3)]);
        assert_eq!(cache.pending_update_count(), 1);

        assert_eq!(cache.mark_ids_dirty(&[MediaId(2), MediaId(42)]), 1);
        assert_eq!(cache.mark_all_dirty(), 3);
        assert_eq!(cache.dirty_ids().len(), 3);
    }

    #[test]
    fn test_mark_placeholders_dirty() {
        let cache = MediaCache::new(MediaKind::Movie);
        cache
            .merge(CachedMediaRecord::full(MediaId(1), MediaKind::Movie, "Never updated"))
            .unwrap();
        cache
            .merge(
                CachedMediaRecord::full(MediaId(2), MediaKind::Movie, "Updated")
                    .with_server_last_updated(5),
            )
            .unwrap();

        assert_eq!(cache.mark_placeholders_dirty(), 1);
        assert_eq!(cache.dirty_ids(), vec![MediaId(1)]);
    }

    #[test]
    fn test_tidy_and_evict() {
        let cache = MediaCache::new(MediaKind::Series);
        for id in 1..=4 {
            cache.upsert_placeholder(MediaId(id));
        }

        let keep: HashSet<MediaId> = [MediaId(2), MediaId(4)].into_iter().collect();
        assert_eq!(cache.tidy(&keep), vec![MediaId(1), MediaId(3)]);
        assert_eq!(cache.ids(), vec![MediaId(2), MediaId(4)]);

        assert!(cache.evict(MediaId(2)).is_some());
        assert!(cache.evict(MediaId(2)).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_forget_with_and_without_placeholder() {
        let cache = MediaCache::new(MediaKind::Series);
        cache.merge(series(1, "Lost")).unwrap();
        cache.merge(series(2, "Fringe")).unwrap();

        assert!(cache.forget(MediaId(1), true));
        let record = cache.get(MediaId(1)).unwrap();
        assert!(record.is_placeholder && record.dirty);

        assert!(cache.forget(MediaId(2), false));
        assert!(!cache.contains(MediaId(2)));

        assert_eq!(cache.forget_everything(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_find_by_name() {
        let cache = MediaCache::new(MediaKind::Series);
        cache
            .merge(series(1, "The Office").with_first_aired(NaiveDate::from_ymd_opt(2005, 3, 24).unwrap()))
            .unwrap();
        cache
            .merge(series(2, "The Office").with_first_aired(NaiveDate::from_ymd_opt(2001, 7, 9).unwrap()))
            .unwrap();
        cache
            .merge(
                series(3, "Battlestar Galactica")
                    .with_alias("BSG")
                    .with_first_aired(NaiveDate::from_ymd_opt(2004, 10, 18).unwrap()),
            )
            .unwrap();
        cache.upsert_placeholder(MediaId(4));

        assert_eq!(cache.find_by_name("bsg", None).unwrap().id, MediaId(3));
        assert_eq!(cache.find_by_name("Galactica", None).unwrap().id, MediaId(3));
        assert!(cache.find_by_name("office", None).is_none(), "ambiguous without year");
        assert_eq!(cache.find_by_name("Office", Some(2001)).unwrap().id, MediaId(2));
        assert!(cache.find_by_name("Galactica", Some(1978)).is_none());
        assert!(cache.find_by_name("", None).is_none());
    }

    #[test]
    fn test_load_replaces_and_skips_wrong_kind() {
        let cache = MediaCache::new(MediaKind::Series);
        cache.merge(series(1, "Old")).unwrap();

        let loaded = cache.load(vec![
            series(2, "New").with_episode(CachedEpisode::new(1, 1, 1, "Pilot")),
            CachedMediaRecord::full(MediaId(3), MediaKind::Movie, "Heat"),
        ]);

        assert_eq!(loaded, 1);
        assert_eq!(cache.ids(), vec![MediaId(2)]);
    }

    #[test]
    fn test_concurrent_merges_from_threads() {
        let cache = Arc::new(MediaCache::new(MediaKind::Series));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = MediaId(t * 100 + i);
                        cache.upsert_placeholder(id);
                        cache.merge(series(id.0, "x")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
        assert!(cache.dirty_ids().is_empty());
    }
}
