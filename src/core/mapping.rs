use crate::domain::model::{CorrespondenceEntry, Provenance};
use crate::domain::ports::SliceMatcher;
use crate::utils::error::{RbsyncError, Result};
use std::collections::BTreeMap;

/// Which branch of [`CorrespondenceMap::adjust`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// The slice had no entry; it was auto-matched and the delta was dropped.
    Bootstrapped(CorrespondenceEntry),
    /// The existing target was shifted and clamped into range.
    Shifted {
        previous: usize,
        entry: CorrespondenceEntry,
    },
}

impl Adjustment {
    pub fn entry(&self) -> CorrespondenceEntry {
        match self {
            Adjustment::Bootstrapped(entry) => *entry,
            Adjustment::Shifted { entry, .. } => *entry,
        }
    }
}

/// Source slice index to target slice index, each tagged with how it was
/// obtained. Iteration is always in ascending source order.
///
/// Target indices are not checked against any volume here; whoever inserts
/// is responsible for passing an in-range value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondenceMap {
    entries: BTreeMap<usize, CorrespondenceEntry>,
}

impl CorrespondenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, source_index: usize, target_index: usize, provenance: Provenance) {
        self.entries.insert(
            source_index,
            CorrespondenceEntry {
                target_index,
                provenance,
            },
        );
    }

    pub fn get(&self, source_index: usize) -> Option<CorrespondenceEntry> {
        self.entries.get(&source_index).copied()
    }

    pub fn contains(&self, source_index: usize) -> bool {
        self.entries.contains_key(&source_index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, CorrespondenceEntry)> + '_ {
        self.entries.iter().map(|(source, entry)| (*source, *entry))
    }

    pub fn manual_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_manual()).count()
    }

    /// Source to target with provenance dropped, as written on export.
    pub fn resolved(&self) -> BTreeMap<usize, usize> {
        self.entries
            .iter()
            .map(|(source, entry)| (*source, entry.target_index))
            .collect()
    }

    /// Auto-matches every source slice in `[0, source_count)`.
    ///
    /// Existing entries in that range are replaced, manual ones included.
    /// Stops at the first matcher error; slices visited before it keep their
    /// new entries.
    pub fn auto_fill<M: SliceMatcher + ?Sized>(
        &mut self,
        source_count: usize,
        matcher: &M,
    ) -> Result<usize> {
        let mut overwritten_manual = 0;
        for source_index in 0..source_count {
            let target_index = matcher.match_slice(source_index)?;
            if self.get(source_index).is_some_and(|e| e.is_manual()) {
                overwritten_manual += 1;
            }
            self.set(source_index, target_index, Provenance::Auto);
        }
        if overwritten_manual > 0 {
            tracing::info!(
                "Auto-fill replaced {} manual correspondences",
                overwritten_manual
            );
        }
        Ok(source_count)
    }

    /// Shifts the target of `source_index` by `delta`, saturating at
    /// `[0, target_slice_count - 1]`, and marks it manual.
    ///
    /// An unmapped slice is auto-matched instead and `delta` is not applied.
    pub fn adjust<M: SliceMatcher + ?Sized>(
        &mut self,
        source_index: usize,
        delta: i64,
        target_slice_count: usize,
        matcher: &M,
    ) -> Result<Adjustment> {
        if target_slice_count == 0 {
            return Err(RbsyncError::invalid_input(
                "target slice count must be positive",
            ));
        }

        let Some(existing) = self.get(source_index) else {
            let target_index = matcher.match_slice(source_index)?;
            self.set(source_index, target_index, Provenance::Auto);
            return Ok(Adjustment::Bootstrapped(CorrespondenceEntry::auto(
                target_index,
            )));
        };

        let max_index = (target_slice_count - 1) as i64;
        let shifted = (existing.target_index as i64).saturating_add(delta);
        let new_target = shifted.clamp(0, max_index) as usize;
        self.set(source_index, new_target, Provenance::Manual);

        Ok(Adjustment::Shifted {
            previous: existing.target_index,
            entry: CorrespondenceEntry::manual(new_target),
        })
    }
}

impl FromIterator<(usize, CorrespondenceEntry)> for CorrespondenceMap {
    fn from_iter<I: IntoIterator<Item = (usize, CorrespondenceEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fixed(target: usize) -> impl Fn(usize) -> Result<usize> {
        move |_| Ok(target)
    }

    #[test]
    fn test_set_get_and_overwrite() {
        let mut map = CorrespondenceMap::new();
        assert_eq!(map.get(2), None);

        map.set(2, 10, Provenance::Auto);
        assert_eq!(map.get(2), Some(CorrespondenceEntry::auto(10)));

        map.set(2, 11, Provenance::Manual);
        assert_eq!(map.get(2), Some(CorrespondenceEntry::manual(11)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_iteration_is_ascending() {
        let mut map = CorrespondenceMap::new();
        map.set(5, 1, Provenance::Auto);
        map.set(0, 2, Provenance::Manual);
        map.set(3, 3, Provenance::Auto);

        let keys: Vec<usize> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![0, 3, 5]);
        assert_eq!(map.resolved().into_iter().collect::<Vec<_>>(), vec![(0, 2), (3, 3), (5, 1)]);
    }

    #[test]
    fn test_clear_empties_map() {
        let mut map = CorrespondenceMap::new();
        map.set(0, 1, Provenance::Auto);
        map.set(1, 2, Provenance::Manual);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(1), None);
    }

    #[test]
    fn test_auto_fill_overwrites_manual_entries() {
        let mut map = CorrespondenceMap::new();
        map.set(1, 30, Provenance::Manual);
        map.set(7, 31, Provenance::Manual);

        let matcher = |i: usize| -> Result<usize> { Ok(i * 2) };
        map.auto_fill(4, &matcher).unwrap();

        for i in 0..4 {
            assert_eq!(map.get(i), Some(CorrespondenceEntry::auto(i * 2)));
        }
        // Outside the filled range, untouched.
        assert_eq!(map.get(7), Some(CorrespondenceEntry::manual(31)));
        assert_eq!(map.manual_count(), 1);
    }

    #[test]
    fn test_auto_fill_stops_on_first_error() {
        let mut map = CorrespondenceMap::new();
        let matcher = |i: usize| -> Result<usize> {
            if i == 2 {
                Err(RbsyncError::invalid_input("boom"))
            } else {
                Ok(i)
            }
        };
        assert!(map.auto_fill(5, &matcher).is_err());
        assert_eq!(map.len(), 2);
        assert!(!map.contains(2));
    }

    #[test]
    fn test_adjust_without_entry_bootstraps_auto_match() {
        let mut map = CorrespondenceMap::new();
        let calls = Cell::new(0);
        let matcher = |_: usize| -> Result<usize> {
            calls.set(calls.get() + 1);
            Ok(24)
        };

        let outcome = map.adjust(3, 1, 40, &matcher).unwrap();
        assert_eq!(outcome, Adjustment::Bootstrapped(CorrespondenceEntry::auto(24)));
        assert_eq!(map.get(3), Some(CorrespondenceEntry::auto(24)));
        assert_eq!(calls.get(), 1);

        let outcome = map.adjust(3, 1, 40, &matcher).unwrap();
        assert_eq!(
            outcome,
            Adjustment::Shifted {
                previous: 24,
                entry: CorrespondenceEntry::manual(25)
            }
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_adjust_clamping_saturates() {
        let mut map = CorrespondenceMap::new();
        map.set(0, 3, Provenance::Auto);

        map.adjust(0, -1000, 50, &fixed(0)).unwrap();
        assert_eq!(map.get(0), Some(CorrespondenceEntry::manual(0)));

        map.adjust(0, 1000, 50, &fixed(0)).unwrap();
        assert_eq!(map.get(0), Some(CorrespondenceEntry::manual(49)));

        map.adjust(0, i64::MAX, 50, &fixed(0)).unwrap();
        assert_eq!(map.get(0), Some(CorrespondenceEntry::manual(49)));
    }

    #[test]
    fn test_adjust_rejects_zero_target_slices() {
        let mut map = CorrespondenceMap::new();
        map.set(0, 3, Provenance::Auto);
        let result = map.adjust(0, 1, 0, &fixed(0));
        assert!(matches!(result, Err(RbsyncError::InvalidInput { .. })));
        assert_eq!(map.get(0), Some(CorrespondenceEntry::auto(3)));
    }
}
