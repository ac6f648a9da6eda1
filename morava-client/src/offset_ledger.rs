use std::collections::BTreeMap;
use std::sync::Mutex;

/// Broadcasting-mode offset watermark for one partition.
///
/// Each cached message inserts an unreleased record at its queue offset; the
/// record is released when consumption of that message concludes. The released
/// head prefix is pruned down to a single lingering record, which represents
/// the committed watermark. The ledger therefore never loses a position: once
/// a message was cached it always holds at least one record.
#[derive(Debug, Default)]
pub(crate) struct OffsetLedger {
    // offset -> released
    records: Mutex<BTreeMap<i64, bool>>,
}

impl OffsetLedger {
    pub(crate) fn new() -> Self {
        OffsetLedger::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, bool>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a newly cached message. A lone fully-released record is the
    /// previous watermark; it is rolled forward before the insert.
    pub(crate) fn insert(&self, offset: i64) {
        let mut records = self.lock();
        if records.len() == 1 {
            if let Some((&watermark, &released)) = records.iter().next() {
                if released {
                    records.remove(&watermark);
                }
            }
        }
        records.insert(offset, false);
    }

    /// Mark the record at `offset` released, then prune the released prefix
    /// keeping one record as the watermark.
    pub(crate) fn release(&self, offset: i64) {
        let mut records = self.lock();
        if let Some(released) = records.get_mut(&offset) {
            *released = true;
        }
        loop {
            let (head, next) = {
                let mut iter = records.iter();
                let head = iter.next().map(|(&o, &r)| (o, r));
                let next = iter.next().map(|(_, &r)| r);
                (head, next)
            };
            match (head, next) {
                (Some((head_offset, true)), Some(true)) => {
                    records.remove(&head_offset);
                }
                _ => break,
            }
        }
    }

    /// The offset the consumer may commit: one past the head record when it is
    /// released, the head record itself otherwise. `None` before any message
    /// was cached.
    pub(crate) fn committed_offset(&self) -> Option<i64> {
        let records = self.lock();
        records
            .iter()
            .next()
            .map(|(&offset, &released)| if released { offset + 1 } else { offset })
    }

    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<(i64, bool)> {
        self.lock().iter().map(|(&o, &r)| (o, r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_tracks_unreleased_records() {
        let ledger = OffsetLedger::new();
        ledger.insert(100);
        ledger.insert(101);
        assert_eq!(ledger.snapshot(), vec![(100, false), (101, false)]);
        assert_eq!(ledger.committed_offset(), Some(100));
    }

    #[test]
    fn release_rolls_the_watermark_forward() {
        let ledger = OffsetLedger::new();
        ledger.insert(100);
        ledger.insert(101);
        ledger.insert(102);

        ledger.release(100);
        assert_eq!(ledger.committed_offset(), Some(101));

        // out-of-order release does not move the watermark past a gap
        ledger.release(102);
        assert_eq!(ledger.committed_offset(), Some(101));

        ledger.release(101);
        assert_eq!(ledger.committed_offset(), Some(103));
        // released prefix prunes to a single lingering record
        assert_eq!(ledger.snapshot(), vec![(102, true)]);
    }

    #[test]
    fn cache_rolls_a_lone_released_record_forward() {
        let ledger = OffsetLedger::new();
        ledger.insert(100);
        ledger.release(100);
        assert_eq!(ledger.snapshot(), vec![(100, true)]);

        ledger.insert(101);
        assert_eq!(ledger.snapshot(), vec![(101, false)]);
    }

    #[test]
    fn ledger_never_shrinks_below_one_record() {
        let ledger = OffsetLedger::new();
        ledger.insert(5);
        ledger.insert(6);
        ledger.release(5);
        ledger.release(6);
        assert_eq!(ledger.snapshot(), vec![(6, true)]);
        assert_eq!(ledger.committed_offset(), Some(7));
    }

    #[test]
    fn empty_ledger_has_no_committed_offset() {
        let ledger = OffsetLedger::new();
        assert_eq!(ledger.committed_offset(), None);
    }
}
