use std::ops::RangeInclusive;

use crate::error::UniverseError;
use crate::models::{QuotaId, QuotaStatus};
use crate::quotaset::QuotaSet;

/// Immutable snapshot of a group: every quota in `1..=total` is in exactly one
/// of `contemplated`, `owned` or `available`.
///
/// Only owned quotas can win a draw (`eligible`); contemplated and owned
/// quotas together cannot be bought (`occupied`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaUniverse {
    total: QuotaId,
    contemplated: QuotaSet,
    owned: QuotaSet,
    available: QuotaSet,
}

impl QuotaUniverse {
    /// Builds a universe from the three explicit sets, failing on overlap,
    /// out-of-range ids or quotas missing from every set.
    pub fn new<C, O, A>(
        total: QuotaId,
        contemplated: C,
        owned: O,
        available: A,
    ) -> Result<Self, UniverseError>
    where
        C: IntoIterator<Item = QuotaId>,
        O: IntoIterator<Item = QuotaId>,
        A: IntoIterator<Item = QuotaId>,
    {
        let mut slots = Slots::new(total)?;
        slots.assign(contemplated, QuotaStatus::Contemplated)?;
        slots.assign(owned, QuotaStatus::Owned)?;
        slots.assign(available, QuotaStatus::Available)?;
        slots.finish(None)
    }

    /// Builds a universe where every quota that is neither contemplated nor
    /// available is owned, the way group folders describe a pool.
    pub fn from_complement<C, A>(
        total: QuotaId,
        contemplated: C,
        available: A,
    ) -> Result<Self, UniverseError>
    where
        C: IntoIterator<Item = QuotaId>,
        A: IntoIterator<Item = QuotaId>,
    {
        let mut slots = Slots::new(total)?;
        slots.assign(contemplated, QuotaStatus::Contemplated)?;
        slots.assign(available, QuotaStatus::Available)?;
        slots.finish(Some(QuotaStatus::Owned))
    }

    pub fn total(&self) -> QuotaId {
        self.total
    }

    pub fn ids(&self) -> RangeInclusive<QuotaId> {
        1..=self.total
    }

    pub fn contemplated(&self) -> &QuotaSet {
        &self.contemplated
    }

    pub fn owned(&self) -> &QuotaSet {
        &self.owned
    }

    pub fn available(&self) -> &QuotaSet {
        &self.available
    }

    /// Quotas a draw can resolve to.
    pub fn eligible(&self) -> &QuotaSet {
        &self.owned
    }

    /// Quotas nobody can buy.
    pub fn occupied(&self) -> QuotaSet {
        self.contemplated.union(&self.owned)
    }

    pub fn status(&self, id: QuotaId) -> Option<QuotaStatus> {
        if self.contemplated.contains(id) {
            Some(QuotaStatus::Contemplated)
        } else if self.owned.contains(id) {
            Some(QuotaStatus::Owned)
        } else if self.available.contains(id) {
            Some(QuotaStatus::Available)
        } else {
            None
        }
    }

    pub fn is_eligible(&self, id: QuotaId) -> bool {
        self.owned.contains(id)
    }

    pub fn is_available(&self, id: QuotaId) -> bool {
        self.available.contains(id)
    }

    pub fn is_occupied(&self, id: QuotaId) -> bool {
        self.contemplated.contains(id) || self.owned.contains(id)
    }

    /// New universe in which `id` was bought: it leaves `available` and
    /// becomes owned. `self` is left untouched.
    pub fn with_purchase(&self, id: QuotaId) -> Result<QuotaUniverse, UniverseError> {
        if !self.available.contains(id) {
            return Err(UniverseError::NotAvailable { id });
        }
        let mut derived = self.clone();
        derived.available.remove(id);
        derived.owned.insert(id);
        Ok(derived)
    }
}

struct Slots {
    total: QuotaId,
    status: Vec<Option<QuotaStatus>>,
}

impl Slots {
    fn new(total: QuotaId) -> Result<Self, UniverseError> {
        if total == 0 {
            return Err(UniverseError::EmptyPool);
        }
        Ok(Self {
            total,
            status: vec![None; total as usize],
        })
    }

    fn assign<I: IntoIterator<Item = QuotaId>>(
        &mut self,
        ids: I,
        status: QuotaStatus,
    ) -> Result<(), UniverseError> {
        for id in ids {
            if id == 0 || id > self.total {
                return Err(UniverseError::OutOfRange {
                    id,
                    total: self.total,
                });
            }
            let slot = &mut self.status[(id - 1) as usize];
            match *slot {
                Some(first) if first != status => {
                    return Err(UniverseError::Overlap {
                        id,
                        first,
                        second: status,
                    });
                }
                _ => *slot = Some(status),
            }
        }
        Ok(())
    }

    fn finish(self, fill: Option<QuotaStatus>) -> Result<QuotaUniverse, UniverseError> {
        let mut contemplated = QuotaSet::with_capacity(self.total);
        let mut owned = QuotaSet::with_capacity(self.total);
        let mut available = QuotaSet::with_capacity(self.total);

        for (id, slot) in (1..=self.total).zip(self.status) {
            match slot.or(fill) {
                Some(QuotaStatus::Contemplated) => contemplated.insert(id),
                Some(QuotaStatus::Owned) => owned.insert(id),
                Some(QuotaStatus::Available) => available.insert(id),
                None => return Err(UniverseError::Uncovered { id }),
            };
        }

        Ok(QuotaUniverse {
            total: self.total,
            contemplated,
            owned,
            available,
        })
    }
}
