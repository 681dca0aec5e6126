use serde::Serialize;

use crate::error::UniverseError;
use crate::universe::QuotaUniverse;

pub type QuotaId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaStatus {
    /// Already drawn; out of the competition for good.
    Contemplated,
    /// Held by a participant, not for sale, can win a draw.
    Owned,
    /// Unsold; can be bought, never wins while unsold.
    Available,
}

impl QuotaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaStatus::Contemplated => "contemplated",
            QuotaStatus::Owned => "owned",
            QuotaStatus::Available => "available",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contemplated" => Some(QuotaStatus::Contemplated),
            "owned" => Some(QuotaStatus::Owned),
            "available" => Some(QuotaStatus::Available),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaStatus::Contemplated => write!(f, "contemplada"),
            QuotaStatus::Owned => write!(f, "ativa"),
            QuotaStatus::Available => write!(f, "disponível"),
        }
    }
}

/// Raw content of a group as read from disk: owned quotas are implied.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    pub name: String,
    pub total: QuotaId,
    pub contemplated: Vec<QuotaId>,
    pub available: Vec<QuotaId>,
    /// Quotas carrying a 25% bid. Display annotation only.
    pub bids: Vec<QuotaId>,
}

impl GroupSnapshot {
    pub fn universe(&self) -> Result<QuotaUniverse, UniverseError> {
        QuotaUniverse::from_complement(
            self.total,
            self.contemplated.iter().copied(),
            self.available.iter().copied(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub start: QuotaId,
    pub end: QuotaId,
    pub length: usize,
    pub members: Vec<QuotaId>,
}

impl RunRecord {
    /// `members` must be consecutive and ascending.
    pub fn from_members(members: Vec<QuotaId>) -> Option<Self> {
        let start = *members.first()?;
        let end = *members.last()?;
        Some(Self {
            start,
            end,
            length: members.len(),
            members,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapRecord {
    pub start: QuotaId,
    pub end: QuotaId,
    pub size: usize,
    pub contemplated_count: usize,
    pub available_count: usize,
    pub lower_boundary: QuotaId,
    pub upper_boundary: QuotaId,
    pub lower_class: QuotaStatus,
    pub upper_class: QuotaStatus,
    pub purchasable_inside: Vec<QuotaId>,
}

impl GapRecord {
    /// Share of the gap nobody can buy into.
    pub fn safety(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        self.contemplated_count as f64 / self.size as f64
    }

    pub fn boundaries_purchasable(&self) -> (bool, bool) {
        (
            self.lower_class == QuotaStatus::Available,
            self.upper_class == QuotaStatus::Available,
        )
    }

    /// Up to `count` purchasable quotas around the middle of the gap, where a
    /// single purchase splits the gap's draws most evenly.
    pub fn central_purchasable(&self, count: usize) -> &[QuotaId] {
        let inside = &self.purchasable_inside;
        if inside.len() <= count {
            return inside;
        }
        let middle = inside.len() / 2;
        let from = middle.saturating_sub(count / 2).min(inside.len() - count);
        &inside[from..from + count]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatchmentRecord {
    pub quota: QuotaId,
    pub draw_count: usize,
    pub draws: Vec<QuotaId>,
}

impl CatchmentRecord {
    pub fn new(quota: QuotaId, draws: Vec<QuotaId>) -> Self {
        Self {
            quota,
            draw_count: draws.len(),
            draws,
        }
    }

    /// Fraction of all `total` draws won by this quota.
    pub fn share(&self, total: QuotaId) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.draw_count as f64 / total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityRecord {
    pub start: QuotaId,
    pub end: QuotaId,
    pub length: u32,
    pub interior_occupied: usize,
    pub interior_available: usize,
    pub interior_size: usize,
    pub occupied_fraction: f64,
    pub score: f64,
}

impl OpportunityRecord {
    pub fn interior(&self) -> std::ops::Range<QuotaId> {
        self.start + 1..self.end
    }

    pub fn interior_available_ids(&self, universe: &QuotaUniverse) -> Vec<QuotaId> {
        self.interior().filter(|&q| universe.is_available(q)).collect()
    }

    pub fn interior_occupied_ids(&self, universe: &QuotaUniverse) -> Vec<QuotaId> {
        self.interior().filter(|&q| universe.is_occupied(q)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap_with_inside(inside: Vec<QuotaId>) -> GapRecord {
        GapRecord {
            start: 11,
            end: 30,
            size: 20,
            contemplated_count: 20 - inside.len(),
            available_count: inside.len(),
            lower_boundary: 10,
            upper_boundary: 31,
            lower_class: QuotaStatus::Owned,
            upper_class: QuotaStatus::Owned,
            purchasable_inside: inside,
        }
    }

    #[test]
    fn test_status_roundtrip_str() {
        for status in [
            QuotaStatus::Contemplated,
            QuotaStatus::Owned,
            QuotaStatus::Available,
        ] {
            assert_eq!(QuotaStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QuotaStatus::parse("sold"), None);
    }

    #[test]
    fn test_snapshot_universe_complement() {
        let snapshot = GroupSnapshot {
            name: "6032".to_string(),
            total: 8,
            contemplated: vec![1, 2],
            available: vec![5, 8],
            bids: vec![3],
        };
        let u = snapshot.universe().unwrap();
        assert_eq!(u.owned().iter().collect::<Vec<_>>(), vec![3, 4, 6, 7]);
    }

    #[test]
    fn test_run_from_members() {
        let run = RunRecord::from_members(vec![6, 7, 8]).unwrap();
        assert_eq!((run.start, run.end, run.length), (6, 8, 3));
        assert!(RunRecord::from_members(Vec::new()).is_none());
    }

    #[test]
    fn test_gap_safety() {
        let gap = gap_with_inside(vec![12, 13, 20, 25, 29]);
        assert!((gap.safety() - 0.75).abs() < 1e-12);
        assert_eq!(gap.boundaries_purchasable(), (false, false));
    }

    #[test]
    fn test_central_purchasable() {
        let gap = gap_with_inside(vec![12, 13, 14, 15, 16, 17, 18, 19]);
        assert_eq!(gap.central_purchasable(5), &[14, 15, 16, 17, 18]);
        assert_eq!(gap.central_purchasable(2), &[15, 16]);

        let small = gap_with_inside(vec![20, 21]);
        assert_eq!(small.central_purchasable(5), &[20, 21]);
        let none = gap_with_inside(Vec::new());
        assert!(none.central_purchasable(3).is_empty());
    }

    #[test]
    fn test_catchment_share() {
        let record = CatchmentRecord::new(7, vec![5, 6, 7, 8]);
        assert_eq!(record.draw_count, 4);
        assert!((record.share(100) - 0.04).abs() < 1e-12);
    }
}
