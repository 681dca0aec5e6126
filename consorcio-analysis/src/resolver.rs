//! Radial substitution: how a raw draw turns into a winning quota.
//!
//! A draw that lands on an eligible quota wins outright. Otherwise the search
//! walks outwards, `draw - 1`, `draw + 1`, `draw - 2`, `draw + 2`, ...
//! and the first eligible quota met wins. The lower side is always tried
//! first at a given offset, so when two eligible quotas sit at the same
//! distance the smaller one wins.

use consorcio_db::models::QuotaId;
use consorcio_db::quotaset::QuotaSet;

/// Winning quota for `draw`, or `None` when no eligible quota is reachable
/// within `1..=max_id`.
pub fn resolve(draw: QuotaId, eligible: &QuotaSet, max_id: QuotaId) -> Option<QuotaId> {
    if eligible.contains(draw) {
        return Some(draw);
    }
    if eligible.is_empty() {
        return None;
    }

    for offset in 1..max_id {
        let below = draw.checked_sub(offset).filter(|&q| q >= 1);
        if let Some(q) = below {
            if eligible.contains(q) {
                return Some(q);
            }
        }

        let above = draw.checked_add(offset).filter(|&q| q <= max_id);
        if let Some(q) = above {
            if eligible.contains(q) {
                return Some(q);
            }
        }

        if below.is_none() && above.is_none() {
            break;
        }
    }

    None
}

/// Resolution of every draw in `1..=max_id`, indexed by `draw - 1`.
pub fn resolve_all(eligible: &QuotaSet, max_id: QuotaId) -> Vec<Option<QuotaId>> {
    (1..=max_id)
        .map(|draw| resolve(draw, eligible, max_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_hit() {
        let eligible = QuotaSet::from_ids(20, [7]);
        assert_eq!(resolve(7, &eligible, 20), Some(7));
    }

    #[test]
    fn test_below_first_tie_break() {
        let eligible = QuotaSet::from_ids(20, [10, 12]);
        assert_eq!(resolve(11, &eligible, 20), Some(10));
    }

    #[test]
    fn test_nearest_wins_over_order() {
        // 14 is at offset 1 above, 10 at offset 3 below.
        let eligible = QuotaSet::from_ids(20, [10, 14]);
        assert_eq!(resolve(13, &eligible, 20), Some(14));
        assert_eq!(resolve(12, &eligible, 20), Some(10));
    }

    #[test]
    fn test_edges_of_range() {
        let eligible = QuotaSet::from_ids(20, [5]);
        assert_eq!(resolve(1, &eligible, 20), Some(5));
        assert_eq!(resolve(20, &eligible, 20), Some(5));

        let top = QuotaSet::from_ids(20, [20]);
        assert_eq!(resolve(1, &top, 20), Some(20));
    }

    #[test]
    fn test_single_quota_pool() {
        let eligible = QuotaSet::from_ids(1, [1]);
        assert_eq!(resolve(1, &eligible, 1), Some(1));
    }

    #[test]
    fn test_empty_eligible_is_not_found() {
        let eligible = QuotaSet::with_capacity(20);
        for draw in 1..=20 {
            assert_eq!(resolve(draw, &eligible, 20), None);
        }
    }

    #[test]
    fn test_resolve_all() {
        let eligible = QuotaSet::from_ids(6, [2, 5]);
        assert_eq!(
            resolve_all(&eligible, 6),
            vec![Some(2), Some(2), Some(2), Some(5), Some(5), Some(5)]
        );
    }
}
