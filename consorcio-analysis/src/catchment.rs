use std::collections::BTreeMap;

use rayon::prelude::*;

use consorcio_db::error::UniverseError;
use consorcio_db::models::{CatchmentRecord, QuotaId};
use consorcio_db::universe::QuotaUniverse;

use crate::resolver::{resolve, resolve_all};

/// Draws won by every eligible quota, ascending by quota.
///
/// Each draw in `1..=total` is resolved once and filed under its winner;
/// unreachable draws are counted nowhere.
pub fn catchment_table(universe: &QuotaUniverse) -> Vec<CatchmentRecord> {
    let total = universe.total();
    let eligible = universe.eligible();

    let mut buckets: BTreeMap<QuotaId, Vec<QuotaId>> =
        eligible.iter().map(|q| (q, Vec::new())).collect();
    let mut unreachable = 0usize;

    for (draw, winner) in (1..=total).zip(resolve_all(eligible, total)) {
        match winner {
            Some(winner) => buckets.entry(winner).or_default().push(draw),
            None => unreachable += 1,
        }
    }

    log::debug!(
        "captação: {} sorteios em {} cotas elegíveis, {} sem vencedor",
        total,
        buckets.len(),
        unreachable
    );

    buckets
        .into_iter()
        .map(|(quota, draws)| CatchmentRecord::new(quota, draws))
        .collect()
}

/// Draws won by `quota`. A non-eligible quota wins nothing.
///
/// Only draws strictly between the neighbouring eligible quotas can resolve
/// to `quota` (anything further out is closer to a neighbour), so only those
/// are resolved.
pub fn catchment(universe: &QuotaUniverse, quota: QuotaId) -> CatchmentRecord {
    let eligible = universe.eligible();
    if !eligible.contains(quota) {
        return CatchmentRecord::new(quota, Vec::new());
    }

    let total = universe.total();
    let from = eligible.predecessor(quota).map_or(1, |p| p + 1);
    let to = eligible.successor(quota).map_or(total, |n| n - 1);

    let draws = (from..=to)
        .filter(|&draw| resolve(draw, eligible, total) == Some(quota))
        .collect();
    CatchmentRecord::new(quota, draws)
}

/// Catchment `candidate` would have if it were bought.
pub fn what_if_catchment(
    universe: &QuotaUniverse,
    candidate: QuotaId,
) -> Result<CatchmentRecord, UniverseError> {
    let derived = universe.with_purchase(candidate)?;
    Ok(catchment(&derived, candidate))
}

/// Sorts by descending draw count, then ascending quota.
pub fn rank_table(records: &mut [CatchmentRecord]) {
    records.sort_by(|a, b| b.draw_count.cmp(&a.draw_count).then(a.quota.cmp(&b.quota)));
}

/// What-if catchment of every available quota, best purchase first.
pub fn rank_purchases(universe: &QuotaUniverse) -> Result<Vec<CatchmentRecord>, UniverseError> {
    rank_purchases_with(universe, &|| {})
}

/// Same as [`rank_purchases`], calling `tick` once per evaluated candidate.
pub fn rank_purchases_with(
    universe: &QuotaUniverse,
    tick: &(dyn Fn() + Sync),
) -> Result<Vec<CatchmentRecord>, UniverseError> {
    let candidates: Vec<QuotaId> = universe.available().iter().collect();

    let mut ranked = candidates
        .par_iter()
        .map(|&candidate| {
            let record = what_if_catchment(universe, candidate);
            tick();
            record
        })
        .collect::<Result<Vec<_>, _>>()?;

    rank_table(&mut ranked);
    log::debug!("compras: {} cotas disponíveis avaliadas", ranked.len());
    Ok(ranked)
}

pub fn best_purchase(universe: &QuotaUniverse) -> Result<Option<CatchmentRecord>, UniverseError> {
    Ok(rank_purchases(universe)?.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_universe() -> QuotaUniverse {
        // owned: 4, 5, 12, 20, 27; contemplated: 1, 2, 8, 9, 10, 25
        QuotaUniverse::new(
            30,
            [1, 2, 8, 9, 10, 25],
            [4, 5, 12, 20, 27],
            [3, 6, 7, 11, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 24, 26, 28, 29, 30],
        )
        .unwrap()
    }

    /// Per-quota scan over the whole range, no window.
    fn brute_force(universe: &QuotaUniverse, quota: QuotaId) -> Vec<QuotaId> {
        (1..=universe.total())
            .filter(|&d| resolve(d, universe.eligible(), universe.total()) == Some(quota))
            .collect()
    }

    #[test]
    fn test_table_matches_brute_force() {
        let u = sample_universe();
        let table = catchment_table(&u);
        assert_eq!(table.len(), u.eligible().len());
        for record in &table {
            assert_eq!(record.draws, brute_force(&u, record.quota));
            assert_eq!(record.draw_count, record.draws.len());
        }
    }

    #[test]
    fn test_single_matches_table() {
        let u = sample_universe();
        for record in catchment_table(&u) {
            assert_eq!(catchment(&u, record.quota), record);
        }
    }

    #[test]
    fn test_known_catchment() {
        let u = sample_universe();
        // 12 wins 9..=16: 16 sits 4 away from both 12 and 20, the lower one wins.
        let rec = catchment(&u, 12);
        assert_eq!(rec.draws, vec![9, 10, 11, 12, 13, 14, 15, 16]);
        // 1..=4 resolve to 4, 5..=8 to 5.
        assert_eq!(catchment(&u, 4).draws, vec![1, 2, 3, 4]);
        assert_eq!(catchment(&u, 5).draws, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_conservation() {
        let u = sample_universe();
        let table = catchment_table(&u);
        let resolved: usize = table.iter().map(|r| r.draw_count).sum();
        assert_eq!(resolved, u.total() as usize);
    }

    #[test]
    fn test_no_eligible_resolves_nothing() {
        let u = QuotaUniverse::from_complement(10, [1, 2, 3], [4, 5, 6, 7, 8, 9, 10]).unwrap();
        assert!(catchment_table(&u).is_empty());
        assert_eq!(catchment(&u, 4).draw_count, 0);
    }

    #[test]
    fn test_non_eligible_quota_wins_nothing() {
        let u = sample_universe();
        let rec = catchment(&u, 3);
        assert_eq!(rec.draw_count, 0);
        assert!(rec.draws.is_empty());
    }

    #[test]
    fn test_what_if_leaves_base_untouched() {
        let u = sample_universe();
        let before = catchment_table(&u);
        let rec = what_if_catchment(&u, 16).unwrap();
        assert!(rec.draw_count > 0);
        assert!(rec.draws.contains(&16));
        assert_eq!(catchment_table(&u), before);
        assert!(u.is_available(16));
    }

    #[test]
    fn test_what_if_requires_available() {
        let u = sample_universe();
        assert_eq!(
            what_if_catchment(&u, 12).unwrap_err(),
            UniverseError::NotAvailable { id: 12 }
        );
    }

    #[test]
    fn test_rank_purchases_order() {
        let u = sample_universe();
        let ranked = rank_purchases(&u).unwrap();
        assert_eq!(ranked.len(), u.available().len());
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.draw_count > b.draw_count
                    || (a.draw_count == b.draw_count && a.quota < b.quota)
            );
        }
        assert_eq!(best_purchase(&u).unwrap(), ranked.first().cloned());
    }

    #[test]
    fn test_rank_purchases_tie_prefers_smaller_id() {
        // owned 1 and 9: every single purchase wins exactly four draws.
        let u = QuotaUniverse::new(9, [5], [1, 9], [2, 3, 4, 6, 7, 8]).unwrap();
        let ranked = rank_purchases(&u).unwrap();
        assert!(ranked.iter().all(|r| r.draw_count == 4));
        let order: Vec<QuotaId> = ranked.iter().map(|r| r.quota).collect();
        assert_eq!(order, vec![2, 3, 4, 6, 7, 8]);
    }

    #[test]
    fn test_rank_purchases_ticks() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let u = sample_universe();
        let ticks = AtomicUsize::new(0);
        rank_purchases_with(&u, &|| {
            ticks.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(ticks.load(Ordering::Relaxed), u.available().len());
    }

    #[test]
    fn test_rank_table() {
        let mut records = vec![
            CatchmentRecord::new(9, vec![8, 9]),
            CatchmentRecord::new(3, vec![3]),
            CatchmentRecord::new(5, vec![4, 5, 6]),
            CatchmentRecord::new(1, vec![1, 2]),
        ];
        rank_table(&mut records);
        let order: Vec<QuotaId> = records.iter().map(|r| r.quota).collect();
        assert_eq!(order, vec![5, 1, 9, 3]);
    }

    #[test]
    fn test_single_owner_catches_every_draw() {
        let u = QuotaUniverse::new(10, [1, 2], [3], [4, 5, 6, 7, 8, 9, 10]).unwrap();
        let table = catchment_table(&u);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].draw_count, 10);
    }
}
