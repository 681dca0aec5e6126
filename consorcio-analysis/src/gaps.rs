use rayon::prelude::*;

use consorcio_db::models::{GapRecord, QuotaId, QuotaStatus};
use consorcio_db::universe::QuotaUniverse;

/// Every maximal span of non-eligible quotas lying between two eligible
/// quotas, largest first and, for equal sizes, most contemplated first.
///
/// Spans before the first or after the last eligible quota have only one
/// boundary and are not gaps.
pub fn find_gaps(universe: &QuotaUniverse) -> Vec<GapRecord> {
    let eligible: Vec<QuotaId> = universe.eligible().iter().collect();

    let mut gaps: Vec<GapRecord> = eligible
        .par_windows(2)
        .filter_map(|pair| {
            let (lower, upper) = (pair[0], pair[1]);
            (upper > lower + 1).then(|| describe_gap(universe, lower, upper))
        })
        .collect();

    gaps.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then(b.contemplated_count.cmp(&a.contemplated_count))
    });

    log::debug!("lacunas: {} entre {} cotas elegíveis", gaps.len(), eligible.len());
    gaps
}

fn describe_gap(universe: &QuotaUniverse, lower: QuotaId, upper: QuotaId) -> GapRecord {
    let (start, end) = (lower + 1, upper - 1);

    let mut contemplated_count = 0;
    let mut purchasable_inside = Vec::new();
    for id in start..=end {
        match universe.status(id) {
            Some(QuotaStatus::Contemplated) => contemplated_count += 1,
            Some(QuotaStatus::Available) => purchasable_inside.push(id),
            _ => {}
        }
    }

    GapRecord {
        start,
        end,
        size: (end - start + 1) as usize,
        contemplated_count,
        available_count: purchasable_inside.len(),
        lower_boundary: lower,
        upper_boundary: upper,
        lower_class: classify(universe, lower),
        upper_class: classify(universe, upper),
        purchasable_inside,
    }
}

/// Purchasable, else owned, else contemplated.
fn classify(universe: &QuotaUniverse, id: QuotaId) -> QuotaStatus {
    if universe.is_available(id) {
        QuotaStatus::Available
    } else if universe.is_eligible(id) {
        QuotaStatus::Owned
    } else {
        QuotaStatus::Contemplated
    }
}
