//! Endpoint opportunities: intervals whose two ends can be bought while the
//! inside is already taken.
//!
//! If every quota strictly inside `[start, end]` is contemplated or owned,
//! buying just `start` and `end` captures any draw that lands in the interval
//! and resolves there, for the price of two quotas.

use rayon::prelude::*;

use consorcio_db::models::{OpportunityRecord, QuotaId};
use consorcio_db::universe::QuotaUniverse;

use crate::config::{ConfigError, EdgeSearch};

/// Scores every candidate interval and keeps those with both ends available
/// and enough of the interior occupied. Best score first; equal scores keep
/// the `(start, length)` enumeration order.
pub fn find_opportunities(
    universe: &QuotaUniverse,
    search: &EdgeSearch,
) -> Result<Vec<OpportunityRecord>, ConfigError> {
    search.validate()?;

    let total = universe.total();
    if search.min_length > total {
        return Ok(Vec::new());
    }
    let last_start = total - search.min_length + 1;
    let counts = PrefixCounts::new(universe);

    let mut found: Vec<OpportunityRecord> = (1..=last_start)
        .into_par_iter()
        .flat_map_iter(|start| {
            let longest = search.max_span.min(total - start + 1);
            let counts = &counts;
            (search.min_length..=longest)
                .filter_map(move |length| evaluate(universe, counts, search, start, length))
        })
        .collect();

    found.sort_by(|a, b| b.score.total_cmp(&a.score));

    log::debug!(
        "pontas: {} oportunidades (mínimo {}, ocupação {:.2}, extensão {})",
        found.len(),
        search.min_length,
        search.min_occupied_fraction,
        search.max_span
    );
    Ok(found)
}

fn evaluate(
    universe: &QuotaUniverse,
    counts: &PrefixCounts,
    search: &EdgeSearch,
    start: QuotaId,
    length: u32,
) -> Option<OpportunityRecord> {
    let end = start + length - 1;
    let interior_size = length.saturating_sub(2) as usize;
    if interior_size == 0 {
        return None;
    }
    if !universe.is_available(start) || !universe.is_available(end) {
        return None;
    }

    let interior_occupied = counts.occupied(start + 1, end - 1);
    let interior_available = counts.available(start + 1, end - 1);
    let occupied_fraction = interior_occupied as f64 / interior_size as f64;
    if occupied_fraction < search.min_occupied_fraction {
        return None;
    }

    Some(OpportunityRecord {
        start,
        end,
        length,
        interior_occupied,
        interior_available,
        interior_size,
        occupied_fraction,
        score: length as f64 * occupied_fraction * 100.0,
    })
}

/// Cumulative occupied/available counts, so any interval is two lookups.
struct PrefixCounts {
    occupied: Vec<usize>,
    available: Vec<usize>,
}

impl PrefixCounts {
    fn new(universe: &QuotaUniverse) -> Self {
        let size = universe.total() as usize + 1;
        let mut occupied = Vec::with_capacity(size);
        let mut available = Vec::with_capacity(size);
        occupied.push(0);
        available.push(0);
        for id in universe.ids() {
            let (o, a) = (occupied[occupied.len() - 1], available[available.len() - 1]);
            occupied.push(o + usize::from(universe.is_occupied(id)));
            available.push(a + usize::from(universe.is_available(id)));
        }
        Self { occupied, available }
    }

    fn occupied(&self, from: QuotaId, to: QuotaId) -> usize {
        self.occupied[to as usize] - self.occupied[from as usize - 1]
    }

    fn available(&self, from: QuotaId, to: QuotaId) -> usize {
        self.available[to as usize] - self.available[from as usize - 1]
    }
}
