use consorcio_db::models::{QuotaId, RunRecord};
use consorcio_db::universe::QuotaUniverse;

/// Every maximal run of two or more consecutive ids in `ids`, longest first,
/// equal lengths by ascending start.
pub fn find_runs<I: IntoIterator<Item = QuotaId>>(ids: I) -> Vec<RunRecord> {
    let mut sorted: Vec<QuotaId> = ids.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs = Vec::new();
    let mut current: Vec<QuotaId> = Vec::new();

    for id in sorted {
        match current.last() {
            Some(&prev) if prev.checked_add(1) == Some(id) => current.push(id),
            _ => {
                close_run(&mut runs, std::mem::take(&mut current));
                current.push(id);
            }
        }
    }
    close_run(&mut runs, current);

    runs.sort_by(|a, b| b.length.cmp(&a.length).then(a.start.cmp(&b.start)));
    runs
}

fn close_run(runs: &mut Vec<RunRecord>, members: Vec<QuotaId>) {
    if members.len() < 2 {
        return;
    }
    if let Some(run) = RunRecord::from_members(members) {
        runs.push(run);
    }
}

/// Runs over available and contemplated quotas: a draw landing on a
/// contemplated quota spills over to its neighbours, so contemplated quotas
/// extend a block that can be bought.
pub fn blocking_runs(universe: &QuotaUniverse) -> Vec<RunRecord> {
    find_runs(blocking_candidates(universe))
}

pub fn blocking_candidates(universe: &QuotaUniverse) -> impl Iterator<Item = QuotaId> + '_ {
    universe
        .available()
        .iter()
        .chain(universe.contemplated().iter())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunComposition {
    pub available: usize,
    pub contemplated: usize,
}

pub fn composition(run: &RunRecord, universe: &QuotaUniverse) -> RunComposition {
    RunComposition {
        available: run.members.iter().filter(|&&q| universe.is_available(q)).count(),
        contemplated: run
            .members
            .iter()
            .filter(|&&q| universe.contemplated().contains(q))
            .count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub candidates: usize,
    pub in_runs: usize,
    pub isolated: usize,
    pub run_count: usize,
    pub mean_length: f64,
}

impl RunSummary {
    /// `candidates` is the size of the set the runs were taken from.
    pub fn of(runs: &[RunRecord], candidates: usize) -> Self {
        let in_runs: usize = runs.iter().map(|r| r.length).sum();
        let mean_length = if runs.is_empty() {
            0.0
        } else {
            in_runs as f64 / runs.len() as f64
        };
        Self {
            candidates,
            in_runs,
            isolated: candidates.saturating_sub(in_runs),
            run_count: runs.len(),
            mean_length,
        }
    }
}

/// Runs whose length is among the `tiers` largest distinct lengths, ties
/// included, in the input order.
pub fn top_length_tiers(runs: &[RunRecord], tiers: usize) -> Vec<&RunRecord> {
    let mut lengths: Vec<usize> = runs.iter().map(|r| r.length).collect();
    lengths.sort_unstable_by(|a, b| b.cmp(a));
    lengths.dedup();
    lengths.truncate(tiers);

    runs.iter().filter(|r| lengths.contains(&r.length)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(runs: &[RunRecord]) -> Vec<(QuotaId, QuotaId)> {
        runs.iter().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn test_find_runs_reference_example() {
        let runs = find_runs([1, 2, 6, 7, 8, 12, 13, 14, 34, 35, 36, 39]);
        assert_eq!(bounds(&runs), vec![(6, 8), (12, 14), (34, 36), (1, 2)]);
        assert_eq!(runs[0].members, vec![6, 7, 8]);
        assert!(runs.iter().all(|r| !r.members.contains(&39)));
    }

    #[test]
    fn test_find_runs_unsorted_with_duplicates() {
        let runs = find_runs([14, 12, 13, 13, 2, 1, 1]);
        assert_eq!(bounds(&runs), vec![(12, 14), (1, 2)]);
        assert_eq!(runs[0].length, 3);
    }

    #[test]
    fn test_find_runs_empty_and_isolated() {
        assert!(find_runs(Vec::<QuotaId>::new()).is_empty());
        assert!(find_runs([1, 3, 5, 7]).is_empty());
    }

    #[test]
    fn test_find_runs_idempotent() {
        let ids = [40, 41, 42, 1, 2, 3, 20, 21];
        assert_eq!(find_runs(ids), find_runs(ids));
    }

    #[test]
    fn test_blocking_runs_mix_statuses() {
        // 1..=12: contemplated 3, 4; available 2, 5, 9, 10; owned the rest.
        let u = QuotaUniverse::from_complement(12, [3, 4], [2, 5, 9, 10]).unwrap();
        let runs = blocking_runs(&u);
        assert_eq!(bounds(&runs), vec![(2, 5), (9, 10)]);

        let mix = composition(&runs[0], &u);
        assert_eq!(mix, RunComposition { available: 2, contemplated: 2 });
    }

    #[test]
    fn test_summary() {
        let runs = find_runs([1, 2, 6, 7, 8, 12, 13, 14, 34, 35, 36, 39]);
        let summary = RunSummary::of(&runs, 12);
        assert_eq!(summary.in_runs, 11);
        assert_eq!(summary.isolated, 1);
        assert_eq!(summary.run_count, 4);
        assert!((summary.mean_length - 2.75).abs() < 1e-12);

        let empty = RunSummary::of(&[], 3);
        assert_eq!(empty.isolated, 3);
        assert_eq!(empty.mean_length, 0.0);
    }

    #[test]
    fn test_top_length_tiers_keeps_ties() {
        let runs = find_runs([1, 2, 4, 5, 6, 10, 11, 12, 20, 21, 22, 23, 30, 31]);
        let top = top_length_tiers(&runs, 2);
        let kept: Vec<QuotaId> = top.iter().map(|r| r.start).collect();
        assert_eq!(kept, vec![20, 4, 10]);

        let all = top_length_tiers(&runs, 3);
        assert_eq!(all.len(), runs.len());
    }
}
