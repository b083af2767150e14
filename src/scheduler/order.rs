//! Seeded run ordering

use super::{OrderPolicy, RunSeed, ScenarioFile};

/// Deterministic permutation of `files` for `seed`
///
/// The input is sorted first so the result depends only on the set of
/// identifiers and the seed, never on the order discovery produced it in.
/// The shuffle is Fisher–Yates driven solely by a generator seeded from
/// `seed`, drawing `u64` bounds so 32- and 64-bit hosts agree.
pub fn schedule(files: &[ScenarioFile], seed: RunSeed) -> Vec<ScenarioFile> {
    let mut ordered = files.to_vec();
    ordered.sort();

    let mut rng = fastrand::Rng::with_seed(seed.0);
    for i in (1..ordered.len()).rev() {
        let j = rng.u64(0..=i as u64) as usize;
        ordered.swap(i, j);
    }
    ordered
}

/// Order `files` according to `policy`
pub fn resolve_order(files: &[ScenarioFile], seed: RunSeed, policy: OrderPolicy) -> Vec<ScenarioFile> {
    match policy {
        OrderPolicy::Shuffled => schedule(files, seed),
        OrderPolicy::Sorted => {
            let mut ordered = files.to_vec();
            ordered.sort();
            ordered
        }
    }
}

/// Log the resolved order so a failed run's sequence can be replayed
pub fn log_order(order: &[ScenarioFile], seed: RunSeed, policy: OrderPolicy) {
    tracing::info!(%seed, %policy, count = order.len(), "Resolved scenario run order");
    for (i, file) in order.iter().enumerate() {
        tracing::info!(position = i + 1, scenario = %file, "Scheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn files(names: &[&str]) -> Vec<ScenarioFile> {
        names
            .iter()
            .map(|n| ScenarioFile::new(format!("/features/{}", n)))
            .collect()
    }

    #[test]
    fn test_same_seed_same_order() {
        let set = files(&["A.feature", "B.feature", "C.feature"]);
        let first = schedule(&set, RunSeed(12345));
        let second = schedule(&set, RunSeed(12345));
        assert_eq!(first, second);
    }

    #[test]
    fn test_golden_orders_are_stable() {
        // Pinned so a generator change cannot silently reorder replayed runs
        let abc = files(&["C.feature", "A.feature", "B.feature"]);
        assert_eq!(
            schedule(&abc, RunSeed(12345)),
            files(&["A.feature", "B.feature", "C.feature"])
        );

        let names: Vec<String> = (0..8).map(|i| format!("S{:02}.feature", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(
            schedule(&files(&refs), RunSeed(12345)),
            files(&[
                "S02.feature",
                "S03.feature",
                "S00.feature",
                "S07.feature",
                "S01.feature",
                "S04.feature",
                "S06.feature",
                "S05.feature",
            ])
        );
        assert_eq!(
            schedule(&files(&refs), RunSeed(42)),
            files(&[
                "S05.feature",
                "S07.feature",
                "S01.feature",
                "S02.feature",
                "S00.feature",
                "S04.feature",
                "S03.feature",
                "S06.feature",
            ])
        );
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let forward = files(&["A.feature", "B.feature", "C.feature", "D.feature", "E.feature"]);
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(
            schedule(&forward, RunSeed(12345)),
            schedule(&reversed, RunSeed(12345))
        );
    }

    #[test]
    fn test_is_a_permutation() {
        let names: Vec<String> = (0..50).map(|i| format!("S{:02}.feature", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let set = files(&refs);

        for seed in [0, 1, 42, 12345, u64::MAX] {
            let order = schedule(&set, RunSeed(seed));
            assert_eq!(order.len(), set.len());
            let unique: HashSet<_> = order.iter().collect();
            assert_eq!(unique.len(), set.len());
            for file in &set {
                assert!(unique.contains(file));
            }
        }
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let set = files(&["A.feature", "A.feature", "B.feature"]);
        let order = schedule(&set, RunSeed(7));
        assert_eq!(order.len(), 3);
        assert_eq!(order.iter().filter(|f| f.name() == "A.feature").count(), 2);
    }

    #[test]
    fn test_seed_changes_order() {
        let names: Vec<String> = (0..20).map(|i| format!("S{:02}.feature", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let set = files(&refs);
        assert_ne!(schedule(&set, RunSeed(1)), schedule(&set, RunSeed(2)));
    }

    #[test]
    fn test_empty_and_single() {
        assert!(schedule(&[], RunSeed(1)).is_empty());
        let one = files(&["A.feature"]);
        assert_eq!(schedule(&one, RunSeed(1)), one);
    }

    #[test]
    fn test_sorted_policy_ignores_seed() {
        let set = files(&["C.feature", "A.feature", "B.feature"]);
        let order = resolve_order(&set, RunSeed(99), OrderPolicy::Sorted);
        assert_eq!(order, files(&["A.feature", "B.feature", "C.feature"]));
    }
}
