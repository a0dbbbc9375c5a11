//! Property tests for job partitioning

use proptest::prelude::*;
use unity_platform_converter::{Partitioner, partition};

proptest! {
    #[test]
    fn prop_partitions_cover_jobs_exactly_once(
        (jobs, workers) in (1usize..200).prop_flat_map(|n| (Just((0..n).collect::<Vec<_>>()), 1..=n))
    ) {
        let parts = partition(jobs.clone(), workers);
        prop_assert_eq!(parts.len(), workers);

        let mut seen: Vec<usize> = parts.iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, jobs);

        let sizes: Vec<usize> = parts.iter().map(Vec::len).collect();
        let max = sizes.iter().max().copied().unwrap_or(0);
        let min = sizes.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1, "sizes {:?}", sizes);
    }

    #[test]
    fn prop_assignment_is_round_robin(n in 0usize..100, workers in 1usize..16) {
        let parts = partition((0..n).collect::<Vec<_>>(), workers);
        for (worker, part) in parts.iter().enumerate() {
            for (position, &job) in part.iter().enumerate() {
                prop_assert_eq!(job, worker + position * workers);
            }
        }
    }

    #[test]
    fn prop_split_never_exceeds_limits(n in 0usize..64, requested in 0usize..64, max in 1usize..16) {
        let parts = Partitioner::with_max_workers(max).split((0..n).collect::<Vec<_>>(), requested);
        prop_assert!(!parts.is_empty());
        prop_assert!(parts.len() <= max);
        prop_assert!(parts.len() <= n.max(1));
        if n > 0 {
            prop_assert!(parts.iter().all(|p| !p.is_empty()));
        }
    }
}
