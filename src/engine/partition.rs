use std::ops::Range;

/// Split `0..pool_count` into `workers` contiguous ranges.
///
/// Every range holds `pool_count / workers` pools; the last one also takes the
/// remainder. The split is fixed for the engine's lifetime.
pub fn partition(pool_count: usize, workers: usize) -> Vec<Range<usize>> {
    if workers == 0 {
        return Vec::new();
    }
    let per_worker = pool_count / workers;
    (0..workers)
        .map(|worker| {
            let start = worker * per_worker;
            let end = if worker == workers - 1 {
                pool_count
            } else {
                start + per_worker
            };
            start..end
        })
        .collect()
}
