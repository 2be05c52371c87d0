/// Work Partitioner (spec §4.4)
///
/// Pure functions computing the two-level split of the global simulation
/// index range across ranks, then across workers. Grounded directly on the
/// arithmetic in `calibrate_new` (rank window) and the `calibrate->thread[]`
/// bounds array in the original C source.

/// The candidate window `[start, end)` owned by rank `rank` of `ranks`.
pub fn rank_window(nsimulations: usize, rank: usize, ranks: usize) -> (usize, usize) {
    assert!(ranks >= 1, "ranks must be >= 1");
    assert!(rank < ranks, "rank must be < ranks");
    let start = rank * nsimulations / ranks;
    let end = (rank + 1) * nsimulations / ranks;
    (start, end)
}

/// The candidate sub-window owned by worker `worker` of `workers`, within
/// the rank window `[nstart, nend)`.
pub fn worker_window(nstart: usize, nend: usize, worker: usize, workers: usize) -> (usize, usize) {
    assert!(workers >= 1, "workers must be >= 1");
    assert!(worker < workers, "worker must be < workers");
    let delta = nend - nstart;
    let start = nstart + worker * delta / workers;
    let end = nstart + (worker + 1) * delta / workers;
    (start, end)
}

/// All worker windows for a rank window, in worker order.
pub fn worker_windows(nstart: usize, nend: usize, workers: usize) -> Vec<(usize, usize)> {
    (0..workers)
        .map(|w| worker_window(nstart, nend, w, workers))
        .collect()
}
