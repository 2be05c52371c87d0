/// Best-K Register (spec §4.3)
///
/// A bounded sorted list of the lowest-error candidates. `BestK` is the
/// sequential, unsynchronized variant (used when `W <= 1`, matching the
/// teacher's `calibrate_sequential` path in spirit); `SharedBestK` wraps it
/// for the multi-worker path with the lock-free fast-path check described in
/// spec §5 and the teacher's single process-global `GMutex mutex` in the
/// original C source.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestEntry {
    pub candidate: usize,
    pub score: f64,
}

/// Sequential Best-K register: entries are kept sorted ascending by score,
/// bounded to `nbests`.
#[derive(Debug, Clone)]
pub struct BestK {
    nbests: usize,
    entries: Vec<BestEntry>,
}

impl BestK {
    pub fn new(nbests: usize) -> Self {
        assert!(nbests >= 1, "nbests must be >= 1");
        Self {
            nbests,
            entries: Vec::with_capacity(nbests),
        }
    }

    pub fn nbests(&self) -> usize {
        self.nbests
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[BestEntry] {
        &self.entries
    }

    pub fn worst_score(&self) -> f64 {
        self.entries.last().map(|e| e.score).unwrap_or(f64::INFINITY)
    }

    /// Offers `(candidate, score)`. Inserts it if there is room or it beats
    /// the current worst entry; ties do not displace the earlier offer
    /// (strict `<`, per spec §4.3). O(K) per successful offer via
    /// adjacent-swap bubble insertion.
    pub fn offer(&mut self, candidate: usize, score: f64) {
        if self.entries.len() >= self.nbests && score >= self.worst_score() {
            return;
        }

        if self.entries.len() < self.nbests {
            self.entries.push(BestEntry { candidate, score });
        } else {
            let last = self.entries.len() - 1;
            self.entries[last] = BestEntry { candidate, score };
        }

        let mut i = self.entries.len() - 1;
        while i > 0 && self.entries[i].score < self.entries[i - 1].score {
            self.entries.swap(i, i - 1);
            i -= 1;
        }
        debug_assert!(self.is_sorted(), "Best-K ordering invariant broken");
    }

    fn is_sorted(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].score <= w[1].score)
    }

    /// Merges `other` into `self`, keeping the lowest `nbests` scores
    /// overall (spec §4.6, §8 property 6). Commutative up to tie-break
    /// ordering: `merge(a, b)` and `merge(b, a)` keep the same set of
    /// scores, though which of two exactly-tied entries survives may
    /// differ.
    pub fn merge(&mut self, other: &BestK) {
        for entry in other.entries() {
            self.offer(entry.candidate, entry.score);
        }
    }
}

/// Thread-safe Best-K register for the `W > 1` path.
pub struct SharedBestK {
    inner: Mutex<BestK>,
    // Lock-free fast-path state: re-validated inside the critical section,
    // so a stale read here can only trigger an unnecessary lock acquisition,
    // never miss a valid update (spec §5).
    count: AtomicUsize,
    worst_score_bits: AtomicU64,
}

impl SharedBestK {
    pub fn new(nbests: usize) -> Self {
        Self {
            inner: Mutex::new(BestK::new(nbests)),
            count: AtomicUsize::new(0),
            worst_score_bits: AtomicU64::new(f64::INFINITY.to_bits()),
        }
    }

    pub fn offer(&self, candidate: usize, score: f64) {
        let nbests = {
            // Only ever read, never mutated after construction; cheap to
            // grab once under lock rather than duplicating it atomically.
            let guard = self.inner.lock().unwrap();
            guard.nbests()
        };
        if self.count.load(Ordering::Relaxed) >= nbests {
            let worst = f64::from_bits(self.worst_score_bits.load(Ordering::Relaxed));
            if score >= worst {
                return;
            }
        }

        let mut guard = self.inner.lock().unwrap();
        guard.offer(candidate, score);
        self.count.store(guard.len(), Ordering::Relaxed);
        self.worst_score_bits
            .store(guard.worst_score().to_bits(), Ordering::Relaxed);
    }

    pub fn into_inner(self) -> BestK {
        self.inner.into_inner().unwrap()
    }

    pub fn snapshot(&self) -> BestK {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_lowest_k_sorted_ascending() {
        let mut best = BestK::new(3);
        for (i, score) in [5.0, 1.0, 3.0, 9.0, 0.5, 2.0].into_iter().enumerate() {
            best.offer(i, score);
        }
        let scores: Vec<f64> = best.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![0.5, 1.0, 2.0]);
    }

    #[test]
    fn ties_do_not_displace_earlier_offer() {
        let mut best = BestK::new(1);
        best.offer(0, 1.0);
        best.offer(1, 1.0);
        assert_eq!(best.entries()[0].candidate, 0);
    }

    #[test]
    fn merge_keeps_union_top_k() {
        let mut a = BestK::new(3);
        for (i, s) in [1.0, 5.0, 9.0].into_iter().enumerate() {
            a.offer(i, s);
        }
        let mut b = BestK::new(3);
        for (i, s) in [2.0, 3.0, 100.0].into_iter().enumerate() {
            b.offer(i + 10, s);
        }
        let mut merged_ab = a.clone();
        merged_ab.merge(&b);
        let mut merged_ba = b.clone();
        merged_ba.merge(&a);

        let scores_ab: Vec<f64> = merged_ab.entries().iter().map(|e| e.score).collect();
        let scores_ba: Vec<f64> = merged_ba.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores_ab, vec![1.0, 2.0, 3.0]);
        assert_eq!(scores_ba, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn shared_bestk_offer_is_consistent_under_threads() {
        use std::sync::Arc;
        use std::thread;

        let shared = Arc::new(SharedBestK::new(3));
        let mut handles = Vec::new();
        for t in 0..4 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                for i in 0..25 {
                    let candidate = t * 25 + i;
                    shared.offer(candidate, candidate as f64);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let snap = shared.snapshot();
        assert_eq!(snap.len(), 3);
        let scores: Vec<f64> = snap.entries().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![0.0, 1.0, 2.0]);
    }
}
