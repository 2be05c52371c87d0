/// Coordinator (spec §4.6)
///
/// Drives the outer iteration loop: each iteration asks the configured
/// strategy to populate this rank's candidate window, fans the window out
/// across a cached `rayon` thread pool (grounded on the pool-reuse pattern
/// in `numerical/opt/de.rs`'s `DifferentialEvolution::optimise`, which
/// builds the pool once and reuses it across generations rather than
/// per-generation), runs a trial per candidate per experiment, and folds
/// results into a Best-K register. Cross-rank merging is delegated to a
/// `Transport` so a single-process run pays no networking cost.
use crate::bestk::{BestK, SharedBestK};
use crate::calibration::Calibration;
use crate::cluster::Transport;
use crate::error::CalibError;
use crate::strategy::{self, Elite};
use crate::trial;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

pub struct Coordinator {
    pub calib: Calibration,
    transport: Box<dyn Transport>,
    /// Parameter vectors for every candidate ever admitted to `overall_best`
    /// in `run`, indexed by the virtual id stored in its `BestEntry::candidate`
    /// field. The `value` matrix is overwritten wholesale by the strategy
    /// every iteration (spec §4.5), so a winner from iteration 1 cannot be
    /// recovered from it once iteration 2 starts; this store is what lets
    /// Best-K survive across iterations (spec §4.6, §9) independent of
    /// whether the strategy itself uses `elites`.
    pub best_params: Vec<Vec<f64>>,
}

impl Coordinator {
    pub fn new(calib: Calibration, transport: Box<dyn Transport>) -> Self {
        Self {
            calib,
            transport,
            best_params: Vec::new(),
        }
    }

    /// Runs every configured iteration and returns the final, cluster-wide
    /// merged Best-K register (spec §4.6, §8 property 6).
    pub fn run(&mut self) -> Result<BestK, CalibError> {
        let strategy = strategy::for_algorithm(self.calib.config.algorithm);
        let nbests = self.calib.config.nbests;
        let seed = self.calib.config.seed.wrapping_add(self.calib.rank as u64);
        let mut rng = StdRng::seed_from_u64(seed);

        let workers = self.calib.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| CalibError::Internal(format!("failed to build worker thread pool: {}", e)))?;

        self.best_params.clear();
        let mut overall_best = BestK::new(nbests);

        for iteration in 0..self.calib.config.iterations {
            log::info!("iteration {}/{}", iteration + 1, self.calib.config.iterations);

            let elites = elites_from_overall(&overall_best, &self.best_params);
            strategy.populate(&mut self.calib, &mut rng, &elites);

            let shared: SharedBestK = SharedBestK::new(nbests);
            let windows = self.calib.worker_windows();
            let calib = &self.calib;
            let shared_ref = &shared;

            // Trial failures are local to one candidate (spec §7): a failed
            // render/simulate/evaluate makes that candidate ineligible for
            // Best-K rather than aborting the sweep, so its score is +inf
            // instead of being propagated with `?`.
            pool.install(|| {
                windows.par_iter().for_each(|&(start, end)| {
                    for candidate in start..end {
                        let mut total = 0.0;
                        for experiment in 0..calib.nexperiments() {
                            match trial::run_trial(calib, candidate, experiment) {
                                Ok(score) => total += score,
                                Err(e) => {
                                    log::warn!("candidate {} experiment {}: {}", candidate, experiment, e);
                                    total = f64::INFINITY;
                                    break;
                                }
                            }
                        }
                        shared_ref.offer(candidate, total);
                    }
                })
            });

            // Fold this iteration's winners into the persistent register
            // before the next iteration's `populate` overwrites `value`.
            let iteration_best = shared.into_inner();
            for entry in iteration_best.entries() {
                let params = self.calib.value_row(entry.candidate).to_vec();
                let virtual_id = self.best_params.len();
                self.best_params.push(params);
                overall_best.offer(virtual_id, entry.score);
            }
        }

        self.transport.merge_bestk(overall_best, nbests)
    }
}

/// Converts the persistent cross-iteration Best-K into `Elite` seeds for the
/// next iteration's strategy (only Genetic consumes these; spec §9).
fn elites_from_overall(overall_best: &BestK, best_params: &[Vec<f64>]) -> Vec<Elite> {
    overall_best
        .entries()
        .iter()
        .map(|entry| Elite {
            params: best_params[entry.candidate].clone(),
            score: entry.score,
        })
        .collect()
}
