/// Search Strategies (spec §4.5)
///
/// Each strategy fills `value[i * nvariables + j]` for every candidate `i`
/// in a rank's local window, for every variable `j`, before any worker
/// spawns a trial. Mirrors the teacher's `Optimisable`/`DifferentialEvolution`
/// split in `numerical/opt/`: a pure population-generation step kept
/// entirely separate from evaluation.
mod genetic;
mod monte_carlo;
mod sweep;

pub use genetic::Genetic;
pub use monte_carlo::MonteCarlo;
pub use sweep::Sweep;

use crate::calibration::Calibration;
use crate::config::calibration_config::Algorithm;
use rand::rngs::StdRng;

/// A parameter vector carried forward from a previous iteration's Best-K,
/// for strategies that seed their next generation from it (spec §9,
/// Genetic). Monte-Carlo and Sweep ignore it.
pub struct Elite {
    pub params: Vec<f64>,
    pub score: f64,
}

pub trait Strategy: Send + Sync {
    /// Fills this rank's local candidate window with parameter values.
    fn populate(&self, calib: &mut Calibration, rng: &mut StdRng, elites: &[Elite]);
}

pub fn for_algorithm(algorithm: Algorithm) -> Box<dyn Strategy> {
    match algorithm {
        Algorithm::MonteCarlo => Box::new(MonteCarlo),
        Algorithm::Sweep => Box::new(Sweep),
        Algorithm::Genetic => Box::new(Genetic),
    }
}
