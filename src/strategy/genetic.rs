/// Genetic strategy (spec §9, Open Question).
///
/// The original C source's `calibrate_genetic` is an unfinished stub; the
/// specification prescribes only the intended shape: Best-K survives across
/// iterations and seeds the next generation. This crate implements a small,
/// concrete version of that shape rather than leaving it a no-op, so the
/// engine produces a real population every iteration:
///
/// - The first `elites.len()` local candidates are the previous iteration's
///   Best-K parameter vectors, copied through unchanged (elitism).
/// - Every other local candidate is bred from two elites chosen uniformly
///   at random (per-variable coin-flip crossover), then perturbed by a
///   uniform offset scaled by `tolerance` (or 10% of the variable's range
///   if no tolerance is configured), clamped back into `[min, max]`.
/// - With no elites yet (first iteration), every candidate falls back to
///   uniform random sampling, identical to Monte-Carlo.
///
/// Concrete crossover/mutation operators remain an open decision pending
/// validation against a reference dataset; this is a deliberately simple,
/// documented choice (see DESIGN.md), not a claim of being the original
/// algorithm.
use super::{Elite, Strategy};
use crate::calibration::Calibration;
use rand::rngs::StdRng;
use rand::Rng;

pub struct Genetic;

impl Strategy for Genetic {
    fn populate(&self, calib: &mut Calibration, rng: &mut StdRng, elites: &[Elite]) {
        let (nstart, nend) = calib.rank_window();
        let nvariables = calib.nvariables();
        let tolerance = calib.config.tolerance;

        if elites.is_empty() {
            for i in nstart..nend {
                for j in 0..nvariables {
                    let (min, max) = {
                        let v = &calib.config.variables[j];
                        (v.min, v.max)
                    };
                    let value = if min == max { min } else { rng.gen_range(min..max) };
                    calib.set_value(i, j, value);
                }
            }
            return;
        }

        let elite_count = elites.len().min(nend - nstart);
        for (offset, elite) in elites.iter().take(elite_count).enumerate() {
            let i = nstart + offset;
            for j in 0..nvariables {
                calib.set_value(i, j, elite.params[j]);
            }
        }

        for i in (nstart + elite_count)..nend {
            let parent_a = &elites[rng.gen_range(0..elites.len())];
            let parent_b = &elites[rng.gen_range(0..elites.len())];
            for j in 0..nvariables {
                let (min, max) = {
                    let v = &calib.config.variables[j];
                    (v.min, v.max)
                };
                let base = if rng.gen_bool(0.5) { parent_a.params[j] } else { parent_b.params[j] };
                let scale = tolerance.unwrap_or_else(|| 0.1 * (max - min));
                let mutated = if scale > 0.0 {
                    base + rng.gen_range(-scale..scale)
                } else {
                    base
                };
                calib.set_value(i, j, mutated.clamp(min, max));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration_config::{Algorithm, Experiment, PrintFormat, Variable};
    use rand::SeedableRng;

    fn config() -> crate::config::calibration_config::CalibrationConfig {
        crate::config::calibration_config::CalibrationConfig {
            simulator: "sim".to_string(),
            evaluator: "eval".to_string(),
            algorithm: Algorithm::Genetic,
            variables: vec![Variable {
                name: "x".to_string(),
                format: PrintFormat::Default,
                min: 0.0,
                max: 10.0,
                sweeps: None,
            }],
            experiments: vec![Experiment {
                observed_path: "obs.dat".to_string(),
                templates: vec![],
            }],
            nsimulations: 10,
            iterations: 3,
            nbests: 2,
            tolerance: Some(0.5),
            seed: 3,
        }
    }

    #[test]
    fn falls_back_to_uniform_sampling_with_no_elites() {
        let cfg = config();
        let mut calib = Calibration::new_without_templates(cfg, 0, 1, 1, false);
        let mut rng = StdRng::seed_from_u64(3);
        Genetic.populate(&mut calib, &mut rng, &[]);
        for i in 0..calib.nsimulations() {
            let v = calib.value_row(i)[0];
            assert!(v >= 0.0 && v <= 10.0);
        }
    }

    #[test]
    fn elites_are_preserved_verbatim_at_window_start() {
        let cfg = config();
        let mut calib = Calibration::new_without_templates(cfg, 0, 1, 1, false);
        let mut rng = StdRng::seed_from_u64(3);
        let elites = vec![
            Elite { params: vec![1.5], score: 0.1 },
            Elite { params: vec![7.0], score: 0.2 },
        ];
        Genetic.populate(&mut calib, &mut rng, &elites);
        assert_eq!(calib.value_row(0), &[1.5]);
        assert_eq!(calib.value_row(1), &[7.0]);
    }

    #[test]
    fn offspring_stay_within_variable_range() {
        let cfg = config();
        let mut calib = Calibration::new_without_templates(cfg, 0, 1, 1, false);
        let mut rng = StdRng::seed_from_u64(3);
        let elites = vec![
            Elite { params: vec![0.5], score: 0.1 },
            Elite { params: vec![9.5], score: 0.2 },
        ];
        Genetic.populate(&mut calib, &mut rng, &elites);
        for i in 2..calib.nsimulations() {
            let v = calib.value_row(i)[0];
            assert!(v >= 0.0 && v <= 10.0, "offspring {} escaped range", v);
        }
    }
}
