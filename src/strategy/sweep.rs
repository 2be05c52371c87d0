/// Sweep strategy: mixed-radix enumeration over each variable's `sweeps`
/// count, inclusive of both endpoints. Grounded on `calibrate_sweep` in the
/// original C source, which walks nested loops (outermost variable slowest)
/// computing `min + k * (max - min) / (sweeps - 1)`; this crate derives the
/// same digit for candidate `i` via repeated div/mod instead of nested
/// loops, since candidates are generated per-rank window rather than in
/// full sequence.
use super::{Elite, Strategy};
use crate::calibration::Calibration;
use rand::rngs::StdRng;

pub struct Sweep;

impl Strategy for Sweep {
    fn populate(&self, calib: &mut Calibration, _rng: &mut StdRng, _elites: &[Elite]) {
        let (nstart, nend) = calib.rank_window();
        let nvariables = calib.nvariables();
        let radices: Vec<usize> = (0..nvariables)
            .map(|j| calib.config.variables[j].sweeps.unwrap_or(1).max(1))
            .collect();

        for i in nstart..nend {
            let mut remainder = i;
            for j in 0..nvariables {
                let radix = radices[j];
                let digit = remainder % radix;
                remainder /= radix;

                let (min, max) = {
                    let v = &calib.config.variables[j];
                    (v.min, v.max)
                };
                let value = if radix <= 1 {
                    min
                } else {
                    min + (digit as f64) * (max - min) / ((radix - 1) as f64)
                };
                calib.set_value(i, j, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration_config::{Algorithm, Experiment, PrintFormat, Variable};
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn config() -> crate::config::calibration_config::CalibrationConfig {
        crate::config::calibration_config::CalibrationConfig {
            simulator: "sim".to_string(),
            evaluator: "eval".to_string(),
            algorithm: Algorithm::Sweep,
            variables: vec![
                Variable {
                    name: "x".to_string(),
                    format: PrintFormat::Default,
                    min: 0.0,
                    max: 1.0,
                    sweeps: Some(3),
                },
                Variable {
                    name: "y".to_string(),
                    format: PrintFormat::Default,
                    min: 10.0,
                    max: 20.0,
                    sweeps: Some(2),
                },
            ],
            experiments: vec![Experiment {
                observed_path: "obs.dat".to_string(),
                templates: vec![],
            }],
            nsimulations: 6,
            iterations: 1,
            nbests: 1,
            tolerance: None,
            seed: 1,
        }
    }

    #[test]
    fn enumerates_every_combination_exactly_once() {
        let cfg = config();
        let mut calib = Calibration::new_without_templates(cfg, 0, 1, 1, false);
        let mut rng = StdRng::seed_from_u64(0);
        Sweep.populate(&mut calib, &mut rng, &[]);

        let mut seen: HashSet<(u64, u64)> = HashSet::new();
        for i in 0..calib.nsimulations() {
            let row = calib.value_row(i);
            seen.insert((row[0].to_bits(), row[1].to_bits()));
        }
        assert_eq!(seen.len(), 6, "every mixed-radix combination must be distinct");
    }

    #[test]
    fn endpoints_are_inclusive() {
        let cfg = config();
        let mut calib = Calibration::new_without_templates(cfg, 0, 1, 1, false);
        let mut rng = StdRng::seed_from_u64(0);
        Sweep.populate(&mut calib, &mut rng, &[]);

        let xs: Vec<f64> = (0..calib.nsimulations()).map(|i| calib.value_row(i)[0]).collect();
        assert!(xs.iter().any(|&v| (v - 0.0).abs() < 1e-9));
        assert!(xs.iter().any(|&v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn partitioned_across_ranks_still_covers_all_combinations() {
        let mut seen: HashSet<(u64, u64)> = HashSet::new();
        for rank in 0..2 {
            let cfg = config();
            let mut calib = Calibration::new_without_templates(cfg, rank, 2, 1, false);
            let mut rng = StdRng::seed_from_u64(0);
            Sweep.populate(&mut calib, &mut rng, &[]);
            let (nstart, nend) = calib.rank_window();
            for i in nstart..nend {
                let row = calib.value_row(i);
                seen.insert((row[0].to_bits(), row[1].to_bits()));
            }
        }
        assert_eq!(seen.len(), 6);
    }
}
