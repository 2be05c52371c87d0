/// Runtime calibration state (spec §3)
///
/// `Calibration` is the engine's working data: the parameter matrix, the
/// opened template memory-maps (kept for the whole run, released only at
/// teardown per spec §3's lifecycle), and the rank/worker placement of this
/// process. It is built once from a `CalibrationConfig` by
/// `Calibration::new` and lives for the duration of the run, mirroring the
/// split between `OptimisationConfig` (io layer) and `CalibrationProblem`
/// (runtime struct) in the teacher's `numerical/opt/calibration.rs`.
use crate::config::calibration_config::CalibrationConfig;
use crate::error::CalibError;
use crate::partition::{rank_window, worker_windows};
use crate::template::TemplateHandle;

pub struct Calibration {
    pub config: CalibrationConfig,
    /// `templates[slot][experiment]`, opened once and reused across every
    /// candidate (spec §3 invariant).
    templates: Vec<Vec<TemplateHandle>>,
    /// Row-major `value[i * nvariables + j]`.
    value: Vec<f64>,
    pub rank: usize,
    pub ranks: usize,
    pub workers: usize,
    /// Retain transient trial files instead of deleting them (spec §4.2).
    pub debug: bool,
}

impl Calibration {
    pub fn new(
        config: CalibrationConfig,
        rank: usize,
        ranks: usize,
        workers: usize,
        debug: bool,
    ) -> Result<Self, CalibError> {
        let ninputs = config.experiments[0].templates.len();
        let mut templates: Vec<Vec<TemplateHandle>> = Vec::with_capacity(ninputs);
        for slot in 0..ninputs {
            let mut slot_handles = Vec::with_capacity(config.experiments.len());
            for experiment in &config.experiments {
                slot_handles.push(TemplateHandle::open(&experiment.templates[slot])?);
            }
            templates.push(slot_handles);
        }

        let nsimulations = config.nsimulations;
        let nvariables = config.variables.len();
        let value = vec![0.0; nsimulations * nvariables];

        Ok(Self {
            config,
            templates,
            value,
            rank,
            ranks,
            workers,
            debug,
        })
    }

    /// Builds a `Calibration` with no opened templates, for strategy tests
    /// that only exercise the value matrix and never render or run trials.
    #[cfg(test)]
    pub fn new_without_templates(
        config: CalibrationConfig,
        rank: usize,
        ranks: usize,
        workers: usize,
        debug: bool,
    ) -> Self {
        let nsimulations = config.nsimulations;
        let nvariables = config.variables.len();
        let value = vec![0.0; nsimulations * nvariables];
        Self {
            config,
            templates: Vec::new(),
            value,
            rank,
            ranks,
            workers,
            debug,
        }
    }

    pub fn nvariables(&self) -> usize {
        self.config.variables.len()
    }

    pub fn nsimulations(&self) -> usize {
        self.config.nsimulations
    }

    pub fn ninputs(&self) -> usize {
        self.templates.len()
    }

    pub fn nexperiments(&self) -> usize {
        self.config.experiments.len()
    }

    pub fn template(&self, slot: usize, experiment: usize) -> &TemplateHandle {
        &self.templates[slot][experiment]
    }

    pub fn value_row(&self, candidate: usize) -> &[f64] {
        let nv = self.nvariables();
        &self.value[candidate * nv..(candidate + 1) * nv]
    }

    pub fn set_value(&mut self, candidate: usize, variable: usize, v: f64) {
        let nv = self.nvariables();
        self.value[candidate * nv + variable] = v;
    }

    /// This rank's candidate window `[nstart, nend)`.
    pub fn rank_window(&self) -> (usize, usize) {
        rank_window(self.nsimulations(), self.rank, self.ranks)
    }

    /// This rank's worker sub-windows, in worker order.
    pub fn worker_windows(&self) -> Vec<(usize, usize)> {
        let (nstart, nend) = self.rank_window();
        worker_windows(nstart, nend, self.workers.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::calibration_config::{Algorithm, Experiment, PrintFormat, Variable};

    fn config_with_template(path: &str) -> CalibrationConfig {
        CalibrationConfig {
            simulator: "sim".to_string(),
            evaluator: "eval".to_string(),
            algorithm: Algorithm::MonteCarlo,
            variables: vec![Variable {
                name: "x".to_string(),
                format: PrintFormat::Default,
                min: 0.0,
                max: 1.0,
                sweeps: None,
            }],
            experiments: vec![Experiment {
                observed_path: "obs.dat".to_string(),
                templates: vec![path.to_string()],
            }],
            nsimulations: 4,
            iterations: 1,
            nbests: 1,
            tolerance: None,
            seed: 1,
        }
    }

    #[test]
    fn value_matrix_is_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let tpl = dir.path().join("t.tpl");
        std::fs::write(&tpl, "@value1@").unwrap();
        let config = config_with_template(tpl.to_str().unwrap());
        let mut calib = Calibration::new(config, 0, 1, 1, false).unwrap();
        calib.set_value(2, 0, 7.5);
        assert_eq!(calib.value_row(2), &[7.5]);
        assert_eq!(calib.value_row(0), &[0.0]);
    }
}
