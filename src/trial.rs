/// Trial Runner (spec §4.2)
///
/// Renders inputs, spawns the simulator and evaluator as child processes,
/// reads back the scalar score, and cleans up transient files. Grounded on
/// `calibrate_parse` in the original C source, which does the same
/// render/spawn/parse/cleanup sequence with `system()`; this crate uses
/// `std::process::Command` instead (the same pattern as
/// `examples/other_examples/...lshqqytiger-autotuner__src-bin-autotuner.rs.rs`,
/// which shells out to an external compiler).
use crate::calibration::Calibration;
use crate::error::CalibError;
use crate::template;
use std::path::PathBuf;
use std::process::Command;

const MAX_SLOTS: usize = 4;

/// Runs one (candidate, experiment) trial and returns its scalar score.
///
/// File naming embeds `(slot, candidate, experiment)` so concurrent trials
/// on the same rank never alias (spec §3 invariant, §4.2 edge case).
pub fn run_trial(calib: &Calibration, candidate: usize, experiment: usize) -> Result<f64, CalibError> {
    let ninputs = calib.ninputs();
    let mut input_paths: Vec<PathBuf> = Vec::with_capacity(MAX_SLOTS);
    let output_path = PathBuf::from(format!("output-{}-{}", candidate, experiment));
    let result_path = PathBuf::from(format!("result-{}-{}", candidate, experiment));

    // Render, simulate, and evaluate inside one fallible block so a failure
    // partway through (e.g. the second of two templates fails to render)
    // still reaches the cleanup below instead of leaking transient files
    // (spec §4.2 edge case, §7 "RenderError aborts the current trial").
    let outcome: Result<f64, CalibError> = (|| {
        for slot in 0..ninputs {
            let path = PathBuf::from(format!("input-{}-{}-{}", slot, candidate, experiment));
            let handle = calib.template(slot, experiment);
            template::render(
                &calib.config.variables,
                calib.value_row(candidate),
                handle,
                &path,
                candidate,
                slot,
            )?;
            input_paths.push(path);
        }

        run_simulator(calib, &input_paths, &output_path).map_err(|reason| CalibError::Trial {
            candidate,
            experiment,
            reason,
        })?;
        run_evaluator(calib, experiment, &output_path, &result_path).map_err(|reason| CalibError::Trial {
            candidate,
            experiment,
            reason,
        })?;
        read_score(&result_path).map_err(|reason| CalibError::Trial {
            candidate,
            experiment,
            reason,
        })
    })();

    if !calib.debug {
        for path in &input_paths {
            let _ = std::fs::remove_file(path);
        }
        let _ = std::fs::remove_file(&output_path);
        let _ = std::fs::remove_file(&result_path);
    }

    outcome
}

fn run_simulator(calib: &Calibration, input_paths: &[PathBuf], output_path: &PathBuf) -> Result<(), String> {
    let mut cmd = Command::new(format!("./{}", calib.config.simulator));
    for slot in 0..MAX_SLOTS {
        match input_paths.get(slot) {
            Some(path) => cmd.arg(path),
            None => cmd.arg(""),
        };
    }
    cmd.arg(output_path);

    let status = cmd
        .status()
        .map_err(|e| format!("failed to spawn simulator '{}': {}", calib.config.simulator, e))?;
    if !status.success() {
        return Err(format!(
            "simulator '{}' exited with {}",
            calib.config.simulator, status
        ));
    }
    Ok(())
}

fn run_evaluator(
    calib: &Calibration,
    experiment: usize,
    output_path: &PathBuf,
    result_path: &PathBuf,
) -> Result<(), String> {
    let observed = &calib.config.experiments[experiment].observed_path;
    let status = Command::new(format!("./{}", calib.config.evaluator))
        .arg(output_path)
        .arg(observed)
        .arg(result_path)
        .status()
        .map_err(|e| format!("failed to spawn evaluator '{}': {}", calib.config.evaluator, e))?;
    if !status.success() {
        return Err(format!(
            "evaluator '{}' exited with {}",
            calib.config.evaluator, status
        ));
    }
    Ok(())
}

fn read_score(result_path: &PathBuf) -> Result<f64, String> {
    let content = std::fs::read_to_string(result_path)
        .map_err(|e| format!("cannot read result file '{}': {}", result_path.display(), e))?;
    let first_line = content
        .lines()
        .next()
        .ok_or_else(|| format!("result file '{}' is empty", result_path.display()))?;
    first_line
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("result file '{}' first line is not a number: {}", result_path.display(), e))
}
