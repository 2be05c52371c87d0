/// Error taxonomy for the calibration engine
///
/// Mirrors the design in spec §7: configuration errors fail fast with no
/// partial output, trial errors are local to one candidate, and internal
/// errors indicate a broken invariant (fatal).
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibError {
    /// Malformed or missing configuration attribute, or a template that
    /// could not be memory-mapped (`TemplateOpenError` folds into this one,
    /// per spec §7).
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to write a rendered input file.
    #[error("render error (candidate {candidate}, slot {slot}): {source}")]
    Render {
        candidate: usize,
        slot: usize,
        #[source]
        source: std::io::Error,
    },

    /// Render, spawn, or evaluator-result failure for one (candidate,
    /// experiment) pair. The coordinator treats the candidate's aggregate
    /// score as `+infinity` rather than propagating this further up (spec
    /// §7: "trial errors are local").
    #[error("trial error (candidate {candidate}, experiment {experiment}): {reason}")]
    Trial {
        candidate: usize,
        experiment: usize,
        reason: String,
    },

    /// A broken invariant (e.g. Best-K ordering), fatal.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CalibError>;
