/// Calibration configuration data model
///
/// Maps the `<calibrate>` document (spec §6) onto the `CalibrationConfig`
/// data model (spec §3), using the generic tree reader in `xmltree`. This
/// mirrors the validating, attribute-by-attribute construction the teacher
/// crate uses in `io/optimisation_config_io.rs`, adapted from INI sections
/// to XML elements/attributes per the original C source's schema.
use super::xmltree::{self, Node};
use crate::error::CalibError;

const DEFAULT_ITERATIONS: usize = 1;
const DEFAULT_BESTS: usize = 1;
/// Mirrors `RANDOM_SEED` in the original C source: a fixed default seed so
/// that Monte-Carlo runs with `R=1, W=1` are reproducible unless the
/// document overrides it.
pub const DEFAULT_SEED: u64 = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    MonteCarlo,
    Sweep,
    Genetic,
}

/// A parameter's printing format. The original C source passes a `printf`
/// format string straight through to `snprintf`; Rust has no direct
/// equivalent, so a document-supplied format is kept as an opaque string and
/// rendered with a small `%e`/`%f`/`%g`-subset interpreter (see
/// `template.rs`), while the common case of "no format given" uses a fixed
/// default. This choice is recorded in DESIGN.md.
#[derive(Debug, Clone, PartialEq)]
pub enum PrintFormat {
    Default,
    Printf(String),
}

impl PrintFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            // `"%g"`-equivalent: general/decimal, not forced scientific
            // notation (SPEC_FULL.md §3, DESIGN.md).
            PrintFormat::Default => crate::template::render_printf("%g", value),
            PrintFormat::Printf(fmt) => crate::template::render_printf(fmt, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub format: PrintFormat,
    pub min: f64,
    pub max: f64,
    /// Only meaningful for `Algorithm::Sweep`.
    pub sweeps: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub observed_path: String,
    /// 1 to 4 template paths, in slot order.
    pub templates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub simulator: String,
    pub evaluator: String,
    pub algorithm: Algorithm,
    pub variables: Vec<Variable>,
    pub experiments: Vec<Experiment>,
    /// Total simulations; constant for MonteCarlo/Genetic, product of sweep
    /// counts for Sweep (computed, not read directly from the document).
    pub nsimulations: usize,
    pub iterations: usize,
    pub nbests: usize,
    pub tolerance: Option<f64>,
    pub seed: u64,
}

impl CalibrationConfig {
    pub fn from_file(path: &str) -> Result<Self, CalibError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CalibError::Config(format!("cannot read config file '{}': {}", path, e)))?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, CalibError> {
        let root = xmltree::parse(content).map_err(CalibError::Config)?;
        Self::from_node(&root)
    }

    fn from_node(root: &Node) -> Result<Self, CalibError> {
        if root.name != "calibrate" {
            return Err(CalibError::Config(format!(
                "bad root element '{}', expected 'calibrate'",
                root.name
            )));
        }

        let simulator = require(root, "simulator")?.to_string();
        let evaluator = require(root, "evaluator")?.to_string();

        let algorithm = match root.attr("algorithm") {
            None => Algorithm::MonteCarlo,
            Some(s) if s.eq_ignore_ascii_case("sweep") => Algorithm::Sweep,
            Some(s) if s.eq_ignore_ascii_case("genetic") => Algorithm::Genetic,
            Some(other) => {
                return Err(CalibError::Config(format!(
                    "unknown algorithm '{}', expected 'sweep' or 'genetic'",
                    other
                )))
            }
        };

        let experiments = parse_experiments(root)?;
        let variables = parse_variables(root, algorithm)?;

        let nsimulations = match algorithm {
            Algorithm::MonteCarlo | Algorithm::Genetic => {
                let n = require(root, "simulations")?;
                n.parse::<usize>()
                    .map_err(|_| CalibError::Config(format!("invalid 'simulations' value '{}'", n)))?
            }
            Algorithm::Sweep => variables
                .iter()
                .map(|v| v.sweeps.expect("sweep variable always carries a count"))
                .product(),
        };
        if nsimulations == 0 {
            return Err(CalibError::Config("'simulations' must be >= 1".to_string()));
        }

        let iterations = optional_usize(root, "iterations")?.unwrap_or(DEFAULT_ITERATIONS);
        if iterations < 1 {
            return Err(CalibError::Config("'iterations' must be >= 1".to_string()));
        }

        let nbests = optional_usize(root, "bests")?.unwrap_or(DEFAULT_BESTS);
        if nbests < 1 {
            return Err(CalibError::Config("'bests' must be >= 1".to_string()));
        }

        let tolerance = match root.attr("tolerance") {
            None => None,
            Some(s) => Some(
                s.parse::<f64>()
                    .map_err(|_| CalibError::Config(format!("invalid 'tolerance' value '{}'", s)))?,
            ),
        };

        let seed = match root.attr("seed") {
            None => DEFAULT_SEED,
            Some(s) => s
                .parse::<u64>()
                .map_err(|_| CalibError::Config(format!("invalid 'seed' value '{}'", s)))?,
        };

        Ok(CalibrationConfig {
            simulator,
            evaluator,
            algorithm,
            variables,
            experiments,
            nsimulations,
            iterations,
            nbests,
            tolerance,
            seed,
        })
    }
}

fn require<'a>(node: &'a Node, attr: &str) -> Result<&'a str, CalibError> {
    node.attr(attr)
        .ok_or_else(|| CalibError::Config(format!("missing required '{}' attribute on <{}>", attr, node.name)))
}

fn optional_usize(node: &Node, attr: &str) -> Result<Option<usize>, CalibError> {
    match node.attr(attr) {
        None => Ok(None),
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| CalibError::Config(format!("invalid '{}' value '{}'", attr, s))),
    }
}

const TEMPLATE_ATTRS: [&str; 4] = ["template1", "template2", "template3", "template4"];

fn parse_experiments(root: &Node) -> Result<Vec<Experiment>, CalibError> {
    let mut experiments = Vec::new();
    let mut template_count: Option<usize> = None;

    for child in root.children_named("experiment") {
        let observed_path = require(child, "name")?.to_string();

        let mut templates = Vec::new();
        for attr in TEMPLATE_ATTRS {
            match child.attr(attr) {
                Some(path) => templates.push(path.to_string()),
                None => break,
            }
        }
        if templates.is_empty() {
            return Err(CalibError::Config(format!(
                "experiment '{}' has no template1",
                observed_path
            )));
        }

        match template_count {
            None => template_count = Some(templates.len()),
            Some(n) if n != templates.len() => {
                return Err(CalibError::Config(format!(
                    "experiment '{}' has {} templates, but experiment count was fixed at {} by an earlier experiment",
                    observed_path,
                    templates.len(),
                    n
                )));
            }
            Some(_) => {}
        }

        experiments.push(Experiment {
            observed_path,
            templates,
        });
    }

    if experiments.is_empty() {
        return Err(CalibError::Config("no calibration experiments".to_string()));
    }
    Ok(experiments)
}

fn parse_variables(root: &Node, algorithm: Algorithm) -> Result<Vec<Variable>, CalibError> {
    let mut variables = Vec::new();

    for child in root.children_named("variable") {
        let name = require(child, "name")?.to_string();

        let min = require(child, "minimum")?
            .parse::<f64>()
            .map_err(|_| CalibError::Config(format!("invalid minimum for variable '{}'", name)))?;
        let max = require(child, "maximum")?
            .parse::<f64>()
            .map_err(|_| CalibError::Config(format!("invalid maximum for variable '{}'", name)))?;
        if min > max {
            return Err(CalibError::Config(format!(
                "variable '{}' has minimum ({}) > maximum ({})",
                name, min, max
            )));
        }

        let format = match child.attr("format") {
            Some(f) => PrintFormat::Printf(f.to_string()),
            None => PrintFormat::Default,
        };

        let sweeps = if algorithm == Algorithm::Sweep {
            let s = require(child, "sweeps")?
                .parse::<usize>()
                .map_err(|_| CalibError::Config(format!("invalid sweeps count for variable '{}'", name)))?;
            if s < 1 {
                return Err(CalibError::Config(format!(
                    "variable '{}' sweeps count must be >= 1",
                    name
                )));
            }
            Some(s)
        } else {
            None
        };

        variables.push(Variable {
            name,
            format,
            min,
            max,
            sweeps,
        });
    }

    if variables.is_empty() {
        return Err(CalibError::Config("no calibration variables".to_string()));
    }
    Ok(variables)
}
