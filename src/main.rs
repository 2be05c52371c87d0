/// Command-line entry point (spec §2 ambient, §6).
///
/// Parses arguments with `clap`, loads and validates the configuration
/// document, builds the runtime `Calibration`, runs the `Coordinator`, and
/// prints the winner the way the original C source's `main()` does:
/// `nthreads=<W>` up front, then on completion `THE BEST IS` / `error=...`
/// / `parameter<i>=...` lines.
use calibrator::calibration::Calibration;
use calibrator::cluster::SingleProcess;
use calibrator::config::calibration_config::CalibrationConfig;
use calibrator::coordinator::Coordinator;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "calibrator", about = "Calibrates an external simulator's parameters")]
struct Cli {
    /// Number of worker threads per rank. Defaults to the number of online
    /// processor cores.
    #[arg(long = "nthreads")]
    nthreads: Option<usize>,

    /// Raise the log level to debug.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Retain transient trial files instead of deleting them.
    #[arg(long = "debug")]
    debug: bool,

    /// Path to the `<calibrate>` configuration document.
    config_file: String,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap's own exit code for usage errors is 2; spec §6 requires 1
            // on argument error (matching the original C source's `return 1;`
            // on bad argc).
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("calibrator: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<(), calibrator::error::CalibError> {
    let workers = cli.nthreads.unwrap_or_else(num_cpus::get);
    println!("nthreads={}", workers);

    let config = CalibrationConfig::from_file(&cli.config_file)?;
    log::debug!(
        "loaded configuration: simulator={} evaluator={} nsimulations={} iterations={}",
        config.simulator,
        config.evaluator,
        config.nsimulations,
        config.iterations
    );

    let calib = Calibration::new(config, 0, 1, workers, cli.debug)?;
    let mut coordinator = Coordinator::new(calib, Box::new(SingleProcess));
    let best = coordinator.run()?;

    let winner = best.entries().first().cloned().ok_or_else(|| {
        calibrator::error::CalibError::Internal("Best-K register is empty after the run".to_string())
    })?;

    println!("THE BEST IS");
    println!("error={:e}", winner.score);
    let row = coordinator.best_params[winner.candidate].clone();
    for (i, variable) in coordinator.calib.config.variables.iter().enumerate() {
        println!("parameter{}={}", i + 1, variable.format.format(row[i]));
    }

    Ok(())
}
