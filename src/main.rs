mod report;

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use fecase::reference::ReferenceHost;
use fecase::{pipeline, CaseConfig, WaitOptions};
use report::RunSummary;

/// Build, solve and report a finite element case on the reference host.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Case description (TOML); the cantilever case when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for job packages and result artifacts
    #[arg(short, long, default_value = "fecase-work")]
    work_dir: PathBuf,

    /// Seconds to wait for the solver before giving up
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Print the case configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", args.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!(args:?; "Parsed arguments");

    match run(&args) {
        Ok(Some(report)) => println!("{report}"),
        Ok(None) => {}
        Err(err) => {
            error!("{err}");
            process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<Option<String>, Box<dyn Error>> {
    // Every stage of the run is driven from one configuration tree, so an
    // edited TOML file is all it takes to describe another extruded part.
    let config = match &args.config {
        Some(path) => CaseConfig::from_toml_str(&fs::read_to_string(path)?)?,
        None => CaseConfig::default(),
    };
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(None);
    }

    let wait = match args.timeout {
        Some(seconds) => WaitOptions::with_timeout(Duration::try_from_secs_f64(seconds)?),
        None => WaitOptions::default(),
    };

    // The reference host stands in for a commercial solver. It models the
    // part as a line of Euler-Bernoulli beam elements, see
    // https://en.wikipedia.org/wiki/Direct_stiffness_method
    let mut host = ReferenceHost::new(&args.work_dir);
    info!(work_dir:? = args.work_dir; "Running case");
    let outcome = pipeline::run(&config, host.services(), &wait)?;

    let summary = RunSummary::from_outcome(&outcome, &config);
    Ok(Some(summary.to_string()))
}
