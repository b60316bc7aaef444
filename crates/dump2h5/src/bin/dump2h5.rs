//! dump2h5 CLI - import dumps into an HDF5 or netCDF-4 file

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dump2h5::config::DEFAULT_OUTPUT;
use dump2h5::{BatchImporter, Importer, Reporter, RunConfig};

#[derive(Parser)]
#[command(name = "dump2h5")]
#[command(version, about = "Import dump into HDF5 data file.", long_about = None)]
#[command(after_help = "Output files ending in .nc are written as netCDF-4.")]
struct Cli {
    /// Append to output file
    #[arg(short)]
    append: bool,

    /// Output file
    #[arg(short, value_name = "OUTFILE", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input dump files or directories of dumps
    #[arg(value_name = "FILE|DIR", required = true)]
    inputs: Vec<PathBuf>,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            output: cli.output,
            inputs: cli.inputs,
            append: cli.append,
        }
    }
}

fn main() -> ExitCode {
    let reporter = Reporter::from_argv0(std::env::args().next().as_deref());

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RunConfig::from(cli);
    let batch = BatchImporter::new(Importer::new(&config.output), config.append_policy());
    match batch.run(&config.inputs) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => reporter.fail(&e),
    }
}
