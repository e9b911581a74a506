//! Sphaera command-line interface.
//!
//! Run multiple-scattering jobs from TOML configuration files:
//! ```sh
//! sphaera-cli run job.toml
//! sphaera-cli validate job.toml
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sphaera-cli")]
#[command(about = "Sphaera: multiple scattering by ensembles of spheres")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file and assemble nothing.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Sphaera T-matrix Solver");
            println!("=======================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_job(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            let wavelength = job.excitation.wavelength;

            let fundamental = runner::per_sphere(&job, &result.fundamental, wavelength);
            runner::write_coefficients_json(&fundamental, &out_dir.join("coefficients.json"))?;

            if let Some(sh) = &result.second_harmonic {
                let file = runner::per_sphere(&job, sh, wavelength / 2.0);
                runner::write_coefficients_json(&file, &out_dir.join("second_harmonic.json"))?;
            }

            println!("Run complete.");
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let (geometry, _, solver) = runner::build_problem(&job)?;
            println!(
                "Configuration is valid: {} ({} spheres, {}x{} grid)",
                config.display(),
                geometry.len(),
                solver.grid.rows(),
                solver.grid.cols()
            );
            Ok(())
        }
    }
}
