//! TOML configuration deserialisation for scattering jobs.
//!
//! Complex quantities are written as `[re, im]` pairs.

use anyhow::Context;
use serde::Deserialize;
use sphaera_core::solver::{Formulation, SolverParameters};

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub excitation: ExcitationConfig,
    #[serde(default)]
    pub background: MediumConfig,
    pub sphere: Vec<SphereConfig>,
    #[serde(default)]
    pub solver: SolverSection,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Incident plane wave.
#[derive(Debug, Deserialize)]
pub struct ExcitationConfig {
    /// Vacuum wavelength in metres.
    pub wavelength: f64,
    /// Propagation direction polar angle (rad).
    #[serde(default)]
    pub theta: f64,
    /// Propagation direction azimuth (rad).
    #[serde(default)]
    pub phi: f64,
    #[serde(default = "default_e_theta")]
    pub e_theta: [f64; 2],
    #[serde(default = "default_zero")]
    pub e_phi: [f64; 2],
}

/// Relative permittivity and permeability of a medium.
#[derive(Debug, Deserialize)]
pub struct MediumConfig {
    #[serde(default = "default_one")]
    pub epsilon: [f64; 2],
    #[serde(default = "default_one")]
    pub mu: [f64; 2],
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            epsilon: default_one(),
            mu: default_one(),
        }
    }
}

/// A single sphere.
#[derive(Debug, Deserialize)]
pub struct SphereConfig {
    /// Centre in Cartesian coordinates (m).
    pub position: [f64; 3],
    /// Radius (m).
    pub radius: f64,
    pub epsilon: [f64; 2],
    #[serde(default = "default_one")]
    pub mu: [f64; 2],
    /// Effective second-order susceptibility.
    #[serde(default = "default_zero")]
    pub chi2: [f64; 2],
}

/// Truncation, formulation and compute resources.
#[derive(Debug, Deserialize)]
pub struct SolverSection {
    #[serde(default = "default_n_max")]
    pub n_max: usize,
    #[serde(default)]
    pub formulation: Formulation,
    #[serde(default = "default_grid_extent")]
    pub grid_rows: usize,
    #[serde(default = "default_grid_extent")]
    pub grid_cols: usize,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Krylov options, e.g. `solver = "gmres"`; absent selects a dense solve.
    #[serde(default)]
    pub iterative: Option<SolverParameters>,
}

impl Default for SolverSection {
    fn default() -> Self {
        Self {
            n_max: default_n_max(),
            formulation: Formulation::default(),
            grid_rows: default_grid_extent(),
            grid_cols: default_grid_extent(),
            block_size: default_block_size(),
            iterative: None,
        }
    }
}

fn default_e_theta() -> [f64; 2] {
    [1.0, 0.0]
}
fn default_zero() -> [f64; 2] {
    [0.0, 0.0]
}
fn default_one() -> [f64; 2] {
    [1.0, 0.0]
}
fn default_n_max() -> usize {
    5
}
fn default_grid_extent() -> usize {
    1
}
fn default_block_size() -> usize {
    sphaera_compute::DEFAULT_BLOCK_SIZE
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Also solve at twice the frequency, driven by the fundamental solution.
    #[serde(default)]
    pub second_harmonic: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            second_harmonic: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: JobConfig =
        toml::from_str(&content).with_context(|| format!("parsing job file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphaera_core::solver::ParameterValue;

    #[test]
    fn test_minimal_job_uses_defaults() {
        let job: JobConfig = toml::from_str(
            r#"
            [excitation]
            wavelength = 1.0e-6

            [[sphere]]
            position = [0.0, 0.0, 0.0]
            radius = 1.0e-7
            epsilon = [2.25, 0.0]
            "#,
        )
        .unwrap();
        assert_eq!(job.sphere.len(), 1);
        assert_eq!(job.sphere[0].mu, [1.0, 0.0]);
        assert_eq!(job.excitation.e_theta, [1.0, 0.0]);
        assert_eq!(job.background.epsilon, [1.0, 0.0]);
        assert_eq!(job.solver.n_max, 5);
        assert_eq!(job.solver.formulation, Formulation::Direct);
        assert!(job.solver.iterative.is_none());
        assert_eq!(job.output.directory, "./output");
        assert!(!job.output.second_harmonic);
    }

    #[test]
    fn test_iterative_table_passes_through() {
        let job: JobConfig = toml::from_str(
            r#"
            [excitation]
            wavelength = 1.0e-6

            [[sphere]]
            position = [0.0, 0.0, 0.0]
            radius = 1.0e-7
            epsilon = [2.25, 0.0]

            [solver]
            n_max = 3
            formulation = "indirect"
            grid_rows = 2
            grid_cols = 2

            [solver.iterative]
            solver = "tfqmr"
            maximum_iterations = 200
            convergence_tolerance = 1e-9
            "#,
        )
        .unwrap();
        assert_eq!(job.solver.formulation, Formulation::Indirect);
        let parameters = job.solver.iterative.unwrap();
        assert_eq!(parameters.get("solver"), Some(&ParameterValue::from("tfqmr")));
        assert_eq!(parameters.get("maximum_iterations"), Some(&ParameterValue::Integer(200)));
        assert_eq!(
            parameters.get("convergence_tolerance"),
            Some(&ParameterValue::Real(1e-9))
        );
    }

    #[test]
    fn test_missing_spheres_rejected() {
        let parsed: Result<JobConfig, _> = toml::from_str(
            r#"
            [excitation]
            wavelength = 1.0e-6
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let missing = std::env::temp_dir().join("sphaera-no-such-job.toml");
        let err = load_config(&missing).unwrap_err();
        assert!(err.to_string().starts_with("reading "), "{err}");
        assert!(err.to_string().contains("sphaera-no-such-job.toml"));

        let broken = std::env::temp_dir().join(format!("sphaera-broken-{}.toml", std::process::id()));
        std::fs::write(&broken, "[excitation]\nwavelength = \"blue\"\n").unwrap();
        let err = load_config(&broken).unwrap_err();
        std::fs::remove_file(&broken).unwrap();
        eprintln!("{err:#}");
        assert!(err.to_string().starts_with("parsing job file "), "{err}");
    }
}
