//! Job runner: builds geometry and excitation, drives the solver, writes results.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use ndarray::s;
use num_complex::Complex64;
use serde::Serialize;

use sphaera_compute::ProcessGrid;
use sphaera_core::excitation::Excitation;
use sphaera_core::geometry::Geometry;
use sphaera_core::harmonics::flat_max;
use sphaera_core::scatterer::Scatterer;
use sphaera_core::solver::{Solver, SolverConfig};
use sphaera_core::types::{ElectroMagnetic, ScatteringResult, Spherical};

use crate::config::{JobConfig, MediumConfig};

/// Results from a job run.
pub struct JobOutput {
    pub fundamental: ScatteringResult,
    pub second_harmonic: Option<ScatteringResult>,
}

/// Coefficients of one sphere as written to disk.
#[derive(Debug, Serialize)]
pub struct SphereCoefficients {
    pub index: usize,
    pub position: [f64; 3],
    pub scattered: Vec<Complex64>,
    pub internal: Vec<Complex64>,
}

/// File layout of `coefficients.json` and `second_harmonic.json`.
#[derive(Debug, Serialize)]
pub struct CoefficientFile {
    pub version: &'static str,
    pub wavelength: f64,
    pub n_max: usize,
    pub spheres: Vec<SphereCoefficients>,
}

fn complex(pair: [f64; 2]) -> Complex64 {
    Complex64::new(pair[0], pair[1])
}

fn medium(config: &MediumConfig) -> ElectroMagnetic {
    ElectroMagnetic::new(complex(config.epsilon), complex(config.mu))
}

/// Build the geometry, excitation and solver configuration of a job.
pub fn build_problem(job: &JobConfig) -> Result<(Geometry, Excitation, SolverConfig)> {
    let background = medium(&job.background);
    let n_max = job.solver.n_max;
    if n_max == 0 {
        anyhow::bail!("solver.n_max must be at least 1");
    }
    if job.sphere.is_empty() {
        anyhow::bail!("No spheres defined; add at least one [[sphere]] entry");
    }

    let mut geometry = Geometry::new(background);
    for (i, sphere) in job.sphere.iter().enumerate() {
        let material = ElectroMagnetic::new(complex(sphere.epsilon), complex(sphere.mu))
            .with_chi2(complex(sphere.chi2));
        geometry
            .push_object(Scatterer::new(
                Spherical::from_cartesian(sphere.position),
                material,
                sphere.radius,
                n_max,
            ))
            .with_context(|| format!("Sphere {i} at {:?}", sphere.position))?;
    }

    let e = &job.excitation;
    if e.wavelength.is_nan() || e.wavelength <= 0.0 {
        anyhow::bail!("excitation.wavelength must be positive, got {}", e.wavelength);
    }
    let excitation = Excitation::plane_wave(
        e.wavelength,
        e.theta,
        e.phi,
        complex(e.e_theta),
        complex(e.e_phi),
        background,
    );

    let grid = ProcessGrid::new(job.solver.grid_rows, job.solver.grid_cols)
        .context("Invalid process grid in [solver]")?;
    let config = SolverConfig {
        grid,
        block_size: job.solver.block_size,
        iterative: job.solver.iterative.clone(),
    };
    Ok((geometry, excitation, config))
}

/// Run a full job from a parsed configuration.
pub fn run_job(job: &JobConfig) -> Result<JobOutput> {
    let (geometry, excitation, config) = build_problem(job)?;
    println!(
        "  {} spheres, n_max = {}, {:?} formulation",
        geometry.len(),
        job.solver.n_max,
        job.solver.formulation
    );

    let solver = Solver::new(
        geometry,
        excitation,
        job.solver.formulation,
        job.solver.n_max,
        config,
    )
    .context("Failed to assemble the scattering system")?;
    println!("Unknowns: {}", solver.scattering_size());

    let fundamental = solver.solve().context("Fundamental solve failed")?;
    info!("Fundamental solve finished");

    let second_harmonic = if job.output.second_harmonic {
        println!("Solving at the second harmonic...");
        let result = solver
            .second_harmonic(&fundamental)
            .and_then(|sh| sh.solve())
            .context("Second-harmonic solve failed")?;
        Some(result)
    } else {
        None
    };

    Ok(JobOutput {
        fundamental,
        second_harmonic,
    })
}

/// Split a result into per-sphere coefficient blocks.
pub fn per_sphere(job: &JobConfig, result: &ScatteringResult, wavelength: f64) -> CoefficientFile {
    let segment = 2 * flat_max(result.n_max);
    let spheres = job
        .sphere
        .iter()
        .enumerate()
        .map(|(i, sphere)| {
            let range = i * segment..(i + 1) * segment;
            SphereCoefficients {
                index: i,
                position: sphere.position,
                scattered: result.scattered.slice(s![range.clone()]).to_vec(),
                internal: result.internal.slice(s![range]).to_vec(),
            }
        })
        .collect();
    CoefficientFile {
        version: env!("CARGO_PKG_VERSION"),
        wavelength,
        n_max: result.n_max,
        spheres,
    }
}

/// Write per-sphere coefficients to a JSON file.
pub fn write_coefficients_json(file: &CoefficientFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(file)
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;

    println!("Coefficients written to: {}", path.display());
    Ok(())
}
