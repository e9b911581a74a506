//! Second-harmonic solves driven by a fundamental solution, and result
//! distribution over communication groups.

use approx::assert_abs_diff_eq;
use num_complex::Complex64;
use sphaera_compute::{ProcessGrid, ProcessGroup};
use sphaera_core::excitation::Excitation;
use sphaera_core::geometry::Geometry;
use sphaera_core::scatterer::Scatterer;
use sphaera_core::solver::{Formulation, Solver, SolverConfig, SolverError};
use sphaera_core::types::{ElectroMagnetic, Spherical};

const WAVELENGTH: f64 = 1.0e-6;
const N_MAX: usize = 4;

fn geometry(chi2: &[f64]) -> Geometry {
    let mut geometry = Geometry::new(ElectroMagnetic::vacuum());
    for (i, &chi) in chi2.iter().enumerate() {
        let material = ElectroMagnetic::new(Complex64::new(2.25, 0.05), Complex64::new(1.0, 0.0))
            .with_chi2(Complex64::new(chi, 0.0));
        geometry
            .push_object(Scatterer::new(
                Spherical::from_cartesian([0.0, i as f64 * 0.6e-6, 0.0]),
                material,
                0.2e-6,
                N_MAX,
            ))
            .unwrap();
    }
    geometry
}

fn excitation() -> Excitation {
    Excitation::plane_wave(
        WAVELENGTH,
        0.3,
        1.1,
        Complex64::new(1.0, 0.0),
        Complex64::new(0.0, 0.5),
        ElectroMagnetic::vacuum(),
    )
}

#[test]
fn test_single_sphere_second_harmonic_is_local() {
    let geometry = geometry(&[0.7]);
    let fundamental = Solver::new(geometry.clone(), excitation(), Formulation::Direct, N_MAX, SolverConfig::default())
        .unwrap();
    let first = fundamental.solve().unwrap();
    let second = fundamental.second_harmonic(&first).unwrap().solve().unwrap();

    // One sphere: no coupling, so the source is chi * X_int and the response T(2w) times that.
    let omega2 = 2.0 * excitation().omega();
    let transfer = geometry.objects()[0].transfer_diagonal(omega2, geometry.background(), N_MAX);
    let scale = second.scattered.iter().map(|c| c.norm()).fold(0.0, f64::max);
    assert!(scale > 0.0);
    for p in 0..second.scattered.len() {
        let expected = transfer[p] * first.internal[p] * 0.7;
        assert_abs_diff_eq!((second.scattered[p] - expected).norm() / scale, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_linear_spheres_do_not_radiate_at_second_harmonic() {
    let geometry = geometry(&[0.0, 0.0, 0.0]);
    let solver = Solver::new(geometry, excitation(), Formulation::Indirect, N_MAX, SolverConfig::default())
        .unwrap();
    let first = solver.solve().unwrap();
    let second = solver.second_harmonic(&first).unwrap().solve().unwrap();
    assert!(second.scattered.iter().all(|c| c.norm() == 0.0));
}

#[test]
fn test_one_nonlinear_sphere_drives_its_neighbours() {
    let geometry = geometry(&[1.0, 0.0, 0.0]);
    let solver = Solver::new(geometry, excitation(), Formulation::Direct, N_MAX, SolverConfig::default())
        .unwrap();
    let first = solver.solve().unwrap();
    let second = solver.second_harmonic(&first).unwrap().solve().unwrap();
    let segment = 2 * (N_MAX * (N_MAX + 2));
    for sphere in 1..3 {
        let energy: f64 = second
            .scattered
            .slice(ndarray::s![sphere * segment..(sphere + 1) * segment])
            .iter()
            .map(|c| c.norm_sqr())
            .sum();
        eprintln!("sphere {sphere}: second-harmonic energy {energy:.3e}");
        assert!(energy > 0.0);
    }
}

#[test]
fn test_prior_with_wrong_truncation_is_rejected() {
    let geometry = geometry(&[1.0, 1.0]);
    let small = Solver::new(geometry.clone(), excitation(), Formulation::Direct, N_MAX, SolverConfig::default())
        .unwrap();
    let mut wrong = small.solve().unwrap();
    wrong.n_max = N_MAX + 1;
    assert!(matches!(
        small.second_harmonic(&wrong),
        Err(SolverError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_group_members_receive_identical_results() {
    let geometry = geometry(&[0.0, 0.0]);
    let config = SolverConfig {
        grid: ProcessGrid::new(2, 2).unwrap(),
        block_size: 8,
        iterative: None,
    };
    let solver = Solver::new(geometry, excitation(), Formulation::Direct, N_MAX, config).unwrap();
    let direct = solver.solve().unwrap();
    let received = solver.solve_in_group(&ProcessGroup::new(6).unwrap()).unwrap();
    assert_eq!(received.len(), 6);
    for result in &received {
        assert_eq!(result, &received[0]);
    }
    for (a, b) in received[0].scattered.iter().zip(direct.scattered.iter()) {
        assert_abs_diff_eq!((a - b).norm(), 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_update_switches_problem() {
    let mut solver = Solver::new(geometry(&[0.0]), excitation(), Formulation::Direct, N_MAX, SolverConfig::default())
        .unwrap();
    let mut bigger = geometry(&[0.0, 0.0, 0.0]);
    bigger.set_truncation(2);
    solver.update(bigger, excitation().at_harmonic(2), 2).unwrap();
    assert_eq!(solver.scattering_size(), 3 * 16);
    let result = solver.solve().unwrap();
    assert_eq!(result.n_max, 2);
    assert_eq!(result.scattered.len(), 48);
}
