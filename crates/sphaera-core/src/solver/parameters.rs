//! Key/value configuration of the Krylov solvers.
//!
//! Parameters arrive as an untyped table (typically the `[solver.iterative]`
//! section of a job file) and are validated into [`IterativeSettings`] when
//! a solve starts.
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `solver` | text: `GMRES`, `BICGSTAB` or `TFQMR` (any case) | `GMRES` |
//! | `num_blocks` | integer, GMRES restart length | 50 |
//! | `maximum_iterations` | integer | 1000 |
//! | `convergence_tolerance` | real, relative residual | 1e-10 |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::SolverError;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Integer(v) => write!(f, "{v}"),
            ParameterValue::Real(v) => write!(f, "{v:e}"),
            ParameterValue::Text(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Integer(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Real(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

/// Ordered parameter table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolverParameters {
    entries: BTreeMap<String, ParameterValue>,
}

/// Krylov method family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KrylovMethod {
    Gmres,
    BiCgStab,
    Tfqmr,
}

impl FromStr for KrylovMethod {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GMRES" => Ok(KrylovMethod::Gmres),
            "BICGSTAB" => Ok(KrylovMethod::BiCgStab),
            "TFQMR" => Ok(KrylovMethod::Tfqmr),
            _ => Err(SolverError::InvalidConfiguration(format!(
                "unknown iterative solver \"{s}\""
            ))),
        }
    }
}

impl fmt::Display for KrylovMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KrylovMethod::Gmres => "GMRES",
            KrylovMethod::BiCgStab => "BiCGSTAB",
            KrylovMethod::Tfqmr => "TFQMR",
        };
        f.write_str(name)
    }
}

/// Validated Krylov settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeSettings {
    pub method: KrylovMethod,
    /// Krylov basis size before GMRES restarts.
    pub restart: usize,
    /// Cap on the matrix-vector products driving the Krylov recurrence.
    pub max_iterations: usize,
    /// Target relative residual $\|b - Ax\| / \|b\|$.
    pub tolerance: f64,
}

impl Default for IterativeSettings {
    fn default() -> Self {
        Self {
            method: KrylovMethod::Gmres,
            restart: 50,
            max_iterations: 1000,
            tolerance: 1e-10,
        }
    }
}

impl SolverParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParameterValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.entries.iter()
    }

    fn integer(&self, key: &str, default: usize) -> Result<usize, SolverError> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParameterValue::Integer(v)) if *v > 0 => Ok(*v as usize),
            Some(other) => Err(SolverError::InvalidConfiguration(format!(
                "{key} must be a positive integer, got {other}"
            ))),
        }
    }

    fn real(&self, key: &str, default: f64) -> Result<f64, SolverError> {
        let value = match self.entries.get(key) {
            None => return Ok(default),
            Some(ParameterValue::Real(v)) => *v,
            Some(ParameterValue::Integer(v)) => *v as f64,
            Some(other) => {
                return Err(SolverError::InvalidConfiguration(format!(
                    "{key} must be a number, got {other}"
                )))
            }
        };
        if value > 0.0 && value.is_finite() {
            Ok(value)
        } else {
            Err(SolverError::InvalidConfiguration(format!(
                "{key} must be positive and finite, got {value}"
            )))
        }
    }

    /// Validate the table into Krylov settings.
    pub fn settings(&self) -> Result<IterativeSettings, SolverError> {
        let defaults = IterativeSettings::default();
        let method = match self.entries.get("solver") {
            None => defaults.method,
            Some(ParameterValue::Text(name)) => name.parse()?,
            Some(other) => {
                return Err(SolverError::InvalidConfiguration(format!(
                    "solver must be a method name, got {other}"
                )))
            }
        };
        Ok(IterativeSettings {
            method,
            restart: self.integer("num_blocks", defaults.restart)?,
            max_iterations: self.integer("maximum_iterations", defaults.max_iterations)?,
            tolerance: self.real("convergence_tolerance", defaults.tolerance)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = SolverParameters::new().settings().unwrap();
        assert_eq!(settings, IterativeSettings::default());
    }

    #[test]
    fn test_method_names_are_case_insensitive() {
        for (name, method) in [
            ("gmres", KrylovMethod::Gmres),
            ("BiCGStab", KrylovMethod::BiCgStab),
            ("TFQMR", KrylovMethod::Tfqmr),
        ] {
            let p = SolverParameters::new().with("solver", name);
            assert_eq!(p.settings().unwrap().method, method);
        }
    }

    #[test]
    fn test_rejects_unknown_method_and_bad_types() {
        let p = SolverParameters::new().with("solver", "cg");
        assert!(matches!(p.settings(), Err(SolverError::InvalidConfiguration(_))));
        let p = SolverParameters::new().with("num_blocks", "many");
        assert!(p.settings().is_err());
        let p = SolverParameters::new().with("maximum_iterations", 0i64);
        assert!(p.settings().is_err());
        let p = SolverParameters::new().with("convergence_tolerance", -1.0);
        assert!(p.settings().is_err());
        let p = SolverParameters::new().with("solver", 3i64);
        assert!(p.settings().is_err());
    }

    #[test]
    fn test_overrides() {
        let p = SolverParameters::new()
            .with("solver", "tfqmr")
            .with("num_blocks", 20i64)
            .with("maximum_iterations", 300i64)
            .with("convergence_tolerance", 1e-8);
        let s = p.settings().unwrap();
        assert_eq!(s.restart, 20);
        assert_eq!(s.max_iterations, 300);
        assert_eq!(s.tolerance, 1e-8);
    }

    #[test]
    fn test_deserialises_from_json_table() {
        let p: SolverParameters = serde_json::from_str(
            r#"{"solver": "BICGSTAB", "maximum_iterations": 200, "convergence_tolerance": 1e-9}"#,
        )
        .unwrap();
        assert_eq!(p.get("maximum_iterations"), Some(&ParameterValue::Integer(200)));
        let s = p.settings().unwrap();
        assert_eq!(s.method, KrylovMethod::BiCgStab);
        assert_eq!(s.tolerance, 1e-9);
    }
}
