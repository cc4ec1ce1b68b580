// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for simulation parameters and initial states.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

use crate::error::{Result, ValidationError};
use crate::linalg::{hermiticity_deviation, ket_norm, trace};

/// Tolerance on ‖ψ‖ and Tr ρ for initial states.
pub const STATE_TOLERANCE: f64 = 1e-9;

/// A subsystem dimension must be at least 1.
pub fn validate_levels(field: &str, levels: usize) -> Result<()> {
    if levels == 0 {
        return Err(ValidationError::Field {
            field: field.into(),
            message: "must be at least 1".into(),
        }
        .into());
    }
    Ok(())
}

/// A coupling or detuning must be a finite number (any sign).
pub fn validate_finite(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("must be finite, got {}", value),
        }
        .into());
    }
    Ok(())
}

/// A decay rate must be finite and non-negative.
pub fn validate_rate(field: &str, rate: f64) -> Result<()> {
    validate_finite(field, rate)?;
    if rate < 0.0 {
        return Err(ValidationError::PhysicsConstraint(format!(
            "{} is a decay rate and cannot be negative (got {})",
            field, rate
        ))
        .into());
    }
    Ok(())
}

/// A sample count or iteration budget must be positive.
pub fn validate_count(field: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(ValidationError::Field {
            field: field.into(),
            message: "must be greater than 0".into(),
        }
        .into());
    }
    Ok(())
}

/// Bounds of an evenly spaced output grid.
pub fn validate_time_grid(start: f64, end: f64, points: usize) -> Result<()> {
    validate_finite("time_grid.start", start)?;
    validate_finite("time_grid.end", end)?;
    validate_count("time_grid.points", points)?;
    if points > 1 && end <= start {
        return Err(ValidationError::Field {
            field: "time_grid.end".into(),
            message: format!("must exceed start ({}), got {}", start, end),
        }
        .into());
    }
    Ok(())
}

/// A basis index must address an existing level.
pub fn validate_level_index(field: &str, index: usize, levels: usize) -> Result<()> {
    if index >= levels {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("level {} out of range for {} levels", index, levels),
        }
        .into());
    }
    Ok(())
}

/// Initial ket: finite amplitudes and unit norm.
pub fn validate_ket(psi: &Array1<Complex64>) -> Result<()> {
    if psi.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(
            ValidationError::PhysicsConstraint("initial ket contains NaN or Inf".into()).into(),
        );
    }
    let norm = ket_norm(psi);
    if (norm - 1.0).abs() > STATE_TOLERANCE {
        return Err(ValidationError::PhysicsConstraint(format!(
            "initial ket must be normalized, got norm {}",
            norm
        ))
        .into());
    }
    Ok(())
}

/// Initial density matrix: Hermitian with unit trace.
pub fn validate_density_matrix(rho: &Array2<Complex64>) -> Result<()> {
    if rho.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(
            ValidationError::PhysicsConstraint("density matrix contains NaN or Inf".into()).into(),
        );
    }
    let tr = trace(rho);
    if (tr.re - 1.0).abs() > STATE_TOLERANCE || tr.im.abs() > STATE_TOLERANCE {
        return Err(ValidationError::PhysicsConstraint(format!(
            "density matrix must have unit trace, got {}",
            tr
        ))
        .into());
    }
    let deviation = hermiticity_deviation(rho);
    if deviation > STATE_TOLERANCE {
        return Err(ValidationError::PhysicsConstraint(format!(
            "density matrix is not Hermitian (deviation {:.3e})",
            deviation
        ))
        .into());
    }
    Ok(())
}
