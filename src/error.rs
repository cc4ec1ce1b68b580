// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the cooling simulator.

use std::fmt;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Simulator error types.
#[derive(Debug)]
pub enum Error {
    /// Invalid or mismatched Hilbert-space dimensions
    Dimension(String),
    /// Numerical breakdown while evolving a state
    Integration(IntegrationError),
    /// Non-physical or malformed configuration
    Configuration(ValidationError),
    /// Ensemble run stopped by a cancellation request
    Cancelled,
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dimension(msg) => write!(f, "Dimension error: {}", msg),
            Error::Integration(e) => write!(f, "Integration error: {}", e),
            Error::Configuration(e) => write!(f, "Configuration error: {}", e),
            Error::Cancelled => write!(f, "Run cancelled"),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Integration(e) => Some(e),
            Error::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<IntegrationError> for Error {
    fn from(e: IntegrationError) -> Self {
        Error::Integration(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Numerical failures raised by the trajectory and master-equation integrators.
#[derive(Debug, Clone)]
pub enum IntegrationError {
    /// Ket norm fell to (numerically) zero before renormalization
    NormCollapse { time: f64, norm: f64 },
    /// A step produced NaN or infinite amplitudes
    NonFinite { time: f64 },
    /// The propagator for a step could not be formed
    SingularPropagator { time: f64 },
    /// Every attempt of a trajectory failed
    RetriesExhausted {
        trajectory: usize,
        attempts: usize,
        last: Box<IntegrationError>,
    },
}

impl IntegrationError {
    /// True for the per-step failures that a fresh random stream may avoid.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, IntegrationError::RetriesExhausted { .. })
    }
}

impl fmt::Display for IntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationError::NormCollapse { time, norm } => {
                write!(f, "State norm collapsed to {:.3e} at t={}", norm, time)
            }
            IntegrationError::NonFinite { time } => {
                write!(f, "Non-finite amplitudes at t={}", time)
            }
            IntegrationError::SingularPropagator { time } => {
                write!(f, "Singular Padé denominator building propagator at t={}", time)
            }
            IntegrationError::RetriesExhausted {
                trajectory,
                attempts,
                last,
            } => {
                write!(
                    f,
                    "Trajectory {} failed after {} attempts: {}",
                    trajectory, attempts, last
                )
            }
        }
    }
}

impl std::error::Error for IntegrationError {}

/// Validation errors.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Physics constraint violated
    PhysicsConstraint(String),
}

impl ValidationError {
    pub(crate) fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::PhysicsConstraint(msg) => {
                write!(f, "Physics constraint violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn test_error_display_dimension() {
        let e = Error::Dimension("cavity levels must be >= 1".into());
        assert_eq!(e.to_string(), "Dimension error: cavity levels must be >= 1");
    }

    #[test]
    fn test_error_display_integration() {
        let e = Error::Integration(IntegrationError::NonFinite { time: 1.5 });
        assert_eq!(
            e.to_string(),
            "Integration error: Non-finite amplitudes at t=1.5"
        );
    }

    #[test]
    fn test_error_display_configuration() {
        let e = Error::Configuration(ValidationError::field("kappa", "must be >= 0"));
        assert_eq!(
            e.to_string(),
            "Configuration error: Field 'kappa': must be >= 0"
        );
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(Error::Cancelled.to_string(), "Run cancelled");
    }

    #[test]
    fn test_retries_exhausted_display_nests_cause() {
        let e = IntegrationError::RetriesExhausted {
            trajectory: 7,
            attempts: 3,
            last: Box::new(IntegrationError::NonFinite { time: 2.0 }),
        };
        assert_eq!(
            e.to_string(),
            "Trajectory 7 failed after 3 attempts: Non-finite amplitudes at t=2"
        );
    }

    #[test]
    fn test_physics_constraint_display() {
        let e = ValidationError::PhysicsConstraint("negative rate".into());
        assert_eq!(e.to_string(), "Physics constraint violated: negative rate");
    }

    // =========================================================================
    // source() and From impls
    // =========================================================================

    #[test]
    fn test_error_source() {
        assert!(Error::Io(std::io::Error::other("disk")).source().is_some());
        assert!(Error::Integration(IntegrationError::NonFinite { time: 0.0 })
            .source()
            .is_some());
        assert!(Error::Dimension("x".into()).source().is_none());
        assert!(Error::Cancelled.source().is_none());
    }

    #[test]
    fn test_from_integration_error() {
        let e: Error = IntegrationError::NormCollapse {
            time: 0.1,
            norm: 0.0,
        }
        .into();
        assert!(matches!(
            e,
            Error::Integration(IntegrationError::NormCollapse { .. })
        ));
    }

    #[test]
    fn test_from_validation_error() {
        let e: Error = ValidationError::PhysicsConstraint("x".into()).into();
        assert!(matches!(e, Error::Configuration(_)));
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("{{{{").unwrap_err();
        let e: Error = yaml_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }

    #[test]
    fn test_retryable() {
        assert!(IntegrationError::NonFinite { time: 0.0 }.is_retryable());
        assert!(!IntegrationError::RetriesExhausted {
            trajectory: 0,
            attempts: 1,
            last: Box::new(IntegrationError::NonFinite { time: 0.0 }),
        }
        .is_retryable());
    }
}
