// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output time grid shared by both solvers.

use crate::error::{Result, ValidationError};

/// Strictly increasing sample times at which states and observables are
/// reported. Integration substeps between grid points are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// `count` evenly spaced points over `[start, end]`, endpoints included.
    pub fn linspace(start: f64, end: f64, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(ValidationError::field("time_grid.points", "must be >= 1").into());
        }
        if count == 1 {
            return Self::from_times(vec![start]);
        }
        let step = (end - start) / (count - 1) as f64;
        let times = (0..count)
            .map(|k| {
                if k == count - 1 {
                    end
                } else {
                    start + step * k as f64
                }
            })
            .collect();
        Self::from_times(times)
    }

    /// Grid from explicit sample times.
    pub fn from_times(times: Vec<f64>) -> Result<Self> {
        if times.is_empty() {
            return Err(
                ValidationError::field("time_grid", "must contain at least one time").into(),
            );
        }
        if let Some(k) = times.iter().position(|t| !t.is_finite()) {
            return Err(ValidationError::field(
                "time_grid",
                format!("non-finite time at index {}", k),
            )
            .into());
        }
        if let Some(k) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ValidationError::field(
                "time_grid",
                format!(
                    "times must be strictly increasing (t[{}]={} >= t[{}]={})",
                    k,
                    times[k],
                    k + 1,
                    times[k + 1]
                ),
            )
            .into());
        }
        Ok(Self { times })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.times[0]
    }

    pub fn end(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Consecutive `(t_k, t_{k+1})` pairs.
    pub fn intervals(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.windows(2).map(|w| (w[0], w[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let grid = TimeGrid::linspace(0.0, 20.0, 1000).unwrap();
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid.start(), 0.0);
        assert_eq!(grid.end(), 20.0);
        assert_relative_eq!(grid.times()[1], 20.0 / 999.0, epsilon = 1e-15);
        assert_eq!(grid.intervals().count(), 999);
    }

    #[test]
    fn test_single_point_grid() {
        let grid = TimeGrid::linspace(2.0, 5.0, 1).unwrap();
        assert_eq!(grid.times(), &[2.0]);
        assert_eq!(grid.intervals().count(), 0);
    }

    #[test]
    fn test_empty_grid_rejected() {
        assert!(TimeGrid::linspace(0.0, 1.0, 0).is_err());
        assert!(TimeGrid::from_times(vec![]).is_err());
    }

    #[test]
    fn test_non_increasing_rejected() {
        assert!(TimeGrid::from_times(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::linspace(1.0, 0.0, 5).is_err());
        assert!(TimeGrid::from_times(vec![0.0, f64::NAN]).is_err());
    }
}
