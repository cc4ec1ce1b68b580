// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Measurement-based feedback controller.
//!
//! Each call to [`FeedbackController::sample`] models one measurement of the
//! cavity quadrature and returns a standard-normal outcome. The controller
//! holds nothing except its random stream, so two controllers built from the
//! same seed replay the same measurement record.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Source of scalar measurement outcomes x ~ N(0, 1).
#[derive(Debug, Clone)]
pub struct FeedbackController {
    rng: StdRng,
}

impl FeedbackController {
    /// Controller with its own stream seeded from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one measurement outcome.
    pub fn sample(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}
