// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `pitch` module estimates playback velocity from discrete position observations.
//!
//! The decoder reports, every sample period, how far the record advanced: zero for most samples
//! and a quarter wave-cycle when an axis crossing registered. A pitch estimator smooths that
//! impulsive stream into a stable velocity where 1.0 is nominal forward playback.
//!
//! Estimators are interchangeable behind [`PitchEstimator`] and selected once at decoder
//! construction with [`PitchKind`].

mod alpha_beta;
mod kalman;

pub use alpha_beta::AlphaBeta;
pub use kalman::{FreqKalman, Kalman, KalmanCoeffs, KalmanMode, KalmanTuning};

/// A smoothed velocity estimate over discrete position observations.
pub trait PitchEstimator: Send {
    /// Inputs an observation: in the last observation period the position has moved by `dx`.
    fn observe(&mut self, dx: f64);

    /// The current velocity estimate.
    fn current(&self) -> f64;
}

/// Selects the pitch estimator a decoder uses.
#[derive(Clone, Debug, Default)]
pub enum PitchKind {
    /// The fixed-gain alpha-beta tracker.
    #[default]
    AlphaBeta,
    /// The constant-velocity Kalman filter with adaptive sensitivity.
    Kalman(KalmanTuning),
    /// The constant-acceleration Kalman filter on the playback rate.
    FreqKalman,
}

impl PitchKind {
    /// Instantiates the estimator for observations every `dt` seconds.
    pub fn make(&self, dt: f64) -> Box<dyn PitchEstimator> {
        match self {
            PitchKind::AlphaBeta => Box::new(AlphaBeta::new(dt)),
            PitchKind::Kalman(tuning) => Box::new(Kalman::new(dt, tuning.clone())),
            PitchKind::FreqKalman => Box::new(FreqKalman::new(dt, 0.0)),
        }
    }
}
