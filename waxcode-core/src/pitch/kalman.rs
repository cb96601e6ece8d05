// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::pitch::PitchEstimator;

/// Process and measurement noise for one Kalman sensitivity mode.
#[derive(Clone, Copy, Debug)]
pub struct KalmanCoeffs {
    /// Process noise spectral density.
    pub q: f64,
    /// Measurement noise variance.
    pub r: f64,
}

/// Tuning of the adaptive constant-velocity Kalman estimator.
///
/// The estimator switches between three noise presets on the magnitude of the innovation:
/// `stable` for steady playback, `medium` for slight pitch movement, and `reactive` for
/// scratching. The thresholds separating the modes are part of the tuning rather than being
/// baked in.
#[derive(Clone, Debug)]
pub struct KalmanTuning {
    pub stable: KalmanCoeffs,
    pub medium: KalmanCoeffs,
    pub reactive: KalmanCoeffs,
    /// Innovation magnitude above which the medium preset engages.
    pub medium_threshold: f64,
    /// Innovation magnitude above which the reactive preset engages.
    pub scratch_threshold: f64,
}

impl Default for KalmanTuning {
    fn default() -> Self {
        KalmanTuning {
            stable: KalmanCoeffs { q: 1e-4, r: 1e-6 },
            medium: KalmanCoeffs { q: 1e-3, r: 1e-6 },
            reactive: KalmanCoeffs { q: 1e-2, r: 1e-7 },
            medium_threshold: 1e-3,
            scratch_threshold: 5e-3,
        }
    }
}

/// The sensitivity mode an adaptive estimator is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KalmanMode {
    Stable,
    Medium,
    Reactive,
}

/// A constant-velocity Kalman filter over `(position, velocity)` with adaptive sensitivity.
///
/// State transition `F = [[1, dt], [0, 1]]`, process noise
/// `Q = q * [[dt^3/3, dt^2/2], [dt^2/2, dt]]`, measurement `H = [1, 0]` observing the position
/// delta. As with the alpha-beta tracker, the position state is kept relative to the last
/// observation. The covariance starts large so early observations dominate.
#[derive(Clone, Debug)]
pub struct Kalman {
    dt: f64,
    x: f64,
    v: f64,
    // Covariance P (2x2, symmetric).
    p00: f64,
    p01: f64,
    p11: f64,
    tuning: KalmanTuning,
    mode: KalmanMode,
}

impl Kalman {
    const INITIAL_COVARIANCE: f64 = 1e6;

    /// Prepares the filter for observations every `dt` seconds.
    pub fn new(dt: f64, tuning: KalmanTuning) -> Self {
        Kalman {
            dt,
            x: 0.0,
            v: 0.0,
            p00: Kalman::INITIAL_COVARIANCE,
            p01: 0.0,
            p11: Kalman::INITIAL_COVARIANCE,
            tuning,
            mode: KalmanMode::Stable,
        }
    }

    /// The sensitivity mode selected by the most recent observation.
    pub fn mode(&self) -> KalmanMode {
        self.mode
    }

    fn select_mode(&mut self, innovation: f64) -> KalmanCoeffs {
        let magnitude = innovation.abs();

        self.mode = if magnitude > self.tuning.scratch_threshold {
            KalmanMode::Reactive
        } else if magnitude > self.tuning.medium_threshold {
            KalmanMode::Medium
        } else {
            KalmanMode::Stable
        };

        match self.mode {
            KalmanMode::Stable => self.tuning.stable,
            KalmanMode::Medium => self.tuning.medium,
            KalmanMode::Reactive => self.tuning.reactive,
        }
    }
}

impl PitchEstimator for Kalman {
    fn observe(&mut self, dx: f64) {
        let dt = self.dt;

        // Predict.
        let x_pred = self.x + self.v * dt;
        let v_pred = self.v;

        // The innovation picks the sensitivity mode for this update.
        let y = dx - x_pred;
        let coeffs = self.select_mode(y);

        let q00 = coeffs.q * (dt * dt * dt / 3.0);
        let q01 = coeffs.q * (dt * dt / 2.0);
        let q11 = coeffs.q * dt;

        let p00 = self.p00 + dt * (self.p01 + self.p01) + dt * dt * self.p11 + q00;
        let p01 = self.p01 + dt * self.p11 + q01;
        let p11 = self.p11 + q11;

        // Update: S = P00 + r, K = [P00/S, P01/S].
        let s = p00 + coeffs.r;
        let k0 = p00 / s;
        let k1 = p01 / s;

        self.x = x_pred + k0 * y;
        self.v = v_pred + k1 * y;

        self.p00 = (1.0 - k0) * p00;
        self.p01 = (1.0 - k0) * p01;
        self.p11 = p11 - k1 * p01;

        // Relative to the previous observation.
        self.x -= dx;
    }

    fn current(&self) -> f64 {
        self.v
    }
}

/// A constant-acceleration Kalman filter on the playback rate.
///
/// State `[f, fdot]` where `f` is the rate and `fdot` its drift. Each observation is converted
/// to an instantaneous rate `dx / dt` and filtered directly, which suits hosts that pre-average
/// the crossing stream.
#[derive(Clone, Debug)]
pub struct FreqKalman {
    dt: f64,
    f: f64,
    fdot: f64,
    p00: f64,
    p01: f64,
    p11: f64,
    q: f64,
    r: f64,
}

impl FreqKalman {
    const INITIAL_COVARIANCE: f64 = 1e6;

    pub fn new(dt: f64, f0: f64) -> Self {
        FreqKalman {
            dt,
            f: f0,
            fdot: 0.0,
            // Large initial uncertainty so early measurements dominate.
            p00: FreqKalman::INITIAL_COVARIANCE,
            p01: 0.0,
            p11: FreqKalman::INITIAL_COVARIANCE,
            q: 1.0,
            r: 1e-2,
        }
    }

    /// Retunes the process noise without resetting state.
    pub fn set_q(&mut self, q: f64) {
        self.q = q;
    }

    /// Retunes the measurement variance without resetting state.
    pub fn set_r(&mut self, r: f64) {
        self.r = r;
    }

    /// One update with an instantaneous rate measurement.
    pub fn update(&mut self, z: f64) -> f64 {
        let dt = self.dt;

        let f_pred = self.f + dt * self.fdot;
        let fdot_pred = self.fdot;

        let q00 = self.q * (dt * dt * dt / 3.0);
        let q01 = self.q * (dt * dt / 2.0);
        let q11 = self.q * dt;

        let p00 = self.p00 + dt * (self.p01 + self.p01) + dt * dt * self.p11 + q00;
        let p01 = self.p01 + dt * self.p11 + q01;
        let p11 = self.p11 + q11;

        let y = z - f_pred;
        let s = p00 + self.r;
        let k0 = p00 / s;
        let k1 = p01 / s;

        self.f = f_pred + k0 * y;
        self.fdot = fdot_pred + k1 * y;

        self.p00 = (1.0 - k0) * p00;
        self.p01 = (1.0 - k0) * p01;
        self.p11 = p11 - k1 * p01;

        self.f
    }
}

impl PitchEstimator for FreqKalman {
    fn observe(&mut self, dx: f64) {
        self.update(dx / self.dt);
    }

    fn current(&self) -> f64 {
        self.f
    }
}
