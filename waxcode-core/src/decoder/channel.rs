// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `channel` module tracks one audio channel's side of the axis.
//!
//! A channel keeps a slowly adapting DC zero and detects crossings of it with hysteresis. The
//! legacy path feeds raw sample values; the MK2 path feeds the gain-compensated derivative.

/// Per-channel crossing state.
#[derive(Clone, Debug)]
pub(crate) struct Channel {
    /// Which side of the zero the signal is currently on.
    pub positive: bool,
    /// The tracked DC offset.
    pub zero: i32,
    /// Set for exactly one sample when a crossing occurred.
    pub swapped: bool,
    /// Samples since the last crossing.
    #[allow(dead_code)]
    pub crossing_ticker: u32,
}

impl Channel {
    pub fn new() -> Self {
        Channel { positive: false, zero: 0, swapped: false, crossing_ticker: 0 }
    }

    /// Updates the channel with one value, registering an axis crossing when the value moves
    /// beyond the tracked zero by more than `threshold`.
    pub fn detect_zero_crossing(&mut self, v: i32, alpha: f64, threshold: i32) {
        self.crossing_ticker = self.crossing_ticker.wrapping_add(1);

        self.swapped = false;
        if i64::from(v) > i64::from(self.zero) + i64::from(threshold) && !self.positive {
            self.swapped = true;
            self.positive = true;
            self.crossing_ticker = 0;
        }
        else if i64::from(v) < i64::from(self.zero) - i64::from(threshold) && self.positive {
            self.swapped = true;
            self.positive = false;
            self.crossing_ticker = 0;
        }

        self.zero = (f64::from(self.zero) + alpha * (f64::from(v) - f64::from(self.zero))) as i32;
    }
}
