// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `delay` module implements a fixed-length circular delay line with relative indexing.

use std::fmt;

/// The default number of samples a delay line holds.
pub const DEFAULT_LEN: usize = 256;

/// A fixed-length circular buffer of samples, indexed relative to the most recent push.
#[derive(Clone)]
pub struct DelayLine {
    samples: Box<[i32]>,
    /// Index of the most recently pushed sample.
    current: usize,
}

impl DelayLine {
    /// Creates a zero-filled delay line holding `len` samples.
    pub fn new(len: usize) -> Self {
        assert!(len > 0);
        DelayLine { samples: vec![0; len].into_boxed_slice(), current: len - 1 }
    }

    /// The number of samples the delay line holds.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Pushes a new sample, displacing the oldest.
    pub fn push(&mut self, sample: i32) {
        self.current = if self.current == 0 { self.samples.len() - 1 } else { self.current - 1 };
        self.samples[self.current] = sample;
    }

    /// Returns the sample `i` steps into the past, where 0 is the most recent push.
    pub fn at(&self, i: usize) -> i32 {
        debug_assert!(i < self.samples.len());
        let mut index = self.current + i;
        if index >= self.samples.len() {
            index -= self.samples.len();
        }
        self.samples[index]
    }

    /// Returns the integer mean of all samples in the line.
    pub fn avg(&self) -> i32 {
        let sum: i64 = self.samples.iter().map(|&s| i64::from(s)).sum();
        (sum / self.samples.len() as i64) as i32
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        DelayLine::new(DEFAULT_LEN)
    }
}

impl fmt::Debug for DelayLine {
    /// Formats the line in logical order, newest sample first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries((0..self.samples.len()).map(|i| self.at(i))).finish()
    }
}
