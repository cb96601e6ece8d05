// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dsp` module provides the signal-processing primitives of the decoding pipeline: a fixed
//! delay line, incremental scalar filters, and general coefficient-array filters.
//!
//! Everything here is one-sample-in, one-sample-out and allocation-free after construction, so
//! that the decoder's per-sample path never touches the heap.

pub mod delay;
pub mod filters;
pub mod iir;
