// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # Project Waxcode
//!
//! Waxcode is a 100% pure Rust digital vinyl (DVS) timecode decoder. It consumes the stereo PCM
//! signal of a turntable playing a control record and reports, in real time, the absolute
//! position on the record and the instantaneous pitch, letting a host application drive audio
//! file playback as if the vinyl itself were the medium.
//!
//! # Supported timecodes
//!
//! | Code             | Pressing                                    |
//! |------------------|---------------------------------------------|
//! | `serato_2a`      | Serato 2nd Ed., side A                      |
//! | `serato_2b`      | Serato 2nd Ed., side B                      |
//! | `serato_cd`      | Serato CD                                   |
//! | `traktor_a`      | Traktor Scratch, side A                     |
//! | `traktor_b`      | Traktor Scratch, side B                     |
//! | `traktor_mk2_a`  | Traktor Scratch MK2, side A                 |
//! | `traktor_mk2_b`  | Traktor Scratch MK2, side B                 |
//! | `traktor_mk2_cd` | Traktor Scratch MK2, CD                     |
//! | `mixvibes_v2`    | MixVibes V2                                 |
//! | `mixvibes_7inch` | MixVibes 7"                                 |
//! | `pioneer_a`      | Pioneer RekordBox DVS Control Vinyl, side A |
//! | `pioneer_b`      | Pioneer RekordBox DVS Control Vinyl, side B |
//!
//! # Usage
//!
//! The following steps describe a basic usage of Waxcode:
//!
//! 1. Obtain a [`TimecodeRegistry`], either by constructing one with [`RegistryOptions`] or by
//!    using the process-wide [`default::registry`]. The registry builds each code's lookup
//!    table at most once and shares it between decoders; the Traktor MK2 tables are persisted
//!    to disk after the first build because they take a while to walk.
//! 2. Call [`TimecodeRegistry::find`] with a code name from the table above to get the
//!    decodable [`Timecode`].
//! 3. Construct a [`Timecoder`] with the code, the pressing's nominal speed, the capture sample
//!    rate, and [`DecoderOptions`] describing the input stage.
//! 4. Feed blocks of interleaved 16-bit stereo PCM to [`Timecoder::submit`] from the audio
//!    thread.
//! 5. Poll [`Timecoder::position`] and [`Timecoder::pitch`] to drive playback. A position of
//!    `None` means the decoder has not (re-)locked yet; pitch is always available.
//!
//! ```no_run
//! use waxcode::{default, DecoderOptions, Timecoder};
//!
//! let code = default::registry().find("serato_2a").unwrap();
//! let mut tc = Timecoder::new(code, 1.0, 44100, &DecoderOptions::default());
//!
//! let pcm: Vec<i16> = vec![0; 8192];
//! tc.submit(&pcm);
//!
//! if let Some(pos) = tc.position() {
//!     println!("{} ms at pitch {:+.3}", pos.millis, tc.pitch());
//! }
//! ```

pub use waxcode_core as core;

pub use waxcode_core::decoder::{DecoderOptions, Monitor, Position, Timecoder};
pub use waxcode_core::errors::{Error, Result};
pub use waxcode_core::pitch::{KalmanTuning, PitchKind};
pub use waxcode_core::timecode::{
    CodeFlags, RegistryOptions, Timecode, TimecodeDef, TimecodeRegistry,
};

pub mod default {
    //! A process-wide registry with default options, for applications that do not need to
    //! control lookup-table persistence themselves.

    use once_cell::sync::Lazy;

    use waxcode_core::timecode::{RegistryOptions, TimecodeRegistry};

    static REGISTRY: Lazy<TimecodeRegistry> =
        Lazy::new(|| TimecodeRegistry::new(RegistryOptions::default()));

    /// The default registry, initialized on first use.
    pub fn registry() -> &'static TimecodeRegistry {
        &REGISTRY
    }
}
