// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `decoder` module turns stereo PCM from a control record into position and pitch.
//!
//! A [`Timecoder`] runs a bounded amount of work per sample and never blocks: one thread feeds
//! [`Timecoder::submit`] while readers poll [`Timecoder::position`] and [`Timecoder::pitch`].
//! The lookup table it borrows from its [`Timecode`] is immutable, so decoders of the same code
//! share one table.

mod channel;
mod mk2;
mod monitor;

pub use monitor::Monitor;

use std::f64::consts::PI;
use std::sync::Arc;

use log::trace;

use crate::decoder::channel::Channel;
use crate::decoder::mk2::Mk2State;
use crate::pitch::{PitchEstimator, PitchKind};
use crate::timecode::def::{CodeFlags, CodeKeys};
use crate::timecode::lfsr;
use crate::timecode::registry::TimecodeRegistry;
use crate::timecode::{CodeTable, Timecode};

/// Zero-crossing hysteresis for line-level input.
const ZERO_THRESHOLD: i32 = 128 << 16;

/// Time constant for the zero/rumble filter, in seconds.
const ZERO_RC: f64 = 0.001;

/// Reference-level averaging period, in wave cycles.
const REF_PEAKS_AVG: i32 = 48;

/// The number of correct bits which come in before the timecode is declared valid. Set this too
/// low, and risk the record skipping around (often to blank areas of track) during scratching.
const VALID_BITS: u32 = 24;

/// Limit on the derivative gain compensation; without it the pitch becomes too sensitive.
const GAIN_LIMIT: f64 = 30.0;

/// Interleaved channels per PCM frame.
const CHANNELS: usize = 2;

/// Options for constructing a [`Timecoder`].
#[derive(Clone, Debug, Default)]
pub struct DecoderOptions {
    /// The input is an unamplified phono signal; lowers the crossing hysteresis accordingly.
    pub phono: bool,
    /// The pitch estimator to run.
    pub pitch: PitchKind,
}

/// A decoded absolute position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    /// Position on the record, in milliseconds at the reference speed.
    pub millis: u32,
    /// Seconds elapsed since the last decoded bit.
    pub elapsed: f64,
}

/// Legacy bitstream state: the observed window and the expected LFSR state.
#[derive(Clone, Debug, Default)]
struct LegacyState {
    timecode: u32,
    bitstream: u32,
}

/// The per-family decoding core, selected once when a code is assigned.
enum Core {
    Legacy(LegacyState),
    Mk2(Box<Mk2State>),
}

impl Core {
    fn for_code(code: &Timecode) -> Core {
        if code.def().is_mk2() {
            Core::Mk2(Box::new(Mk2State::new()))
        }
        else {
            Core::Legacy(LegacyState::default())
        }
    }
}

/// The timecode decoder: per-sample filtering, crossing detection, direction and pitch
/// tracking, and bitstream reconstruction against one timecode.
pub struct Timecoder {
    code: Arc<Timecode>,
    speed: f64,
    dt: f64,
    sample_rate: u32,
    zero_alpha: f64,
    threshold: i32,
    forwards: bool,
    primary: Channel,
    secondary: Channel,
    pitch: Box<dyn PitchEstimator>,
    ref_level: i32,
    valid_counter: u32,
    timecode_ticker: u32,
    gain_compensation: f64,
    db: f64,
    core: Core,
    monitor: Option<Monitor>,
}

impl Timecoder {
    /// Creates a decoder for the given code at the given reference speed.
    ///
    /// `speed` is the nominal playback rate of the pressing (1.0 for 33 RPM records, 45/33 for
    /// 45 RPM) and scales the reported position.
    pub fn new(code: Arc<Timecode>, speed: f64, sample_rate: u32, opts: &DecoderOptions) -> Self {
        let dt = 1.0 / f64::from(sample_rate);

        let mut threshold = ZERO_THRESHOLD;
        if opts.phono {
            // Approx -30 dB for unamplified phono input.
            threshold >>= 5;
        }

        let core = Core::for_code(&code);
        let gain_compensation = initial_gain(&code, sample_rate);

        Timecoder {
            speed,
            dt,
            sample_rate,
            zero_alpha: dt / (ZERO_RC + dt),
            threshold,
            forwards: true,
            primary: Channel::new(),
            secondary: Channel::new(),
            pitch: opts.pitch.make(dt),
            ref_level: i32::MAX,
            valid_counter: 0,
            timecode_ticker: 0,
            gain_compensation,
            db: f64::NEG_INFINITY,
            core,
            monitor: None,
            code,
        }
    }

    /// The code the decoder is currently tracking.
    pub fn code(&self) -> &Arc<Timecode> {
        &self.code
    }

    /// Switches to another code mid-stream. Decoding state for the new code starts fresh; the
    /// position becomes unknown until the bitstream re-locks.
    pub fn set_code(&mut self, code: Arc<Timecode>) {
        self.core = Core::for_code(&code);
        self.gain_compensation = initial_gain(&code, self.sample_rate);
        self.valid_counter = 0;
        self.timecode_ticker = 0;
        self.code = code;
    }

    /// Changes to the next code in the registry whose lookup table is already built.
    pub fn cycle_definition(&mut self, registry: &TimecodeRegistry) {
        if let Some(next) = registry.next_ready(self.code.def().name) {
            self.set_code(next);
        }
    }

    /// Submits a block of interleaved 16-bit stereo PCM (left, right, left, right, ...).
    pub fn submit(&mut self, pcm: &[i16]) {
        let swap = self.code.def().flags.contains(CodeFlags::PRIMARY);

        for frame in pcm.chunks_exact(CHANNELS) {
            let left = i32::from(frame[0]) << 16;
            let right = i32::from(frame[1]) << 16;

            let (primary, secondary) = if swap { (left, right) } else { (right, left) };

            if let Core::Mk2(st) = &mut self.core {
                st.primary.delay.push(primary);
                st.secondary.delay.push(secondary);
            }

            self.process_sample(primary, secondary);

            if let Some(mon) = &mut self.monitor {
                match &self.core {
                    // Display the derivative for MK2.
                    Core::Mk2(st) => mon.update(
                        st.primary.deriv_scaled.wrapping_shl(1),
                        st.secondary.deriv_scaled.wrapping_shl(1),
                        self.ref_level,
                    ),
                    Core::Legacy(_) => mon.update(left, right, self.ref_level),
                }
            }
        }
    }

    /// Processes a single sample pair. The two input signals are in the full range of `i32`.
    fn process_sample(&mut self, primary: i32, secondary: i32) {
        match &mut self.core {
            Core::Legacy(_) => {
                self.primary.detect_zero_crossing(primary, self.zero_alpha, self.threshold);
                self.secondary.detect_zero_crossing(secondary, self.zero_alpha, self.threshold);
            }
            Core::Mk2(st) => {
                let pd = st.primary.condition(primary);
                let sd = st.secondary.condition(secondary);

                // Scale the derivative back up to the original signal level.
                let mut gain =
                    f64::from(st.secondary.rms_value) / f64::from(st.secondary.rms_deriv_value);
                if gain > GAIN_LIMIT {
                    gain = GAIN_LIMIT;
                }
                self.gain_compensation = gain;

                self.db = 20.0 * (f64::from(st.secondary.rms_value) / f64::from(i32::MAX)).log10();

                st.primary.deriv_scaled = (f64::from(pd) * gain) as i32;
                st.secondary.deriv_scaled = (f64::from(sd) * gain) as i32;

                self.primary.detect_zero_crossing(
                    st.primary.deriv_scaled,
                    self.zero_alpha,
                    self.threshold,
                );
                self.secondary.detect_zero_crossing(
                    st.secondary.deriv_scaled,
                    self.zero_alpha,
                    self.threshold,
                );
            }
        }

        // If an axis has been crossed, use the direction of the crossing to work out the
        // direction of the vinyl.
        if self.primary.swapped || self.secondary.swapped {
            let mut forwards = if self.primary.swapped {
                self.primary.positive != self.secondary.positive
            }
            else {
                self.primary.positive == self.secondary.positive
            };

            if self.code.def().flags.contains(CodeFlags::PHASE) {
                forwards = !forwards;
            }

            if forwards != self.forwards {
                // Direction has changed.
                self.forwards = forwards;
                self.valid_counter = 0;
            }
        }

        // Register movement using the pitch counters; a crossing advances the position by a
        // quarter of a wave cycle.
        if !self.primary.swapped && !self.secondary.swapped {
            self.pitch.observe(0.0);
        }
        else {
            let mut dx = 1.0 / f64::from(self.code.def().resolution) / 4.0;
            if !self.forwards {
                dx = -dx;
            }
            self.pitch.observe(dx);
        }

        // A crossing of the secondary channel in the right polarity reads off a bit.
        match &mut self.core {
            Core::Legacy(st) => {
                if self.secondary.swapped
                    && self.primary.positive
                        == !self.code.def().flags.contains(CodeFlags::POLARITY)
                {
                    // Scale to avoid clipping.
                    let m = (primary / 2 - self.primary.zero / 2).abs();

                    let CodeKeys::Legacy { taps, .. } = self.code.def().keys else {
                        unreachable!()
                    };
                    let bits = self.code.def().bits;

                    let b = u32::from(m > self.ref_level);

                    // Fold the bit into the bitstream and work out what we were expecting. The
                    // bitstream is always in the order it is physically placed on the vinyl,
                    // regardless of the direction.
                    if self.forwards {
                        st.timecode = lfsr::fwd(st.timecode, taps, bits);
                        st.bitstream = (st.bitstream >> 1) + (b << (bits - 1));
                    }
                    else {
                        let mask = (1u32 << bits) - 1;
                        st.timecode = lfsr::rev(st.timecode, taps, bits);
                        st.bitstream = ((st.bitstream << 1) & mask) + b;
                    }

                    if st.timecode == st.bitstream {
                        self.valid_counter = self.valid_counter.saturating_add(1);
                    }
                    else {
                        st.timecode = st.bitstream;
                        self.valid_counter = 0;
                    }

                    // Note the last time we read a bit, and adjust the reference level from the
                    // new peak.
                    self.timecode_ticker = 0;
                    self.ref_level -= self.ref_level / REF_PEAKS_AVG;
                    self.ref_level += m / REF_PEAKS_AVG;

                    trace!(
                        "{:+} zero, {:+} (ref {:+}) = {}{} ({})",
                        self.primary.zero,
                        m,
                        self.ref_level,
                        b,
                        if self.valid_counter == 0 { 'x' } else { ' ' },
                        self.valid_counter
                    );
                }
            }
            Core::Mk2(st) => {
                if self.secondary.swapped {
                    let reading = st.reading();

                    let CodeKeys::Mk2 { taps, .. } = self.code.def().keys else { unreachable!() };
                    let bits = self.code.def().bits;

                    let matched = st.process_bitstream(
                        reading,
                        taps,
                        bits,
                        self.forwards,
                        self.secondary.positive,
                    );

                    if matched {
                        self.valid_counter = self.valid_counter.saturating_add(1);
                    }
                    else {
                        self.valid_counter = 0;
                    }

                    self.timecode_ticker = 0;
                    self.ref_level -= self.ref_level / REF_PEAKS_AVG;
                    self.ref_level += ((f64::from(st.secondary.rms_deriv_value)
                        * self.gain_compensation)
                        .abs() as i32)
                        / REF_PEAKS_AVG;

                    trace!(
                        "upper {} lower {} forwards {}",
                        st.upper.valid_counter,
                        st.lower.valid_counter,
                        self.forwards
                    );
                }
            }
        }

        self.timecode_ticker = self.timecode_ticker.wrapping_add(1);
    }

    /// The last-known position of the timecode.
    ///
    /// `None` until enough bits have been error-checked, and whenever the bitstream is not
    /// found in the lookup table. The position comes with the time elapsed since its stamp, so
    /// a host can extrapolate across quiet stretches.
    pub fn position(&self) -> Option<Position> {
        if self.valid_counter <= VALID_BITS {
            return None;
        }

        let slot = match (&self.core, self.code.table()) {
            (Core::Legacy(st), CodeTable::Legacy(lut)) => lut.lookup(st.bitstream)?,
            (Core::Mk2(st), CodeTable::Mk2(lut)) => lut.lookup(st.bitstream)?,
            _ => return None,
        };

        // Normalize the position to milliseconds, not timecode steps.
        let millis = (f64::from(slot)
            * (1000.0 / (f64::from(self.code.def().resolution) * self.speed)))
            as u32;

        Some(Position { millis, elapsed: f64::from(self.timecode_ticker) * self.dt })
    }

    /// The current pitch, where 1.0 is nominal forward playback.
    pub fn pitch(&self) -> f64 {
        self.pitch.current()
    }

    /// Signal level of the carrier relative to full scale, in dB. Tracked by the MK2 path only.
    pub fn db(&self) -> f64 {
        self.db
    }

    /// Whether the record is moving forwards.
    pub fn forwards(&self) -> bool {
        self.forwards
    }

    /// The current run of bits that matched the expected timecode.
    pub fn valid_counter(&self) -> u32 {
        self.valid_counter
    }

    /// The validity counters of the (upper, lower) MK2 subcodes, for diagnostics. `None` for
    /// legacy codes.
    pub fn mk2_confidence(&self) -> Option<(u32, u32)> {
        match &self.core {
            Core::Mk2(st) => Some((st.upper.valid_counter, st.lower.valid_counter)),
            Core::Legacy(_) => None,
        }
    }

    /// Attaches an x/y monitor raster of `size * size` pixels.
    pub fn monitor_init(&mut self, size: usize) {
        assert!(self.monitor.is_none());
        self.monitor = Some(Monitor::new(size));
    }

    /// Detaches and releases the monitor raster.
    pub fn monitor_clear(&mut self) {
        assert!(self.monitor.is_some());
        self.monitor = None;
    }

    /// The attached monitor raster, if any.
    pub fn monitor(&self) -> Option<&Monitor> {
        self.monitor.as_ref()
    }
}

fn initial_gain(code: &Timecode, sample_rate: u32) -> f64 {
    // The factor scaling the derivative back to the original level, before the RMS trackers
    // have settled.
    1.0 / (PI * f64::from(code.def().resolution) / f64::from(sample_rate))
}
