// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mk2` module decodes the Traktor Scratch MK2 family.
//!
//! MK2 records encode bits as phase/offset jumps on the carrier rather than as amplitude, so
//! the pipeline first extracts a feature signal per channel (EMA, derivative, RMS, gain
//! compensation) and runs the crossing detector on the scaled derivative. The bitstream is
//! reconstructed in two parallel subcodes routed by the secondary channel's polarity; the
//! decoder publishes whichever subcode has the longer agreement run.

use crate::dsp::delay::DelayLine;
use crate::dsp::filters::{Differentiator, Ema, EmaF, Rms};
use crate::timecode::lfsr;
use crate::util::wide::Wide;

/// Smoothing factor of the pre-derivative EMA.
const ALPHA_EMA: f64 = 3e-1;

/// Smoothing factor of the subcode reading and slope averages.
const ALPHA_AVG: f64 = 0.01;

/// Slope thresholds are the secondary RMS divided by these, per direction.
const FORWARD_FACTOR: f64 = 1.5;
const REVERSE_FACTOR: f64 = 1.75;

/// How many samples old the bit-extraction reading is, aligning it with the group delay of the
/// derivative and RMS chain.
const READING_DELAY: usize = 3;

/// Per-channel feature extraction for the MK2 path.
#[derive(Clone, Debug)]
pub(crate) struct Mk2Channel {
    ema: Ema,
    deriv: Differentiator,
    rms: Rms,
    rms_deriv: Rms,
    /// The raw derivative of the smoothed signal.
    pub deriv_value: i32,
    /// Smoothed RMS of the raw signal.
    pub rms_value: i32,
    /// Smoothed RMS of the derivative.
    pub rms_deriv_value: i32,
    /// The gain-compensated derivative fed to the crossing detector.
    pub deriv_scaled: i32,
    /// Recent raw samples, for the delayed bit-extraction reading.
    pub delay: DelayLine,
}

impl Mk2Channel {
    pub fn new() -> Self {
        Mk2Channel {
            ema: Ema::new(ALPHA_EMA),
            deriv: Differentiator::new(),
            rms: Rms::with_initial(Rms::DEFAULT_ALPHA, (i32::MAX / 2) as u64),
            rms_deriv: Rms::new(),
            deriv_value: 0,
            rms_value: i32::MAX / 2,
            rms_deriv_value: 0,
            deriv_scaled: i32::MAX / 2,
            delay: DelayLine::default(),
        }
    }

    /// Runs the feature chain over one raw sample: EMA, discrete derivative, and the RMS
    /// trackers of both. Scaling the derivative is left to the caller, as the gain is common
    /// to both channels.
    pub fn condition(&mut self, x: i32) -> i32 {
        self.deriv_value = self.deriv.process(self.ema.process(x));
        self.rms_value = self.rms.process(x);
        self.rms_deriv_value = self.rms_deriv.process(self.deriv_value);
        self.deriv_value
    }
}

/// One of the two parallel bit accumulators.
///
/// Each subcode owns its reading history, its current bit with the one-sample flip lockout, and
/// a full timecode/bitstream pair with its own validity counter.
#[derive(Clone, Debug)]
pub(crate) struct Subcode {
    readings: DelayLine,
    avg_reading: EmaF,
    avg_slope: EmaF,
    pub bit: Wide,
    pub recent_bit_flip: bool,
    pub timecode: Wide,
    pub bitstream: Wide,
    pub valid_counter: u32,
}

impl Subcode {
    pub fn new() -> Self {
        Subcode {
            readings: DelayLine::default(),
            avg_reading: EmaF::with_initial(ALPHA_AVG, f64::from(i32::MAX / 2)),
            avg_slope: EmaF::with_initial(ALPHA_AVG, f64::from(i32::MAX / 2)),
            bit: Wide::ZERO,
            recent_bit_flip: false,
            timecode: Wide::ZERO,
            bitstream: Wide::ZERO,
            valid_counter: 0,
        }
    }

    /// The bits only change when an offset jump occurs; otherwise the previous bit is kept.
    /// A jump registers when both the one- and two-sample slopes exceed an RMS-derived
    /// threshold, and further flips are locked out for one reading afterwards.
    pub fn detect_bit_flip(&mut self, slope: [i64; 2], rms: i32, forwards: bool, one: Wide) {
        if self.recent_bit_flip {
            self.recent_bit_flip = false;
            return;
        }

        let (threshold, one) = if forwards {
            (f64::from(rms) / FORWARD_FACTOR, one)
        } else {
            (f64::from(rms) / REVERSE_FACTOR, one.is_zero_as_one())
        };

        let s0 = slope[0] as f64;
        let s1 = slope[1] as f64;

        if self.bit == one.is_zero_as_one() && s0 > threshold && s1 > threshold {
            self.bit = one;
            self.recent_bit_flip = true;
        }
        else if self.bit == one && s0 < -threshold && s1 < -threshold {
            self.bit = one.is_zero_as_one();
            self.recent_bit_flip = true;
        }
    }

    /// Folds the current bit into the bitstream, advances the expected timecode one LFSR step,
    /// and reports whether they agree. On disagreement the timecode realigns to the bitstream
    /// and the agreement run restarts.
    pub fn verify(&mut self, taps: Wide, bits: u32, forwards: bool) -> bool {
        if forwards {
            self.timecode = lfsr::fwd_wide(self.timecode, taps, bits);
            self.bitstream = (self.bitstream >> 1) + (self.bit << (bits - 1));
        }
        else {
            let mask = (Wide::ONE << bits) - Wide::ONE;
            self.timecode = lfsr::rev_wide(self.timecode, taps, bits);
            self.bitstream = ((self.bitstream << 1) & mask) + self.bit;
        }

        if self.timecode == self.bitstream {
            self.valid_counter += 1;
            true
        }
        else {
            self.timecode = self.bitstream;
            self.valid_counter = 0;
            false
        }
    }

    /// Processes one bit-extraction reading through flip detection and LFSR verification.
    pub fn process(
        &mut self,
        reading: i32,
        rms: i32,
        taps: Wide,
        bits: u32,
        forwards: bool,
        one: Wide,
    ) -> bool {
        self.readings.push(reading);
        self.avg_reading.process(f64::from(reading));

        // Current and previous slope of the reading sequence.
        let slope = [
            i64::from(reading) - i64::from(self.readings.at(1)),
            i64::from(reading) - i64::from(self.readings.at(2)),
        ];
        self.avg_slope.process(slope[0].unsigned_abs() as f64);

        self.detect_bit_flip(slope, rms, forwards, one);
        self.verify(taps, bits, forwards)
    }
}

/// The complete MK2 decoding state: both channels' feature chains, the subcode pair, and the
/// published timecode/bitstream.
#[derive(Clone, Debug)]
pub(crate) struct Mk2State {
    pub primary: Mk2Channel,
    pub secondary: Mk2Channel,
    pub upper: Subcode,
    pub lower: Subcode,
    pub timecode: Wide,
    pub bitstream: Wide,
}

impl Mk2State {
    pub fn new() -> Self {
        Mk2State {
            primary: Mk2Channel::new(),
            secondary: Mk2Channel::new(),
            upper: Subcode::new(),
            lower: Subcode::new(),
            timecode: Wide::ZERO,
            bitstream: Wide::ZERO,
        }
    }

    /// The reading used for bit extraction, aligned with the feature chain's group delay.
    pub fn reading(&self) -> i32 {
        self.secondary.delay.at(READING_DELAY)
    }

    /// Routes a reading to the subcode selected by the secondary polarity, then publishes the
    /// subcode with the higher validity counter. Returns whether the published pair agrees.
    pub fn process_bitstream(
        &mut self,
        reading: i32,
        taps: Wide,
        bits: u32,
        forwards: bool,
        secondary_positive: bool,
    ) -> bool {
        // The candidate "one" bit follows the secondary polarity.
        let one = Wide::new(0, u64::from(!secondary_positive));
        let rms = self.secondary.rms_value;

        if secondary_positive {
            self.upper.process(reading, rms, taps, bits, forwards, one);
        }
        else {
            self.lower.process(reading, rms, taps, bits, forwards, one);
        }

        if self.lower.valid_counter > self.upper.valid_counter {
            self.bitstream = self.lower.bitstream;
            self.timecode = self.lower.timecode;
        }
        else {
            self.bitstream = self.upper.bitstream;
            self.timecode = self.upper.timecode;
        }

        self.timecode == self.bitstream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMS: i32 = 12_000;

    #[test]
    fn verify_bit_flip_thresholds() {
        let mut sc = Subcode::new();
        let one = Wide::ONE;

        // Slopes below threshold keep the bit.
        sc.detect_bit_flip([4_000, 4_000], RMS, true, one);
        assert_eq!(sc.bit, Wide::ZERO);

        // Both slopes above rms / 1.5 flip to one.
        sc.detect_bit_flip([9_000, 9_000], RMS, true, one);
        assert_eq!(sc.bit, one);
        assert!(sc.recent_bit_flip);

        // One strong slope alone is not enough.
        let mut sc = Subcode::new();
        sc.detect_bit_flip([9_000, 4_000], RMS, true, one);
        assert_eq!(sc.bit, Wide::ZERO);
    }

    #[test]
    fn verify_bit_flip_lockout() {
        let mut sc = Subcode::new();
        let one = Wide::ONE;

        sc.detect_bit_flip([9_000, 9_000], RMS, true, one);
        assert_eq!(sc.bit, one);

        // The very next reading is locked out even with strong opposite slopes.
        sc.detect_bit_flip([-9_000, -9_000], RMS, true, one);
        assert_eq!(sc.bit, one);
        assert!(!sc.recent_bit_flip);

        // After the lockout clears, the flip back is taken.
        sc.detect_bit_flip([-9_000, -9_000], RMS, true, one);
        assert_eq!(sc.bit, Wide::ZERO);
    }

    #[test]
    fn verify_reverse_uses_complement_and_tighter_threshold() {
        let mut sc = Subcode::new();
        let one = Wide::ONE;

        // In reverse the candidate bit is complemented. With one=ONE the reversed candidate is
        // ZERO, which the bit already holds, so a positive jump changes nothing.
        sc.detect_bit_flip([9_000, 9_000], RMS, false, one);
        assert_eq!(sc.bit, Wide::ZERO);
        assert!(!sc.recent_bit_flip);

        // With one=ZERO reversed, the candidate is ONE; rms / 1.75 ~ 6857 gates the jump.
        let mut sc = Subcode::new();
        sc.detect_bit_flip([6_500, 6_500], RMS, false, Wide::ZERO);
        assert_eq!(sc.bit, Wide::ZERO);

        sc.detect_bit_flip([7_000, 7_000], RMS, false, Wide::ZERO);
        assert_eq!(sc.bit, Wide::ONE);
    }

    #[test]
    fn verify_lfsr_verify_matches_forward_walk() {
        // serato_2a parameters carried in wide form keep the walk cheap and known-maximal.
        let taps = Wide::new(0, 0x361e4);
        let bits = 20;

        let mut sc = Subcode::new();

        // Feed the bit sequence of the orbit from the all-zero state: with bit stuck at zero,
        // the zero state is a fixed point and every step agrees.
        for n in 1..=30 {
            assert!(sc.verify(taps, bits, true));
            assert_eq!(sc.valid_counter, n);
        }

        // A surprise bit breaks the run and realigns.
        sc.bit = Wide::ONE;
        assert!(!sc.verify(taps, bits, true));
        assert_eq!(sc.valid_counter, 0);
        assert_eq!(sc.timecode, sc.bitstream);
    }

    #[test]
    fn verify_more_confident_subcode_wins() {
        let taps = Wide::new(0, 0x361e4);
        let bits = 20;

        let mut st = Mk2State::new();

        // Pretend the lower subcode has an established agreement run.
        st.lower.valid_counter = 5;
        st.lower.timecode = Wide::new(0, 0xabc);
        st.lower.bitstream = Wide::new(0, 0xabc);

        // Readings routed to the upper subcode while it is less confident still publish the
        // lower subcode's pair.
        for _ in 0..3 {
            st.process_bitstream(0, taps, bits, true, true);
        }
        assert_eq!(st.bitstream, Wide::new(0, 0xabc));
        assert!(st.upper.valid_counter < st.lower.valid_counter);

        // Once the upper run grows past the lower one, the published pair follows it.
        for _ in 0..4 {
            st.process_bitstream(0, taps, bits, true, true);
        }
        assert!(st.upper.valid_counter > st.lower.valid_counter);
        assert_eq!(st.bitstream, st.upper.bitstream);
    }

    #[test]
    fn verify_polarity_routes_subcodes() {
        let taps = Wide::new(0, 0x361e4);
        let bits = 20;

        let mut st = Mk2State::new();

        st.process_bitstream(100, taps, bits, true, true);
        assert_eq!(st.upper.valid_counter, 1);
        assert_eq!(st.lower.valid_counter, 0);

        st.process_bitstream(100, taps, bits, true, false);
        assert_eq!(st.upper.valid_counter, 1);
        assert_eq!(st.lower.valid_counter, 1);
    }
}
