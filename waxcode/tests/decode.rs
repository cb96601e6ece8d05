// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end decoding of synthesized control-record signal.

use waxcode::core::timecode::def::CodeKeys;
use waxcode::core::timecode::lfsr;
use waxcode::{DecoderOptions, RegistryOptions, Timecoder, TimecodeDef, TimecodeRegistry};

const SAMPLE_RATE: u32 = 44100;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> TimecodeRegistry {
    // Keep the tests away from $HOME.
    TimecodeRegistry::new(RegistryOptions { store_luts: false, ..Default::default() })
}

fn square(phase: f64, amp: i16) -> i16 {
    if phase.rem_euclid(1.0) < 0.5 {
        amp
    }
    else {
        -amp
    }
}

/// The physical bit sequence of the record from its start: bit `k` is the MSB inserted by the
/// k+1'th forward LFSR step from the seed.
fn code_bits(def: &TimecodeDef, n: usize) -> Vec<bool> {
    let CodeKeys::Legacy { seed, taps } = def.keys else { panic!("not a legacy code") };

    let mut bits = Vec::with_capacity(n);
    let mut state = seed;
    for _ in 0..n {
        state = lfsr::fwd(state, taps, def.bits);
        bits.push(state >> (def.bits - 1) & 1 == 1);
    }
    bits
}

/// Synthesizes `frames` of the code's control signal: a quadrature square-wave pair at the
/// code's resolution, amplitude-modulated cycle by cycle with the LFSR bit sequence, primary
/// leading secondary by a quarter cycle.
fn modulated(def: &TimecodeDef, frames: usize) -> Vec<i16> {
    let freq = f64::from(def.resolution);
    let cycles = (freq * frames as f64 / f64::from(SAMPLE_RATE)).ceil() as usize + 1;
    let bits = code_bits(def, cycles);

    let mut pcm = Vec::with_capacity(frames * 2);
    for n in 0..frames {
        let phase = freq * n as f64 / f64::from(SAMPLE_RATE);
        let amp = if bits[phase as usize] { 14000 } else { 9000 };

        let primary = square(phase, amp);
        let secondary = square(phase - 0.25, amp);

        // serato_2a carries no PRIMARY switch: the right channel is primary.
        pcm.push(secondary);
        pcm.push(primary);
    }

    pcm
}

/// Plays a signal backwards, frame-wise.
fn reversed(pcm: &[i16]) -> Vec<i16> {
    let mut out = Vec::with_capacity(pcm.len());
    for frame in pcm.chunks_exact(2).rev() {
        out.extend_from_slice(frame);
    }
    out
}

#[test]
fn silence_reports_no_position() {
    init_logging();

    let registry = registry();
    let code = registry.find("serato_2a").unwrap();
    let mut tc = Timecoder::new(code, 1.0, SAMPLE_RATE, &DecoderOptions::default());

    // One second of silence, submitted in odd-sized blocks.
    let silence = vec![0i16; SAMPLE_RATE as usize * 2];
    for block in silence.chunks(1234) {
        tc.submit(block);
        assert!(tc.position().is_none());
    }

    assert_eq!(tc.valid_counter(), 0);
    assert_eq!(tc.pitch(), 0.0);
}

#[test]
fn forward_stream_locks_position_and_pitch() {
    init_logging();

    let registry = registry();
    let code = registry.find("serato_2a").unwrap();
    let def = code.def().clone();
    let mut tc = Timecoder::new(code, 1.0, SAMPLE_RATE, &DecoderOptions::default());

    // Three seconds from the start of the record; the reference level needs on the order of a
    // hundred cycles to settle before bits decode, and the pitch filter a few hundred
    // milliseconds to converge.
    let frames = SAMPLE_RATE as usize * 3;
    tc.submit(&modulated(&def, frames));

    assert!(tc.forwards());

    let pos = tc.position().expect("decoder should have locked");
    let cycles = (f64::from(def.resolution) * frames as f64 / f64::from(SAMPLE_RATE)) as u32;
    assert!(pos.millis <= cycles && pos.millis + 20 > cycles, "position {} ms", pos.millis);

    assert!((tc.pitch() - 1.0).abs() < 0.01, "pitch {}", tc.pitch());
}

#[test]
fn reversed_stream_decodes_backwards() {
    init_logging();

    let registry = registry();
    let code = registry.find("serato_2a").unwrap();
    let def = code.def().clone();
    let mut tc = Timecoder::new(code, 1.0, SAMPLE_RATE, &DecoderOptions::default());

    let frames = SAMPLE_RATE as usize * 7 / 2;
    let forward = modulated(&def, frames);
    tc.submit(&reversed(&forward));

    assert!(!tc.forwards());

    let pos = tc.position().expect("decoder should have locked in reverse");
    let cycles = (f64::from(def.resolution) * frames as f64 / f64::from(SAMPLE_RATE)) as u32;
    assert!(pos.millis < cycles, "position {} ms", pos.millis);

    assert!((tc.pitch() + 1.0).abs() < 0.01, "pitch {}", tc.pitch());
}

#[test]
fn cycling_definitions_drops_the_lock() {
    init_logging();

    let registry = registry();
    let code = registry.find("serato_2a").unwrap();
    registry.find("serato_2b").unwrap();

    let def = code.def().clone();
    let mut tc = Timecoder::new(code, 1.0, SAMPLE_RATE, &DecoderOptions::default());

    let signal = modulated(&def, SAMPLE_RATE as usize * 3);
    tc.submit(&signal);
    assert!(tc.position().is_some());

    tc.cycle_definition(&registry);

    assert_eq!(tc.code().def().name, "serato_2b");
    assert_eq!(tc.valid_counter(), 0);
    assert!(tc.position().is_none());

    // The stream no longer matches the active code, so the decoder must not re-lock on it.
    tc.submit(&signal);
    assert!(tc.position().is_none());
}

#[test]
fn relock_after_needle_drop() {
    init_logging();

    let registry = registry();
    let code = registry.find("serato_2a").unwrap();
    let def = code.def().clone();
    let mut tc = Timecoder::new(code, 1.0, SAMPLE_RATE, &DecoderOptions::default());

    tc.submit(&modulated(&def, SAMPLE_RATE as usize * 3));
    let before = tc.position().expect("locked before the drop");

    // Silence while the needle is lifted, then a shorter run from the start of the record.
    tc.submit(&vec![0i16; SAMPLE_RATE as usize]);
    tc.submit(&modulated(&def, SAMPLE_RATE as usize * 2));

    let after = tc.position().expect("re-locked after the drop");
    assert!(after.millis < before.millis);
}
