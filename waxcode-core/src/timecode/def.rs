// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `def` module carries the static descriptions of every supported timecode.

use bitflags::bitflags;

use crate::util::wide::Wide;

bitflags! {
    /// Feature switches of a timecode definition.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CodeFlags: u32 {
        /// Tone phase difference of 270 (not 90) degrees.
        const PHASE = 0x1;
        /// Use the left (not right) channel as primary.
        const PRIMARY = 0x2;
        /// Read bit values in negative (not positive).
        const POLARITY = 0x4;
        /// Traktor Scratch MK2 family: phase/offset-jump modulation and a 110-bit code.
        const MK2 = 0x8;
    }
}

/// The LFSR seed and taps of a code, in the width the code family requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKeys {
    /// Codes up to 32 bits, modulated directly as a square-wave pair.
    Legacy { seed: u32, taps: u32 },
    /// The 110-bit MK2 codes.
    Mk2 { seed: Wide, taps: Wide },
}

/// The static description of one timecode pressing.
#[derive(Clone, Debug)]
pub struct TimecodeDef {
    pub name: &'static str,
    pub desc: &'static str,
    /// Frequency of the underlying tone, in Hz.
    pub resolution: u32,
    pub flags: CodeFlags,
    /// Width of the LFSR window, in bits.
    pub bits: u32,
    pub keys: CodeKeys,
    /// Total length of the code, in LFSR cycles.
    pub length: u32,
    /// Usable prefix of the code.
    pub safe: u32,
}

impl TimecodeDef {
    /// Whether this definition belongs to the Traktor MK2 family.
    pub fn is_mk2(&self) -> bool {
        self.flags.contains(CodeFlags::MK2)
    }
}

/// The built-in timecode definitions.
pub static BUILTIN: &[TimecodeDef] = &[
    TimecodeDef {
        name: "serato_2a",
        desc: "Serato 2nd Ed., side A",
        resolution: 1000,
        flags: CodeFlags::empty(),
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0x59017, taps: 0x361e4 },
        length: 712000,
        safe: 625000,
    },
    TimecodeDef {
        name: "serato_2b",
        desc: "Serato 2nd Ed., side B",
        resolution: 1000,
        flags: CodeFlags::empty(),
        bits: 20,
        // Taps are the reverse of side A.
        keys: CodeKeys::Legacy { seed: 0x8f3c6, taps: 0x4f0d8 },
        length: 922000,
        safe: 908000,
    },
    TimecodeDef {
        name: "serato_cd",
        desc: "Serato CD",
        resolution: 1000,
        flags: CodeFlags::empty(),
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0xd8b40, taps: 0x34d54 },
        length: 950000,
        safe: 890000,
    },
    TimecodeDef {
        name: "traktor_a",
        desc: "Traktor Scratch, side A",
        resolution: 2000,
        flags: CodeFlags::PRIMARY.union(CodeFlags::POLARITY).union(CodeFlags::PHASE),
        bits: 23,
        keys: CodeKeys::Legacy { seed: 0x134503, taps: 0x041040 },
        length: 1500000,
        safe: 605000,
    },
    TimecodeDef {
        name: "traktor_b",
        desc: "Traktor Scratch, side B",
        resolution: 2000,
        flags: CodeFlags::PRIMARY.union(CodeFlags::POLARITY).union(CodeFlags::PHASE),
        bits: 23,
        // Taps are the same as side A.
        keys: CodeKeys::Legacy { seed: 0x32066c, taps: 0x041040 },
        length: 2110000,
        safe: 907000,
    },
    TimecodeDef {
        name: "traktor_mk2_a",
        desc: "Traktor Scratch MK2, side A",
        resolution: 2500,
        flags: CodeFlags::MK2,
        bits: 110,
        keys: CodeKeys::Mk2 {
            seed: Wide::new(0xc6007c63e, 0x3fc00c60f8c1f00),
            taps: Wide::new(0x400000000040, 0x0000010800000001),
        },
        length: 1820000,
        safe: 1800000,
    },
    TimecodeDef {
        name: "traktor_mk2_b",
        desc: "Traktor Scratch MK2, side B",
        resolution: 2500,
        flags: CodeFlags::MK2,
        bits: 110,
        keys: CodeKeys::Mk2 {
            seed: Wide::new(0x1ff9f00003, 0xe73ff00f9fe0c7c1),
            taps: Wide::new(0x400000000040, 0x0000010800000001),
        },
        length: 2570000,
        safe: 2550000,
    },
    TimecodeDef {
        name: "traktor_mk2_cd",
        desc: "Traktor Scratch MK2, CD",
        resolution: 3000,
        flags: CodeFlags::MK2,
        bits: 110,
        keys: CodeKeys::Mk2 {
            seed: Wide::new(0x7ce73, 0xe0e0fff1fc1cf8c1),
            taps: Wide::new(0x400000000000, 0x1000010800000001),
        },
        length: 4500000,
        safe: 4495000,
    },
    TimecodeDef {
        name: "mixvibes_v2",
        desc: "MixVibes V2",
        resolution: 1300,
        flags: CodeFlags::PHASE,
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0x22c90, taps: 0x00008 },
        length: 950000,
        safe: 655000,
    },
    TimecodeDef {
        name: "mixvibes_7inch",
        desc: "MixVibes 7\"",
        resolution: 1300,
        flags: CodeFlags::PHASE,
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0x22c90, taps: 0x00008 },
        length: 312000,
        safe: 238000,
    },
    TimecodeDef {
        name: "pioneer_a",
        desc: "Pioneer RekordBox DVS Control Vinyl, side A",
        resolution: 1000,
        flags: CodeFlags::POLARITY,
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0x78370, taps: 0x7933a },
        length: 635000,
        safe: 614000,
    },
    TimecodeDef {
        name: "pioneer_b",
        desc: "Pioneer RekordBox DVS Control Vinyl, side B",
        resolution: 1000,
        flags: CodeFlags::POLARITY,
        bits: 20,
        keys: CodeKeys::Legacy { seed: 0xf7012, taps: 0x2ef1c },
        length: 918500,
        safe: 913000,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_builtin_consistency() {
        for def in BUILTIN {
            match def.keys {
                CodeKeys::Legacy { seed, taps } => {
                    assert!(!def.is_mk2(), "{}", def.name);
                    assert!(def.bits <= 32);
                    // Seed and taps fit the code window.
                    let mask = (1u32 << def.bits) - 1;
                    assert_eq!(seed & mask, seed, "{}", def.name);
                    assert_eq!(taps & mask, taps, "{}", def.name);
                }
                CodeKeys::Mk2 { seed, taps } => {
                    assert!(def.is_mk2(), "{}", def.name);
                    assert!(def.bits > 32 && def.bits < 128);
                    let mask = (Wide::ONE << def.bits) - Wide::ONE;
                    assert_eq!(seed & mask, seed, "{}", def.name);
                    // The top tap sits one past the window; only its shifted-down form takes
                    // part in the reverse step.
                    let tap_mask = (Wide::ONE << (def.bits + 1)) - Wide::ONE;
                    assert_eq!(taps & tap_mask, taps, "{}", def.name);
                }
            }

            assert!(def.safe <= def.length, "{}", def.name);
            assert!(def.resolution > 0, "{}", def.name);
        }
    }

    #[test]
    fn verify_builtin_names_unique() {
        for (i, a) in BUILTIN.iter().enumerate() {
            for b in &BUILTIN[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }
}
