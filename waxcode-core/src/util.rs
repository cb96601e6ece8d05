// Waxcode
// Copyright (c) 2026 The Waxcode Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `util` module provides a repository of commonly used utility functions sorted into
//! distinct categories.

pub mod bits {
    //! Utilities for bit manipulation.

    /// Returns the XOR reduction (parity) of the set bits in `value`; 1 if an odd number of bits
    /// are set, 0 otherwise.
    #[inline(always)]
    pub fn parity_u32(value: u32) -> u32 {
        value.count_ones() & 0x1
    }

    /// Returns the XOR reduction (parity) of the set bits in `value`.
    #[inline(always)]
    pub fn parity_u64(value: u64) -> u64 {
        u64::from(value.count_ones() & 0x1)
    }

}

pub mod wide {
    //! A 128-bit unsigned value type for wide timecode bitstreams.
    //!
    //! Timecodes longer than 32 bits (the Traktor MK2 family is 110 bits) are carried in a
    //! dedicated two-word value type rather than a native `u128`. The persisted lookup-table
    //! format addresses the two 64-bit words explicitly, and the decoder relies on
    //! [`Wide::is_zero_as_one`], which has no native counterpart.

    use std::fmt;
    use std::ops::{Add, BitAnd, BitOr, Shl, Shr, Sub};

    /// A 128-bit unsigned integer composed of two 64-bit words.
    ///
    /// Addition and subtraction wrap modulo 2^128. Shifts accept any amount; shifting by 128 or
    /// more yields zero.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Wide {
        /// The most-significant 64 bits.
        pub high: u64,
        /// The least-significant 64 bits.
        pub low: u64,
    }

    impl Wide {
        pub const ZERO: Wide = Wide::new(0, 0);
        pub const ONE: Wide = Wide::new(0, 1);

        #[inline(always)]
        pub const fn new(high: u64, low: u64) -> Self {
            Wide { high, low }
        }

        #[inline(always)]
        pub const fn is_zero(&self) -> bool {
            self.high == 0 && self.low == 0
        }

        /// Returns `ONE` if the value is zero, and `ZERO` otherwise.
        ///
        /// This is a 0/1 toggle, *not* a bitwise complement. The bit-flip detector stores the
        /// current bit as a `Wide` and uses this operator to produce the opposite bit value.
        #[inline(always)]
        pub const fn is_zero_as_one(self) -> Wide {
            if self.is_zero() {
                Wide::ONE
            } else {
                Wide::ZERO
            }
        }

        /// Returns the number of set bits across both words.
        #[inline(always)]
        pub const fn count_ones(&self) -> u32 {
            self.high.count_ones() + self.low.count_ones()
        }

        #[inline]
        pub const fn wrapping_add(self, rhs: Wide) -> Wide {
            let (low, carry) = self.low.overflowing_add(rhs.low);
            let high = self.high.wrapping_add(rhs.high).wrapping_add(carry as u64);
            Wide { high, low }
        }

        #[inline]
        pub const fn wrapping_sub(self, rhs: Wide) -> Wide {
            let (low, borrow) = self.low.overflowing_sub(rhs.low);
            let high = self.high.wrapping_sub(rhs.high).wrapping_sub(borrow as u64);
            Wide { high, low }
        }

        #[inline]
        pub const fn shl(self, n: u32) -> Wide {
            if n == 0 {
                self
            } else if n < 64 {
                Wide { high: (self.high << n) | (self.low >> (64 - n)), low: self.low << n }
            } else if n < 128 {
                Wide { high: self.low << (n - 64), low: 0 }
            } else {
                Wide::ZERO
            }
        }

        #[inline]
        pub const fn shr(self, n: u32) -> Wide {
            if n == 0 {
                self
            } else if n < 64 {
                Wide { high: self.high >> n, low: (self.low >> n) | (self.high << (64 - n)) }
            } else if n < 128 {
                Wide { high: 0, low: self.high >> (n - 64) }
            } else {
                Wide::ZERO
            }
        }
    }

    impl Add for Wide {
        type Output = Wide;

        #[inline(always)]
        fn add(self, rhs: Wide) -> Wide {
            self.wrapping_add(rhs)
        }
    }

    impl Sub for Wide {
        type Output = Wide;

        #[inline(always)]
        fn sub(self, rhs: Wide) -> Wide {
            self.wrapping_sub(rhs)
        }
    }

    impl BitAnd for Wide {
        type Output = Wide;

        #[inline(always)]
        fn bitand(self, rhs: Wide) -> Wide {
            Wide { high: self.high & rhs.high, low: self.low & rhs.low }
        }
    }

    impl BitOr for Wide {
        type Output = Wide;

        #[inline(always)]
        fn bitor(self, rhs: Wide) -> Wide {
            Wide { high: self.high | rhs.high, low: self.low | rhs.low }
        }
    }

    impl Shl<u32> for Wide {
        type Output = Wide;

        #[inline(always)]
        fn shl(self, n: u32) -> Wide {
            Wide::shl(self, n)
        }
    }

    impl Shr<u32> for Wide {
        type Output = Wide;

        #[inline(always)]
        fn shr(self, n: u32) -> Wide {
            Wide::shr(self, n)
        }
    }

    impl fmt::LowerHex for Wide {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:016x}{:016x}", self.high, self.low)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::Wide;

        const MAX: Wide = Wide::new(u64::MAX, u64::MAX);

        #[test]
        fn verify_add_sub_wrap() {
            // Addition and subtraction form a group modulo 2^128.
            assert_eq!(MAX + Wide::ONE, Wide::ZERO);
            assert_eq!(Wide::ZERO - Wide::ONE, MAX);

            // Carry across the word boundary.
            let a = Wide::new(0, u64::MAX);
            assert_eq!(a + Wide::ONE, Wide::new(1, 0));
            assert_eq!(Wide::new(1, 0) - Wide::ONE, a);

            let b = Wide::new(0x0123, 0x8000_0000_0000_0001);
            assert_eq!(b + MAX, b - Wide::ONE);
            assert_eq!((b + b) - b, b);
        }

        #[test]
        fn verify_shifts() {
            let one = Wide::ONE;

            assert_eq!(one << 0, one);
            assert_eq!(one << 63, Wide::new(0, 1 << 63));
            assert_eq!(one << 64, Wide::new(1, 0));
            assert_eq!(one << 127, Wide::new(1 << 63, 0));
            assert_eq!(one << 128, Wide::ZERO);

            let top = Wide::new(1 << 63, 0);
            assert_eq!(top >> 0, top);
            assert_eq!(top >> 63, Wide::new(1, 0));
            assert_eq!(top >> 64, Wide::new(0, 1 << 63));
            assert_eq!(top >> 127, Wide::ONE);
            assert_eq!(top >> 128, Wide::ZERO);

            // A left shift followed by the same right shift truncates the bits pushed out the
            // top, and vice-versa.
            let v = Wide::new(0xdead_beef_0000_0000, 0x0000_0000_cafe_f00d);
            assert_eq!((v << 96) >> 96, Wide::new(0, v.low & 0xffff_ffff));
        }

        #[test]
        fn verify_is_zero_as_one() {
            // 0 maps to 1, everything else maps to 0. It is a toggle, not a complement.
            assert_eq!(Wide::ZERO.is_zero_as_one(), Wide::ONE);
            assert_eq!(Wide::ONE.is_zero_as_one(), Wide::ZERO);
            assert_eq!(MAX.is_zero_as_one(), Wide::ZERO);
            assert_eq!(Wide::new(1, 0).is_zero_as_one(), Wide::ZERO);

            // Double application normalizes any non-zero value to ONE.
            assert_eq!(MAX.is_zero_as_one().is_zero_as_one(), Wide::ONE);
        }

        #[test]
        fn verify_bit_ops() {
            let a = Wide::new(0xff00, 0x00ff);
            let b = Wide::new(0x0ff0, 0x0ff0);
            assert_eq!(a & b, Wide::new(0x0f00, 0x00f0));
            assert_eq!(a | b, Wide::new(0xfff0, 0x0fff));
        }

        #[test]
        fn verify_lower_hex() {
            let v = Wide::new(0xc6007c63e, 0x3fc00c60f8c1f00);
            assert_eq!(format!("{:x}", v), "0000000c6007c63e03fc00c60f8c1f00");
            assert_eq!(format!("{:x}", Wide::ZERO), "00000000000000000000000000000000");
        }
    }
}
