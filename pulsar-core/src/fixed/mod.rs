//! Width-tracked fixed-point integers
//!
//! [`Bounded<BITS, SIGNED>`] is an integer whose magnitude is known to fit
//! in `BITS` bits. Signed values use a symmetric range of
//! `-(2^BITS - 1) ..= 2^BITS - 1`, so the sign never costs a magnitude bit
//! and negation is always representable.
//!
//! Every widening operation names its result width at the call site. A
//! `const` block inside the operation rejects, when the call is
//! monomorphized, any result width smaller than the worst-case growth:
//!
//! | op | minimum result width |
//! |----|----------------------|
//! | `add` | `max(A, B) + 1` |
//! | `sub` | `max(A, B) + 1` signed, `A` unsigned |
//! | `mul` | `A + B` |
//! | `shl::<S, _>` | `A + S` |
//! | `shr::<S, _>` | `A - S` |
//! | `isqrt` | `(A + 2) / 2` |
//!
//! The arithmetic on the hot path therefore needs no run-time overflow
//! checks. `narrow`, `div` and `to_unsigned` produce values whose range
//! depends on the operands, so they carry a `debug_assert!` instead.

mod sqrt;

pub use sqrt::{isqrt_round_u32, isqrt_round_u64};

use core::fmt;

/// Widest magnitude supported; products must still fit an `i64`
pub const MAX_BITS: u32 = 62;

/// Integer whose magnitude fits in `BITS` bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bounded<const BITS: u32, const SIGNED: bool>(i64);

/// Unsigned bounded integer
pub type UBounded<const BITS: u32> = Bounded<BITS, false>;

/// Signed bounded integer
pub type SBounded<const BITS: u32> = Bounded<BITS, true>;

const fn max_u32(a: u32, b: u32) -> u32 {
    if a > b {
        a
    } else {
        b
    }
}

impl<const BITS: u32, const SIGNED: bool> Bounded<BITS, SIGNED> {
    /// Largest representable value
    pub const MAX: i64 = (1i64 << BITS) - 1;

    /// Smallest representable value
    pub const MIN: i64 = if SIGNED { -Self::MAX } else { 0 };

    /// Zero
    pub const ZERO: Self = Bounded(0);

    /// Construct from a raw integer, asserting it is in range
    #[inline]
    pub const fn new(value: i64) -> Self {
        const { assert!(BITS <= MAX_BITS) }
        debug_assert!(value >= Self::MIN && value <= Self::MAX);
        Bounded(value)
    }

    /// Construct from a raw integer, or `None` if it is out of range
    #[inline]
    pub const fn try_new(value: i64) -> Option<Self> {
        const { assert!(BITS <= MAX_BITS) }
        if value >= Self::MIN && value <= Self::MAX {
            Some(Bounded(value))
        } else {
            None
        }
    }

    /// Raw value
    #[inline]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns true if the value is strictly negative
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Reinterpret with a wider (or equal) width
    #[inline]
    pub const fn widen<const R: u32>(self) -> Bounded<R, SIGNED> {
        const { assert!(R >= BITS && R <= MAX_BITS) }
        Bounded(self.0)
    }

    /// Reinterpret with a narrower width, asserting the value fits
    #[inline]
    pub const fn narrow<const R: u32>(self) -> Bounded<R, SIGNED> {
        Bounded::<R, SIGNED>::new(self.0)
    }

    /// Same value as a signed quantity of the same magnitude width
    #[inline]
    pub const fn to_signed(self) -> Bounded<BITS, true> {
        Bounded(self.0)
    }

    /// Same value as an unsigned quantity, asserting it is not negative
    #[inline]
    pub const fn to_unsigned(self) -> Bounded<BITS, false> {
        debug_assert!(self.0 >= 0);
        Bounded(self.0)
    }

    /// Magnitude
    #[inline]
    pub const fn abs(self) -> Bounded<BITS, false> {
        Bounded(self.0.abs())
    }

    /// Multiply by `2^S`
    #[inline]
    pub const fn shl<const S: u32, const R: u32>(self) -> Bounded<R, SIGNED> {
        const { assert!(R >= BITS + S && R <= MAX_BITS) }
        Bounded(self.0 << S)
    }

    /// Divide by `2^S`, rounding toward negative infinity
    #[inline]
    pub const fn shr<const S: u32, const R: u32>(self) -> Bounded<R, SIGNED> {
        const { assert!(R + S >= BITS && R <= MAX_BITS) }
        Bounded(self.0 >> S)
    }

    /// Sum, one bit wider than the wider operand
    #[inline]
    pub const fn add<const B: u32, const R: u32>(
        self,
        rhs: Bounded<B, SIGNED>,
    ) -> Bounded<R, SIGNED> {
        const { assert!(R > max_u32(BITS, B) && R <= MAX_BITS) }
        Bounded(self.0 + rhs.0)
    }

    /// Difference
    ///
    /// Unsigned subtraction asserts the minuend is not smaller than the
    /// subtrahend, so its result never grows past the minuend's width.
    #[inline]
    pub const fn sub<const B: u32, const R: u32>(
        self,
        rhs: Bounded<B, SIGNED>,
    ) -> Bounded<R, SIGNED> {
        const {
            assert!(R <= MAX_BITS);
            if SIGNED {
                assert!(R > max_u32(BITS, B));
            } else {
                assert!(R >= BITS);
            }
        }
        debug_assert!(SIGNED || self.0 >= rhs.0);
        Bounded(self.0 - rhs.0)
    }

    /// Product, as wide as both operands together
    #[inline]
    pub const fn mul<const B: u32, const R: u32>(
        self,
        rhs: Bounded<B, SIGNED>,
    ) -> Bounded<R, SIGNED> {
        const { assert!(R >= BITS + B && R <= MAX_BITS) }
        Bounded(self.0 * rhs.0)
    }

    /// Quotient truncated toward zero, into an explicit target width
    ///
    /// The divisor must be non-zero and the quotient must fit `R` bits;
    /// both are caller obligations checked in debug builds.
    #[inline]
    pub const fn div<const B: u32, const R: u32>(
        self,
        rhs: Bounded<B, SIGNED>,
    ) -> Bounded<R, SIGNED> {
        debug_assert!(rhs.0 != 0);
        Bounded::<R, SIGNED>::new(self.0 / rhs.0)
    }
}

impl<const BITS: u32> Bounded<BITS, false> {
    /// Square root rounded to the nearest integer
    ///
    /// Operands of up to 32 bits use the native-word routine.
    #[inline]
    pub fn isqrt<const R: u32>(self) -> Bounded<R, false> {
        const { assert!(R >= (BITS + 2) / 2 && R <= MAX_BITS) }
        let root = if BITS <= 32 {
            i64::from(isqrt_round_u32(self.0 as u32))
        } else {
            isqrt_round_u64(self.0 as u64) as i64
        };
        Bounded(root)
    }
}

impl<const BITS: u32, const SIGNED: bool> From<Bounded<BITS, SIGNED>> for i64 {
    fn from(value: Bounded<BITS, SIGNED>) -> Self {
        value.0
    }
}

impl<const BITS: u32, const SIGNED: bool> fmt::Display for Bounded<BITS, SIGNED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "defmt")]
impl<const BITS: u32, const SIGNED: bool> defmt::Format for Bounded<BITS, SIGNED> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=i64}", self.0)
    }
}

#[cfg(feature = "serde")]
impl<const BITS: u32, const SIGNED: bool> serde::Serialize for Bounded<BITS, SIGNED> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de, const BITS: u32, const SIGNED: bool> serde::Deserialize<'de> for Bounded<BITS, SIGNED> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <i64 as serde::Deserialize>::deserialize(deserializer)?;
        Self::try_new(raw).ok_or_else(|| serde::de::Error::custom("value out of range"))
    }
}
