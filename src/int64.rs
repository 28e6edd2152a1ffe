use crate::RuntimeError;
use crate::raise_range_error;
use crate::raise_syntax_error;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

/// An exact two's-complement 64-bit signed integer.
///
/// Every operation computes the mathematically exact result, wraps it
/// modulo 2^64 and reinterprets it in the signed range (wraparound, not
/// saturation). Division and remainder by zero are the only fallible
/// operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Int64(i64);

impl Int64 {
    pub const MIN: Int64 = Int64(i64::MIN);
    pub const MAX: Int64 = Int64(i64::MAX);
    pub const ZERO: Int64 = Int64(0);
    pub const ONE: Int64 = Int64(1);

    pub const fn new(value: i64) -> Self {
        Int64(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub fn add(self, rhs: Int64) -> Int64 {
        Int64(self.0.wrapping_add(rhs.0))
    }

    pub fn sub(self, rhs: Int64) -> Int64 {
        Int64(self.0.wrapping_sub(rhs.0))
    }

    pub fn mul(self, rhs: Int64) -> Int64 {
        Int64(self.0.wrapping_mul(rhs.0))
    }

    /// Truncating division. `div(MIN, -1)` wraps back to `MIN`; a zero
    /// divisor raises a RangeError.
    pub fn div(self, rhs: Int64) -> Result<Int64, RuntimeError> {
        if rhs.0 == 0 {
            return Err(raise_range_error!("0 is an invalid divisor value."));
        }
        Ok(Int64(self.0.wrapping_div(rhs.0)))
    }

    /// Truncating remainder; the result carries the sign of the dividend.
    pub fn rem(self, rhs: Int64) -> Result<Int64, RuntimeError> {
        if rhs.0 == 0 {
            return Err(raise_range_error!("0 is an invalid divisor value."));
        }
        Ok(Int64(self.0.wrapping_rem(rhs.0)))
    }

    pub fn neg(self) -> Int64 {
        Int64(self.0.wrapping_neg())
    }

    pub fn inc(self) -> Int64 {
        Int64(self.0.wrapping_add(1))
    }

    pub fn dec(self) -> Int64 {
        Int64(self.0.wrapping_sub(1))
    }

    pub fn bit_not(self) -> Int64 {
        Int64(!self.0)
    }

    pub fn bit_and(self, rhs: Int64) -> Int64 {
        Int64(self.0 & rhs.0)
    }

    pub fn bit_or(self, rhs: Int64) -> Int64 {
        Int64(self.0 | rhs.0)
    }

    pub fn bit_xor(self, rhs: Int64) -> Int64 {
        Int64(self.0 ^ rhs.0)
    }

    /// Left shift wrapped to 64 bits. A negative count shifts right
    /// instead; counts of 64 or more push every bit out (the wrap of
    /// `a * 2^count`), leaving zero.
    pub fn shl(self, count: Int64) -> Int64 {
        if count.0 < 0 {
            return self.shr_magnitude(count.0.unsigned_abs());
        }
        self.shl_magnitude(count.0 as u64)
    }

    /// Arithmetic (sign-extending) right shift. A negative count shifts
    /// left instead; counts of 64 or more collapse to the sign fill.
    pub fn shr(self, count: Int64) -> Int64 {
        if count.0 < 0 {
            return self.shl_magnitude(count.0.unsigned_abs());
        }
        self.shr_magnitude(count.0 as u64)
    }

    fn shl_magnitude(self, count: u64) -> Int64 {
        if count >= 64 {
            return Int64(0);
        }
        Int64(((self.0 as u64) << count) as i64)
    }

    fn shr_magnitude(self, count: u64) -> Int64 {
        if count >= 64 {
            // Fully shifted out: floor(a / 2^count) is 0 or -1.
            return Int64(self.0 >> 63);
        }
        Int64(self.0 >> count)
    }

    /// Integer exponentiation by repeated squaring, wrapped at every
    /// step. `pow(a, 0) == 1` for every `a` including zero; a negative
    /// exponent raises a RangeError.
    pub fn pow(self, exponent: Int64) -> Result<Int64, RuntimeError> {
        if exponent.0 < 0 {
            return Err(raise_range_error!("Exponent must be non-negative."));
        }
        let mut result: i64 = 1;
        let mut base = self.0;
        let mut exp = exponent.0 as u64;
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.wrapping_mul(base);
            }
            base = base.wrapping_mul(base);
            exp >>= 1;
        }
        Ok(Int64(result))
    }

    /// Wrap an arbitrary-precision integer into the signed 64-bit range,
    /// i.e. reinterpret `value mod 2^64` as two's complement.
    pub fn wrap_bigint(value: &BigInt) -> Int64 {
        let modulus = BigInt::from(1u8) << 64u32;
        let mut r = value % &modulus;
        if r.sign() == Sign::Minus {
            r += &modulus;
        }
        let half = &modulus >> 1;
        if r >= half {
            r -= &modulus;
        }
        Int64(r.to_i64().expect("wrapped value fits in i64"))
    }

    /// Range-validating conversion; values outside [-2^63, 2^63 - 1]
    /// raise a RangeError rather than wrapping.
    pub fn try_from_bigint(value: &BigInt) -> Result<Int64, RuntimeError> {
        match value.to_i64() {
            Some(v) => Ok(Int64(v)),
            None => Err(raise_range_error!("{} is out of the signed 64-bit range", value)),
        }
    }

    pub fn to_bigint(self) -> BigInt {
        BigInt::from(self.0)
    }

    /// Parse a decimal or `0x`/`0o`/`0b` prefixed integer literal, with
    /// an optional trailing `n` and an optional leading sign, validating
    /// the value into the signed 64-bit range.
    pub fn parse(input: &str) -> Result<Int64, RuntimeError> {
        let s = input.trim();
        let s = s.strip_suffix('n').unwrap_or(s);
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (radix, digits) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            (16, hex)
        } else if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
            (8, oct)
        } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
            (2, bin)
        } else {
            (10, s)
        };
        // BigInt::parse_bytes accepts its own leading sign; the sign was
        // already consumed above, so any remaining one is malformed.
        if digits.is_empty() || digits.starts_with('+') || digits.starts_with('-') {
            return Err(raise_syntax_error!("Cannot convert {:?} to an Int64", input));
        }
        let magnitude = BigInt::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| raise_syntax_error!("Cannot convert {:?} to an Int64", input))?;
        let value = if negative { -magnitude } else { magnitude };
        Int64::try_from_bigint(&value)
    }
}

impl std::fmt::Display for Int64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Int64 {
    fn from(value: i64) -> Self {
        Int64(value)
    }
}

impl From<Int64> for i64 {
    fn from(value: Int64) -> Self {
        value.0
    }
}
