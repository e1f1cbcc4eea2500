//! Scaled fixed-point decimal ("comp-4") arithmetic.
//!
//! A comp-4 value is `raw * 10^-scale` with signedness and scale fixed at
//! declaration. All arithmetic is exact: an operation that would overflow
//! the raw i64 or drop a decimal digit fails instead of truncating.

use std::cmp::Ordering;

/// Largest representable scale: 10^18 still fits in an i64.
pub const MAX_SCALE: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comp4 {
    raw: i64,
    scale: u8,
    signed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comp4Error {
    /// Negative raw integer in an unsigned declaration.
    NegativeUnsigned(i64),
    ScaleTooLarge(u8),
    /// Operands of a binary operation disagree on scale; the machine never
    /// rescales implicitly.
    ScaleMismatch { lhs: u8, rhs: u8 },
    SignednessMismatch,
    Overflow,
    /// Result would drop a decimal digit.
    Inexact,
    DivisionByZero,
}

impl std::fmt::Display for Comp4Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Comp4Error::NegativeUnsigned(raw) => {
                write!(f, "negative raw integer {} in unsigned comp-4", raw)
            }
            Comp4Error::ScaleTooLarge(s) => write!(f, "scale {} exceeds {}", s, MAX_SCALE),
            Comp4Error::ScaleMismatch { lhs, rhs } => {
                write!(f, "scale mismatch: {} vs {}", lhs, rhs)
            }
            Comp4Error::SignednessMismatch => write!(f, "signedness mismatch"),
            Comp4Error::Overflow => write!(f, "comp-4 overflow"),
            Comp4Error::Inexact => write!(f, "inexact comp-4 result"),
            Comp4Error::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl Comp4 {
    pub fn new(signed: bool, scale: u8, raw: i64) -> Result<Self, Comp4Error> {
        if scale > MAX_SCALE {
            return Err(Comp4Error::ScaleTooLarge(scale));
        }
        if !signed && raw < 0 {
            return Err(Comp4Error::NegativeUnsigned(raw));
        }
        Ok(Self { raw, scale, signed })
    }

    /// Unsigned scale-0 truth value, used for comparison results and counts.
    pub fn flag(v: bool) -> Self {
        Self {
            raw: v as i64,
            scale: 0,
            signed: false,
        }
    }

    /// Unsigned scale-0 counter value.
    pub fn count(n: u32) -> Self {
        Self {
            raw: n as i64,
            scale: 0,
            signed: false,
        }
    }

    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Same declaration: signedness and scale both match.
    pub fn conforms_to(&self, other: &Comp4) -> bool {
        self.signed == other.signed && self.scale == other.scale
    }

    fn check_pair(&self, rhs: &Comp4) -> Result<(), Comp4Error> {
        if self.signed != rhs.signed {
            return Err(Comp4Error::SignednessMismatch);
        }
        if self.scale != rhs.scale {
            return Err(Comp4Error::ScaleMismatch {
                lhs: self.scale,
                rhs: rhs.scale,
            });
        }
        Ok(())
    }

    fn pow10(scale: u8) -> i64 {
        10i64.pow(scale as u32)
    }

    fn rebuild(&self, raw: i64) -> Result<Self, Comp4Error> {
        if !self.signed && raw < 0 {
            return Err(Comp4Error::Overflow);
        }
        Ok(Self {
            raw,
            scale: self.scale,
            signed: self.signed,
        })
    }

    pub fn checked_add(&self, rhs: &Comp4) -> Result<Self, Comp4Error> {
        self.check_pair(rhs)?;
        let raw = self.raw.checked_add(rhs.raw).ok_or(Comp4Error::Overflow)?;
        self.rebuild(raw)
    }

    pub fn checked_sub(&self, rhs: &Comp4) -> Result<Self, Comp4Error> {
        self.check_pair(rhs)?;
        let raw = self.raw.checked_sub(rhs.raw).ok_or(Comp4Error::Overflow)?;
        self.rebuild(raw)
    }

    /// Multiply, keeping the shared scale. The raw product sits at scale
    /// `2 * scale`; dividing it back down must be exact.
    pub fn checked_mul(&self, rhs: &Comp4) -> Result<Self, Comp4Error> {
        self.check_pair(rhs)?;
        let product = self.raw.checked_mul(rhs.raw).ok_or(Comp4Error::Overflow)?;
        let unit = Self::pow10(self.scale);
        if product % unit != 0 {
            return Err(Comp4Error::Inexact);
        }
        self.rebuild(product / unit)
    }

    /// Divide, keeping the shared scale. The dividend is pre-scaled by
    /// `10^scale`; the quotient must be exact.
    pub fn checked_div(&self, rhs: &Comp4) -> Result<Self, Comp4Error> {
        self.check_pair(rhs)?;
        if rhs.raw == 0 {
            return Err(Comp4Error::DivisionByZero);
        }
        let unit = Self::pow10(self.scale);
        let dividend = self.raw.checked_mul(unit).ok_or(Comp4Error::Overflow)?;
        if dividend % rhs.raw != 0 {
            return Err(Comp4Error::Inexact);
        }
        self.rebuild(dividend / rhs.raw)
    }

    pub fn compare(&self, rhs: &Comp4) -> Result<Ordering, Comp4Error> {
        self.check_pair(rhs)?;
        Ok(self.raw.cmp(&rhs.raw))
    }
}
