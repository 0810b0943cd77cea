// -*- coding: utf-8 -*-
// Copyright (C) 2025 Michael Büsch <m@bues.ch>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Signed Q15.16 fixed point number.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Fixpt(i32);

macro_rules! fixpt {
    ($numerator:literal / $denominator:literal) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:literal / $denominator:ident) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:ident / $denominator:literal) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:ident / $denominator:ident) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:literal) => {
        $crate::fixpt::Fixpt::from_int($numerator)
    };
    ($numerator:ident) => {
        $crate::fixpt::Fixpt::from_int($numerator)
    };
}
pub(crate) use fixpt;

impl Fixpt {
    pub const SHIFT: usize = 16;

    const ONE: i64 = 1 << Self::SHIFT;
    const HALF: i32 = 1 << (Self::SHIFT - 1);

    pub const fn from_int(int: i16) -> Self {
        Self((int as i32) << Self::SHIFT)
    }

    pub const fn from_fraction(numerator: i32, denominator: i32) -> Self {
        if denominator == 0 {
            return Self::from_q_sat(if numerator < 0 { i64::MIN } else { i64::MAX });
        }
        // Round to nearest, ties away from zero.
        let n = (numerator as i64 * Self::ONE).abs();
        let d = (denominator as i64).abs();
        let q = (n + d / 2) / d;
        Self::from_q_sat(if (numerator < 0) != (denominator < 0) { -q } else { q })
    }

    const fn from_q_sat(v: i64) -> Self {
        if v < i32::MIN as i64 {
            Self(i32::MIN)
        } else if v > i32::MAX as i64 {
            Self(i32::MAX)
        } else {
            Self(v as i32)
        }
    }

    /// Convert to integer, rounding to the nearest integer.
    /// Ties are rounded away from zero.
    pub const fn to_int(self) -> i16 {
        let q = self.0 as i64;
        let v = if q >= 0 {
            (q + Self::HALF as i64) >> Self::SHIFT
        } else {
            -((-q + Self::HALF as i64) >> Self::SHIFT)
        };
        if v > i16::MAX as i64 {
            i16::MAX
        } else if v < i16::MIN as i64 {
            i16::MIN
        } else {
            v as i16
        }
    }

    pub const fn to_q(self) -> i32 {
        self.0
    }

    pub const fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub const fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub const fn mul(self, other: Self) -> Self {
        let prod = (self.0 as i64 * other.0 as i64) >> Self::SHIFT;
        Self::from_q_sat(prod)
    }

    pub const fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Self::from_q_sat(if self.0 < 0 { i64::MIN } else { i64::MAX });
        }
        let tmp = (self.0 as i64 * Self::ONE) / other.0 as i64;
        Self::from_q_sat(tmp)
    }

    pub const fn neg(self) -> Self {
        if self.0 == i32::MIN {
            Self(i32::MAX)
        } else {
            Self(-self.0)
        }
    }

    pub const fn const_min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }

    pub const fn const_max(self, other: Self) -> Self {
        if self.0 >= other.0 { self } else { other }
    }
}

impl From<i16> for Fixpt {
    fn from(value: i16) -> Self {
        Self::from_int(value)
    }
}

impl core::ops::Add for Fixpt {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Fixpt::add(self, other)
    }
}

impl core::ops::AddAssign for Fixpt {
    fn add_assign(&mut self, other: Self) {
        self.0 = (*self + other).0;
    }
}

impl core::ops::Sub for Fixpt {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Fixpt::sub(self, other)
    }
}

impl core::ops::SubAssign for Fixpt {
    fn sub_assign(&mut self, other: Self) {
        self.0 = (*self - other).0;
    }
}

impl core::ops::Mul for Fixpt {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Fixpt::mul(self, other)
    }
}

impl core::ops::Div for Fixpt {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Fixpt::div(self, other)
    }
}

impl core::ops::Neg for Fixpt {
    type Output = Self;

    fn neg(self) -> Self {
        Fixpt::neg(self)
    }
}

impl curveipo::CurvePoint<Fixpt> for (Fixpt, Fixpt) {
    fn x(&self) -> Fixpt {
        self.0
    }

    fn y(&self) -> Fixpt {
        self.1
    }
}

impl curveipo::CurveIpo for Fixpt {
    fn lin_inter(
        &self,
        left: &impl curveipo::CurvePoint<Self>,
        right: &impl curveipo::CurvePoint<Self>,
    ) -> Self {
        let dx = right.x() - left.x();
        let dy = right.y() - left.y();
        if dx == fixpt!(0) {
            left.y()
        } else {
            // Multiply first. The slope alone may lose too much precision.
            (((*self - left.x()) * dy) / dx) + left.y()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_fraction() {
        assert_eq!(fixpt!(1 / 2).to_q(), 0x8000);
        assert_eq!(fixpt!(-1 / 4).to_q(), -0x4000);
        assert_eq!(fixpt!(3).to_q(), 3 << 16);
        assert_eq!(Fixpt::from_fraction(1, 0).to_q(), i32::MAX);
        assert_eq!(Fixpt::from_fraction(-1, 0).to_q(), i32::MIN);
        assert_eq!(Fixpt::from_fraction(100_000, 1).to_q(), i32::MAX);
        // 21/20 = 68812.8 / 65536
        assert_eq!(fixpt!(21 / 20).to_q(), 68813);
        assert_eq!(fixpt!(-21 / 20).to_q(), -68813);
        assert_eq!(fixpt!(21 / -20).to_q(), -68813);
        assert_eq!(fixpt!(1 / 3).to_q(), 21845);
        assert_eq!(fixpt!(2 / 3).to_q(), 43691);
    }

    #[test]
    fn test_to_int_rounding() {
        assert_eq!(fixpt!(5 / 2).to_int(), 3);
        assert_eq!(fixpt!(-5 / 2).to_int(), -3);
        assert_eq!(fixpt!(9 / 4).to_int(), 2);
        assert_eq!(fixpt!(-9 / 4).to_int(), -2);
        assert_eq!(fixpt!(11 / 4).to_int(), 3);
        assert_eq!(fixpt!(-11 / 4).to_int(), -3);
        assert_eq!(fixpt!(-2).to_int(), -2);
        assert_eq!(fixpt!(-1).to_int(), -1);
        assert_eq!(fixpt!(-1 / 4).to_int(), 0);
        assert_eq!(fixpt!(-3 / 4).to_int(), -1);
        assert_eq!(Fixpt(i32::MAX).to_int(), i16::MAX);
        assert_eq!(Fixpt(i32::MIN).to_int(), i16::MIN);
    }

    #[test]
    fn test_arith() {
        assert_eq!(fixpt!(3) + fixpt!(1 / 2), fixpt!(7 / 2));
        assert_eq!(fixpt!(3) - fixpt!(5), fixpt!(-2));
        assert_eq!(fixpt!(3) * fixpt!(1 / 2), fixpt!(3 / 2));
        assert_eq!(fixpt!(3) / fixpt!(2), fixpt!(3 / 2));
        assert_eq!(-fixpt!(3), fixpt!(-3));
        assert_eq!((fixpt!(21 / 20) * fixpt!(20)).to_int(), 21);
        assert_eq!((fixpt!(-21 / 20) * fixpt!(20)).to_int(), -21);
    }

    #[test]
    fn test_saturation() {
        let max = Fixpt(i32::MAX);
        let min = Fixpt(i32::MIN);
        assert_eq!(max + fixpt!(1), max);
        assert_eq!(min - fixpt!(1), min);
        assert_eq!(fixpt!(30000) * fixpt!(30000), max);
        assert_eq!(fixpt!(-30000) * fixpt!(30000), min);
        assert_eq!(fixpt!(1) / fixpt!(0), max);
        assert_eq!(fixpt!(-1) / fixpt!(0), min);
        assert_eq!(-min, max);
    }

    #[test]
    fn test_curve() {
        use curveipo::Curve;

        const CURVE: Curve<Fixpt, (Fixpt, Fixpt), 3> = Curve::new([
            (fixpt!(0), fixpt!(0)),
            (fixpt!(10), fixpt!(-20)),
            (fixpt!(30), fixpt!(20)),
        ]);
        assert_eq!(CURVE.lin_inter(fixpt!(5)), fixpt!(-10));
        assert_eq!(CURVE.lin_inter(fixpt!(20)), fixpt!(0));
        assert_eq!(CURVE.lin_inter(fixpt!(25)), fixpt!(10));
    }
}

// vim: ts=4 sw=4 expandtab
