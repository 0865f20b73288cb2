//! Unit newtypes and the per-unit system used by the estimator.
//!
//! Input tables carry SI quantities (volts, watts, vars, ohms, farads). The
//! estimator works entirely in per-unit on a fixed apparent-power base of
//! [`BASE_POWER_VA`] and a per-node voltage base equal to the node's rated
//! (line-to-line) voltage. Results are converted back to SI and wrapped in
//! the newtypes below so that a magnitude in volts cannot be confused with a
//! per-unit value or a power.
//!
//! ```
//! use gse_core::units::{PerUnit, Volts};
//!
//! let u = PerUnit(0.95).to_volts(10.5e3);
//! assert!((u.value() - 9975.0).abs() < 1e-9);
//! assert!((u.to_per_unit(10.5e3).value() - 0.95).abs() < 1e-12);
//! # let _ = Volts(0.0);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Apparent-power base of the per-unit system (1 MVA).
pub const BASE_POWER_VA: f64 = 1e6;

/// Impedance base in ohms for a node rated at `u_rated` volts.
#[inline]
pub fn impedance_base(u_rated: f64) -> f64 {
    u_rated * u_rated / BASE_POWER_VA
}

/// Current base in amperes for a node rated at `u_rated` volts.
///
/// Symmetric quantities are three-phase: `I_base = S_base / (√3 · U_base)`.
#[inline]
pub fn current_base(u_rated: f64) -> f64 {
    BASE_POWER_VA / (3f64.sqrt() * u_rated)
}

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw numeric value
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power in watts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Watts(pub f64);

impl_unit_ops!(Watts, "W");

/// Reactive power in volt-amperes reactive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Vars(pub f64);

impl_unit_ops!(Vars, "var");

/// Apparent power in volt-amperes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct VoltAmperes(pub f64);

impl_unit_ops!(VoltAmperes, "VA");

impl Watts {
    /// Apparent power S = √(P² + Q²)
    #[inline]
    pub fn apparent_power(self, q: Vars) -> VoltAmperes {
        VoltAmperes(self.0.hypot(q.0))
    }

    /// Power factor P/S, defined as 1 for a zero apparent power.
    #[inline]
    pub fn power_factor(self, s: VoltAmperes) -> f64 {
        if s.0.abs() < 1e-12 {
            1.0
        } else {
            self.0 / s.0
        }
    }
}

/// Line-to-line voltage magnitude in volts
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Volts(pub f64);

impl_unit_ops!(Volts, "V");

impl Volts {
    #[inline]
    pub fn to_per_unit(self, u_rated: f64) -> PerUnit {
        PerUnit(self.0 / u_rated)
    }
}

/// Current magnitude in amperes
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Amperes(pub f64);

impl_unit_ops!(Amperes, "A");

/// Dimensionless per-unit value
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "pu");

impl PerUnit {
    #[inline]
    pub fn to_volts(self, u_rated: f64) -> Volts {
        Volts(self.0 * u_rated)
    }
}

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Radians(pub f64);

impl_unit_ops!(Radians, "rad");

impl Radians {
    #[inline]
    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }
}
