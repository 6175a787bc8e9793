// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Primitive operations known to both the interpreter and the specializer.
///
/// The `Math` functions may survive specialization as residual calls; `Length` and `List` are
/// structural helpers over pair chains and are always resolved statically.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Serialize, Deserialize, EnumIter)]
#[serde(tag = "type")]
pub enum Builtin {
    Abs,
    Acos,
    Acosh,
    Asin,
    Asinh,
    Atan,
    Atanh,
    Atan2,
    Cbrt,
    Ceil,
    Cos,
    Cosh,
    Exp,
    Expm1,
    Floor,
    Fround,
    Hypot,
    Log,
    Log1p,
    Log2,
    Log10,
    Max,
    Min,
    Pow,
    Random,
    Round,
    Sign,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    Trunc,
    Length,
    List,
}
impl Builtin {
    pub fn entries() -> impl Iterator<Item = Self> {
        Self::iter()
    }
    pub fn math() -> impl Iterator<Item = Self> {
        Self::iter().filter(|builtin| builtin.is_math())
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Acos => "acos",
            Self::Acosh => "acosh",
            Self::Asin => "asin",
            Self::Asinh => "asinh",
            Self::Atan => "atan",
            Self::Atanh => "atanh",
            Self::Atan2 => "atan2",
            Self::Cbrt => "cbrt",
            Self::Ceil => "ceil",
            Self::Cos => "cos",
            Self::Cosh => "cosh",
            Self::Exp => "exp",
            Self::Expm1 => "expm1",
            Self::Floor => "floor",
            Self::Fround => "fround",
            Self::Hypot => "hypot",
            Self::Log => "log",
            Self::Log1p => "log1p",
            Self::Log2 => "log2",
            Self::Log10 => "log10",
            Self::Max => "max",
            Self::Min => "min",
            Self::Pow => "pow",
            Self::Random => "random",
            Self::Round => "round",
            Self::Sign => "sign",
            Self::Sin => "sin",
            Self::Sinh => "sinh",
            Self::Sqrt => "sqrt",
            Self::Tan => "tan",
            Self::Tanh => "tanh",
            Self::Trunc => "trunc",
            Self::Length => "length",
            Self::List => "list",
        }
    }
    /// Name under which the builtin is exposed in the global environment of a program
    pub fn global_name(&self) -> String {
        if self.is_math() {
            format!("math_{}", self.name())
        } else {
            String::from(self.name())
        }
    }
    pub fn from_global_name(name: &str) -> Option<Self> {
        match name.strip_prefix("math_") {
            Some(name) => Self::from_math_name(name),
            None => Self::iter().find(|builtin| !builtin.is_math() && builtin.name() == name),
        }
    }
    pub fn from_math_name(name: &str) -> Option<Self> {
        Self::math().find(|builtin| builtin.name() == name)
    }
    pub fn is_math(&self) -> bool {
        !matches!(self, Self::Length | Self::List)
    }
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, Self::Random)
    }
    /// Applies a deterministic `Math` builtin to numeric arguments.
    ///
    /// Missing arguments are treated as `NaN`, matching the host language's `undefined` coercion.
    pub fn evaluate(&self, args: &[f64]) -> Option<f64> {
        let arg = |index: usize| args.get(index).copied().unwrap_or(f64::NAN);
        let x = arg(0);
        Some(match self {
            Self::Abs => x.abs(),
            Self::Acos => x.acos(),
            Self::Acosh => x.acosh(),
            Self::Asin => x.asin(),
            Self::Asinh => x.asinh(),
            Self::Atan => x.atan(),
            Self::Atanh => x.atanh(),
            Self::Atan2 => x.atan2(arg(1)),
            Self::Cbrt => x.cbrt(),
            Self::Ceil => x.ceil(),
            Self::Cos => x.cos(),
            Self::Cosh => x.cosh(),
            Self::Exp => x.exp(),
            Self::Expm1 => x.exp_m1(),
            Self::Floor => x.floor(),
            Self::Fround => x as f32 as f64,
            Self::Hypot => args.iter().fold(0.0, |result: f64, value| result.hypot(*value)),
            Self::Log => x.ln(),
            Self::Log1p => x.ln_1p(),
            Self::Log2 => x.log2(),
            Self::Log10 => x.log10(),
            Self::Max => args.iter().fold(f64::NEG_INFINITY, |result, value| {
                if result.is_nan() || value.is_nan() {
                    f64::NAN
                } else {
                    result.max(*value)
                }
            }),
            Self::Min => args.iter().fold(f64::INFINITY, |result, value| {
                if result.is_nan() || value.is_nan() {
                    f64::NAN
                } else {
                    result.min(*value)
                }
            }),
            Self::Pow => pow(x, arg(1)),
            Self::Round => round(x),
            Self::Sign => {
                if x.is_nan() || x == 0.0 {
                    x
                } else {
                    x.signum()
                }
            }
            Self::Sin => x.sin(),
            Self::Sinh => x.sinh(),
            Self::Sqrt => x.sqrt(),
            Self::Tan => x.tan(),
            Self::Tanh => x.tanh(),
            Self::Trunc => x.trunc(),
            Self::Random | Self::Length | Self::List => return None,
        })
    }
}
impl std::fmt::Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_math() {
            write!(f, "Math.{}", self.name())
        } else {
            write!(f, "{}", self.name())
        }
    }
}

/// Exponentiation with the host language's edge cases (`1 ** NaN` is `NaN`).
pub fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

/// Rounds half-way values towards positive infinity, as `Math.round` does.
pub fn round(value: f64) -> f64 {
    if !value.is_finite() || value.fract() == 0.0 {
        value
    } else {
        (value + 0.5).floor()
    }
}

pub fn math_constants() -> [(&'static str, f64); 8] {
    [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ]
}
