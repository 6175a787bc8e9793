// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use serde::{Deserialize, Serialize};

use crate::lang::format_number;

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}
impl Literal {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(value) => *value,
            Self::Number(value) => !(value.is_nan() || *value == 0.0),
            Self::String(value) => !value.is_empty(),
        }
    }
    /// Numeric coercion following the host language's `ToNumber` conversion
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(value) => *value,
            Self::String(value) => parse_number(value.trim()),
        }
    }
    pub fn to_js_string(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            _ => format!("{}", self),
        }
    }
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}
impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", format_number(*value)),
            Self::String(value) => match serde_json::to_string(value) {
                Ok(value) => write!(f, "{}", value),
                Err(_) => Err(std::fmt::Error),
            },
        }
    }
}

fn parse_number(input: &str) -> f64 {
    match input {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if input
            .chars()
            .any(|char| char.is_ascii_alphabetic() && char != 'e' && char != 'E') =>
        {
            f64::NAN
        }
        _ => input.parse().unwrap_or(f64::NAN),
    }
}
