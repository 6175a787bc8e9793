// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use serde::{Deserialize, Serialize};

use crate::{builtin::pow, lang::Literal};

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
    TypeOf,
}
impl UnaryOperator {
    pub fn evaluate(&self, argument: &Literal) -> Literal {
        match self {
            Self::Minus => Literal::Number(-argument.to_number()),
            Self::Plus => Literal::Number(argument.to_number()),
            Self::Not => Literal::Boolean(!argument.is_truthy()),
            Self::TypeOf => Literal::String(String::from(argument.type_of())),
        }
    }
}
impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minus => write!(f, "-"),
            Self::Plus => write!(f, "+"),
            Self::Not => write!(f, "!"),
            Self::TypeOf => write!(f, "typeof "),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Exponent,
    StrictEqual,
    StrictNotEqual,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}
impl BinaryOperator {
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Exponent => 15,
            Self::Multiply | Self::Divide | Self::Remainder => 14,
            Self::Add | Self::Subtract => 13,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual => {
                11
            }
            Self::StrictEqual | Self::StrictNotEqual | Self::Equal | Self::NotEqual => 10,
        }
    }
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual
        )
    }
    pub fn is_right_associative(&self) -> bool {
        matches!(self, Self::Exponent)
    }
    pub fn evaluate(&self, left: &Literal, right: &Literal) -> Literal {
        match self {
            Self::Add => match (left, right) {
                (Literal::String(_), _) | (_, Literal::String(_)) => {
                    Literal::String(format!("{}{}", left.to_js_string(), right.to_js_string()))
                }
                _ => Literal::Number(left.to_number() + right.to_number()),
            },
            Self::Subtract => Literal::Number(left.to_number() - right.to_number()),
            Self::Multiply => Literal::Number(left.to_number() * right.to_number()),
            Self::Divide => Literal::Number(left.to_number() / right.to_number()),
            Self::Remainder => Literal::Number(left.to_number() % right.to_number()),
            Self::Exponent => Literal::Number(pow(left.to_number(), right.to_number())),
            Self::StrictEqual => Literal::Boolean(left == right),
            Self::StrictNotEqual => Literal::Boolean(left != right),
            Self::Equal => Literal::Boolean(loose_equals(left, right)),
            Self::NotEqual => Literal::Boolean(!loose_equals(left, right)),
            Self::LessThan => Literal::Boolean(compare(left, right, |ordering| ordering.is_lt())),
            Self::LessThanOrEqual => {
                Literal::Boolean(compare(left, right, |ordering| ordering.is_le()))
            }
            Self::GreaterThan => Literal::Boolean(compare(left, right, |ordering| ordering.is_gt())),
            Self::GreaterThanOrEqual => {
                Literal::Boolean(compare(left, right, |ordering| ordering.is_ge()))
            }
        }
    }
}
impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Add => "+",
                Self::Subtract => "-",
                Self::Multiply => "*",
                Self::Divide => "/",
                Self::Remainder => "%",
                Self::Exponent => "**",
                Self::StrictEqual => "===",
                Self::StrictNotEqual => "!==",
                Self::Equal => "==",
                Self::NotEqual => "!=",
                Self::LessThan => "<",
                Self::LessThanOrEqual => "<=",
                Self::GreaterThan => ">",
                Self::GreaterThanOrEqual => ">=",
            }
        )
    }
}

fn compare(left: &Literal, right: &Literal, predicate: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    let ordering = match (left, right) {
        (Literal::String(left), Literal::String(right)) => Some(left.cmp(right)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    };
    ordering.map(predicate).unwrap_or(false)
}

fn loose_equals(left: &Literal, right: &Literal) -> bool {
    match (left, right) {
        (Literal::Null | Literal::Undefined, Literal::Null | Literal::Undefined) => true,
        (Literal::Null | Literal::Undefined, _) | (_, Literal::Null | Literal::Undefined) => false,
        (Literal::String(_), Literal::String(_))
        | (Literal::Number(_), Literal::Number(_))
        | (Literal::Boolean(_), Literal::Boolean(_)) => left == right,
        _ => left.to_number() == right.to_number(),
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}
impl LogicalOperator {
    pub fn precedence(&self) -> u8 {
        match self {
            Self::And => 7,
            Self::Or => 6,
        }
    }
    /// Returns whichever operand the short-circuiting operator selects.
    pub fn select<'a, T>(&self, left: &'a T, right: &'a T, left_is_truthy: bool) -> &'a T {
        match (self, left_is_truthy) {
            (Self::And, true) | (Self::Or, false) => right,
            (Self::And, false) | (Self::Or, true) => left,
        }
    }
}
impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    RemainderAssign,
}
impl AssignmentOperator {
    /// The binary operator combining the current value with the assigned one, if any
    pub fn binary_operator(&self) -> Option<BinaryOperator> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(BinaryOperator::Add),
            Self::SubtractAssign => Some(BinaryOperator::Subtract),
            Self::MultiplyAssign => Some(BinaryOperator::Multiply),
            Self::DivideAssign => Some(BinaryOperator::Divide),
            Self::RemainderAssign => Some(BinaryOperator::Remainder),
        }
    }
}
impl std::fmt::Display for AssignmentOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.binary_operator() {
            None => write!(f, "="),
            Some(operator) => write!(f, "{}=", operator),
        }
    }
}

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}
impl UpdateOperator {
    pub fn binary_operator(&self) -> BinaryOperator {
        match self {
            Self::Increment => BinaryOperator::Add,
            Self::Decrement => BinaryOperator::Subtract,
        }
    }
}
impl std::fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increment => write!(f, "++"),
            Self::Decrement => write!(f, "--"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(value: f64) -> Literal {
        Literal::Number(value)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(BinaryOperator::Add.evaluate(&number(1.0), &number(2.0)), number(3.0));
        assert_eq!(BinaryOperator::Remainder.evaluate(&number(-7.0), &number(3.0)), number(-1.0));
        assert_eq!(BinaryOperator::Exponent.evaluate(&number(2.0), &number(3.0)), number(8.0));
        assert_eq!(
            BinaryOperator::Add.evaluate(&Literal::String(String::from("a")), &number(1.5)),
            Literal::String(String::from("a1.5"))
        );
        assert_eq!(
            BinaryOperator::Multiply.evaluate(&Literal::Boolean(true), &number(4.0)),
            number(4.0)
        );
        assert!(matches!(
            BinaryOperator::Subtract.evaluate(&Literal::Undefined, &number(1.0)),
            Literal::Number(value) if value.is_nan()
        ));
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            BinaryOperator::LessThan.evaluate(&number(1.0), &number(2.0)),
            Literal::Boolean(true)
        );
        assert_eq!(
            BinaryOperator::GreaterThanOrEqual.evaluate(&number(f64::NAN), &number(2.0)),
            Literal::Boolean(false)
        );
        assert_eq!(
            BinaryOperator::StrictEqual.evaluate(&Literal::Null, &Literal::Undefined),
            Literal::Boolean(false)
        );
        assert_eq!(
            BinaryOperator::Equal.evaluate(&Literal::Null, &Literal::Undefined),
            Literal::Boolean(true)
        );
        assert_eq!(
            BinaryOperator::Equal.evaluate(&Literal::String(String::from("3")), &number(3.0)),
            Literal::Boolean(true)
        );
        assert_eq!(
            BinaryOperator::StrictNotEqual.evaluate(&number(f64::NAN), &number(f64::NAN)),
            Literal::Boolean(true)
        );
    }

    #[test]
    fn unary() {
        assert_eq!(UnaryOperator::Minus.evaluate(&number(1.0)), number(-1.0));
        assert_eq!(UnaryOperator::Not.evaluate(&number(0.0)), Literal::Boolean(true));
        assert_eq!(
            UnaryOperator::TypeOf.evaluate(&Literal::Null),
            Literal::String(String::from("object"))
        );
    }

    #[test]
    fn logical_selection() {
        assert_eq!(*LogicalOperator::And.select(&1, &2, true), 2);
        assert_eq!(*LogicalOperator::And.select(&1, &2, false), 1);
        assert_eq!(*LogicalOperator::Or.select(&1, &2, true), 1);
        assert_eq!(*LogicalOperator::Or.select(&1, &2, false), 2);
    }
}
