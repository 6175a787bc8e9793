// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    builtin::Builtin,
    lang::{
        AssignmentOperator, BinaryOperator, Function, Literal, LogicalOperator, UnaryOperator,
        UpdateOperator,
    },
};

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Expression {
    Literal(Literal),
    Identifier(String),
    Builtin(Builtin),
    Array(Vec<Expression>),
    Member {
        object: Box<Expression>,
        property: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        argument: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Function(Rc<Function>),
    Assignment {
        operator: AssignmentOperator,
        target: String,
        value: Box<Expression>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        target: String,
    },
}
impl Expression {
    pub fn number(value: f64) -> Self {
        Self::Literal(Literal::Number(value))
    }
    pub fn boolean(value: bool) -> Self {
        Self::Literal(Literal::Boolean(value))
    }
    pub fn null() -> Self {
        Self::Literal(Literal::Null)
    }
    pub fn undefined() -> Self {
        Self::Literal(Literal::Undefined)
    }
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::Identifier(name.into())
    }
    pub fn unary(operator: UnaryOperator, argument: Expression) -> Self {
        Self::Unary {
            operator,
            argument: Box::new(argument),
        }
    }
    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Self {
        Self::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
    pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Self {
        Self::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }
    }
    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            arguments,
        }
    }
    pub fn member(object: Expression, property: Expression) -> Self {
        Self::Member {
            object: Box::new(object),
            property: Box::new(property),
        }
    }
    pub fn function(params: Vec<String>, body: Vec<crate::lang::Statement>) -> Self {
        Self::Function(Rc::new(Function { params, body }))
    }
    pub fn assignment(
        operator: AssignmentOperator,
        target: impl Into<String>,
        value: Expression,
    ) -> Self {
        Self::Assignment {
            operator,
            target: target.into(),
            value: Box::new(value),
        }
    }
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }
    pub fn as_number(&self) -> Option<f64> {
        self.as_literal().and_then(Literal::as_number)
    }
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(name) => Some(name.as_str()),
            _ => None,
        }
    }
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
    /// Whether the identifier occurs anywhere within the expression, including nested function bodies
    pub fn references(&self, name: &str) -> bool {
        match self {
            Self::Literal(_) | Self::Builtin(_) => false,
            Self::Identifier(identifier) => identifier == name,
            Self::Array(items) => items.iter().any(|item| item.references(name)),
            Self::Member { object, property } => {
                object.references(name) || property.references(name)
            }
            Self::Unary { argument, .. } => argument.references(name),
            Self::Binary { left, right, .. } | Self::Logical { left, right, .. } => {
                left.references(name) || right.references(name)
            }
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => test.references(name) || consequent.references(name) || alternate.references(name),
            Self::Call { callee, arguments } => {
                callee.references(name) || arguments.iter().any(|arg| arg.references(name))
            }
            Self::Function(function) => function.references(name),
            Self::Assignment { target, value, .. } => target == name || value.references(name),
            Self::Update { target, .. } => target == name,
        }
    }
    /// Binding strength when rendered as source text (higher binds tighter)
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Literal(Literal::Number(value)) if *value < 0.0 => 16,
            Self::Literal(_) | Self::Identifier(_) | Self::Builtin(_) | Self::Array(_) => 20,
            Self::Member { .. } | Self::Call { .. } => 19,
            Self::Update { prefix: false, .. } => 17,
            Self::Update { prefix: true, .. } | Self::Unary { .. } => 16,
            Self::Binary { operator, .. } => operator.precedence(),
            Self::Logical { operator, .. } => operator.precedence(),
            Self::Conditional { .. } => 4,
            Self::Assignment { .. } | Self::Function(_) => 3,
        }
    }
}
impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}
