// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::lang::Expression;

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}
impl Function {
    pub fn references(&self, name: &str) -> bool {
        self.body.iter().any(|statement| statement.references(name))
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub function: Rc<Function>,
}

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum DeclarationKind {
    Let,
    Const,
}
impl std::fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Let => write!(f, "let"),
            Self::Const => write!(f, "const"),
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub init: Option<Expression>,
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum ForInit {
    Declaration(Declaration),
    Expression(Expression),
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub enum Statement {
    Block(Vec<Statement>),
    Expression(Expression),
    Return(Option<Expression>),
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
    },
    Declaration(Declaration),
    Function(FunctionDeclaration),
}
impl Statement {
    pub fn references(&self, name: &str) -> bool {
        match self {
            Self::Block(body) => body.iter().any(|statement| statement.references(name)),
            Self::Expression(expression) => expression.references(name),
            Self::Return(value) => value
                .as_ref()
                .map(|value| value.references(name))
                .unwrap_or(false),
            Self::If {
                test,
                consequent,
                alternate,
            } => {
                test.references(name)
                    || consequent.references(name)
                    || alternate
                        .as_ref()
                        .map(|alternate| alternate.references(name))
                        .unwrap_or(false)
            }
            Self::For {
                init,
                test,
                update,
                body,
            } => {
                let init = match init {
                    Some(ForInit::Declaration(declaration)) => declaration
                        .init
                        .as_ref()
                        .map(|init| init.references(name))
                        .unwrap_or(false),
                    Some(ForInit::Expression(expression)) => expression.references(name),
                    None => false,
                };
                init || [test, update]
                    .into_iter()
                    .flatten()
                    .any(|expression| expression.references(name))
                    || body.references(name)
            }
            Self::Declaration(declaration) => declaration
                .init
                .as_ref()
                .map(|init| init.references(name))
                .unwrap_or(false),
            Self::Function(declaration) => declaration.function.references(name),
        }
    }
}
