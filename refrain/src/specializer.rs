// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    builtin::Builtin,
    lang::{FunctionDeclaration, Literal, Program},
    runtime::{Closure, Environment, Value},
};

pub mod capture;
pub mod closure;
pub mod inline;
pub mod optimizer;
pub mod scope;

mod error;

pub use error::SpecializeError;

/// Runs a program to completion, yielding its top-level bindings
pub trait Evaluate {
    fn evaluate(&self, program: &Program) -> Result<Environment, String>;
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
pub struct SpecializerOptions {
    /// Nested beta-reductions allowed before giving up
    pub max_inline_depth: usize,
    /// Iterations a single loop may unroll to
    pub max_loop_iterations: usize,
    /// Builtins that may be called from specialized output
    pub residual_builtins: Vec<Builtin>,
    /// Builtins resolved by name even when the environment does not bind them
    pub hardcoded_builtins: Vec<Builtin>,
}
impl Default for SpecializerOptions {
    fn default() -> Self {
        Self {
            max_inline_depth: 256,
            max_loop_iterations: 65536,
            residual_builtins: Builtin::math().collect(),
            hardcoded_builtins: vec![Builtin::Length],
        }
    }
}
impl SpecializerOptions {
    pub fn debug() -> Self {
        Self {
            max_inline_depth: 32,
            max_loop_iterations: 1024,
            ..Self::default()
        }
    }
}

#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Specialization {
    Value(Literal),
    Function(FunctionDeclaration),
}
impl std::fmt::Display for Specialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{}", value),
            Self::Function(declaration) => write!(f, "{}", declaration),
        }
    }
}

/// Evaluates the program and specializes the value bound to `target` in its top-level environment
pub fn specialize(
    target: &str,
    program: &Program,
    evaluator: &impl Evaluate,
    options: &SpecializerOptions,
) -> Result<Specialization, SpecializeError> {
    let environment = evaluator
        .evaluate(program)
        .map_err(SpecializeError::Evaluation)?;
    match environment.lookup(target) {
        None => Err(SpecializeError::UnboundSymbol(String::from(target))),
        Some(Value::Closure(closure)) => {
            specialize_closure(target, &closure, options).map(Specialization::Function)
        }
        Some(value) => match value.as_literal() {
            Some(literal) => Ok(Specialization::Value(literal)),
            None => Err(SpecializeError::UnsupportedValue(format!(
                "{} = {}",
                target, value
            ))),
        },
    }
}

pub fn specialize_closure(
    name: &str,
    closure: &Rc<Closure>,
    options: &SpecializerOptions,
) -> Result<FunctionDeclaration, SpecializeError> {
    closure::resolve_closure(name, closure, options)
}
