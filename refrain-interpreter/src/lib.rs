// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use refrain::{
    lang::Program,
    runtime::{Environment, Value},
    specializer::Evaluate,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod evaluate;
mod globals;

pub use globals::builtin_globals;

use evaluate::Evaluator;

#[derive(Eq, PartialEq, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InterpreterOptions {
    pub debug_calls: bool,
    pub call_stack_size: Option<usize>,
}
impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            debug_calls: false,
            call_stack_size: Some(1024),
        }
    }
}
impl InterpreterOptions {
    pub fn debug() -> Self {
        Self {
            debug_calls: true,
            ..Self::default()
        }
    }
}

/// Tree-walking evaluator for parsed programs
#[derive(Default, Clone, Debug)]
pub struct Interpreter {
    options: InterpreterOptions,
}
impl Interpreter {
    pub fn new(options: InterpreterOptions) -> Self {
        Self { options }
    }
    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }
    /// Runs every top-level statement, returning the global frame the program populated
    pub fn run(&self, program: &Program) -> Result<Environment, String> {
        let environment = Environment::global();
        builtin_globals(&environment);
        Evaluator::new(&self.options).execute_program(&program.body, &environment)?;
        debug!(bindings = environment.names().len(), "Evaluated program");
        Ok(environment)
    }
    /// Calls a function value with the given arguments
    pub fn apply(&self, target: &Value, args: Vec<Value>) -> Result<Value, String> {
        Evaluator::new(&self.options).apply(target, args)
    }
}
impl Evaluate for Interpreter {
    fn evaluate(&self, program: &Program) -> Result<Environment, String> {
        self.run(program)
    }
}
