// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{
    collections::{HashMap, HashSet, VecDeque},
    rc::Rc,
};

use tracing::debug;

use crate::{
    lang::{Expression, Function, FunctionDeclaration, Statement},
    runtime::Closure,
    specializer::{
        capture::capture_closure, inline::inline_function, SpecializeError, SpecializerOptions,
    },
};

/// A runtime closure awaiting capture under a synthesized name
#[derive(Clone, Debug)]
pub struct ClosureTask {
    pub name: String,
    pub closure: Rc<Closure>,
}

/// Names assigned to closure values, keyed by identity
///
/// No two closures ever share a name: a synthesized name that is already taken gets a numeric
/// suffix until it is free.
#[derive(Default, Debug)]
pub struct ClosureNames {
    names: HashMap<*const Closure, String>,
    taken: HashSet<String>,
    referenced: HashSet<String>,
}
impl ClosureNames {
    pub fn register(&mut self, closure: &Rc<Closure>, name: impl Into<String>) {
        let name = name.into();
        self.taken.insert(name.clone());
        self.names.insert(Rc::as_ptr(closure), name);
    }
    /// Returns the name of the closure, allocating one if this is its first reference
    pub fn resolve(
        &mut self,
        closure: &Rc<Closure>,
        fresh_name: impl FnOnce() -> String,
    ) -> (String, bool) {
        let (name, is_new) = match self.names.get(&Rc::as_ptr(closure)) {
            Some(name) => (name.clone(), false),
            None => {
                let name = self.allocate(fresh_name());
                self.names.insert(Rc::as_ptr(closure), name.clone());
                (name, true)
            }
        };
        self.referenced.insert(name.clone());
        (name, is_new)
    }
    pub fn is_referenced(&self, name: &str) -> bool {
        self.referenced.contains(name)
    }
    fn allocate(&mut self, candidate: String) -> String {
        let mut name = candidate.clone();
        let mut suffix = 0;
        while self.taken.contains(&name) {
            suffix += 1;
            name = format!("{}_{}", candidate, suffix);
        }
        self.taken.insert(name.clone());
        name
    }
}

/// Specializes a runtime closure into a function declaration with a single `return`.
///
/// Every closure reachable from the target is captured into its own unit. The units are then
/// hoisted into the body of the target and the result is inlined down to one residual expression.
pub fn resolve_closure(
    name: &str,
    closure: &Rc<Closure>,
    options: &SpecializerOptions,
) -> Result<FunctionDeclaration, SpecializeError> {
    let mut names = ClosureNames::default();
    names.register(closure, name);
    let mut tasks = vec![ClosureTask {
        name: String::from(name),
        closure: closure.clone(),
    }];
    let mut resolved = HashSet::new();
    let mut units = VecDeque::new();
    while let Some(task) = tasks.pop() {
        if resolved.contains(&task.name) {
            debug!(name = %task.name, "Skipping resolved closure");
            continue;
        }
        let prefix = format!("c{}", resolved.len());
        let (unit, discovered) =
            capture_closure(&task.name, &prefix, &task.closure, &mut names, options)?;
        debug!(
            name = %task.name,
            discovered = discovered.len(),
            pending = tasks.len(),
            "Resolved closure"
        );
        tasks.extend(discovered);
        resolved.insert(task.name);
        units.push_front(unit);
    }
    let root = match units.pop_back() {
        Some(root) if root.name == name => root,
        _ => {
            return Err(SpecializeError::InternalConsistency(format!(
                "Missing root unit for {}",
                name
            )))
        }
    };
    if names.is_referenced(name) {
        units.push_back(root.clone());
    }
    let unit_count = units.len();
    let merged = Function {
        params: root.function.params.clone(),
        body: units
            .into_iter()
            .map(Statement::Function)
            .chain(root.function.body.iter().cloned())
            .collect(),
    };
    let value = inline_function(name, &merged, options)?;
    validate(&value, &merged.params, options)?;
    debug!(name = %name, units = unit_count, "Specialized closure");
    Ok(FunctionDeclaration {
        name: String::from(name),
        function: Rc::new(Function {
            params: merged.params,
            body: vec![Statement::Return(Some(value))],
        }),
    })
}

/// Checks that a specialized expression only depends on the parameters and whitelisted builtins
fn validate(
    expression: &Expression,
    params: &[String],
    options: &SpecializerOptions,
) -> Result<(), SpecializeError> {
    match expression {
        Expression::Literal(_) => Ok(()),
        Expression::Identifier(name) => {
            if params.contains(name) {
                Ok(())
            } else {
                Err(SpecializeError::InternalConsistency(format!(
                    "Free identifier {} in specialized output",
                    name
                )))
            }
        }
        Expression::Builtin(builtin) => Err(SpecializeError::UnsupportedValue(format!(
            "Builtin {} used as a value",
            builtin
        ))),
        Expression::Function(function) => Err(SpecializeError::UnsupportedValue(format!(
            "Function {} escapes specialization",
            function
        ))),
        Expression::Assignment { target, .. } | Expression::Update { target, .. } => {
            Err(SpecializeError::InternalConsistency(format!(
                "Residual write to {}",
                target
            )))
        }
        Expression::Call { callee, arguments } => match callee.as_ref() {
            Expression::Builtin(builtin) if options.residual_builtins.contains(builtin) => {
                arguments
                    .iter()
                    .try_for_each(|arg| validate(arg, params, options))
            }
            callee => Err(SpecializeError::UnsupportedCall(callee.to_string())),
        },
        Expression::Array(items) => items
            .iter()
            .try_for_each(|item| validate(item, params, options)),
        Expression::Member { object, property } => {
            validate(object, params, options)?;
            validate(property, params, options)
        }
        Expression::Unary { argument, .. } => validate(argument, params, options),
        Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
            validate(left, params, options)?;
            validate(right, params, options)
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => {
            validate(test, params, options)?;
            validate(consequent, params, options)?;
            validate(alternate, params, options)
        }
    }
}
