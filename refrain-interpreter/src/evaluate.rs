// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{cell::Cell, rc::Rc};

use refrain::{
    builtin::Builtin,
    lang::{
        BinaryOperator, Declaration, DeclarationKind, Expression, ForInit, Function, Literal,
        LogicalOperator, Statement, UnaryOperator,
    },
    runtime::{Closure, Environment, Value},
};
use tracing::trace;

use crate::InterpreterOptions;

enum Completion {
    Normal,
    Return(Value),
}

pub(crate) struct Evaluator<'a> {
    options: &'a InterpreterOptions,
    depth: Cell<usize>,
}
impl<'a> Evaluator<'a> {
    pub(crate) fn new(options: &'a InterpreterOptions) -> Self {
        Self {
            options,
            depth: Cell::new(0),
        }
    }
    pub(crate) fn execute_program(
        &self,
        statements: &[Statement],
        environment: &Environment,
    ) -> Result<(), String> {
        match self.execute_block(statements, environment)? {
            Completion::Normal => Ok(()),
            Completion::Return(_) => Err(String::from("Illegal return statement")),
        }
    }
    fn execute_block(
        &self,
        statements: &[Statement],
        environment: &Environment,
    ) -> Result<Completion, String> {
        for statement in statements {
            if let Statement::Function(declaration) = statement {
                environment.define(
                    declaration.name.as_str(),
                    create_closure(
                        Some(declaration.name.as_str()),
                        &declaration.function,
                        environment,
                    ),
                );
            }
        }
        for statement in statements {
            if let Completion::Return(value) = self.execute_statement(statement, environment)? {
                return Ok(Completion::Return(value));
            }
        }
        Ok(Completion::Normal)
    }
    fn execute_statement(
        &self,
        statement: &Statement,
        environment: &Environment,
    ) -> Result<Completion, String> {
        match statement {
            Statement::Block(body) => self.execute_block(body, &environment.extend()),
            Statement::Expression(expression) => {
                self.evaluate(expression, environment)?;
                Ok(Completion::Normal)
            }
            Statement::Return(value) => Ok(Completion::Return(match value {
                Some(value) => self.evaluate(value, environment)?,
                None => Value::Undefined,
            })),
            Statement::If {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, environment)?.is_truthy() {
                    self.execute_branch(consequent, environment)
                } else if let Some(alternate) = alternate {
                    self.execute_branch(alternate, environment)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => self.execute_loop(init.as_ref(), test.as_ref(), update.as_ref(), body, environment),
            Statement::Declaration(declaration) => {
                self.execute_declaration(declaration, environment)?;
                Ok(Completion::Normal)
            }
            Statement::Function(_) => Ok(Completion::Normal),
        }
    }
    fn execute_branch(
        &self,
        statement: &Statement,
        environment: &Environment,
    ) -> Result<Completion, String> {
        self.execute_block(std::slice::from_ref(statement), &environment.extend())
    }
    fn execute_declaration(
        &self,
        declaration: &Declaration,
        environment: &Environment,
    ) -> Result<(), String> {
        let value = match &declaration.init {
            Some(Expression::Function(function)) => {
                create_closure(Some(declaration.name.as_str()), function, environment)
            }
            Some(init) => self.evaluate(init, environment)?,
            None => Value::Undefined,
        };
        environment.define(declaration.name.as_str(), value);
        Ok(())
    }
    /// Runs a `for` loop, giving each iteration its own copy of the loop bindings
    fn execute_loop(
        &self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        environment: &Environment,
    ) -> Result<Completion, String> {
        let scope = environment.extend();
        let bindings = match init {
            Some(ForInit::Declaration(declaration)) => {
                self.execute_declaration(declaration, &scope)?;
                match declaration.kind {
                    DeclarationKind::Let => vec![declaration.name.as_str()],
                    DeclarationKind::Const => Vec::new(),
                }
            }
            Some(ForInit::Expression(expression)) => {
                self.evaluate(expression, &scope)?;
                Vec::new()
            }
            None => Vec::new(),
        };
        loop {
            if let Some(test) = test {
                if !self.evaluate(test, &scope)?.is_truthy() {
                    return Ok(Completion::Normal);
                }
            }
            let iteration = scope.extend();
            for name in bindings.iter() {
                iteration.define(*name, scope.lookup(name).unwrap_or(Value::Undefined));
            }
            if let Completion::Return(value) = self.execute_branch(body, &iteration)? {
                return Ok(Completion::Return(value));
            }
            for name in bindings.iter() {
                scope.assign(name, iteration.lookup(name).unwrap_or(Value::Undefined))?;
            }
            if let Some(update) = update {
                self.evaluate(update, &scope)?;
            }
        }
    }
    pub(crate) fn evaluate(
        &self,
        expression: &Expression,
        environment: &Environment,
    ) -> Result<Value, String> {
        match expression {
            Expression::Literal(literal) => Ok(Value::from(literal.clone())),
            Expression::Identifier(name) => environment
                .lookup(name)
                .ok_or_else(|| format!("ReferenceError: {} is not defined", name)),
            Expression::Builtin(builtin) => Ok(Value::Builtin(*builtin)),
            Expression::Array(items) => match items.as_slice() {
                [head, tail] => Ok(Value::pair(
                    self.evaluate(head, environment)?,
                    self.evaluate(tail, environment)?,
                )),
                _ => Err(format!(
                    "Unsupported array literal with {} elements (expected a pair)",
                    items.len()
                )),
            },
            Expression::Member { object, property } => {
                let object = self.evaluate(object, environment)?;
                let property = self.evaluate(property, environment)?;
                get_member(&object, &property)
            }
            Expression::Unary { operator, argument } => {
                let argument = self.evaluate(argument, environment)?;
                Ok(evaluate_unary(*operator, &argument))
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left, environment)?;
                let right = self.evaluate(right, environment)?;
                Ok(evaluate_binary(*operator, &left, &right))
            }
            Expression::Logical {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left, environment)?;
                match (operator, left.is_truthy()) {
                    (LogicalOperator::And, false) | (LogicalOperator::Or, true) => Ok(left),
                    _ => self.evaluate(right, environment),
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.evaluate(test, environment)?.is_truthy() {
                    self.evaluate(consequent, environment)
                } else {
                    self.evaluate(alternate, environment)
                }
            }
            Expression::Call { callee, arguments } => {
                let callee = self.evaluate(callee, environment)?;
                let arguments = arguments
                    .iter()
                    .map(|arg| self.evaluate(arg, environment))
                    .collect::<Result<Vec<_>, _>>()?;
                self.apply(&callee, arguments)
            }
            Expression::Function(function) => Ok(create_closure(None, function, environment)),
            Expression::Assignment {
                operator,
                target,
                value,
            } => {
                let value = self.evaluate(value, environment)?;
                let value = match operator.binary_operator() {
                    Some(operator) => {
                        let current = lookup_target(target, environment)?;
                        evaluate_binary(operator, &current, &value)
                    }
                    None => value,
                };
                environment.assign(target, value.clone())?;
                Ok(value)
            }
            Expression::Update {
                operator,
                prefix,
                target,
            } => {
                let previous = lookup_target(target, environment)?.to_number();
                let updated = evaluate_binary(
                    operator.binary_operator(),
                    &Value::Number(previous),
                    &Value::Number(1.0),
                );
                environment.assign(target, updated.clone())?;
                Ok(if *prefix {
                    updated
                } else {
                    Value::Number(previous)
                })
            }
        }
    }
    pub(crate) fn apply(&self, target: &Value, args: Vec<Value>) -> Result<Value, String> {
        match target {
            Value::Closure(closure) => self.apply_closure(closure, args),
            Value::Builtin(builtin) => apply_builtin(*builtin, args),
            target => Err(format!("TypeError: {} is not a function", target)),
        }
    }
    fn apply_closure(&self, closure: &Closure, args: Vec<Value>) -> Result<Value, String> {
        let depth = self.depth.get();
        if let Some(limit) = self.options.call_stack_size {
            if depth >= limit {
                return Err(String::from("Maximum call stack size exceeded"));
            }
        }
        if self.options.debug_calls {
            trace!(
                name = %closure.name.as_deref().unwrap_or("<anonymous>"),
                args = args.len(),
                depth,
                "Applying closure"
            );
        }
        let environment = closure.environment.extend();
        let mut args = args.into_iter();
        for param in closure.function.params.iter() {
            environment.define(param.as_str(), args.next().unwrap_or(Value::Undefined));
        }
        self.depth.set(depth + 1);
        let result = self.execute_block(&closure.function.body, &environment);
        self.depth.set(depth);
        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal => Ok(Value::Undefined),
        }
    }
}

fn create_closure(name: Option<&str>, function: &Rc<Function>, environment: &Environment) -> Value {
    Value::Closure(Rc::new(Closure {
        name: name.map(String::from),
        function: function.clone(),
        environment: environment.clone(),
    }))
}

fn lookup_target(target: &str, environment: &Environment) -> Result<Value, String> {
    environment
        .lookup(target)
        .ok_or_else(|| format!("ReferenceError: {} is not defined", target))
}

fn get_member(object: &Value, property: &Value) -> Result<Value, String> {
    match object {
        Value::Pair(pair) => Ok(match property.as_number() {
            Some(index) if index == 0.0 => pair.0.clone(),
            Some(index) if index == 1.0 => pair.1.clone(),
            _ => Value::Undefined,
        }),
        Value::Undefined | Value::Null => Err(format!(
            "TypeError: Cannot read properties of {} (reading '{}')",
            object, property
        )),
        _ => Ok(Value::Undefined),
    }
}

/// Converts a value to the primitive it behaves as in arithmetic and comparison
fn to_primitive(value: &Value) -> Literal {
    value
        .as_literal()
        .unwrap_or_else(|| Literal::String(value.to_string()))
}

fn evaluate_unary(operator: UnaryOperator, argument: &Value) -> Value {
    match operator {
        UnaryOperator::TypeOf => Value::String(String::from(argument.type_of())),
        UnaryOperator::Not => Value::Boolean(!argument.is_truthy()),
        operator => Value::from(operator.evaluate(&to_primitive(argument))),
    }
}

fn evaluate_binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    match operator {
        BinaryOperator::StrictEqual => Value::Boolean(left.strict_equals(right)),
        BinaryOperator::StrictNotEqual => Value::Boolean(!left.strict_equals(right)),
        BinaryOperator::Equal | BinaryOperator::NotEqual
            if left.as_literal().is_none() || right.as_literal().is_none() =>
        {
            let equal = match (left.as_literal(), right.as_literal()) {
                (None, None) => left.strict_equals(right),
                (Some(Literal::Null | Literal::Undefined), _)
                | (_, Some(Literal::Null | Literal::Undefined)) => false,
                _ => {
                    let (left, right) = (to_primitive(left), to_primitive(right));
                    BinaryOperator::Equal.evaluate(&left, &right) == Literal::Boolean(true)
                }
            };
            Value::Boolean(equal == (operator == BinaryOperator::Equal))
        }
        operator => Value::from(operator.evaluate(&to_primitive(left), &to_primitive(right))),
    }
}

fn apply_builtin(builtin: Builtin, args: Vec<Value>) -> Result<Value, String> {
    match builtin {
        Builtin::Length => {
            let list = args.first().cloned().unwrap_or(Value::Undefined);
            list.list_length()
                .map(|length| Value::Number(length as f64))
                .ok_or_else(|| format!("length expects a list, received {}", list))
        }
        Builtin::List => Ok(Value::list(args)),
        Builtin::Random => Ok(Value::Number(rand::random::<f64>())),
        builtin => {
            let args = args.iter().map(Value::to_number).collect::<Vec<_>>();
            builtin
                .evaluate(&args)
                .map(Value::Number)
                .ok_or_else(|| format!("{} cannot be applied to numbers", builtin))
        }
    }
}
