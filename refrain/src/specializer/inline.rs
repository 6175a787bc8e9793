// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
//! Symbolic evaluation of a captured function body down to a single residual expression.
//!
//! Calls to function values are beta-reduced, statically known branches are selected, mutable
//! locals are tracked as the expression they currently hold and accumulation loops are unrolled.
//! Whatever depends on the root parameters is left behind as residual code.
use std::{collections::HashMap, rc::Rc};

use tracing::trace;

use crate::{
    builtin::Builtin,
    lang::{
        AssignmentOperator, BinaryOperator, Declaration, DeclarationKind, Expression, ForInit,
        Function, Literal, LogicalOperator, Statement, UnaryOperator, UpdateOperator,
    },
    specializer::{
        optimizer::optimize,
        scope::{Binding, ScopeId, ScopeKind, Scopes},
        SpecializeError, SpecializerOptions,
    },
};

/// Reduces a function whose body may contain hoisted declarations to the expression it returns
pub fn inline_function(
    name: &str,
    function: &Function,
    options: &SpecializerOptions,
) -> Result<Expression, SpecializeError> {
    let mut inliner = Inliner {
        scopes: Scopes::new(options.hardcoded_builtins.iter().copied()),
        options,
        origins: HashMap::new(),
        depth: 0,
        branch_floor: 0,
        call_floor: 0,
    };
    let root = inliner.scopes.root(ScopeKind::Closure, name);
    for param in function.params.iter() {
        inliner
            .scopes
            .define(root, param.as_str(), Binding::Parameter);
    }
    let block = inliner.scopes.child(root, ScopeKind::Block);
    match inliner.inline_block(&function.body, block, true)? {
        Flow::Return(value) => Ok(value),
        Flow::Continue => Ok(Expression::undefined()),
    }
}

#[derive(PartialEq, Clone, Debug)]
enum Flow {
    Continue,
    Return(Expression),
}

struct Inliner<'a> {
    scopes: Scopes,
    options: &'a SpecializerOptions,
    /// Defining scope of every function value, keyed by allocation (the entry keeps it alive)
    origins: HashMap<*const Function, (Rc<Function>, ScopeId)>,
    depth: usize,
    /// Variables owned by frames allocated before this index may not be written
    branch_floor: usize,
    /// First frame allocated by the function body currently being reduced
    call_floor: usize,
}
impl<'a> Inliner<'a> {
    fn instantiate(&mut self, function: &Function, scope: ScopeId) -> Rc<Function> {
        let instance = Rc::new(function.clone());
        self.origins
            .insert(Rc::as_ptr(&instance), (instance.clone(), scope));
        instance
    }
    /// Runs the callback with writes to pre-existing variables forbidden
    fn in_branch<T>(
        &mut self,
        callback: impl FnOnce(&mut Self) -> Result<T, SpecializeError>,
    ) -> Result<T, SpecializeError> {
        let floor = std::mem::replace(&mut self.branch_floor, self.scopes.len());
        let result = callback(self);
        self.branch_floor = floor;
        result
    }
    fn inline_block(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
        tail: bool,
    ) -> Result<Flow, SpecializeError> {
        for statement in statements {
            if let Statement::Function(declaration) = statement {
                let instance = self.instantiate(&declaration.function, scope);
                self.scopes.define(
                    scope,
                    declaration.name.as_str(),
                    Binding::Constant(Expression::Function(instance)),
                );
            }
        }
        for (index, statement) in statements.iter().enumerate() {
            let is_last = index + 1 == statements.len();
            let flow = match statement {
                Statement::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    let rest = &statements[index + 1..];
                    let test = self.inline_expression(test, scope)?;
                    match test.as_literal() {
                        Some(literal) => {
                            let branch = if literal.is_truthy() {
                                Some(&**consequent)
                            } else {
                                alternate.as_deref()
                            };
                            match branch {
                                Some(branch) => {
                                    self.inline_statement(branch, scope, tail && is_last)?
                                }
                                None => Flow::Continue,
                            }
                        }
                        None => {
                            let consequent = self.in_branch(|inliner| {
                                inliner.inline_statement(consequent, scope, tail && is_last)
                            })?;
                            let alternate = match alternate {
                                Some(alternate) => self.in_branch(|inliner| {
                                    inliner.inline_statement(alternate, scope, tail && is_last)
                                })?,
                                None => Flow::Continue,
                            };
                            match (consequent, alternate) {
                                (Flow::Continue, Flow::Continue) => Flow::Continue,
                                (consequent, alternate) => {
                                    return self.merge_branches(
                                        test, consequent, alternate, rest, scope, tail,
                                    )
                                }
                            }
                        }
                    }
                }
                Statement::Function(_) => Flow::Continue,
                statement => self.inline_statement(statement, scope, tail && is_last)?,
            };
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
        }
        Ok(Flow::Continue)
    }
    /// Combines the outcome of a residual `if` with the statements following it
    fn merge_branches(
        &mut self,
        test: Expression,
        consequent: Flow,
        alternate: Flow,
        rest: &[Statement],
        scope: ScopeId,
        tail: bool,
    ) -> Result<Flow, SpecializeError> {
        let needs_rest = consequent == Flow::Continue || alternate == Flow::Continue;
        let rest = if needs_rest {
            // Only the fall-through path reaches these statements and the enclosing function
            // returns right after them, so they may still update its own locals
            let block = self.scopes.child(scope, ScopeKind::Block);
            let raised = self.branch_floor.max(self.call_floor);
            let floor = std::mem::replace(&mut self.branch_floor, raised);
            let rest = self.inline_block(rest, block, tail);
            self.branch_floor = floor;
            rest?
        } else {
            Flow::Continue
        };
        let resolve = |flow: Flow| match flow {
            Flow::Continue => rest.clone(),
            flow => flow,
        };
        let finish = |flow: Flow| match flow {
            Flow::Return(value) => Ok(value),
            Flow::Continue if tail => Ok(Expression::undefined()),
            Flow::Continue => Err(SpecializeError::UnsupportedNode(String::from(
                "Conditional return inside a nested block that can fall through",
            ))),
        };
        let consequent = finish(resolve(consequent))?;
        let alternate = finish(resolve(alternate))?;
        Ok(Flow::Return(optimize(Expression::conditional(
            test, consequent, alternate,
        ))))
    }
    fn inline_statement(
        &mut self,
        statement: &Statement,
        scope: ScopeId,
        tail: bool,
    ) -> Result<Flow, SpecializeError> {
        match statement {
            Statement::Block(body) => {
                let block = self.scopes.child(scope, ScopeKind::Block);
                self.inline_block(body, block, tail)
            }
            Statement::If { .. } | Statement::Function(_) => {
                let block = self.scopes.child(scope, ScopeKind::Block);
                self.inline_block(std::slice::from_ref(statement), block, tail)
            }
            Statement::Expression(expression) => {
                self.inline_expression(expression, scope)?;
                Ok(Flow::Continue)
            }
            Statement::Return(value) => Ok(Flow::Return(match value {
                Some(value) => self.inline_expression(value, scope)?,
                None => Expression::undefined(),
            })),
            Statement::Declaration(declaration) => {
                self.inline_declaration(declaration, scope)?;
                Ok(Flow::Continue)
            }
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                self.inline_loop(init.as_ref(), test.as_ref(), update.as_ref(), body, scope)?;
                Ok(Flow::Continue)
            }
        }
    }
    fn inline_declaration(
        &mut self,
        declaration: &Declaration,
        scope: ScopeId,
    ) -> Result<(), SpecializeError> {
        let value = match &declaration.init {
            Some(init) => self.inline_expression(init, scope)?,
            None => Expression::undefined(),
        };
        let binding = match declaration.kind {
            DeclarationKind::Let => Binding::Variable(value),
            DeclarationKind::Const => Binding::Constant(value),
        };
        self.scopes
            .define(scope, declaration.name.as_str(), binding);
        Ok(())
    }
    fn inline_expression(
        &mut self,
        expression: &Expression,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        match expression {
            Expression::Literal(_) | Expression::Builtin(_) => Ok(expression.clone()),
            Expression::Identifier(name) => match self.scopes.lookup(scope, name, false)? {
                Some((_, Binding::Parameter)) => Ok(expression.clone()),
                Some((
                    _,
                    Binding::Variable(value) | Binding::Constant(value) | Binding::Hardcode(value),
                )) => Ok(value),
                None => Err(SpecializeError::InternalConsistency(format!(
                    "Unresolved identifier {} after capture",
                    name
                ))),
            },
            Expression::Array(items) => Ok(Expression::Array(
                items
                    .iter()
                    .map(|item| self.inline_expression(item, scope))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Expression::Member { object, property } => {
                let object = self.inline_expression(object, scope)?;
                let property = self.inline_expression(property, scope)?;
                self.inline_member(object, property)
            }
            Expression::Unary { operator, argument } => Ok(optimize(Expression::unary(
                *operator,
                self.inline_expression(argument, scope)?,
            ))),
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.inline_expression(left, scope)?;
                let right = self.inline_expression(right, scope)?;
                Ok(optimize(Expression::binary(*operator, left, right)))
            }
            Expression::Logical {
                operator,
                left,
                right,
            } => {
                let left = self.inline_expression(left, scope)?;
                match left.as_literal() {
                    Some(literal) => {
                        let selects_left = matches!(
                            (operator, literal.is_truthy()),
                            (LogicalOperator::And, false) | (LogicalOperator::Or, true)
                        );
                        if selects_left {
                            Ok(left)
                        } else {
                            self.inline_expression(right, scope)
                        }
                    }
                    None => {
                        let right =
                            self.in_branch(|inliner| inliner.inline_expression(right, scope))?;
                        Ok(optimize(Expression::logical(*operator, left, right)))
                    }
                }
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.inline_expression(test, scope)?;
                match test.as_literal() {
                    Some(literal) if literal.is_truthy() => {
                        self.inline_expression(consequent, scope)
                    }
                    Some(_) => self.inline_expression(alternate, scope),
                    None => {
                        let consequent = self
                            .in_branch(|inliner| inliner.inline_expression(consequent, scope))?;
                        let alternate = self
                            .in_branch(|inliner| inliner.inline_expression(alternate, scope))?;
                        Ok(optimize(Expression::conditional(
                            test, consequent, alternate,
                        )))
                    }
                }
            }
            Expression::Call { callee, arguments } => {
                let callee = self.inline_expression(callee, scope)?;
                let arguments = arguments
                    .iter()
                    .map(|arg| self.inline_expression(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.inline_call(callee, arguments, scope)
            }
            Expression::Function(function) => {
                Ok(Expression::Function(self.instantiate(function, scope)))
            }
            Expression::Assignment {
                operator,
                target,
                value,
            } => {
                let value = self.inline_expression(value, scope)?;
                self.assign(target, scope, |current| match operator.binary_operator() {
                    Some(operator) => optimize(Expression::binary(operator, current, value)),
                    None => value,
                })
                .map(|(_, updated)| updated)
            }
            Expression::Update {
                operator,
                prefix,
                target,
            } => {
                let (previous, updated) = self.assign(target, scope, |current| {
                    optimize(Expression::binary(
                        operator.binary_operator(),
                        current,
                        Expression::number(1.0),
                    ))
                })?;
                Ok(if *prefix {
                    updated
                } else {
                    optimize(Expression::unary(UnaryOperator::Plus, previous))
                })
            }
        }
    }
    /// Replaces the current value of a variable, returning its previous and updated values
    fn assign(
        &mut self,
        target: &str,
        scope: ScopeId,
        update: impl FnOnce(Expression) -> Expression,
    ) -> Result<(Expression, Expression), SpecializeError> {
        let (owner, current) = match self.scopes.lookup(scope, target, true)? {
            Some((owner, Binding::Variable(current))) => (owner, current),
            Some(_) => return Err(SpecializeError::PurityViolation(String::from(target))),
            None => return Err(SpecializeError::UnboundSymbol(String::from(target))),
        };
        if owner.index() < self.branch_floor {
            return Err(SpecializeError::UnsupportedNode(format!(
                "Assignment to {} under a condition that is not statically known",
                target
            )));
        }
        let updated = update(current.clone());
        self.scopes.assign(owner, target, updated.clone())?;
        Ok((current, updated))
    }
    fn inline_member(
        &mut self,
        object: Expression,
        property: Expression,
    ) -> Result<Expression, SpecializeError> {
        match (&object, property.as_number()) {
            (Expression::Array(items), Some(index)) => Ok(if index >= 0.0 && index.fract() == 0.0 {
                items
                    .get(index as usize)
                    .cloned()
                    .unwrap_or_else(Expression::undefined)
            } else {
                Expression::undefined()
            }),
            (Expression::Literal(literal), _) => Err(SpecializeError::UnsupportedValue(format!(
                "Property access on {}",
                literal
            ))),
            _ => Ok(Expression::member(object, property)),
        }
    }
    fn inline_call(
        &mut self,
        callee: Expression,
        arguments: Vec<Expression>,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        match callee {
            Expression::Function(function) => self.beta_reduce(function, arguments, scope),
            Expression::Builtin(Builtin::Length) => {
                let list = arguments.into_iter().next().unwrap_or_else(Expression::undefined);
                list_length(&list)
                    .map(|length| Expression::number(length as f64))
                    .ok_or_else(|| SpecializeError::NonConcreteList(list.to_string()))
            }
            Expression::Builtin(Builtin::List) => Ok(arguments
                .into_iter()
                .rev()
                .fold(Expression::null(), |tail, head| {
                    Expression::Array(vec![head, tail])
                })),
            Expression::Builtin(builtin) if self.options.residual_builtins.contains(&builtin) => {
                if builtin.is_deterministic() {
                    let literals = arguments
                        .iter()
                        .map(|arg| arg.as_literal().map(Literal::to_number))
                        .collect::<Option<Vec<_>>>();
                    if let Some(value) = literals.and_then(|args| builtin.evaluate(&args)) {
                        return Ok(Expression::number(value));
                    }
                }
                Ok(Expression::call(Expression::Builtin(builtin), arguments))
            }
            callee => Err(SpecializeError::UnsupportedCall(callee.to_string())),
        }
    }
    fn beta_reduce(
        &mut self,
        function: Rc<Function>,
        arguments: Vec<Expression>,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        if self.depth >= self.options.max_inline_depth {
            return Err(SpecializeError::RecursionLimit(format!(
                "{} nested calls while inlining {}",
                self.depth, function
            )));
        }
        let origin = self
            .origins
            .get(&Rc::as_ptr(&function))
            .map(|(_, origin)| *origin)
            .unwrap_or(scope);
        let substitute = self.scopes.child(origin, ScopeKind::Substitute);
        let mut arguments = arguments.into_iter();
        for param in function.params.iter() {
            let value = arguments.next().unwrap_or_else(Expression::undefined);
            self.scopes
                .define(substitute, param.as_str(), Binding::Constant(value));
        }
        trace!(depth = self.depth, params = function.params.len(), "Beta-reducing function");
        let block = self.scopes.child(substitute, ScopeKind::Block);
        let call_floor = std::mem::replace(&mut self.call_floor, substitute.index());
        self.depth += 1;
        let result = self.inline_block(&function.body, block, true);
        self.depth -= 1;
        self.call_floor = call_floor;
        match result? {
            Flow::Return(value) => Ok(optimize(value)),
            Flow::Continue => Ok(Expression::undefined()),
        }
    }
    fn inline_loop(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        scope: ScopeId,
    ) -> Result<(), SpecializeError> {
        let (counter, start) = match init {
            Some(ForInit::Declaration(Declaration {
                kind: DeclarationKind::Let,
                name,
                init: Some(init),
            })) => match self.inline_expression(init, scope)?.as_number() {
                Some(start) => (name.as_str(), start),
                None => {
                    return Err(SpecializeError::UnsupportedLoop(format!(
                        "Loop counter {} must start from a number literal",
                        name
                    )))
                }
            },
            _ => {
                return Err(SpecializeError::UnsupportedLoop(String::from(
                    "Loop must declare its counter with let",
                )))
            }
        };
        let (inclusive, bound) = match test {
            Some(Expression::Binary {
                operator: operator @ (BinaryOperator::LessThan | BinaryOperator::LessThanOrEqual),
                left,
                right,
            }) if left.as_identifier() == Some(counter) => {
                match self.inline_expression(right, scope)?.as_number() {
                    Some(bound) => (*operator == BinaryOperator::LessThanOrEqual, bound),
                    None => {
                        return Err(SpecializeError::UnsupportedLoop(format!(
                            "Loop bound for {} must be statically known",
                            counter
                        )))
                    }
                }
            }
            _ => {
                return Err(SpecializeError::UnsupportedLoop(format!(
                    "Loop test must compare {} against an upper bound",
                    counter
                )))
            }
        };
        let is_increment = match update.cloned().map(optimize) {
            Some(Expression::Update {
                operator: UpdateOperator::Increment,
                target,
                ..
            }) => target == counter,
            Some(Expression::Assignment {
                operator: AssignmentOperator::AddAssign,
                target,
                value,
            }) => target == counter && value.as_number() == Some(1.0),
            _ => false,
        };
        if !is_increment {
            return Err(SpecializeError::UnsupportedLoop(format!(
                "Loop must increment {} by one",
                counter
            )));
        }
        let accumulation = match body {
            Statement::Expression(expression) => Some(expression),
            Statement::Block(body) => match body.as_slice() {
                [Statement::Expression(expression)] => Some(expression),
                _ => None,
            },
            _ => None,
        };
        let (accumulator, term) = match accumulation.cloned().map(optimize) {
            Some(Expression::Assignment {
                operator: AssignmentOperator::AddAssign,
                target,
                value,
            }) if target != counter && !value.references(&target) => (target, *value),
            _ => {
                return Err(SpecializeError::UnsupportedLoop(String::from(
                    "Loop body must be a single += accumulation",
                )))
            }
        };
        let loop_scope = self.scopes.child(scope, ScopeKind::Loop);
        let mut terms = Vec::new();
        let mut index = start;
        while if inclusive { index <= bound } else { index < bound } {
            if terms.len() >= self.options.max_loop_iterations {
                return Err(SpecializeError::UnsupportedLoop(format!(
                    "Loop over {} exceeds {} iterations",
                    counter, self.options.max_loop_iterations
                )));
            }
            let iteration = self.scopes.child(loop_scope, ScopeKind::Loop);
            self.scopes.define(
                iteration,
                counter,
                Binding::Constant(Expression::number(index)),
            );
            terms.push(self.inline_expression(&term, iteration)?);
            index += 1.0;
        }
        trace!(counter = %counter, iterations = terms.len(), "Unrolled loop");
        let mut terms = terms.into_iter();
        let sum = match terms.next() {
            Some(first) => terms.fold(first, |sum, term| {
                optimize(Expression::binary(BinaryOperator::Add, sum, term))
            }),
            None => return Ok(()),
        };
        self.assign(&accumulator, scope, |current| {
            optimize(Expression::binary(BinaryOperator::Add, current, sum))
        })?;
        Ok(())
    }
}

fn list_length(list: &Expression) -> Option<usize> {
    let mut current = list;
    let mut length = 0;
    loop {
        match current {
            Expression::Literal(Literal::Null) => return Some(length),
            Expression::Array(items) if items.len() == 2 => {
                length += 1;
                current = &items[1];
            }
            _ => return None,
        }
    }
}
