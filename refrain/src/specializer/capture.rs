// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::rc::Rc;

use crate::{
    lang::{
        Declaration, DeclarationKind, Expression, ForInit, Function, FunctionDeclaration,
        Statement,
    },
    runtime::{Closure, Environment, Value},
    specializer::{
        closure::{ClosureNames, ClosureTask},
        scope::{Binding, ScopeId, ScopeKind, Scopes},
        SpecializeError, SpecializerOptions,
    },
};

/// Rewrites the body of a runtime closure into a self-contained function declaration.
///
/// Free identifiers are replaced by the values they hold in the closure's environment. Closures
/// reached that way are left as references to a freshly named declaration and returned as tasks
/// for the caller to capture in turn.
pub fn capture_closure(
    name: &str,
    prefix: &str,
    closure: &Closure,
    names: &mut ClosureNames,
    options: &SpecializerOptions,
) -> Result<(FunctionDeclaration, Vec<ClosureTask>), SpecializeError> {
    let mut capture = Capture {
        environment: &closure.environment,
        scopes: Scopes::new(options.hardcoded_builtins.iter().copied()),
        names,
        tasks: Vec::new(),
    };
    let root = capture.scopes.root(ScopeKind::Closure, prefix);
    let function = capture.capture_function_body(&closure.function, root)?;
    Ok((
        FunctionDeclaration {
            name: String::from(name),
            function: Rc::new(function),
        },
        capture.tasks,
    ))
}

struct Capture<'a> {
    environment: &'a Environment,
    scopes: Scopes,
    names: &'a mut ClosureNames,
    tasks: Vec<ClosureTask>,
}
impl<'a> Capture<'a> {
    fn capture_function_body(
        &mut self,
        function: &Function,
        scope: ScopeId,
    ) -> Result<Function, SpecializeError> {
        for param in function.params.iter() {
            self.scopes.define(scope, param.as_str(), Binding::Parameter);
        }
        let block = self.scopes.child(scope, ScopeKind::Block);
        Ok(Function {
            params: function.params.clone(),
            body: self.capture_block(&function.body, block)?,
        })
    }
    fn capture_block(
        &mut self,
        statements: &[Statement],
        scope: ScopeId,
    ) -> Result<Vec<Statement>, SpecializeError> {
        for statement in statements {
            match statement {
                Statement::Function(declaration) => {
                    self.scopes
                        .define(scope, declaration.name.as_str(), Binding::Parameter)
                }
                Statement::Declaration(declaration) => {
                    self.scopes
                        .define(scope, declaration.name.as_str(), declared(declaration))
                }
                _ => {}
            }
        }
        statements
            .iter()
            .map(|statement| self.capture_statement(statement, scope))
            .collect()
    }
    fn capture_statement(
        &mut self,
        statement: &Statement,
        scope: ScopeId,
    ) -> Result<Statement, SpecializeError> {
        match statement {
            Statement::Block(body) => {
                let block = self.scopes.child(scope, ScopeKind::Block);
                Ok(Statement::Block(self.capture_block(body, block)?))
            }
            Statement::Expression(expression) => Ok(Statement::Expression(
                self.capture_expression(expression, scope)?,
            )),
            Statement::Return(value) => Ok(Statement::Return(
                value
                    .as_ref()
                    .map(|value| self.capture_expression(value, scope))
                    .transpose()?,
            )),
            Statement::If {
                test,
                consequent,
                alternate,
            } => Ok(Statement::If {
                test: self.capture_expression(test, scope)?,
                consequent: Box::new(self.capture_statement(consequent, scope)?),
                alternate: alternate
                    .as_ref()
                    .map(|alternate| self.capture_statement(alternate, scope).map(Box::new))
                    .transpose()?,
            }),
            Statement::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = self.scopes.child(scope, ScopeKind::Loop);
                let init = match init {
                    Some(ForInit::Declaration(declaration)) => Some(ForInit::Declaration(
                        self.capture_declaration(declaration, scope)?,
                    )),
                    Some(ForInit::Expression(expression)) => Some(ForInit::Expression(
                        self.capture_expression(expression, scope)?,
                    )),
                    None => None,
                };
                let test = test
                    .as_ref()
                    .map(|test| self.capture_expression(test, scope))
                    .transpose()?;
                let update = update
                    .as_ref()
                    .map(|update| self.capture_expression(update, scope))
                    .transpose()?;
                let body = self.capture_statement(body, scope)?;
                Ok(Statement::For {
                    init,
                    test,
                    update,
                    body: Box::new(body),
                })
            }
            Statement::Declaration(declaration) => Ok(Statement::Declaration(
                self.capture_declaration(declaration, scope)?,
            )),
            Statement::Function(declaration) => {
                let function = self.capture_function(&declaration.function, scope)?;
                Ok(Statement::Function(FunctionDeclaration {
                    name: declaration.name.clone(),
                    function: Rc::new(function),
                }))
            }
        }
    }
    /// Declarations stay in the output so their initializers are evaluated once, where they appear
    fn capture_declaration(
        &mut self,
        declaration: &Declaration,
        scope: ScopeId,
    ) -> Result<Declaration, SpecializeError> {
        let init = declaration
            .init
            .as_ref()
            .map(|init| self.capture_expression(init, scope))
            .transpose()?;
        self.scopes
            .define(scope, declaration.name.as_str(), declared(declaration));
        Ok(Declaration {
            kind: declaration.kind,
            name: declaration.name.clone(),
            init,
        })
    }
    fn capture_function(
        &mut self,
        function: &Function,
        scope: ScopeId,
    ) -> Result<Function, SpecializeError> {
        let scope = self.scopes.child(scope, ScopeKind::Function);
        self.capture_function_body(function, scope)
    }
    fn capture_expression(
        &mut self,
        expression: &Expression,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        match expression {
            Expression::Literal(_) | Expression::Builtin(_) => Ok(expression.clone()),
            Expression::Identifier(name) => self.capture_identifier(name, scope),
            Expression::Array(items) => Ok(Expression::Array(
                items
                    .iter()
                    .map(|item| self.capture_expression(item, scope))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Expression::Member { object, property } => Ok(Expression::member(
                self.capture_expression(object, scope)?,
                self.capture_expression(property, scope)?,
            )),
            Expression::Unary { operator, argument } => Ok(Expression::unary(
                *operator,
                self.capture_expression(argument, scope)?,
            )),
            Expression::Binary {
                operator,
                left,
                right,
            } => Ok(Expression::binary(
                *operator,
                self.capture_expression(left, scope)?,
                self.capture_expression(right, scope)?,
            )),
            Expression::Logical {
                operator,
                left,
                right,
            } => Ok(Expression::logical(
                *operator,
                self.capture_expression(left, scope)?,
                self.capture_expression(right, scope)?,
            )),
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => Ok(Expression::conditional(
                self.capture_expression(test, scope)?,
                self.capture_expression(consequent, scope)?,
                self.capture_expression(alternate, scope)?,
            )),
            Expression::Call { callee, arguments } => Ok(Expression::call(
                self.capture_expression(callee, scope)?,
                arguments
                    .iter()
                    .map(|arg| self.capture_expression(arg, scope))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Expression::Function(function) => Ok(Expression::Function(Rc::new(
                self.capture_function(function, scope)?,
            ))),
            Expression::Assignment {
                operator,
                target,
                value,
            } => {
                self.ensure_writable(target, scope)?;
                Ok(Expression::assignment(
                    *operator,
                    target.as_str(),
                    self.capture_expression(value, scope)?,
                ))
            }
            Expression::Update { target, .. } => {
                self.ensure_writable(target, scope)?;
                Ok(expression.clone())
            }
        }
    }
    fn ensure_writable(&self, name: &str, scope: ScopeId) -> Result<(), SpecializeError> {
        match self.scopes.lookup(scope, name, true)? {
            Some((_, Binding::Variable(_))) => Ok(()),
            _ => Err(SpecializeError::PurityViolation(String::from(name))),
        }
    }
    fn capture_identifier(
        &mut self,
        name: &str,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        match self.scopes.lookup(scope, name, false)? {
            Some((_, Binding::Parameter | Binding::Variable(_))) => {
                Ok(Expression::identifier(name))
            }
            Some((_, Binding::Constant(value) | Binding::Hardcode(value))) => Ok(value),
            None => match self.environment.lookup(name) {
                Some(value) => self.capture_value(&value, name, scope),
                None => Err(SpecializeError::UnboundSymbol(String::from(name))),
            },
        }
    }
    fn capture_value(
        &mut self,
        value: &Value,
        hint: &str,
        scope: ScopeId,
    ) -> Result<Expression, SpecializeError> {
        match value {
            Value::Pair(pair) => {
                let (head, tail) = pair.as_ref();
                Ok(Expression::Array(vec![
                    self.capture_value(head, &format!("{}_0", hint), scope)?,
                    self.capture_value(tail, &format!("{}_1", hint), scope)?,
                ]))
            }
            Value::Closure(closure) => {
                let scopes = &self.scopes;
                let (name, is_new) = self
                    .names
                    .resolve(closure, || scopes.fresh_name(scope, hint));
                if is_new {
                    self.tasks.push(ClosureTask {
                        name: name.clone(),
                        closure: closure.clone(),
                    });
                }
                Ok(Expression::Identifier(name))
            }
            Value::Builtin(builtin) => Ok(Expression::Builtin(*builtin)),
            value => match value.as_literal() {
                Some(literal) => Ok(Expression::Literal(literal)),
                None => Err(SpecializeError::UnsupportedValue(format!(
                    "{} = {}",
                    hint, value
                ))),
            },
        }
    }
}

/// Locals keep their names; the value of a `let` is only tracked once the body is inlined
fn declared(declaration: &Declaration) -> Binding {
    match declaration.kind {
        DeclarationKind::Let => Binding::Variable(Expression::undefined()),
        DeclarationKind::Const => Binding::Parameter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builtin::Builtin,
        lang::{AssignmentOperator, BinaryOperator, Literal},
    };

    fn closure(function: Function, environment: &Environment) -> Rc<Closure> {
        Rc::new(Closure {
            name: None,
            function: Rc::new(function),
            environment: environment.clone(),
        })
    }

    fn arrow(params: &[&str], body: Expression) -> Function {
        Function {
            params: params.iter().map(|param| String::from(*param)).collect(),
            body: vec![Statement::Return(Some(body))],
        }
    }

    fn capture(
        target: &Rc<Closure>,
    ) -> Result<(FunctionDeclaration, Vec<ClosureTask>), SpecializeError> {
        let mut names = ClosureNames::default();
        names.register(target, "wave");
        capture_closure("wave", "c0", target, &mut names, &SpecializerOptions::default())
    }

    #[test]
    fn substitutes_primitive_free_variables() {
        let environment = Environment::global();
        environment.define("duration", Value::Number(2.0));
        let target = closure(
            arrow(
                &["t"],
                Expression::binary(
                    BinaryOperator::GreaterThanOrEqual,
                    Expression::identifier("t"),
                    Expression::identifier("duration"),
                ),
            ),
            &environment,
        );
        let (declaration, tasks) = capture(&target).unwrap();
        assert!(tasks.is_empty());
        assert_eq!(declaration.to_string(), "function wave(t) {\n  return t >= 2;\n}");
    }

    #[test]
    fn discovers_referenced_closures() {
        let environment = Environment::global();
        let inner = closure(arrow(&["x"], Expression::identifier("x")), &environment);
        environment.define("inner", Value::Closure(inner.clone()));
        let target = closure(
            arrow(
                &["t"],
                Expression::call(
                    Expression::identifier("inner"),
                    vec![Expression::identifier("t")],
                ),
            ),
            &environment,
        );
        let (declaration, tasks) = capture(&target).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "$c0B1_inner");
        assert!(Rc::ptr_eq(&tasks[0].closure, &inner));
        assert_eq!(
            declaration.to_string(),
            "function wave(t) {\n  return $c0B1_inner(t);\n}"
        );
    }

    #[test]
    fn reuses_names_for_shared_closures() {
        let environment = Environment::global();
        let inner = closure(arrow(&["x"], Expression::identifier("x")), &environment);
        environment.define("first", Value::Closure(inner.clone()));
        environment.define("second", Value::Closure(inner));
        let target = closure(
            arrow(
                &["t"],
                Expression::binary(
                    BinaryOperator::Add,
                    Expression::call(Expression::identifier("first"), vec![]),
                    Expression::call(Expression::identifier("second"), vec![]),
                ),
            ),
            &environment,
        );
        let (declaration, tasks) = capture(&target).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(
            declaration.to_string(),
            "function wave(t) {\n  return $c0B1_first() + $c0B1_first();\n}"
        );
    }

    #[test]
    fn self_references_use_the_target_name() {
        let environment = Environment::global();
        let target = closure(
            arrow(
                &["t"],
                Expression::call(
                    Expression::identifier("again"),
                    vec![Expression::identifier("t")],
                ),
            ),
            &environment,
        );
        environment.define("again", Value::Closure(target.clone()));
        let mut names = ClosureNames::default();
        names.register(&target, "wave");
        let (declaration, tasks) = capture_closure(
            "wave",
            "c0",
            &target,
            &mut names,
            &SpecializerOptions::default(),
        )
        .unwrap();
        assert!(tasks.is_empty());
        assert!(names.is_referenced("wave"));
        assert_eq!(
            declaration.to_string(),
            "function wave(t) {\n  return wave(t);\n}"
        );
    }

    #[test]
    fn converts_pairs_into_arrays() {
        let environment = Environment::global();
        let first = closure(arrow(&[], Expression::number(1.0)), &environment);
        let second = closure(arrow(&[], Expression::number(2.0)), &environment);
        environment.define(
            "xs",
            Value::list([Value::Closure(first), Value::Closure(second)]),
        );
        let target = closure(arrow(&["t"], Expression::identifier("xs")), &environment);
        let (declaration, tasks) = capture(&target).unwrap();
        let names = tasks
            .iter()
            .map(|task| task.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["$c0B1_xs_0", "$c0B1_xs_1_0"]);
        assert_eq!(
            declaration.to_string(),
            "function wave(t) {\n  return [$c0B1_xs_0, [$c0B1_xs_1_0, null]];\n}"
        );
    }

    #[test]
    fn keeps_declarations_in_place() {
        let environment = Environment::global();
        environment.define("scale", Value::Number(3.0));
        let target = closure(
            Function {
                params: vec![String::from("t")],
                body: vec![
                    Statement::Declaration(Declaration {
                        kind: DeclarationKind::Const,
                        name: String::from("k"),
                        init: Some(Expression::identifier("scale")),
                    }),
                    Statement::Declaration(Declaration {
                        kind: DeclarationKind::Let,
                        name: String::from("x"),
                        init: Some(Expression::identifier("k")),
                    }),
                    Statement::Expression(Expression::assignment(
                        AssignmentOperator::AddAssign,
                        "x",
                        Expression::identifier("t"),
                    )),
                    Statement::Return(Some(Expression::identifier("x"))),
                ],
            },
            &environment,
        );
        let (declaration, _) = capture(&target).unwrap();
        assert_eq!(
            declaration.to_string(),
            "function wave(t) {\n  const k = 3;\n  let x = k;\n  x += t;\n  return x;\n}"
        );
    }

    #[test]
    fn keeps_builtins_and_hardcoded_helpers() {
        let environment = Environment::global();
        environment.define("math_sin", Value::Builtin(Builtin::Sin));
        let target = closure(
            arrow(
                &["t"],
                Expression::binary(
                    BinaryOperator::Add,
                    Expression::call(
                        Expression::identifier("math_sin"),
                        vec![Expression::identifier("t")],
                    ),
                    Expression::call(
                        Expression::identifier("length"),
                        vec![Expression::null()],
                    ),
                ),
            ),
            &environment,
        );
        let (declaration, _) = capture(&target).unwrap();
        let Statement::Return(Some(Expression::Binary { left, right, .. })) =
            &declaration.function.body[0]
        else {
            panic!("expected a binary return");
        };
        assert_eq!(
            **left,
            Expression::call(
                Expression::Builtin(Builtin::Sin),
                vec![Expression::identifier("t")]
            )
        );
        assert_eq!(
            **right,
            Expression::call(
                Expression::Builtin(Builtin::Length),
                vec![Expression::Literal(Literal::Null)]
            )
        );
    }

    #[test]
    fn rejects_unbound_symbols() {
        let environment = Environment::global();
        let target = closure(arrow(&["t"], Expression::identifier("missing")), &environment);
        assert_eq!(
            capture(&target).unwrap_err(),
            SpecializeError::UnboundSymbol(String::from("missing"))
        );
    }

    #[test]
    fn rejects_writes_outside_the_closure() {
        let environment = Environment::global();
        environment.define("counter", Value::Number(0.0));
        let target = closure(
            Function {
                params: vec![String::from("t")],
                body: vec![
                    Statement::Expression(Expression::assignment(
                        AssignmentOperator::Assign,
                        "counter",
                        Expression::identifier("t"),
                    )),
                    Statement::Return(Some(Expression::identifier("t"))),
                ],
            },
            &environment,
        );
        assert_eq!(
            capture(&target).unwrap_err(),
            SpecializeError::PurityViolation(String::from("counter"))
        );
    }

    #[test]
    fn allows_writes_to_enclosing_locals_of_nested_functions() {
        let environment = Environment::global();
        let bump = Function {
            params: vec![],
            body: vec![Statement::Expression(Expression::assignment(
                AssignmentOperator::AddAssign,
                "total",
                Expression::number(1.0),
            ))],
        };
        let target = closure(
            Function {
                params: vec![String::from("t")],
                body: vec![
                    Statement::Declaration(Declaration {
                        kind: DeclarationKind::Let,
                        name: String::from("total"),
                        init: Some(Expression::number(0.0)),
                    }),
                    Statement::Function(FunctionDeclaration {
                        name: String::from("bump"),
                        function: Rc::new(bump),
                    }),
                    Statement::Expression(Expression::call(
                        Expression::identifier("bump"),
                        vec![],
                    )),
                    Statement::Return(Some(Expression::identifier("total"))),
                ],
            },
            &environment,
        );
        let (declaration, tasks) = capture(&target).unwrap();
        assert!(tasks.is_empty());
        assert_eq!(declaration.function.body.len(), 4);
    }
}
