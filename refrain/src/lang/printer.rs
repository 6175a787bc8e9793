// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::fmt::{Display, Formatter, Result};

use crate::lang::{
    Declaration, Expression, ForInit, Function, FunctionDeclaration, Literal, Program, Statement,
    UnaryOperator,
};

const INDENT: &str = "  ";

/// Renders a number the way the host language prints it (shortest round-trip form).
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 {
        String::from("0")
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        let formatted = format!("{:e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        format!("{}", value)
    }
}

struct Parenthesized<'a>(&'a Expression, bool);
impl<'a> Display for Parenthesized<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let Self(expression, parenthesized) = self;
        if *parenthesized {
            write!(f, "({})", expression)
        } else {
            write!(f, "{}", expression)
        }
    }
}

fn is_signed(expression: &Expression) -> bool {
    match expression {
        Expression::Literal(Literal::Number(value)) => *value < 0.0,
        Expression::Unary {
            operator: UnaryOperator::Minus | UnaryOperator::Plus,
            ..
        } => true,
        Expression::Update { prefix: true, .. } => true,
        _ => false,
    }
}

fn is_identifier_name(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|char| char.is_ascii_alphanumeric() || char == '_' || char == '$')
        }
        _ => false,
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: impl IntoIterator<Item = T>) -> Result {
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            Self::Literal(literal) => write!(f, "{}", literal),
            Self::Identifier(name) => write!(f, "{}", name),
            Self::Builtin(builtin) => write!(f, "{}", builtin),
            Self::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Self::Member { object, property } => {
                let object = Parenthesized(object, object.precedence() < 19);
                match property.as_literal() {
                    Some(Literal::String(name)) if is_identifier_name(name) => {
                        write!(f, "{}.{}", object, name)
                    }
                    _ => write!(f, "{}[{}]", object, property),
                }
            }
            Self::Unary { operator, argument } => {
                let parenthesized = argument.precedence() < 16
                    || (matches!(operator, UnaryOperator::Minus | UnaryOperator::Plus)
                        && is_signed(argument));
                write!(f, "{}{}", operator, Parenthesized(argument, parenthesized))
            }
            Self::Binary {
                operator,
                left,
                right,
            } => {
                let precedence = operator.precedence();
                let (left_parenthesized, right_parenthesized) = if operator.is_right_associative()
                {
                    (left.precedence() <= 16, right.precedence() < precedence)
                } else {
                    (
                        left.precedence() < precedence,
                        right.precedence() <= precedence,
                    )
                };
                write!(
                    f,
                    "{} {} {}",
                    Parenthesized(left, left_parenthesized),
                    operator,
                    Parenthesized(right, right_parenthesized)
                )
            }
            Self::Logical {
                operator,
                left,
                right,
            } => {
                let precedence = operator.precedence();
                write!(
                    f,
                    "{} {} {}",
                    Parenthesized(left, left.precedence() < precedence),
                    operator,
                    Parenthesized(right, right.precedence() <= precedence)
                )
            }
            Self::Conditional {
                test,
                consequent,
                alternate,
            } => write!(
                f,
                "{} ? {} : {}",
                Parenthesized(test, test.precedence() <= 4),
                Parenthesized(consequent, consequent.precedence() < 3),
                Parenthesized(alternate, alternate.precedence() < 3)
            ),
            Self::Call { callee, arguments } => {
                write!(f, "{}(", Parenthesized(callee, callee.precedence() < 19))?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Self::Function(function) => write!(f, "{}", function),
            Self::Assignment {
                operator,
                target,
                value,
            } => write!(
                f,
                "{} {} {}",
                target,
                operator,
                Parenthesized(value, value.precedence() < 3)
            ),
            Self::Update {
                operator,
                prefix,
                target,
            } => {
                if *prefix {
                    write!(f, "{}{}", operator, target)
                } else {
                    write!(f, "{}{}", target, operator)
                }
            }
        }
    }
}

/// Function values render as arrow functions on a single line.
impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "(")?;
        write_list(f, &self.params)?;
        write!(f, ") => ")?;
        match self.body.as_slice() {
            [Statement::Return(Some(value))] => write!(f, "{}", value),
            body => {
                write!(f, "{{")?;
                for statement in body {
                    write!(f, " ")?;
                    write_statement(f, statement, None)?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match &self.init {
            Some(init) => write!(f, "{} {} = {}", self.kind, self.name, init),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_statement(f, self, Some(0))
    }
}

impl Display for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_function_declaration(f, self, Some(0))
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for (index, statement) in self.body.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write_statement(f, statement, Some(0))?;
        }
        Ok(())
    }
}

// A `None` depth renders the statement on a single line.
fn write_indent(f: &mut Formatter<'_>, depth: Option<usize>) -> Result {
    match depth {
        Some(depth) => write!(f, "{}", INDENT.repeat(depth)),
        None => Ok(()),
    }
}

fn write_body(f: &mut Formatter<'_>, body: &[Statement], depth: Option<usize>) -> Result {
    match depth {
        Some(depth) => {
            writeln!(f, "{{")?;
            for statement in body {
                write_indent(f, Some(depth + 1))?;
                write_statement(f, statement, Some(depth + 1))?;
                writeln!(f)?;
            }
            write_indent(f, Some(depth))?;
            write!(f, "}}")
        }
        None => {
            write!(f, "{{")?;
            for statement in body {
                write!(f, " ")?;
                write_statement(f, statement, None)?;
            }
            write!(f, " }}")
        }
    }
}

fn write_branch(f: &mut Formatter<'_>, statement: &Statement, depth: Option<usize>) -> Result {
    match statement {
        Statement::Block(body) => write_body(f, body, depth),
        statement => write_body(f, std::slice::from_ref(statement), depth),
    }
}

fn write_function_declaration(
    f: &mut Formatter<'_>,
    declaration: &FunctionDeclaration,
    depth: Option<usize>,
) -> Result {
    write!(f, "function {}(", declaration.name)?;
    write_list(f, &declaration.function.params)?;
    write!(f, ") ")?;
    write_body(f, &declaration.function.body, depth)
}

fn write_statement(f: &mut Formatter<'_>, statement: &Statement, depth: Option<usize>) -> Result {
    match statement {
        Statement::Block(body) => write_body(f, body, depth),
        Statement::Expression(expression) => match expression {
            Expression::Function(_) => write!(f, "({});", expression),
            _ => write!(f, "{};", expression),
        },
        Statement::Return(None) => write!(f, "return;"),
        Statement::Return(Some(value)) => write!(f, "return {};", value),
        Statement::If {
            test,
            consequent,
            alternate,
        } => {
            write!(f, "if ({}) ", test)?;
            write_branch(f, consequent, depth)?;
            match alternate.as_deref() {
                None => Ok(()),
                Some(alternate @ Statement::If { .. }) => {
                    write!(f, " else ")?;
                    write_statement(f, alternate, depth)
                }
                Some(alternate) => {
                    write!(f, " else ")?;
                    write_branch(f, alternate, depth)
                }
            }
        }
        Statement::For {
            init,
            test,
            update,
            body,
        } => {
            write!(f, "for (")?;
            match init {
                Some(ForInit::Declaration(declaration)) => write!(f, "{}", declaration)?,
                Some(ForInit::Expression(expression)) => write!(f, "{}", expression)?,
                None => {}
            }
            write!(f, ";")?;
            if let Some(test) = test {
                write!(f, " {}", test)?;
            }
            write!(f, ";")?;
            if let Some(update) = update {
                write!(f, " {}", update)?;
            }
            write!(f, ") ")?;
            write_branch(f, body, depth)
        }
        Statement::Declaration(declaration) => write!(f, "{};", declaration),
        Statement::Function(declaration) => write_function_declaration(f, declaration, depth),
    }
}
