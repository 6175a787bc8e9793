// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{path::Path, rc::Rc};

use refrain::{
    builtin::{math_constants, Builtin},
    lang::{
        AssignmentOperator, BinaryOperator, Declaration, DeclarationKind, Expression, ForInit,
        Function, FunctionDeclaration, Literal, LogicalOperator, Program, Statement,
        UnaryOperator, UpdateOperator,
    },
};
use swc_core::{
    common::{sync::Lrc, FileName, SourceMap, Span, Spanned},
    ecma::{
        ast::{
            ArrowExpr, AssignExpr, AssignOp, AssignTarget, BinExpr, BinaryOp, BlockStmt,
            BlockStmtOrExpr, CallExpr, Callee, CondExpr, Decl, EsVersion, Expr, ExprOrSpread,
            ForStmt, IfStmt, Lit, MemberExpr, MemberProp, Pat, Script, SimpleAssignTarget, Stmt,
            UnaryExpr, UnaryOp, UpdateExpr, UpdateOp, VarDecl, VarDeclKind, VarDeclOrExpr,
        },
        parser::{lexer::Lexer, Parser, StringInput, Syntax},
    },
};

pub type ParserResult<T> = Result<T, ParserError>;
pub type ParserError = String;

struct Context<'a> {
    source_map: &'a SourceMap,
}
impl<'a> Context<'a> {
    fn err(&self, message: &str, node: &impl Spanned) -> ParserError {
        format_source_error(node.span(), message, self.source_map)
    }
    fn err_unimplemented(&self, node: &impl Spanned) -> ParserError {
        self.err("Unsupported syntax", node)
    }
}

/// Parses a script in the host language subset
pub fn parse(input: &str) -> ParserResult<Program> {
    parse_file(input, None)
}

pub fn parse_file(input: &str, path: Option<&Path>) -> ParserResult<Program> {
    let source_map: Lrc<SourceMap> = Default::default();
    let script = parse_ast(input, path, &source_map)?;
    let context = Context {
        source_map: &source_map,
    };
    Ok(Program {
        body: parse_statements(&script.body, &context)?,
    })
}

fn format_source_error(location: Span, message: &str, source_map: &SourceMap) -> String {
    let position = source_map.lookup_char_pos(location.lo);
    format!(
        "{}:{}:{}: {}",
        position.file.name,
        position.line,
        position.col_display + 1,
        message
    )
}

fn parse_ast(input: &str, path: Option<&Path>, source_map: &Lrc<SourceMap>) -> ParserResult<Script> {
    let source = source_map.new_source_file(
        Lrc::new(match path {
            Some(path) => FileName::Real(path.to_path_buf()),
            None => FileName::Anon,
        }),
        String::from(input),
    );
    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::latest(),
        StringInput::from(&*source),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let result = parser
        .parse_script()
        .map_err(|err| format_source_error(err.span(), &err.into_kind().msg(), source_map))?;
    let syntax_errors = parser.take_errors();
    if !syntax_errors.is_empty() {
        return Err(syntax_errors
            .into_iter()
            .map(|error| format_source_error(error.span(), &error.into_kind().msg(), source_map))
            .collect::<Vec<_>>()
            .join("\n"));
    }
    Ok(result)
}

fn parse_statements(statements: &[Stmt], context: &Context) -> ParserResult<Vec<Statement>> {
    statements
        .iter()
        .try_fold(Vec::with_capacity(statements.len()), |mut results, node| {
            parse_statement(node, &mut results, context)?;
            Ok(results)
        })
}

fn parse_statement(
    node: &Stmt,
    results: &mut Vec<Statement>,
    context: &Context,
) -> ParserResult<()> {
    match node {
        Stmt::Empty(_) => {}
        Stmt::Block(node) => results.push(Statement::Block(parse_block(node, context)?)),
        Stmt::Expr(node) => results.push(Statement::Expression(parse_expression(
            &node.expr, context,
        )?)),
        Stmt::Return(node) => results.push(Statement::Return(match &node.arg {
            Some(arg) => Some(parse_expression(arg, context)?),
            None => None,
        })),
        Stmt::If(node) => results.push(parse_if_statement(node, context)?),
        Stmt::For(node) => results.push(parse_for_statement(node, context)?),
        Stmt::Decl(Decl::Var(node)) => results.extend(
            parse_variable_declaration(node, context)?
                .into_iter()
                .map(Statement::Declaration),
        ),
        Stmt::Decl(Decl::Fn(node)) => results.push(Statement::Function(FunctionDeclaration {
            name: node.ident.sym.to_string(),
            function: parse_function(&node.function, context)?,
        })),
        _ => return Err(context.err_unimplemented(node)),
    }
    Ok(())
}

fn parse_block(node: &BlockStmt, context: &Context) -> ParserResult<Vec<Statement>> {
    parse_statements(&node.stmts, context)
}

fn parse_branch(node: &Stmt, context: &Context) -> ParserResult<Box<Statement>> {
    let mut results = Vec::with_capacity(1);
    parse_statement(node, &mut results, context)?;
    Ok(Box::new(match results.len() {
        1 => results.remove(0),
        _ => Statement::Block(results),
    }))
}

fn parse_if_statement(node: &IfStmt, context: &Context) -> ParserResult<Statement> {
    Ok(Statement::If {
        test: parse_expression(&node.test, context)?,
        consequent: parse_branch(&node.cons, context)?,
        alternate: match &node.alt {
            Some(alt) => Some(parse_branch(alt, context)?),
            None => None,
        },
    })
}

fn parse_for_statement(node: &ForStmt, context: &Context) -> ParserResult<Statement> {
    let init = match &node.init {
        None => None,
        Some(VarDeclOrExpr::Expr(init)) => Some(ForInit::Expression(parse_expression(init, context)?)),
        Some(VarDeclOrExpr::VarDecl(init)) => {
            let mut declarations = parse_variable_declaration(init, context)?;
            match declarations.len() {
                1 => Some(ForInit::Declaration(declarations.remove(0))),
                _ => {
                    return Err(context.err("Loops must declare a single binding", init.as_ref()))
                }
            }
        }
    };
    Ok(Statement::For {
        init,
        test: parse_optional_expression(node.test.as_deref(), context)?,
        update: parse_optional_expression(node.update.as_deref(), context)?,
        body: parse_branch(&node.body, context)?,
    })
}

fn parse_variable_declaration(node: &VarDecl, context: &Context) -> ParserResult<Vec<Declaration>> {
    let kind = match node.kind {
        VarDeclKind::Let => DeclarationKind::Let,
        VarDeclKind::Const => DeclarationKind::Const,
        VarDeclKind::Var => return Err(context.err("Use let or const instead of var", node)),
    };
    node.decls
        .iter()
        .map(|declarator| {
            let name = match &declarator.name {
                Pat::Ident(binding) => binding.id.sym.to_string(),
                name => return Err(context.err("Destructuring is not supported", name)),
            };
            let init = match &declarator.init {
                Some(init) => Some(parse_expression(init, context)?),
                None if kind == DeclarationKind::Const => {
                    return Err(context.err("Missing initializer in const declaration", declarator))
                }
                None => None,
            };
            Ok(Declaration { kind, name, init })
        })
        .collect()
}

fn parse_function(node: &swc_core::ecma::ast::Function, context: &Context) -> ParserResult<Rc<Function>> {
    if node.is_async || node.is_generator {
        return Err(context.err_unimplemented(node));
    }
    let params = node
        .params
        .iter()
        .map(|param| parse_param(&param.pat, context))
        .collect::<ParserResult<Vec<_>>>()?;
    let body = match &node.body {
        Some(body) => parse_block(body, context)?,
        None => Vec::new(),
    };
    Ok(Rc::new(Function { params, body }))
}

fn parse_arrow_function(node: &ArrowExpr, context: &Context) -> ParserResult<Rc<Function>> {
    if node.is_async || node.is_generator {
        return Err(context.err_unimplemented(node));
    }
    let params = node
        .params
        .iter()
        .map(|param| parse_param(param, context))
        .collect::<ParserResult<Vec<_>>>()?;
    let body = match node.body.as_ref() {
        BlockStmtOrExpr::BlockStmt(body) => parse_block(body, context)?,
        BlockStmtOrExpr::Expr(body) => vec![Statement::Return(Some(parse_expression(
            body, context,
        )?))],
    };
    Ok(Rc::new(Function { params, body }))
}

fn parse_param(node: &Pat, context: &Context) -> ParserResult<String> {
    match node {
        Pat::Ident(binding) => Ok(binding.id.sym.to_string()),
        node => Err(context.err("Only plain identifiers are supported as parameters", node)),
    }
}

fn parse_optional_expression(
    node: Option<&Expr>,
    context: &Context,
) -> ParserResult<Option<Expression>> {
    match node {
        Some(node) => parse_expression(node, context).map(Some),
        None => Ok(None),
    }
}

fn parse_expression(node: &Expr, context: &Context) -> ParserResult<Expression> {
    match node {
        Expr::Paren(node) => parse_expression(&node.expr, context),
        Expr::Ident(node) => Ok(parse_identifier(&node.sym)),
        Expr::Lit(node) => parse_literal(node, context),
        Expr::Array(node) => node
            .elems
            .iter()
            .map(|element| match element {
                Some(ExprOrSpread { spread: None, expr }) => parse_expression(expr, context),
                _ => Err(context.err("Array holes and spreads are not supported", node)),
            })
            .collect::<ParserResult<Vec<_>>>()
            .map(Expression::Array),
        Expr::Member(node) => parse_member_expression(node, context),
        Expr::Unary(node) => parse_unary_expression(node, context),
        Expr::Bin(node) => parse_binary_expression(node, context),
        Expr::Cond(node) => parse_conditional_expression(node, context),
        Expr::Call(node) => parse_call_expression(node, context),
        Expr::Arrow(node) => parse_arrow_function(node, context).map(Expression::Function),
        Expr::Fn(node) => parse_function(&node.function, context).map(Expression::Function),
        Expr::Assign(node) => parse_assignment_expression(node, context),
        Expr::Update(node) => parse_update_expression(node, context),
        _ => Err(context.err_unimplemented(node)),
    }
}

fn parse_identifier(name: &str) -> Expression {
    match name {
        "undefined" => Expression::undefined(),
        "NaN" => Expression::number(f64::NAN),
        "Infinity" => Expression::number(f64::INFINITY),
        name => Expression::identifier(name),
    }
}

fn parse_literal(node: &Lit, context: &Context) -> ParserResult<Expression> {
    match node {
        Lit::Null(_) => Ok(Expression::null()),
        Lit::Bool(node) => Ok(Expression::boolean(node.value)),
        Lit::Num(node) => Ok(Expression::number(node.value)),
        Lit::Str(node) => Ok(Expression::Literal(Literal::String(node.value.to_string()))),
        node => Err(context.err_unimplemented(node)),
    }
}

fn parse_member_expression(node: &MemberExpr, context: &Context) -> ParserResult<Expression> {
    if let (Expr::Ident(object), MemberProp::Ident(property)) = (node.obj.as_ref(), &node.prop) {
        if &*object.sym == "Math" {
            return parse_math_member(&property.sym)
                .ok_or_else(|| context.err("Unknown Math member", node));
        }
    }
    match &node.prop {
        MemberProp::Computed(property) => Ok(Expression::member(
            parse_expression(&node.obj, context)?,
            parse_expression(&property.expr, context)?,
        )),
        _ => Err(context.err("Only computed member access is supported", node)),
    }
}

fn parse_math_member(name: &str) -> Option<Expression> {
    match Builtin::from_math_name(name) {
        Some(builtin) => Some(Expression::Builtin(builtin)),
        None => math_constants()
            .into_iter()
            .find(|(constant, _)| *constant == name)
            .map(|(_, value)| Expression::number(value)),
    }
}

fn parse_unary_expression(node: &UnaryExpr, context: &Context) -> ParserResult<Expression> {
    let operator = match node.op {
        UnaryOp::Minus => UnaryOperator::Minus,
        UnaryOp::Plus => UnaryOperator::Plus,
        UnaryOp::Bang => UnaryOperator::Not,
        UnaryOp::TypeOf => UnaryOperator::TypeOf,
        _ => return Err(context.err_unimplemented(node)),
    };
    Ok(Expression::unary(operator, parse_expression(&node.arg, context)?))
}

fn parse_binary_expression(node: &BinExpr, context: &Context) -> ParserResult<Expression> {
    let left = parse_expression(&node.left, context)?;
    let right = parse_expression(&node.right, context)?;
    let operator = match node.op {
        BinaryOp::LogicalAnd => return Ok(Expression::logical(LogicalOperator::And, left, right)),
        BinaryOp::LogicalOr => return Ok(Expression::logical(LogicalOperator::Or, left, right)),
        BinaryOp::Add => BinaryOperator::Add,
        BinaryOp::Sub => BinaryOperator::Subtract,
        BinaryOp::Mul => BinaryOperator::Multiply,
        BinaryOp::Div => BinaryOperator::Divide,
        BinaryOp::Mod => BinaryOperator::Remainder,
        BinaryOp::Exp => BinaryOperator::Exponent,
        BinaryOp::EqEqEq => BinaryOperator::StrictEqual,
        BinaryOp::NotEqEq => BinaryOperator::StrictNotEqual,
        BinaryOp::EqEq => BinaryOperator::Equal,
        BinaryOp::NotEq => BinaryOperator::NotEqual,
        BinaryOp::Lt => BinaryOperator::LessThan,
        BinaryOp::LtEq => BinaryOperator::LessThanOrEqual,
        BinaryOp::Gt => BinaryOperator::GreaterThan,
        BinaryOp::GtEq => BinaryOperator::GreaterThanOrEqual,
        _ => return Err(context.err_unimplemented(node)),
    };
    Ok(Expression::binary(operator, left, right))
}

fn parse_conditional_expression(node: &CondExpr, context: &Context) -> ParserResult<Expression> {
    Ok(Expression::conditional(
        parse_expression(&node.test, context)?,
        parse_expression(&node.cons, context)?,
        parse_expression(&node.alt, context)?,
    ))
}

fn parse_call_expression(node: &CallExpr, context: &Context) -> ParserResult<Expression> {
    let callee = match &node.callee {
        Callee::Expr(callee) => parse_expression(callee, context)?,
        _ => return Err(context.err_unimplemented(node)),
    };
    let arguments = node
        .args
        .iter()
        .map(|arg| match arg.spread {
            None => parse_expression(&arg.expr, context),
            Some(_) => Err(context.err("Spread arguments are not supported", node)),
        })
        .collect::<ParserResult<Vec<_>>>()?;
    Ok(Expression::call(callee, arguments))
}

fn parse_assignment_expression(node: &AssignExpr, context: &Context) -> ParserResult<Expression> {
    let target = match &node.left {
        AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => binding.id.sym.to_string(),
        _ => return Err(context.err("Only identifiers may be assigned", node)),
    };
    let operator = match node.op {
        AssignOp::Assign => AssignmentOperator::Assign,
        AssignOp::AddAssign => AssignmentOperator::AddAssign,
        AssignOp::SubAssign => AssignmentOperator::SubtractAssign,
        AssignOp::MulAssign => AssignmentOperator::MultiplyAssign,
        AssignOp::DivAssign => AssignmentOperator::DivideAssign,
        AssignOp::ModAssign => AssignmentOperator::RemainderAssign,
        _ => return Err(context.err_unimplemented(node)),
    };
    Ok(Expression::assignment(
        operator,
        target,
        parse_expression(&node.right, context)?,
    ))
}

fn parse_update_expression(node: &UpdateExpr, context: &Context) -> ParserResult<Expression> {
    let target = match node.arg.as_ref() {
        Expr::Ident(target) => target.sym.to_string(),
        _ => return Err(context.err("Only identifiers may be updated", node)),
    };
    Ok(Expression::Update {
        operator: match node.op {
            UpdateOp::PlusPlus => UpdateOperator::Increment,
            UpdateOp::MinusMinus => UpdateOperator::Decrement,
        },
        prefix: node.prefix,
        target,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_body(input: &str) -> Vec<Statement> {
        parse(input).unwrap().body
    }

    #[test]
    fn declarations() {
        assert_eq!(
            parse_body("const x = 3; let y;"),
            vec![
                Statement::Declaration(Declaration {
                    kind: DeclarationKind::Const,
                    name: String::from("x"),
                    init: Some(Expression::number(3.0)),
                }),
                Statement::Declaration(Declaration {
                    kind: DeclarationKind::Let,
                    name: String::from("y"),
                    init: None,
                }),
            ]
        );
        assert_eq!(parse_body("let a = 1, b = 2;").len(), 2);
    }

    #[test]
    fn functions_and_arrows() {
        assert_eq!(
            parse_body("const f = (x, y) => x + y;"),
            vec![Statement::Declaration(Declaration {
                kind: DeclarationKind::Const,
                name: String::from("f"),
                init: Some(Expression::function(
                    vec![String::from("x"), String::from("y")],
                    vec![Statement::Return(Some(Expression::binary(
                        BinaryOperator::Add,
                        Expression::identifier("x"),
                        Expression::identifier("y"),
                    )))],
                )),
            })]
        );
        assert!(matches!(
            parse_body("function f(x) { return x; }").as_slice(),
            [Statement::Function(FunctionDeclaration { name, .. })] if name == "f"
        ));
    }

    #[test]
    fn operators() {
        assert_eq!(
            parse_body("(a && !b) || -c;"),
            vec![Statement::Expression(Expression::logical(
                LogicalOperator::Or,
                Expression::logical(
                    LogicalOperator::And,
                    Expression::identifier("a"),
                    Expression::unary(UnaryOperator::Not, Expression::identifier("b")),
                ),
                Expression::unary(UnaryOperator::Minus, Expression::identifier("c")),
            ))]
        );
        assert_eq!(
            parse_body("i++;"),
            vec![Statement::Expression(Expression::Update {
                operator: UpdateOperator::Increment,
                prefix: false,
                target: String::from("i"),
            })]
        );
        assert_eq!(
            parse_body("x += 2;"),
            vec![Statement::Expression(Expression::assignment(
                AssignmentOperator::AddAssign,
                "x",
                Expression::number(2.0),
            ))]
        );
    }

    #[test]
    fn math_members_and_special_identifiers() {
        assert_eq!(
            parse_body("Math.sin(Math.PI);"),
            vec![Statement::Expression(Expression::call(
                Expression::Builtin(Builtin::Sin),
                vec![Expression::number(std::f64::consts::PI)],
            ))]
        );
        assert_eq!(
            parse_body("undefined;"),
            vec![Statement::Expression(Expression::undefined())]
        );
        assert!(matches!(
            parse_body("NaN;").as_slice(),
            [Statement::Expression(Expression::Literal(Literal::Number(value)))] if value.is_nan()
        ));
    }

    #[test]
    fn control_flow() {
        let body = parse_body(
            "for (let i = 0; i < 3; i = i + 1) { if (i) x = i; else { x = 0; } }",
        );
        match body.as_slice() {
            [Statement::For {
                init: Some(ForInit::Declaration(init)),
                test: Some(_),
                update: Some(_),
                body,
            }] => {
                assert_eq!(init.name, "i");
                assert!(matches!(
                    body.as_ref(),
                    Statement::Block(statements)
                        if matches!(statements.as_slice(), [Statement::If { alternate: Some(_), .. }])
                ));
            }
            body => panic!("Unexpected statements: {:?}", body),
        }
    }

    #[test]
    fn rejects_unsupported_syntax() {
        let err = parse("var x = 3;").unwrap_err();
        assert!(err.ends_with("Use let or const instead of var"), "{}", err);
        assert!(err.contains(":1:1:"), "{}", err);
        assert!(parse("const [a, b] = pair;").is_err());
        assert!(parse("const x = y.z;").is_err());
        assert!(parse("while (true) {}").is_err());
        assert!(parse("const x = ;").is_err());
        assert!(parse("const x = Math.nonexistent;").is_err());
    }
}
