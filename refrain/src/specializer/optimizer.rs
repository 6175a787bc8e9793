// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
//! Local algebraic simplification of expression trees.
//!
//! Operands are simplified before the rules for their parent node are tried, and no rule evaluates
//! anything with side effects. Literal folding goes through the operator implementations shared
//! with the interpreter, so folded values match evaluated ones.
use crate::lang::{
    AssignmentOperator, BinaryOperator, Expression, Literal, LogicalOperator, UpdateOperator,
};

pub fn optimize(expression: Expression) -> Expression {
    match expression {
        Expression::Unary { operator, argument } => {
            let argument = optimize(*argument);
            match argument.as_literal() {
                Some(literal) => Expression::Literal(operator.evaluate(literal)),
                None => Expression::unary(operator, argument),
            }
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => optimize_binary(operator, *left, *right),
        Expression::Logical {
            operator,
            left,
            right,
        } => optimize_logical(operator, optimize(*left), optimize(*right)),
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => optimize_conditional(
            optimize(*test),
            optimize(*consequent),
            optimize(*alternate),
        ),
        Expression::Assignment {
            operator,
            target,
            value,
        } => optimize_assignment(operator, target, *value),
        expression => expression,
    }
}

fn optimize_binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let left = optimize(left);
    let right = optimize(right);
    if let (Some(left), Some(right)) = (left.as_literal(), right.as_literal()) {
        return Expression::Literal(operator.evaluate(left, right));
    }
    if let Some(result) = compare_with_primitive(operator, &left, &right) {
        return Expression::boolean(result);
    }
    if let Some(value) = left.as_number() {
        match operator {
            BinaryOperator::Add if value == 0.0 => return right,
            BinaryOperator::Multiply if value == 0.0 => return Expression::number(0.0),
            BinaryOperator::Multiply if value == 1.0 => return right,
            _ => {}
        }
    }
    let right = match right {
        Expression::Binary {
            operator: inner,
            left: sub_left,
            right: sub_right,
        } if inner == operator && is_associative(operator) => {
            let combined = optimize(Expression::binary(operator, left, *sub_left));
            return Expression::binary(operator, combined, *sub_right);
        }
        right => right,
    };
    if let Some(value) = right.as_number() {
        match operator {
            BinaryOperator::Add | BinaryOperator::Subtract if value == 0.0 => return left,
            BinaryOperator::Multiply if value == 0.0 => return Expression::number(0.0),
            BinaryOperator::LessThan
                if value == 0.0 && matches!(left, Expression::Identifier(_)) =>
            {
                return Expression::boolean(false)
            }
            BinaryOperator::Multiply | BinaryOperator::Divide if value == 1.0 => return left,
            _ => {}
        }
        if let Expression::Binary {
            operator: inner,
            left: sub_left,
            right: sub_right,
        } = &left
        {
            if let Some(rewritten) = reassociate(operator, *inner, sub_left, sub_right, value) {
                return rewritten;
            }
        }
    }
    Expression::binary(operator, left, right)
}

/// Concrete lists and function values are never equal to a primitive
fn compare_with_primitive(
    operator: BinaryOperator,
    left: &Expression,
    right: &Expression,
) -> Option<bool> {
    let (value, literal) = match (left, right) {
        (Expression::Literal(literal), value) | (value, Expression::Literal(literal)) => {
            (value, literal)
        }
        _ => return None,
    };
    if !matches!(
        value,
        Expression::Array(_) | Expression::Function(_) | Expression::Builtin(_)
    ) {
        return None;
    }
    let is_nullish = matches!(literal, Literal::Null | Literal::Undefined);
    match operator {
        BinaryOperator::StrictEqual => Some(false),
        BinaryOperator::StrictNotEqual => Some(true),
        BinaryOperator::Equal if is_nullish => Some(false),
        BinaryOperator::NotEqual if is_nullish => Some(true),
        _ => None,
    }
}

fn is_associative(operator: BinaryOperator) -> bool {
    matches!(operator, BinaryOperator::Add | BinaryOperator::Multiply)
}

/// Folds a right-hand literal into a left-hand binary node that already carries a literal operand
fn reassociate(
    operator: BinaryOperator,
    inner: BinaryOperator,
    sub_left: &Expression,
    sub_right: &Expression,
    value: f64,
) -> Option<Expression> {
    let fold = |operator: BinaryOperator, literal: f64| {
        Expression::Literal(operator.evaluate(&Literal::Number(literal), &Literal::Number(value)))
    };
    if inner == operator && is_associative(operator) {
        if let Some(literal) = sub_left.as_number() {
            return Some(Expression::binary(
                operator,
                fold(operator, literal),
                sub_right.clone(),
            ));
        }
        if let Some(literal) = sub_right.as_number() {
            return Some(Expression::binary(
                operator,
                sub_left.clone(),
                fold(operator, literal),
            ));
        }
        return None;
    }
    let literal = sub_right.as_number()?;
    if inner == BinaryOperator::Subtract
        && (operator == BinaryOperator::Subtract || operator.is_ordering())
    {
        return Some(Expression::binary(
            operator,
            sub_left.clone(),
            fold(BinaryOperator::Add, literal),
        ));
    }
    None
}

fn optimize_logical(operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
    if let Some(literal) = left.as_literal() {
        let is_truthy = literal.is_truthy();
        return operator.select(&left, &right, is_truthy).clone();
    }
    if let Some(literal) = right.as_literal() {
        // A literal right operand only decides the result when the expression is used as a condition
        return match (operator, literal.is_truthy()) {
            (LogicalOperator::And, true) | (LogicalOperator::Or, false) => left,
            (LogicalOperator::And, false) | (LogicalOperator::Or, true) => right,
        };
    }
    if operator == LogicalOperator::And {
        if let (Some(left_range), Some(right_range)) = (Bound::parse(&left), Bound::parse(&right)) {
            if left_range.excludes(&right_range) {
                return Expression::boolean(false);
            }
        }
    }
    Expression::logical(operator, left, right)
}

/// An atomic comparison of a named value against a numeric literal
struct Bound<'a> {
    name: &'a str,
    operator: BinaryOperator,
    value: f64,
}
impl<'a> Bound<'a> {
    fn parse(expression: &'a Expression) -> Option<Self> {
        match expression {
            Expression::Binary {
                operator,
                left,
                right,
            } if operator.is_ordering() => Some(Self {
                name: left.as_identifier()?,
                operator: *operator,
                value: right.as_number()?,
            }),
            _ => None,
        }
    }
    /// Whether an upper bound on the left and a lower bound on the right cannot both hold
    fn excludes(&self, other: &Bound) -> bool {
        if self.name != other.name {
            return false;
        }
        let is_upper = matches!(
            self.operator,
            BinaryOperator::LessThan | BinaryOperator::LessThanOrEqual
        );
        let is_lower = matches!(
            other.operator,
            BinaryOperator::GreaterThan | BinaryOperator::GreaterThanOrEqual
        );
        (self.value < other.value && is_upper && is_lower)
            || (self.value == other.value
                && self.operator == BinaryOperator::LessThan
                && other.operator == BinaryOperator::GreaterThan)
    }
}

fn optimize_conditional(
    test: Expression,
    consequent: Expression,
    alternate: Expression,
) -> Expression {
    if let Some(literal) = test.as_literal() {
        return if literal.is_truthy() {
            consequent
        } else {
            alternate
        };
    }
    if consequent == alternate && !has_side_effect(&test) {
        return consequent;
    }
    let mut consequent = consequent;
    while let Expression::Conditional {
        test: inner,
        consequent: inner_consequent,
        ..
    } = &consequent
    {
        if **inner != test {
            break;
        }
        consequent = (**inner_consequent).clone();
    }
    let mut alternate = alternate;
    while let Expression::Conditional {
        test: inner,
        alternate: inner_alternate,
        ..
    } = &alternate
    {
        if **inner != test {
            break;
        }
        alternate = (**inner_alternate).clone();
    }
    if let Expression::Conditional {
        test: inner,
        consequent: inner_consequent,
        alternate: inner_alternate,
    } = &consequent
    {
        let predicate = optimize_logical(LogicalOperator::And, test.clone(), (**inner).clone());
        if let Some(literal) = predicate.as_literal() {
            consequent = if literal.is_truthy() {
                (**inner_consequent).clone()
            } else {
                (**inner_alternate).clone()
            };
        }
    }
    Expression::conditional(test, consequent, alternate)
}

fn optimize_assignment(
    operator: AssignmentOperator,
    target: String,
    value: Expression,
) -> Expression {
    match (operator, value) {
        (
            AssignmentOperator::Assign,
            Expression::Binary {
                operator: BinaryOperator::Add,
                left,
                right,
            },
        ) if left.as_identifier() == Some(target.as_str()) => {
            if right.as_number() == Some(1.0) {
                Expression::Update {
                    operator: UpdateOperator::Increment,
                    prefix: true,
                    target,
                }
            } else {
                Expression::Assignment {
                    operator: AssignmentOperator::AddAssign,
                    target,
                    value: right,
                }
            }
        }
        (operator, value) => Expression::assignment(operator, target, value),
    }
}

/// Conservative check for whether evaluating the expression could have an observable effect
pub fn has_side_effect(expression: &Expression) -> bool {
    match expression {
        Expression::Literal(_)
        | Expression::Identifier(_)
        | Expression::Builtin(_)
        | Expression::Function(_) => false,
        Expression::Array(items) => items.iter().any(has_side_effect),
        Expression::Member { object, property } => {
            has_side_effect(object) || has_side_effect(property)
        }
        Expression::Unary { argument, .. } => has_side_effect(argument),
        Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
            has_side_effect(left) || has_side_effect(right)
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => has_side_effect(test) || has_side_effect(consequent) || has_side_effect(alternate),
        Expression::Call { .. } | Expression::Assignment { .. } | Expression::Update { .. } => {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtin::Builtin, lang::UnaryOperator};

    fn t() -> Expression {
        Expression::identifier("t")
    }
    fn n(value: f64) -> Expression {
        Expression::number(value)
    }
    fn bin(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::binary(operator, left, right)
    }

    #[test]
    fn folds_literals() {
        assert_eq!(optimize(bin(BinaryOperator::Add, n(2.0), n(3.0))), n(5.0));
        assert_eq!(
            optimize(bin(BinaryOperator::GreaterThanOrEqual, n(2.0), n(3.0))),
            Expression::boolean(false)
        );
        assert_eq!(
            optimize(Expression::unary(UnaryOperator::Minus, n(1.0))),
            n(-1.0)
        );
        assert_eq!(
            optimize(bin(
                BinaryOperator::Add,
                Expression::Literal(Literal::String(String::from("a"))),
                n(1.0)
            )),
            Expression::Literal(Literal::String(String::from("a1")))
        );
    }

    #[test]
    fn folds_nested_children() {
        let expression = bin(
            BinaryOperator::Multiply,
            bin(BinaryOperator::Multiply, n(2.0), n(3.0)),
            t(),
        );
        assert_eq!(optimize(expression), bin(BinaryOperator::Multiply, n(6.0), t()));
    }

    #[test]
    fn compares_concrete_values_with_primitives() {
        let list = Expression::Array(vec![t(), Expression::null()]);
        assert_eq!(
            optimize(bin(BinaryOperator::StrictEqual, list.clone(), Expression::null())),
            Expression::boolean(false)
        );
        assert_eq!(
            optimize(bin(BinaryOperator::NotEqual, Expression::undefined(), list.clone())),
            Expression::boolean(true)
        );
        let loose = bin(BinaryOperator::Equal, list, n(0.0));
        assert_eq!(optimize(loose.clone()), loose);
    }

    #[test]
    fn applies_identities() {
        assert_eq!(optimize(bin(BinaryOperator::Add, n(0.0), t())), t());
        assert_eq!(optimize(bin(BinaryOperator::Multiply, n(0.0), t())), n(0.0));
        assert_eq!(optimize(bin(BinaryOperator::Multiply, n(1.0), t())), t());
        assert_eq!(optimize(bin(BinaryOperator::Add, t(), n(0.0))), t());
        assert_eq!(optimize(bin(BinaryOperator::Subtract, t(), n(0.0))), t());
        assert_eq!(optimize(bin(BinaryOperator::Multiply, t(), n(0.0))), n(0.0));
        assert_eq!(optimize(bin(BinaryOperator::Multiply, t(), n(1.0))), t());
        assert_eq!(optimize(bin(BinaryOperator::Divide, t(), n(1.0))), t());
        assert_eq!(
            optimize(bin(BinaryOperator::LessThan, t(), n(0.0))),
            Expression::boolean(false)
        );
        assert_eq!(
            optimize(bin(BinaryOperator::Subtract, n(0.0), t())),
            bin(BinaryOperator::Subtract, n(0.0), t())
        );
    }

    #[test]
    fn reassociates_right_nested_operands() {
        let expression = bin(
            BinaryOperator::Add,
            n(1.0),
            bin(BinaryOperator::Add, n(2.0), t()),
        );
        assert_eq!(optimize(expression), bin(BinaryOperator::Add, n(3.0), t()));
        let expression = bin(
            BinaryOperator::Multiply,
            t(),
            bin(BinaryOperator::Multiply, Expression::identifier("u"), n(2.0)),
        );
        assert_eq!(
            optimize(expression),
            bin(
                BinaryOperator::Multiply,
                bin(BinaryOperator::Multiply, t(), Expression::identifier("u")),
                n(2.0)
            )
        );
    }

    #[test]
    fn merges_trailing_literals() {
        let scaled = bin(BinaryOperator::Multiply, n(6.0), t());
        assert_eq!(
            optimize(bin(BinaryOperator::Multiply, scaled, n(500.0))),
            bin(BinaryOperator::Multiply, n(3000.0), t())
        );
        let scaled = bin(BinaryOperator::Multiply, t(), n(500.0));
        assert_eq!(
            optimize(bin(BinaryOperator::Multiply, scaled, n(2.0))),
            bin(BinaryOperator::Multiply, t(), n(1000.0))
        );
        let shifted = bin(BinaryOperator::Subtract, t(), n(2.0));
        assert_eq!(
            optimize(bin(BinaryOperator::Subtract, shifted, n(3.0))),
            bin(BinaryOperator::Subtract, t(), n(5.0))
        );
        let shifted = bin(BinaryOperator::Subtract, t(), n(0.8));
        assert_eq!(
            optimize(bin(BinaryOperator::LessThan, shifted, n(0.2))),
            bin(BinaryOperator::LessThan, t(), n(1.0))
        );
        let shifted = bin(BinaryOperator::Add, t(), n(0.8));
        assert_eq!(
            optimize(bin(BinaryOperator::LessThan, shifted.clone(), n(0.2))),
            bin(BinaryOperator::LessThan, shifted, n(0.2))
        );
    }

    #[test]
    fn short_circuits_literal_logic() {
        let test = bin(BinaryOperator::GreaterThan, t(), n(1.0));
        assert_eq!(
            optimize(Expression::logical(
                LogicalOperator::And,
                Expression::boolean(true),
                test.clone()
            )),
            test
        );
        assert_eq!(
            optimize(Expression::logical(
                LogicalOperator::Or,
                test.clone(),
                Expression::boolean(false)
            )),
            test
        );
        assert_eq!(
            optimize(Expression::logical(
                LogicalOperator::And,
                test.clone(),
                Expression::boolean(false)
            )),
            Expression::boolean(false)
        );
        assert_eq!(
            optimize(Expression::logical(
                LogicalOperator::Or,
                Expression::null(),
                n(3.0)
            )),
            n(3.0)
        );
    }

    #[test]
    fn resolves_disjoint_ranges() {
        let below = bin(BinaryOperator::LessThan, t(), n(0.5));
        let above = bin(BinaryOperator::GreaterThanOrEqual, t(), n(1.0));
        assert_eq!(
            optimize(Expression::logical(LogicalOperator::And, below, above)),
            Expression::boolean(false)
        );
        let below = bin(BinaryOperator::LessThan, t(), n(1.0));
        let above = bin(BinaryOperator::GreaterThan, t(), n(1.0));
        assert_eq!(
            optimize(Expression::logical(LogicalOperator::And, below, above)),
            Expression::boolean(false)
        );
        let below = bin(BinaryOperator::LessThan, t(), n(1.0));
        let above = bin(BinaryOperator::GreaterThanOrEqual, t(), n(1.0));
        let expression = Expression::logical(LogicalOperator::And, below, above);
        assert_eq!(optimize(expression.clone()), expression);
        let below = bin(BinaryOperator::LessThan, t(), n(0.5));
        let above = bin(BinaryOperator::GreaterThan, Expression::identifier("u"), n(1.0));
        let expression = Expression::logical(LogicalOperator::And, below, above);
        assert_eq!(optimize(expression.clone()), expression);
    }

    #[test]
    fn simplifies_conditionals() {
        let test = bin(BinaryOperator::GreaterThanOrEqual, t(), n(1.0));
        assert_eq!(
            optimize(Expression::conditional(Expression::boolean(true), t(), n(0.0))),
            t()
        );
        assert_eq!(
            optimize(Expression::conditional(test.clone(), n(0.0), n(0.0))),
            n(0.0)
        );
        let random = Expression::call(Expression::Builtin(Builtin::Random), vec![]);
        let impure = Expression::conditional(random.clone(), n(0.0), n(0.0));
        assert_eq!(optimize(impure.clone()), impure);
        let nested = Expression::conditional(
            test.clone(),
            Expression::conditional(test.clone(), t(), n(2.0)),
            Expression::conditional(test.clone(), n(3.0), n(4.0)),
        );
        assert_eq!(
            optimize(nested),
            Expression::conditional(test, t(), n(4.0))
        );
    }

    #[test]
    fn prunes_unreachable_inner_branches() {
        let outer = bin(BinaryOperator::LessThan, t(), n(0.5));
        let inner = bin(BinaryOperator::GreaterThanOrEqual, t(), n(1.0));
        let expression = Expression::conditional(
            outer.clone(),
            Expression::conditional(inner, n(0.0), t()),
            n(2.0),
        );
        assert_eq!(optimize(expression), Expression::conditional(outer, t(), n(2.0)));
    }

    #[test]
    fn canonicalizes_assignments() {
        let increment = Expression::assignment(
            AssignmentOperator::Assign,
            "i",
            bin(BinaryOperator::Add, Expression::identifier("i"), n(1.0)),
        );
        assert_eq!(
            optimize(increment),
            Expression::Update {
                operator: UpdateOperator::Increment,
                prefix: true,
                target: String::from("i"),
            }
        );
        let accumulate = Expression::assignment(
            AssignmentOperator::Assign,
            "answer",
            bin(BinaryOperator::Add, Expression::identifier("answer"), t()),
        );
        assert_eq!(
            optimize(accumulate),
            Expression::assignment(AssignmentOperator::AddAssign, "answer", t())
        );
        let unrelated = Expression::assignment(
            AssignmentOperator::Assign,
            "answer",
            bin(BinaryOperator::Add, t(), n(1.0)),
        );
        assert_eq!(optimize(unrelated.clone()), unrelated);
    }
}
