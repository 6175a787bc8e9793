// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    builtin::Builtin,
    lang::{Function, Literal},
};

/// A function value together with the frame chain that was active where it was defined
pub struct Closure {
    pub name: Option<String>,
    pub function: Rc<Function>,
    pub environment: Environment,
}
impl std::fmt::Debug for Closure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<closure {}>", name),
            None => write!(f, "<closure>"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Pair(Rc<(Value, Value)>),
    Closure(Rc<Closure>),
    Builtin(Builtin),
}
impl Value {
    pub fn pair(head: Value, tail: Value) -> Self {
        Self::Pair(Rc::new((head, tail)))
    }
    /// Builds a null-terminated chain of pairs
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: DoubleEndedIterator,
    {
        items
            .into_iter()
            .rev()
            .fold(Self::Null, |tail, head| Self::pair(head, tail))
    }
    /// Counts the pairs of a null-terminated chain, or `None` if the chain is improper
    pub fn list_length(&self) -> Option<usize> {
        let mut current = self;
        let mut length = 0;
        loop {
            match current {
                Self::Null => return Some(length),
                Self::Pair(pair) => {
                    length += 1;
                    current = &pair.1;
                }
                _ => return None,
            }
        }
    }
    pub fn as_literal(&self) -> Option<Literal> {
        match self {
            Self::Undefined => Some(Literal::Undefined),
            Self::Null => Some(Literal::Null),
            Self::Boolean(value) => Some(Literal::Boolean(*value)),
            Self::Number(value) => Some(Literal::Number(*value)),
            Self::String(value) => Some(Literal::String(value.clone())),
            Self::Pair(_) | Self::Closure(_) | Self::Builtin(_) => None,
        }
    }
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }
    pub fn is_truthy(&self) -> bool {
        match self.as_literal() {
            Some(literal) => literal.is_truthy(),
            None => true,
        }
    }
    pub fn to_number(&self) -> f64 {
        match self.as_literal() {
            Some(literal) => literal.to_number(),
            None => f64::NAN,
        }
    }
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Pair(_) => "object",
            Self::Closure(_) | Self::Builtin(_) => "function",
            _ => self
                .as_literal()
                .map(|literal| literal.type_of())
                .unwrap_or("undefined"),
        }
    }
    /// Identity comparison: primitives compare by value, pairs and closures by reference
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Pair(left), Self::Pair(right)) => Rc::ptr_eq(left, right),
            (Self::Closure(left), Self::Closure(right)) => Rc::ptr_eq(left, right),
            (Self::Builtin(left), Self::Builtin(right)) => left == right,
            _ => match (self.as_literal(), other.as_literal()) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            },
        }
    }
}
impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Undefined => Self::Undefined,
            Literal::Null => Self::Null,
            Literal::Boolean(value) => Self::Boolean(value),
            Literal::Number(value) => Self::Number(value),
            Literal::String(value) => Self::String(value),
        }
    }
}
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pair(pair) => write!(f, "[{}, {}]", pair.0, pair.1),
            Self::Closure(closure) => write!(f, "{:?}", closure),
            Self::Builtin(builtin) => write!(f, "{}", builtin),
            _ => match self.as_literal() {
                Some(literal) => write!(f, "{}", literal),
                None => Ok(()),
            },
        }
    }
}

struct Frame {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Environment>,
}

/// Chain of runtime frames; lookups fall back to the parent frame up to the global frame.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);
impl Environment {
    pub fn global() -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }
    pub fn extend(&self) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }
    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }
    pub fn is_global(&self) -> bool {
        self.0.parent.is_none()
    }
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }
    pub fn contains_local(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(environment) = current {
            if let Some(value) = environment.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            current = environment.parent();
        }
        None
    }
    /// Overwrites the nearest existing binding for the given name
    pub fn assign(&self, name: &str, value: Value) -> Result<(), String> {
        let mut current = Some(self);
        while let Some(environment) = current {
            if let Some(existing) = environment.0.bindings.borrow_mut().get_mut(name) {
                *existing = value;
                return Ok(());
            }
            current = environment.parent();
        }
        Err(format!("Assignment to undeclared variable: {}", name))
    }
    pub fn names(&self) -> Vec<String> {
        let mut names = self.0.bindings.borrow().keys().cloned().collect::<Vec<_>>();
        names.sort();
        names
    }
}
impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(environment) = current {
            depth += 1;
            current = environment.parent();
        }
        write!(f, "<environment depth={} names={:?}>", depth, self.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_chain() {
        let global = Environment::global();
        global.define("x", Value::Number(1.0));
        let child = global.extend();
        child.define("y", Value::Number(2.0));
        assert!(global.is_global());
        assert!(!child.is_global());
        assert!(matches!(child.lookup("x"), Some(Value::Number(value)) if value == 1.0));
        assert!(global.lookup("y").is_none());
        assert!(child.assign("x", Value::Number(3.0)).is_ok());
        assert!(matches!(global.lookup("x"), Some(Value::Number(value)) if value == 3.0));
        assert!(child.assign("z", Value::Null).is_err());
    }

    #[test]
    fn lists() {
        let list = Value::list(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(list.list_length(), Some(2));
        assert_eq!(format!("{}", list), "[1, [2, null]]");
        assert_eq!(Value::pair(Value::Null, Value::Number(1.0)).list_length(), None);
        assert_eq!(Value::Null.list_length(), Some(0));
    }

    #[test]
    fn identity() {
        let pair = Value::pair(Value::Number(1.0), Value::Null);
        assert!(pair.strict_equals(&pair.clone()));
        assert!(!pair.strict_equals(&Value::pair(Value::Number(1.0), Value::Null)));
        assert!(Value::Number(1.0).strict_equals(&Value::Number(1.0)));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
    }
}
