// SPDX-FileCopyrightText: 2023 Marshall Wace <opensource@mwam.com>
// SPDX-License-Identifier: Apache-2.0
// SPDX-FileContributor: Tim Kendrick <t.kendrick@mwam.com> https://github.com/timkendrickmw
use std::collections::HashMap;

use crate::{builtin::Builtin, lang::Expression, specializer::SpecializeError};

#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum ScopeKind {
    /// Body of the closure being specialized: writes may not reach past it
    Closure,
    Function,
    Block,
    Loop,
    /// Parameter bindings introduced by a beta-reduction
    Substitute,
}
impl ScopeKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Closure => "C",
            Self::Function => "F",
            Self::Block => "B",
            Self::Loop => "L",
            Self::Substitute => "S",
        }
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum Binding {
    /// Stays as a bare identifier in the output
    Parameter,
    /// Mutable local holding its current value
    Variable(Expression),
    /// Immutable binding replaced by its expression wherever referenced
    Constant(Expression),
    /// Fallback for a whitelisted helper that is not bound anywhere
    Hardcode(Expression),
}

#[derive(Eq, PartialEq, Hash, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct ScopeId(usize);
impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

struct Frame {
    kind: ScopeKind,
    path: String,
    bindings: HashMap<String, Binding>,
    parent: Option<ScopeId>,
}

/// Arena of compile-time frames, addressed by [`ScopeId`]
///
/// Frames are never removed, so an identifier allocated later than another always compares greater.
pub struct Scopes {
    frames: Vec<Frame>,
    hardcoded: Vec<Builtin>,
}
impl Scopes {
    pub fn new(hardcoded: impl IntoIterator<Item = Builtin>) -> Self {
        Self {
            frames: Vec::new(),
            hardcoded: hardcoded.into_iter().collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.frames.len()
    }
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
    pub fn root(&mut self, kind: ScopeKind, prefix: &str) -> ScopeId {
        self.allocate(kind, String::from(prefix), None)
    }
    pub fn child(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let path = format!("{}{}{}", self.frame(parent).path, kind.tag(), self.frames.len());
        self.allocate(kind, path, Some(parent))
    }
    fn allocate(&mut self, kind: ScopeKind, path: String, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame {
            kind,
            path,
            bindings: HashMap::new(),
            parent,
        });
        id
    }
    fn frame(&self, scope: ScopeId) -> &Frame {
        &self.frames[scope.0]
    }
    pub fn kind(&self, scope: ScopeId) -> ScopeKind {
        self.frame(scope).kind
    }
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.frame(scope).parent
    }
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, binding: Binding) {
        self.frames[scope.0].bindings.insert(name.into(), binding);
    }
    /// Resolves a name along the parent chain, returning the owning frame alongside the binding.
    ///
    /// Write lookups fail once they would leave a [`ScopeKind::Closure`] frame. Read lookups that find
    /// nothing fall back to the hardcoded helpers; writes never do.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        for_write: bool,
    ) -> Result<Option<(ScopeId, Binding)>, SpecializeError> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            let frame = self.frame(scope);
            if let Some(binding) = frame.bindings.get(name) {
                return Ok(Some((scope, binding.clone())));
            }
            if for_write && frame.kind == ScopeKind::Closure {
                return Err(SpecializeError::PurityViolation(String::from(name)));
            }
            current = frame.parent;
        }
        if for_write {
            return Ok(None);
        }
        Ok(self
            .hardcoded
            .iter()
            .find(|builtin| builtin.global_name() == name)
            .map(|builtin| (scope, Binding::Hardcode(Expression::Builtin(*builtin)))))
    }
    /// Replaces the current value of an existing binding in the given frame
    pub fn assign(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Expression,
    ) -> Result<(), SpecializeError> {
        match self.frames[scope.0].bindings.get_mut(name) {
            Some(Binding::Variable(current)) => {
                *current = value;
                Ok(())
            }
            Some(_) => Err(SpecializeError::PurityViolation(String::from(name))),
            None => Err(SpecializeError::InternalConsistency(format!(
                "Assignment to undeclared binding {}",
                name
            ))),
        }
    }
    /// Synthesizes a name that no other frame of any specialization unit can produce
    pub fn fresh_name(&self, scope: ScopeId, suffix: &str) -> String {
        format!("${}_{}", self.frame(scope).path, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let mut scopes = Scopes::new([Builtin::Length]);
        let root = scopes.root(ScopeKind::Closure, "c0");
        scopes.define(root, "t", Binding::Parameter);
        let block = scopes.child(root, ScopeKind::Block);
        scopes.define(block, "x", Binding::Constant(Expression::number(3.0)));
        assert_eq!(
            scopes.lookup(block, "t", false),
            Ok(Some((root, Binding::Parameter)))
        );
        assert_eq!(
            scopes.lookup(block, "x", false),
            Ok(Some((block, Binding::Constant(Expression::number(3.0)))))
        );
        assert_eq!(scopes.lookup(root, "x", false), Ok(None));
    }

    #[test]
    fn inner_bindings_shadow_outer_ones() {
        let mut scopes = Scopes::new([]);
        let root = scopes.root(ScopeKind::Closure, "c0");
        scopes.define(root, "x", Binding::Parameter);
        let inner = scopes.child(root, ScopeKind::Substitute);
        scopes.define(inner, "x", Binding::Constant(Expression::number(1.0)));
        assert_eq!(
            scopes.lookup(inner, "x", false),
            Ok(Some((inner, Binding::Constant(Expression::number(1.0)))))
        );
    }

    #[test]
    fn writes_cannot_cross_closure_frames() {
        let mut scopes = Scopes::new([]);
        let outer = scopes.root(ScopeKind::Block, "c0");
        scopes.define(outer, "counter", Binding::Variable(Expression::number(0.0)));
        let closure = scopes.child(outer, ScopeKind::Closure);
        let block = scopes.child(closure, ScopeKind::Block);
        assert_eq!(
            scopes.lookup(block, "counter", true),
            Err(SpecializeError::PurityViolation(String::from("counter")))
        );
        assert!(scopes.lookup(block, "counter", false).unwrap().is_some());
    }

    #[test]
    fn unbound_writes_are_not_found() {
        let mut scopes = Scopes::new([Builtin::Length]);
        let root = scopes.root(ScopeKind::Function, "c0");
        assert_eq!(scopes.lookup(root, "length", true), Ok(None));
    }

    #[test]
    fn hardcoded_helpers_resolve_as_fallback() {
        let mut scopes = Scopes::new([Builtin::Length]);
        let root = scopes.root(ScopeKind::Closure, "c0");
        assert_eq!(
            scopes.lookup(root, "length", false),
            Ok(Some((
                root,
                Binding::Hardcode(Expression::Builtin(Builtin::Length))
            )))
        );
        assert_eq!(scopes.lookup(root, "list", false), Ok(None));
        scopes.define(root, "length", Binding::Parameter);
        assert_eq!(
            scopes.lookup(root, "length", false),
            Ok(Some((root, Binding::Parameter)))
        );
    }

    #[test]
    fn assign_updates_variables_only() {
        let mut scopes = Scopes::new([]);
        let root = scopes.root(ScopeKind::Closure, "c0");
        scopes.define(root, "x", Binding::Variable(Expression::number(0.0)));
        scopes.define(root, "y", Binding::Constant(Expression::number(0.0)));
        assert_eq!(scopes.assign(root, "x", Expression::number(2.0)), Ok(()));
        assert_eq!(
            scopes.lookup(root, "x", false),
            Ok(Some((root, Binding::Variable(Expression::number(2.0)))))
        );
        assert!(matches!(
            scopes.assign(root, "y", Expression::number(2.0)),
            Err(SpecializeError::PurityViolation(_))
        ));
        assert!(matches!(
            scopes.assign(root, "z", Expression::number(2.0)),
            Err(SpecializeError::InternalConsistency(_))
        ));
    }

    #[test]
    fn fresh_names_are_unique_per_frame() {
        let mut scopes = Scopes::new([]);
        let root = scopes.root(ScopeKind::Closure, "c0");
        let first = scopes.child(root, ScopeKind::Block);
        let second = scopes.child(root, ScopeKind::Block);
        let nested = scopes.child(first, ScopeKind::Function);
        assert_eq!(scopes.fresh_name(first, "wave"), "$c0B1_wave");
        assert_eq!(scopes.fresh_name(second, "wave"), "$c0B2_wave");
        assert_eq!(scopes.fresh_name(nested, "wave"), "$c0B1F3_wave");
    }
}
