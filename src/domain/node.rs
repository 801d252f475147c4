//! Canvas node tree substrate (TRD Section 4).
//!
//! A `CanvasNode` is an immutable value: a display label, a resolved
//! [`CanvasType`], visibility/read-only flags, and an ordered mapping from
//! unique local names to owned children. Nothing mutates in place after a
//! node is published; `replace`, `convert` and `clone` all return a fresh,
//! independently owned subtree, and the invariant that a node's type is
//! derivable from its children holds again the moment they return.
//!
//! Kind-specific typing rules live next door: the overload engine in
//! [`signature`](crate::domain::signature), slot policies in
//! [`structural`](crate::domain::structural), aliasing in
//! [`reference`](crate::domain::reference) and record readers in
//! [`reader`](crate::domain::reader). This module owns the generic substrate
//! and the dispatch.

use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::reader::ReaderData;
use crate::domain::reference::{ProxyData, RefPath};
use crate::domain::signature::FunctionData;
use crate::domain::types::CanvasType;
use crate::domain::value::Literal;
use crate::domain::visitor::NodeVisitor;
use crate::domain::{reader, reference, signature, structural};
use std::fmt;

/// Closed set of concrete node kinds. External collaborators never match on
/// this directly; they go through the visitor protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Value(ValueData),
    Reference(RefPath),
    Proxy(ProxyData),
    Function(FunctionData),
    Sequence,
    Spawn,
    Aggregate,
    Reader(ReaderData),
}

/// Payload of a leaf value node. Placeholders are default-valued slots whose
/// node type may be a union wider than the literal's own native type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueData {
    pub literal: Literal,
    pub placeholder: bool,
}

/// An immutable canvas tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasNode {
    label: String,
    ty: CanvasType,
    visible: bool,
    read_only: bool,
    children: Vec<(String, CanvasNode)>,
    kind: NodeKind,
}

impl CanvasNode {
    pub(crate) fn new_raw(label: impl Into<String>, ty: CanvasType, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            ty,
            visible: true,
            read_only: false,
            children: Vec::new(),
            kind,
        }
    }

    /// A leaf node holding a concrete literal.
    pub fn value(literal: Literal) -> Self {
        let native = literal.native();
        Self::new_raw(
            native.name().to_lowercase(),
            CanvasType::native(native),
            NodeKind::Value(ValueData {
                literal,
                placeholder: false,
            }),
        )
    }

    /// A default-valued placeholder slot, typically union-typed.
    pub fn placeholder(ty: CanvasType) -> Self {
        let literal = Literal::default_for_type(&ty);
        Self::new_raw(
            "placeholder",
            ty,
            NodeKind::Value(ValueData {
                literal,
                placeholder: true,
            }),
        )
    }

    // -- accessors ---------------------------------------------------------

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ty(&self) -> &CanvasType {
        &self.ty
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &CanvasNode)> {
        self.children.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, name: &str) -> Option<&CanvasNode> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn child_at(&self, index: usize) -> Option<(&str, &CanvasNode)> {
        self.children.get(index).map(|(n, c)| (n.as_str(), c))
    }

    pub(crate) fn child_index(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|(n, _)| n == name)
    }

    /// Descend by a sequence of child names.
    pub fn descend(&self, path: &[&str]) -> Option<&CanvasNode> {
        let mut current = self;
        for segment in path {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// True for reference-kind values (plain references and proxies).
    /// Capability query; slot rules use this instead of kind probing.
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, NodeKind::Reference(_) | NodeKind::Proxy(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(&self.kind, NodeKind::Value(v) if v.placeholder)
    }

    // -- construction-time builders ---------------------------------------

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub(crate) fn with_type(mut self, ty: CanvasType) -> Self {
        self.ty = ty;
        self
    }

    /// Construction-time only: append a named child. Published nodes are
    /// edited exclusively through `replace`/`convert`.
    pub(crate) fn add_child(
        &mut self,
        name: impl Into<String>,
        node: CanvasNode,
    ) -> Result<(), CanvasError> {
        let name = name.into();
        if self.child(&name).is_some() {
            return Err(CanvasError::DuplicateChild {
                node: self.label.clone(),
                name,
            });
        }
        self.children.push((name, node));
        Ok(())
    }

    /// Construction-time only: drop a named child.
    pub(crate) fn remove_child(&mut self, name: &str) -> Result<CanvasNode, CanvasError> {
        match self.child_index(name) {
            Some(idx) => Ok(self.children.remove(idx).1),
            None => Err(CanvasError::ChildNotFound {
                node: self.label.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Construction-time only: rename a child, keeping its position.
    pub(crate) fn rename_child(
        &mut self,
        name: &str,
        new_name: impl Into<String>,
    ) -> Result<(), CanvasError> {
        let new_name = new_name.into();
        if name != new_name && self.child(&new_name).is_some() {
            return Err(CanvasError::DuplicateChild {
                node: self.label.clone(),
                name: new_name,
            });
        }
        match self.child_index(name) {
            Some(idx) => {
                self.children[idx].0 = new_name;
                Ok(())
            }
            None => Err(CanvasError::ChildNotFound {
                node: self.label.clone(),
                name: name.to_string(),
            }),
        }
    }

    pub(crate) fn put_child_at(&mut self, index: usize, node: CanvasNode) {
        self.children[index].1 = node;
    }

    // -- mutation operators ------------------------------------------------

    /// Swap one named child, no type logic. Internal building block for the
    /// type-aware operators.
    pub fn set_child(
        &self,
        name: &str,
        replacement: CanvasNode,
    ) -> Result<CanvasNode, CanvasError> {
        let idx = self.child_index(name).ok_or_else(|| CanvasError::ChildNotFound {
            node: self.label.clone(),
            name: name.to_string(),
        })?;
        let mut next = self.clone();
        next.children[idx].1 = replacement;
        Ok(next)
    }

    /// Type-aware edit entry point. Dispatches to the kind's own rule;
    /// the returned tree is fully re-typed and the previous one untouched.
    pub fn replace(
        &self,
        child_name: &str,
        replacement: CanvasNode,
    ) -> Result<CanvasNode, CanvasError> {
        if self.read_only {
            return Err(CanvasError::ReadOnly {
                node: self.label.clone(),
            });
        }
        match &self.kind {
            NodeKind::Function(data) => {
                signature::replace_param(self, data, child_name, replacement)
            }
            NodeKind::Sequence | NodeKind::Spawn | NodeKind::Aggregate => {
                structural::replace_slot(self, child_name, replacement)
            }
            NodeKind::Reader(data) => reader::replace_source(self, data, child_name, replacement),
            NodeKind::Value(_) | NodeKind::Reference(_) | NodeKind::Proxy(_) => {
                self.replace_default(child_name, replacement)
            }
        }
    }

    /// Default replace rule (TRD Section 4.3): the slot requires the current
    /// child's type; a misfit replacement gets one conversion attempt before
    /// the edit is rejected.
    pub(crate) fn replace_default(
        &self,
        child_name: &str,
        replacement: CanvasNode,
    ) -> Result<CanvasNode, CanvasError> {
        let current = self.child(child_name).ok_or_else(|| CanvasError::ChildNotFound {
            node: self.label.clone(),
            name: child_name.to_string(),
        })?;
        let slot = current.ty().clone();
        let placed = if replacement.ty().fits(&slot) {
            replacement
        } else {
            replacement.convert(&slot)?
        };
        self.set_child(child_name, placed)
    }

    /// Re-type this node (and recursively its children) to be compatible
    /// with `target`. Fails with [`TypeMismatch`] when no compatible
    /// interpretation exists; the original tree is never altered.
    pub fn convert(&self, target: &CanvasType) -> Result<CanvasNode, CanvasError> {
        match &self.kind {
            NodeKind::Value(data) => self.convert_value(data, target),
            NodeKind::Reference(_) => reference::convert_reference(self, target),
            NodeKind::Proxy(data) => reference::convert_proxy(self, data, target),
            NodeKind::Function(data) => signature::convert_function(self, data, target),
            NodeKind::Sequence | NodeKind::Spawn | NodeKind::Aggregate => {
                structural::convert_structural(self, target)
            }
            NodeKind::Reader(data) => reader::convert_reader(self, data, target),
        }
    }

    fn convert_value(&self, data: &ValueData, target: &CanvasType) -> Result<CanvasNode, CanvasError> {
        if data.placeholder {
            // Placeholders adapt to whatever a slot requires, except the
            // empty union.
            if target.is_none_type() {
                return Err(TypeMismatch::new(&self.ty, target).into());
            }
            if &self.ty == target {
                return Ok(self.clone());
            }
            return Ok(self.retyped_placeholder(target));
        }
        // A literal inside a union it belongs to stays as it is; converting
        // to a native actually rewrites the value (integer widening).
        let already_fits = match target {
            CanvasType::Native(n) => data.literal.native() == *n,
            CanvasType::Union(u) => u.contains(data.literal.native()),
            CanvasType::Record(_) => false,
        };
        if already_fits {
            return Ok(self.clone());
        }
        let widened = match target {
            CanvasType::Native(n) => data.literal.widen_to(*n),
            CanvasType::Union(u) => data.literal.widen_into_union(u),
            CanvasType::Record(_) => None,
        };
        match widened {
            Some(literal) => {
                let native = literal.native();
                let mut next = self.clone();
                next.ty = CanvasType::native(native);
                next.label = native.name().to_lowercase();
                next.kind = NodeKind::Value(ValueData {
                    literal,
                    placeholder: false,
                });
                Ok(next)
            }
            None => Err(TypeMismatch::new(&self.ty, target).into()),
        }
    }

    fn retyped_placeholder(&self, target: &CanvasType) -> CanvasNode {
        let mut next = self.clone();
        next.ty = target.clone();
        next.kind = NodeKind::Value(ValueData {
            literal: Literal::default_for_type(target),
            placeholder: true,
        });
        next
    }

    // -- visitor dispatch --------------------------------------------------

    /// Double dispatch into the matching visitor handler for this node's
    /// concrete kind. The only sanctioned way for external collaborators to
    /// branch on kind.
    pub fn accept<V: NodeVisitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            NodeKind::Value(data) => visitor.visit_value(self, &data.literal),
            NodeKind::Reference(path) => visitor.visit_reference(self, path),
            NodeKind::Proxy(data) => visitor.visit_proxy(self, data),
            NodeKind::Function(data) => visitor.visit_function(self, data),
            NodeKind::Sequence => visitor.visit_sequence(self),
            NodeKind::Spawn => visitor.visit_spawn(self),
            NodeKind::Aggregate => visitor.visit_aggregate(self),
            NodeKind::Reader(data) => visitor.visit_reader(self, data),
        }
    }
}

impl fmt::Display for CanvasNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.ty)?;
        if !self.children.is_empty() {
            let parts: Vec<String> = self
                .children
                .iter()
                .map(|(n, c)| format!("{}={}", n, c))
                .collect();
            write!(f, " [{}]", parts.join(", "))?;
        }
        Ok(())
    }
}
