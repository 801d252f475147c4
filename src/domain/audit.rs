//! Bottom-up type audit (TRD Section 9).
//!
//! Re-derives every node's type from its children and confirms the tree
//! invariant: a node's resolved type is always derivable under its own
//! typing rule. The mutation operators maintain this by construction; the
//! audit is the independent check the CLI and the test suites run after
//! every edit scenario.

use crate::domain::error::CanvasError;
use crate::domain::node::CanvasNode;
use crate::domain::reader::{self, ReaderData};
use crate::domain::reference::{ProxyData, RefPath};
use crate::domain::signature::FunctionData;
use crate::domain::types::{compatibility, CanvasType, Compatibility};
use crate::domain::value::Literal;
use crate::domain::visitor::{walk_children, NodeVisitor};

/// Audit a whole tree. Returns the first violation found, if any.
pub fn audit(root: &CanvasNode) -> Result<(), CanvasError> {
    let mut auditor = TypeAudit { violation: None };
    root.accept(&mut auditor);
    match auditor.violation {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct TypeAudit {
    violation: Option<CanvasError>,
}

impl TypeAudit {
    fn record(&mut self, err: CanvasError) {
        if self.violation.is_none() {
            self.violation = Some(err);
        }
    }

    fn check_fits(&mut self, node: &CanvasNode, derived: &CanvasType) {
        if compatibility(derived, node.ty()) == Compatibility::None {
            self.record(
                crate::domain::error::TypeMismatch::new(derived, node.ty()).into(),
            );
        }
    }
}

impl NodeVisitor for TypeAudit {
    fn visit_value(&mut self, node: &CanvasNode, literal: &Literal) {
        if !node.is_placeholder() {
            self.check_fits(node, &CanvasType::native(literal.native()));
        }
    }

    fn visit_reference(&mut self, _node: &CanvasNode, _path: &RefPath) {
        // references are validated at traversal, not here
    }

    fn visit_proxy(&mut self, node: &CanvasNode, proxy: &ProxyData) {
        // the exposed type must be reachable through the masked original
        if let Err(err) = proxy.original.convert(node.ty()) {
            self.record(err);
        }
        proxy.original.accept(self);
    }

    fn visit_function(&mut self, node: &CanvasNode, _function: &FunctionData) {
        if node.surviving_signatures().is_empty() {
            self.record(
                crate::domain::error::TypeMismatch::new(node.ty(), "any live signature")
                    .into(),
            );
        }
        walk_children(self, node);
    }

    fn visit_sequence(&mut self, node: &CanvasNode) {
        self.check_structural(node, false);
    }

    fn visit_spawn(&mut self, node: &CanvasNode) {
        self.check_structural(node, true);
    }

    fn visit_aggregate(&mut self, node: &CanvasNode) {
        self.check_structural(node, false);
    }

    fn visit_reader(&mut self, node: &CanvasNode, data: &ReaderData) {
        match node.child("source") {
            Some(source) => match reader::reader_type(data, source) {
                Ok(derived) => self.check_fits(node, &derived),
                Err(err) => self.record(err),
            },
            None => self.record(CanvasError::ChildNotFound {
                node: node.label().to_string(),
                name: "source".to_string(),
            }),
        }
        walk_children(self, node);
    }
}

impl TypeAudit {
    fn check_structural(&mut self, node: &CanvasNode, references_only: bool) {
        match node.child_at(node.child_count().wrapping_sub(1)) {
            Some((_, trailing)) if trailing.is_placeholder() => {}
            _ => self.record(CanvasError::ChildNotFound {
                node: node.label().to_string(),
                name: "trailing placeholder".to_string(),
            }),
        }
        for (name, child) in node.real_children() {
            self.check_fits(node, child.ty());
            if references_only && !child.is_reference() {
                self.record(CanvasError::ReferenceRequired {
                    node: node.label().to_string(),
                    slot: name.to_string(),
                });
            }
        }
        walk_children(self, node);
    }
}
