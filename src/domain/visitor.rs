//! Node visitor protocol (TRD Section 8).
//!
//! External collaborators (the executor, the renderer, the record store)
//! never branch on a node's kind directly. They implement [`NodeVisitor`]
//! and let [`CanvasNode::accept`] dispatch into the one handler matching the
//! node's concrete kind; unimplemented handlers fall through to
//! [`NodeVisitor::visit_node`].
//!
//! Handlers receive the node itself plus the kind payload, so a visitor
//! needs no downcasting of any sort.

use crate::domain::node::CanvasNode;
use crate::domain::reader::ReaderData;
use crate::domain::reference::{ProxyData, RefPath};
use crate::domain::signature::FunctionData;
use crate::domain::value::Literal;

/// One handler per concrete node kind, all defaulting to the catch-all.
pub trait NodeVisitor {
    /// Catch-all handler; the default does nothing.
    fn visit_node(&mut self, node: &CanvasNode) {
        let _ = node;
    }

    fn visit_value(&mut self, node: &CanvasNode, literal: &Literal) {
        let _ = literal;
        self.visit_node(node);
    }

    fn visit_reference(&mut self, node: &CanvasNode, path: &RefPath) {
        let _ = path;
        self.visit_node(node);
    }

    fn visit_proxy(&mut self, node: &CanvasNode, proxy: &ProxyData) {
        let _ = proxy;
        self.visit_node(node);
    }

    fn visit_function(&mut self, node: &CanvasNode, function: &FunctionData) {
        let _ = function;
        self.visit_node(node);
    }

    fn visit_sequence(&mut self, node: &CanvasNode) {
        self.visit_node(node);
    }

    fn visit_spawn(&mut self, node: &CanvasNode) {
        self.visit_node(node);
    }

    fn visit_aggregate(&mut self, node: &CanvasNode) {
        self.visit_node(node);
    }

    fn visit_reader(&mut self, node: &CanvasNode, reader: &ReaderData) {
        let _ = reader;
        self.visit_node(node);
    }
}

/// Drive a visitor over `node`'s children in declaration order. Visitors
/// recurse explicitly; nothing walks behind their back.
pub fn walk_children<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &CanvasNode) {
    for (_, child) in node.children() {
        child.accept(visitor);
    }
}
