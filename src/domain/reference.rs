//! Reference and proxy nodes (TRD Section 6).
//!
//! A reference is a textual path resolved lazily against the tree that
//! contains the referencing node; nothing validates it until someone
//! traverses it. Paths starting with `/` resolve from the root; relative
//! paths resolve from the referencing node's parent, with one `..` segment
//! per additional ascent.
//!
//! A proxy is a reference that also owns a hidden original node it masks:
//! it sits in the tree as a reference, but type conversions are checked
//! through the original.

use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::node::{CanvasNode, NodeKind};
use crate::domain::types::CanvasType;
use std::fmt;

/// A textual node path: `/`-separated child names, `..` ascending one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefPath {
    raw: String,
}

impl RefPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_absolute(&self) -> bool {
        self.raw.starts_with('/')
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('/').filter(|s| !s.is_empty())
    }

    /// Resolve against `root`, starting from the referencing node's
    /// location (`from`, a path of child names from the root). Not called
    /// during edits; only traversing collaborators resolve.
    pub fn resolve<'a>(
        &self,
        root: &'a CanvasNode,
        from: &[&str],
    ) -> Result<&'a CanvasNode, CanvasError> {
        let mut location: Vec<&str> = if self.is_absolute() {
            Vec::new()
        } else {
            // relative paths are anchored at the referencing node's parent
            let mut base = from.to_vec();
            base.pop();
            base
        };
        for segment in self.segments() {
            if segment == ".." {
                if location.pop().is_none() {
                    return Err(CanvasError::BadReference {
                        path: self.raw.clone(),
                        reason: "ascends past the root".to_string(),
                    });
                }
            } else {
                location.push(segment);
            }
        }
        root.descend(&location).ok_or_else(|| CanvasError::BadReference {
            path: self.raw.clone(),
            reason: "no node at that path".to_string(),
        })
    }
}

impl fmt::Display for RefPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Payload of a proxy node: the path it answers to plus the masked original.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyData {
    pub path: RefPath,
    pub original: Box<CanvasNode>,
}

impl CanvasNode {
    /// A plain reference node. Starts with the universal type; a later
    /// `convert` adopts whatever type its slot requires, since the target
    /// is not resolved until traversal.
    pub fn reference(path: RefPath) -> Self {
        let label = path.as_str().to_string();
        CanvasNode::new_raw(label, CanvasType::any(), NodeKind::Reference(path))
    }

    /// A proxy node masking `original` behind `path`. Exposes the
    /// original's type.
    pub fn proxy(path: RefPath, original: CanvasNode) -> Self {
        let label = path.as_str().to_string();
        let ty = original.ty().clone();
        CanvasNode::new_raw(
            label,
            ty,
            NodeKind::Proxy(ProxyData {
                path,
                original: Box::new(original),
            }),
        )
    }

    /// The node a proxy masks, if this is a proxy.
    pub fn masked_original(&self) -> Option<&CanvasNode> {
        match self.kind() {
            NodeKind::Proxy(data) => Some(&data.original),
            _ => None,
        }
    }
}

/// `convert` on a plain reference: adopt the target type. The path stays
/// unresolved, so the only impossible target is the empty union.
pub(crate) fn convert_reference(
    node: &CanvasNode,
    target: &CanvasType,
) -> Result<CanvasNode, CanvasError> {
    if node.ty() == target {
        return Ok(node.clone());
    }
    if target.is_none_type() {
        return Err(TypeMismatch::new(node.ty(), target).into());
    }
    Ok(node.clone().with_type(target.clone()))
}

/// `convert` on a proxy: legality is probed through the masked original,
/// which itself stays unchanged; only the exposed type moves.
pub(crate) fn convert_proxy(
    node: &CanvasNode,
    data: &ProxyData,
    target: &CanvasType,
) -> Result<CanvasNode, CanvasError> {
    if node.ty() == target {
        return Ok(node.clone());
    }
    data.original.convert(target)?;
    Ok(node.clone().with_type(target.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::NativeType;
    use crate::domain::value::Literal;

    fn sample_tree() -> CanvasNode {
        // root [a=[x=quantity], b=money]
        let mut a = CanvasNode::value(Literal::Integer(0)).with_label("a");
        a.add_child("x", CanvasNode::value(Literal::Quantity(5.0))).unwrap();
        let mut root = CanvasNode::value(Literal::Integer(0)).with_label("root");
        root.add_child("a", a).unwrap();
        root.add_child("b", CanvasNode::value(Literal::Money(1.0))).unwrap();
        root
    }

    #[test]
    fn absolute_path_resolves_from_root() {
        let root = sample_tree();
        let target = RefPath::new("/a/x").resolve(&root, &["b"]).unwrap();
        assert_eq!(target.ty(), &CanvasType::native(NativeType::Quantity));
    }

    #[test]
    fn relative_path_resolves_from_parent() {
        let root = sample_tree();
        // a node sitting at /a/x referring to its sibling's parent peer
        let target = RefPath::new("../b").resolve(&root, &["a", "x"]).unwrap();
        assert_eq!(target.ty(), &CanvasType::native(NativeType::Money));
    }

    #[test]
    fn sibling_reference_needs_no_marker() {
        let root = sample_tree();
        let target = RefPath::new("b").resolve(&root, &["a"]).unwrap();
        assert_eq!(target.ty(), &CanvasType::native(NativeType::Money));
    }

    #[test]
    fn over_ascending_fails() {
        let root = sample_tree();
        let err = RefPath::new("../../b").resolve(&root, &["a"]).unwrap_err();
        assert!(matches!(err, CanvasError::BadReference { .. }));
    }

    #[test]
    fn dangling_path_fails_only_at_resolution() {
        let root = sample_tree();
        let reference = CanvasNode::reference(RefPath::new("/nowhere"));
        // building the node is fine; traversal reports the problem
        assert!(reference.is_reference());
        let err = RefPath::new("/nowhere").resolve(&root, &[]).unwrap_err();
        assert!(matches!(err, CanvasError::BadReference { .. }));
    }

    #[test]
    fn reference_adopts_slot_type_on_convert() {
        let node = CanvasNode::reference(RefPath::new("/a/x"));
        assert!(node.ty().is_any());
        let typed = node.convert(&CanvasType::native(NativeType::Money)).unwrap();
        assert_eq!(typed.ty(), &CanvasType::native(NativeType::Money));
        assert!(node.convert(&CanvasType::none()).is_err());
    }

    #[test]
    fn proxy_converts_through_original() {
        // Scenario D
        let original = CanvasNode::value(Literal::Integer(10));
        let proxy = CanvasNode::proxy(RefPath::new("/a/x"), original.clone());
        assert_eq!(proxy.ty(), &CanvasType::native(NativeType::Integer));

        let converted = proxy.convert(&CanvasType::native(NativeType::Decimal)).unwrap();
        assert_eq!(converted.ty(), &CanvasType::native(NativeType::Decimal));
        // still referencing the same path, original left untouched
        match converted.kind() {
            NodeKind::Proxy(data) => {
                assert_eq!(data.path, RefPath::new("/a/x"));
                assert_eq!(*data.original, original);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn proxy_convert_fails_when_original_cannot_follow() {
        let original = CanvasNode::value(Literal::Money(10.0));
        let proxy = CanvasNode::proxy(RefPath::new("/b"), original);
        let err = proxy
            .convert(&CanvasType::native(NativeType::Ticker))
            .unwrap_err();
        assert!(matches!(err, CanvasError::Type(_)));
    }
}
