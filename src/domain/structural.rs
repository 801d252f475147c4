//! Variable-arity structural nodes (TRD Section 7).
//!
//! Sequence, Spawn and Aggregate nodes hold `k` slot children named
//! `i0..i(k-1)` plus one trailing open placeholder. The first real child
//! placed into the open slot fixes the node's declared type; later children
//! must convert into it. Replacing a real child with a placeholder removes
//! it and renumbers the survivors so slot names stay contiguous.

use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::node::{CanvasNode, NodeKind};
use crate::domain::types::CanvasType;

impl CanvasNode {
    /// A sequencing node: run children one after another.
    pub fn sequence() -> Self {
        structural_node("sequence", NodeKind::Sequence)
    }

    /// A spawn node: launch referenced tasks side by side. Real slot
    /// children must be reference-kind values.
    pub fn spawn() -> Self {
        structural_node("spawn", NodeKind::Spawn)
    }

    /// An aggregation node: combine children into one value.
    pub fn aggregate() -> Self {
        structural_node("aggregate", NodeKind::Aggregate)
    }

    /// Real (non-trailing-placeholder) slot children.
    pub fn real_children(&self) -> impl Iterator<Item = (&str, &CanvasNode)> {
        let count = self.child_count().saturating_sub(1);
        self.children().take(count)
    }
}

fn structural_node(label: &str, kind: NodeKind) -> CanvasNode {
    let mut node = CanvasNode::new_raw(label, CanvasType::any(), kind);
    // a fresh structural node is just the open slot
    let _ = node.add_child("i0", CanvasNode::placeholder(CanvasType::any()));
    node
}

fn slot_name(index: usize) -> String {
    format!("i{index}")
}

/// `replace` on a structural node (TRD Section 7.2).
pub(crate) fn replace_slot(
    node: &CanvasNode,
    child_name: &str,
    replacement: CanvasNode,
) -> Result<CanvasNode, CanvasError> {
    let idx = node
        .child_index(child_name)
        .ok_or_else(|| CanvasError::ChildNotFound {
            node: node.label().to_string(),
            name: child_name.to_string(),
        })?;
    let last = node.child_count() - 1;

    if replacement.is_placeholder() {
        if idx == last {
            // replacing the open slot with another placeholder: no edit
            return Ok(node.clone());
        }
        return remove_slot(node, idx);
    }

    if matches!(node.kind(), NodeKind::Spawn) && !replacement.is_reference() {
        return Err(CanvasError::ReferenceRequired {
            node: node.label().to_string(),
            slot: child_name.to_string(),
        });
    }

    if idx == last {
        append_slot(node, idx, replacement)
    } else {
        // swapping an established slot keeps the declared type
        let placed = replacement.convert(node.ty())?;
        node.set_child(child_name, placed)
    }
}

/// Fill the open slot and grow a new one behind it.
fn append_slot(
    node: &CanvasNode,
    idx: usize,
    replacement: CanvasNode,
) -> Result<CanvasNode, CanvasError> {
    let adopting = node.child_count() == 1;
    let (declared, placed) = if adopting {
        // first real child: its type becomes the node's declared type
        if replacement.ty().is_none_type() {
            return Err(TypeMismatch::new(replacement.ty(), CanvasType::any()).into());
        }
        (replacement.ty().clone(), replacement)
    } else {
        // an established type forces later children to convert into it
        let declared = node.ty().clone();
        let placed = replacement.convert(&declared)?;
        (declared, placed)
    };

    let mut next = node.clone().with_type(declared.clone());
    next.put_child_at(idx, placed);
    next.add_child(slot_name(idx + 1), CanvasNode::placeholder(declared))?;
    Ok(next)
}

/// Drop a real slot child and renumber the survivors to `i0..`.
fn remove_slot(node: &CanvasNode, idx: usize) -> Result<CanvasNode, CanvasError> {
    let mut next = node.clone();
    let name = match next.child_at(idx) {
        Some((n, _)) => n.to_string(),
        None => {
            return Err(CanvasError::ChildNotFound {
                node: node.label().to_string(),
                name: slot_name(idx),
            });
        }
    };
    next.remove_child(&name)?;

    // renumber ascending; each target name was freed by the step before
    for pos in 0..next.child_count() {
        let current = match next.child_at(pos) {
            Some((n, _)) => n.to_string(),
            None => continue,
        };
        let wanted = slot_name(pos);
        if current != wanted {
            next.rename_child(&current, wanted)?;
        }
    }

    if next.child_count() == 1 {
        // back to empty: the declared type resets to the open union
        next.put_child_at(0, CanvasNode::placeholder(CanvasType::any()));
        next = next.with_type(CanvasType::any());
    }
    Ok(next)
}

/// `convert` on a structural node: every real child converts to the target,
/// which becomes the new declared type; the open slot follows.
pub(crate) fn convert_structural(
    node: &CanvasNode,
    target: &CanvasType,
) -> Result<CanvasNode, CanvasError> {
    if target.is_none_type() {
        return Err(TypeMismatch::new(node.ty(), target).into());
    }
    let mut children: Vec<CanvasNode> = node.children().map(|(_, c)| c.clone()).collect();
    for child in children.iter_mut() {
        *child = child.convert(target)?;
    }
    let mut next = node.clone().with_type(target.clone());
    for (pos, child) in children.into_iter().enumerate() {
        next.put_child_at(pos, child);
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reference::RefPath;
    use crate::domain::types::NativeType;
    use crate::domain::value::Literal;

    fn nt(n: NativeType) -> CanvasType {
        CanvasType::native(n)
    }

    #[test]
    fn fresh_structural_node_is_one_open_slot() {
        // Scenario C, first half
        let node = CanvasNode::sequence();
        assert_eq!(node.child_count(), 1);
        assert!(node.ty().is_any());
        let (name, slot) = node.child_at(0).unwrap();
        assert_eq!(name, "i0");
        assert!(slot.is_placeholder());
        assert!(slot.ty().is_any());
    }

    #[test]
    fn first_real_child_fixes_declared_type() {
        // Scenario C, second half
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Integer(1)))
            .unwrap();
        let node = node.convert(&nt(NativeType::Integer)).unwrap();

        assert_eq!(node.ty(), &nt(NativeType::Integer));
        assert_eq!(node.child_count(), 2);
        assert!(!node.child("i0").unwrap().is_placeholder());
        let trailing = node.child("i1").unwrap();
        assert!(trailing.is_placeholder());
        assert_eq!(trailing.ty(), &nt(NativeType::Integer));
    }

    #[test]
    fn later_children_must_convert_into_declared_type() {
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Decimal(1.5)))
            .unwrap();
        // Integer widens into the Decimal sequence
        let node = node
            .replace("i1", CanvasNode::value(Literal::Integer(2)))
            .unwrap();
        assert_eq!(node.child("i1").unwrap().ty(), &nt(NativeType::Decimal));
        assert_eq!(node.child_count(), 3);
        // Money does not
        let err = node
            .replace("i2", CanvasNode::value(Literal::Money(3.0)))
            .unwrap_err();
        assert!(matches!(err, CanvasError::Type(_)));
    }

    #[test]
    fn removing_a_slot_renumbers_survivors() {
        let mut node = CanvasNode::sequence();
        for v in [1, 2, 3] {
            let open = slot_name(node.child_count() - 1);
            node = node
                .replace(&open, CanvasNode::value(Literal::Integer(v)))
                .unwrap();
        }
        assert_eq!(node.child_count(), 4);

        let node = node
            .replace("i1", CanvasNode::placeholder(CanvasType::any()))
            .unwrap();
        assert_eq!(node.child_count(), 3);

        let names: Vec<&str> = node.children().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["i0", "i1", "i2"]);
        // survivors keep their relative order
        match node.child("i0").unwrap().kind() {
            NodeKind::Value(v) => assert_eq!(v.literal, Literal::Integer(1)),
            other => panic!("unexpected kind {:?}", other),
        }
        match node.child("i1").unwrap().kind() {
            NodeKind::Value(v) => assert_eq!(v.literal, Literal::Integer(3)),
            other => panic!("unexpected kind {:?}", other),
        }
        // trailing placeholder remains last
        assert!(node.child("i2").unwrap().is_placeholder());
    }

    #[test]
    fn replacing_open_slot_with_placeholder_changes_nothing() {
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Integer(1)))
            .unwrap();
        let same = node
            .replace("i1", CanvasNode::placeholder(CanvasType::any()))
            .unwrap();
        assert_eq!(same, node);
    }

    #[test]
    fn removing_last_real_child_resets_declared_type() {
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Integer(1)))
            .unwrap();
        let node = node
            .replace("i0", CanvasNode::placeholder(CanvasType::any()))
            .unwrap();
        assert_eq!(node.child_count(), 1);
        assert!(node.ty().is_any());
        assert!(node.child("i0").unwrap().ty().is_any());
    }

    #[test]
    fn spawn_slots_require_references() {
        let node = CanvasNode::spawn();
        let err = node
            .replace("i0", CanvasNode::value(Literal::Integer(1)))
            .unwrap_err();
        assert!(matches!(err, CanvasError::ReferenceRequired { .. }));

        let node = node
            .replace("i0", CanvasNode::reference(RefPath::new("/tasks/buy")))
            .unwrap();
        assert_eq!(node.child_count(), 2);
        assert!(node.child("i0").unwrap().is_reference());
    }

    #[test]
    fn convert_retypes_every_real_child() {
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Integer(1)))
            .unwrap();
        let node = node
            .replace("i1", CanvasNode::value(Literal::Integer(2)))
            .unwrap();
        let node = node.convert(&nt(NativeType::Decimal)).unwrap();

        assert_eq!(node.ty(), &nt(NativeType::Decimal));
        for (_, child) in node.real_children() {
            assert_eq!(child.ty(), &nt(NativeType::Decimal));
        }
        assert_eq!(
            node.child("i2").unwrap().ty(),
            &nt(NativeType::Decimal)
        );
    }

    #[test]
    fn convert_fails_when_a_child_cannot_follow() {
        let node = CanvasNode::sequence()
            .replace("i0", CanvasNode::value(Literal::Money(1.0)))
            .unwrap();
        let err = node.convert(&nt(NativeType::Ticker)).unwrap_err();
        assert!(matches!(err, CanvasError::Type(_)));
        // the failed convert left the node alone
        assert_eq!(node.ty(), &nt(NativeType::Money));
    }
}
