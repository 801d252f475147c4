//! Signature sets and overload resolution (TRD Section 5).
//!
//! A function-like node owns a set of admissible (params…, return) tuples
//! fixed at construction. Edits never infer new signatures; they only
//! eliminate incompatible ones:
//!
//! - `convert(target)` filters the set by return type, rebuilds each
//!   parameter slot as the union of the surviving candidates, and converts
//!   children into their slots.
//! - `replace(child, x)` narrows in the other direction: pin one parameter,
//!   drop the overloads it rules out, then force every sibling into the
//!   reduced slots. Two passes, all-or-nothing: every forced conversion is
//!   staged on a clone and the edit commits only if all of them succeed.
//!
//! When several signatures stay satisfiable the node's type is the union of
//! their return types; ambiguity flows upward until a later edit narrows it.

use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::node::{CanvasNode, NodeKind};
use crate::domain::types::CanvasType;

/// One admissible overload: N parameter types and a return type.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<CanvasType>,
    pub ret: CanvasType,
}

impl Signature {
    pub fn new(params: Vec<CanvasType>, ret: CanvasType) -> Self {
        Self { params, ret }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// True when every current child type can fill its parameter slot.
    fn satisfied_by(&self, children: &[CanvasNode]) -> bool {
        self.params.len() == children.len()
            && self
                .params
                .iter()
                .zip(children)
                .all(|(param, child)| child.ty().fits(param))
    }
}

/// The signature set of one function-like node. All members share an arity.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSet {
    signatures: Vec<Signature>,
}

impl SignatureSet {
    pub fn new(signatures: Vec<Signature>) -> Self {
        debug_assert!(
            signatures.windows(2).all(|w| w[0].arity() == w[1].arity()),
            "overloads of one node must share an arity"
        );
        Self { signatures }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn arity(&self) -> usize {
        self.signatures.first().map_or(0, Signature::arity)
    }
}

/// Payload of a function node: operation name plus its fixed overload set.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub op: String,
    pub signatures: SignatureSet,
}

impl CanvasNode {
    /// A function node with default placeholder arguments. Each parameter
    /// slot is typed as the union of that position's candidates across the
    /// whole signature set, and the node as the union of all return types.
    pub fn function(op: impl Into<String>, signatures: SignatureSet) -> Self {
        let op = op.into();
        let (ty, slots) = {
            let all: Vec<&Signature> = signatures.iter().collect();
            let slots: Vec<CanvasType> = (0..signatures.arity())
                .map(|pos| position_union(&all, pos))
                .collect();
            (union_of_returns(&all), slots)
        };
        let mut node = CanvasNode::new_raw(
            op.clone(),
            ty,
            NodeKind::Function(FunctionData { op, signatures }),
        );
        for (pos, slot) in slots.into_iter().enumerate() {
            // names are fixed at construction, so this cannot collide
            let _ = node.add_child(format!("p{pos}"), CanvasNode::placeholder(slot));
        }
        node
    }

    /// The signatures still satisfiable by the current children and return
    /// type. Narrowing only ever shrinks this set.
    pub fn surviving_signatures(&self) -> Vec<Signature> {
        match self.kind() {
            NodeKind::Function(data) => {
                let children: Vec<CanvasNode> =
                    self.children().map(|(_, c)| c.clone()).collect();
                data.signatures
                    .iter()
                    .filter(|s| s.ret.fits(self.ty()) && s.satisfied_by(&children))
                    .cloned()
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

/// All candidate types for one parameter position across live signatures.
fn position_candidates<'a>(live: &[&'a Signature], pos: usize) -> Vec<&'a CanvasType> {
    live.iter().filter_map(|s| s.params.get(pos)).collect()
}

/// The union type one parameter slot requires given the live signatures.
/// Union-typed candidates flatten into the member set; a position whose only
/// candidate is a record type keeps the record type itself.
fn position_union(live: &[&Signature], pos: usize) -> CanvasType {
    let candidates = position_candidates(live, pos);
    let mut natives = Vec::new();
    let mut record: Option<CanvasType> = None;
    for c in &candidates {
        match c {
            CanvasType::Native(n) => natives.push(*n),
            CanvasType::Union(u) => natives.extend(u.members()),
            CanvasType::Record(_) => record = Some((*c).clone()),
        }
    }
    if natives.is_empty() {
        if let Some(r) = record {
            return r;
        }
    }
    CanvasType::union_of(natives)
}

/// The return type of a node whose live signature set is `live`.
fn union_of_returns(live: &[&Signature]) -> CanvasType {
    if live.len() == 1 {
        return live[0].ret.clone();
    }
    let mut natives = Vec::new();
    let mut record: Option<CanvasType> = None;
    for s in live {
        match &s.ret {
            CanvasType::Native(n) => natives.push(*n),
            CanvasType::Union(u) => natives.extend(u.members()),
            CanvasType::Record(_) => record = Some(s.ret.clone()),
        }
    }
    if natives.is_empty() {
        if let Some(r) = record {
            return r;
        }
    }
    CanvasType::union_of(natives)
}

fn fits_any(ty: &CanvasType, candidates: &[&CanvasType]) -> bool {
    candidates.iter().any(|c| ty.fits(c))
}

/// Bring one staged child in line with its position slot. Children that
/// already fit are left structurally untouched, except placeholders, which
/// narrow to exactly what the slot now requires.
fn conform_child(
    child: &CanvasNode,
    live: &[&Signature],
    pos: usize,
) -> Result<Option<CanvasNode>, CanvasError> {
    let candidates = position_candidates(live, pos);
    if fits_any(child.ty(), &candidates) {
        if child.is_placeholder() {
            let slot = position_union(live, pos);
            if child.ty() != &slot {
                return Ok(Some(child.convert(&slot)?));
            }
        }
        return Ok(None);
    }
    let slot = position_union(live, pos);
    Ok(Some(child.convert(&slot)?))
}

/// `convert` on a function node (TRD Section 5.2).
pub(crate) fn convert_function(
    node: &CanvasNode,
    data: &FunctionData,
    target: &CanvasType,
) -> Result<CanvasNode, CanvasError> {
    let live: Vec<&Signature> = data
        .signatures
        .iter()
        .filter(|s| s.ret.fits(target))
        .collect();
    if live.is_empty() {
        return Err(TypeMismatch::new(node.ty(), target).into());
    }

    let mut children: Vec<CanvasNode> = node.children().map(|(_, c)| c.clone()).collect();
    for (pos, child) in children.iter_mut().enumerate() {
        if let Some(converted) = conform_child(child, &live, pos)? {
            *child = converted;
        }
    }

    let satisfied: Vec<&Signature> = live
        .iter()
        .copied()
        .filter(|s| s.satisfied_by(&children))
        .collect();
    let ty = match satisfied.len() {
        0 => union_of_returns(&live),
        1 => satisfied[0].ret.clone(),
        _ => union_of_returns(&satisfied),
    };

    let mut staged = node.clone().with_type(ty);
    for (pos, child) in children.into_iter().enumerate() {
        staged.put_child_at(pos, child);
    }
    Ok(staged)
}

/// `replace` on a function node (TRD Section 5.3): two-pass fixed-point
/// narrowing over the signature set.
pub(crate) fn replace_param(
    node: &CanvasNode,
    data: &FunctionData,
    child_name: &str,
    replacement: CanvasNode,
) -> Result<CanvasNode, CanvasError> {
    let pos = node
        .child_index(child_name)
        .ok_or_else(|| CanvasError::ChildNotFound {
            node: node.label().to_string(),
            name: child_name.to_string(),
        })?;

    // Pass 1: overloads admissible under the current return type, then the
    // slot this position offers the replacement.
    let live: Vec<&Signature> = data
        .signatures
        .iter()
        .filter(|s| s.ret.fits(node.ty()))
        .collect();
    if live.is_empty() {
        return Err(TypeMismatch::new(node.ty(), node.ty()).into());
    }

    let candidates = position_candidates(&live, pos);
    let slot = position_union(&live, pos);
    let placed = if fits_any(replacement.ty(), &candidates) {
        replacement
    } else {
        match replacement.convert(&slot) {
            Ok(converted) => converted,
            // Documented probe: a failed union conversion falls back to any
            // record-typed candidate before the edit is rejected.
            Err(CanvasError::Type(type_err)) => {
                let mut fallback = None;
                for candidate in &candidates {
                    if matches!(candidate, CanvasType::Record(_)) {
                        if let Ok(converted) = replacement.convert(candidate) {
                            fallback = Some(converted);
                            break;
                        }
                    }
                }
                fallback.ok_or(CanvasError::Type(type_err))?
            }
            Err(other) => return Err(other),
        }
    };

    let live: Vec<&Signature> = live
        .into_iter()
        .filter(|s| placed.ty().fits(&s.params[pos]))
        .collect();
    if live.is_empty() {
        return Err(TypeMismatch::new(placed.ty(), &slot).into());
    }

    // Pass 2: fixing this parameter may have eliminated overloads, so every
    // child, the placed one included, must conform to its reduced slot (an
    // open placeholder placed here retypes to what the slot now offers).
    // Staged on a clone; any failure rejects the whole edit.
    let mut children: Vec<CanvasNode> = node.children().map(|(_, c)| c.clone()).collect();
    children[pos] = placed;
    for (j, child) in children.iter_mut().enumerate() {
        if let Some(converted) = conform_child(child, &live, j)? {
            *child = converted;
        }
    }

    let satisfied: Vec<&Signature> = live
        .iter()
        .copied()
        .filter(|s| s.satisfied_by(&children))
        .collect();
    let ty = match satisfied.len() {
        0 => union_of_returns(&live),
        1 => satisfied[0].ret.clone(),
        _ => union_of_returns(&satisfied),
    };

    let mut staged = node.clone().with_type(ty);
    for (j, child) in children.into_iter().enumerate() {
        staged.put_child_at(j, child);
    }
    Ok(staged)
}
