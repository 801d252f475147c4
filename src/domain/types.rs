//! Canvas type algebra (TRD Section 3).
//!
//! Three families of types flow through a canvas tree:
//! - `NativeType`: one concrete runtime value type (integer, money, ticker…)
//! - union types: a set-valued placeholder, "any of these natives"
//! - record types: a named ordered list of (field, type) pairs
//!
//! Types are compared through the three-valued [`Compatibility`] relation.
//! All functions here are pure; types are immutable values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// A concrete, non-composite runtime value type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NativeType {
    Integer,
    Decimal,
    Quantity,
    Money,
    Price,
    Boolean,
    Text,
    Ticker,
    Duration,
    TimeRange,
    Instant,
}

/// Every native type, in canonical order. Used to detect the universal union.
pub const ALL_NATIVES: [NativeType; 11] = [
    NativeType::Integer,
    NativeType::Decimal,
    NativeType::Quantity,
    NativeType::Money,
    NativeType::Price,
    NativeType::Boolean,
    NativeType::Text,
    NativeType::Ticker,
    NativeType::Duration,
    NativeType::TimeRange,
    NativeType::Instant,
];

impl NativeType {
    /// One-way numeric widening. Asymmetric: an integer literal can stand in
    /// for a decimal or a quantity, never the reverse.
    pub fn widens_to(self, other: NativeType) -> bool {
        matches!(
            (self, other),
            (NativeType::Integer, NativeType::Decimal)
                | (NativeType::Integer, NativeType::Quantity)
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            NativeType::Integer
                | NativeType::Decimal
                | NativeType::Quantity
                | NativeType::Money
                | NativeType::Price
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            NativeType::Integer => "Integer",
            NativeType::Decimal => "Decimal",
            NativeType::Quantity => "Quantity",
            NativeType::Money => "Money",
            NativeType::Price => "Price",
            NativeType::Boolean => "Boolean",
            NativeType::Text => "Text",
            NativeType::Ticker => "Ticker",
            NativeType::Duration => "Duration",
            NativeType::TimeRange => "TimeRange",
            NativeType::Instant => "Instant",
        }
    }

    /// Inverse of [`NativeType::name`], for config and store round trips.
    pub fn parse(name: &str) -> Option<NativeType> {
        ALL_NATIVES.iter().copied().find(|n| n.name() == name)
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A de-duplicated, order-independent set of native types.
///
/// The empty set is the canonical "no type"; the full set is the canonical
/// "any type". Sets are `BTreeSet`s so equality never depends on the order
/// members were supplied in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionType {
    members: BTreeSet<NativeType>,
}

impl UnionType {
    pub fn none() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    pub fn any() -> Self {
        Self {
            members: ALL_NATIVES.iter().copied().collect(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = NativeType> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, native: NativeType) -> bool {
        self.members.contains(&native)
    }

    /// True when a value of `native` type can fill this union, either by
    /// membership or by widening into a member.
    pub fn admits(&self, native: NativeType) -> bool {
        self.contains(native) || self.members.iter().any(|m| native.widens_to(*m))
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_any(&self) -> bool {
        self.members.len() == ALL_NATIVES.len()
    }

    pub fn overlaps(&self, other: &UnionType) -> bool {
        self.members.intersection(&other.members).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

impl fmt::Display for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        if self.is_any() {
            return f.write_str("Any");
        }
        let names: Vec<&str> = self.members.iter().map(|n| n.name()).collect();
        write!(f, "({})", names.join("|"))
    }
}

/// A named, ordered list of (field name, field type) pairs.
///
/// Used for query-result shaped values; a reader node extracts one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<(String, CanvasType)>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<(String, CanvasType)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&CanvasType> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, ty)| ty)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A type attached to a canvas node.
///
/// Cheap to clone: record payloads are reference-counted and shared between
/// the many nodes that mention them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasType {
    Native(NativeType),
    Union(UnionType),
    Record(Rc<RecordType>),
}

/// Result of comparing two types (TRD Section 3.2).
///
/// `Compatible` is one-way: `compatibility(a, b) == Compatible` means a value
/// of type `a` can fill a slot of type `b`, not the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    None,
    Compatible,
    Equal,
}

impl CanvasType {
    pub fn native(native: NativeType) -> Self {
        CanvasType::Native(native)
    }

    pub fn record(record: RecordType) -> Self {
        CanvasType::Record(Rc::new(record))
    }

    /// The universal placeholder type.
    pub fn any() -> Self {
        CanvasType::Union(UnionType::any())
    }

    /// The empty placeholder type.
    pub fn none() -> Self {
        CanvasType::Union(UnionType::none())
    }

    /// Build a union type from candidate natives.
    ///
    /// Duplicates collapse, order is irrelevant, and a one-element set
    /// collapses to the native type itself so a singleton union and its
    /// member are the same value.
    pub fn union_of(candidates: impl IntoIterator<Item = NativeType>) -> Self {
        let members: BTreeSet<NativeType> = candidates.into_iter().collect();
        if members.len() == 1 {
            if let Some(&only) = members.iter().next() {
                return CanvasType::Native(only);
            }
        }
        CanvasType::Union(UnionType { members })
    }

    pub fn as_native(&self) -> Option<NativeType> {
        match self {
            CanvasType::Native(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionType> {
        match self {
            CanvasType::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<RecordType>> {
        match self {
            CanvasType::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, CanvasType::Union(u) if u.is_any())
    }

    pub fn is_none_type(&self) -> bool {
        matches!(self, CanvasType::Union(u) if u.is_empty())
    }

    /// Shorthand for `compatibility(self, slot) != None`.
    pub fn fits(&self, slot: &CanvasType) -> bool {
        compatibility(self, slot) != Compatibility::None
    }
}

impl fmt::Display for CanvasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasType::Native(n) => write!(f, "{}", n),
            CanvasType::Union(u) => write!(f, "{}", u),
            CanvasType::Record(r) => write!(f, "{}", r),
        }
    }
}

/// The compatibility relation over canvas types.
///
/// Reflexive (`Equal` for identical types), symmetric only for `Equal`.
/// `Compatible` carries direction: the left type narrows into the right slot.
pub fn compatibility(a: &CanvasType, b: &CanvasType) -> Compatibility {
    // Identity fast path; Rc pointer equality short-circuits record compares.
    match (a, b) {
        (CanvasType::Record(ra), CanvasType::Record(rb)) if Rc::ptr_eq(ra, rb) => {
            return Compatibility::Equal;
        }
        _ => {}
    }
    if a == b {
        return Compatibility::Equal;
    }
    match (a, b) {
        (CanvasType::Native(na), CanvasType::Native(nb)) => {
            if na.widens_to(*nb) {
                Compatibility::Compatible
            } else {
                Compatibility::None
            }
        }
        (CanvasType::Native(na), CanvasType::Union(ub)) => {
            if ub.admits(*na) {
                Compatibility::Compatible
            } else {
                Compatibility::None
            }
        }
        (CanvasType::Union(ua), CanvasType::Native(nb)) => {
            if ua.contains(*nb) {
                Compatibility::Compatible
            } else {
                Compatibility::None
            }
        }
        (CanvasType::Union(ua), CanvasType::Union(ub)) => {
            if ua.overlaps(ub) {
                Compatibility::Compatible
            } else {
                Compatibility::None
            }
        }
        // Records relate only to themselves; equality was handled above.
        _ => Compatibility::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reflexive_for_every_native() {
        for n in ALL_NATIVES {
            let t = CanvasType::native(n);
            assert_eq!(compatibility(&t, &t), Compatibility::Equal);
        }
    }

    #[test]
    fn widening_is_one_way() {
        let int = CanvasType::native(NativeType::Integer);
        let dec = CanvasType::native(NativeType::Decimal);
        assert_eq!(compatibility(&int, &dec), Compatibility::Compatible);
        assert_eq!(compatibility(&dec, &int), Compatibility::None);
    }

    #[test]
    fn unrelated_natives_do_not_convert() {
        let money = CanvasType::native(NativeType::Money);
        let ticker = CanvasType::native(NativeType::Ticker);
        assert_eq!(compatibility(&money, &ticker), Compatibility::None);
        assert_eq!(compatibility(&ticker, &money), Compatibility::None);
    }

    #[test]
    fn union_collapses_singleton_to_native() {
        let t = CanvasType::union_of([NativeType::Money]);
        assert_eq!(t, CanvasType::native(NativeType::Money));
    }

    #[test]
    fn union_deduplicates() {
        let t = CanvasType::union_of([
            NativeType::Money,
            NativeType::Quantity,
            NativeType::Money,
        ]);
        let u = t.as_union().unwrap();
        assert_eq!(u.len(), 2);
    }

    #[test]
    fn empty_union_is_none_full_union_is_any() {
        let none = CanvasType::union_of([]);
        assert!(none.is_none_type());
        assert_eq!(none, CanvasType::none());

        let any = CanvasType::union_of(ALL_NATIVES);
        assert!(any.is_any());
        assert_eq!(any, CanvasType::any());
    }

    #[test]
    fn union_membership_drives_compatibility() {
        let u = CanvasType::union_of([NativeType::Money, NativeType::Quantity]);
        let money = CanvasType::native(NativeType::Money);
        let text = CanvasType::native(NativeType::Text);

        assert_eq!(compatibility(&money, &u), Compatibility::Compatible);
        assert_eq!(compatibility(&u, &money), Compatibility::Compatible);
        assert_eq!(compatibility(&text, &u), Compatibility::None);
        assert_eq!(compatibility(&u, &text), Compatibility::None);
    }

    #[test]
    fn native_widens_into_union() {
        // Integer is not a member but widens to Decimal, which is.
        let u = CanvasType::union_of([NativeType::Decimal, NativeType::Money]);
        let int = CanvasType::native(NativeType::Integer);
        assert_eq!(compatibility(&int, &u), Compatibility::Compatible);
        // The other direction requires membership.
        assert_eq!(compatibility(&u, &int), Compatibility::None);
    }

    #[test]
    fn union_overlap() {
        let a = CanvasType::union_of([NativeType::Money, NativeType::Quantity]);
        let b = CanvasType::union_of([NativeType::Quantity, NativeType::Text]);
        let c = CanvasType::union_of([NativeType::Ticker, NativeType::Boolean]);
        assert_eq!(compatibility(&a, &b), Compatibility::Compatible);
        assert_eq!(compatibility(&a, &c), Compatibility::None);
    }

    #[test]
    fn record_equality_and_isolation() {
        let shape = RecordType::new(
            "Quote",
            vec![
                ("bid".to_string(), CanvasType::native(NativeType::Price)),
                ("ask".to_string(), CanvasType::native(NativeType::Price)),
            ],
        );
        let a = CanvasType::record(shape.clone());
        let b = CanvasType::record(shape);
        assert_eq!(compatibility(&a, &b), Compatibility::Equal);
        assert_eq!(compatibility(&a, &a.clone()), Compatibility::Equal);

        let money = CanvasType::native(NativeType::Money);
        assert_eq!(compatibility(&a, &money), Compatibility::None);
        assert_eq!(compatibility(&money, &a), Compatibility::None);
    }

    #[test]
    fn record_field_lookup() {
        let shape = RecordType::new(
            "Quote",
            vec![("bid".to_string(), CanvasType::native(NativeType::Price))],
        );
        assert_eq!(
            shape.field("bid"),
            Some(&CanvasType::native(NativeType::Price))
        );
        assert_eq!(shape.field("mid"), None);
        assert_eq!(shape.field_count(), 1);
    }

    #[test]
    fn display_forms() {
        assert_eq!(CanvasType::native(NativeType::Money).to_string(), "Money");
        assert_eq!(CanvasType::any().to_string(), "Any");
        assert_eq!(CanvasType::none().to_string(), "None");
        let u = CanvasType::union_of([NativeType::Quantity, NativeType::Money]);
        assert_eq!(u.to_string(), "(Quantity|Money)");
    }

    #[test]
    fn native_name_round_trip() {
        for n in ALL_NATIVES {
            assert_eq!(NativeType::parse(n.name()), Some(n));
        }
        assert_eq!(NativeType::parse("Widget"), None);
    }

    fn native_strategy() -> impl Strategy<Value = NativeType> {
        prop::sample::select(ALL_NATIVES.to_vec())
    }

    proptest! {
        #[test]
        fn union_is_order_independent(mut natives in prop::collection::vec(native_strategy(), 0..8)) {
            let forward = CanvasType::union_of(natives.clone());
            natives.reverse();
            let backward = CanvasType::union_of(natives);
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn compatibility_is_reflexive(n in native_strategy()) {
            let t = CanvasType::native(n);
            prop_assert_eq!(compatibility(&t, &t), Compatibility::Equal);
        }

        #[test]
        fn equal_is_symmetric(a in native_strategy(), b in native_strategy()) {
            let ta = CanvasType::native(a);
            let tb = CanvasType::native(b);
            if compatibility(&ta, &tb) == Compatibility::Equal {
                prop_assert_eq!(compatibility(&tb, &ta), Compatibility::Equal);
            }
        }
    }
}
