//! Value literals and leaf value nodes (TRD Section 4.2).
//!
//! One literal variant per native type. Literals carry the actual runtime
//! value; the owning node carries the resolved canvas type, which for
//! placeholder slots may be wider than the literal's own native type.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt;

use crate::domain::types::{CanvasType, NativeType, UnionType};

/// A literal of exactly one native type.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(f64),
    Quantity(f64),
    Money(f64),
    Price(f64),
    Boolean(bool),
    Text(String),
    Ticker(String),
    Duration(Duration),
    TimeRange(NaiveTime, NaiveTime),
    Instant(NaiveDateTime),
}

impl Literal {
    /// The native type this literal is a value of.
    pub fn native(&self) -> NativeType {
        match self {
            Literal::Integer(_) => NativeType::Integer,
            Literal::Decimal(_) => NativeType::Decimal,
            Literal::Quantity(_) => NativeType::Quantity,
            Literal::Money(_) => NativeType::Money,
            Literal::Price(_) => NativeType::Price,
            Literal::Boolean(_) => NativeType::Boolean,
            Literal::Text(_) => NativeType::Text,
            Literal::Ticker(_) => NativeType::Ticker,
            Literal::Duration(_) => NativeType::Duration,
            Literal::TimeRange(_, _) => NativeType::TimeRange,
            Literal::Instant(_) => NativeType::Instant,
        }
    }

    /// The default value a fresh slot of `native` type holds.
    pub fn default_for(native: NativeType) -> Literal {
        match native {
            NativeType::Integer => Literal::Integer(0),
            NativeType::Decimal => Literal::Decimal(0.0),
            NativeType::Quantity => Literal::Quantity(0.0),
            NativeType::Money => Literal::Money(0.0),
            NativeType::Price => Literal::Price(0.0),
            NativeType::Boolean => Literal::Boolean(false),
            NativeType::Text => Literal::Text(String::new()),
            NativeType::Ticker => Literal::Ticker(String::new()),
            NativeType::Duration => Literal::Duration(Duration::zero()),
            NativeType::TimeRange => {
                let midnight = NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default();
                Literal::TimeRange(midnight, midnight)
            }
            NativeType::Instant => Literal::Instant(NaiveDateTime::default()),
        }
    }

    /// The default value for a (possibly union-typed) slot. Union slots get
    /// the default of their first member; the empty union gets an integer
    /// zero that the audit will flag if it ever escapes a placeholder.
    pub fn default_for_type(ty: &CanvasType) -> Literal {
        match ty {
            CanvasType::Native(n) => Literal::default_for(*n),
            CanvasType::Union(u) => match u.members().next() {
                Some(first) => Literal::default_for(first),
                None => Literal::Integer(0),
            },
            CanvasType::Record(_) => Literal::Integer(0),
        }
    }

    /// Numeric widening of the value itself. Mirrors
    /// [`NativeType::widens_to`]: integers widen, nothing else does.
    pub fn widen_to(&self, target: NativeType) -> Option<Literal> {
        if self.native() == target {
            return Some(self.clone());
        }
        match (self, target) {
            (Literal::Integer(v), NativeType::Decimal) => Some(Literal::Decimal(*v as f64)),
            (Literal::Integer(v), NativeType::Quantity) => Some(Literal::Quantity(*v as f64)),
            _ => None,
        }
    }

    /// First member of `union` this literal can widen into, if any.
    pub fn widen_into_union(&self, union: &UnionType) -> Option<Literal> {
        if union.contains(self.native()) {
            return Some(self.clone());
        }
        union.members().find_map(|m| self.widen_to(m))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Decimal(v) => write!(f, "{}", v),
            Literal::Quantity(v) => write!(f, "#{}", v),
            Literal::Money(v) => write!(f, "${}", v),
            Literal::Price(v) => write!(f, "^{}", v),
            Literal::Boolean(v) => write!(f, "{}", v),
            Literal::Text(v) => write!(f, "\"{}\"", v),
            Literal::Ticker(v) => write!(f, "'{}'", v),
            Literal::Duration(d) => write!(f, "{}ms", d.num_milliseconds()),
            Literal::TimeRange(a, b) => write!(f, "{}..{}", a, b),
            Literal::Instant(t) => write!(f, "{}", t),
        }
    }
}
