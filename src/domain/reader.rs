//! Record field reader nodes (TRD Section 6.3).
//!
//! A reader extracts one named field from a record-typed source child and
//! exposes the field's type as its own. The missing-field policy is a
//! persisted setting: strict readers refuse to build against a record
//! without the field, lenient ones expose the universal type and leave the
//! gap to the executor.

use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::node::{CanvasNode, NodeKind};
use crate::domain::types::CanvasType;

/// What a reader does when its record has no such field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFieldPolicy {
    /// Reject the edit that would produce the dangling read.
    Error,
    /// Keep the read; it produces the field type's default at run time.
    Default,
}

impl MissingFieldPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingFieldPolicy::Error => "error",
            MissingFieldPolicy::Default => "default",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error" => Some(MissingFieldPolicy::Error),
            "default" => Some(MissingFieldPolicy::Default),
            _ => None,
        }
    }
}

/// Payload of a reader node.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderData {
    pub field: String,
    pub on_missing: MissingFieldPolicy,
}

/// The type a reader with `data` exposes over `source`.
pub(crate) fn reader_type(
    data: &ReaderData,
    source: &CanvasNode,
) -> Result<CanvasType, CanvasError> {
    let record = source
        .ty()
        .as_record()
        .ok_or_else(|| TypeMismatch::new(source.ty(), "a record type"))?;
    match record.field(&data.field) {
        Some(ty) => Ok(ty.clone()),
        None => match data.on_missing {
            MissingFieldPolicy::Error => Err(CanvasError::UnknownField {
                record: record.name.clone(),
                field: data.field.clone(),
            }),
            MissingFieldPolicy::Default => Ok(CanvasType::any()),
        },
    }
}

impl CanvasNode {
    /// A reader over a record-typed source node. The single child is named
    /// `source`; the node's type is the field's type.
    pub fn reader(
        field: impl Into<String>,
        on_missing: MissingFieldPolicy,
        source: CanvasNode,
    ) -> Result<Self, CanvasError> {
        let data = ReaderData {
            field: field.into(),
            on_missing,
        };
        let ty = reader_type(&data, &source)?;
        let mut node =
            CanvasNode::new_raw(data.field.clone(), ty, NodeKind::Reader(data));
        node.add_child("source", source)?;
        Ok(node)
    }
}

/// `replace` on a reader: the new source must still be record-shaped; the
/// node re-types to the field the new record carries.
pub(crate) fn replace_source(
    node: &CanvasNode,
    data: &ReaderData,
    child_name: &str,
    replacement: CanvasNode,
) -> Result<CanvasNode, CanvasError> {
    if node.child(child_name).is_none() {
        return Err(CanvasError::ChildNotFound {
            node: node.label().to_string(),
            name: child_name.to_string(),
        });
    }
    let ty = reader_type(data, &replacement)?;
    let next = node.set_child(child_name, replacement)?;
    Ok(next.with_type(ty))
}

/// `convert` on a reader: the exposed field type either fits the target or
/// the conversion is impossible; the source never changes shape.
pub(crate) fn convert_reader(
    node: &CanvasNode,
    _data: &ReaderData,
    target: &CanvasType,
) -> Result<CanvasNode, CanvasError> {
    if node.ty().fits(target) {
        Ok(node.clone())
    } else {
        Err(TypeMismatch::new(node.ty(), target).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{NativeType, RecordType};
    use crate::domain::value::Literal;

    fn quote_source() -> CanvasNode {
        let record = RecordType::new(
            "Quote",
            vec![
                ("bid".to_string(), CanvasType::native(NativeType::Price)),
                ("size".to_string(), CanvasType::native(NativeType::Quantity)),
            ],
        );
        // a reference standing in for a record-producing node
        CanvasNode::reference(crate::domain::reference::RefPath::new("/book/quote"))
            .convert(&CanvasType::record(record))
            .unwrap()
    }

    #[test]
    fn reader_exposes_field_type() {
        let node =
            CanvasNode::reader("bid", MissingFieldPolicy::Error, quote_source()).unwrap();
        assert_eq!(node.ty(), &CanvasType::native(NativeType::Price));
        assert_eq!(node.child_count(), 1);
        assert!(node.child("source").is_some());
    }

    #[test]
    fn strict_reader_rejects_unknown_field() {
        let err = CanvasNode::reader("mid", MissingFieldPolicy::Error, quote_source())
            .unwrap_err();
        assert!(matches!(err, CanvasError::UnknownField { .. }));
    }

    #[test]
    fn lenient_reader_falls_back_to_any() {
        let node =
            CanvasNode::reader("mid", MissingFieldPolicy::Default, quote_source()).unwrap();
        assert!(node.ty().is_any());
    }

    #[test]
    fn replacing_source_retypes_the_reader() {
        let node =
            CanvasNode::reader("size", MissingFieldPolicy::Error, quote_source()).unwrap();
        assert_eq!(node.ty(), &CanvasType::native(NativeType::Quantity));

        let fill = RecordType::new(
            "Fill",
            vec![("size".to_string(), CanvasType::native(NativeType::Integer))],
        );
        let new_source = CanvasNode::reference(crate::domain::reference::RefPath::new("/fills/last"))
            .convert(&CanvasType::record(fill))
            .unwrap();
        let node = node.replace("source", new_source).unwrap();
        assert_eq!(node.ty(), &CanvasType::native(NativeType::Integer));
    }

    #[test]
    fn replacing_source_with_non_record_fails() {
        let node =
            CanvasNode::reader("bid", MissingFieldPolicy::Error, quote_source()).unwrap();
        let err = node
            .replace("source", CanvasNode::value(Literal::Money(1.0)))
            .unwrap_err();
        assert!(matches!(err, CanvasError::Type(_)));
    }

    #[test]
    fn convert_checks_the_exposed_type() {
        let node =
            CanvasNode::reader("bid", MissingFieldPolicy::Error, quote_source()).unwrap();
        assert!(node.convert(&CanvasType::native(NativeType::Price)).is_ok());
        assert!(node.convert(&CanvasType::native(NativeType::Text)).is_err());
    }

    #[test]
    fn policy_round_trips_through_text() {
        for policy in [MissingFieldPolicy::Error, MissingFieldPolicy::Default] {
            assert_eq!(MissingFieldPolicy::parse(policy.as_str()), Some(policy));
        }
        assert_eq!(MissingFieldPolicy::parse("explode"), None);
    }
}
