//! Canvas persistence port (TRD Section 11.1).
//!
//! Trees cross the persistence boundary as [`NodeRecord`] values, a flat
//! serde representation with no behaviour attached. Encoding runs through
//! the visitor protocol so this module never branches on [`NodeKind`]
//! internals; decoding rebuilds nodes in their exact persisted state
//! without replaying the edits that produced them.
//!
//! Function nodes persist only their operation name. The overload registry
//! is the single source of truth for signature sets, so a stored canvas
//! picks up registry fixes on load instead of resurrecting a stale set.

use serde::{Deserialize, Serialize};

use crate::domain::error::CanvasError;
use crate::domain::expr_parser::builtin;
use crate::domain::node::{CanvasNode, NodeKind, ValueData};
use crate::domain::reader::{MissingFieldPolicy, ReaderData};
use crate::domain::reference::{ProxyData, RefPath};
use crate::domain::signature::FunctionData;
use crate::domain::types::{CanvasType, NativeType, RecordType};
use crate::domain::value::Literal;
use crate::domain::visitor::NodeVisitor;

/// Where assembled canvases live between sessions.
pub trait StorePort {
    fn save(&self, name: &str, root: &NodeRecord) -> Result<(), CanvasError>;
    fn load(&self, name: &str) -> Result<NodeRecord, CanvasError>;
    fn list(&self) -> Result<Vec<String>, CanvasError>;
}

/// One persisted node, children in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub label: String,
    pub ty: TypeRecord,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(flatten)]
    pub kind: KindRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<(String, NodeRecord)>,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindRecord {
    Value {
        literal: LiteralRecord,
        #[serde(default)]
        placeholder: bool,
    },
    Reference {
        path: String,
    },
    Proxy {
        path: String,
        original: Box<NodeRecord>,
    },
    Function {
        op: String,
    },
    Sequence,
    Spawn,
    Aggregate,
    Reader {
        field: String,
        on_missing: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LiteralRecord {
    Integer(i64),
    Decimal(f64),
    Quantity(f64),
    Money(f64),
    Price(f64),
    Boolean(bool),
    Text(String),
    Ticker(String),
    DurationMs(i64),
    TimeRange(String, String),
    Instant(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeRecord {
    Native { name: String },
    Union { members: Vec<String> },
    Record { name: String, fields: Vec<(String, TypeRecord)> },
}

impl NodeRecord {
    /// Encode a live tree for persistence.
    pub fn from_node(node: &CanvasNode) -> NodeRecord {
        let mut encoder = KindEncoder {
            kind: KindRecord::Sequence,
        };
        node.accept(&mut encoder);
        NodeRecord {
            label: node.label().to_string(),
            ty: encode_type(node.ty()),
            visible: node.visible(),
            read_only: node.read_only(),
            kind: encoder.kind,
            children: node
                .children()
                .map(|(name, child)| (name.to_string(), NodeRecord::from_node(child)))
                .collect(),
        }
    }

    /// Rebuild the live tree this record was encoded from.
    pub fn to_node(&self) -> Result<CanvasNode, CanvasError> {
        let kind = match &self.kind {
            KindRecord::Value { literal, placeholder } => NodeKind::Value(ValueData {
                literal: decode_literal(literal)?,
                placeholder: *placeholder,
            }),
            KindRecord::Reference { path } => NodeKind::Reference(RefPath::new(path.clone())),
            KindRecord::Proxy { path, original } => NodeKind::Proxy(ProxyData {
                path: RefPath::new(path.clone()),
                original: Box::new(original.to_node()?),
            }),
            KindRecord::Function { op } => {
                let signatures = builtin(op).ok_or_else(|| CanvasError::Store {
                    reason: format!("unknown operation '{op}'"),
                })?;
                NodeKind::Function(FunctionData {
                    op: op.clone(),
                    signatures,
                })
            }
            KindRecord::Sequence => NodeKind::Sequence,
            KindRecord::Spawn => NodeKind::Spawn,
            KindRecord::Aggregate => NodeKind::Aggregate,
            KindRecord::Reader { field, on_missing } => NodeKind::Reader(ReaderData {
                field: field.clone(),
                on_missing: MissingFieldPolicy::parse(on_missing).ok_or_else(|| {
                    CanvasError::Store {
                        reason: format!("unknown missing-field policy '{on_missing}'"),
                    }
                })?,
            }),
        };

        let mut node = CanvasNode::new_raw(self.label.clone(), decode_type(&self.ty)?, kind);
        for (name, child) in &self.children {
            node.add_child(name.clone(), child.to_node()?)?;
        }
        Ok(node
            .with_visible(self.visible)
            .with_read_only(self.read_only))
    }
}

struct KindEncoder {
    kind: KindRecord,
}

impl NodeVisitor for KindEncoder {
    fn visit_value(&mut self, node: &CanvasNode, literal: &Literal) {
        self.kind = KindRecord::Value {
            literal: encode_literal(literal),
            placeholder: node.is_placeholder(),
        };
    }

    fn visit_reference(&mut self, _node: &CanvasNode, path: &RefPath) {
        self.kind = KindRecord::Reference {
            path: path.as_str().to_string(),
        };
    }

    fn visit_proxy(&mut self, _node: &CanvasNode, proxy: &ProxyData) {
        self.kind = KindRecord::Proxy {
            path: proxy.path.as_str().to_string(),
            original: Box::new(NodeRecord::from_node(&proxy.original)),
        };
    }

    fn visit_function(&mut self, _node: &CanvasNode, function: &FunctionData) {
        self.kind = KindRecord::Function {
            op: function.op.clone(),
        };
    }

    fn visit_sequence(&mut self, _node: &CanvasNode) {
        self.kind = KindRecord::Sequence;
    }

    fn visit_spawn(&mut self, _node: &CanvasNode) {
        self.kind = KindRecord::Spawn;
    }

    fn visit_aggregate(&mut self, _node: &CanvasNode) {
        self.kind = KindRecord::Aggregate;
    }

    fn visit_reader(&mut self, _node: &CanvasNode, reader: &ReaderData) {
        self.kind = KindRecord::Reader {
            field: reader.field.clone(),
            on_missing: reader.on_missing.as_str().to_string(),
        };
    }
}

const TIME_FORMAT: &str = "%H:%M:%S";
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn encode_literal(literal: &Literal) -> LiteralRecord {
    match literal {
        Literal::Integer(v) => LiteralRecord::Integer(*v),
        Literal::Decimal(v) => LiteralRecord::Decimal(*v),
        Literal::Quantity(v) => LiteralRecord::Quantity(*v),
        Literal::Money(v) => LiteralRecord::Money(*v),
        Literal::Price(v) => LiteralRecord::Price(*v),
        Literal::Boolean(v) => LiteralRecord::Boolean(*v),
        Literal::Text(v) => LiteralRecord::Text(v.clone()),
        Literal::Ticker(v) => LiteralRecord::Ticker(v.clone()),
        Literal::Duration(d) => LiteralRecord::DurationMs(d.num_milliseconds()),
        Literal::TimeRange(from, to) => LiteralRecord::TimeRange(
            from.format(TIME_FORMAT).to_string(),
            to.format(TIME_FORMAT).to_string(),
        ),
        Literal::Instant(t) => LiteralRecord::Instant(t.format(INSTANT_FORMAT).to_string()),
    }
}

fn decode_literal(record: &LiteralRecord) -> Result<Literal, CanvasError> {
    let bad = |what: &str, value: &str| CanvasError::Store {
        reason: format!("invalid {what} '{value}'"),
    };
    Ok(match record {
        LiteralRecord::Integer(v) => Literal::Integer(*v),
        LiteralRecord::Decimal(v) => Literal::Decimal(*v),
        LiteralRecord::Quantity(v) => Literal::Quantity(*v),
        LiteralRecord::Money(v) => Literal::Money(*v),
        LiteralRecord::Price(v) => Literal::Price(*v),
        LiteralRecord::Boolean(v) => Literal::Boolean(*v),
        LiteralRecord::Text(v) => Literal::Text(v.clone()),
        LiteralRecord::Ticker(v) => Literal::Ticker(v.clone()),
        LiteralRecord::DurationMs(ms) => Literal::Duration(chrono::Duration::milliseconds(*ms)),
        LiteralRecord::TimeRange(from, to) => Literal::TimeRange(
            chrono::NaiveTime::parse_from_str(from, TIME_FORMAT)
                .map_err(|_| bad("time", from))?,
            chrono::NaiveTime::parse_from_str(to, TIME_FORMAT).map_err(|_| bad("time", to))?,
        ),
        LiteralRecord::Instant(t) => Literal::Instant(
            chrono::NaiveDateTime::parse_from_str(t, INSTANT_FORMAT)
                .map_err(|_| bad("instant", t))?,
        ),
    })
}

fn encode_type(ty: &CanvasType) -> TypeRecord {
    match ty {
        CanvasType::Native(n) => TypeRecord::Native {
            name: n.name().to_string(),
        },
        CanvasType::Union(u) => TypeRecord::Union {
            members: u.members().map(|m| m.name().to_string()).collect(),
        },
        CanvasType::Record(r) => TypeRecord::Record {
            name: r.name.clone(),
            fields: r
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), encode_type(field)))
                .collect(),
        },
    }
}

fn decode_type(record: &TypeRecord) -> Result<CanvasType, CanvasError> {
    let parse_native = |name: &str| {
        NativeType::parse(name).ok_or_else(|| CanvasError::Store {
            reason: format!("unknown native type '{name}'"),
        })
    };
    match record {
        TypeRecord::Native { name } => Ok(CanvasType::native(parse_native(name)?)),
        TypeRecord::Union { members } => {
            let members: Result<Vec<NativeType>, CanvasError> =
                members.iter().map(|m| parse_native(m)).collect();
            Ok(CanvasType::union_of(members?))
        }
        TypeRecord::Record { name, fields } => {
            let fields: Result<Vec<(String, CanvasType)>, CanvasError> = fields
                .iter()
                .map(|(n, f)| Ok((n.clone(), decode_type(f)?)))
                .collect();
            Ok(CanvasType::record(RecordType::new(name.clone(), fields?)))
        }
    }
}
