#![allow(dead_code)]

use std::io::Write;

use canvastrader::domain::expr_parser;
use canvastrader::domain::node::CanvasNode;
use canvastrader::domain::types::{CanvasType, NativeType, RecordType};

pub fn nt(native: NativeType) -> CanvasType {
    CanvasType::native(native)
}

/// The standard two-parameter overloaded node used across the suite.
pub fn mul_node() -> CanvasNode {
    parse("mul(_, _)")
}

pub fn parse(expr: &str) -> CanvasNode {
    expr_parser::parse(expr).unwrap()
}

/// A record type shaped like a market data quote.
pub fn quote_record() -> RecordType {
    RecordType::new(
        "Quote",
        vec![
            ("bid".to_string(), nt(NativeType::Price)),
            ("ask".to_string(), nt(NativeType::Price)),
            ("size".to_string(), nt(NativeType::Quantity)),
        ],
    )
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const VALID_STRATEGY_INI: &str = r#"
[strategy]
name = Breakout
description = Buy strength above a fixed level
entry = gt(@/feed/close, $42.00)
exit = lt(@/feed/close, $40.00)
risk = mul(#100, @/feed/close)
"#;
