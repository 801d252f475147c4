//! Text expression parser (TRD Section 10).
//!
//! Parses the compact strategy expression language into canvas trees:
//!
//! ```text
//! mul($10.50, #3)
//! seq(buy('BHP'), @/risk/check, sell('BHP'))
//! gt(close, 42.0)
//! ```
//!
//! The parser never types anything itself. Every argument is placed with
//! `replace`, so overload narrowing runs exactly as it would for an
//! interactive edit, and ill-typed expressions fail with the same
//! `TypeMismatch` the canvas would raise.

use crate::domain::error::{CanvasError, ParseError};
use crate::domain::node::CanvasNode;
use crate::domain::reference::RefPath;
use crate::domain::signature::{Signature, SignatureSet};
use crate::domain::types::{CanvasType, NativeType};
use crate::domain::value::Literal;

/// The overload set of a named builtin operation, if one exists.
pub fn builtin(op: &str) -> Option<SignatureSet> {
    let nt = CanvasType::native;
    let numeric_pairs = |ops: &[NativeType]| -> Vec<Signature> {
        ops.iter()
            .map(|n| Signature::new(vec![nt(*n), nt(*n)], nt(*n)))
            .collect()
    };

    match op {
        "add" | "sub" | "min" | "max" => Some(SignatureSet::new(numeric_pairs(&[
            NativeType::Integer,
            NativeType::Decimal,
            NativeType::Quantity,
            NativeType::Money,
            NativeType::Price,
        ]))),
        "mul" => Some(SignatureSet::new(vec![
            Signature::new(
                vec![nt(NativeType::Quantity), nt(NativeType::Money)],
                nt(NativeType::Money),
            ),
            Signature::new(
                vec![nt(NativeType::Money), nt(NativeType::Quantity)],
                nt(NativeType::Money),
            ),
            Signature::new(
                vec![nt(NativeType::Quantity), nt(NativeType::Quantity)],
                nt(NativeType::Quantity),
            ),
            Signature::new(
                vec![nt(NativeType::Integer), nt(NativeType::Integer)],
                nt(NativeType::Integer),
            ),
            Signature::new(
                vec![nt(NativeType::Decimal), nt(NativeType::Decimal)],
                nt(NativeType::Decimal),
            ),
        ])),
        "div" => Some(SignatureSet::new(vec![
            Signature::new(
                vec![nt(NativeType::Money), nt(NativeType::Quantity)],
                nt(NativeType::Price),
            ),
            Signature::new(
                vec![nt(NativeType::Decimal), nt(NativeType::Decimal)],
                nt(NativeType::Decimal),
            ),
            Signature::new(
                vec![nt(NativeType::Quantity), nt(NativeType::Quantity)],
                nt(NativeType::Decimal),
            ),
        ])),
        "gt" | "lt" | "gte" | "lte" | "eq" => {
            let sigs = [
                NativeType::Integer,
                NativeType::Decimal,
                NativeType::Quantity,
                NativeType::Money,
                NativeType::Price,
            ]
            .iter()
            .map(|n| Signature::new(vec![nt(*n), nt(*n)], nt(NativeType::Boolean)))
            .collect();
            Some(SignatureSet::new(sigs))
        }
        "and" | "or" => Some(SignatureSet::new(vec![Signature::new(
            vec![nt(NativeType::Boolean), nt(NativeType::Boolean)],
            nt(NativeType::Boolean),
        )])),
        "not" => Some(SignatureSet::new(vec![Signature::new(
            vec![nt(NativeType::Boolean)],
            nt(NativeType::Boolean),
        )])),
        "buy" | "sell" => Some(SignatureSet::new(vec![Signature::new(
            vec![nt(NativeType::Ticker), nt(NativeType::Quantity)],
            nt(NativeType::Boolean),
        )])),
        _ => None,
    }
}

struct Parser {
    input: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|ch| ch.is_whitespace()) {
            self.advance();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            found => Err(ParseError {
                message: format!(
                    "expected '{}', found {}",
                    expected,
                    found.map_or("end of input".to_string(), |ch| format!("'{ch}'"))
                ),
                position: self.pos,
            }),
        }
    }

    fn peek_word(&self) -> String {
        self.input[self.pos..]
            .iter()
            .take_while(|ch| ch.is_ascii_alphanumeric() || **ch == '_')
            .collect()
    }

    fn consume_word(&mut self) -> String {
        let word = self.peek_word();
        self.pos += word.chars().count();
        word
    }

    fn parse_number(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        let mut saw_digit = false;
        let mut saw_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                saw_digit = true;
                self.advance();
            } else if ch == '.' && !saw_dot {
                saw_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        if !saw_digit {
            return Err(ParseError {
                message: "expected a number".to_string(),
                position: start,
            });
        }
        let text: String = self.input[start..self.pos].iter().collect();
        if saw_dot {
            text.parse::<f64>()
                .map(Literal::Decimal)
                .map_err(|_| ParseError {
                    message: format!("invalid number '{text}'"),
                    position: start,
                })
        } else {
            text.parse::<i64>()
                .map(Literal::Integer)
                .map_err(|_| ParseError {
                    message: format!("invalid number '{text}'"),
                    position: start,
                })
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(text),
                Some(ch) => text.push(ch),
                None => {
                    return Err(ParseError {
                        message: format!("unterminated {quote}-quoted literal"),
                        position: start,
                    });
                }
            }
        }
    }

    fn parse_reference(&mut self) -> Result<CanvasNode, ParseError> {
        self.advance(); // '@'
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '/' | '.'))
        {
            self.advance();
        }
        if self.pos == start {
            return Err(ParseError {
                message: "expected a path after '@'".to_string(),
                position: start,
            });
        }
        let path: String = self.input[start..self.pos].iter().collect();
        Ok(CanvasNode::reference(RefPath::new(path)))
    }

    /// `op(arg, ...)`: builds the node with open parameter slots, then places
    /// each argument through `replace` so the overload set narrows. `_` skips
    /// a slot and leaves the default placeholder standing.
    fn parse_call(&mut self, op: &str, signatures: SignatureSet) -> Result<CanvasNode, CanvasError> {
        let arity = signatures.arity();
        let mut node = CanvasNode::function(op, signatures);
        self.expect_char('(')?;

        let mut pos = 0;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            if pos > 0 {
                self.expect_char(',')?;
                self.skip_whitespace();
            }
            if pos >= arity {
                return Err(ParseError {
                    message: format!("'{op}' takes at most {arity} arguments"),
                    position: self.pos,
                }
                .into());
            }
            if self.peek_word() == "_" {
                self.advance();
            } else {
                let arg = self.parse_expr()?;
                node = node.replace(&format!("p{pos}"), arg)?;
            }
            pos += 1;
        }
        Ok(node)
    }

    /// `seq(...)`, `spawn(...)`, `all(...)`: arguments fill the open slot one
    /// after another, so the first fixes the declared type.
    fn parse_structural(&mut self, mut node: CanvasNode) -> Result<CanvasNode, CanvasError> {
        self.expect_char('(')?;
        let mut first = true;
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                return Ok(node);
            }
            if !first {
                self.expect_char(',')?;
            }
            first = false;
            let arg = self.parse_expr()?;
            let open = format!("i{}", node.child_count() - 1);
            node = node.replace(&open, arg)?;
        }
    }

    fn parse_expr(&mut self) -> Result<CanvasNode, CanvasError> {
        self.skip_whitespace();

        match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => {
                return Ok(CanvasNode::value(self.parse_number()?));
            }
            Some('$') => {
                self.advance();
                let amount = numeric_value(&self.parse_number()?);
                return Ok(CanvasNode::value(Literal::Money(amount)));
            }
            Some('#') => {
                self.advance();
                let amount = numeric_value(&self.parse_number()?);
                return Ok(CanvasNode::value(Literal::Quantity(amount)));
            }
            Some('"') => {
                let text = self.parse_quoted('"')?;
                return Ok(CanvasNode::value(Literal::Text(text)));
            }
            Some('\'') => {
                let symbol = self.parse_quoted('\'')?;
                return Ok(CanvasNode::value(Literal::Ticker(symbol)));
            }
            Some('@') => return Ok(self.parse_reference()?),
            _ => {}
        }

        let start = self.pos;
        let word = self.consume_word();
        match word.as_str() {
            "true" => return Ok(CanvasNode::value(Literal::Boolean(true))),
            "false" => return Ok(CanvasNode::value(Literal::Boolean(false))),
            "seq" => return self.parse_structural(CanvasNode::sequence()),
            "spawn" => return self.parse_structural(CanvasNode::spawn()),
            "all" => return self.parse_structural(CanvasNode::aggregate()),
            "" => {
                return Err(ParseError {
                    message: format!(
                        "expected an expression, found {}",
                        self.peek()
                            .map_or("end of input".to_string(), |ch| format!("'{ch}'"))
                    ),
                    position: start,
                }
                .into());
            }
            _ => {}
        }

        match builtin(&word) {
            Some(signatures) => self.parse_call(&word, signatures),
            None => Err(ParseError {
                message: format!("unknown operation '{word}'"),
                position: start,
            }
            .into()),
        }
    }

    fn parse(&mut self) -> Result<CanvasNode, CanvasError> {
        let node = self.parse_expr()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: "unexpected trailing input".to_string(),
                position: self.pos,
            }
            .into());
        }
        Ok(node)
    }
}

fn numeric_value(literal: &Literal) -> f64 {
    match literal {
        Literal::Integer(v) => *v as f64,
        Literal::Decimal(v) | Literal::Quantity(v) | Literal::Money(v) | Literal::Price(v) => *v,
        _ => 0.0,
    }
}

/// Parse one expression into a canvas tree.
pub fn parse(input: &str) -> Result<CanvasNode, CanvasError> {
    Parser::new(input).parse()
}
