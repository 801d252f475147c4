//! Strategy composition (TRD Section 12).
//!
//! A strategy bundles the canvases a trading session runs: a Boolean entry
//! condition, a Boolean exit condition and an optional risk overlay. The
//! trees come out of the expression parser already narrowed; loading only
//! checks the condition types and audits each tree once.

use crate::domain::audit::audit;
use crate::domain::error::{CanvasError, TypeMismatch};
use crate::domain::expr_parser;
use crate::domain::node::CanvasNode;
use crate::domain::types::{CanvasType, NativeType};
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone)]
pub struct Strategy {
    pub name: String,
    pub description: String,
    pub entry: CanvasNode,
    pub exit: CanvasNode,
    pub risk: Option<CanvasNode>,
}

impl Strategy {
    /// Load a strategy from its `[strategy]` config section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Strategy, CanvasError> {
        let name = require(config, "name")?;
        let description = config
            .get_string("strategy", "description")
            .unwrap_or_default();

        let entry = condition(config, "entry")?;
        let exit = condition(config, "exit")?;
        let risk = match config.get_string("strategy", "risk") {
            Some(expr) if !expr.trim().is_empty() => {
                let tree = expr_parser::parse(&expr)?;
                audit(&tree)?;
                Some(tree)
            }
            _ => None,
        };

        Ok(Strategy {
            name,
            description,
            entry,
            exit,
            risk,
        })
    }
}

fn require(config: &dyn ConfigPort, key: &str) -> Result<String, CanvasError> {
    match config.get_string("strategy", key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(CanvasError::ConfigMissing {
            section: "strategy".to_string(),
            key: key.to_string(),
        }),
    }
}

/// Parse one condition expression; it must resolve to Boolean.
fn condition(config: &dyn ConfigPort, key: &str) -> Result<CanvasNode, CanvasError> {
    let expr = require(config, key)?;
    let tree = expr_parser::parse(&expr)?;
    let boolean = CanvasType::native(NativeType::Boolean);
    if !tree.ty().fits(&boolean) {
        return Err(TypeMismatch::new(tree.ty(), &boolean).into());
    }
    audit(&tree)?;
    Ok(tree)
}
