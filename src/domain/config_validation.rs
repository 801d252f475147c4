//! Configuration validation (TRD Section 12.2).
//!
//! Validates a strategy config before any canvas is built, so the CLI can
//! report every class of problem with the right exit code.

use crate::domain::error::CanvasError;
use crate::domain::expr_parser;
use crate::ports::config_port::ConfigPort;

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CanvasError> {
    validate_name(config)?;
    validate_expression(config, "entry", true)?;
    validate_expression(config, "exit", true)?;
    validate_expression(config, "risk", false)?;
    Ok(())
}

fn validate_name(config: &dyn ConfigPort) -> Result<(), CanvasError> {
    match config.get_string("strategy", "name") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(CanvasError::ConfigMissing {
            section: "strategy".to_string(),
            key: "name".to_string(),
        }),
    }
}

fn validate_expression(
    config: &dyn ConfigPort,
    key: &str,
    required: bool,
) -> Result<(), CanvasError> {
    let expr = match config.get_string("strategy", key) {
        Some(s) if !s.trim().is_empty() => s,
        _ if required => {
            return Err(CanvasError::ConfigMissing {
                section: "strategy".to_string(),
                key: key.to_string(),
            });
        }
        _ => return Ok(()),
    };

    expr_parser::parse(&expr).map_err(|err| CanvasError::ConfigInvalid {
        section: "strategy".to_string(),
        key: key.to_string(),
        reason: err.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_strategy_config_passes() {
        let config = make_config(
            r#"
[strategy]
name = Breakout
entry = gt(@/feed/close, $42.00)
exit = lt(@/feed/close, $40.00)
"#,
        );
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn missing_name_fails() {
        let config =
            make_config("[strategy]\nentry = gt($2.0, $1.0)\nexit = lt($2.0, $1.0)\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, CanvasError::ConfigMissing { key, .. } if key == "name"));
    }

    #[test]
    fn missing_entry_fails() {
        let config = make_config("[strategy]\nname = X\nexit = lt($2.0, $1.0)\n");
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, CanvasError::ConfigMissing { key, .. } if key == "entry"));
    }

    #[test]
    fn unparseable_entry_fails_with_reason() {
        let config = make_config(
            "[strategy]\nname = X\nentry = gt($2.0\nexit = lt($2.0, $1.0)\n",
        );
        let err = validate_strategy_config(&config).unwrap_err();
        match err {
            CanvasError::ConfigInvalid { key, reason, .. } => {
                assert_eq!(key, "entry");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn ill_typed_entry_fails() {
        let config = make_config(
            "[strategy]\nname = X\nentry = mul('BHP', #3)\nexit = lt($2.0, $1.0)\n",
        );
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, CanvasError::ConfigInvalid { key, .. } if key == "entry"));
    }

    #[test]
    fn optional_risk_may_be_absent() {
        let config = make_config(
            "[strategy]\nname = X\nentry = gt($2.0, $1.0)\nexit = lt($2.0, $1.0)\n",
        );
        assert!(validate_strategy_config(&config).is_ok());
    }
}
