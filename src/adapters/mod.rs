//! Concrete adapter implementations for ports (TRD Section 2.2).

pub mod file_config_adapter;
pub mod json_store;
