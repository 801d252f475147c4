//! Core domain types and logic (TRD Section 2).

pub mod types;
pub mod value;
pub mod node;
pub mod signature;
pub mod reference;
pub mod structural;
pub mod reader;
pub mod visitor;
pub mod audit;
pub mod expr_parser;
pub mod strategy;
pub mod config_validation;
pub mod error;
