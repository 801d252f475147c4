//! Port traits the domain is wired through (TRD Section 11).

pub mod config_port;
pub mod store_port;
