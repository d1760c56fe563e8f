//! Command line client for SP108E-class LED controllers.
//!
//! The binary is a thin wrapper around [`run::run`]; the pieces are exposed
//! so integration tests can drive them against a local fake controller.

pub mod cli;
pub mod config;
pub mod run;
pub mod tcp;

pub use cli::{Cli, Commands};
pub use config::{ClientConfig, ConfigError};
pub use tcp::TcpTransport;
