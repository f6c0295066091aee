//! Shared utilities for the federated-server election workspace.

pub mod logging;

pub use logging::{init_logging, init_test_logging, LogFormat, LoggingError};
