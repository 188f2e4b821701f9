//! Logging setup shared by binaries and demos embedding the session manager

mod logging;

pub use logging::{setup_logging, LogConfig};
