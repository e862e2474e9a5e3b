//! Common utilities and types shared across SealPipe crates.
//!
//! This module provides the error taxonomy and the secret-holding wrapper
//! used by both the crypto core and the command-line tool.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::SensitiveBytes;
