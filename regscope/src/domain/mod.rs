//! Domain model for regscope
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - Structured error handling

pub mod errors;
pub mod types;

pub use types::{Pid, Tid, Timestamp};

pub use errors::{ConfigError, DecodeError, DumpError, MapsError};
