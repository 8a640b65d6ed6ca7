//! Logwatch CLI library.
//!
//! Exposes argument parsing, command handlers and output rendering so
//! integration tests can drive commands without spawning the binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;
