//! Command line interface
//!
//! The binary in `src/cli/main.rs` parses arguments with clap and delegates
//! to the handlers in [`commands`].

pub mod commands;
pub mod error;
