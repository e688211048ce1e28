//! CLI integration tests for restruct.
//!
//! These tests execute the compiled binary and verify:
//! - Stdin/stdout handling
//! - Exit codes
//! - Configuration discovery and command-line overrides

mod common;
mod parse;
