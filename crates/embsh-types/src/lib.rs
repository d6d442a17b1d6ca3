//! Foundation types for embsh.
//!
//! Shared by every embsh crate: the error type and the TOML-backed
//! configuration for the shell and its telnet frontend.

pub mod config;
pub mod error;
