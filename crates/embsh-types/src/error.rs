//! Error types for embsh.

use std::io;

/// Errors produced by the embedded shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("command error: {0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    /// An operation the embedded context refuses to perform.
    #[error("{0} is unsupported in this context")]
    Unsupported(&'static str),

    #[error("stream closed")]
    StreamClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
