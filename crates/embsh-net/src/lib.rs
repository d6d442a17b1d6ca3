//! Telnet frontend for embsh.
//!
//! Each accepted connection gets its own shell session. Raw client bytes are
//! stripped of telnet commands and pushed through a line-editing bridge;
//! session output is written back with CR+LF line endings.

pub mod listener;
pub mod telnet;
