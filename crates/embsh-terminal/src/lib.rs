//! Shell engine for embsh.
//!
//! A session reads one line at a time from its input stream, resolves the
//! first word against an immutable [`CommandRegistry`], and writes the
//! handler's text back to its output. Bridges turn raw transports into that
//! line stream: [`Bridge`] for byte-at-a-time telnet input driven through a
//! [`LineEditor`], and [`run_stdin_shell`] for the local terminal.

mod bridge;
mod completion;
mod line_editor;
mod output;
mod registry;
mod scheduler;
mod shell;
mod stdin;
#[cfg(unix)]
mod tty;
pub mod stream;

/// Byte-stream to line-stream adapter for raw transports.
pub use bridge::Bridge;
/// In-memory command history and word completion.
pub use completion::{History, WordCompleter};
/// Embedded line editor state machine.
pub use line_editor::{EditResult, LineEditor};
/// Newline rewriting for transports that need CR+LF.
pub use output::{LineEnding, OutputAdapter};
/// Command trait and the registry it is dispatched from.
pub use registry::{Command, CommandRegistry};
/// Restricted view of the host runtime for embedded editors.
pub use scheduler::{EditorExecutor, SchedulerFacade};
/// One attached shell session.
pub use shell::Shell;
/// Local terminal frontend.
pub use stdin::{LocalLineReader, run_stdin_shell};
