//! Line-editing bridge between a raw byte transport and a shell session.
//!
//! Telnet clients in character mode send one keystroke at a time, in chunks
//! of any size. The bridge pushes each byte through its [`LineEditor`],
//! echoes the editor's rendering to the session output, and hands every
//! completed line to the session's input stream.

use embsh_types::error::Result;

use crate::line_editor::{EditResult, LineEditor};
use crate::output::OutputAdapter;
use crate::stream::StreamWriter;

/// Per-session adapter owning the editor state.
pub struct Bridge {
    editor: LineEditor,
    /// Session input; `None` once the client asked for end of input.
    input: Option<StreamWriter>,
    echo: OutputAdapter,
}

impl Bridge {
    pub fn new(editor: LineEditor, input: StreamWriter, echo: OutputAdapter) -> Self {
        Self {
            editor,
            input: Some(input),
            echo,
        }
    }

    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    /// Whether the session input has been closed by the client.
    pub fn is_closed(&self) -> bool {
        self.input.is_none()
    }

    /// Feed a chunk of raw bytes, in order.
    ///
    /// Never suspends. Fails only when the session has gone away. The echo of
    /// a completed line and the redraw after it are queued before the line
    /// reaches the session.
    pub fn on_bytes_received(&mut self, data: &[u8]) -> Result<()> {
        for &byte in data {
            if self.input.is_none() {
                break;
            }
            self.editor.feed(byte);
            if self.editor.is_returning() {
                self.finish_line()?;
            }
        }
        self.flush_echo()
    }

    fn flush_echo(&mut self) -> Result<()> {
        let render = self.editor.take_render();
        if !render.is_empty() {
            self.echo.feed(&render)?;
        }
        Ok(())
    }

    fn finish_line(&mut self) -> Result<()> {
        let delivered = match self.editor.return_value() {
            Some(EditResult::Line(text)) => Some(format!("{text}\n")),
            // An abandoned line still gets a fresh prompt.
            Some(EditResult::Interrupt) => Some("\n".to_string()),
            Some(EditResult::Eof) | None => None,
        };

        self.editor.reset();
        self.editor.clear_buffer();
        self.editor.request_absolute_cursor_position();
        self.editor.redraw();
        self.flush_echo()?;

        match delivered {
            Some(line) => {
                if let Some(input) = &self.input {
                    input.feed(line)?;
                }
            },
            None => {
                log::debug!("client closed session input");
                self.input = None;
            },
        }
        Ok(())
    }

    /// Backpressure hook for writers; lines are never held back.
    pub async fn drain(&self) {}
}
