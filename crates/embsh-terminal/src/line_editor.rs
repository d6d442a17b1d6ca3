//! Line editor - readline-like editing over a raw byte stream.
//!
//! The editor is a pure state machine: bytes go in through [`LineEditor::feed`]
//! and the terminal output they cause accumulates in an internal render
//! buffer that the owner drains with [`LineEditor::take_render`]. Nothing here
//! reads or writes a transport.
//!
//! Keys:
//! - Enter (CR or LF; CR LF and CR NUL count once): submit line
//! - Ctrl+C: abandon line
//! - Ctrl+D: end of input (on empty line)
//! - Ctrl+A / Home, Ctrl+E / End: move to start / end
//! - Ctrl+K: delete from cursor to end
//! - Ctrl+U: clear entire line
//! - Ctrl+W: delete word backwards
//! - Backspace, Delete, Left/Right arrows
//! - Up/Down arrows: history
//! - Tab: complete the word before the cursor

use crate::completion::{History, WordCompleter};

/// Maximum bytes in a single input line.
const MAX_LINE_LEN: usize = 1024;

const BELL: &[u8] = b"\x07";

/// Outcome of an editing round, held until the owner resets the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditResult {
    /// A complete line was submitted.
    Line(String),
    /// The line was abandoned with Ctrl+C.
    Interrupt,
    /// End of input was requested with Ctrl+D.
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParseState {
    Ground,
    /// Saw ESC.
    Escape,
    /// Inside `ESC [`, collecting parameter bytes.
    Csi(Vec<u8>),
    /// Saw `ESC O`.
    Ss3,
}

/// Editable single-line buffer with cursor, history and completion.
pub struct LineEditor {
    prompt: String,
    buffer: String,
    /// Byte offset into `buffer` (ASCII only, so also the char offset).
    cursor: usize,
    result: Option<EditResult>,
    state: ParseState,
    /// Swallow an LF or NUL that follows a CR.
    after_cr: bool,
    render: Vec<u8>,
    history: History,
    /// History index being shown and the draft it replaced.
    browsing: Option<(usize, String)>,
    completer: Option<WordCompleter>,
}

impl LineEditor {
    /// Create an editor that redraws `prompt` at the start of each line.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            buffer: String::new(),
            cursor: 0,
            result: None,
            state: ParseState::Ground,
            after_cr: false,
            render: Vec::new(),
            history: History::new(),
            browsing: None,
            completer: None,
        }
    }

    /// Enable Tab completion.
    pub fn with_completer(mut self, completer: WordCompleter) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Whether a result is waiting to be collected.
    pub fn is_returning(&self) -> bool {
        self.result.is_some()
    }

    pub fn return_value(&self) -> Option<&EditResult> {
        self.result.as_ref()
    }

    /// Drain pending terminal output.
    pub fn take_render(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.render)
    }

    /// Forget the stored result and any half-parsed escape sequence.
    pub fn reset(&mut self) {
        self.result = None;
        self.state = ParseState::Ground;
        self.browsing = None;
    }

    /// Empty the edit buffer without rendering.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Return the terminal cursor to column 0 so the next redraw is absolute.
    pub fn request_absolute_cursor_position(&mut self) {
        self.render.push(b'\r');
    }

    /// Draw prompt and buffer, leaving the terminal cursor at the edit cursor.
    pub fn redraw(&mut self) {
        self.render.extend_from_slice(self.prompt.as_bytes());
        self.render.extend_from_slice(self.buffer.as_bytes());
        self.render.extend_from_slice(b"\x1b[K");
        self.move_left(self.buffer.len() - self.cursor);
    }

    /// Feed one input byte.
    pub fn feed(&mut self, byte: u8) {
        if std::mem::take(&mut self.after_cr) && (byte == b'\n' || byte == 0) {
            return;
        }
        match std::mem::replace(&mut self.state, ParseState::Ground) {
            ParseState::Ground => self.feed_ground(byte),
            ParseState::Escape => match byte {
                b'[' => self.state = ParseState::Csi(Vec::new()),
                b'O' => self.state = ParseState::Ss3,
                _ => {},
            },
            ParseState::Csi(mut params) => match byte {
                0x30..=0x3F => {
                    params.push(byte);
                    self.state = ParseState::Csi(params);
                },
                // Intermediate bytes: keep collecting.
                0x20..=0x2F => self.state = ParseState::Csi(params),
                _ => self.csi(&params, byte),
            },
            ParseState::Ss3 => self.csi(&[], byte),
        }
    }

    fn feed_ground(&mut self, byte: u8) {
        match byte {
            b'\r' => {
                self.after_cr = true;
                self.submit();
            },
            b'\n' => self.submit(),
            0x03 => {
                self.render.extend_from_slice(b"^C\n");
                self.result = Some(EditResult::Interrupt);
            },
            0x04 => {
                if self.buffer.is_empty() {
                    self.result = Some(EditResult::Eof);
                }
            },
            0x01 => self.home(),
            0x05 => self.end(),
            0x0B => {
                if self.cursor < self.buffer.len() {
                    self.buffer.truncate(self.cursor);
                    self.render.extend_from_slice(b"\x1b[K");
                }
            },
            0x15 => {
                if !self.buffer.is_empty() {
                    self.move_left(self.cursor);
                    self.render.extend_from_slice(b"\x1b[K");
                    self.clear_buffer();
                }
            },
            0x17 => self.delete_word(),
            0x7F | 0x08 => self.backspace(),
            b'\t' => self.complete(),
            0x1B => self.state = ParseState::Escape,
            0x20..=0x7E => self.insert(byte as char),
            _ => {},
        }
    }

    fn csi(&mut self, params: &[u8], fin: u8) {
        match (params, fin) {
            (_, b'A') => self.history_prev(),
            (_, b'B') => self.history_next(),
            (_, b'C') => {
                if self.cursor < self.buffer.len() {
                    self.render.extend_from_slice(b"\x1b[C");
                    self.cursor += 1;
                }
            },
            (_, b'D') => {
                if self.cursor > 0 {
                    self.render.extend_from_slice(b"\x1b[D");
                    self.cursor -= 1;
                }
            },
            (_, b'H') | (b"1" | b"7", b'~') => self.home(),
            (_, b'F') | (b"4" | b"8", b'~') => self.end(),
            (b"3", b'~') => self.delete(),
            // Cursor position reports and anything else are ignored.
            _ => {},
        }
    }

    fn submit(&mut self) {
        self.render.push(b'\n');
        self.history.push(&self.buffer);
        self.result = Some(EditResult::Line(self.buffer.clone()));
    }

    fn insert(&mut self, c: char) {
        if self.buffer.len() >= MAX_LINE_LEN {
            self.render.extend_from_slice(BELL);
            return;
        }
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
        if self.cursor < self.buffer.len() {
            let tail = self.buffer[self.cursor - 1..].to_string();
            self.render.extend_from_slice(tail.as_bytes());
            self.move_left(self.buffer.len() - self.cursor);
        } else {
            self.render.push(c as u8);
        }
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        self.render.push(0x08);
        self.redraw_tail();
    }

    fn delete(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
            self.redraw_tail();
        }
    }

    fn delete_word(&mut self) {
        let original = self.cursor;
        let bytes = self.buffer.as_bytes();
        let mut start = original;
        while start > 0 && bytes[start - 1] == b' ' {
            start -= 1;
        }
        while start > 0 && bytes[start - 1] != b' ' {
            start -= 1;
        }
        if start == original {
            return;
        }
        self.buffer.drain(start..original);
        self.move_left(original - start);
        self.cursor = start;
        let tail = self.buffer[start..].to_string();
        self.render.extend_from_slice(tail.as_bytes());
        self.render.extend_from_slice(b"\x1b[K");
        self.move_left(tail.len());
    }

    fn home(&mut self) {
        self.move_left(self.cursor);
        self.cursor = 0;
    }

    fn end(&mut self) {
        let n = self.buffer.len() - self.cursor;
        if n > 0 {
            self.render.extend_from_slice(format!("\x1b[{n}C").as_bytes());
        }
        self.cursor = self.buffer.len();
    }

    fn history_prev(&mut self) {
        let index = match self.browsing.as_ref().map(|(shown, _)| *shown) {
            None if self.history.is_empty() => return,
            None => {
                self.browsing = Some((0, self.buffer.clone()));
                self.history.len() - 1
            },
            Some(0) => return,
            Some(shown) => shown - 1,
        };
        if let Some((shown, _)) = &mut self.browsing {
            *shown = index;
        }
        let entry = self.history.get(index).unwrap_or_default().to_string();
        self.replace_buffer(entry);
    }

    fn history_next(&mut self) {
        let Some((index, draft)) = self.browsing.take() else {
            return;
        };
        if index + 1 < self.history.len() {
            self.browsing = Some((index + 1, draft));
            let entry = self.history.get(index + 1).unwrap_or_default().to_string();
            self.replace_buffer(entry);
        } else {
            self.replace_buffer(draft);
        }
    }

    fn complete(&mut self) {
        let Some(completer) = &self.completer else {
            return;
        };
        let start = self.buffer[..self.cursor]
            .rfind(' ')
            .map_or(0, |pos| pos + 1);
        let word = &self.buffer[start..self.cursor];
        let unique = completer.complete(word).len() == 1;
        let Some(mut extended) = completer.extend(word) else {
            self.render.extend_from_slice(BELL);
            return;
        };
        if unique {
            extended.push(' ');
        } else if extended.len() == word.len() {
            self.render.extend_from_slice(BELL);
            return;
        }
        let mut line = String::with_capacity(self.buffer.len() + extended.len());
        line.push_str(&self.buffer[..start]);
        line.push_str(&extended);
        let new_cursor = line.len();
        line.push_str(&self.buffer[self.cursor..]);
        if line.len() > MAX_LINE_LEN {
            self.render.extend_from_slice(BELL);
            return;
        }
        self.replace_buffer(line);
        self.move_left(self.buffer.len() - new_cursor);
        self.cursor = new_cursor;
    }

    /// Swap the whole buffer, leaving the cursor at its end.
    fn replace_buffer(&mut self, line: String) {
        self.move_left(self.cursor);
        self.render.extend_from_slice(line.as_bytes());
        self.render.extend_from_slice(b"\x1b[K");
        self.cursor = line.len();
        self.buffer = line;
    }

    /// Rewrite from the cursor to the end after a deletion at the cursor.
    fn redraw_tail(&mut self) {
        let tail = self.buffer[self.cursor..].to_string();
        self.render.extend_from_slice(tail.as_bytes());
        self.render.extend_from_slice(b" \x1b[K");
        self.move_left(tail.len() + 1);
    }

    fn move_left(&mut self, n: usize) {
        if n > 0 {
            self.render
                .extend_from_slice(format!("\x1b[{n}D").as_bytes());
        }
    }
}
