//! Raw mode for the controlling terminal.

use std::io;

use embsh_types::error::Result;
use nix::sys::termios::{self, OutputFlags, SetArg, Termios};

/// Puts stdin's terminal in raw mode; the saved settings come back on drop.
///
/// Output post-processing stays on (`\n` is still sent as `\r\n`), so
/// session output needs no rewriting.
pub struct RawModeGuard {
    saved: Termios,
}

impl RawModeGuard {
    pub fn enable() -> Result<Self> {
        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin).map_err(io::Error::from)?;
        let mut raw = saved.clone();
        termios::cfmakeraw(&mut raw);
        raw.output_flags |= OutputFlags::OPOST | OutputFlags::ONLCR;
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(io::Error::from)?;
        log::debug!("terminal switched to raw mode");
        Ok(Self { saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.saved) {
            log::warn!("failed to restore terminal settings: {e}");
        } else {
            log::debug!("terminal settings restored");
        }
    }
}
