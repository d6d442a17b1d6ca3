//! Shell session: the prompt -> read -> dispatch -> respond loop.

use std::sync::Arc;

use embsh_types::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::registry::CommandRegistry;
use crate::stream::StreamReader;

/// One attached shell instance bound to an input/output pair.
///
/// The session exclusively owns both endpoints. Dropping it (or cancelling
/// the task running [`Shell::run`]) releases them.
pub struct Shell<W> {
    registry: Arc<CommandRegistry>,
    input: StreamReader,
    output: W,
    prompt: String,
    welcome: Option<String>,
}

impl<W> Shell<W>
where
    W: AsyncWrite + Unpin,
{
    /// Bind a session to its endpoints.
    pub fn attach(
        registry: Arc<CommandRegistry>,
        input: StreamReader,
        output: W,
        prompt: impl Into<String>,
        welcome: Option<String>,
    ) -> Self {
        Self {
            registry,
            input,
            output,
            prompt: prompt.into(),
            welcome,
        }
    }

    /// Run until the input stream ends.
    ///
    /// End of stream is a normal exit. Blank lines re-prompt without a
    /// response. Only output failures are reported as errors.
    pub async fn run(mut self) -> Result<()> {
        log::debug!("shell session started");
        if let Some(welcome) = self.welcome.take() {
            self.output.write_all(welcome.as_bytes()).await?;
        }
        loop {
            self.output.write_all(self.prompt.as_bytes()).await?;
            self.output.flush().await?;

            let Some(raw) = self.input.read_line().await else {
                log::debug!("shell session input closed");
                return Ok(());
            };
            let text = String::from_utf8_lossy(&raw);
            let line = text.strip_suffix('\n').unwrap_or(&text);
            let line = line.strip_suffix('\r').unwrap_or(line);

            let response = self.registry.resolve(line);
            if !response.is_empty() {
                self.output.write_all(response.as_bytes()).await?;
            }
        }
    }
}
