//! Local terminal frontend.
//!
//! Three tasks run side by side: a reader feeding the session input, an
//! output copier draining the session output to the terminal, and the
//! session itself. None of them cancels the others. When the terminal hits
//! end of input the reader finishes, the session sees end of stream and
//! returns, and the copier drains what is left and stops.
//!
//! On an interactive terminal the reader switches it to raw mode and pushes
//! keystrokes through a [`Bridge`], the same editor the telnet frontend
//! uses. Piped input is read a line at a time by [`LocalLineReader`].

#[cfg(unix)]
use std::io::IsTerminal;
use std::io::{self, BufRead, Read};
use std::sync::Arc;

use embsh_types::config::ShellSettings;
use embsh_types::error::{Result, ShellError};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::bridge::Bridge;
use crate::completion::{History, WordCompleter};
use crate::line_editor::LineEditor;
use crate::output::{LineEnding, OutputAdapter};
use crate::registry::CommandRegistry;
use crate::scheduler::{EditorExecutor, SchedulerFacade};
use crate::shell::Shell;
use crate::stream::{self, StreamReader, StreamWriter};

/// Bytes copied to the terminal per output unit.
const OUTPUT_UNIT: usize = 4096;

/// Bytes taken from a raw terminal per read.
const KEY_CHUNK: usize = 64;

type Source = Box<dyn BufRead + Send>;

/// Where session input comes from.
enum Input {
    /// Cooked input, one line per read.
    Lines(Source),
    /// Raw keystrokes.
    Keys(Box<dyn Read + Send>),
}

/// Blocking-style line reader with history and word completion.
///
/// Each read runs on the host's blocking pool through the executor, so the
/// runtime keeps serving other tasks while the terminal waits for Enter.
/// `!!` and `!n` recall earlier lines. A line ending in TAB has its last
/// word completed: a unique match is submitted, otherwise the candidates
/// are shown and nothing is submitted.
pub struct LocalLineReader<E> {
    executor: E,
    /// Moved into the blocking job for the duration of each read.
    source: Option<Source>,
    history: History,
    completer: WordCompleter,
    notices: Option<(StreamWriter, String)>,
}

impl<E> LocalLineReader<E>
where
    E: EditorExecutor,
{
    pub fn new(executor: E, source: Source) -> Self {
        Self {
            executor,
            source: Some(source),
            history: History::new(),
            completer: WordCompleter::default(),
            notices: None,
        }
    }

    pub fn with_completer(mut self, completer: WordCompleter) -> Self {
        self.completer = completer;
        self
    }

    /// Write completion candidates and recall errors to `out`, followed by
    /// `prompt` so the user knows input is still expected.
    pub fn with_notices(mut self, out: StreamWriter, prompt: impl Into<String>) -> Self {
        self.notices = Some((out, prompt.into()));
        self
    }

    /// Next line for the shell, without terminator. `None` at end of input.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            let Some(raw) = self.read_raw().await? else {
                return Ok(None);
            };
            if let Some(line) = self.prepare(&raw)? {
                return Ok(Some(line));
            }
        }
    }

    async fn read_raw(&mut self) -> Result<Option<String>> {
        let mut source = self.source.take().ok_or(ShellError::StreamClosed)?;
        let job = self.executor.run_in_executor(move || {
            let mut line = String::new();
            let read = source.read_line(&mut line);
            (source, read.map(|n| (n, line)))
        });
        let (source, read) = job.await.map_err(io::Error::other)?;
        self.source = Some(source);
        match read? {
            (0, _) => Ok(None),
            (_, line) => Ok(Some(line)),
        }
    }

    /// Apply completion and history recall. `None` means nothing to submit.
    fn prepare(&mut self, raw: &str) -> Result<Option<String>> {
        let mut line = raw.trim_end_matches(['\n', '\r']).to_string();

        if line.ends_with('\t') {
            line.truncate(line.trim_end_matches('\t').len());
            let start = line.rfind(' ').map_or(0, |pos| pos + 1);
            let word = &line[start..];
            let candidates = self.completer.complete(word);
            match candidates.as_slice() {
                [only] => {
                    let only = only.to_string();
                    line.replace_range(start.., &only);
                },
                [] => {
                    let msg = format!("no completion for {word:?}\n");
                    self.notice(&msg)?;
                    return Ok(None);
                },
                many => {
                    let msg = format!("{}\n", many.join("  "));
                    self.notice(&msg)?;
                    return Ok(None);
                },
            }
        }

        let line = match self.history.expand(&line) {
            Ok(line) => line,
            Err(e) => {
                self.notice(&format!("{e}\n"))?;
                return Ok(None);
            },
        };
        self.history.push(&line);
        Ok(Some(line))
    }

    fn notice(&self, msg: &str) -> Result<()> {
        match &self.notices {
            Some((out, prompt)) => {
                out.feed(msg.to_string())?;
                out.feed(prompt.clone())
            },
            None => {
                log::info!("{}", msg.trim_end());
                Ok(())
            },
        }
    }
}

/// Reader task: terminal lines into the session input.
async fn feed_stdin<E: EditorExecutor>(
    mut reader: LocalLineReader<E>,
    input: StreamWriter,
) -> Result<()> {
    while let Some(line) = reader.read_line().await? {
        input.feed(format!("{line}\n"))?;
    }
    log::debug!("terminal input closed");
    Ok(())
}

/// Reader task for a raw terminal: keystrokes through the line-editing bridge.
async fn feed_keystrokes<E: EditorExecutor>(
    executor: E,
    mut source: Box<dyn Read + Send>,
    mut bridge: Bridge,
) -> Result<()> {
    while !bridge.is_closed() {
        let job = executor.run_in_executor(move || {
            let mut buf = [0u8; KEY_CHUNK];
            let read = source.read(&mut buf).map(|n| buf[..n].to_vec());
            (source, read)
        });
        let (returned, read) = job.await.map_err(io::Error::other)?;
        source = returned;
        let keys = read?;
        if keys.is_empty() {
            break;
        }
        bridge.on_bytes_received(&keys)?;
    }
    log::debug!("terminal input closed");
    Ok(())
}

/// Output task: session output units to the terminal.
async fn copy_output<W>(mut output: StreamReader, mut sink: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(unit) = output.read(OUTPUT_UNIT).await {
        sink.write_all(&unit).await?;
        sink.flush().await?;
    }
    Ok(())
}

/// Run a shell session on the local terminal until stdin is exhausted.
///
/// An interactive terminal is put in raw mode for the duration and gets
/// arrow-key history and in-place TAB completion.
pub async fn run_stdin_shell(registry: Arc<CommandRegistry>, settings: &ShellSettings) -> Result<()> {
    #[cfg(unix)]
    if io::stdin().is_terminal() {
        let _raw = crate::tty::RawModeGuard::enable()?;
        let keys = Input::Keys(Box::new(io::stdin()));
        return run_local_shell(registry, settings, keys, tokio::io::stdout()).await;
    }
    let lines = Input::Lines(Box::new(io::BufReader::new(io::stdin())));
    run_local_shell(registry, settings, lines, tokio::io::stdout()).await
}

/// Wire reader, session, and output copier over `input` and `sink`.
async fn run_local_shell<W>(
    registry: Arc<CommandRegistry>,
    settings: &ShellSettings,
    input: Input,
    sink: W,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let facade = SchedulerFacade::current()?;
    let (input_tx, input_rx) = stream::channel();
    let (output_tx, output_rx) = stream::channel();
    let completer = WordCompleter::from_registry(&registry);

    let reader_task = match input {
        Input::Lines(source) => {
            let reader = LocalLineReader::new(facade, source)
                .with_completer(completer)
                .with_notices(output_tx.clone(), settings.prompt.clone());
            tokio::spawn(feed_stdin(reader, input_tx))
        },
        Input::Keys(source) => {
            let editor = LineEditor::new("").with_completer(completer);
            let echo = OutputAdapter::new(output_tx.clone(), LineEnding::Lf);
            let bridge = Bridge::new(editor, input_tx, echo);
            tokio::spawn(feed_keystrokes(facade, source, bridge))
        },
    };
    let shell = Shell::attach(
        registry,
        input_rx,
        OutputAdapter::new(output_tx, LineEnding::Lf),
        settings.prompt.clone(),
        settings.welcome.clone(),
    );

    let writer_task = tokio::spawn(copy_output(output_rx, sink));
    let shell_task = tokio::spawn(shell.run());
    let (shell_res, writer_res, reader_res) = tokio::join!(shell_task, writer_task, reader_task);

    let mut first_err = None;
    for (name, res) in [("shell", shell_res), ("output", writer_res), ("reader", reader_res)] {
        let res = res
            .map_err(|e| ShellError::Io(io::Error::other(e)))
            .and_then(|r| r);
        if let Err(e) = res {
            log::warn!("{name} task failed: {e}");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}
