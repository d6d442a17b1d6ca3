//! Telnet shell listener.
//!
//! Accepts inbound TCP connections and runs one shell session per client.
//! The number of live sessions is capped; clients over the cap get a short
//! refusal and are disconnected.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use embsh_terminal::stream::{self, StreamReader};
use embsh_terminal::{
    Bridge, CommandRegistry, LineEditor, LineEnding, OutputAdapter, Shell, WordCompleter,
};
use embsh_types::config::{ShellConfig, ShellSettings};
use embsh_types::error::Result;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::telnet::{NEGOTIATION, TelnetFilter};

/// Bytes read from a client per call.
const READ_CHUNK: usize = 512;

/// Bytes written to a client per output unit.
const OUTPUT_UNIT: usize = 4096;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

const REFUSAL: &[u8] = b"Too many connections, try again later.\r\n";

/// Everything one telnet client needs, not yet running.
pub struct TelnetSession {
    /// Session to spawn; writes CR+LF output.
    pub shell: Shell<OutputAdapter>,
    /// Push raw client bytes here after telnet commands are removed.
    pub bridge: Bridge,
    /// Shell output and editor echo, ready for the socket.
    pub output: StreamReader,
}

/// Wire a shell session, its line-editing bridge, and the shared output.
///
/// The editor draws no prompt of its own; the session writes the prompt
/// before each read.
pub fn create_telnet_shell(registry: Arc<CommandRegistry>, settings: &ShellSettings) -> TelnetSession {
    let (input_tx, input_rx) = stream::channel();
    let (output_tx, output_rx) = stream::channel();
    let output = OutputAdapter::new(output_tx, LineEnding::CrLf);

    let editor = LineEditor::new("").with_completer(WordCompleter::from_registry(&registry));
    let bridge = Bridge::new(editor, input_tx, output.clone());
    let shell = Shell::attach(
        registry,
        input_rx,
        output,
        settings.prompt.clone(),
        settings.welcome.clone(),
    );
    TelnetSession {
        shell,
        bridge,
        output: output_rx,
    }
}

/// Run one telnet session over `stream` until either side is done.
///
/// A client hang-up cancels the session. A session that ends on its own
/// (Ctrl+D) has its remaining output flushed before the connection closes.
pub async fn serve_connection<S>(
    stream: S,
    registry: Arc<CommandRegistry>,
    settings: &ShellSettings,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite,
{
    let TelnetSession {
        shell,
        bridge,
        mut output,
    } = create_telnet_shell(registry, settings);
    let (mut reader, mut writer) = tokio::io::split(stream);
    writer.write_all(&NEGOTIATION).await?;
    writer.flush().await?;

    let mut bridge = Some(bridge);
    let mut filter = TelnetFilter::new();
    let mut shell_task = tokio::spawn(shell.run());
    let mut shell_done = false;
    let mut client_open = true;
    let mut buf = [0u8; READ_CHUNK];

    loop {
        tokio::select! {
            read = reader.read(&mut buf), if client_open => match read {
                Ok(0) => {
                    log::debug!("client hung up");
                    client_open = false;
                    shell_task.abort();
                },
                Ok(n) => {
                    let data = filter.filter(&buf[..n]);
                    if let Some(bridge) = bridge.as_mut()
                        && let Err(e) = bridge.on_bytes_received(&data)
                    {
                        log::debug!("dropping client input: {e}");
                    }
                },
                Err(e) => {
                    log::debug!("client read error: {e}");
                    client_open = false;
                    shell_task.abort();
                },
            },
            unit = output.read(OUTPUT_UNIT) => match unit {
                Some(unit) => {
                    let sent = async {
                        writer.write_all(&unit).await?;
                        writer.flush().await
                    };
                    if let Err(e) = sent.await {
                        shell_task.abort();
                        return Err(e.into());
                    }
                },
                // Both the session and the bridge are gone and everything
                // they wrote has been sent.
                None => break,
            },
            joined = &mut shell_task, if !shell_done => {
                shell_done = true;
                match joined {
                    Ok(Ok(())) => log::debug!("shell session finished"),
                    Ok(Err(e)) => log::warn!("shell session failed: {e}"),
                    Err(e) if e.is_cancelled() => log::debug!("shell session cancelled"),
                    Err(e) => log::warn!("shell session panicked: {e}"),
                }
                bridge = None;
            },
        }
    }

    if client_open {
        let _ = writer.shutdown().await;
    }
    Ok(())
}

/// Accepts telnet clients and runs a shell session for each.
pub struct TelnetListener {
    listener: TcpListener,
    registry: Arc<CommandRegistry>,
    settings: ShellSettings,
    slots: Arc<Semaphore>,
}

impl TelnetListener {
    /// Bind to the configured address.
    pub async fn bind(config: &ShellConfig, registry: Arc<CommandRegistry>) -> Result<Self> {
        let addr = format!("{}:{}", config.telnet.bind, config.telnet.port);
        let listener = TcpListener::bind(&addr).await?;
        log::info!(
            "telnet shell listening on {} (max {} sessions)",
            listener.local_addr()?,
            config.telnet.max_connections
        );
        Ok(Self {
            listener,
            registry,
            settings: config.shell.clone(),
            slots: Arc::new(Semaphore::new(config.telnet.max_connections)),
        })
    }

    /// Address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients forever.
    pub async fn run(self) -> Result<()> {
        loop {
            let (mut socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    log::warn!("accept error: {e}");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                },
            };

            let Ok(permit) = Arc::clone(&self.slots).try_acquire_owned() else {
                log::warn!("refusing {peer}: session limit reached");
                tokio::spawn(async move {
                    let _ = socket.write_all(REFUSAL).await;
                    let _ = socket.shutdown().await;
                });
                continue;
            };

            log::info!("telnet client connected: {peer}");
            let registry = Arc::clone(&self.registry);
            let settings = self.settings.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(socket, registry, &settings).await {
                    log::warn!("session with {peer} ended with error: {e}");
                }
                log::info!("telnet client disconnected: {peer}");
                drop(permit);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{DuplexStream, duplex};

    fn make_registry() -> Arc<CommandRegistry> {
        let mut reg = CommandRegistry::new();
        reg.register_fn("hello", "Hello world", |args: &[&str]| {
            if args.is_empty() {
                Ok("world\n".to_string())
            } else {
                Ok(format!("{}\n", args.join(" ")))
            }
        });
        Arc::new(reg)
    }

    /// Read from `client` until `needle` shows up in everything read so far.
    async fn read_until(client: &mut DuplexStream, seen: &mut Vec<u8>, needle: &[u8]) {
        let mut buf = [0u8; 256];
        while !seen.windows(needle.len()).any(|w| w == needle) {
            let n = client.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before {needle:?} arrived");
            seen.extend_from_slice(&buf[..n]);
        }
    }

    fn start(settings: ShellSettings) -> (DuplexStream, tokio::task::JoinHandle<Result<()>>) {
        let (client, server) = duplex(4096);
        let task = tokio::spawn(async move {
            serve_connection(server, make_registry(), &settings).await
        });
        (client, task)
    }

    #[tokio::test]
    async fn test_create_telnet_shell_wires_crlf() {
        let TelnetSession {
            shell,
            mut bridge,
            mut output,
        } = create_telnet_shell(make_registry(), &ShellSettings::default());
        let task = tokio::spawn(shell.run());
        assert_eq!(output.read(256).await.unwrap(), "> ");

        bridge.on_bytes_received(b"hello\r").unwrap();
        drop(bridge);
        let mut seen = Vec::new();
        while let Some(unit) = output.read(256).await {
            seen.extend_from_slice(&unit);
        }
        // Editor echo first, then the response and the next prompt.
        assert!(seen.starts_with(b"hello\r\n"));
        assert!(seen.ends_with(b"world\r\n> "));
        task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_echo_precedes_response_on_worker_pool() {
        for _ in 0..50 {
            let TelnetSession {
                shell,
                mut bridge,
                mut output,
            } = create_telnet_shell(make_registry(), &ShellSettings::default());
            let task = tokio::spawn(shell.run());
            assert_eq!(output.read(256).await.unwrap(), "> ");

            // Line plus typeahead in one chunk.
            bridge.on_bytes_received(b"hello\rx").unwrap();
            drop(bridge);
            let mut seen = Vec::new();
            while let Some(unit) = output.read(256).await {
                seen.extend_from_slice(&unit);
            }
            task.await.unwrap().unwrap();

            let text = String::from_utf8_lossy(&seen);
            assert!(text.starts_with("hello\r\n\r\x1b[K"), "echo overtaken: {text:?}");
            let response = text.find("world\r\n> ").unwrap();
            assert!(!text[response..].contains("\x1b[K"), "prompt erased: {text:?}");
        }
    }

    #[tokio::test]
    async fn test_negotiation_then_prompt() {
        let (mut client, _task) = start(ShellSettings::default());
        let mut seen = Vec::new();
        read_until(&mut client, &mut seen, b"> ").await;
        assert!(seen.starts_with(&NEGOTIATION));
    }

    #[tokio::test]
    async fn test_hello_world_over_telnet() {
        let (mut client, _task) = start(ShellSettings::default());
        let mut seen = Vec::new();
        read_until(&mut client, &mut seen, b"> ").await;

        client.write_all(b"hello\r\0").await.unwrap();
        read_until(&mut client, &mut seen, b"world\r\n> ").await;
    }

    #[tokio::test]
    async fn test_client_commands_are_filtered() {
        let (mut client, _task) = start(ShellSettings::default());
        let mut seen = Vec::new();
        read_until(&mut client, &mut seen, b"> ").await;

        // Client answers our negotiation in the middle of typing.
        client.write_all(b"hel").await.unwrap();
        client.write_all(&[255, 253, 1, 255, 251, 0]).await.unwrap();
        client.write_all(b"lo tutu\r\n").await.unwrap();
        read_until(&mut client, &mut seen, b"tutu\r\n> ").await;
    }

    #[tokio::test]
    async fn test_welcome_sent_once() {
        let settings = ShellSettings {
            prompt: "$ ".to_string(),
            welcome: Some("Welcome\n".to_string()),
        };
        let (mut client, _task) = start(settings);
        let mut seen = Vec::new();
        read_until(&mut client, &mut seen, b"Welcome\r\n$ ").await;
    }

    #[tokio::test]
    async fn test_ctrl_d_closes_connection() {
        let (mut client, task) = start(ShellSettings::default());
        let mut seen = Vec::new();
        read_until(&mut client, &mut seen, b"> ").await;

        client.write_all(b"\x04").await.unwrap();
        task.await.unwrap().unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
    }

    #[tokio::test]
    async fn test_client_hangup_ends_session() {
        let (client, task) = start(ShellSettings::default());
        drop(client);
        // Either the session notices the hang-up or writing to the closed
        // pipe fails; it must not keep running.
        let _ = task.await.unwrap();
    }
}
