//! embsh demo: a tiny command shell over telnet or the local terminal.

mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use embsh_net::listener::TelnetListener;
use embsh_terminal::run_stdin_shell;
use embsh_types::config::{ShellConfig, parse_config};

/// Embeddable command shell demo.
#[derive(Parser, Debug)]
#[command(name = "embsh", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run on this terminal instead of serving telnet
    #[arg(long)]
    stdin: bool,

    /// Telnet port (overrides the configuration file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let registry = Arc::new(demo::demo_registry());

    if cli.stdin {
        log::info!("Starting embsh on the local terminal");
        run_stdin_shell(registry, &config.shell).await?;
        log::info!("embsh shut down cleanly");
    } else {
        let listener = TelnetListener::bind(&config, registry)
            .await
            .with_context(|| format!("binding {}:{}", config.telnet.bind, config.telnet.port))?;
        listener.run().await?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ShellConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            parse_config(&text)?
        },
        None => ShellConfig::default(),
    };
    if let Some(port) = cli.port {
        config.telnet.port = port;
    }
    Ok(config)
}
