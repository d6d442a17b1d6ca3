//! Shell and telnet frontend configuration.
//!
//! Loaded from a TOML file with optional `[shell]` and `[telnet]` tables.
//! Every key has a default, so an empty file is a valid configuration.

use serde::Deserialize;

use crate::error::{Result, ShellError};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub shell: ShellSettings,
    #[serde(default)]
    pub telnet: TelnetSettings,
}

/// Per-session shell text.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellSettings {
    /// Text written before every command read.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Written once when a session starts.
    #[serde(default)]
    pub welcome: Option<String>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            welcome: None,
        }
    }
}

/// Telnet listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TelnetSettings {
    /// Address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum simultaneous sessions.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for TelnetSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_prompt() -> String {
    "> ".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4444
}

fn default_max_connections() -> usize {
    16
}

/// Parse a configuration file.
pub fn parse_config(toml_str: &str) -> Result<ShellConfig> {
    let config: ShellConfig =
        toml::from_str(toml_str).map_err(|e| ShellError::Config(format!("embsh.toml: {e}")))?;
    log::debug!(
        "config: prompt {:?}, telnet {}:{}",
        config.shell.prompt,
        config.telnet.bind,
        config.telnet.port
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_empty() {
        let config = parse_config("").unwrap();
        assert_eq!(config.shell.prompt, "> ");
        assert!(config.shell.welcome.is_none());
        assert_eq!(config.telnet.bind, "127.0.0.1");
        assert_eq!(config.telnet.port, 4444);
        assert_eq!(config.telnet.max_connections, 16);
    }

    #[test]
    fn test_parse_config_shell_table() {
        let toml = r#"
[shell]
prompt = "switch> "
welcome = "Ethernet switch console\n"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.shell.prompt, "switch> ");
        assert_eq!(
            config.shell.welcome.as_deref(),
            Some("Ethernet switch console\n")
        );
        assert_eq!(config.telnet.port, 4444);
    }

    #[test]
    fn test_parse_config_telnet_partial() {
        let toml = r#"
[telnet]
port = 5000
max_connections = 2
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.telnet.port, 5000);
        assert_eq!(config.telnet.max_connections, 2);
        assert_eq!(config.telnet.bind, "127.0.0.1");
        assert_eq!(config.shell.prompt, "> ");
    }

    #[test]
    fn test_parse_config_invalid() {
        let err = parse_config("[telnet]\nport = \"not a number\"").unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
        assert!(format!("{err}").contains("embsh.toml"));
    }

    #[test]
    fn test_settings_default_matches_empty_file() {
        let from_file = parse_config("").unwrap();
        let default = ShellConfig::default();
        assert_eq!(from_file.shell.prompt, default.shell.prompt);
        assert_eq!(from_file.telnet.port, default.telnet.port);
    }
}
