//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! The config file is looked up at `--config <path>`, then `./sshelf.toml`,
//! then `<config dir>/sshelf/config.toml`. A missing file means defaults.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 23234
//! host_key_dir = ".ssh"
//! shutdown_timeout_secs = 300
//!
//! [documents]
//! directory = "directory"
//! header_lines = 2
//!
//! [display]
//! accent = "#fcd34d"
//! markdown_theme = "dark"
//!
//! [banner]
//! image = "logo.jpeg"
//! qr_url = "https://example.com"
//!
//! [keys]
//! quit = ["q", "ctrl+c"]
//! ```

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tui::banner::BannerSettings;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SshelfConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub banner: BannerConfig,
    #[serde(default)]
    pub keys: KeysConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub host_key_dir: Option<PathBuf>,
    pub host_key_file: Option<String>,
    pub shutdown_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DocumentsConfig {
    pub directory: Option<PathBuf>,
    pub extension: Option<String>,
    pub header_lines: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DisplayConfig {
    pub title: Option<String>,
    pub intro: Option<String>,
    pub accent: Option<String>,
    pub markdown_theme: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BannerConfig {
    pub image: Option<PathBuf>,
    pub image_height: Option<u16>,
    pub qr_url: Option<String>,
    pub padding: Option<usize>,
    pub required: Option<bool>,
}

/// Chord lists per action, e.g. `down = ["down", "j"]`. Unset actions keep
/// their default chords.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeysConfig {
    pub up: Option<Vec<String>>,
    pub down: Option<Vec<String>>,
    pub enter: Option<Vec<String>>,
    pub back: Option<Vec<String>>,
    pub top: Option<Vec<String>>,
    pub bottom: Option<Vec<String>>,
    pub page_up: Option<Vec<String>>,
    pub page_down: Option<Vec<String>>,
    pub quit: Option<Vec<String>>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 23234;
pub const DEFAULT_HOST_KEY_DIR: &str = ".ssh";
pub const DEFAULT_HOST_KEY_FILE: &str = "term_info_ed25519";
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_DOCUMENTS_DIR: &str = "directory";
pub const DEFAULT_EXTENSION: &str = "md";
pub const DEFAULT_HEADER_LINES: usize = 2;
pub const DEFAULT_TITLE: &str = " DOCUMENTS ";
pub const DEFAULT_INTRO: &str =
    "Browse the documents below. Use the arrow keys to move and enter to open one.";
pub const DEFAULT_ACCENT: &str = "#fcd34d";
pub const DEFAULT_MARKDOWN_THEME: &str = "dark";

const CONFIG_FILE_NAME: &str = "sshelf.toml";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub host: String,
    pub port: u16,
    pub host_key_path: PathBuf,
    pub shutdown_timeout: Duration,
    pub documents_dir: PathBuf,
    pub extension: String,
    pub header_lines: usize,
    pub title: String,
    pub intro: String,
    pub accent: String,
    pub markdown_theme: String,
    pub banner: BannerSettings,
    pub keys: KeysConfig,
}

/// Values given on the command line. `None` means the flag was not passed.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub documents: Option<PathBuf>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "config I/O error ({}): {e}", path.display()),
            ConfigError::Parse(path, e) => {
                write!(f, "config parse error ({}): {e}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// First existing file among `./sshelf.toml` and `<config dir>/sshelf/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("sshelf").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load the config file.
///
/// An explicit path must exist. Without one, the default locations are
/// searched and a missing file yields `SshelfConfig::default()`.
pub fn load_config(explicit: Option<&Path>) -> Result<SshelfConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match config_path() {
            Some(path) => path,
            None => {
                info!("No config file found, using defaults");
                return Ok(SshelfConfig::default());
            }
        },
    };

    let config = load_from(&path)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn load_from(path: &Path) -> Result<SshelfConfig, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &SshelfConfig, cli: &CliOverrides) -> ResolvedConfig {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// `resolve` with an injectable environment lookup.
pub fn resolve_with_env(
    config: &SshelfConfig,
    cli: &CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    // Host: CLI → env → config → default
    let host = cli
        .host
        .clone()
        .or_else(|| env("SSHELF_HOST"))
        .or_else(|| config.server.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    // Port: CLI → env (ignored if unparseable) → config → default
    let port = cli
        .port
        .or_else(|| env("SSHELF_PORT").and_then(|p| p.parse().ok()))
        .or(config.server.port)
        .unwrap_or(DEFAULT_PORT);

    // Host key directory: env → config → default
    let host_key_dir = env("SSH_FOLDER_PATH")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| config.server.host_key_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOST_KEY_DIR));
    let host_key_file = config
        .server
        .host_key_file
        .as_deref()
        .unwrap_or(DEFAULT_HOST_KEY_FILE);

    // Documents: CLI → env → config → default
    let documents_dir = cli
        .documents
        .clone()
        .or_else(|| env("SSHELF_DOCUMENTS").map(PathBuf::from))
        .or_else(|| config.documents.directory.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENTS_DIR));

    // Markdown theme: env → config → default
    let markdown_theme = env("SSHELF_THEME")
        .or_else(|| config.display.markdown_theme.clone())
        .unwrap_or_else(|| DEFAULT_MARKDOWN_THEME.to_string());

    let defaults = BannerSettings::default();
    let banner = BannerSettings {
        image: config.banner.image.clone(),
        image_height: config.banner.image_height.unwrap_or(defaults.image_height),
        qr_url: config.banner.qr_url.clone(),
        padding: config.banner.padding.unwrap_or(defaults.padding),
        required: config.banner.required.unwrap_or(defaults.required),
    };

    ResolvedConfig {
        host,
        port,
        host_key_path: host_key_dir.join(host_key_file),
        shutdown_timeout: Duration::from_secs(
            config
                .server
                .shutdown_timeout_secs
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        ),
        documents_dir,
        extension: config
            .documents
            .extension
            .clone()
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
        header_lines: config.documents.header_lines.unwrap_or(DEFAULT_HEADER_LINES),
        title: config
            .display
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        intro: config
            .display
            .intro
            .clone()
            .unwrap_or_else(|| DEFAULT_INTRO.to_string()),
        accent: config
            .display
            .accent
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCENT.to_string()),
        markdown_theme,
        banner,
        keys: config.keys.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve_with_env(&SshelfConfig::default(), &CliOverrides::default(), no_env);
        assert_eq!(resolved.host, DEFAULT_HOST);
        assert_eq!(resolved.port, DEFAULT_PORT);
        assert_eq!(resolved.host_key_path, PathBuf::from(".ssh/term_info_ed25519"));
        assert_eq!(resolved.shutdown_timeout, Duration::from_secs(300));
        assert_eq!(resolved.documents_dir, PathBuf::from(DEFAULT_DOCUMENTS_DIR));
        assert_eq!(resolved.header_lines, 2);
        assert_eq!(resolved.markdown_theme, "dark");
        assert!(!resolved.banner.required);
        assert!(resolved.banner.image.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing, everything else stays default
        let toml_str = r#"
[server]
port = 2222
"#;
        let config: SshelfConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, Some(2222));
        assert!(config.server.host.is_none());
        assert!(config.documents.directory.is_none());
        assert!(config.keys.quit.is_none());
    }

    #[test]
    fn test_full_toml_parses() {
        let toml_str = r#"
[server]
host = "127.0.0.1"
port = 2200
host_key_dir = "/etc/sshelf"
host_key_file = "key"
shutdown_timeout_secs = 10

[documents]
directory = "docs"
extension = "markdown"
header_lines = 3

[display]
title = " HELLO "
accent = "red"
markdown_theme = "light"

[banner]
image = "logo.png"
image_height = 10
qr_url = "https://example.com"
padding = 4
required = true

[keys]
quit = ["x"]
down = ["down", "n"]
"#;
        let config: SshelfConfig = toml::from_str(toml_str).unwrap();
        let resolved = resolve_with_env(&config, &CliOverrides::default(), no_env);
        assert_eq!(resolved.host, "127.0.0.1");
        assert_eq!(resolved.port, 2200);
        assert_eq!(resolved.host_key_path, PathBuf::from("/etc/sshelf/key"));
        assert_eq!(resolved.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(resolved.extension, "markdown");
        assert_eq!(resolved.header_lines, 3);
        assert_eq!(resolved.title, " HELLO ");
        assert_eq!(resolved.markdown_theme, "light");
        assert_eq!(resolved.banner.image, Some(PathBuf::from("logo.png")));
        assert_eq!(resolved.banner.image_height, 10);
        assert_eq!(resolved.banner.padding, 4);
        assert!(resolved.banner.required);
        assert_eq!(resolved.keys.quit, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_env_overrides_config_and_cli_overrides_env() {
        let config = SshelfConfig {
            server: ServerConfig {
                host: Some("10.0.0.1".to_string()),
                port: Some(1000),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = env_from(&[
            ("SSHELF_HOST", "10.0.0.2"),
            ("SSHELF_PORT", "2000"),
            ("SSHELF_DOCUMENTS", "env-docs"),
            ("SSH_FOLDER_PATH", "/keys"),
            ("SSHELF_THEME", "notty"),
        ]);

        let resolved = resolve_with_env(&config, &CliOverrides::default(), &env);
        assert_eq!(resolved.host, "10.0.0.2");
        assert_eq!(resolved.port, 2000);
        assert_eq!(resolved.documents_dir, PathBuf::from("env-docs"));
        assert_eq!(resolved.host_key_path, PathBuf::from("/keys/term_info_ed25519"));
        assert_eq!(resolved.markdown_theme, "notty");

        let cli = CliOverrides {
            host: Some("::1".to_string()),
            port: Some(3000),
            documents: Some(PathBuf::from("cli-docs")),
        };
        let resolved = resolve_with_env(&config, &cli, &env);
        assert_eq!(resolved.host, "::1");
        assert_eq!(resolved.port, 3000);
        assert_eq!(resolved.documents_dir, PathBuf::from("cli-docs"));
    }

    #[test]
    fn test_bad_env_port_falls_through() {
        let config = SshelfConfig {
            server: ServerConfig {
                port: Some(1000),
                ..Default::default()
            },
            ..Default::default()
        };
        let env = env_from(&[("SSHELF_PORT", "not-a-port")]);
        let resolved = resolve_with_env(&config, &CliOverrides::default(), env);
        assert_eq!(resolved.port, 1000);
    }

    #[test]
    fn test_empty_ssh_folder_path_uses_default() {
        let env = env_from(&[("SSH_FOLDER_PATH", "")]);
        let resolved = resolve_with_env(&SshelfConfig::default(), &CliOverrides::default(), env);
        assert_eq!(resolved.host_key_path, PathBuf::from(".ssh/term_info_ed25519"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[documents]\nheader_lines = 0\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.documents.header_lines, Some(0));
    }

    #[test]
    fn test_load_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_load_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("bad.toml"));
    }
}
