//! Layered TOML configuration.
//!
//! Files are read in order and later layers win field by field:
//!
//! 1. `<config dir>/ubdump/config.toml` (e.g. `~/.config/ubdump/config.toml`)
//! 2. `./ubdump.toml`
//!
//! `--config PATH` replaces both layers. Command-line flags and `UBDUMP_*`
//! environment variables are applied on top by the caller.
//!
//! ```toml
//! [connection]
//! device = "/dev/ttyUSB0"
//!
//! [shell]
//! prompt = "=>"
//!
//! [dump]
//! size = 0x20000
//! burst_size = 1024
//! slow_timeout_ms = 1000
//! fast_timeout_ms = 10
//! ```

use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ubdump.toml";

/// `[connection]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Serial device path.
    pub device: Option<String>,
}

/// `[shell]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellConfig {
    /// Prompt the shell prints when idle.
    pub prompt: Option<String>,
}

/// `[dump]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DumpConfig {
    /// Bytes to dump.
    pub size: Option<u64>,
    /// Bytes per `md.b` command.
    pub burst_size: Option<u32>,
    /// Handshake quiet period, milliseconds.
    pub slow_timeout_ms: Option<u64>,
    /// Burst quiet period, milliseconds.
    pub fast_timeout_ms: Option<u64>,
}

/// Everything a config file can set. Unset fields fall through to the next
/// layer down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial connection.
    pub connection: ConnectionConfig,
    /// Shell interaction.
    pub shell: ShellConfig,
    /// Dump defaults.
    pub dump: DumpConfig,
}

impl Config {
    /// Build the effective file configuration.
    ///
    /// With `explicit` set only that file is read; otherwise the global and
    /// local files are layered.
    pub fn load(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::read(path).unwrap_or_else(|| {
                warn!("Ignoring config {}, using defaults", path.display());
                Self::default()
            });
        }

        Self::search_paths()
            .iter()
            .filter_map(|path| Self::read(path))
            .fold(Self::default(), Self::overlay)
    }

    /// Files consulted when no explicit path is given, lowest priority first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Self::global_path().into_iter().collect();
        paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
        paths
    }

    /// `<config dir>/ubdump/config.toml`, if the platform has a config dir.
    pub fn global_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ubdump").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Read one file. Missing files are skipped silently, unreadable or
    /// invalid ones with a warning.
    fn read(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read {}: {e}", path.display());
                return None;
            },
        };
        match toml::from_str(&text) {
            Ok(config) => {
                debug!("Using config {}", path.display());
                Some(config)
            },
            Err(e) => {
                warn!("Invalid config {}: {e}", path.display());
                None
            },
        }
    }

    /// Lay `upper` over `self`; fields set in `upper` win.
    #[must_use]
    fn overlay(self, upper: Self) -> Self {
        Self {
            connection: ConnectionConfig {
                device: upper.connection.device.or(self.connection.device),
            },
            shell: ShellConfig {
                prompt: upper.shell.prompt.or(self.shell.prompt),
            },
            dump: DumpConfig {
                size: upper.dump.size.or(self.dump.size),
                burst_size: upper.dump.burst_size.or(self.dump.burst_size),
                slow_timeout_ms: upper.dump.slow_timeout_ms.or(self.dump.slow_timeout_ms),
                fast_timeout_ms: upper.dump.fast_timeout_ms.or(self.dump.fast_timeout_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_empty_file_sets_nothing() {
        assert_eq!(parse(""), Config::default());
    }

    #[test]
    fn test_all_tables_parse() {
        let config = parse(
            r#"
[connection]
device = "/dev/ttyUSB0"

[shell]
prompt = "=> "

[dump]
size = 65536
burst_size = 2048
slow_timeout_ms = 1500
fast_timeout_ms = 25
"#,
        );
        assert_eq!(config.connection.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.shell.prompt.as_deref(), Some("=> "));
        assert_eq!(config.dump.size, Some(65536));
        assert_eq!(config.dump.burst_size, Some(2048));
        assert_eq!(config.dump.slow_timeout_ms, Some(1500));
        assert_eq!(config.dump.fast_timeout_ms, Some(25));
    }

    #[test]
    fn test_misspelled_key_is_rejected() {
        assert!(toml::from_str::<Config>("[dump]\nburst = 512\n").is_err());
    }

    #[test]
    fn test_upper_layer_wins_per_field() {
        let global = parse("[connection]\ndevice = \"/dev/ttyACM0\"\n[dump]\nsize = 4096\n");
        let local = parse("[connection]\ndevice = \"/dev/ttyUSB1\"\n[shell]\nprompt = \"=>\"\n");

        let merged = global.overlay(local);

        assert_eq!(merged.connection.device.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(merged.shell.prompt.as_deref(), Some("=>"));
        assert_eq!(merged.dump.size, Some(4096));
    }

    #[test]
    fn test_empty_upper_layer_changes_nothing() {
        let base = parse("[dump]\nburst_size = 512\nfast_timeout_ms = 20\n");
        assert_eq!(base.clone().overlay(Config::default()), base);
    }

    #[test]
    fn test_serialized_config_reads_back() {
        let mut config = Config::default();
        config.connection.device = Some("COM3".to_string());
        config.dump.size = Some(1 << 20);

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(parse(&text), config);
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.toml");
        fs::write(&path, "[connection]\ndevice = \"/dev/ttyUSB1\"\n[dump]\nsize = 1024\n").unwrap();

        let config = Config::load(Some(&path));
        assert_eq!(config.connection.device.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(config.dump.size, Some(1024));
    }

    #[test]
    fn test_broken_explicit_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        assert_eq!(Config::load(Some(&path)), Config::default());
    }

    #[test]
    fn test_missing_explicit_file_gives_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/ubdump/config.toml")));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_local_file_is_searched_last() {
        let paths = Config::search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from(LOCAL_CONFIG_FILE)));
        if let Some(global) = Config::global_path() {
            assert_eq!(paths.first(), Some(&global));
            assert!(global.ends_with("config.toml"));
        }
    }
}
