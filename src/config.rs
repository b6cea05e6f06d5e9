//! Server configuration, read from an INI file:
//!
//! ```ini
//! [Server]
//! Environment = development
//! Port = 8889
//!
//! [Files]
//! DataFile = forest.data
//! ```
//!
//! `Environment` defaults to `production` when absent or empty; `Port` and
//! `DataFile` are required.

use {
    ini::Ini,
    std::path::{Path, PathBuf},
};

const DEFAULT_ENVIRONMENT: &str = "production";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub data_file: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read the configuration file: {0}")]
    Read(#[from] ini::Error),

    #[error("missing required setting [{section}] {key}")]
    Missing {
        section: &'static str,
        key: &'static str,
    },

    #[error("setting [{section}] {key} is not a valid port: {value}")]
    InvalidPort {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;

        let environment = ini
            .get_from(Some("Server"), "Environment")
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT)
            .to_owned();

        let port_raw = required(&ini, "Server", "Port")?;
        let port = port_raw.parse().map_err(|_| ConfigError::InvalidPort {
            section: "Server",
            key: "Port",
            value: port_raw.to_owned(),
        })?;

        let data_file = required(&ini, "Files", "DataFile")?.into();

        Ok(Self {
            environment,
            port,
            data_file,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == DEFAULT_ENVIRONMENT
    }
}

fn required<'i>(
    ini: &'i Ini,
    section: &'static str,
    key: &'static str,
) -> Result<&'i str, ConfigError> {
    ini.get_from(Some(section), key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing { section, key })
}

#[cfg(test)]
mod tests {
    use {super::*, std::fs, tempfile::tempdir};

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_all_sections() {
        let (_dir, path) = write_config(
            "[Server]\nEnvironment = development\nPort = 8889\n\n[Files]\nDataFile = forest.data\n",
        );
        let config = Config::load(path).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.port, 8889);
        assert_eq!(config.data_file, PathBuf::from("forest.data"));
        assert!(!config.is_production());
    }

    #[test]
    fn environment_defaults_to_production() {
        let (_dir, path) = write_config("[Server]\nPort = 80\n\n[Files]\nDataFile = x\n");
        let config = Config::load(path).unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn port_is_required() {
        let (_dir, path) = write_config("[Server]\n\n[Files]\nDataFile = x\n");
        assert!(matches!(
            Config::load(path),
            Err(ConfigError::Missing { key: "Port", .. })
        ));
    }

    #[test]
    fn garbage_port_is_rejected() {
        let (_dir, path) = write_config("[Server]\nPort = lots\n\n[Files]\nDataFile = x\n");
        assert!(matches!(Config::load(path), Err(ConfigError::InvalidPort { .. })));
    }
}
