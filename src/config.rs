//! Configuration for the sheet merger

use crate::error::MergerError;
use crate::error::ResultMessage;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

const MEGABYTE: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub merge: MergeSettings,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            merge: MergeSettings::default(),
            log_level: default_log_level(),
        }
    }
}

impl MergerConfig {
    /// Loads a TOML file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MergerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(MergerError::from)
            .with_prefix(&format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_prefix(&format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, MergerError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `SHEET_MERGER_*` environment variables on top of the current values.
    ///
    /// # Errors
    /// Fails on a numeric variable that does not parse, naming the variable and value.
    pub fn apply_env(&mut self) -> Result<(), MergerError> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), MergerError> {
        if let Some(bind) = var("SHEET_MERGER_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(port) = parse_var(&var, "SHEET_MERGER_PORT")? {
            self.server.port = port;
        }
        if let Some(megabytes) = parse_var::<usize>(&var, "SHEET_MERGER_MAX_UPLOAD_MB")? {
            self.server.max_upload_bytes = megabytes.saturating_mul(MEGABYTE);
        }
        if let Some(rows) = parse_var(&var, "SHEET_MERGER_PREVIEW_ROWS")? {
            self.merge.preview_rows = rows;
        }
        if let Some(level) = var("SHEET_MERGER_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// `bind_address:port`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_address: String,
    pub port: u16,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            max_upload_bytes: 200 * MEGABYTE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeSettings {
    /// Rows shown in the preview
    pub preview_rows: usize,
    /// Encoded workbooks kept in the export cache, 0 disables it
    pub cache_entries: usize,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            preview_rows: 1000,
            cache_entries: 16,
        }
    }
}

fn parse_var<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, MergerError> {
    match var(name) {
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => {
                let message = format!("Invalid {} value '{}'", name, value);
                Err(MergerError::WithContextError(message))
            }
        },
        None => Ok(None),
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = MergerConfig::default();
        assert_eq!(config.listen_address(), "127.0.0.1:8501");
        assert_eq!(config.server.max_upload_bytes, 200 * 1024 * 1024);
        assert_eq!(config.merge.preview_rows, 1000);
        assert_eq!(config.merge.cache_entries, 16);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MergerConfig::from_toml("[server]\nport = 9000\n\n[merge]\npreview_rows = 50\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.merge.preview_rows, 50);
        assert_eq!(config.merge.cache_entries, 16);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn invalid_toml() {
        assert!(MergerConfig::from_toml("[server\nport = 1").is_err());
    }

    #[test]
    fn from_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        assert_eq!(MergerConfig::from_file(file.path()).unwrap().log_level, "debug");

        let error = MergerConfig::from_file("/nonexistent/merger.toml").unwrap_err();
        assert!(error.to_string().starts_with("Failed to read config /nonexistent/merger.toml: "));
    }

    #[test]
    fn environment_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SHEET_MERGER_BIND", "0.0.0.0"),
            ("SHEET_MERGER_PORT", "8080"),
            ("SHEET_MERGER_MAX_UPLOAD_MB", "5"),
            ("SHEET_MERGER_PREVIEW_ROWS", "20"),
            ("SHEET_MERGER_LOG_LEVEL", "warn"),
        ]);
        let mut config = MergerConfig::default();
        config.apply_vars(|name| vars.get(name).map(|value| value.to_string())).unwrap();
        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.server.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.merge.preview_rows, 20);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_environment_value_is_rejected() {
        let vars = HashMap::from([("SHEET_MERGER_PREVIEW_ROWS", "not a number")]);
        let mut config = MergerConfig::default();
        let error = config
            .apply_vars(|name| vars.get(name).map(|value| value.to_string()))
            .unwrap_err();
        assert_eq!(error.to_string(), "Invalid SHEET_MERGER_PREVIEW_ROWS value 'not a number'");

        let vars = HashMap::from([("SHEET_MERGER_PORT", "70000")]);
        let mut config = MergerConfig::default();
        assert!(config.apply_vars(|name| vars.get(name).map(|value| value.to_string())).is_err());
        assert_eq!(config.server.port, 8501);
    }
}
