use crate::core::{DispatchError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Name of the server port option
pub const PORT_OPTION: &str = "port";

/// Name of the bind scope option (comma separated addresses, `*` for all)
pub const LISTEN_ADDRESSES_OPTION: &str = "listen_addresses";

/// Read-only view over runtime settings
pub trait ConfigSource: Send + Sync {
    fn get(&self, option: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, option: &str) -> Option<String> {
        HashMap::get(self, option).cloned()
    }
}

/// Runtime network settings of the local server
///
/// Similar to the `port` / `listen_addresses` pair of postgresql.conf
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Server port, left to the link default when absent
    pub port: Option<u16>,

    /// Bind scope, `None` when the option is unset
    pub listen_addresses: Option<String>,

    /// Any other option, looked up verbatim
    pub extra: HashMap<String, String>,
}

impl RuntimeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the bind scope
    pub fn listen_addresses(mut self, addresses: &str) -> Self {
        self.listen_addresses = Some(addresses.to_string());
        self
    }

    /// Set an arbitrary option
    pub fn option(mut self, name: &str, value: &str) -> Self {
        self.extra.insert(name.to_string(), value.to_string());
        self
    }

    /// Parse settings from a JSON document
    ///
    /// # Examples
    ///
    /// ```
    /// # use autonomous_dispatch::config::RuntimeSettings;
    /// let settings = RuntimeSettings::from_json_str(
    ///     r#"{ "port": 5433, "listen_addresses": "localhost" }"#
    /// ).unwrap();
    /// assert_eq!(settings.port, Some(5433));
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| DispatchError::Config(format!("invalid settings document: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DispatchError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        log::debug!("loading runtime settings from {}", path.display());
        Self::from_json_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == Some(0) {
            return Err(DispatchError::Config("port must be > 0".into()));
        }
        Ok(())
    }
}

impl ConfigSource for RuntimeSettings {
    fn get(&self, option: &str) -> Option<String> {
        match option {
            PORT_OPTION => self.port.map(|p| p.to_string()),
            LISTEN_ADDRESSES_OPTION => self.listen_addresses.clone(),
            other => self.extra.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builder_pattern() {
        let settings = RuntimeSettings::new()
            .port(5433)
            .listen_addresses("127.0.0.1")
            .option("application_name", "batch");

        assert_eq!(settings.get(PORT_OPTION).as_deref(), Some("5433"));
        assert_eq!(settings.get(LISTEN_ADDRESSES_OPTION).as_deref(), Some("127.0.0.1"));
        assert_eq!(settings.get("application_name").as_deref(), Some("batch"));
        assert_eq!(settings.get("missing"), None);
    }

    #[test]
    fn test_default_is_empty() {
        let settings = RuntimeSettings::default();
        assert!(settings.get(PORT_OPTION).is_none());
        assert!(settings.get(LISTEN_ADDRESSES_OPTION).is_none());
    }

    #[test]
    fn test_from_json() {
        let settings = RuntimeSettings::from_json_str(r#"{"port": 6000}"#).unwrap();
        assert_eq!(settings.port, Some(6000));
        assert!(settings.listen_addresses.is_none());

        assert!(RuntimeSettings::from_json_str(r#"{"port": 0}"#).is_err());
        assert!(RuntimeSettings::from_json_str(r#"{"port": "x"}"#).is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"listen_addresses": "*", "extra": {{"cluster_name": "main"}}}}"#).unwrap();

        let settings = RuntimeSettings::from_json_file(file.path()).unwrap();
        assert_eq!(settings.get(LISTEN_ADDRESSES_OPTION).as_deref(), Some("*"));
        assert_eq!(settings.get("cluster_name").as_deref(), Some("main"));

        assert!(matches!(
            RuntimeSettings::from_json_file("/nonexistent/settings.json"),
            Err(DispatchError::Config(_))
        ));
    }

    #[test]
    fn test_hash_map_source() {
        let mut map = HashMap::new();
        map.insert(PORT_OPTION.to_string(), "5432".to_string());
        let source: &dyn ConfigSource = &map;
        assert_eq!(source.get(PORT_OPTION).as_deref(), Some("5432"));
    }
}
