//! Configuration for the DeviceInfo service.

use std::net::SocketAddr;
use std::path::Path;

use deviceinfo_common::{Error, LoggingConfig, Result, load_config};
use serde::{Deserialize, Serialize};

use crate::capabilities::CapabilitySet;
use crate::shell::LocalShellConfig;

/// Complete service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Plugin instance settings.
    #[serde(default)]
    pub plugin: PluginConfig,

    /// Capabilities advertised by the local provider.
    #[serde(default)]
    pub capabilities: CapabilitySet,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Listen address (default: "0.0.0.0:8080").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// URL prefix the plugin is mounted under (default: "/Service/DeviceInfo").
    #[serde(default = "default_web_prefix")]
    pub web_prefix: String,
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_prefix() -> String {
    "/Service/DeviceInfo".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            web_prefix: default_web_prefix(),
        }
    }
}

/// Plugin instance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Name the plugin is registered under (default: "DeviceInfo").
    #[serde(default = "default_callsign")]
    pub callsign: String,

    /// Instance configuration handed to the plugin as its config line.
    #[serde(default = "default_configuration")]
    pub configuration: serde_json::Value,

    /// Build tree hash reported in the version string.
    #[serde(default = "default_build_hash")]
    pub build_hash: String,
}

fn default_callsign() -> String {
    "DeviceInfo".to_string()
}

fn default_configuration() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_build_hash() -> String {
    option_env!("DEVICEINFO_BUILD_HASH")
        .unwrap_or("unknown")
        .to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            callsign: default_callsign(),
            configuration: default_configuration(),
            build_hash: default_build_hash(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: ServiceConfig = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        let prefix = &self.http.web_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "web_prefix must start with '/': {}",
                prefix
            )));
        }
        if prefix.ends_with('/') {
            return Err(Error::Config(format!(
                "web_prefix must not end with '/': {}",
                prefix
            )));
        }

        if !self.plugin.configuration.is_object() {
            return Err(Error::Config(
                "plugin.configuration must be an object".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.http
            .listen
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address '{}': {}", self.http.listen, e)))
    }

    /// Settings for the standalone host.
    pub fn shell_config(&self) -> LocalShellConfig {
        LocalShellConfig {
            callsign: self.plugin.callsign.clone(),
            config_line: self.plugin.configuration.to_string(),
            web_prefix: self.http.web_prefix.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_tree_hash: self.plugin.build_hash.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}
