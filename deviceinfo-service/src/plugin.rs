//! The DeviceInfo plugin: lifecycle and request processing.
//!
//! A [`DeviceInfo`] is created empty, bound to its host by
//! [`initialize`](DeviceInfo::initialize), serves requests through
//! [`process`](DeviceInfo::process), and is unbound exactly once by
//! [`deinitialize`](DeviceInfo::deinitialize).

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::collector::{Facilities, Identity};
use crate::host::{CapabilityProvider, Shell, SubSystems};
use crate::router::{self, Request, Response, Route, UnknownPathPolicy, Verb};

/// How long to wait for the capability provider to come up.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Returned by `initialize` when subsystem tracking is unavailable.
pub const SYSTEM_INFO_UNAVAILABLE: &str = "Could not retrieve System Information.";

/// Returned by `initialize` when the capability provider cannot be obtained.
pub const NOT_INSTANTIATED: &str = "DeviceInfo could not be instantiated.";

/// Per-instance configuration carried in the host's config line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoConfig {
    /// Name of the capability provider to instantiate.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Answer for sub-paths that match no route.
    #[serde(default)]
    pub unknown_path: UnknownPathPolicy,
}

fn default_provider() -> String {
    "DeviceInfoImplementation".to_string()
}

impl Default for DeviceInfoConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            unknown_path: UnknownPathPolicy::default(),
        }
    }
}

impl DeviceInfoConfig {
    /// Parse a config line. An empty line yields the defaults.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        if line.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(line)
    }
}

/// The DeviceInfo plugin instance.
pub struct DeviceInfo {
    facilities: Facilities,
    config: DeviceInfoConfig,
    shell: Option<Arc<dyn Shell>>,
    sub_systems: Option<Arc<dyn SubSystems>>,
    implementation: Option<Box<dyn CapabilityProvider>>,
    connection_id: u32,
    system_id: String,
    skip_url: usize,
    initialized: bool,
}

impl DeviceInfo {
    pub fn new(facilities: Facilities) -> Self {
        Self {
            facilities,
            config: DeviceInfoConfig::default(),
            shell: None,
            sub_systems: None,
            implementation: None,
            connection_id: 0,
            system_id: String::new(),
            skip_url: 0,
            initialized: false,
        }
    }

    /// Bind to the host and acquire the capability provider.
    ///
    /// Returns an empty string on success, otherwise a description of what
    /// failed. Missing subsystem tracking takes precedence over a missing
    /// provider; either way the host treats the plugin as failed.
    ///
    /// # Panics
    ///
    /// If the plugin is already initialized.
    pub fn initialize(&mut self, shell: Arc<dyn Shell>) -> String {
        assert!(
            !self.initialized
                && self.shell.is_none()
                && self.sub_systems.is_none()
                && self.implementation.is_none(),
            "DeviceInfo initialized twice"
        );

        info!(callsign = %shell.callsign(), "Initializing DeviceInfo");

        self.config = DeviceInfoConfig::from_line(&shell.config_line()).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid DeviceInfo configuration, using defaults");
            DeviceInfoConfig::default()
        });
        self.skip_url = shell.web_prefix().len();
        self.sub_systems = shell.sub_systems();
        self.shell = Some(shell.clone());
        self.system_id = self.facilities.system_id();
        self.initialized = true;

        match shell.root(&self.config.provider, PROVIDER_TIMEOUT) {
            Ok((mut implementation, connection_id)) => {
                self.connection_id = connection_id;
                if let Err(e) = implementation.configure(shell.as_ref()) {
                    warn!(error = %e, "Capability provider rejected its configuration");
                }
                self.implementation = Some(implementation);
                self.test_implementation();
            }
            Err(e) => {
                self.shell = None;
                error!(
                    provider = %self.config.provider,
                    error = %e,
                    "DeviceInfo could not be instantiated"
                );
            }
        }

        if self.sub_systems.is_none() {
            SYSTEM_INFO_UNAVAILABLE.to_string()
        } else if self.implementation.is_none() {
            NOT_INSTANTIATED.to_string()
        } else {
            info!(
                skip_url = self.skip_url,
                connection_id = self.connection_id,
                "DeviceInfo initialized"
            );
            String::new()
        }
    }

    /// Release the capability provider and unbind from the host.
    ///
    /// After a failed provider acquisition this only resets state.
    ///
    /// # Panics
    ///
    /// If the plugin was never initialized, or `shell` is not the shell it
    /// was initialized with.
    pub fn deinitialize(&mut self, shell: &Arc<dyn Shell>) {
        assert!(self.initialized, "DeviceInfo deinitialized before initialize");

        if self.implementation.is_none() {
            warn!("DeviceInfo has no capability provider, nothing to release");
            self.reset();
            return;
        }

        assert!(
            self.shell.as_ref().is_some_and(|own| Arc::ptr_eq(own, shell)),
            "DeviceInfo deinitialized with a different shell"
        );

        if let Some(implementation) = self.implementation.take() {
            implementation.release();
        }

        if self.connection_id != 0 {
            // The provider process may already be gone.
            match shell.remote_connection(self.connection_id) {
                Some(connection) => {
                    info!(connection_id = connection.id(), "Terminating capability provider");
                    connection.terminate();
                    drop(connection);
                }
                None => {
                    debug!(
                        connection_id = self.connection_id,
                        "Capability provider connection already closed"
                    );
                }
            }
        }

        self.reset();
        info!("DeviceInfo deinitialized");
    }

    fn reset(&mut self) {
        self.sub_systems = None;
        self.shell = None;
        self.connection_id = 0;
        self.system_id.clear();
        self.skip_url = 0;
        self.config = DeviceInfoConfig::default();
        self.initialized = false;
    }

    /// Whether the plugin is bound to a host with a live provider and
    /// subsystem tracking.
    pub fn is_serving(&self) -> bool {
        self.shell.is_some() && self.sub_systems.is_some() && self.implementation.is_some()
    }

    /// Connection id of the provider process, or 0.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Identifier computed at initialization.
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    /// Prefix length skipped when routing.
    pub fn skip_url(&self) -> usize {
        self.skip_url
    }

    /// Free-form status text. There is nothing additional to report.
    pub fn information(&self) -> String {
        String::new()
    }

    /// Hook for preparing a request body before `process`. GET carries none.
    pub fn inbound(&self, _request: &Request) {}

    /// Route a request and assemble its response.
    pub fn process(&self, request: &Request) -> Response {
        if request.verb != Verb::Get {
            warn!(verb = ?request.verb, path = %request.path, "Unsupported request");
            return Response::bad_request();
        }

        let route = router::resolve(&request.path, self.skip_url);
        debug!(path = %request.path, route = ?route, "Routing request");

        if let Route::Unknown(tag) = &route {
            if self.config.unknown_path == UnknownPathPolicy::NotFound {
                return Response::error(
                    StatusCode::NOT_FOUND,
                    format!("Unknown DeviceInfo resource: {}", tag),
                );
            }
        }

        let version = self.version();
        let identity = Identity {
            version: &version,
            serial_number: &self.system_id,
        };

        Response::json(self.facilities.collect(route.sections(), identity))
    }

    fn version(&self) -> String {
        let version = self
            .shell
            .as_ref()
            .map(|shell| shell.version())
            .unwrap_or_default();
        let hash = self
            .sub_systems
            .as_ref()
            .map(|sub_systems| sub_systems.build_tree_hash())
            .unwrap_or_default();

        format!("{}#{}", version, hash)
    }

    /// Walk every provider capability once and trace it.
    fn test_implementation(&self) {
        let Some(implementation) = self.implementation.as_deref() else {
            return;
        };

        debug!("Capability provider self-test");

        if let Ok(resolutions) = implementation.resolutions() {
            for resolution in resolutions {
                debug!(?resolution, "Resolution");
            }
        }

        if let Ok(outputs) = implementation.audio_outputs() {
            for audio in outputs {
                debug!(?audio, "Audio output");
            }
        }

        if let Ok(outputs) = implementation.video_outputs() {
            for video in outputs {
                debug!(?video, "Video output");
            }
        }

        debug!(
            atmos = implementation.atmos().unwrap_or(false),
            hdr = implementation.hdr().unwrap_or(false),
            cec = implementation.cec().unwrap_or(false),
            "Supported features"
        );

        match implementation.hdcp() {
            Ok(hdcp) => debug!(%hdcp, "HDCP"),
            Err(e) => debug!(error = %e, "HDCP unavailable"),
        }
    }
}

impl Drop for DeviceInfo {
    fn drop(&mut self) {
        if self.implementation.is_some() {
            warn!("DeviceInfo dropped while still initialized");
        }
    }
}
