//! Interfaces consumed from the hosting environment.
//!
//! The plugin never talks to the operating system or to the capability
//! provider process directly. Everything goes through the traits in this
//! module so the host (or a test) decides what backs them.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::capabilities::{AudioOutput, CopyProtection, OutputResolution, VideoOutput};

/// Errors reported by the host while brokering the capability provider.
#[derive(Debug, Error)]
pub enum ShellError {
    /// No provider is registered under the requested name.
    #[error("Unknown capability provider: {name}")]
    UnknownProvider { name: String },

    /// The provider did not come up before the deadline.
    #[error("Capability provider '{name}' did not respond within {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u128 },

    /// The provider process could not be started.
    #[error("Failed to start capability provider '{name}': {message}")]
    Spawn { name: String, message: String },

    /// The provider rejected or failed a call.
    #[error("Capability provider error: {0}")]
    Provider(String),
}

/// Platform subsystems tracked by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Platform,
    Network,
    Internet,
    Time,
    Graphics,
}

/// Readiness tracking for platform subsystems.
pub trait SubSystems: Send + Sync {
    /// Whether the given subsystem finished initializing.
    fn is_active(&self, subsystem: Subsystem) -> bool;

    /// Hash of the source tree the host was built from.
    fn build_tree_hash(&self) -> String;
}

/// Transport to an out-of-process component.
///
/// Dropping the last `Arc` releases the connection.
pub trait RemoteConnection: Send + Sync {
    fn id(&self) -> u32;

    /// Forcefully stop the remote side.
    fn terminate(&self);
}

/// Device hardware and media capabilities, served out of process.
pub trait CapabilityProvider: Send + Sync {
    /// Hand the provider its host context. Called once after acquisition.
    fn configure(&mut self, shell: &dyn Shell) -> Result<(), ShellError>;

    fn resolutions(&self) -> Result<Vec<OutputResolution>, ShellError>;

    fn audio_outputs(&self) -> Result<Vec<AudioOutput>, ShellError>;

    fn video_outputs(&self) -> Result<Vec<VideoOutput>, ShellError>;

    fn atmos(&self) -> Result<bool, ShellError>;

    fn hdr(&self) -> Result<bool, ShellError>;

    fn cec(&self) -> Result<bool, ShellError>;

    fn hdcp(&self) -> Result<CopyProtection, ShellError>;

    /// Give the handle back. The provider must not be used afterwards.
    fn release(self: Box<Self>);
}

/// The hosting service context handed to the plugin.
pub trait Shell: Send + Sync {
    /// Name the plugin is registered under.
    fn callsign(&self) -> String;

    /// Instance configuration (a JSON object as text).
    fn config_line(&self) -> String;

    /// Externally visible URL prefix for this plugin, without trailing slash.
    fn web_prefix(&self) -> String;

    /// Host version string.
    fn version(&self) -> String;

    /// Readiness tracking, if the host provides it.
    fn sub_systems(&self) -> Option<Arc<dyn SubSystems>>;

    /// Look up a live connection. Returns `None` once the remote side is gone.
    fn remote_connection(&self, id: u32) -> Option<Arc<dyn RemoteConnection>>;

    /// Instantiate a capability provider by name, waiting at most `timeout`.
    ///
    /// Returns the provider together with the id of the connection hosting
    /// it, or `0` when the provider lives in-process.
    fn root(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<(Box<dyn CapabilityProvider>, u32), ShellError>;
}

/// Host-wide system statistics.
pub trait SystemStats: Send + Sync {
    /// Seconds since boot.
    fn uptime(&self) -> u64;

    fn free_ram(&self) -> u64;

    fn total_ram(&self) -> u64;

    fn host_name(&self) -> String;

    /// CPU load in percent (0-100).
    fn cpu_load(&self) -> u32;

    /// Raw, stable device identifier bytes. Empty if unavailable.
    fn raw_device_id(&self) -> Vec<u8>;
}

/// A network adapter as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adapter {
    pub name: String,
    pub mac: [u8; 6],
    pub ipv4: Vec<Ipv4Addr>,
}

/// Network adapter enumeration.
pub trait AdapterEnumeration: Send + Sync {
    /// Adapters in host-defined order.
    fn adapters(&self) -> Vec<Adapter>;
}

/// Resource monitor counters.
pub trait ResourceCount: Send + Sync {
    /// Number of runs currently tracked by the resource monitor.
    fn runs(&self) -> u32;
}
