//! Device capability types and the static in-host provider.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::{CapabilityProvider, Shell, ShellError};

/// Video output resolutions a device can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputResolution {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "480i")]
    Sd480i,
    #[serde(rename = "480p")]
    Sd480p,
    #[serde(rename = "576i")]
    Sd576i,
    #[serde(rename = "576p")]
    Sd576p,
    #[serde(rename = "720p")]
    Hd720p,
    #[serde(rename = "1080i")]
    Hd1080i,
    #[serde(rename = "1080p")]
    Hd1080p,
    #[serde(rename = "2160p30")]
    Uhd2160p30,
    #[serde(rename = "2160p60")]
    Uhd2160p60,
}

/// Audio output connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutput {
    Other,
    Rca,
    Spdif,
    Hdmi,
    Displayport,
}

/// Video output connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoOutput {
    Other,
    Rf,
    Composite,
    Svideo,
    Component,
    Scart,
    Hdmi,
    Displayport,
}

/// Highest supported HDCP level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyProtection {
    #[default]
    Unavailable,
    Hdcp14,
    Hdcp20,
    Hdcp21,
    Hdcp22,
}

impl fmt::Display for CopyProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CopyProtection::Unavailable => "unavailable",
            CopyProtection::Hdcp14 => "HDCP 1.4",
            CopyProtection::Hdcp20 => "HDCP 2.0",
            CopyProtection::Hdcp21 => "HDCP 2.1",
            CopyProtection::Hdcp22 => "HDCP 2.2",
        };
        f.write_str(s)
    }
}

/// Capability set advertised by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<OutputResolution>,

    #[serde(default = "default_audio_outputs")]
    pub audio_outputs: Vec<AudioOutput>,

    #[serde(default = "default_video_outputs")]
    pub video_outputs: Vec<VideoOutput>,

    #[serde(default)]
    pub atmos: bool,

    #[serde(default)]
    pub hdr: bool,

    #[serde(default)]
    pub cec: bool,

    #[serde(default)]
    pub hdcp: CopyProtection,

    /// Simulated provider start-up latency in milliseconds.
    #[serde(default)]
    pub startup_delay_ms: u64,
}

fn default_resolutions() -> Vec<OutputResolution> {
    vec![OutputResolution::Hd720p, OutputResolution::Hd1080p]
}

fn default_audio_outputs() -> Vec<AudioOutput> {
    vec![AudioOutput::Hdmi]
}

fn default_video_outputs() -> Vec<VideoOutput> {
    vec![VideoOutput::Hdmi]
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self {
            resolutions: default_resolutions(),
            audio_outputs: default_audio_outputs(),
            video_outputs: default_video_outputs(),
            atmos: false,
            hdr: false,
            cec: false,
            hdcp: CopyProtection::default(),
            startup_delay_ms: 0,
        }
    }
}

/// Provider answering from a fixed [`CapabilitySet`].
#[derive(Debug)]
pub struct LocalProvider {
    capabilities: CapabilitySet,
    callsign: Option<String>,
}

impl LocalProvider {
    pub fn new(capabilities: CapabilitySet) -> Self {
        Self {
            capabilities,
            callsign: None,
        }
    }

    fn ensure_configured(&self) -> Result<(), ShellError> {
        if self.callsign.is_none() {
            return Err(ShellError::Provider("provider used before configure".into()));
        }
        Ok(())
    }
}

impl CapabilityProvider for LocalProvider {
    fn configure(&mut self, shell: &dyn Shell) -> Result<(), ShellError> {
        let callsign = shell.callsign();
        debug!(callsign = %callsign, "Capability provider configured");
        self.callsign = Some(callsign);
        Ok(())
    }

    fn resolutions(&self) -> Result<Vec<OutputResolution>, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.resolutions.clone())
    }

    fn audio_outputs(&self) -> Result<Vec<AudioOutput>, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.audio_outputs.clone())
    }

    fn video_outputs(&self) -> Result<Vec<VideoOutput>, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.video_outputs.clone())
    }

    fn atmos(&self) -> Result<bool, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.atmos)
    }

    fn hdr(&self) -> Result<bool, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.hdr)
    }

    fn cec(&self) -> Result<bool, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.cec)
    }

    fn hdcp(&self) -> Result<CopyProtection, ShellError> {
        self.ensure_configured()?;
        Ok(self.capabilities.hdcp)
    }

    fn release(self: Box<Self>) {
        info!(
            callsign = self.callsign.as_deref().unwrap_or("<unconfigured>"),
            "Capability provider released"
        );
    }
}
