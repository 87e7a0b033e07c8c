//! Response document returned by the DeviceInfo service.
//!
//! A [`Document`] has three independent sections. Each request fills only
//! the sections it asked for; the rest keep their `Default` value so the
//! JSON shape is the same for every route.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System vitals and identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Wall-clock time of collection, RFC 1123 in GMT.
    pub time: String,

    /// Service version and build tree hash, joined by `#`.
    pub version: String,

    /// Seconds since boot.
    pub uptime: u64,

    /// Free RAM in bytes.
    pub freeram: u64,

    /// Total RAM in bytes.
    pub totalram: u64,

    /// Host name.
    pub devicename: String,

    /// CPU load percentage rendered as a decimal integer.
    pub cpuload: String,

    /// System identifier derived at initialization.
    pub serialnumber: String,
}

/// One network adapter and the IPv4 addresses bound to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    /// Interface name (e.g., "eth0").
    pub name: String,

    /// Colon-separated MAC address.
    pub mac: String,

    /// Bound addresses in enumeration order. May be empty.
    #[serde(default)]
    pub ip: Vec<String>,
}

impl AddressEntry {
    /// Create an entry with no addresses.
    pub fn new(name: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mac: mac.into(),
            ip: Vec::new(),
        }
    }

    /// Append an address to this entry.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip.push(ip.into());
        self
    }
}

/// Resource monitor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketInfo {
    /// Number of runs currently tracked by the resource monitor.
    pub runs: u32,
}

/// The complete response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub addresses: Vec<AddressEntry>,

    #[serde(default)]
    pub systeminfo: SystemInfo,

    #[serde(default)]
    pub sockets: SocketInfo,
}

impl Document {
    /// True when no section has been populated.
    pub fn is_empty(&self) -> bool {
        self == &Document::default()
    }
}

/// Format a timestamp the way HTTP dates are written (RFC 1123, always GMT).
pub fn rfc1123(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc1123() {
        let time = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(rfc1123(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_default_document_is_empty() {
        let doc = Document::default();
        assert!(doc.is_empty());

        let doc = Document {
            sockets: SocketInfo { runs: 3 },
            ..Default::default()
        };
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_json_field_names() {
        let doc = Document {
            addresses: vec![AddressEntry::new("eth0", "00:11:22:33:44:55").with_ip("10.0.0.2")],
            systeminfo: SystemInfo {
                cpuload: "12".to_string(),
                uptime: 42,
                ..Default::default()
            },
            sockets: SocketInfo { runs: 7 },
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["addresses"][0]["name"], "eth0");
        assert_eq!(value["addresses"][0]["mac"], "00:11:22:33:44:55");
        assert_eq!(value["addresses"][0]["ip"][0], "10.0.0.2");
        assert_eq!(value["systeminfo"]["cpuload"], "12");
        assert_eq!(value["systeminfo"]["uptime"], 42);
        assert_eq!(value["sockets"]["runs"], 7);

        for field in [
            "time",
            "version",
            "uptime",
            "freeram",
            "totalram",
            "devicename",
            "cpuload",
            "serialnumber",
        ] {
            assert!(
                value["systeminfo"].get(field).is_some(),
                "missing systeminfo.{}",
                field
            );
        }
    }

    #[test]
    fn test_adapter_without_addresses_serializes_empty_list() {
        let entry = AddressEntry::new("lo", "00:00:00:00:00:00");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""ip":[]"#));
    }
}
