//! Telemetry collectors.
//!
//! Each collector reads one host facility and fills one section of the
//! response [`Document`]. Collectors never write host state and treat
//! empty or zero readings as valid values.

use std::sync::Arc;

use deviceinfo_common::{AddressEntry, Document, SocketInfo, SystemInfo, rfc1123};
use tracing::trace;

use crate::host::{AdapterEnumeration, ResourceCount, SystemStats};
use crate::router::Sections;

/// Host facilities the collectors read from.
#[derive(Clone)]
pub struct Facilities {
    pub system: Arc<dyn SystemStats>,
    pub adapters: Arc<dyn AdapterEnumeration>,
    pub resources: Arc<dyn ResourceCount>,
}

/// Identity values fixed at initialization and stamped into `SystemInfo`.
#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    pub version: &'a str,
    pub serial_number: &'a str,
}

impl Facilities {
    pub fn new(
        system: Arc<dyn SystemStats>,
        adapters: Arc<dyn AdapterEnumeration>,
        resources: Arc<dyn ResourceCount>,
    ) -> Self {
        Self {
            system,
            adapters,
            resources,
        }
    }

    /// Collect the requested sections into a fresh document.
    pub fn collect(&self, sections: Sections, identity: Identity<'_>) -> Document {
        let mut doc = Document::default();

        if sections.addresses {
            doc.addresses = self.address_info();
        }

        if sections.system {
            doc.systeminfo = self.system_info(identity);
        }

        if sections.sockets {
            doc.sockets = self.socket_info();
        }

        doc
    }

    /// System vitals plus the identity fixed at initialization.
    pub fn system_info(&self, identity: Identity<'_>) -> SystemInfo {
        let info = SystemInfo {
            time: rfc1123(chrono::Utc::now()),
            version: identity.version.to_string(),
            uptime: self.system.uptime(),
            freeram: self.system.free_ram(),
            totalram: self.system.total_ram(),
            devicename: self.system.host_name(),
            cpuload: self.system.cpu_load().to_string(),
            serialnumber: identity.serial_number.to_string(),
        };

        trace!(uptime = info.uptime, cpuload = %info.cpuload, "Collected system info");
        info
    }

    /// One entry per adapter, including adapters without any address.
    pub fn address_info(&self) -> Vec<AddressEntry> {
        self.adapters
            .adapters()
            .into_iter()
            .map(|adapter| {
                let entry = AddressEntry::new(adapter.name, format_mac(&adapter.mac, ':'));
                adapter
                    .ipv4
                    .iter()
                    .fold(entry, |entry, ip| entry.with_ip(ip.to_string()))
            })
            .collect()
    }

    pub fn socket_info(&self) -> SocketInfo {
        SocketInfo {
            runs: self.resources.runs(),
        }
    }

    /// Derive the system identifier from the raw device id and adapter MACs.
    pub fn system_id(&self) -> String {
        let mac = self
            .adapters
            .adapters()
            .into_iter()
            .map(|adapter| adapter.mac)
            .find(|mac| mac.iter().any(|b| *b != 0));

        system_id(&self.system.raw_device_id(), mac.as_ref())
    }
}

/// Render a MAC address as lowercase hex octets joined by `delimiter`.
pub fn format_mac(mac: &[u8; 6], delimiter: char) -> String {
    let mut result = String::with_capacity(17);
    for (i, byte) in mac.iter().enumerate() {
        if i > 0 {
            result.push(delimiter);
        }
        result.push_str(&format!("{:02x}", byte));
    }
    result
}

/// Mix the raw device id with a MAC address and render it as uppercase hex.
///
/// Each id byte is XORed with the MAC byte at the same position (the MAC
/// repeats as needed). Without an id the MAC alone is used; without either
/// the identifier is empty.
pub fn system_id(raw: &[u8], mac: Option<&[u8; 6]>) -> String {
    let bytes: Vec<u8> = match (raw.is_empty(), mac) {
        (false, Some(mac)) => raw
            .iter()
            .zip(mac.iter().cycle())
            .map(|(id, m)| id ^ m)
            .collect(),
        (false, None) => raw.to_vec(),
        (true, Some(mac)) => mac.to_vec(),
        (true, None) => Vec::new(),
    };

    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Adapter;
    use std::net::Ipv4Addr;

    struct Stats;

    impl SystemStats for Stats {
        fn uptime(&self) -> u64 {
            3600
        }
        fn free_ram(&self) -> u64 {
            512
        }
        fn total_ram(&self) -> u64 {
            2048
        }
        fn host_name(&self) -> String {
            "settop".to_string()
        }
        fn cpu_load(&self) -> u32 {
            17
        }
        fn raw_device_id(&self) -> Vec<u8> {
            vec![0x10, 0x20]
        }
    }

    struct Adapters(Vec<Adapter>);

    impl AdapterEnumeration for Adapters {
        fn adapters(&self) -> Vec<Adapter> {
            self.0.clone()
        }
    }

    struct Runs(u32);

    impl ResourceCount for Runs {
        fn runs(&self) -> u32 {
            self.0
        }
    }

    fn facilities(adapters: Vec<Adapter>) -> Facilities {
        Facilities::new(
            Arc::new(Stats),
            Arc::new(Adapters(adapters)),
            Arc::new(Runs(9)),
        )
    }

    const IDENTITY: Identity<'static> = Identity {
        version: "1.2.3#cafe",
        serial_number: "ABCD",
    };

    #[test]
    fn test_format_mac() {
        assert_eq!(
            format_mac(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0xff], ':'),
            "00:1a:2b:3c:4d:ff"
        );
        assert_eq!(format_mac(&[0; 6], '-'), "00-00-00-00-00-00");
    }

    #[test]
    fn test_system_id() {
        let mac = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        assert_eq!(system_id(&[0x10, 0x20], Some(&mac)), "1122");
        assert_eq!(system_id(&[0xff; 8], Some(&mac)), "FEFDFCFBFAF9FEFD");
        assert_eq!(system_id(&[0xab], None), "AB");
        assert_eq!(system_id(&[], Some(&mac)), "010203040506");
        assert_eq!(system_id(&[], None), "");
    }

    #[test]
    fn test_system_info() {
        let info = facilities(vec![]).system_info(IDENTITY);

        assert!(info.time.ends_with(" GMT"));
        assert_eq!(info.version, "1.2.3#cafe");
        assert_eq!(info.uptime, 3600);
        assert_eq!(info.freeram, 512);
        assert_eq!(info.totalram, 2048);
        assert_eq!(info.devicename, "settop");
        assert_eq!(info.cpuload, "17");
        assert_eq!(info.serialnumber, "ABCD");
    }

    #[test]
    fn test_address_info_keeps_order_and_empty_adapters() {
        let adapters = vec![
            Adapter {
                name: "eth0".to_string(),
                mac: [0x02, 0, 0, 0, 0, 0x01],
                ipv4: vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 6)],
            },
            Adapter {
                name: "wlan0".to_string(),
                mac: [0x02, 0, 0, 0, 0, 0x02],
                ipv4: vec![],
            },
        ];

        let entries = facilities(adapters).address_info();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "eth0");
        assert_eq!(entries[0].mac, "02:00:00:00:00:01");
        assert_eq!(entries[0].ip, vec!["10.0.0.5", "10.0.0.6"]);
        assert_eq!(
            entries[1],
            AddressEntry::new("wlan0", "02:00:00:00:00:02")
        );
    }

    #[test]
    fn test_collect_only_requested_sections() {
        let facilities = facilities(vec![Adapter {
            name: "eth0".to_string(),
            ..Default::default()
        }]);

        let doc = facilities.collect(Sections::SOCKETS, IDENTITY);
        assert_eq!(doc.sockets.runs, 9);
        assert!(doc.addresses.is_empty());
        assert_eq!(doc.systeminfo, SystemInfo::default());

        let doc = facilities.collect(Sections::NONE, IDENTITY);
        assert!(doc.is_empty());

        let doc = facilities.collect(Sections::ALL, IDENTITY);
        assert_eq!(doc.addresses.len(), 1);
        assert_eq!(doc.systeminfo.devicename, "settop");
        assert_eq!(doc.sockets.runs, 9);
    }

    #[test]
    fn test_facility_system_id_skips_zero_mac() {
        let facilities = facilities(vec![
            Adapter {
                name: "lo".to_string(),
                ..Default::default()
            },
            Adapter {
                name: "eth0".to_string(),
                mac: [0x01, 0x02, 0, 0, 0, 0],
                ipv4: vec![],
            },
        ]);

        assert_eq!(facilities.system_id(), "1122");
    }
}
