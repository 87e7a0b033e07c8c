//! Host facilities backed by the local operating system.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use sysinfo::{Networks, System};

use crate::collector::Facilities;
use crate::host::{Adapter, AdapterEnumeration, ResourceCount, SystemStats};

/// System statistics from `sysinfo`.
pub struct HostStats {
    system: Mutex<System>,
}

impl HostStats {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        // Prime the CPU counters so the first reading has a baseline.
        system.refresh_cpu_usage();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for HostStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStats for HostStats {
    fn uptime(&self) -> u64 {
        System::uptime()
    }

    fn free_ram(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.free_memory()
    }

    fn total_ram(&self) -> u64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        system.total_memory()
    }

    fn host_name(&self) -> String {
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_default()
    }

    fn cpu_load(&self) -> u32 {
        let mut system = self.system.lock();
        system.refresh_cpu_usage();
        system.global_cpu_usage().round().clamp(0.0, 100.0) as u32
    }

    fn raw_device_id(&self) -> Vec<u8> {
        #[cfg(target_os = "linux")]
        {
            crate::linux::machine_id().unwrap_or_default()
        }
        #[cfg(not(target_os = "linux"))]
        {
            Vec::new()
        }
    }
}

/// Network adapters from `sysinfo`, ordered by name.
pub struct HostAdapters {
    networks: Mutex<Networks>,
}

impl HostAdapters {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for HostAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterEnumeration for HostAdapters {
    fn adapters(&self) -> Vec<Adapter> {
        let mut networks = self.networks.lock();
        networks.refresh(true);

        let mut adapters: Vec<Adapter> = networks
            .list()
            .iter()
            .map(|(name, data)| Adapter {
                name: name.clone(),
                mac: data.mac_address().0,
                ipv4: data
                    .ip_networks()
                    .iter()
                    .filter_map(|network| match network.addr {
                        IpAddr::V4(addr) => Some(addr),
                        IpAddr::V6(_) => None,
                    })
                    .collect(),
            })
            .collect();

        adapters.sort_by(|a, b| a.name.cmp(&b.name));
        adapters
    }
}

/// Socket counters from the kernel.
#[derive(Debug, Default)]
pub struct SocketMonitor;

impl ResourceCount for SocketMonitor {
    fn runs(&self) -> u32 {
        #[cfg(target_os = "linux")]
        {
            crate::linux::tracked_sockets()
        }
        #[cfg(not(target_os = "linux"))]
        {
            0
        }
    }
}

/// Facilities for the machine this process runs on.
pub fn host_facilities() -> Facilities {
    Facilities::new(
        Arc::new(HostStats::new()),
        Arc::new(HostAdapters::new()),
        Arc::new(SocketMonitor),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_stats() {
        let stats = HostStats::new();
        assert!(stats.total_ram() >= stats.free_ram());
        assert!(stats.cpu_load() <= 100);
    }

    #[test]
    fn test_host_adapters_sorted() {
        let adapters = HostAdapters::new().adapters();
        let names: Vec<_> = adapters.iter().map(|a| a.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
