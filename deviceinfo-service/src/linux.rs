//! Linux-specific counters read from procfs.

use tracing::warn;

/// Count the sockets currently tracked by the kernel (TCP and UDP, v4 and v6).
pub fn tracked_sockets() -> u32 {
    let mut count = 0usize;

    match procfs::net::tcp() {
        Ok(entries) => count += entries.len(),
        Err(e) => warn!("Failed to read /proc/net/tcp: {}", e),
    }

    if let Ok(entries) = procfs::net::tcp6() {
        count += entries.len();
    }

    match procfs::net::udp() {
        Ok(entries) => count += entries.len(),
        Err(e) => warn!("Failed to read /proc/net/udp: {}", e),
    }

    if let Ok(entries) = procfs::net::udp6() {
        count += entries.len();
    }

    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Read the systemd/dbus machine id as raw bytes.
pub fn machine_id() -> Option<Vec<u8>> {
    ["/etc/machine-id", "/var/lib/dbus/machine-id"]
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .find_map(|content| decode_hex(content.trim()))
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }

    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0a1B"), Some(vec![0x0a, 0x1b]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
        assert_eq!(decode_hex(""), None);
    }

    #[test]
    fn test_tracked_sockets() {
        // Just verify it doesn't panic (minimal containers may have none).
        let _ = tracked_sockets();
    }
}
