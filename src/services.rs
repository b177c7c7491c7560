/// Name attached to open ports that have no entry in the table.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Well-known TCP ports and the service typically found there.
/// This is a heuristic label, not a fingerprint.
const COMMON_PORTS: &[(u16, &str)] = &[
    (20, "FTP-DATA"),
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (143, "IMAP"),
    (443, "HTTPS"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (8080, "HTTP-Proxy"),
];

/// Look up the service name for a port, if it is a known one.
pub fn lookup(port: u16) -> Option<&'static str> {
    COMMON_PORTS
        .binary_search_by_key(&port, |&(p, _)| p)
        .ok()
        .map(|idx| COMMON_PORTS[idx].1)
}

/// Service name for a port, falling back to [`UNKNOWN_SERVICE`].
pub fn service_name(port: u16) -> &'static str {
    lookup(port).unwrap_or(UNKNOWN_SERVICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        assert!(COMMON_PORTS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn known_ports_resolve() {
        assert_eq!(lookup(21), Some("FTP"));
        assert_eq!(lookup(22), Some("SSH"));
        assert_eq!(lookup(8080), Some("HTTP-Proxy"));
    }

    #[test]
    fn unknown_port_uses_sentinel() {
        assert_eq!(lookup(31337), None);
        assert_eq!(service_name(31337), UNKNOWN_SERVICE);
    }
}
