//! Shared encoding, hostname, and address-classification utilities.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use base64::Engine;

/// Format bytes as lowercase hex with leading zeros stripped, keeping at
/// least one digit (matches the serial column format of the CSV report).
pub fn hex_lower_minimal(bytes: &[u8]) -> String {
    let encoded = hex::encode(bytes);
    let trimmed = encoded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Encode bytes as base64 with PEM-style 64-character line wrapping.
pub fn base64_wrap(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    // Base64 output is always valid ASCII, so we can chunk the string directly.
    let num_lines = encoded.len().div_ceil(64);
    let mut result = String::with_capacity(encoded.len() + num_lines);
    let mut pos = 0;
    while pos < encoded.len() {
        if pos > 0 {
            result.push('\n');
        }
        let end = (pos + 64).min(encoded.len());
        result.push_str(&encoded[pos..end]);
        pos = end;
    }
    result
}

/// Detect whether input bytes are PEM-encoded.
///
/// Returns `true` if the input starts with `-----BEGIN` (after stripping
/// leading whitespace).
pub fn is_pem(input: &[u8]) -> bool {
    input
        .iter()
        .skip_while(|b| b.is_ascii_whitespace())
        .take(10)
        .eq(b"-----BEGIN".iter())
}

/// Syntactic validity of a DNS name per RFC 1035 preferred name syntax,
/// with the leading wildcard label tolerated (wildcard placement rules are
/// enforced separately).
pub fn valid_dns_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    let name = name.strip_prefix("*.").unwrap_or(name);
    if name.is_empty() {
        return false;
    }
    for label in name.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            return false;
        }
        if label.starts_with('-') || label.ends_with('-') {
            return false;
        }
    }
    true
}

/// Whether a DNS name is internal: not resolvable on the public Internet.
///
/// Single-label hosts and names under reserved suffixes (RFC 6762 `.local`,
/// common intranet conventions) cannot appear in publicly-trusted
/// certificates per CABF BR 7.1.4.2.1.
pub fn is_internal_name(name: &str) -> bool {
    let name = name.trim_end_matches('.');
    let name = name.strip_prefix("*.").unwrap_or(name);
    if !name.contains('.') {
        return true;
    }
    const RESERVED_SUFFIXES: &[&str] = &[
        ".local", ".localhost", ".internal", ".intranet", ".lan", ".corp", ".home", ".test",
        ".example", ".invalid",
    ];
    let lower = name.to_ascii_lowercase();
    RESERVED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Whether an IP address falls in a reserved or private range and therefore
/// must not appear in a publicly-trusted certificate's SAN.
pub fn is_reserved_ip(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_reserved_ipv4(v4),
        IpAddr::V6(v6) => is_reserved_ipv6(v6),
    }
}

fn is_reserved_ipv4(addr: &Ipv4Addr) -> bool {
    let octets = addr.octets();
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_unspecified()
        || addr.is_multicast()
        || octets[0] == 0
        // 100.64.0.0/10 carrier-grade NAT (RFC 6598)
        || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
        // 198.18.0.0/15 benchmarking (RFC 2544)
        || (octets[0] == 198 && (octets[1] & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || octets[0] >= 240
}

fn is_reserved_ipv6(addr: &Ipv6Addr) -> bool {
    let seg = addr.segments();
    addr.is_loopback()
        || addr.is_unspecified()
        || addr.is_multicast()
        // fc00::/7 unique local
        || (seg[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (seg[0] & 0xffc0) == 0xfe80
        // 2001:db8::/32 documentation
        || (seg[0] == 0x2001 && seg[1] == 0x0db8)
}

/// Multi-label public suffixes a wildcard must never cover. A full Public
/// Suffix List lookup is overkill for linting; this table covers the
/// registry-controlled second-level domains seen in practice, and any
/// single-label name is a public suffix by definition.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "ac.uk", "co.uk", "gov.uk", "ltd.uk", "me.uk", "net.uk", "org.uk", "plc.uk", "sch.uk",
    "com.au", "net.au", "org.au", "edu.au", "gov.au", "asn.au", "id.au",
    "co.nz", "net.nz", "org.nz", "govt.nz", "ac.nz",
    "ac.jp", "co.jp", "go.jp", "ne.jp", "or.jp",
    "co.kr", "or.kr", "go.kr",
    "com.br", "net.br", "org.br", "gov.br",
    "com.cn", "net.cn", "org.cn", "gov.cn", "edu.cn",
    "com.mx", "org.mx", "gob.mx",
    "com.tr", "org.tr", "gov.tr",
    "co.za", "org.za", "gov.za",
    "co.in", "net.in", "org.in", "gov.in", "ac.in",
    "com.sg", "org.sg", "gov.sg",
    "com.hk", "org.hk", "gov.hk",
    "com.tw", "org.tw", "gov.tw",
    "com.ar", "com.co", "com.my", "com.ph", "com.pl", "com.ru", "com.ua", "com.vn",
];

/// Whether `domain` is a public suffix: a bare TLD or a registry-controlled
/// second-level domain.
pub fn is_public_suffix(domain: &str) -> bool {
    let lower = domain.trim_end_matches('.').to_ascii_lowercase();
    if !lower.contains('.') {
        return true;
    }
    MULTI_LABEL_SUFFIXES.iter().any(|s| *s == lower)
}

/// RFC 6125 hostname matching with wildcard support.
///
/// Checks for exact match or wildcard match (e.g., `*.example.com` matches
/// `sub.example.com` but not `deep.sub.example.com` or `example.com`).
pub fn hostname_matches(pattern: &str, hostname: &str) -> bool {
    let pattern_lower = pattern.to_ascii_lowercase();

    if pattern_lower == *hostname {
        return true;
    }

    if let Some(suffix) = pattern_lower.strip_prefix("*.") {
        if let Some(rest) = hostname.strip_suffix(suffix) {
            // rest should be "label." (a single label followed by a dot)
            if let Some(label) = rest.strip_suffix('.') {
                if !label.is_empty() && !label.contains('.') {
                    return true;
                }
            }
        }
    }

    false
}
