//! SSRF (Server-Side Request Forgery) checks for submitted source URLs.
//!
//! Sources are user-supplied, so the relay refuses to fetch from private or
//! internal hosts unless explicitly allowed.

use reqwest::Url;
use std::net::{IpAddr, Ipv6Addr};
use tokio::net::lookup_host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRejection {
    /// Private, loopback or otherwise internal, or outside the allowlist
    Forbidden(String),
    /// DNS lookup failed
    Unresolvable(String),
}

/// Validate `url`'s host before any request is issued.
///
/// Resolves the hostname and checks every resolved address, so names that
/// point at internal addresses are rejected too.
pub async fn check_source_host(
    url: &Url,
    allow_private_ips: bool,
    allowlist: Option<&[String]>,
) -> Result<(), HostRejection> {
    let host = url
        .host_str()
        .ok_or_else(|| HostRejection::Forbidden("URL must have a host".to_string()))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host_lower = host.to_lowercase();

    if let Some(allowed_domains) = allowlist {
        let is_allowed = allowed_domains.iter().any(|allowed| {
            let allowed_lower = allowed.to_lowercase();
            // Exact match or subdomain match (e.g., cdn.example.com matches example.com)
            host_lower == allowed_lower || host_lower.ends_with(&format!(".{}", allowed_lower))
        });

        if !is_allowed {
            return Err(HostRejection::Forbidden(format!(
                "URL hostname '{}' is not in the allowed list",
                host
            )));
        }
    }

    if allow_private_ips {
        return Ok(());
    }

    if is_internal_host_literal(&host_lower) {
        return Err(HostRejection::Forbidden(
            "Private, localhost and internal hosts are not allowed".to_string(),
        ));
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let resolved = lookup_host((host, port)).await.map_err(|e| {
        tracing::warn!(host = %host, error = %e, "DNS resolution failed for source host");
        HostRejection::Unresolvable(e.to_string())
    })?;

    for socket_addr in resolved {
        let ip = socket_addr.ip();
        if is_private_ip(&ip) {
            return Err(HostRejection::Forbidden(format!(
                "Hostname resolves to private/internal IP address: {}",
                ip
            )));
        }
    }

    Ok(())
}

/// Host check that needs no DNS: IP literals and well-known internal names.
pub fn is_internal_host_literal(host: &str) -> bool {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return is_private_ip(&ip);
    }

    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host.ends_with(".corp")
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            octets[0] == 10
                || (octets[0] == 172 && octets[1] >= 16 && octets[1] <= 31)
                || (octets[0] == 192 && octets[1] == 168)
                || octets[0] == 127
                || (octets[0] == 169 && octets[1] == 254)
                || (octets[0] == 100 && (64..=127).contains(&octets[1])) // carrier-grade NAT
                || (224..=239).contains(&octets[0])
                || octets[0] == 0
        }
        IpAddr::V6(ipv6) => {
            // IPv4-mapped addresses (::ffff:x.x.x.x) would bypass the V4 checks
            if let Some(ipv4) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(ipv4));
            }
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                || ipv6.is_multicast()
                || is_ipv6_link_local(ipv6)
                || is_ipv6_unique_local(ipv6)
        }
    }
}

fn is_ipv6_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

fn is_ipv6_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
