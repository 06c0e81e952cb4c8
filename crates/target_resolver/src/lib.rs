//! Target Resolver - target validation and host resolution
//!
//! Scan targets arrive as user-supplied strings. Before any job is created
//! they must be an absolute `http`/`https` URL naming a public host:
//! - scheme must be http or https
//! - domain names need at least one dot ("intranet" is rejected)
//! - loopback, private and link-local IP literals are rejected
//! - `localhost` is rejected

use ipnet::IpNet;
use std::net::{IpAddr, ToSocketAddrs};
use titan_common::{ScanTarget, TitanError, TitanResult};
use tracing::debug;
use url::{Host, Url};

const BLOCKED_NETS: [&str; 8] = [
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "169.254.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

pub struct TargetResolver;

impl TargetResolver {
    pub fn new() -> Self { Self }

    /// Validate a raw target string into a [`ScanTarget`].
    pub fn validate(target: &str) -> TitanResult<ScanTarget> {
        let raw = target.trim();
        if raw.is_empty() {
            return Err(TitanError::Validation("Target URL is required".to_string()));
        }

        let invalid_format = || {
            TitanError::Validation(
                "Invalid URL format. URL must start with http:// or https://".to_string(),
            )
        };

        let url = Url::parse(raw).map_err(|_| invalid_format())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_format());
        }

        match url.host() {
            None => return Err(invalid_format()),
            Some(Host::Domain(domain)) => {
                if domain.eq_ignore_ascii_case("localhost") {
                    return Err(private_network());
                }
                let labels: Vec<&str> = domain.trim_end_matches('.').split('.').collect();
                if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
                    return Err(invalid_format());
                }
            }
            Some(Host::Ipv4(ip)) => {
                if is_blocked(IpAddr::V4(ip)) {
                    return Err(private_network());
                }
            }
            Some(Host::Ipv6(ip)) => {
                if is_blocked(IpAddr::V6(ip)) {
                    return Err(private_network());
                }
            }
        }

        Ok(ScanTarget::new(raw, url))
    }

    /// Resolve a target's host to a single IP, preferring IPv4.
    /// DNS lookups run inside `spawn_blocking` to keep the runtime free.
    pub async fn resolve_host(target: &ScanTarget) -> TitanResult<IpAddr> {
        let host = target.host().trim_start_matches('[').trim_end_matches(']').to_string();
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let lookup = host.clone();
        let addrs: Vec<IpAddr> = tokio::task::spawn_blocking(move || {
            match (lookup.as_str(), 0).to_socket_addrs() {
                Ok(addrs) => addrs.map(|a| a.ip()).collect(),
                Err(_) => Vec::new(),
            }
        })
        .await
        .map_err(|e| TitanError::Io(std::io::Error::other(e)))?;

        let ip = addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
            .ok_or_else(|| TitanError::Validation(format!("Could not resolve host {}", host)))?;
        debug!(%host, %ip, "resolved target host");
        Ok(ip)
    }
}

impl Default for TargetResolver { fn default() -> Self { Self::new() } }

fn private_network() -> TitanError {
    TitanError::Validation("Scanning local or private networks is not allowed".to_string())
}

fn is_blocked(ip: IpAddr) -> bool {
    BLOCKED_NETS
        .iter()
        .filter_map(|n| n.parse::<IpNet>().ok())
        .any(|net| net.contains(&ip))
}
