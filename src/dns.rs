use dns_lookup::lookup_host;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::PingError;

pub async fn resolve_hostname(hostname: &str) -> Result<Ipv4Addr, PingError> {
    let unresolved = |reason: String| PingError::HostResolution {
        host: hostname.to_string(),
        reason,
    };

    // First try to parse as IP address
    match hostname.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(ip),
        Ok(IpAddr::V6(_)) => return Err(unresolved("IPv6 is not supported".to_string())),
        Err(_) => {}
    }

    let addresses = tokio::task::spawn_blocking({
        let hostname = hostname.to_string();
        move || lookup_host(&hostname)
    })
    .await
    .map_err(|e| unresolved(e.to_string()))?
    .map_err(|e| unresolved(e.to_string()))?;

    log::debug!("{} resolved to {:?}", hostname, addresses);

    addresses
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| unresolved("no IPv4 address found".to_string()))
}
