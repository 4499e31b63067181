//! Client trust resolution
//!
//! Every datagram's source address must map to a shared secret before
//! the packet is even parsed. Switch addresses in an orchestrated
//! deployment are not all known at startup: service discovery entries
//! appear late and change, so hostname entries are resolved lazily at
//! request time and successful resolutions are promoted into the
//! exact-address cache. The cache is append-only during steady-state
//! operation.

use crate::config::{ClientSpec, Config};
use dashmap::DashMap;
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Private and loopback ranges trusted when `RADIUS_ALLOW_LOCAL_SUBNET`
/// is enabled, so intra-deployment traffic (admin console, health
/// probes) needs no explicit client entry.
const LOCAL_RANGES: &[&str] = &[
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "127.0.0.0/8",
    "fc00::/7",
    "::1/128",
];

struct HostnameEntry {
    name: String,
    secret: Arc<[u8]>,
}

/// Resolves request source addresses to shared secrets
pub struct TrustResolver {
    /// Exact addresses, configured or promoted from hostname lookups
    exact: DashMap<IpAddr, Arc<[u8]>>,
    networks: Vec<(IpNetwork, Arc<[u8]>)>,
    hostnames: Vec<HostnameEntry>,
    wildcard: Option<Arc<[u8]>>,
}

impl TrustResolver {
    /// Build the resolver from configuration
    pub fn from_config(config: &Config) -> Self {
        let default_secret: Arc<[u8]> = Arc::from(config.secret.as_bytes());

        let exact = DashMap::new();
        let mut networks = Vec::new();
        let mut hostnames = Vec::new();
        let mut wildcard = None;

        for spec in &config.allowed_clients {
            match spec {
                ClientSpec::Exact { addr, secret } => {
                    exact.insert(*addr, Arc::from(secret.as_bytes()));
                }
                ClientSpec::Network { network, secret } => {
                    networks.push((*network, Arc::from(secret.as_bytes())));
                }
                ClientSpec::Hostname { name, secret } => {
                    hostnames.push(HostnameEntry {
                        name: name.clone(),
                        secret: Arc::from(secret.as_bytes()),
                    });
                }
                ClientSpec::Wildcard { secret } => {
                    wildcard = Some(Arc::from(secret.as_bytes()));
                }
            }
        }

        if config.allow_local_subnet {
            for range in LOCAL_RANGES {
                // The list is static and well-formed
                if let Ok(network) = range.parse::<IpNetwork>() {
                    networks.push((network, Arc::clone(&default_secret)));
                }
            }
            for network in detect_attached_networks() {
                debug!(%network, "Trusting directly attached network");
                networks.push((network, Arc::clone(&default_secret)));
            }
        }

        TrustResolver {
            exact,
            networks,
            hostnames,
            wildcard,
        }
    }

    /// Resolve a source address to its shared secret
    ///
    /// Lookup order, first match wins: exact cache, CIDR networks,
    /// lazy hostnames (with promotion into the exact cache), wildcard.
    /// `None` means the source is untrusted and the datagram must be
    /// dropped without a reply.
    pub async fn resolve(&self, source: IpAddr) -> Option<Arc<[u8]>> {
        if let Some(secret) = self.exact.get(&source) {
            return Some(Arc::clone(&secret));
        }

        for (network, secret) in &self.networks {
            if network.contains(source) {
                return Some(Arc::clone(secret));
            }
        }

        for entry in &self.hostnames {
            let mut matched = false;
            for addr in resolve_hostname(&entry.name).await {
                // entry() rather than insert() so an address resolved by
                // an earlier entry keeps its original secret
                self.exact
                    .entry(addr)
                    .or_insert_with(|| Arc::clone(&entry.secret));
                if addr == source {
                    matched = true;
                }
            }
            if matched {
                debug!(host = %entry.name, %source, "Promoted hostname resolution into trust cache");
                return Some(Arc::clone(&entry.secret));
            }
        }

        self.wildcard.as_ref().map(Arc::clone)
    }

    /// Number of exact-address entries currently cached
    pub fn cached_addresses(&self) -> usize {
        self.exact.len()
    }
}

/// Resolve a hostname to its current set of addresses
///
/// Tries the plain name and the Docker Swarm `tasks.` form, which
/// returns one address per replica of a service. Resolution failure is
/// normal while a service is still starting, so it only logs at debug.
async fn resolve_hostname(name: &str) -> Vec<IpAddr> {
    let mut addrs = Vec::new();
    for candidate in [name.to_string(), format!("tasks.{name}")] {
        match tokio::net::lookup_host((candidate.as_str(), 0)).await {
            Ok(resolved) => addrs.extend(resolved.map(|sa| sa.ip())),
            Err(e) => debug!(host = %candidate, error = %e, "Hostname not resolvable yet"),
        }
    }
    addrs.sort_unstable();
    addrs.dedup();
    addrs
}

/// Best-effort detection of the directly attached IPv4 network
///
/// A connected UDP socket never sends a packet; it only asks the
/// kernel which local address would route there. The /24 around that
/// address approximates the attached subnet.
fn detect_attached_networks() -> Vec<IpNetwork> {
    let mut networks = Vec::new();
    match local_source_addr() {
        Ok(IpAddr::V4(v4)) => {
            let octets = v4.octets();
            let base = IpAddr::from([octets[0], octets[1], octets[2], 0]);
            if let Ok(network) = IpNetwork::new(base, 24) {
                networks.push(network);
            }
        }
        Ok(IpAddr::V6(_)) => {}
        Err(e) => warn!(error = %e, "Could not detect attached network"),
    }
    networks
}

fn local_source_addr() -> std::io::Result<IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}
