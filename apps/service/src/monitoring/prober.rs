use async_trait::async_trait;
use std::io;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence, SurgeError};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::types::ProbeFailure;

/// Executes one echo exchange against one address
#[async_trait]
pub trait Prober: Send + Sync {
    /// Send an echo request carrying `payload_size` bytes and wait up to
    /// `timeout` for the matching reply. Returns the round-trip time.
    async fn probe(
        &self,
        address: &str,
        payload_size: usize,
        timeout: Duration,
    ) -> Result<Duration, ProbeFailure>;
}

/// ICMP echo prober sharing one socket per address family.
///
/// Each call uses a random identifier and the next value of a shared
/// sequence counter, so concurrent probes through the same socket never
/// claim each other's replies.
pub struct IcmpProber {
    v4: Client,
    v6: Option<Client>,
    sequence: AtomicU16,
}

impl IcmpProber {
    /// Open the ICMP sockets. Needs raw-socket privileges or an unprivileged
    /// ICMP datagram socket allowed by `net.ipv4.ping_group_range`.
    pub fn new() -> io::Result<Self> {
        let v4 = Client::new(&Config::default())?;
        let v6 = match Client::new(&Config::builder().kind(ICMP::V6).build()) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "IPv6 ICMP socket unavailable, IPv6 targets will fail");
                None
            }
        };

        Ok(Self { v4, v6, sequence: AtomicU16::new(0) })
    }

    fn client_for(&self, ip: IpAddr) -> Option<&Client> {
        match ip {
            IpAddr::V4(_) => Some(&self.v4),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

impl std::fmt::Debug for IcmpProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpProber").field("ipv6", &self.v6.is_some()).finish_non_exhaustive()
    }
}

/// Resolve hostname to IP address.
pub async fn resolve_host(host: &str) -> Result<IpAddr, io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
}

/// Deterministic echo payload of exactly `size` bytes
pub fn echo_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Map a socket error onto the failure taxonomy
pub fn classify_io_error(error: &io::Error) -> ProbeFailure {
    match error.kind() {
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => ProbeFailure::Unreachable,
        io::ErrorKind::TimedOut => ProbeFailure::Timeout,
        _ => ProbeFailure::SendError,
    }
}

const ICMPV4_ECHO_REPLY: u8 = 0;
const ICMPV4_DESTINATION_UNREACHABLE: u8 = 3;
const ICMPV6_DESTINATION_UNREACHABLE: u8 = 1;
const ICMPV6_ECHO_REPLY: u8 = 129;

/// Map the ICMP message type of a matched reply onto the failure taxonomy.
/// Only an echo reply counts as success.
pub fn classify_reply(family: ICMP, icmp_type: u8) -> Result<(), ProbeFailure> {
    match (family, icmp_type) {
        (ICMP::V4, ICMPV4_ECHO_REPLY) | (ICMP::V6, ICMPV6_ECHO_REPLY) => Ok(()),
        (ICMP::V4, ICMPV4_DESTINATION_UNREACHABLE) | (ICMP::V6, ICMPV6_DESTINATION_UNREACHABLE) => {
            Err(ProbeFailure::Unreachable)
        }
        _ => Err(ProbeFailure::SendError),
    }
}

fn reply_type(packet: &IcmpPacket) -> (ICMP, u8) {
    match packet {
        IcmpPacket::V4(packet) => (ICMP::V4, packet.get_icmp_type().0),
        IcmpPacket::V6(packet) => (ICMP::V6, packet.get_icmpv6_type().0),
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(
        &self,
        address: &str,
        payload_size: usize,
        probe_timeout: Duration,
    ) -> Result<Duration, ProbeFailure> {
        let ip = resolve_host(address).await.map_err(|e| {
            debug!(address = %address, error = %e, "Failed to resolve address");
            ProbeFailure::ResolutionFailure
        })?;

        let client = self.client_for(ip).ok_or(ProbeFailure::SendError)?;
        let mut pinger = client.pinger(ip, PingIdentifier(rand::random())).await;
        pinger.timeout(probe_timeout);

        let payload = echo_payload(payload_size);
        let sequence = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));

        match timeout(probe_timeout, pinger.ping(sequence, &payload)).await {
            Ok(Ok((packet, rtt))) => {
                let (family, icmp_type) = reply_type(&packet);
                classify_reply(family, icmp_type).inspect_err(|reason| {
                    debug!(address = %address, icmp_type, reason = %reason, "Reply was not an echo reply");
                })?;
                Ok(rtt)
            }
            Ok(Err(SurgeError::Timeout { .. })) | Err(_) => Err(ProbeFailure::Timeout),
            Ok(Err(SurgeError::IOError(e))) => {
                debug!(address = %address, error = %e, "Echo request failed");
                Err(classify_io_error(&e))
            }
            Ok(Err(e)) => {
                debug!(address = %address, error = %e, "Echo request failed");
                Err(ProbeFailure::SendError)
            }
        }
    }
}
