//! Discovery configuration.

use std::net::SocketAddrV4;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use peerwave_types::{DiscoveryError, Result};

/// Configuration for the discovery controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// IPv4 multicast group announcements are sent to and received on.
    #[serde(rename = "GroupAddr", default = "default_group_addr")]
    pub group_addr: String,

    /// URI advertised to peers as this device's reachable location.
    /// Supplied by the transport layer that accepts incoming connections.
    #[serde(rename = "Location", default)]
    pub location: String,

    /// Notification type emitted in outbound announcements.
    #[serde(rename = "NotificationType", default = "default_nt")]
    pub nt: String,

    /// Interval between alive announcements, in milliseconds.
    #[serde(rename = "AdvertiseIntervalMs", default = "default_advertise_interval_ms")]
    pub advertise_interval_ms: u64,

    /// Advertised cache lifetime (CACHE-CONTROL max-age), in seconds.
    #[serde(rename = "MaxAgeSecs", default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Whether peers that stop announcing are expired after their
    /// advertised max-age lapses. Disabling this leaves only explicit
    /// byebye announcements to mark peers unavailable.
    #[serde(rename = "PeerExpiry", default = "default_peer_expiry")]
    pub peer_expiry: bool,
}

fn default_group_addr() -> String {
    "239.255.255.250:1900".to_string()
}

fn default_nt() -> String {
    "urn:peerwave:discovery".to_string()
}

fn default_advertise_interval_ms() -> u64 {
    500
}

fn default_max_age_secs() -> u64 {
    1800
}

fn default_peer_expiry() -> bool {
    true
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            group_addr: default_group_addr(),
            location: String::new(),
            nt: default_nt(),
            advertise_interval_ms: default_advertise_interval_ms(),
            max_age_secs: default_max_age_secs(),
            peer_expiry: default_peer_expiry(),
        }
    }
}

impl DiscoveryConfig {
    /// Interval between alive announcements.
    pub fn advertise_interval(&self) -> Duration {
        Duration::from_millis(self.advertise_interval_ms)
    }

    /// Advertised cache lifetime.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Parse the configured multicast group address.
    pub fn group_socket_addr(&self) -> Result<SocketAddrV4> {
        let addr: SocketAddrV4 = self
            .group_addr
            .parse()
            .map_err(|e| DiscoveryError::AddressResolve(format!("{}: {}", self.group_addr, e)))?;
        if !addr.ip().is_multicast() {
            return Err(DiscoveryError::InvalidConfig(format!(
                "{} is not a multicast address",
                addr.ip()
            )));
        }
        Ok(addr)
    }
}
