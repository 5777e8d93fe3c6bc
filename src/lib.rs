//! Local-network WiFi peer discovery.
//!
//! This crate ties the peerwave discovery stack together: a device
//! advertises its own presence on the local network and listens for other
//! devices' announcements, surfacing a filtered stream of peer
//! availability events that a transport layer can act on.

// Re-export the public surface of the member crates
pub use peerwave_discovery::{
    classify, Classification, DiscoveryConfig, SessionIdentity, WifiDiscovery,
};
pub use peerwave_ssdp::Announcement;
pub use peerwave_types::{
    DiscoveryError, DiscoveryEvent, ParseError, PeerAvailability, PeerRecord,
};
