//! Peer records and availability events.

/// A peer currently known to the discovery listener.
///
/// Uniquely keyed by `peer_identifier` (the peer's wire USN). The record
/// set is owned by the listener; snapshots handed out are owned copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Wire identifier (USN) of the peer.
    pub peer_identifier: String,
    /// URI the peer can be reached at.
    pub peer_location: String,
    /// Whether the peer is currently reachable.
    pub available: bool,
}

/// One availability change, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAvailability {
    /// URI the peer can be reached at.
    pub peer_location: String,
    /// Whether the peer became available or disappeared.
    pub peer_available: bool,
}

/// Event emitted by the discovery controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// One or more peers changed availability in a single listener pass.
    /// The batch carries exactly the changes of that pass, never a full
    /// resync of unrelated peers.
    PeerAvailabilityChanged(Vec<PeerAvailability>),
}
