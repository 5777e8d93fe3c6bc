//! Multicast announcement listener.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use peerwave_ssdp::Announcement;
use peerwave_types::{DiscoveryError, PeerAvailability, PeerRecord, Result};

use crate::config::DiscoveryConfig;
use crate::filter::{classify, Classification};
use crate::identity::SessionIdentity;
use crate::notifier::Notifier;

/// How often the receive loop wakes to sweep expired peers when no
/// datagrams arrive.
const SWEEP_TICK: Duration = Duration::from_secs(1);

/// A peer as tracked internally, keyed by USN in the peer map.
struct PeerEntry {
    location: String,
    expires_at: Instant,
}

/// A running discovery listener: the multicast socket, the receive task
/// and the peer map the task maintains.
pub(crate) struct Listener {
    socket: Arc<UdpSocket>,
    group: SocketAddrV4,
    peers: Arc<RwLock<HashMap<String, PeerEntry>>>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Listener {
    /// Join the multicast group and begin receiving announcements.
    ///
    /// The identity is shared with the controller so that advertising
    /// restarts rotate the USN the filter treats as self.
    pub(crate) fn start(
        config: &DiscoveryConfig,
        identity: Arc<RwLock<SessionIdentity>>,
        notifier: Notifier,
    ) -> Result<Self> {
        let group = config.group_socket_addr()?;
        let socket = Arc::new(create_listen_socket(group).map_err(DiscoveryError::Bind)?);
        let peers = Arc::new(RwLock::new(HashMap::new()));
        let running = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(recv_loop(
            socket.clone(),
            identity,
            peers.clone(),
            notifier,
            running.clone(),
            config.peer_expiry,
        ));

        info!(group = %group, "started listening for announcements");

        Ok(Self {
            socket,
            group,
            peers,
            running,
            task,
        })
    }

    /// Abandon the receive loop, leave the group and clear the peer map.
    /// No events fire for datagrams arriving after this returns.
    pub(crate) fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        self.task.abort();
        if let Err(e) = self
            .socket
            .leave_multicast_v4(*self.group.ip(), Ipv4Addr::UNSPECIFIED)
        {
            debug!("failed to leave multicast group: {}", e);
        }
        self.peers.write().clear();
        info!("stopped listening for announcements");
    }

    /// Snapshot of the currently known peers.
    pub(crate) fn peers(&self) -> Vec<PeerRecord> {
        self.peers
            .read()
            .iter()
            .map(|(usn, entry)| PeerRecord {
                peer_identifier: usn.clone(),
                peer_location: entry.location.clone(),
                available: true,
            })
            .collect()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Create the UDP socket announcements are received on.
fn create_listen_socket(group: SocketAddrV4) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SockAddr::from(SocketAddrV4::new(
        Ipv4Addr::UNSPECIFIED,
        group.port(),
    )))?;
    socket.set_nonblocking(true)?;
    let socket = UdpSocket::from_std(socket.into())?;
    socket.join_multicast_v4(*group.ip(), Ipv4Addr::UNSPECIFIED)?;
    Ok(socket)
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    identity: Arc<RwLock<SessionIdentity>>,
    peers: Arc<RwLock<HashMap<String, PeerEntry>>>,
    notifier: Notifier,
    running: Arc<AtomicBool>,
    peer_expiry: bool,
) {
    let mut buf = [0u8; 2048];

    while running.load(Ordering::SeqCst) {
        // Wait with a timeout so expiry sweeps run even on a quiet network.
        let mut changes =
            match tokio::time::timeout(SWEEP_TICK, socket.recv_from(&mut buf)).await {
                Ok(Ok((n, from))) => handle_datagram(&buf[..n], from, &identity, &peers),
                Ok(Err(e)) => {
                    trace!("receive error: {}", e);
                    Vec::new()
                }
                Err(_) => Vec::new(),
            };

        if peer_expiry {
            changes.extend(sweep_expired(&peers));
        }

        notifier.notify(changes);
    }
}

/// Process one inbound datagram into a batch of availability changes.
/// Malformed datagrams are dropped; the loop never dies on bad input.
fn handle_datagram(
    data: &[u8],
    from: SocketAddr,
    identity: &RwLock<SessionIdentity>,
    peers: &RwLock<HashMap<String, PeerEntry>>,
) -> Vec<PeerAvailability> {
    let announcement = match Announcement::from_bytes(data) {
        Ok(a) => a,
        Err(e) => {
            trace!(%from, "dropping malformed datagram: {}", e);
            return Vec::new();
        }
    };

    match classify(announcement.usn(), &identity.read()) {
        Classification::Irrelevant => {
            trace!(usn = announcement.usn(), "ignoring unrelated announcement");
            Vec::new()
        }
        Classification::SelfOriginated => {
            trace!("ignoring own announcement echo");
            Vec::new()
        }
        Classification::Relevant => apply_announcement(announcement, peers),
    }
}

fn apply_announcement(
    announcement: Announcement,
    peers: &RwLock<HashMap<String, PeerEntry>>,
) -> Vec<PeerAvailability> {
    match announcement {
        Announcement::Alive {
            usn,
            location,
            max_age,
            ..
        } => {
            let expires_at = Instant::now() + max_age;
            let mut peers = peers.write();
            match peers.get_mut(&usn) {
                Some(entry) => {
                    entry.expires_at = expires_at;
                    if entry.location == location {
                        // Plain refresh, nothing changed.
                        return Vec::new();
                    }
                    debug!(usn = %usn, location = %location, "peer moved");
                    entry.location = location.clone();
                    vec![PeerAvailability {
                        peer_location: location,
                        peer_available: true,
                    }]
                }
                None => {
                    debug!(usn = %usn, location = %location, "peer available");
                    peers.insert(
                        usn,
                        PeerEntry {
                            location: location.clone(),
                            expires_at,
                        },
                    );
                    vec![PeerAvailability {
                        peer_location: location,
                        peer_available: true,
                    }]
                }
            }
        }
        Announcement::ByeBye { usn, .. } => match peers.write().remove(&usn) {
            Some(entry) => {
                debug!(usn = %usn, "peer said goodbye");
                vec![PeerAvailability {
                    peer_location: entry.location,
                    peer_available: false,
                }]
            }
            None => Vec::new(),
        },
    }
}

/// Remove peers whose advertised lifetime lapsed without a re-announce.
fn sweep_expired(peers: &RwLock<HashMap<String, PeerEntry>>) -> Vec<PeerAvailability> {
    let now = Instant::now();
    let mut changes = Vec::new();
    peers.write().retain(|usn, entry| {
        if entry.expires_at > now {
            return true;
        }
        debug!(usn = %usn, "peer expired");
        changes.push(PeerAvailability {
            peer_location: entry.location.clone(),
            peer_available: false,
        });
        false
    });
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: &str = "testDeviceName";

    fn test_identity() -> RwLock<SessionIdentity> {
        RwLock::new(SessionIdentity::generate(DEVICE))
    }

    fn alive(usn: &str, location: &str, max_age: Duration) -> Vec<u8> {
        Announcement::Alive {
            nt: "urn:peerwave:discovery".to_string(),
            usn: usn.to_string(),
            location: location.to_string(),
            max_age,
        }
        .to_bytes("239.255.255.250:1900")
    }

    fn byebye(usn: &str) -> Vec<u8> {
        Announcement::ByeBye {
            nt: "urn:peerwave:discovery".to_string(),
            usn: usn.to_string(),
        }
        .to_bytes("239.255.255.250:1900")
    }

    fn from_addr() -> SocketAddr {
        "192.168.1.23:1900".parse().unwrap()
    }

    #[test]
    fn test_new_peer_becomes_available() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        let changes = handle_datagram(
            &alive(&usn, "http://foo.bar/baz", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );

        assert_eq!(
            changes,
            vec![PeerAvailability {
                peer_location: "http://foo.bar/baz".to_string(),
                peer_available: true,
            }]
        );
        assert!(peers.read().contains_key(&usn));
    }

    #[test]
    fn test_reannounce_with_same_location_is_quiet() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());
        let datagram = alive(&usn, "http://foo.bar/baz", Duration::from_secs(60));

        let first = handle_datagram(&datagram, from_addr(), &identity, &peers);
        let second = handle_datagram(&datagram, from_addr(), &identity, &peers);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(peers.read().len(), 1);
    }

    #[test]
    fn test_moved_peer_reemits_availability() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        handle_datagram(
            &alive(&usn, "http://foo.bar/baz", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );
        let changes = handle_datagram(
            &alive(&usn, "http://foo.bar/moved", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );

        assert_eq!(
            changes,
            vec![PeerAvailability {
                peer_location: "http://foo.bar/moved".to_string(),
                peer_available: true,
            }]
        );
        assert_eq!(peers.read().get(&usn).unwrap().location, "http://foo.bar/moved");
    }

    #[test]
    fn test_byebye_removes_peer() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        handle_datagram(
            &alive(&usn, "http://foo.bar/baz", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );
        let changes = handle_datagram(&byebye(&usn), from_addr(), &identity, &peers);

        assert_eq!(
            changes,
            vec![PeerAvailability {
                peer_location: "http://foo.bar/baz".to_string(),
                peer_available: false,
            }]
        );
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_byebye_for_unknown_peer_is_quiet() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        let changes = handle_datagram(&byebye(&usn), from_addr(), &identity, &peers);

        assert!(changes.is_empty());
    }

    #[test]
    fn test_malformed_datagram_is_dropped() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());

        let changes = handle_datagram(b"definitely not ssdp", from_addr(), &identity, &peers);

        assert!(changes.is_empty());
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_own_echo_is_filtered() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = identity.read().usn();

        let changes = handle_datagram(
            &alive(&usn, "http://foo.bar/self", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );

        assert!(changes.is_empty());
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_stale_own_echo_after_rotation_is_filtered() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        // An advertising restart rotates the suffix while a datagram
        // carrying the old USN is still in flight.
        let stale_usn = identity.read().usn();
        identity.write().rotate();

        let changes = handle_datagram(
            &alive(&stale_usn, "http://foo.bar/self", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );

        assert!(changes.is_empty());
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_unrelated_announcement_is_filtered() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());

        let changes = handle_datagram(
            &alive("uuid:some-upnp-device", "http://foo.bar/upnp", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );

        assert!(changes.is_empty());
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_expired_peer_is_swept() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        handle_datagram(
            &alive(&usn, "http://foo.bar/baz", Duration::from_secs(0)),
            from_addr(),
            &identity,
            &peers,
        );
        let changes = sweep_expired(&peers);

        assert_eq!(
            changes,
            vec![PeerAvailability {
                peer_location: "http://foo.bar/baz".to_string(),
                peer_available: false,
            }]
        );
        assert!(peers.read().is_empty());
    }

    #[test]
    fn test_fresh_peer_survives_sweep() {
        let identity = test_identity();
        let peers = RwLock::new(HashMap::new());
        let usn = format!("somePeerDeviceName:{}", identity.read().discovery_token());

        handle_datagram(
            &alive(&usn, "http://foo.bar/baz", Duration::from_secs(60)),
            from_addr(),
            &identity,
            &peers,
        );
        let changes = sweep_expired(&peers);

        assert!(changes.is_empty());
        assert_eq!(peers.read().len(), 1);
    }
}
