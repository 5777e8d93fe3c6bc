//! Periodic advertisement emission.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use peerwave_ssdp::Announcement;
use peerwave_types::{DiscoveryError, Result};

use crate::config::DiscoveryConfig;

/// A running advertisement session: a bound send socket plus the task
/// emitting one alive announcement per tick.
pub(crate) struct Advertiser {
    socket: Arc<UdpSocket>,
    group: SocketAddrV4,
    usn: String,
    nt: String,
    task: JoinHandle<()>,
}

impl Advertiser {
    /// Bind a send socket and begin periodic alive announcements under
    /// the given USN. The socket is released on every failure path.
    pub(crate) fn start(config: &DiscoveryConfig, usn: String) -> Result<Self> {
        let group = config.group_socket_addr()?;
        let socket = Arc::new(create_send_socket().map_err(DiscoveryError::Bind)?);

        let alive = Announcement::Alive {
            nt: config.nt.clone(),
            usn: usn.clone(),
            location: config.location.clone(),
            max_age: config.max_age(),
        };
        let datagram = alive.to_bytes(&config.group_addr);

        let task = tokio::spawn(announce_loop(
            socket.clone(),
            group,
            datagram,
            config.advertise_interval(),
        ));

        info!(usn = %usn, group = %group, "started advertising");

        Ok(Self {
            socket,
            group,
            usn,
            nt: config.nt.clone(),
            task,
        })
    }

    /// Cancel the announcement timer and say goodbye. The byebye is
    /// best-effort; the socket is released on return.
    pub(crate) async fn stop(self) {
        self.task.abort();

        let byebye = Announcement::ByeBye {
            nt: self.nt.clone(),
            usn: self.usn.clone(),
        };
        let host = self.group.to_string();
        if let Err(e) = self
            .socket
            .send_to(&byebye.to_bytes(&host), SocketAddr::V4(self.group))
            .await
        {
            debug!("failed to send byebye announcement: {}", e);
        }

        info!(usn = %self.usn, "stopped advertising");
    }
}

impl Drop for Advertiser {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Create the UDP socket announcements are sent from.
fn create_send_socket() -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)))?;
    socket.set_multicast_loop_v4(true)?;
    socket.set_multicast_ttl_v4(2)?;
    socket.set_nonblocking(true)?;
    UdpSocket::from_std(socket.into())
}

async fn announce_loop(
    socket: Arc<UdpSocket>,
    group: SocketAddrV4,
    datagram: Vec<u8>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = socket.send_to(&datagram, SocketAddr::V4(group)).await {
            trace!("failed to send alive announcement: {}", e);
        } else {
            trace!(group = %group, "sent alive announcement");
        }
    }
}
