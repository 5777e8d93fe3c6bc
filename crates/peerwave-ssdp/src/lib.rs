//! SSDP-style announcement codec for peerwave discovery.
//!
//! Peers announce themselves with HTTP-over-UDP NOTIFY messages carrying
//! a USN, a reachable location and a cache lifetime. This crate owns the
//! wire format: serialization of outbound announcements and a strict,
//! fail-closed parser for inbound datagrams.

mod message;

pub use message::{Announcement, NTS_ALIVE, NTS_BYEBYE};
