//! WiFi local-network peer discovery.
//!
//! This crate implements the multicast announcement-based peer discovery
//! mechanism used by peerwave to find other devices on the same WiFi
//! network: a device periodically advertises its own presence and
//! simultaneously listens for other devices' announcements, producing a
//! de-duplicated stream of peer availability events.

mod advertiser;
mod config;
mod controller;
mod filter;
mod identity;
mod listener;
mod notifier;

pub use config::DiscoveryConfig;
pub use controller::WifiDiscovery;
pub use filter::{classify, Classification};
pub use identity::SessionIdentity;
