//! Discovery lifecycle controller.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;

use peerwave_types::{DiscoveryEvent, PeerRecord, Result};

use crate::advertiser::Advertiser;
use crate::config::DiscoveryConfig;
use crate::identity::SessionIdentity;
use crate::listener::Listener;
use crate::notifier::Notifier;

/// WiFi peer discovery controller.
///
/// Ties the advertiser and listener together behind independent,
/// idempotent start/stop operations. Each capability is either stopped or
/// running; its slot sits behind a `tokio::sync::Mutex`, so concurrent
/// start/stop calls on the same capability serialize and coalesce into
/// the idempotent behavior instead of racing the bind.
///
/// All per-instance resources (sockets, tasks, peer map) live inside this
/// struct and its capability handles; dropping the controller aborts any
/// outstanding tasks.
pub struct WifiDiscovery {
    config: DiscoveryConfig,
    identity: Arc<RwLock<SessionIdentity>>,
    advertiser: Mutex<Option<Advertiser>>,
    listener: Mutex<Option<Listener>>,
    notifier: Notifier,
}

impl WifiDiscovery {
    /// Create a controller for the given device name.
    ///
    /// Returns the controller and the receiver peer availability events
    /// are delivered on.
    pub fn new(
        device_name: &str,
        config: DiscoveryConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let (notifier, event_rx) = Notifier::new();
        (
            Self {
                config,
                identity: Arc::new(RwLock::new(SessionIdentity::generate(device_name))),
                advertiser: Mutex::new(None),
                listener: Mutex::new(None),
                notifier,
            },
            event_rx,
        )
    }

    /// Start advertising this device's presence.
    ///
    /// Idempotent: if already advertising, returns Ok without re-binding
    /// or rotating the USN. A fresh start rotates the session suffix, so
    /// every advertising session announces under a new USN.
    pub async fn start_advertising(&self) -> Result<()> {
        let mut slot = self.advertiser.lock().await;
        if slot.is_some() {
            debug!("already advertising");
            return Ok(());
        }

        let usn = {
            let mut identity = self.identity.write();
            identity.rotate();
            identity.usn()
        };

        *slot = Some(Advertiser::start(&self.config, usn)?);
        Ok(())
    }

    /// Stop advertising. Idempotent; safe to call when not advertising.
    pub async fn stop_advertising(&self) -> Result<()> {
        let mut slot = self.advertiser.lock().await;
        if let Some(advertiser) = slot.take() {
            advertiser.stop().await;
        }
        Ok(())
    }

    /// Restart advertising under a rotated session identity.
    ///
    /// Stops the current session (if any) and starts a new one; two
    /// consecutive calls are guaranteed to announce under different USNs.
    pub async fn update_advertising(&self) -> Result<()> {
        self.stop_advertising().await?;
        self.start_advertising().await
    }

    /// Start listening for peer announcements.
    ///
    /// Idempotent: if already listening, returns Ok without re-binding.
    pub async fn start_listening(&self) -> Result<()> {
        let mut slot = self.listener.lock().await;
        if slot.is_some() {
            debug!("already listening");
            return Ok(());
        }

        *slot = Some(Listener::start(
            &self.config,
            self.identity.clone(),
            self.notifier.clone(),
        )?);
        Ok(())
    }

    /// Stop listening and forget all known peers. Idempotent; safe to
    /// call when not listening. No events fire after this returns.
    pub async fn stop_listening(&self) -> Result<()> {
        let mut slot = self.listener.lock().await;
        if let Some(listener) = slot.take() {
            listener.stop();
        }
        Ok(())
    }

    /// Whether the advertising capability is running.
    pub async fn is_advertising(&self) -> bool {
        self.advertiser.lock().await.is_some()
    }

    /// Whether the listening capability is running.
    pub async fn is_listening(&self) -> bool {
        self.listener.lock().await.is_some()
    }

    /// The USN of the current session identity. Reflects the advertised
    /// USN once advertising has started at least once.
    pub fn current_usn(&self) -> String {
        self.identity.read().usn()
    }

    /// The stable portion of the USN identifying this protocol's peers.
    pub fn discovery_token(&self) -> String {
        self.identity.read().discovery_token().to_string()
    }

    /// Snapshot of the peers the listener currently knows. Empty when not
    /// listening.
    pub async fn peers(&self) -> Vec<PeerRecord> {
        match self.listener.lock().await.as_ref() {
            Some(listener) => listener.peers(),
            None => Vec::new(),
        }
    }
}
