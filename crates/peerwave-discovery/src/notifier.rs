//! Availability-change event delivery.

use tokio::sync::mpsc;
use tracing::trace;

use peerwave_types::{DiscoveryEvent, PeerAvailability};

/// Delivers peer availability changes to the controller's subscriber.
///
/// One listener processing pass produces one batch of changes; a
/// non-empty batch becomes exactly one event, so event volume stays
/// proportional to actual network churn.
#[derive(Clone)]
pub(crate) struct Notifier {
    tx: mpsc::UnboundedSender<DiscoveryEvent>,
}

impl Notifier {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit one event for the given batch of changes. Empty batches are
    /// swallowed; a dropped receiver is not an error.
    pub(crate) fn notify(&self, changes: Vec<PeerAvailability>) {
        if changes.is_empty() {
            return;
        }
        if self
            .tx
            .send(DiscoveryEvent::PeerAvailabilityChanged(changes))
            .is_err()
        {
            trace!("peer availability event dropped, no subscriber");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_emits_nothing() {
        let (notifier, mut rx) = Notifier::new();
        notifier.notify(Vec::new());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_batch_emits_single_event() {
        let (notifier, mut rx) = Notifier::new();
        let changes = vec![
            PeerAvailability {
                peer_location: "http://foo.bar/baz".to_string(),
                peer_available: true,
            },
            PeerAvailability {
                peer_location: "http://foo.bar/qux".to_string(),
                peer_available: false,
            },
        ];
        notifier.notify(changes.clone());

        let DiscoveryEvent::PeerAvailabilityChanged(received) = rx.try_recv().unwrap();
        assert_eq!(received, changes);
        assert!(rx.try_recv().is_err());
    }
}
