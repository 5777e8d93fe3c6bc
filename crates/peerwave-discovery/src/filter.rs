//! Inbound announcement filtering.

use crate::identity::SessionIdentity;

/// Classification of an inbound announcement's USN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A peer of this application; the listener should surface it.
    Relevant,
    /// Not peerwave traffic at all; unrelated devices on the network.
    Irrelevant,
    /// This device hearing its own announcement echoed back.
    SelfOriginated,
}

/// Classify an inbound USN against the local session identity.
///
/// Pure and total: every input maps to exactly one classification and the
/// same input always maps to the same one. Getting this wrong is the
/// expensive kind of bug: a false self-match silently hides a real peer,
/// while a missed self-match makes a device discover itself in a loop.
pub fn classify(usn: &str, own: &SessionIdentity) -> Classification {
    let token = own.discovery_token();

    // A bare token with no prefix still counts as this protocol's traffic.
    let prefix = if usn == token {
        ""
    } else {
        match usn
            .strip_suffix(token)
            .and_then(|rest| rest.strip_suffix(':'))
        {
            Some(prefix) => prefix,
            None => return Classification::Irrelevant,
        }
    };

    // Suffixes retired by earlier rotations still count as self: a stale
    // echo of a previous session's USN can arrive after a restart.
    if (!prefix.is_empty() && prefix == own.device_name()) || own.is_session_suffix(prefix) {
        Classification::SelfOriginated
    } else {
        Classification::Relevant
    }
}
