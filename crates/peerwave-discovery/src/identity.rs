//! Session identity and USN generation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of digest bytes kept for the discovery token.
const TOKEN_HASH_BYTES: usize = 16;

/// The identity a device advertises under for one discovery session.
///
/// The discovery token is stable for the lifetime of one controller
/// instance; the session suffix is rotated on every advertising start so
/// that consecutive sessions are not linkable by their USN, while the
/// token still lets peers recognize a restarted device's traffic as
/// belonging to this protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    device_name: String,
    discovery_token: String,
    session_suffix: String,
    retired_suffixes: Vec<String>,
}

impl SessionIdentity {
    /// Generate a fresh identity for the given device name.
    pub fn generate(device_name: &str) -> Self {
        Self {
            device_name: device_name.to_string(),
            discovery_token: discovery_token_for(device_name),
            session_suffix: random_suffix(),
            retired_suffixes: Vec::new(),
        }
    }

    /// Rotate the session suffix. Called on every advertising start;
    /// 64 bits of entropy make a repeated full USN within one process
    /// lifetime vanishingly unlikely.
    ///
    /// The outgoing suffix is retired, not forgotten: an in-flight echo
    /// of the previous session's USN can still arrive after the rotation
    /// and must keep classifying as our own traffic.
    pub fn rotate(&mut self) {
        let previous = std::mem::replace(&mut self.session_suffix, random_suffix());
        self.retired_suffixes.push(previous);
    }

    /// Whether this suffix was emitted by this identity, in the current
    /// session or any earlier one this process lifetime.
    pub fn is_session_suffix(&self, suffix: &str) -> bool {
        suffix == self.session_suffix || self.retired_suffixes.iter().any(|s| s == suffix)
    }

    /// The full USN emitted on the wire: `<sessionSuffix>:<discoveryToken>`.
    pub fn usn(&self) -> String {
        format!("{}:{}", self.session_suffix, self.discovery_token)
    }

    /// The device name this identity was generated for.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// The stable portion of the USN identifying this protocol's peers.
    pub fn discovery_token(&self) -> &str {
        &self.discovery_token
    }

    /// The rotating portion of the USN.
    pub fn session_suffix(&self) -> &str {
        &self.session_suffix
    }
}

/// Derive the discovery token from the device identity: base64 of the
/// first 16 bytes of a SHA-256 digest.
fn discovery_token_for(device_name: &str) -> String {
    let digest = Sha256::digest(device_name.as_bytes());
    BASE64.encode(&digest[..TOKEN_HASH_BYTES])
}

fn random_suffix() -> String {
    format!("{:016x}", rand::rng().random::<u64>())
}
