//! Error types for peerwave discovery.

use thiserror::Error;

/// Errors that can occur while parsing an inbound announcement.
///
/// These are always recovered locally: a datagram that fails to parse is
/// dropped, never surfaced to subscribers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Datagram was not valid UTF-8
    #[error("announcement is not valid UTF-8")]
    NotUtf8,

    /// First line was not a NOTIFY request line
    #[error("not a NOTIFY announcement")]
    BadStartLine,

    /// A header line had no name/value separator
    #[error("malformed header line")]
    BadHeader,

    /// A header required by the schema was absent
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// An alive announcement carried a LOCATION with no value
    #[error("empty LOCATION value")]
    EmptyLocation,

    /// NTS carried neither ssdp:alive nor ssdp:byebye
    #[error("unrecognized NTS value")]
    UnrecognizedNts,

    /// CACHE-CONTROL did not carry a parseable max-age
    #[error("malformed CACHE-CONTROL max-age")]
    BadMaxAge,
}

/// Errors that can occur while starting a discovery capability.
///
/// Stop operations never fail; release problems are logged best-effort.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Socket or multicast-group acquisition failed. Fatal to the affected
    /// capability; the caller decides whether to retry.
    #[error("failed to bind discovery socket: {0}")]
    Bind(#[source] std::io::Error),

    /// The configured group address could not be resolved.
    #[error("failed to resolve group address: {0}")]
    AddressResolve(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
