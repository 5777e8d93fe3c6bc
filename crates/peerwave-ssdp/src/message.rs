//! NOTIFY announcement message.

use std::time::Duration;

use peerwave_types::ParseError;

/// NTS value for a presence announcement.
pub const NTS_ALIVE: &str = "ssdp:alive";

/// NTS value for a leave announcement.
pub const NTS_BYEBYE: &str = "ssdp:byebye";

const START_LINE: &str = "NOTIFY * HTTP/1.1";

/// An announcement as it exists on the wire.
///
/// Ephemeral: parsed from or serialized into a single UDP datagram, never
/// persisted. The parser fails closed; a value of this type always carries
/// every field its variant requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// "I am here": the sender is reachable at `location` for at least
    /// `max_age` unless it re-announces or says goodbye first.
    Alive {
        /// Notification type the sender advertises under.
        nt: String,
        /// Unique service name, `<sessionSuffix>:<discoveryToken>`.
        usn: String,
        /// URI peers can connect back to.
        location: String,
        /// Advertised cache lifetime.
        max_age: Duration,
    },
    /// "I am leaving": the sender is shutting its advertiser down.
    ByeBye {
        /// Notification type the sender advertises under.
        nt: String,
        /// Unique service name, `<sessionSuffix>:<discoveryToken>`.
        usn: String,
    },
}

impl Announcement {
    /// The USN carried by this announcement.
    pub fn usn(&self) -> &str {
        match self {
            Announcement::Alive { usn, .. } => usn,
            Announcement::ByeBye { usn, .. } => usn,
        }
    }

    /// The notification type carried by this announcement.
    pub fn nt(&self) -> &str {
        match self {
            Announcement::Alive { nt, .. } => nt,
            Announcement::ByeBye { nt, .. } => nt,
        }
    }

    /// Serialize the announcement into a NOTIFY datagram.
    ///
    /// `host` is the multicast group the datagram is addressed to, echoed
    /// in the HOST header per SSDP convention.
    pub fn to_bytes(&self, host: &str) -> Vec<u8> {
        let text = match self {
            Announcement::Alive {
                nt,
                usn,
                location,
                max_age,
            } => format!(
                "{START_LINE}\r\n\
                 HOST: {host}\r\n\
                 NT: {nt}\r\n\
                 NTS: {NTS_ALIVE}\r\n\
                 USN: {usn}\r\n\
                 LOCATION: {location}\r\n\
                 CACHE-CONTROL: max-age={}\r\n\
                 \r\n",
                max_age.as_secs()
            ),
            Announcement::ByeBye { nt, usn } => format!(
                "{START_LINE}\r\n\
                 HOST: {host}\r\n\
                 NT: {nt}\r\n\
                 NTS: {NTS_BYEBYE}\r\n\
                 USN: {usn}\r\n\
                 \r\n"
            ),
        };
        text.into_bytes()
    }

    /// Parse an announcement from a received datagram.
    ///
    /// Strict schema parsing: the start line must be a NOTIFY request line,
    /// NT/NTS/USN are mandatory, and an alive announcement must also carry
    /// LOCATION and a parseable CACHE-CONTROL max-age. Unknown extra
    /// headers are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(data).map_err(|_| ParseError::NotUtf8)?;

        let mut lines = text.lines();
        let start = lines.next().ok_or(ParseError::BadStartLine)?;
        if start.trim_end() != START_LINE {
            return Err(ParseError::BadStartLine);
        }

        let mut nt = None;
        let mut nts = None;
        let mut usn = None;
        let mut location = None;
        let mut max_age = None;

        for line in lines {
            if line.is_empty() {
                // Blank line terminates the header section.
                break;
            }
            let (name, value) = line.split_once(':').ok_or(ParseError::BadHeader)?;
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("NT") {
                nt = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("NTS") {
                nts = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("USN") {
                usn = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("LOCATION") {
                location = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("CACHE-CONTROL") {
                max_age = Some(parse_max_age(value)?);
            }
        }

        let nt = nt.ok_or(ParseError::MissingHeader("NT"))?;
        let nts = nts.ok_or(ParseError::MissingHeader("NTS"))?;
        let usn = usn.ok_or(ParseError::MissingHeader("USN"))?;

        match nts.as_str() {
            NTS_ALIVE => {
                let location = location.ok_or(ParseError::MissingHeader("LOCATION"))?;
                if location.is_empty() {
                    // A peer without a reachable location is useless;
                    // fail closed rather than surface an empty URI.
                    return Err(ParseError::EmptyLocation);
                }
                Ok(Announcement::Alive {
                    nt,
                    usn,
                    location,
                    max_age: max_age.ok_or(ParseError::MissingHeader("CACHE-CONTROL"))?,
                })
            }
            NTS_BYEBYE => Ok(Announcement::ByeBye { nt, usn }),
            _ => Err(ParseError::UnrecognizedNts),
        }
    }
}

/// Parse a CACHE-CONTROL value of the form `max-age=<secs>`.
fn parse_max_age(value: &str) -> Result<Duration, ParseError> {
    let rest = value
        .trim()
        .strip_prefix("max-age")
        .ok_or(ParseError::BadMaxAge)?;
    let secs = rest
        .trim_start()
        .strip_prefix('=')
        .ok_or(ParseError::BadMaxAge)?
        .trim()
        .parse::<u64>()
        .map_err(|_| ParseError::BadMaxAge)?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alive_roundtrip() {
        let ann = Announcement::Alive {
            nt: "urn:peerwave:discovery".to_string(),
            usn: "0123456789abcdef:someToken==".to_string(),
            location: "http://192.168.1.7:5000/".to_string(),
            max_age: Duration::from_secs(1800),
        };

        let bytes = ann.to_bytes("239.255.255.250:1900");
        let parsed = Announcement::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, ann);
    }

    #[test]
    fn test_byebye_roundtrip() {
        let ann = Announcement::ByeBye {
            nt: "urn:peerwave:discovery".to_string(),
            usn: "0123456789abcdef:someToken==".to_string(),
        };

        let bytes = ann.to_bytes("239.255.255.250:1900");
        let parsed = Announcement::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, ann);
    }

    #[test]
    fn test_header_names_are_case_insensitive() {
        let raw = b"NOTIFY * HTTP/1.1\r\n\
                    Host: 239.255.255.250:1900\r\n\
                    nt: urn:peerwave:discovery\r\n\
                    nts: ssdp:alive\r\n\
                    usn: abc:def\r\n\
                    Location: http://foo.bar/baz\r\n\
                    Cache-Control: max-age=120\r\n\
                    \r\n";
        let parsed = Announcement::from_bytes(raw).unwrap();
        assert_eq!(parsed.usn(), "abc:def");
        match parsed {
            Announcement::Alive {
                location, max_age, ..
            } => {
                assert_eq!(location, "http://foo.bar/baz");
                assert_eq!(max_age, Duration::from_secs(120));
            }
            _ => panic!("expected alive announcement"),
        }
    }

    #[test]
    fn test_rejects_wrong_start_line() {
        let raw = b"M-SEARCH * HTTP/1.1\r\nNT: x\r\nNTS: ssdp:alive\r\nUSN: a\r\n\r\n";
        assert_eq!(
            Announcement::from_bytes(raw),
            Err(ParseError::BadStartLine)
        );
    }

    #[test]
    fn test_rejects_missing_usn() {
        let raw = b"NOTIFY * HTTP/1.1\r\nNT: x\r\nNTS: ssdp:byebye\r\n\r\n";
        assert_eq!(
            Announcement::from_bytes(raw),
            Err(ParseError::MissingHeader("USN"))
        );
    }

    #[test]
    fn test_rejects_alive_without_location() {
        let raw = b"NOTIFY * HTTP/1.1\r\n\
                    NT: x\r\n\
                    NTS: ssdp:alive\r\n\
                    USN: a:b\r\n\
                    CACHE-CONTROL: max-age=60\r\n\
                    \r\n";
        assert_eq!(
            Announcement::from_bytes(raw),
            Err(ParseError::MissingHeader("LOCATION"))
        );
    }

    #[test]
    fn test_rejects_alive_with_empty_location() {
        let raw = b"NOTIFY * HTTP/1.1\r\n\
                    NT: x\r\n\
                    NTS: ssdp:alive\r\n\
                    USN: a:b\r\n\
                    LOCATION: \r\n\
                    CACHE-CONTROL: max-age=60\r\n\
                    \r\n";
        assert_eq!(
            Announcement::from_bytes(raw),
            Err(ParseError::EmptyLocation)
        );
    }

    #[test]
    fn test_rejects_unknown_nts() {
        let raw = b"NOTIFY * HTTP/1.1\r\nNT: x\r\nNTS: ssdp:update\r\nUSN: a:b\r\n\r\n";
        assert_eq!(
            Announcement::from_bytes(raw),
            Err(ParseError::UnrecognizedNts)
        );
    }

    #[test]
    fn test_rejects_bad_max_age() {
        let raw = b"NOTIFY * HTTP/1.1\r\n\
                    NT: x\r\n\
                    NTS: ssdp:alive\r\n\
                    USN: a:b\r\n\
                    LOCATION: http://foo.bar/baz\r\n\
                    CACHE-CONTROL: max-age=soon\r\n\
                    \r\n";
        assert_eq!(Announcement::from_bytes(raw), Err(ParseError::BadMaxAge));
    }

    #[test]
    fn test_rejects_binary_junk() {
        assert_eq!(
            Announcement::from_bytes(&[0xff, 0xfe, 0x00, 0x01]),
            Err(ParseError::NotUtf8)
        );
        assert!(Announcement::from_bytes(b"").is_err());
    }
}
