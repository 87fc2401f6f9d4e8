//! # OpenPGP Packets
//!
//! Just enough of the packet layer to walk a transferable public key and
//! derive key identities.
//!
//! ## Packet Headers
//!
//! | Format | Tag | Length |
//! |--------|-----|--------|
//! | old (`0b10tttt_ll`) | bits 5..2 | `ll`: 1, 2 or 4 bytes, or "rest of data" |
//! | new (`0b11tttttt`) | bits 5..0 | `<192` one byte, `192..=223` two bytes, `255` four bytes |
//!
//! Partial body lengths are only legal for data packets and are rejected.
//!
//! ## Fingerprints
//!
//! | Version | Fingerprint | Key ID |
//! |---------|-------------|--------|
//! | 4 | SHA-1 over `0x99 ‖ len16 ‖ body` | last 8 bytes |
//! | 5 | SHA-256 over `0x9A ‖ len32 ‖ body` | first 8 bytes |
//! | 6 | SHA-256 over `0x9B ‖ len32 ‖ body` | first 8 bytes |

use crate::error::{ParseError, Result};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Public-Key packet.
pub const TAG_PUBLIC_KEY: u8 = 6;

/// User ID packet.
pub const TAG_USER_ID: u8 = 13;

/// Public-Subkey packet.
pub const TAG_PUBLIC_SUBKEY: u8 = 14;

/// Size of a key ID in bytes.
pub const KEY_ID_SIZE: usize = 8;

/// A single packet borrowed from the decoded armor body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Packet tag.
    pub tag: u8,

    /// Packet body without the header.
    pub body: &'a [u8],
}

/// Iterator over the packets in a byte buffer.
///
/// Yields an error once and then stops when a header is malformed.
#[derive(Debug, Clone)]
pub struct Packets<'a> {
    data: &'a [u8],
    failed: bool,
}

/// Walks the packets in `data`.
pub fn packets(data: &[u8]) -> Packets<'_> {
    Packets {
        data,
        failed: false,
    }
}

impl<'a> Iterator for Packets<'a> {
    type Item = Result<Packet<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.data.is_empty() {
            return None;
        }
        match read_packet(self.data) {
            Ok((packet, rest)) => {
                self.data = rest;
                Some(Ok(packet))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn read_packet(data: &[u8]) -> Result<(Packet<'_>, &[u8])> {
    let (&header, rest) = data
        .split_first()
        .ok_or_else(|| malformed("empty packet header"))?;
    if header & 0x80 == 0 {
        return Err(malformed("packet header without tag bit"));
    }

    let (tag, len, rest) = if header & 0x40 != 0 {
        let (len, rest) = new_format_length(rest)?;
        (header & 0x3F, len, rest)
    } else {
        let tag = (header >> 2) & 0x0F;
        let (len, rest) = match header & 0x03 {
            0 => be_length(rest, 1)?,
            1 => be_length(rest, 2)?,
            2 => be_length(rest, 4)?,
            _ => (rest.len(), rest),
        };
        (tag, len, rest)
    };

    if len > rest.len() {
        return Err(malformed(format!(
            "packet tag {} claims {} bytes, {} available",
            tag,
            len,
            rest.len()
        )));
    }
    let (body, rest) = rest.split_at(len);
    Ok((Packet { tag, body }, rest))
}

fn new_format_length(data: &[u8]) -> Result<(usize, &[u8])> {
    let (&first, rest) = data
        .split_first()
        .ok_or_else(|| malformed("truncated packet length"))?;
    match first {
        0..=191 => Ok((usize::from(first), rest)),
        192..=223 => {
            let (&second, rest) = rest
                .split_first()
                .ok_or_else(|| malformed("truncated packet length"))?;
            let len = ((usize::from(first) - 192) << 8) + usize::from(second) + 192;
            Ok((len, rest))
        }
        255 => be_length(rest, 4),
        _ => Err(malformed("partial body length in key material")),
    }
}

fn be_length(data: &[u8], width: usize) -> Result<(usize, &[u8])> {
    if data.len() < width {
        return Err(malformed("truncated packet length"));
    }
    let (bytes, rest) = data.split_at(width);
    let len = bytes
        .iter()
        .fold(0usize, |acc, &byte| (acc << 8) | usize::from(byte));
    Ok((len, rest))
}

/// Identity of a primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdentity {
    /// Key packet version.
    pub version: u8,

    /// Fingerprint (20 bytes for v4, 32 for v5 and v6).
    pub fingerprint: Vec<u8>,

    /// Key ID.
    pub key_id: [u8; KEY_ID_SIZE],
}

/// Derives the fingerprint and key ID from a public key packet body.
///
/// # Errors
///
/// - `MalformedPacket` for an empty or oversized body.
/// - `UnsupportedKeyVersion` for versions other than 4, 5 and 6.
pub fn key_identity(body: &[u8]) -> Result<KeyIdentity> {
    let version = *body.first().ok_or_else(|| malformed("empty key packet"))?;

    let fingerprint: Vec<u8> = match version {
        4 => {
            let len = u16::try_from(body.len())
                .map_err(|_| malformed("v4 key packet longer than 65535 bytes"))?;
            let mut hasher = Sha1::new();
            hasher.update([0x99u8]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            hasher.finalize().to_vec()
        }
        5 | 6 => {
            let len = u32::try_from(body.len())
                .map_err(|_| malformed("key packet longer than 4 GiB"))?;
            let prefix: u8 = if version == 5 { 0x9A } else { 0x9B };
            let mut hasher = Sha256::new();
            hasher.update([prefix]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            hasher.finalize().to_vec()
        }
        other => return Err(ParseError::UnsupportedKeyVersion(other)),
    };

    let id_bytes = if version == 4 {
        &fingerprint[fingerprint.len() - KEY_ID_SIZE..]
    } else {
        &fingerprint[..KEY_ID_SIZE]
    };
    let mut key_id = [0u8; KEY_ID_SIZE];
    key_id.copy_from_slice(id_bytes);

    Ok(KeyIdentity {
        version,
        fingerprint,
        key_id,
    })
}

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::MalformedPacket(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_format_one_byte_length() {
        // tag 13, length type 0
        let data = [0x80 | (13 << 2), 3, b'a', b'b', b'c'];
        let packets: Vec<_> = packets(&data).collect::<Result<_>>().unwrap();
        assert_eq!(packets, vec![Packet { tag: 13, body: b"abc" }]);
    }

    #[test]
    fn test_old_format_two_byte_length() {
        let mut data = vec![0x80 | (6 << 2) | 1, 0x01, 0x00];
        data.extend(std::iter::repeat(7u8).take(256));
        let packet = packets(&data).next().unwrap().unwrap();
        assert_eq!(packet.tag, 6);
        assert_eq!(packet.body.len(), 256);
    }

    #[test]
    fn test_old_format_indeterminate_length() {
        let data = [0x80 | (13 << 2) | 3, b'x', b'y'];
        let packet = packets(&data).next().unwrap().unwrap();
        assert_eq!(packet.body, b"xy");
    }

    #[test]
    fn test_new_format_lengths() {
        let mut data = vec![0xC0 | 13, 2, b'h', b'i'];
        // two-byte length: 192 + 8 = 200
        data.extend([0xC0 | 14, 192, 8]);
        data.extend(std::iter::repeat(1u8).take(200));
        // four-byte length
        data.extend([0xC0 | 2, 255, 0, 0, 0, 1, 9]);

        let packets: Vec<_> = packets(&data).collect::<Result<_>>().unwrap();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0], Packet { tag: 13, body: b"hi" });
        assert_eq!(packets[1].tag, 14);
        assert_eq!(packets[1].body.len(), 200);
        assert_eq!(packets[2], Packet { tag: 2, body: &[9] });
    }

    #[test]
    fn test_partial_length_rejected() {
        let data = [0xC0 | 6, 224, 0];
        assert!(matches!(
            packets(&data).next().unwrap(),
            Err(ParseError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_truncated_packet_stops_iteration() {
        let data = [0x80 | (6 << 2), 10, 4];
        let mut iter = packets(&data);
        assert!(matches!(iter.next(), Some(Err(ParseError::MalformedPacket(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_missing_tag_bit() {
        let data = [0x01, 0x00];
        assert!(packets(&data).next().unwrap().is_err());
    }

    #[test]
    fn test_v4_key_id_is_fingerprint_suffix() {
        let body = [4u8, 0, 0, 0, 0, 22, 0, 1, 0];
        let identity = key_identity(&body).unwrap();
        assert_eq!(identity.version, 4);
        assert_eq!(identity.fingerprint.len(), 20);
        assert_eq!(&identity.key_id[..], &identity.fingerprint[12..20]);
    }

    #[test]
    fn test_v6_key_id_is_fingerprint_prefix() {
        let body = [6u8, 0, 0, 0, 0, 27, 0, 0, 0, 0];
        let identity = key_identity(&body).unwrap();
        assert_eq!(identity.fingerprint.len(), 32);
        assert_eq!(&identity.key_id[..], &identity.fingerprint[..8]);
    }

    #[test]
    fn test_unsupported_versions() {
        assert!(matches!(
            key_identity(&[3, 0, 0]),
            Err(ParseError::UnsupportedKeyVersion(3))
        ));
        assert!(matches!(key_identity(&[]), Err(ParseError::MalformedPacket(_))));
    }
}
