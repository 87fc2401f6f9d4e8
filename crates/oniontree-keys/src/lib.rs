//! # OnionTree Keys
//!
//! Parses armored OpenPGP public key blocks into the [`PublicKey`]
//! descriptors stored in service records.
//!
//! The parser is stateless and never touches the network or a keyring. It
//! reads only what a record needs: the primary key's ID and fingerprint and
//! the first user ID. Signatures are not verified.
//!
//! ## Pipeline
//!
//! ```text
//!  armored text ──▶ armor::decode ──▶ packets ──▶ key_identity ──▶ PublicKey
//!                   (BEGIN/END,       (tag 6,     (fingerprint,    (value is the
//!                    base64, CRC-24)   tag 13)     key ID)          verbatim block)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! let block = std::fs::read_to_string("alice.asc").unwrap();
//! let key = oniontree_keys::parse(&block).unwrap();
//! println!("{} {} {}", key.id, key.fingerprint, key.user_id);
//! ```

pub mod armor;
pub mod error;
pub mod packet;

pub use error::{ParseError, Result};
pub use oniontree_repo::PublicKey;

use packet::{TAG_PUBLIC_KEY, TAG_PUBLIC_SUBKEY, TAG_USER_ID};
use tracing::debug;

/// Armor type of a public key block.
pub const PUBLIC_KEY_BLOCK: &str = "PGP PUBLIC KEY BLOCK";

/// Parses a block holding exactly one public key.
///
/// Leading whitespace is dropped; the rest of the input is stored verbatim
/// as the descriptor's `value`.
///
/// # Errors
///
/// Everything [`parse_keys`] reports, plus `MultipleKeys` when the block
/// holds more than one primary key.
pub fn parse(block: &str) -> Result<PublicKey> {
    let mut keys = parse_keys(block)?;
    if keys.len() > 1 {
        return Err(ParseError::MultipleKeys(keys.len()));
    }
    keys.pop().ok_or(ParseError::MissingKeyPacket)
}

/// Parses every primary key in a block, in order.
///
/// Each descriptor carries the whole block as its `value`.
///
/// # Errors
///
/// - Armor failures (`MissingArmor`, `MalformedArmor`, `Base64`,
///   `ChecksumMismatch`).
/// - `NotAPublicKey` if the armor declares another block type.
/// - `MalformedPacket` or `UnsupportedKeyVersion` for bad key material.
/// - `MissingKeyPacket` if no primary key is found.
/// - `MissingUserId` if a primary key has no user ID.
pub fn parse_keys(block: &str) -> Result<Vec<PublicKey>> {
    let block = block.trim_start();
    let armored = armor::decode(block)?;
    if armored.kind != PUBLIC_KEY_BLOCK {
        return Err(ParseError::NotAPublicKey(armored.kind));
    }

    let mut keys: Vec<PublicKey> = Vec::new();
    for packet in packet::packets(&armored.data) {
        let packet = packet?;
        match packet.tag {
            TAG_PUBLIC_KEY => {
                if let Some(previous) = keys.last() {
                    require_user_id(previous)?;
                }
                let identity = packet::key_identity(packet.body)?;
                debug!(version = identity.version, "found primary key");
                keys.push(PublicKey {
                    id: hex::encode_upper(identity.key_id),
                    fingerprint: hex::encode_upper(&identity.fingerprint),
                    value: block.to_string(),
                    ..Default::default()
                });
            }
            TAG_USER_ID => {
                let key = keys.last_mut().ok_or_else(|| {
                    ParseError::MalformedPacket("user id before primary key".to_string())
                })?;
                if key.user_id.is_empty() {
                    key.user_id = String::from_utf8_lossy(packet.body).into_owned();
                }
            }
            TAG_PUBLIC_SUBKEY => debug!("skipping subkey"),
            tag => debug!(tag, "skipping packet"),
        }
    }

    match keys.last() {
        Some(last) => require_user_id(last)?,
        None => return Err(ParseError::MissingKeyPacket),
    }
    Ok(keys)
}

fn require_user_id(key: &PublicKey) -> Result<()> {
    if key.user_id.is_empty() {
        Err(ParseError::MissingUserId(key.id.clone()))
    } else {
        Ok(())
    }
}
