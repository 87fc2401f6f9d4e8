//! Error types for key parsing.

use thiserror::Error;

/// Result type alias for key parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while parsing an armored public key block.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input does not start with an armor header line.
    #[error("no armored block found")]
    MissingArmor,

    /// The armor structure is broken.
    #[error("malformed armor: {0}")]
    MalformedArmor(String),

    /// The armor declares a block type other than a public key.
    ///
    /// Private keys, signatures and messages all end up here.
    #[error("not a public key block: {0}")]
    NotAPublicKey(String),

    /// The armored body is not valid base64.
    #[error("invalid base64 in armored body: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The armor checksum does not match the decoded body.
    #[error("armor checksum mismatch")]
    ChecksumMismatch,

    /// A packet header or body is truncated or inconsistent.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The block holds no primary key packet.
    #[error("no public key packet in block")]
    MissingKeyPacket,

    /// A primary key carries no user ID packet.
    #[error("public key {0} has no user id")]
    MissingUserId(String),

    /// The primary key uses a packet version this parser does not know.
    #[error("unsupported key version {0}")]
    UnsupportedKeyVersion(u8),

    /// A single key was expected but the block holds several.
    #[error("block contains {0} public keys, expected one")]
    MultipleKeys(usize),
}
