//! # ASCII Armor
//!
//! Decoding of the OpenPGP ASCII armor envelope:
//!
//! ```text
//! -----BEGIN PGP PUBLIC KEY BLOCK-----     header line, names the block type
//! Comment: optional                        zero or more "Key: value" headers
//!                                          blank line
//! mDMEatJ7ahYJKwYBBAHaRw8BAQdA4Ua7...      base64 body
//! =W/Vz                                    optional CRC-24 of the decoded body
//! -----END PGP PUBLIC KEY BLOCK-----       must name the same block type
//! ```
//!
//! Trailing whitespace on every line is ignored so blocks pasted from
//! CRLF sources decode the same way. Text after the END line is ignored.

use crate::error::{ParseError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const BEGIN_PREFIX: &str = "-----BEGIN ";
const END_PREFIX: &str = "-----END ";
const DASHES: &str = "-----";

const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// A decoded armor envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Armored {
    /// Block type from the header line, e.g. `PGP PUBLIC KEY BLOCK`.
    pub kind: String,

    /// Armor headers in order of appearance.
    pub headers: Vec<(String, String)>,

    /// Decoded body.
    pub data: Vec<u8>,
}

/// Decodes the first armored block in `text`.
///
/// Leading whitespace is skipped; the first remaining line must be the
/// BEGIN line.
///
/// # Errors
///
/// - `MissingArmor` if `text` does not start with a BEGIN line.
/// - `MalformedArmor` for a bad header, a missing or mismatched END line.
/// - `Base64` if the body does not decode.
/// - `ChecksumMismatch` if a checksum line is present and disagrees.
pub fn decode(text: &str) -> Result<Armored> {
    let mut lines = text.trim_start().lines().map(str::trim_end);

    let kind = lines
        .next()
        .and_then(|line| line.strip_prefix(BEGIN_PREFIX))
        .and_then(|rest| rest.strip_suffix(DASHES))
        .ok_or(ParseError::MissingArmor)?
        .to_string();

    let mut headers = Vec::new();
    let mut body = String::new();
    let mut checksum = None;
    let mut in_headers = true;
    let mut ended = false;

    for line in lines.by_ref() {
        if let Some(rest) = line.strip_prefix(END_PREFIX) {
            if rest.strip_suffix(DASHES) != Some(kind.as_str()) {
                return Err(ParseError::MalformedArmor(format!(
                    "end line does not match {}",
                    kind
                )));
            }
            ended = true;
            break;
        }

        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            // base64 never contains ':', so a header-less block starts here
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_string(), value.trim().to_string()));
                continue;
            }
            in_headers = false;
        }

        if is_checksum_line(line) {
            checksum = Some(&line[1..]);
        } else if checksum.is_some() {
            return Err(ParseError::MalformedArmor(
                "data after checksum line".to_string(),
            ));
        } else {
            body.push_str(line.trim());
        }
    }

    if !ended {
        return Err(ParseError::MalformedArmor("missing end line".to_string()));
    }

    let data = STANDARD.decode(body.as_bytes())?;

    if let Some(encoded) = checksum {
        let expected = STANDARD.decode(encoded.as_bytes())?;
        if expected.len() != 3 {
            return Err(ParseError::MalformedArmor(
                "checksum is not 24 bits".to_string(),
            ));
        }
        let expected =
            (u32::from(expected[0]) << 16) | (u32::from(expected[1]) << 8) | u32::from(expected[2]);
        if crc24(&data) != expected {
            return Err(ParseError::ChecksumMismatch);
        }
    }

    Ok(Armored {
        kind,
        headers,
        data,
    })
}

/// CRC-24 as used by the armor checksum.
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

fn is_checksum_line(line: &str) -> bool {
    line.len() == 5 && line.starts_with('=') && !line[1..].contains('=')
}
