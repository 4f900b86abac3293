//! In-band payload encoding.
//!
//! Some drivers cannot bind binary payloads, or bind every parameter as
//! text. Affected values travel through the text protocol wrapped in a
//! marker prefix that is vanishingly unlikely to collide with user data;
//! the dialect and the row decoder recognize the prefix and restore the
//! original payload.
//!
//! Three envelopes exist: a binary one (`prefix + checksum + hex
//! payload`), a JSON one (`prefix + checksum + raw payload`, since JSON
//! text is already driver-safe), and an explicit-cast one
//! (`prefix + type name + CR + payload`) for values that only need their
//! type restated on the way in.

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::expr::hex_lower;

/// Marker in front of hex-encoded binary payloads.
pub const BINARY_PREFIX: &str = "dsql_binary\ru5f8mzx4vsm8g2c9\r";

/// Marker in front of JSON payloads.
pub const JSON_PREFIX: &str = "dsql_json\ru5f8mzx4vsm8g2c9\r";

/// Marker in front of explicit-cast payloads.
pub const EXPLICIT_CAST_PREFIX: &str = "dsql_explicit_cast\ru5f8mzx4vsm8g2c9\r";

/// Leading 4 bytes of the payload digest, hex encoded.
fn checksum(payload: &str) -> String {
    let digest = Sha256::digest(payload.as_bytes());
    hex_lower(&digest[..4])
}

/// Wraps a binary payload into the text envelope.
#[must_use]
pub fn binary_encode(value: &[u8]) -> String {
    let hex = hex_lower(value);
    format!("{BINARY_PREFIX}{}{hex}", checksum(&hex))
}

/// Whether a string carries the binary envelope.
#[must_use]
pub fn binary_is_encoded(value: &str) -> bool {
    value.starts_with(BINARY_PREFIX)
}

/// Unwraps the binary envelope, verifying the checksum.
pub fn binary_decode(value: &str) -> Result<Vec<u8>> {
    let rest = value
        .strip_prefix(BINARY_PREFIX)
        .ok_or_else(|| Error::InvalidEncodedPayload {
            reason: String::from("unexpected unencoded binary value"),
        })?;
    if rest.len() < 8 {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("truncated binary envelope"),
        });
    }
    let (expected, hex) = rest.split_at(8);
    if hex.len() % 2 != 0 || expected != checksum(hex) {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("binary value checksum mismatch"),
        });
    }
    let res = hex_decode(hex)?;
    if std::str::from_utf8(&res).is_ok_and(binary_is_encoded) {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("double encoded binary value"),
        });
    }
    Ok(res)
}

/// Wraps a JSON payload into the text envelope. The payload stays raw,
/// only the checksum guards it.
#[must_use]
pub fn json_encode(value: &str) -> String {
    format!("{JSON_PREFIX}{}{value}", checksum(value))
}

/// Whether a string carries the JSON envelope.
#[must_use]
pub fn json_is_encoded(value: &str) -> bool {
    value.starts_with(JSON_PREFIX)
}

/// Unwraps the JSON envelope, verifying the checksum.
pub fn json_decode(value: &str) -> Result<&str> {
    let rest = value
        .strip_prefix(JSON_PREFIX)
        .ok_or_else(|| Error::InvalidEncodedPayload {
            reason: String::from("unexpected unencoded json value"),
        })?;
    if rest.len() < 8 {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("truncated json envelope"),
        });
    }
    let (expected, payload) = rest.split_at(8);
    if expected != checksum(payload) {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("json value checksum mismatch"),
        });
    }
    if json_is_encoded(payload) {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("double encoded json value"),
        });
    }
    Ok(payload)
}

/// Wraps a value into the explicit-cast envelope.
#[must_use]
pub fn explicit_cast_encode(type_name: &str, value: &str) -> String {
    format!("{EXPLICIT_CAST_PREFIX}{type_name}\r{value}")
}

/// Whether a string carries the explicit-cast envelope.
#[must_use]
pub fn explicit_cast_is_encoded(value: &str) -> bool {
    value.starts_with(EXPLICIT_CAST_PREFIX)
}

/// Type name recorded in an explicit-cast envelope.
pub fn explicit_cast_decode_type(value: &str) -> Result<&str> {
    let rest = value
        .strip_prefix(EXPLICIT_CAST_PREFIX)
        .ok_or_else(|| Error::InvalidEncodedPayload {
            reason: String::from("unexpected unencoded value"),
        })?;
    rest.split_once('\r')
        .map(|(ty, _)| ty)
        .ok_or_else(|| Error::InvalidEncodedPayload {
            reason: String::from("explicit-cast envelope has no type terminator"),
        })
}

/// Payload of an explicit-cast envelope.
pub fn explicit_cast_decode(value: &str) -> Result<&str> {
    let ty = explicit_cast_decode_type(value)?;
    let res = &value[EXPLICIT_CAST_PREFIX.len() + ty.len() + 1..];
    if explicit_cast_is_encoded(res) {
        return Err(Error::InvalidEncodedPayload {
            reason: String::from("double encoded value"),
        });
    }
    Ok(res)
}

fn hex_decode(hex: &str) -> Result<Vec<u8>> {
    let bytes = hex.as_bytes();
    let mut res = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let hi = hex_digit(pair[0])?;
        let lo = hex_digit(pair[1])?;
        res.push(hi << 4 | lo);
    }
    Ok(res)
}

fn hex_digit(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::InvalidEncodedPayload {
            reason: String::from("non-hex byte in binary payload"),
        }),
    }
}
