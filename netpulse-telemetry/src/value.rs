//! Typed decoding of raw SNMP values.
//!
//! This is the single point where "what kind of thing is this bag of bytes"
//! is decided. Everything downstream works with [`DecodedValue`]; no other
//! module inspects `snmp2::Value` directly.

use serde::{Deserialize, Serialize};
use snmp2::Value;

use crate::oid::oid_to_string;

/// A wire value normalized into a small set of semantic types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecodedValue {
    /// Signed integer (status codes, type codes, table scalars).
    Integer(i64),
    /// Monotonically increasing counter or other unsigned quantity.
    Counter(u64),
    /// Printable text (names, descriptions, version strings).
    Text(String),
    /// Opaque bytes (MAC addresses, vendor tokens).
    Binary(Vec<u8>),
    /// Absent or undecodable value.
    Null,
}

impl DecodedValue {
    /// Unsigned view of the value, if it has one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DecodedValue::Counter(n) => Some(*n),
            DecodedValue::Integer(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    /// Signed view of the value, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DecodedValue::Integer(n) => Some(*n),
            DecodedValue::Counter(n) if *n <= i64::MAX as u64 => Some(*n as i64),
            _ => None,
        }
    }

    /// Text view of the value, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DecodedValue::Null)
    }
}

/// Decode an SNMP value into a [`DecodedValue`]. Total and non-throwing.
///
/// Typed numerics map directly. Octet strings carry both display strings and
/// opaque payloads on the same wire type, so printable text is recognized
/// first and the remaining buffers go through [`decode_octets`].
pub fn decode(value: &Value) -> DecodedValue {
    match value {
        Value::Integer(n) => DecodedValue::Integer(*n),
        Value::Counter32(n) => DecodedValue::Counter(*n as u64),
        Value::Unsigned32(n) => DecodedValue::Counter(*n as u64),
        Value::Timeticks(n) => DecodedValue::Counter(*n as u64),
        Value::Counter64(n) => DecodedValue::Counter(*n),
        Value::OctetString(bytes) => {
            let bytes: &[u8] = bytes;
            if bytes.is_empty() {
                DecodedValue::Integer(0)
            } else if is_printable(bytes) {
                DecodedValue::Text(trimmed_text(bytes))
            } else {
                decode_octets(bytes)
            }
        }
        Value::ObjectIdentifier(oid) => DecodedValue::Text(oid_to_string(oid)),
        Value::IpAddress(ip) => {
            DecodedValue::Text(format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]))
        }
        Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {
            DecodedValue::Null
        }
        _ => DecodedValue::Null,
    }
}

/// Decode an untyped byte buffer.
///
/// Fixed widths of 8/4 bytes decode big-endian to a counter, 2/1 bytes to an
/// integer, and an empty buffer to integer zero. Any other buffer becomes
/// trimmed text when every byte is printable ASCII or NUL, otherwise it is
/// kept as opaque binary.
pub fn decode_octets(bytes: &[u8]) -> DecodedValue {
    match bytes.len() {
        0 => DecodedValue::Integer(0),
        8 => DecodedValue::Counter(u64::from_be_bytes(bytes.try_into().unwrap_or([0; 8]))),
        4 => DecodedValue::Counter(u32::from_be_bytes(bytes.try_into().unwrap_or([0; 4])) as u64),
        2 => DecodedValue::Integer(u16::from_be_bytes(bytes.try_into().unwrap_or([0; 2])) as i64),
        1 => DecodedValue::Integer(bytes[0] as i64),
        _ => {
            if is_printable(bytes) {
                DecodedValue::Text(trimmed_text(bytes))
            } else {
                DecodedValue::Binary(bytes.to_vec())
            }
        }
    }
}

fn is_printable(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|&b| b == 0 || b == b'\t' || b == b'\n' || b == b'\r' || (0x20..=0x7e).contains(&b))
}

fn trimmed_text(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}
