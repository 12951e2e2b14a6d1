//! OID helpers and the fixed set of well-known identifiers this sampler
//! queries. Full MIB coverage is out of scope; everything the sampler asks a
//! device is listed here.

use std::cmp::Ordering;

use snmp2::Oid;

use crate::error::{Error, Result};

// SNMPv2-MIB system scalars.
pub const SYS_DESCR: &str = "1.3.6.1.2.1.1.1.0";
pub const SYS_OBJECT_ID: &str = "1.3.6.1.2.1.1.2.0";
pub const SYS_UPTIME: &str = "1.3.6.1.2.1.1.3.0";
pub const SYS_NAME: &str = "1.3.6.1.2.1.1.5.0";

// IF-MIB ifTable columns.
pub const IF_DESCR: &str = "1.3.6.1.2.1.2.2.1.2";
pub const IF_TYPE: &str = "1.3.6.1.2.1.2.2.1.3";
pub const IF_PHYS_ADDRESS: &str = "1.3.6.1.2.1.2.2.1.6";
pub const IF_ADMIN_STATUS: &str = "1.3.6.1.2.1.2.2.1.7";
pub const IF_OPER_STATUS: &str = "1.3.6.1.2.1.2.2.1.8";
pub const IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
pub const IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";

// IF-MIB ifXTable columns (names and 64-bit counters).
pub const IF_NAME: &str = "1.3.6.1.2.1.31.1.1.1.1";
pub const IF_HC_IN_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.6";
pub const IF_HC_OUT_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.10";
pub const IF_HIGH_SPEED: &str = "1.3.6.1.2.1.31.1.1.1.15";

// HOST-RESOURCES-MIB storage table columns and row types.
pub const HR_STORAGE_TYPE: &str = "1.3.6.1.2.1.25.2.3.1.2";
pub const HR_STORAGE_DESCR: &str = "1.3.6.1.2.1.25.2.3.1.3";
pub const HR_STORAGE_ALLOCATION_UNITS: &str = "1.3.6.1.2.1.25.2.3.1.4";
pub const HR_STORAGE_SIZE: &str = "1.3.6.1.2.1.25.2.3.1.5";
pub const HR_STORAGE_USED: &str = "1.3.6.1.2.1.25.2.3.1.6";
pub const HR_STORAGE_TYPE_RAM: &str = "1.3.6.1.2.1.25.2.1.2";
pub const HR_STORAGE_TYPE_FIXED_DISK: &str = "1.3.6.1.2.1.25.2.1.4";
pub const HR_PROCESSOR_LOAD: &str = "1.3.6.1.2.1.25.3.3.1.2.1";

// MikroTik vendor-extension scalars (best effort, absent on other vendors).
pub const MTXR_SERIAL_NUMBER: &str = "1.3.6.1.4.1.14988.1.1.7.3.0";
pub const MTXR_FIRMWARE_VERSION: &str = "1.3.6.1.4.1.14988.1.1.7.4.0";
pub const MTXR_BOARD_NAME: &str = "1.3.6.1.4.1.14988.1.1.7.8.0";
pub const MTXR_HEALTH_TEMPERATURE: &str = "1.3.6.1.4.1.14988.1.1.3.10.0";

/// Parse an OID string (e.g., "1.3.6.1.2.1.1.3.0") into an snmp2::Oid.
pub fn parse_oid(oid_str: &str) -> Result<Oid<'static>> {
    oid_str
        .parse::<Oid>()
        .map_err(|e| Error::Protocol(format!("failed to parse OID '{}': {:?}", oid_str, e)))
        .map(|oid| oid.to_owned())
}

/// Convert an snmp2::Oid back to a dotted string representation.
pub fn oid_to_string(oid: &Oid) -> String {
    oid.to_id_string()
}

/// Check if an OID is a child of (or equal to) a parent OID.
pub fn oid_starts_with(oid: &Oid, parent: &Oid) -> bool {
    oid.starts_with(parent)
}

/// Numeric ordering of two dotted identifier strings: "1.3.6.10" sorts after
/// "1.3.6.9", unlike a plain string comparison.
pub fn oid_order(a: &str, b: &str) -> Ordering {
    let left = a.split('.').map(|part| part.parse::<u64>().unwrap_or(0));
    let right = b.split('.').map(|part| part.parse::<u64>().unwrap_or(0));
    left.cmp(right)
}

/// Append a table index to a column OID.
pub fn table_oid(column: &str, index: u32) -> String {
    format!("{column}.{index}")
}

/// Extract the trailing numeric index of a table entry, e.g.
/// `index_after("1.3.6.1.2.1.2.2.1.2.5", IF_DESCR)` is `Some(5)`.
pub fn index_after(oid: &str, column: &str) -> Option<u32> {
    oid.strip_prefix(column)?
        .strip_prefix('.')?
        .parse::<u32>()
        .ok()
}
