//! NetPulse Telemetry Core
//!
//! Periodically queries network devices over SNMP and turns untyped wire
//! values into structured telemetry records:
//!
//! - [`value`] - decoding raw wire values into a small tagged set of types
//! - [`transport`] - per-poll sessions with get/walk operations
//! - [`rate`] - counter-delta rate estimation and the process-lifetime cache
//! - [`interfaces`] - interface discovery and semantic classification
//! - [`traffic`] - batched per-interface throughput sampling
//! - [`device_info`] / [`storage`] - fixed identity and usage probes
//! - [`collector`] - the facade tying it together
//!
//! This crate is a pure in-process computation layer: scheduling,
//! persistence, and any request/response surface belong to the caller, which
//! supplies device addresses and credentials per poll and consumes the
//! returned records.

pub mod collector;
pub mod device_info;
pub mod error;
pub mod interfaces;
pub mod oid;
pub mod rate;
pub mod storage;
pub mod traffic;
pub mod transport;
pub mod value;

// Re-export commonly used types at the crate root
pub use collector::{
    InterfaceRecord, InterfaceReport, SessionInfo, SessionLookup, TelemetryCollector,
};
pub use device_info::{DeviceInfo, Uptime, VendorInfo, probe_device_info, uptime_from_ticks};
pub use error::{Error, Result};
pub use interfaces::{Category, InterfaceDescriptor, classify, enumerate_interfaces};
pub use rate::{CounterSample, RateCache, current_timestamp_millis};
pub use storage::{StorageReport, StorageRow, StorageSummary, probe_storage};
pub use traffic::{
    MAX_BINDINGS_PER_REQUEST, TrafficSample, sample_traffic, sample_traffic_batched,
};
pub use transport::{Device, SnmpTransport, SnmpVersion, Transport, Varbind};
pub use value::{DecodedValue, decode, decode_octets};
