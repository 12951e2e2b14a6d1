//! Device identity probe.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::oid::{
    HR_PROCESSOR_LOAD, MTXR_BOARD_NAME, MTXR_FIRMWARE_VERSION, MTXR_HEALTH_TEMPERATURE,
    MTXR_SERIAL_NUMBER, SYS_DESCR, SYS_NAME, SYS_OBJECT_ID, SYS_UPTIME,
};
use crate::transport::Transport;
use crate::value::DecodedValue;

/// Uptime broken down for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
}

/// Vendor-extension fields. All best effort: a device that does not expose
/// them simply omits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Degrees Celsius.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Identity record for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub description: String,
    pub name: String,
    pub object_id: String,
    /// Raw uptime in hundredths of a second, as reported.
    pub uptime_ticks: u64,
    pub uptime: Uptime,
    /// hrProcessorLoad of the first processor, percent. Best effort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_load_pct: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<VendorInfo>,
}

/// Fetch identity, description, and uptime, plus a best-effort second query
/// for vendor-extension fields. Vendor absence is never an error.
pub async fn probe_device_info<T: Transport>(transport: &mut T) -> Result<DeviceInfo> {
    let system = to_map(
        transport
            .get(&[
                SYS_DESCR.to_string(),
                SYS_OBJECT_ID.to_string(),
                SYS_UPTIME.to_string(),
                SYS_NAME.to_string(),
            ])
            .await?,
    );

    let uptime_ticks = system
        .get(SYS_UPTIME)
        .and_then(DecodedValue::as_u64)
        .unwrap_or(0);

    let cpu_load_pct = match transport.get(&[HR_PROCESSOR_LOAD.to_string()]).await {
        Ok(varbinds) => varbinds.first().and_then(|(_, v)| v.as_u64()),
        Err(e) => {
            tracing::debug!(error = %e, "processor load unavailable");
            None
        }
    };

    let vendor = match transport
        .get(&[
            MTXR_BOARD_NAME.to_string(),
            MTXR_FIRMWARE_VERSION.to_string(),
            MTXR_SERIAL_NUMBER.to_string(),
            MTXR_HEALTH_TEMPERATURE.to_string(),
        ])
        .await
    {
        Ok(varbinds) => {
            let fields = to_map(varbinds);
            Some(VendorInfo {
                board_name: text_field(&fields, MTXR_BOARD_NAME),
                firmware_version: text_field(&fields, MTXR_FIRMWARE_VERSION),
                serial_number: text_field(&fields, MTXR_SERIAL_NUMBER),
                // Reported in tenths of a degree.
                temperature: fields
                    .get(MTXR_HEALTH_TEMPERATURE)
                    .and_then(DecodedValue::as_i64)
                    .map(|t| t as f64 / 10.0),
            })
        }
        Err(e) => {
            tracing::debug!(error = %e, "vendor extension fields unavailable");
            None
        }
    };

    Ok(DeviceInfo {
        description: text_field(&system, SYS_DESCR).unwrap_or_default(),
        name: text_field(&system, SYS_NAME).unwrap_or_default(),
        object_id: text_field(&system, SYS_OBJECT_ID).unwrap_or_default(),
        uptime_ticks,
        uptime: uptime_from_ticks(uptime_ticks),
        cpu_load_pct,
        vendor,
    })
}

/// Convert uptime in hundredths of a second to a days/hours/minutes
/// breakdown.
pub fn uptime_from_ticks(ticks: u64) -> Uptime {
    let secs = ticks / 100;
    Uptime {
        days: secs / 86_400,
        hours: (secs % 86_400) / 3_600,
        minutes: (secs % 3_600) / 60,
    }
}

fn to_map(varbinds: Vec<(String, DecodedValue)>) -> HashMap<String, DecodedValue> {
    varbinds.into_iter().collect()
}

fn text_field(fields: &HashMap<String, DecodedValue>, oid: &str) -> Option<String> {
    fields
        .get(oid)
        .and_then(DecodedValue::as_text)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}
