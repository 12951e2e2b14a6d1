//! Poll-facing facade. Owns the rate cache, the only state that survives
//! across polls; everything else is rebuilt per call from fresh transport
//! queries.

use serde::{Deserialize, Serialize};

use crate::device_info::{DeviceInfo, probe_device_info};
use crate::error::{Error, Result};
use crate::interfaces::{Category, InterfaceDescriptor, classify, enumerate_interfaces};
use crate::rate::RateCache;
use crate::storage::{StorageReport, probe_storage};
use crate::traffic::{TrafficSample, sample_traffic};
use crate::transport::Transport;

/// Maximum number of known interface names included in an
/// [`Error::UnknownInterface`] diagnostic.
const NAME_HINT_LIMIT: usize = 8;

/// Already-decoded session attributes supplied by an external control-plane
/// source (router API, accounting records). This core only consumes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Optional capability for enriching session-oriented (PPPoE) interfaces.
pub trait SessionLookup: Sync {
    fn lookup(&self, interface_name: &str) -> Option<SessionInfo>;
}

/// One classified interface, optionally enriched with session attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    #[serde(flatten)]
    pub descriptor: InterfaceDescriptor,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionInfo>,
}

/// Interface listing for one poll.
///
/// When a category filter matches nothing on a device that does report
/// interfaces, `interfaces` is empty and `filter_unmatched` is set; the
/// caller decides whether that means "really none" or "classification
/// heuristic misfired". The listing is never silently widened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceReport {
    pub interfaces: Vec<InterfaceRecord>,
    pub filter_unmatched: bool,
}

/// Stateless-per-poll sampler owning the process-lifetime rate cache.
///
/// Callers may poll many devices concurrently against one collector; each
/// poll brings its own transport session.
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    rates: RateCache,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access to the underlying rate cache.
    pub fn rates(&self) -> &RateCache {
        &self.rates
    }

    /// Enumerate and classify interfaces, optionally filtered by category
    /// and enriched through the injected session lookup.
    pub async fn interface_report<T: Transport>(
        &self,
        transport: &mut T,
        filter: Option<Category>,
        sessions: Option<&dyn SessionLookup>,
    ) -> Result<InterfaceReport> {
        let records: Vec<InterfaceRecord> = enumerate_interfaces(transport)
            .await?
            .into_iter()
            .map(|descriptor| {
                let category = classify(&descriptor);
                let session = match (category, sessions) {
                    (Category::Pppoe, Some(lookup)) => lookup.lookup(&descriptor.name),
                    _ => None,
                };
                InterfaceRecord {
                    descriptor,
                    category,
                    session,
                }
            })
            .collect();

        let Some(category) = filter else {
            return Ok(InterfaceReport {
                interfaces: records,
                filter_unmatched: false,
            });
        };

        let had_any = !records.is_empty();
        let filtered: Vec<InterfaceRecord> = records
            .into_iter()
            .filter(|r| r.category == category)
            .collect();

        let filter_unmatched = filtered.is_empty() && had_any;
        Ok(InterfaceReport {
            interfaces: filtered,
            filter_unmatched,
        })
    }

    /// Resolve an interface name to its descriptor. Matching is
    /// case-insensitive; an unknown name errors with a sample of known names
    /// as a diagnostic hint.
    pub async fn resolve_interface<T: Transport>(
        &self,
        transport: &mut T,
        name: &str,
    ) -> Result<InterfaceDescriptor> {
        let interfaces = enumerate_interfaces(transport).await?;

        if let Some(descriptor) = interfaces
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
        {
            return Ok(descriptor.clone());
        }

        Err(Error::UnknownInterface {
            name: name.to_string(),
            available: interfaces
                .iter()
                .take(NAME_HINT_LIMIT)
                .map(|d| d.name.clone())
                .collect(),
        })
    }

    /// Sample traffic counters for the given indices, deriving rates keyed
    /// by the device's cache key.
    pub async fn traffic<T: Transport>(
        &self,
        transport: &mut T,
        device_key: &str,
        indices: &[u32],
    ) -> Result<Vec<TrafficSample>> {
        sample_traffic(&self.rates, transport, device_key, indices).await
    }

    /// Identity/uptime probe with best-effort vendor fields.
    pub async fn device_info<T: Transport>(&self, transport: &mut T) -> Result<DeviceInfo> {
        probe_device_info(transport).await
    }

    /// Memory/disk usage probe.
    pub async fn storage<T: Transport>(&self, transport: &mut T) -> Result<StorageReport> {
        probe_storage(transport).await
    }
}
