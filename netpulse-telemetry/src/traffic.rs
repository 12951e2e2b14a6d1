//! Bulk per-interface traffic sampling.
//!
//! Fans a device plus a list of interface indices into batched GETs sized to
//! stay under the transport datagram limit, then reassembles per-interface
//! in/out rates. Batches go out sequentially, not in parallel, to avoid
//! overwhelming embedded agents that serialize request handling internally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::oid::{IF_HC_IN_OCTETS, IF_HC_OUT_OCTETS, IF_IN_OCTETS, IF_OUT_OCTETS, table_oid};
use crate::rate::{CounterSample, RateCache};
use crate::transport::Transport;

/// Conservative cap on variable bindings per request, keeping a full request
/// and its response under a 1400-byte datagram.
pub const MAX_BINDINGS_PER_REQUEST: usize = 24;

/// Per-interface traffic reading for one poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub index: u32,
    /// Instantaneous receive rate, bytes per second. Zero on the first poll
    /// of an interface (baseline, not a measurement).
    pub in_bps: f64,
    /// Instantaneous transmit rate, bytes per second.
    pub out_bps: f64,
    pub total_in_bytes: u64,
    pub total_out_bytes: u64,
}

/// Sample in/out octet counters for the given interface indices and derive
/// rates through the cache.
///
/// The 64-bit counters are tried first; if the agent reports them missing the
/// whole batch set is retried once with the 32-bit counters, after which any
/// error propagates. The output always has one entry per input index, in
/// input order, regardless of batch size. A counter that decoded non-numeric
/// reads as total 0 and rate 0 but is not fed to the cache, so it cannot
/// plant a bogus zero baseline for the next poll.
pub async fn sample_traffic<T: Transport>(
    rates: &RateCache,
    transport: &mut T,
    device_key: &str,
    indices: &[u32],
) -> Result<Vec<TrafficSample>> {
    sample_traffic_batched(rates, transport, device_key, indices, MAX_BINDINGS_PER_REQUEST).await
}

/// [`sample_traffic`] with an explicit batch size.
pub async fn sample_traffic_batched<T: Transport>(
    rates: &RateCache,
    transport: &mut T,
    device_key: &str,
    indices: &[u32],
    batch_size: usize,
) -> Result<Vec<TrafficSample>> {
    if indices.is_empty() {
        return Ok(Vec::new());
    }

    let (counters, in_column, out_column) =
        match fetch_counters(transport, IF_HC_IN_OCTETS, IF_HC_OUT_OCTETS, indices, batch_size)
            .await
        {
            Ok(counters) => (counters, IF_HC_IN_OCTETS, IF_HC_OUT_OCTETS),
            Err(Error::NoSuchObject) => {
                tracing::debug!(
                    device = %device_key,
                    "64-bit octet counters unsupported, falling back to 32-bit"
                );
                let counters =
                    fetch_counters(transport, IF_IN_OCTETS, IF_OUT_OCTETS, indices, batch_size)
                        .await?;
                (counters, IF_IN_OCTETS, IF_OUT_OCTETS)
            }
            Err(e) => return Err(e),
        };

    let samples = indices
        .iter()
        .map(|&index| {
            let total_in = counter_value(&counters, in_column, index);
            let total_out = counter_value(&counters, out_column, index);

            let in_bps = total_in.map_or(0.0, |total| {
                rates.observe(device_key, &format!("if.{index}.in"), CounterSample::now(total))
            });
            let out_bps = total_out.map_or(0.0, |total| {
                rates.observe(
                    device_key,
                    &format!("if.{index}.out"),
                    CounterSample::now(total),
                )
            });

            TrafficSample {
                index,
                in_bps,
                out_bps,
                total_in_bytes: total_in.unwrap_or(0),
                total_out_bytes: total_out.unwrap_or(0),
            }
        })
        .collect();

    Ok(samples)
}

/// Issue the batched GETs for one (in, out) column pair and merge the
/// responses into a single identifier -> value map.
async fn fetch_counters<T: Transport>(
    transport: &mut T,
    in_column: &str,
    out_column: &str,
    indices: &[u32],
    batch_size: usize,
) -> Result<HashMap<String, u64>> {
    let oids: Vec<String> = indices
        .iter()
        .flat_map(|&index| [table_oid(in_column, index), table_oid(out_column, index)])
        .collect();

    let mut counters = HashMap::with_capacity(oids.len());
    for batch in oids.chunks(batch_size.max(1)) {
        for (oid, value) in transport.get(batch).await? {
            if let Some(n) = value.as_u64() {
                counters.insert(oid, n);
            } else {
                tracing::debug!(oid = %oid, "counter response was not numeric");
            }
        }
    }

    Ok(counters)
}

fn counter_value(counters: &HashMap<String, u64>, column: &str, index: u32) -> Option<u64> {
    counters.get(&table_oid(column, index)).copied()
}
