//! Per-poll SNMP transport session.
//!
//! A session is opened per poll, used for GETs and subtree walks, and closed
//! on every exit path when dropped. Every request is bounded by the device
//! timeout and retried exactly once; there is no backoff because the caller's
//! next scheduled poll is the real retry.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use snmp2::{AsyncSession, Oid, Value};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::oid::{oid_order, oid_starts_with, oid_to_string, parse_oid};
use crate::value::{DecodedValue, decode};

/// One (identifier, decoded value) pair from a query response.
pub type Varbind = (String, DecodedValue);

/// SNMP protocol version. Only changes wire framing, not behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpVersion {
    #[serde(rename = "v1")]
    V1,
    #[default]
    #[serde(rename = "v2c")]
    V2c,
}

/// Target device for one poll. Supplied by the caller, never stored here.
#[derive(Debug, Clone)]
pub struct Device {
    pub host: String,
    pub port: u16,
    pub community: String,
    pub version: SnmpVersion,
    pub timeout: Duration,
}

impl Device {
    pub fn new(host: impl Into<String>, community: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 161,
            community: community.into(),
            version: SnmpVersion::V2c,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rate-cache key. Includes the credential, not just the host, since the
    /// same host may be polled under different assumed identities.
    pub fn cache_key(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.community)
    }
}

/// Query operations against one device.
///
/// `get` fails wholesale if any requested identifier errors at the transport
/// level; `walk` skips individual undecodable entries and only fails on a
/// transport fault.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&mut self, oids: &[String]) -> Result<Vec<Varbind>>;
    async fn walk(&mut self, base: &str) -> Result<Vec<Varbind>>;
}

/// snmp2-backed transport session for one device.
pub struct SnmpTransport {
    session: AsyncSession,
    endpoint: String,
    version: SnmpVersion,
    timeout: Duration,
}

impl SnmpTransport {
    /// Open a session to the device. The socket is closed when the transport
    /// is dropped, on success and failure paths alike.
    pub async fn connect(device: &Device) -> Result<Self> {
        let endpoint = device.endpoint();
        let community = device.community.as_bytes();

        let session = match device.version {
            SnmpVersion::V1 => AsyncSession::new_v1(&endpoint, community, 0)
                .await
                .map_err(|e| Error::Protocol(format!("{e:?}")))?,
            SnmpVersion::V2c => AsyncSession::new_v2c(&endpoint, community, 0)
                .await
                .map_err(|e| Error::Protocol(format!("{e:?}")))?,
        };

        Ok(Self {
            session,
            endpoint,
            version: device.version,
            timeout: device.timeout,
        })
    }

    /// One multi-binding request for a whole batch. Every identifier rides
    /// as a non-repeater, so the agent answers each exactly once and the
    /// batch costs a single datagram round trip.
    async fn get_packed(&mut self, oids: &[String]) -> Result<Vec<Varbind>> {
        let parsed = oids
            .iter()
            .map(|s| parse_oid(s))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&Oid> = parsed.iter().collect();

        for _attempt in 0..2 {
            match timeout(
                self.timeout,
                self.session.getbulk(&refs, refs.len() as u32, 0),
            )
            .await
            {
                Ok(Ok(response)) => {
                    return pack_response(oids, response.varbinds.into_iter());
                }
                Ok(Err(e)) => return Err(Error::from_snmp(e)),
                Err(_) => {
                    tracing::debug!(
                        endpoint = %self.endpoint,
                        bindings = oids.len(),
                        "batched GET timed out, retrying once"
                    );
                }
            }
        }

        Err(Error::Timeout {
            device: self.endpoint.clone(),
            timeout: self.timeout,
        })
    }

    async fn get_one(&mut self, oid: &Oid<'static>) -> Result<Varbind> {
        for _attempt in 0..2 {
            match timeout(self.timeout, self.session.get(oid)).await {
                Ok(Ok(response)) => {
                    let Some((resp_oid, value)) = response.varbinds.into_iter().next() else {
                        return Err(Error::Protocol("empty GET response".to_string()));
                    };
                    if matches!(value, Value::NoSuchObject | Value::NoSuchInstance) {
                        return Err(Error::NoSuchObject);
                    }
                    return Ok((oid_to_string(&resp_oid), decode(&value)));
                }
                Ok(Err(e)) => return Err(Error::from_snmp(e)),
                Err(_) => {
                    tracing::debug!(endpoint = %self.endpoint, oid = %oid_to_string(oid), "GET timed out, retrying once");
                }
            }
        }

        Err(Error::Timeout {
            device: self.endpoint.clone(),
            timeout: self.timeout,
        })
    }

    /// One GETNEXT step. Returns `None` at end of MIB.
    async fn next_one(&mut self, current: &Oid<'static>) -> Result<Option<(Oid<'static>, DecodedValue)>> {
        for _attempt in 0..2 {
            match timeout(self.timeout, self.session.getnext(current)).await {
                Ok(Ok(response)) => {
                    let Some((resp_oid, value)) = response.varbinds.into_iter().next() else {
                        return Ok(None);
                    };
                    if matches!(value, Value::EndOfMibView) {
                        return Ok(None);
                    }
                    return Ok(Some((resp_oid.to_owned(), decode(&value))));
                }
                Ok(Err(e)) => return Err(Error::from_snmp(e)),
                Err(_) => {
                    tracing::debug!(endpoint = %self.endpoint, oid = %oid_to_string(current), "GETNEXT timed out, retrying once");
                }
            }
        }

        Err(Error::Timeout {
            device: self.endpoint.clone(),
            timeout: self.timeout,
        })
    }
}

/// Pair a batched response positionally with the requested identifiers. Any
/// missing-object binding fails the whole batch; a short response is a
/// protocol fault.
fn pack_response<'a>(
    requested: &[String],
    varbinds: impl Iterator<Item = (Oid<'a>, Value<'a>)>,
) -> Result<Vec<Varbind>> {
    let mut results = Vec::with_capacity(requested.len());
    for (oid_str, (_resp_oid, value)) in requested.iter().zip(varbinds) {
        if matches!(
            value,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        ) {
            return Err(Error::NoSuchObject);
        }
        results.push((oid_str.clone(), decode(&value)));
    }

    if results.len() < requested.len() {
        return Err(Error::Protocol(format!(
            "agent answered {} of {} requested bindings",
            results.len(),
            requested.len()
        )));
    }

    Ok(results)
}

impl Transport for SnmpTransport {
    async fn get(&mut self, oids: &[String]) -> Result<Vec<Varbind>> {
        if oids.is_empty() {
            return Ok(Vec::new());
        }

        match self.version {
            SnmpVersion::V2c => self.get_packed(oids).await,
            // GETBULK does not exist in the v1 protocol, so v1 pays one
            // request per binding.
            SnmpVersion::V1 => {
                let mut results = Vec::with_capacity(oids.len());
                for oid_str in oids {
                    let oid = parse_oid(oid_str)?;
                    results.push(self.get_one(&oid).await?);
                }
                Ok(results)
            }
        }
    }

    async fn walk(&mut self, base: &str) -> Result<Vec<Varbind>> {
        let subtree = parse_oid(base)?;
        let mut current = subtree.clone();
        let mut results = Vec::new();

        loop {
            let Some((resp_oid, value)) = self.next_one(&current).await? else {
                break;
            };

            // Left the subtree: the walk is done.
            if !oid_starts_with(&resp_oid, &subtree) {
                break;
            }

            // An agent that answers with a non-increasing identifier would
            // walk us in circles; stop and keep what was collected.
            let resp_str = oid_to_string(&resp_oid);
            if oid_order(&resp_str, &oid_to_string(&current)) != Ordering::Greater {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    oid = %resp_str,
                    "agent returned non-increasing identifier, stopping walk"
                );
                break;
            }

            // A single undecodable entry is skipped, never fatal, so one
            // malformed agent row cannot blank out an entire table.
            if value.is_null() {
                tracing::debug!(
                    endpoint = %self.endpoint,
                    oid = %resp_str,
                    "skipping undecodable walk entry"
                );
            } else {
                results.push((resp_str, value));
            }

            current = resp_oid;
        }

        Ok(results)
    }
}
