//! Interface discovery and classification.
//!
//! The enumerator walks the parallel IF-MIB attribute columns and merges rows
//! by their trailing index into one descriptor per interface. The classifier
//! maps a descriptor to a semantic category: type codes first, name
//! heuristics second, because not every agent reports a distinguishing type
//! code for logical interfaces.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::oid::{
    IF_ADMIN_STATUS, IF_DESCR, IF_HIGH_SPEED, IF_NAME, IF_OPER_STATUS, IF_PHYS_ADDRESS, IF_TYPE,
    index_after,
};
use crate::transport::Transport;
use crate::value::DecodedValue;

const ADMIN_STATUS_DOWN: i64 = 2;
const OPER_STATUS_UP: i64 = 1;

/// ifType codes treated as physical ports: ethernetCsmacd, fastEther,
/// gigabitEthernet, l2vlan, l3ipvlan, ieee8023adLag, bridge.
const PHYSICAL_TYPE_CODES: &[i64] = &[6, 62, 117, 135, 136, 161, 209];

/// ifType codes for PPP links: ppp, pppMultilinkBundle.
const PPP_TYPE_CODES: &[i64] = &[23, 108];

/// Low-information name prefixes stripped for readability.
const NOISE_PREFIXES: &[&str] = &["interface ", "interface-", "port ", "port-"];

/// One discovered interface, merged from the walked attribute columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub index: u32,
    pub name: String,
    pub description: String,
    pub admin_up: bool,
    pub oper_up: bool,
    pub type_code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mbps: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<Vec<u8>>,
}

impl InterfaceDescriptor {
    /// Colon-separated rendering of the physical address, if present.
    pub fn mac_string(&self) -> Option<String> {
        self.mac_address.as_ref().map(|mac| {
            mac.iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":")
        })
    }
}

/// Semantic interface category. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Physical,
    Pppoe,
    Hotspot,
    Other,
}

#[derive(Debug, Default)]
struct RawInterface {
    name: Option<String>,
    description: Option<String>,
    admin_status: Option<i64>,
    oper_status: Option<i64>,
    type_code: Option<i64>,
    speed_mbps: Option<u64>,
    mac_address: Option<Vec<u8>>,
}

/// Walk the IF-MIB attribute columns and merge them into one descriptor per
/// discovered interface index.
pub async fn enumerate_interfaces<T: Transport>(
    transport: &mut T,
) -> Result<Vec<InterfaceDescriptor>> {
    let mut rows: BTreeMap<u32, RawInterface> = BTreeMap::new();

    merge_column(transport, IF_NAME, &mut rows, |row, value| {
        row.name = value.as_text().map(str::to_string);
    })
    .await?;
    merge_column(transport, IF_DESCR, &mut rows, |row, value| {
        row.description = value.as_text().map(str::to_string);
    })
    .await?;
    merge_column(transport, IF_ADMIN_STATUS, &mut rows, |row, value| {
        row.admin_status = value.as_i64();
    })
    .await?;
    merge_column(transport, IF_OPER_STATUS, &mut rows, |row, value| {
        row.oper_status = value.as_i64();
    })
    .await?;
    merge_column(transport, IF_TYPE, &mut rows, |row, value| {
        row.type_code = value.as_i64();
    })
    .await?;
    merge_column(transport, IF_HIGH_SPEED, &mut rows, |row, value| {
        row.speed_mbps = value.as_u64();
    })
    .await?;
    merge_column(transport, IF_PHYS_ADDRESS, &mut rows, |row, value| {
        if let DecodedValue::Binary(mac) = value {
            row.mac_address = Some(mac);
        }
    })
    .await?;

    Ok(rows
        .into_iter()
        .map(|(index, raw)| finalize(index, raw))
        .collect())
}

async fn merge_column<T: Transport>(
    transport: &mut T,
    column: &str,
    rows: &mut BTreeMap<u32, RawInterface>,
    mut apply: impl FnMut(&mut RawInterface, DecodedValue),
) -> Result<()> {
    for (oid, value) in transport.walk(column).await? {
        let Some(index) = index_after(&oid, column) else {
            tracing::debug!(oid = %oid, column = %column, "ignoring entry with non-numeric index");
            continue;
        };
        apply(rows.entry(index).or_default(), value);
    }
    Ok(())
}

fn finalize(index: u32, raw: RawInterface) -> InterfaceDescriptor {
    let name = resolve_name(index, raw.name.as_deref(), raw.description.as_deref());

    InterfaceDescriptor {
        index,
        name,
        description: raw.description.unwrap_or_default(),
        admin_up: raw.admin_status.is_none_or(|s| s != ADMIN_STATUS_DOWN),
        oper_up: raw.oper_status == Some(OPER_STATUS_UP),
        type_code: raw.type_code.unwrap_or(0),
        speed_mbps: raw.speed_mbps,
        mac_address: raw.mac_address,
    }
}

/// Name resolution policy: the walked name unless it is empty or a generic
/// `if-<n>` placeholder, else the description; bracket-wrapped dynamic names
/// (`<pppoe-alice>`) unwrap to their token; known noise prefixes are stripped.
fn resolve_name(index: u32, name: Option<&str>, description: Option<&str>) -> String {
    let name = name.map(str::trim).unwrap_or_default();
    let description = description.map(str::trim).unwrap_or_default();

    let candidate = if !name.is_empty() && !is_placeholder(name) {
        name
    } else if !description.is_empty() {
        description
    } else if !name.is_empty() {
        name
    } else {
        return format!("if-{index}");
    };

    let unwrapped = candidate
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(candidate);

    strip_noise_prefix(unwrapped).to_string()
}

/// Matches agent-generated placeholders of the form `if-<n>` / `if<n>`.
fn is_placeholder(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("if") else {
        return false;
    };
    let digits = rest.strip_prefix('-').unwrap_or(rest);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn strip_noise_prefix(name: &str) -> &str {
    for prefix in NOISE_PREFIXES {
        if let Some(head) = name.get(..prefix.len())
            && head.eq_ignore_ascii_case(prefix)
            && name.len() > prefix.len()
        {
            return &name[prefix.len()..];
        }
    }
    name
}

/// Map a descriptor to its category. Pure, total, deterministic.
pub fn classify(descriptor: &InterfaceDescriptor) -> Category {
    let text = format!("{} {}", descriptor.name, descriptor.description).to_ascii_lowercase();

    if PHYSICAL_TYPE_CODES.contains(&descriptor.type_code) {
        Category::Physical
    } else if PPP_TYPE_CODES.contains(&descriptor.type_code)
        || text.contains("pppoe")
        || text.contains("ppp-")
    {
        Category::Pppoe
    } else if ["hotspot", "wlan", "wifi", "wireless", "hs-"]
        .iter()
        .any(|t| text.contains(t))
    {
        Category::Hotspot
    } else if ["eth", "sfp", "bridge", "bond", "vlan", "trunk"]
        .iter()
        .any(|t| text.contains(t))
    {
        Category::Physical
    } else {
        Category::Other
    }
}
