//! Memory and disk usage probe over the host-resources storage table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::oid::{
    HR_STORAGE_ALLOCATION_UNITS, HR_STORAGE_DESCR, HR_STORAGE_SIZE, HR_STORAGE_TYPE,
    HR_STORAGE_TYPE_FIXED_DISK, HR_STORAGE_TYPE_RAM, HR_STORAGE_USED, index_after,
};
use crate::transport::Transport;
use crate::value::DecodedValue;

const MEMORY_TOKENS: &[&str] = &["memory", "ram"];
const DISK_TOKENS: &[&str] = &["disk", "flash", "storage", "nand"];

/// One merged row of the storage table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageRow {
    pub index: u32,
    pub type_oid: String,
    pub description: String,
    pub allocation_unit_bytes: u64,
    pub size_units: u64,
    pub used_units: u64,
}

/// Usage summary for one storage row, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageSummary {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub used_pct: u32,
}

/// Memory and disk summaries for one device. Either side may be absent when
/// the agent exposes no matching row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<StorageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<StorageSummary>,
}

/// Walk the storage table columns, merge rows by index, and reduce them to
/// memory/disk summaries.
pub async fn probe_storage<T: Transport>(transport: &mut T) -> Result<StorageReport> {
    let rows = enumerate_storage(transport).await?;

    let memory = rows.iter().find(|r| is_memory_row(r)).map(summarize);
    let disk = rows.iter().find(|r| is_disk_row(r)).map(summarize);

    Ok(StorageReport { memory, disk })
}

/// Walk the five parallel storage columns and merge by row index.
pub async fn enumerate_storage<T: Transport>(transport: &mut T) -> Result<Vec<StorageRow>> {
    let mut rows: BTreeMap<u32, StorageRow> = BTreeMap::new();

    merge_column(transport, HR_STORAGE_TYPE, &mut rows, |row, value| {
        if let Some(oid) = value.as_text() {
            row.type_oid = oid.to_string();
        }
    })
    .await?;
    merge_column(transport, HR_STORAGE_DESCR, &mut rows, |row, value| {
        if let Some(descr) = value.as_text() {
            row.description = descr.to_string();
        }
    })
    .await?;
    merge_column(transport, HR_STORAGE_ALLOCATION_UNITS, &mut rows, |row, value| {
        row.allocation_unit_bytes = value.as_u64().unwrap_or(0);
    })
    .await?;
    merge_column(transport, HR_STORAGE_SIZE, &mut rows, |row, value| {
        row.size_units = value.as_u64().unwrap_or(0);
    })
    .await?;
    merge_column(transport, HR_STORAGE_USED, &mut rows, |row, value| {
        row.used_units = value.as_u64().unwrap_or(0);
    })
    .await?;

    Ok(rows
        .into_iter()
        .map(|(index, mut row)| {
            row.index = index;
            row
        })
        .collect())
}

async fn merge_column<T: Transport>(
    transport: &mut T,
    column: &str,
    rows: &mut BTreeMap<u32, StorageRow>,
    mut apply: impl FnMut(&mut StorageRow, DecodedValue),
) -> Result<()> {
    for (oid, value) in transport.walk(column).await? {
        let Some(index) = index_after(&oid, column) else {
            continue;
        };
        apply(rows.entry(index).or_default(), value);
    }
    Ok(())
}

fn is_memory_row(row: &StorageRow) -> bool {
    row.type_oid == HR_STORAGE_TYPE_RAM || matches_token(&row.description, MEMORY_TOKENS)
}

fn is_disk_row(row: &StorageRow) -> bool {
    row.type_oid == HR_STORAGE_TYPE_FIXED_DISK || matches_token(&row.description, DISK_TOKENS)
}

fn matches_token(description: &str, tokens: &[&str]) -> bool {
    let description = description.to_ascii_lowercase();
    tokens.iter().any(|t| description.contains(t))
}

fn summarize(row: &StorageRow) -> StorageSummary {
    let used_bytes = row.used_units.saturating_mul(row.allocation_unit_bytes);
    let total_bytes = row.size_units.saturating_mul(row.allocation_unit_bytes);
    let used_pct = if total_bytes == 0 {
        0
    } else {
        (used_bytes as f64 / total_bytes as f64 * 100.0).round() as u32
    };

    StorageSummary {
        used_bytes,
        total_bytes,
        used_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(type_oid: &str, description: &str, alloc: u64, size: u64, used: u64) -> StorageRow {
        StorageRow {
            index: 1,
            type_oid: type_oid.to_string(),
            description: description.to_string(),
            allocation_unit_bytes: alloc,
            size_units: size,
            used_units: used,
        }
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&row(HR_STORAGE_TYPE_RAM, "main memory", 1024, 1000, 250));
        assert_eq!(summary.total_bytes, 1_024_000);
        assert_eq!(summary.used_bytes, 256_000);
        assert_eq!(summary.used_pct, 25);
    }

    #[test]
    fn test_summarize_zero_size() {
        let summary = summarize(&row(HR_STORAGE_TYPE_RAM, "main memory", 1024, 0, 0));
        assert_eq!(summary.used_pct, 0);
    }

    #[test]
    fn test_row_classification() {
        assert!(is_memory_row(&row(HR_STORAGE_TYPE_RAM, "", 1, 1, 1)));
        assert!(is_memory_row(&row("1.3.6.1.2.1.25.2.1.1", "Main Memory", 1, 1, 1)));
        assert!(is_disk_row(&row(HR_STORAGE_TYPE_FIXED_DISK, "", 1, 1, 1)));
        assert!(is_disk_row(&row("1.3.6.1.2.1.25.2.1.1", "onboard Flash", 1, 1, 1)));
        assert!(!is_disk_row(&row("1.3.6.1.2.1.25.2.1.1", "swap space", 1, 1, 1)));
    }
}
