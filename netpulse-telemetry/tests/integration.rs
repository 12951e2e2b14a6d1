//! Integration tests for the telemetry core against an in-memory transport.

use std::collections::HashMap;
use std::time::Duration;

use netpulse_telemetry::{
    Category, DecodedValue, Error, Result, SessionInfo, SessionLookup, TelemetryCollector,
    Transport, Varbind, oid, sample_traffic_batched,
};

/// Scripted transport: GETs answer from a value map (any missing identifier
/// fails the whole request, like a real agent error), walks answer from
/// per-column row lists.
#[derive(Default)]
struct MockTransport {
    values: HashMap<String, DecodedValue>,
    tables: HashMap<String, Vec<Varbind>>,
    get_calls: usize,
    walk_calls: usize,
}

impl Transport for MockTransport {
    async fn get(&mut self, oids: &[String]) -> Result<Vec<Varbind>> {
        self.get_calls += 1;
        let mut results = Vec::with_capacity(oids.len());
        for oid in oids {
            match self.values.get(oid) {
                Some(value) => results.push((oid.clone(), value.clone())),
                None => return Err(Error::NoSuchObject),
            }
        }
        Ok(results)
    }

    async fn walk(&mut self, base: &str) -> Result<Vec<Varbind>> {
        self.walk_calls += 1;
        Ok(self.tables.get(base).cloned().unwrap_or_default())
    }
}

impl MockTransport {
    fn set_table_cell(&mut self, column: &str, index: u32, value: DecodedValue) {
        self.tables
            .entry(column.to_string())
            .or_default()
            .push((oid::table_oid(column, index), value));
    }

    /// Populate the interface columns from (index, name, descr, admin, oper,
    /// type) tuples.
    fn with_interfaces(rows: &[(u32, &str, &str, i64, i64, i64)]) -> Self {
        let mut mock = Self::default();
        for &(index, name, descr, admin, oper, type_code) in rows {
            mock.set_table_cell(oid::IF_NAME, index, DecodedValue::Text(name.to_string()));
            mock.set_table_cell(oid::IF_DESCR, index, DecodedValue::Text(descr.to_string()));
            mock.set_table_cell(oid::IF_ADMIN_STATUS, index, DecodedValue::Integer(admin));
            mock.set_table_cell(oid::IF_OPER_STATUS, index, DecodedValue::Integer(oper));
            mock.set_table_cell(oid::IF_TYPE, index, DecodedValue::Integer(type_code));
        }
        mock
    }

    fn with_counters(indices: &[(u32, u64, u64)], high_capacity: bool) -> Self {
        let (in_col, out_col) = if high_capacity {
            (oid::IF_HC_IN_OCTETS, oid::IF_HC_OUT_OCTETS)
        } else {
            (oid::IF_IN_OCTETS, oid::IF_OUT_OCTETS)
        };
        let mut mock = Self::default();
        for &(index, total_in, total_out) in indices {
            mock.values
                .insert(oid::table_oid(in_col, index), DecodedValue::Counter(total_in));
            mock.values
                .insert(oid::table_oid(out_col, index), DecodedValue::Counter(total_out));
        }
        mock
    }
}

#[tokio::test]
async fn test_interface_report_classifies_and_merges() {
    let mut mock = MockTransport::with_interfaces(&[
        (1, "ether1", "ether1", 1, 1, 6),
        (2, "<bob-pppoe>", "", 1, 1, 23),
        (3, "wlan1", "wireless guest", 1, 2, 71),
    ]);
    mock.set_table_cell(oid::IF_HIGH_SPEED, 1, DecodedValue::Counter(1000));
    mock.set_table_cell(
        oid::IF_PHYS_ADDRESS,
        1,
        DecodedValue::Binary(vec![0x00, 0x0c, 0x42, 0x01, 0x02, 0x03]),
    );

    let collector = TelemetryCollector::new();
    let report = collector
        .interface_report(&mut mock, None, None)
        .await
        .unwrap();

    assert_eq!(report.interfaces.len(), 3);
    assert!(!report.filter_unmatched);

    let ether = &report.interfaces[0];
    assert_eq!(ether.descriptor.name, "ether1");
    assert_eq!(ether.category, Category::Physical);
    assert_eq!(ether.descriptor.speed_mbps, Some(1000));
    assert_eq!(
        ether.descriptor.mac_string().as_deref(),
        Some("00:0c:42:01:02:03")
    );
    assert!(ether.descriptor.admin_up);
    assert!(ether.descriptor.oper_up);

    // Bracket-wrapped dynamic name unwraps; type code 23 is PPP.
    let pppoe = &report.interfaces[1];
    assert_eq!(pppoe.descriptor.name, "bob-pppoe");
    assert_eq!(pppoe.category, Category::Pppoe);

    let wlan = &report.interfaces[2];
    assert_eq!(wlan.category, Category::Hotspot);
    assert!(!wlan.descriptor.oper_up);
}

#[tokio::test]
async fn test_malformed_row_keeps_other_fields() {
    // Row 2's type value never decoded (the transport skipped it): the
    // interface still appears, just without a meaningful type code.
    let mut mock = MockTransport::with_interfaces(&[
        (1, "ether1", "", 1, 1, 6),
        (3, "ether3", "", 1, 1, 6),
    ]);
    mock.set_table_cell(oid::IF_NAME, 2, DecodedValue::Text("ether2".to_string()));
    mock.set_table_cell(oid::IF_ADMIN_STATUS, 2, DecodedValue::Integer(1));

    let collector = TelemetryCollector::new();
    let report = collector
        .interface_report(&mut mock, None, None)
        .await
        .unwrap();

    assert_eq!(report.interfaces.len(), 3);
    let partial = report
        .interfaces
        .iter()
        .find(|r| r.descriptor.index == 2)
        .unwrap();
    assert_eq!(partial.descriptor.name, "ether2");
    assert_eq!(partial.descriptor.type_code, 0);
}

#[tokio::test]
async fn test_filter_unmatched_is_flagged_not_widened() {
    let mut mock = MockTransport::with_interfaces(&[
        (1, "ether1", "", 1, 1, 6),
        (2, "ether2", "", 1, 1, 6),
    ]);

    let collector = TelemetryCollector::new();
    let report = collector
        .interface_report(&mut mock, Some(Category::Hotspot), None)
        .await
        .unwrap();

    assert!(report.interfaces.is_empty());
    assert!(report.filter_unmatched);

    let report = collector
        .interface_report(&mut mock, Some(Category::Physical), None)
        .await
        .unwrap();
    assert_eq!(report.interfaces.len(), 2);
    assert!(!report.filter_unmatched);
}

struct StaticSessions;

impl SessionLookup for StaticSessions {
    fn lookup(&self, interface_name: &str) -> Option<SessionInfo> {
        (interface_name == "bob-pppoe").then(|| SessionInfo {
            address: Some("10.64.0.7".to_string()),
            uptime_secs: Some(3600),
            mac_address: Some("00:0c:42:aa:bb:cc".to_string()),
        })
    }
}

#[tokio::test]
async fn test_pppoe_session_enrichment() {
    let mut mock = MockTransport::with_interfaces(&[
        (1, "ether1", "", 1, 1, 6),
        (2, "<bob-pppoe>", "", 1, 1, 23),
    ]);

    let collector = TelemetryCollector::new();
    let report = collector
        .interface_report(&mut mock, None, Some(&StaticSessions))
        .await
        .unwrap();

    assert!(report.interfaces[0].session.is_none());
    let session = report.interfaces[1].session.as_ref().unwrap();
    assert_eq!(session.address.as_deref(), Some("10.64.0.7"));
}

#[tokio::test]
async fn test_interface_record_json_shape() {
    let mut mock = MockTransport::with_interfaces(&[(2, "<bob-pppoe>", "", 1, 1, 23)]);

    let collector = TelemetryCollector::new();
    let report = collector
        .interface_report(&mut mock, None, Some(&StaticSessions))
        .await
        .unwrap();

    // Descriptor fields flatten into the record; absent optionals are
    // omitted, not nulled.
    let json = serde_json::to_value(&report).unwrap();
    let record = &json["interfaces"][0];
    assert_eq!(record["index"], 2);
    assert_eq!(record["name"], "bob-pppoe");
    assert_eq!(record["category"], "pppoe");
    assert_eq!(record["session"]["address"], "10.64.0.7");
    assert!(record.get("speed_mbps").is_none());
    assert_eq!(json["filter_unmatched"], false);
}

#[tokio::test]
async fn test_unknown_interface_lists_known_names() {
    let mut mock = MockTransport::with_interfaces(&[
        (1, "ether1", "", 1, 1, 6),
        (2, "ether2", "", 1, 1, 6),
    ]);

    let collector = TelemetryCollector::new();

    let found = collector
        .resolve_interface(&mut mock, "ETHER1")
        .await
        .unwrap();
    assert_eq!(found.index, 1);

    let err = collector
        .resolve_interface(&mut mock, "ether9")
        .await
        .unwrap_err();
    match err {
        Error::UnknownInterface { name, available } => {
            assert_eq!(name, "ether9");
            assert!(available.contains(&"ether1".to_string()));
        }
        other => panic!("expected UnknownInterface, got {other:?}"),
    }
}

#[tokio::test]
async fn test_batching_request_count_and_order() {
    let indices = [5, 1, 9, 2, 7];
    let counters: Vec<(u32, u64, u64)> = indices
        .iter()
        .map(|&i| (i, u64::from(i) * 1000, u64::from(i) * 2000))
        .collect();

    for batch_size in [1, 2, 4, 10, 24] {
        let mut mock = MockTransport::with_counters(&counters, true);
        let collector = TelemetryCollector::new();

        let samples = sample_traffic_batched(
            collector.rates(),
            &mut mock,
            "r1:161/public",
            &indices,
            batch_size,
        )
        .await
        .unwrap();

        // ceil(2N / B) requests, one output entry per index, input order.
        let expected_requests = (2 * indices.len()).div_ceil(batch_size);
        assert_eq!(mock.get_calls, expected_requests, "batch size {batch_size}");
        assert_eq!(samples.len(), indices.len());
        for (sample, &index) in samples.iter().zip(indices.iter()) {
            assert_eq!(sample.index, index);
            assert_eq!(sample.total_in_bytes, u64::from(index) * 1000);
            assert_eq!(sample.total_out_bytes, u64::from(index) * 2000);
            // First observation of each counter is a baseline.
            assert_eq!(sample.in_bps, 0.0);
            assert_eq!(sample.out_bps, 0.0);
        }
    }
}

#[tokio::test]
async fn test_traffic_falls_back_to_32bit_counters() {
    let indices = [1, 2, 3];
    let counters: Vec<(u32, u64, u64)> = indices
        .iter()
        .map(|&i| (i, u64::from(i) * 111, u64::from(i) * 222))
        .collect();

    // Agent exposes only the 32-bit octet counters.
    let mut mock = MockTransport::with_counters(&counters, false);
    let collector = TelemetryCollector::new();

    let samples = collector
        .traffic(&mut mock, "r1:161/public", &indices)
        .await
        .unwrap();

    // One failed 64-bit batch, then the 32-bit batch set.
    assert_eq!(mock.get_calls, 2);
    assert_eq!(samples.len(), indices.len());
    assert_eq!(samples[2].total_in_bytes, 333);
    assert_eq!(samples[2].total_out_bytes, 666);
}

#[tokio::test]
async fn test_unreadable_counter_does_not_seed_baseline() {
    let indices = [1];
    let collector = TelemetryCollector::new();

    // The agent answers, but with text where a counter belongs.
    let mut mock = MockTransport::default();
    mock.values.insert(
        oid::table_oid(oid::IF_HC_IN_OCTETS, 1),
        DecodedValue::Text("n/a".to_string()),
    );
    mock.values.insert(
        oid::table_oid(oid::IF_HC_OUT_OCTETS, 1),
        DecodedValue::Text("n/a".to_string()),
    );

    let first = collector
        .traffic(&mut mock, "r1:161/public", &indices)
        .await
        .unwrap();
    assert_eq!(first[0].total_in_bytes, 0);
    assert_eq!(first[0].in_bps, 0.0);
    // Nothing was cached, so the next real reading is a baseline instead of
    // a giant delta measured against a phantom zero.
    assert!(collector.rates().is_empty());

    let mut mock = MockTransport::with_counters(&[(1, 5_000_000, 6_000_000)], true);
    let second = collector
        .traffic(&mut mock, "r1:161/public", &indices)
        .await
        .unwrap();
    assert_eq!(second[0].in_bps, 0.0);
    assert_eq!(second[0].total_in_bytes, 5_000_000);
}

#[tokio::test]
async fn test_traffic_rates_on_second_poll() {
    let indices = [1];
    let collector = TelemetryCollector::new();

    let mut mock = MockTransport::with_counters(&[(1, 1_000, 2_000)], true);
    let first = collector
        .traffic(&mut mock, "r1:161/public", &indices)
        .await
        .unwrap();
    assert_eq!(first[0].in_bps, 0.0);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut mock = MockTransport::with_counters(&[(1, 101_000, 202_000)], true);
    let second = collector
        .traffic(&mut mock, "r1:161/public", &indices)
        .await
        .unwrap();
    assert!(second[0].in_bps > 0.0);
    assert!(second[0].out_bps > second[0].in_bps);
    assert_eq!(second[0].total_in_bytes, 101_000);
}

#[tokio::test]
async fn test_device_info_with_vendor_fields() {
    let mut mock = MockTransport::default();
    mock.values.insert(
        oid::SYS_DESCR.to_string(),
        DecodedValue::Text("RouterOS CCR1036".to_string()),
    );
    mock.values.insert(
        oid::SYS_OBJECT_ID.to_string(),
        DecodedValue::Text("1.3.6.1.4.1.14988.1".to_string()),
    );
    mock.values.insert(
        oid::SYS_UPTIME.to_string(),
        DecodedValue::Counter((2 * 86_400 + 3 * 3_600) * 100),
    );
    mock.values.insert(
        oid::SYS_NAME.to_string(),
        DecodedValue::Text("core-router".to_string()),
    );
    mock.values.insert(
        oid::MTXR_BOARD_NAME.to_string(),
        DecodedValue::Text("CCR1036-12G-4S".to_string()),
    );
    mock.values.insert(
        oid::MTXR_FIRMWARE_VERSION.to_string(),
        DecodedValue::Text("7.14.2".to_string()),
    );
    mock.values.insert(
        oid::MTXR_SERIAL_NUMBER.to_string(),
        DecodedValue::Text("D6A0AB1B2C3D".to_string()),
    );
    mock.values.insert(
        oid::MTXR_HEALTH_TEMPERATURE.to_string(),
        DecodedValue::Integer(425),
    );
    mock.values.insert(
        oid::HR_PROCESSOR_LOAD.to_string(),
        DecodedValue::Integer(12),
    );

    let collector = TelemetryCollector::new();
    let info = collector.device_info(&mut mock).await.unwrap();

    assert_eq!(info.name, "core-router");
    assert_eq!(info.cpu_load_pct, Some(12));
    assert_eq!(info.uptime.days, 2);
    assert_eq!(info.uptime.hours, 3);
    assert_eq!(info.uptime.minutes, 0);

    let vendor = info.vendor.unwrap();
    assert_eq!(vendor.board_name.as_deref(), Some("CCR1036-12G-4S"));
    assert_eq!(vendor.firmware_version.as_deref(), Some("7.14.2"));
    assert_eq!(vendor.temperature, Some(42.5));
}

#[tokio::test]
async fn test_device_info_vendor_fields_optional() {
    // A non-MikroTik agent: the vendor query fails, the record simply omits
    // the vendor block.
    let mut mock = MockTransport::default();
    mock.values.insert(
        oid::SYS_DESCR.to_string(),
        DecodedValue::Text("Generic Agent".to_string()),
    );
    mock.values.insert(
        oid::SYS_OBJECT_ID.to_string(),
        DecodedValue::Text("1.3.6.1.4.1.8072.3.2.10".to_string()),
    );
    mock.values
        .insert(oid::SYS_UPTIME.to_string(), DecodedValue::Counter(100));
    mock.values.insert(
        oid::SYS_NAME.to_string(),
        DecodedValue::Text("edge".to_string()),
    );

    let collector = TelemetryCollector::new();
    let info = collector.device_info(&mut mock).await.unwrap();

    assert_eq!(info.name, "edge");
    assert!(info.cpu_load_pct.is_none());
    assert!(info.vendor.is_none());
}

#[tokio::test]
async fn test_storage_report() {
    let mut mock = MockTransport::default();
    // Row 1: RAM. Row 2: fixed disk, matched by description token.
    mock.set_table_cell(
        oid::HR_STORAGE_TYPE,
        1,
        DecodedValue::Text(oid::HR_STORAGE_TYPE_RAM.to_string()),
    );
    mock.set_table_cell(
        oid::HR_STORAGE_DESCR,
        1,
        DecodedValue::Text("main memory".to_string()),
    );
    mock.set_table_cell(
        oid::HR_STORAGE_ALLOCATION_UNITS,
        1,
        DecodedValue::Integer(1024),
    );
    mock.set_table_cell(oid::HR_STORAGE_SIZE, 1, DecodedValue::Integer(65536));
    mock.set_table_cell(oid::HR_STORAGE_USED, 1, DecodedValue::Integer(16384));

    mock.set_table_cell(
        oid::HR_STORAGE_TYPE,
        2,
        DecodedValue::Text("1.3.6.1.2.1.25.2.1.1".to_string()),
    );
    mock.set_table_cell(
        oid::HR_STORAGE_DESCR,
        2,
        DecodedValue::Text("system flash".to_string()),
    );
    mock.set_table_cell(
        oid::HR_STORAGE_ALLOCATION_UNITS,
        2,
        DecodedValue::Integer(4096),
    );
    mock.set_table_cell(oid::HR_STORAGE_SIZE, 2, DecodedValue::Integer(32768));
    mock.set_table_cell(oid::HR_STORAGE_USED, 2, DecodedValue::Integer(8192));

    let collector = TelemetryCollector::new();
    let report = collector.storage(&mut mock).await.unwrap();

    let memory = report.memory.unwrap();
    assert_eq!(memory.total_bytes, 65536 * 1024);
    assert_eq!(memory.used_bytes, 16384 * 1024);
    assert_eq!(memory.used_pct, 25);

    let disk = report.disk.unwrap();
    assert_eq!(disk.total_bytes, 32768 * 4096);
    assert_eq!(disk.used_pct, 25);
}

#[tokio::test]
async fn test_storage_absent_rows() {
    let mut mock = MockTransport::default();
    let collector = TelemetryCollector::new();
    let report = collector.storage(&mut mock).await.unwrap();
    assert!(report.memory.is_none());
    assert!(report.disk.is_none());
}
