// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

fn event(line: &str) -> StatusEvent {
    match parse_line(line) {
        ParsedLine::Event(e) => e,
        other => panic!("expected forwarded event for {line}, got {other:?}"),
    }
}

async fn aggregate(stream: &[u8]) -> ProgressSnapshot {
    let mut parser = LineProtocolParser::new(stream);
    let mut aggregator = StatusAggregator::new();
    while let Some(e) = parser.next_event().await.unwrap() {
        aggregator.ingest(&e);
    }
    aggregator.snapshot()
}

#[test]
fn test_mixed_levels_sum_bytes_and_count_entries() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(r#"{"level":"error","bytes":100}"#));
    aggregator.ingest(&event(r#"{"level":"warning","bytes":50}"#));
    aggregator.ingest(&event(r#"{"level":"error","bytes":25}"#));

    let snapshot = aggregator.snapshot();
    assert_eq!(snapshot.entries, 3);
    assert_eq!(snapshot.error_entries, 2);
    assert_eq!(snapshot.warning_entries, 1);
    assert_eq!(snapshot.total_bytes, 175);
    assert_eq!(snapshot.total_transfers, 3);
}

#[test]
fn test_errors_keep_insertion_order() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(
        r#"{"level":"error","object":"a.txt","msg":"Failed to copy","error":"permission denied"}"#,
    ));
    aggregator.ingest(&event(r#"{"level":"error","msg":"directory not found"}"#));
    aggregator.ingest(&event(r#"{"level":"error"}"#));

    assert_eq!(
        aggregator.error_dump(),
        "a.txt: permission denied\ndirectory not found\nunknown error"
    );
    assert_eq!(aggregator.snapshot().errors.len(), 3);
}

#[test]
fn test_warning_adds_error_entry_only_with_payload() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(r#"{"level":"warning","msg":"retrying"}"#));
    assert!(aggregator.error_dump().is_empty());

    aggregator.ingest(&event(
        r#"{"level":"warning","object":"b.bin","error":"checksum mismatch"}"#,
    ));
    assert_eq!(aggregator.error_dump(), "b.bin: checksum mismatch");
    assert_eq!(aggregator.snapshot().warning_entries, 2);
}

#[test]
fn test_non_forwarded_levels_are_not_applied() {
    let mut aggregator = StatusAggregator::new();
    let mut info = StatusEvent::new(Severity::Info);
    info.bytes = Some(10);
    assert!(!aggregator.ingest(&info));
    assert!(!aggregator.ingest(&StatusEvent::new(Severity::Other("debug".into()))));
    assert_eq!(aggregator.snapshot(), ProgressSnapshot::default());
}

#[test]
fn test_deletions_are_counted_not_transferred() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(r#"{"level":"warning","msg":"Deleted","object":"x"}"#));
    aggregator.ingest(&event(r#"{"level":"warning","deleted":true,"object":"y","bytes":9}"#));

    let snapshot = aggregator.snapshot();
    assert_eq!(snapshot.deletions, 2);
    assert_eq!(snapshot.total_transfers, 0);
    assert_eq!(snapshot.total_bytes, 0);
    assert_eq!(snapshot.current_item.as_deref(), Some("y"));
}

#[test]
fn test_engine_stats_are_cumulative() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(
        r#"{"level":"warning","stats":{"bytes":200,"totalBytes":800,"transfers":1,"speed":100.0}}"#,
    ));
    aggregator.ingest(&event(
        r#"{"level":"warning","stats":{"bytes":400,"totalBytes":800,"transfers":2,"speed":300.0,"transferring":[{"name":"a"},{"name":"b","speedAvg":250.0}]}}"#,
    ));

    let snapshot = aggregator.snapshot();
    assert_eq!(snapshot.total_bytes, 400);
    assert_eq!(snapshot.expected_bytes, 800);
    assert_eq!(snapshot.percent, 50);
    assert_eq!(snapshot.total_transfers, 2);
    assert_eq!(snapshot.estimated_average_speed, 200.0);
    assert_eq!(snapshot.last_item_average_speed, 250.0);
    assert_eq!(snapshot.transferring, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(snapshot.current_item.as_deref(), Some("b"));
}

#[test]
fn test_stale_stats_do_not_move_totals_backwards() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(r#"{"level":"warning","stats":{"bytes":500,"transfers":3}}"#));
    aggregator.ingest(&event(r#"{"level":"warning","stats":{"bytes":100,"transfers":1}}"#));

    let snapshot = aggregator.snapshot();
    assert_eq!(snapshot.total_bytes, 500);
    assert_eq!(snapshot.total_transfers, 3);
}

#[test]
fn test_item_speed_from_event() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(r#"{"level":"warning","object":"c","bytes":10,"speed":42.0}"#));
    assert_eq!(aggregator.snapshot().last_item_average_speed, 42.0);
}

#[test]
fn test_notification_rendering() {
    let mut aggregator = StatusAggregator::new();
    aggregator.ingest(&event(
        r#"{"level":"warning","stats":{"bytes":1024,"totalBytes":2048,"speed":1024.0,"transferring":[{"name":"movie.mkv"}]}}"#,
    ));
    aggregator.ingest(&event(r#"{"level":"error","msg":"boom"}"#));

    let snapshot = aggregator.snapshot();
    assert_eq!(snapshot.notification_body(), "1.0 KiB of 2.0 KiB, 1.0 KiB/s");
    assert_eq!(
        snapshot.notification_detail(),
        vec!["movie.mkv".to_string(), "1 error".to_string()]
    );
}

#[test]
fn test_notification_body_without_expected_total() {
    let snapshot = ProgressSnapshot {
        total_bytes: 300,
        ..Default::default()
    };
    assert_eq!(snapshot.notification_body(), "300 B transferred");
    assert!(snapshot.notification_detail().is_empty());
}

#[tokio::test]
async fn test_malformed_lines_do_not_affect_totals() {
    let clean = b"{\"level\":\"error\",\"bytes\":100,\"msg\":\"e1\"}\n\
{\"level\":\"warning\",\"bytes\":50}\n\
{\"level\":\"error\",\"bytes\":25,\"msg\":\"e2\"}\n";
    let noisy = b"garbage line\n\
{\"level\":\"error\",\"bytes\":100,\"msg\":\"e1\"}\n\
{\"level\":\"error\"\n\
{\"level\":\"info\",\"bytes\":9999}\n\
{\"level\":\"warning\",\"bytes\":50}\n\
\n\
{oops}\n\
{\"level\":\"error\",\"bytes\":25,\"msg\":\"e2\"}\n\
trailing";

    let expected = aggregate(clean).await;
    let actual = aggregate(noisy).await;
    assert_eq!(actual, expected);
    assert_eq!(actual.total_bytes, 175);
    assert_eq!(actual.error_dump(), "e1\ne2");
}
