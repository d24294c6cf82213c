use super::*;

#[test]
fn test_snapshot_encode() {
    let snapshot = MetricsSnapshot {
        producer_rate: 9.6,
        produced_total: 120,
        consumed_total: 100,
        occupancy: 20,
        queue_threshold: 5,
    };
    assert_eq!(snapshot.encode(), "10:120:100:20:5");
}

#[test]
fn test_snapshot_from_counts() {
    let counts = QueueCounts {
        produced_total: 7,
        consumed_total: 3,
        occupancy: 4,
    };
    let snapshot = MetricsSnapshot::new(Rate::per_second(2.0).unwrap(), counts, 128);
    assert_eq!(snapshot.encode(), "2:7:3:4:128");
}

#[test]
fn test_snapshot_parse() {
    let snapshot = MetricsSnapshot::parse("5:1000:990:10:5").unwrap();
    assert_eq!(snapshot.producer_rate, 5.0);
    assert_eq!(snapshot.produced_total, 1000);
    assert_eq!(snapshot.consumed_total, 990);
    assert_eq!(snapshot.occupancy, 10);
    assert_eq!(snapshot.queue_threshold, 5);
}

#[test]
fn test_snapshot_parse_errors() {
    assert_eq!(
        MetricsSnapshot::parse("1:2:3"),
        Err(FrameError::FieldCount {
            expected: 5,
            found: 3
        })
    );

    match MetricsSnapshot::parse("1:2:x:4:5") {
        Err(FrameError::InvalidNumber { field, token }) => {
            assert_eq!(field, "consumed_total");
            assert_eq!(token, "x");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(MetricsSnapshot::parse("-1:2:3:4:5").is_err());
}

#[test]
fn test_command_sets_consumer_and_threshold() {
    let parsed = ControlCommand::parse("5:_:100");
    assert!(parsed.errors.is_empty());
    assert_eq!(
        parsed.command.consumer_rate.map(|r| r.permits_per_second()),
        Some(5.0)
    );
    assert_eq!(parsed.command.controller_rate, None);
    assert_eq!(parsed.command.queue_threshold, Some(100));
}

#[test]
fn test_command_all_wildcards() {
    let parsed = ControlCommand::parse("_:_:_");
    assert!(parsed.errors.is_empty());
    assert!(parsed.command.is_empty());
}

#[test]
fn test_command_fractional_rates() {
    let parsed = ControlCommand::parse("_:0.5:_");
    assert_eq!(
        parsed.command.controller_rate.map(|r| r.permits_per_second()),
        Some(0.5)
    );
}

#[test]
fn test_command_malformed_tokens_are_rejected_per_field() {
    let parsed = ControlCommand::parse("abc:2:-3");
    assert_eq!(parsed.command.consumer_rate, None);
    assert_eq!(
        parsed.command.controller_rate.map(|r| r.permits_per_second()),
        Some(2.0)
    );
    assert_eq!(parsed.command.queue_threshold, None);

    let fields: Vec<Field> = parsed.errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec![Field::ConsumerRate, Field::QueueThreshold]);
}

#[test]
fn test_command_rejects_non_positive_rates() {
    let parsed = ControlCommand::parse("0:-1:_");
    assert!(parsed.command.is_empty());
    assert_eq!(parsed.errors.len(), 2);

    let parsed = ControlCommand::parse("NaN:inf:_");
    assert!(parsed.command.is_empty());
    assert_eq!(parsed.errors.len(), 2);
}

#[test]
fn test_command_short_and_long_frames() {
    let parsed = ControlCommand::parse("3");
    assert_eq!(
        parsed.command.consumer_rate.map(|r| r.permits_per_second()),
        Some(3.0)
    );
    assert_eq!(parsed.command.queue_threshold, None);

    let parsed = ControlCommand::parse("_:_:7:extra:more");
    assert_eq!(parsed.command.queue_threshold, Some(7));
    assert_eq!(parsed.ignored_tokens, 2);

    let parsed = ControlCommand::parse("");
    assert!(parsed.command.is_empty());
    assert!(parsed.errors.is_empty());
}

#[test]
fn test_command_tolerates_whitespace_and_carriage_return() {
    let parsed = ControlCommand::parse(" 4 : _ : 12\r");
    assert!(parsed.errors.is_empty());
    assert_eq!(
        parsed.command.consumer_rate.map(|r| r.permits_per_second()),
        Some(4.0)
    );
    assert_eq!(parsed.command.queue_threshold, Some(12));
}

#[test]
fn test_command_encode() {
    let command = ControlCommand::keep_all()
        .with_controller_rate(Rate::per_second(0.5).unwrap())
        .with_queue_threshold(64);
    assert_eq!(command.encode(), "_:0.5:64");
    assert_eq!(ControlCommand::keep_all().encode(), "_:_:_");
}

#[test]
fn test_field_error_display() {
    let err = FieldError {
        field: Field::QueueThreshold,
        token: "x".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "invalid queue threshold: \"x\" is not a non-negative integer"
    );
}

#[test]
fn test_banner_and_ack_fit_in_a_frame() {
    assert!(BANNER.len() < MAX_FRAME_LEN);
    assert!(ACKNOWLEDGEMENT.len() < MAX_FRAME_LEN);
}
