// Wire format checks for the push channel. Browser clients switch on the
// `type` string and read `payload.id`, so these shapes must not drift.

use chrono::Utc;
use eventhub_core::types::{Event, Rsvp, RsvpStatus, UserSummary};
use eventhub_protocol::envelope::{Envelope, NotificationKind};
use eventhub_protocol::frames::{ConnectedFrame, ServerFrame};

fn sample_event() -> Event {
    let now = Utc::now();
    Event {
        id: "evt-1".into(),
        title: "Rust Night".into(),
        description: "Talks".into(),
        date: now + chrono::Duration::days(7),
        location: "Hall A".into(),
        organizer_id: "u-org".into(),
        organizer: UserSummary { id: "u-org".into(), email: "org@example.com".into() },
        approved: false,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn envelope_uses_type_and_timestamp_keys() {
    let env = Envelope::event_created(&sample_event());
    let json = env.to_json().unwrap();

    assert!(json.contains(r#""type":"EVENT_CREATED""#));
    assert!(json.contains(r#""timestamp":"#));
    assert!(json.contains(r#""organizerId":"u-org""#));
    assert!(!json.contains("emitted_at"));
}

#[test]
fn deleted_payload_carries_only_id() {
    let env = Envelope::event_deleted("evt-9");
    assert_eq!(env.kind, NotificationKind::EventDeleted);
    assert_eq!(env.payload, serde_json::json!({ "id": "evt-9" }));
    assert_eq!(env.payload_id(), Some("evt-9"));
}

#[test]
fn rsvp_kind_follows_inserted_flag() {
    let now = Utc::now();
    let rsvp = Rsvp {
        id: "r1".into(),
        user_id: "u1".into(),
        event_id: "evt-1".into(),
        status: RsvpStatus::Going,
        created_at: now,
        updated_at: now,
        user: UserSummary { id: "u1".into(), email: "a@example.com".into() },
        event: None,
    };
    assert_eq!(Envelope::rsvp(&rsvp, true).kind, NotificationKind::RsvpCreated);
    assert_eq!(Envelope::rsvp(&rsvp, false).kind, NotificationKind::RsvpUpdated);
}

#[test]
fn connected_frame_parses_as_hello() {
    let json = serde_json::to_string(&ConnectedFrame::default()).unwrap();
    assert_eq!(json, r#"{"type":"CONNECTED","message":"Connected"}"#);

    match ServerFrame::parse(&json).unwrap() {
        ServerFrame::Connected(hello) => assert_eq!(hello.message, "Connected"),
        other => panic!("expected hello, got {:?}", other),
    }
}

#[test]
fn notification_round_trips_through_server_frame() {
    let env = Envelope::event_approved(&sample_event());
    let parsed = ServerFrame::parse(&env.to_json().unwrap()).unwrap();
    assert_eq!(parsed, ServerFrame::Notification(env));
}

#[test]
fn unknown_kind_is_rejected() {
    let json = r#"{"type":"EVENT_EXPLODED","payload":{},"timestamp":"2030-01-01T00:00:00Z"}"#;
    assert!(ServerFrame::parse(json).is_err());
}

#[test]
fn non_json_is_rejected() {
    assert!(ServerFrame::parse("not json").is_err());
}
