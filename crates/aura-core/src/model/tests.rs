use crate::model::*;

#[test]
fn test_chat_message_roles() {
    let user = ChatMessage::user("How much water should I drink?");
    let model = ChatMessage::model("About two litres a day.");

    assert_eq!(user.role, Role::User);
    assert!(user.role.is_user());
    assert_eq!(model.role, Role::Model);
    assert!(!model.role.is_user());
}

#[test]
fn test_chat_message_ids_increase_in_creation_order() {
    let ids: Vec<_> = (0..50).map(|i| ChatMessage::user(format!("m{i}")).id).collect();
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "ids must be unique and time-ordered");
    }
}

#[test]
fn test_role_serializes_lowercase() {
    let entry = ChatMessage::model("hi").to_history();
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["role"], "model");
    assert_eq!(json["text"], "hi");
}

#[test]
fn test_turn_state_pending_and_failed() {
    let id = uuid::Uuid::now_v7();
    assert!(!TurnState::Idle.is_pending());
    assert!(TurnState::Pending { message_id: id }.is_pending());
    assert!(TurnState::Pending { message_id: id }.is_pending_for(id));
    assert!(!TurnState::Pending { message_id: id }.is_pending_for(uuid::Uuid::now_v7()));

    let failed = TurnState::Failed {
        message_id: id,
        reason: "timed out".into(),
    };
    assert!(!failed.is_pending());
    assert_eq!(failed.failed_message(), Some((id, "timed out")));
    assert_eq!(TurnState::Fulfilled { message_id: id }.failed_message(), None);
}

#[test]
fn test_turn_state_serialization_is_tagged() {
    let json = serde_json::to_value(TurnState::Idle).unwrap();
    assert_eq!(json["state"], "idle");
}

#[test]
fn test_user_profile_uses_camel_case_wire_names() {
    let profile = UserProfile {
        uid: "user_12345".into(),
        email: "a@b.com".into(),
        display_name: Some("Alex Doe".into()),
        photo_url: Some("https://picsum.photos/200".into()),
    };
    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["displayName"], "Alex Doe");
    assert_eq!(json["photoURL"], "https://picsum.photos/200");

    let minimal: UserProfile =
        serde_json::from_str(r#"{"uid":"u","email":"e@x.com"}"#).unwrap();
    assert!(minimal.display_name.is_none());
    assert!(minimal.photo_url.is_none());
}

#[test]
fn test_credentials_completeness() {
    assert!(Credentials::new("a@b.com", "x").is_complete());
    assert!(!Credentials::new("   ", "x").is_complete());
    assert!(!Credentials::new("a@b.com", "").is_complete());
}

#[test]
fn test_credentials_debug_redacts_password() {
    let debug = format!("{:?}", Credentials::new("a@b.com", "hunter2"));
    assert!(debug.contains("a@b.com"));
    assert!(!debug.contains("hunter2"));
}

#[test]
fn test_session_state_constructors() {
    assert!(!SessionState::signed_out().authenticated);
    let state = SessionState::signed_in(None);
    assert!(state.authenticated);
    assert!(state.user.is_none());
}

#[test]
fn test_daily_summary_payload_shape() {
    let json = serde_json::to_string(&daily_summary()).unwrap();
    assert_eq!(
        json,
        r#"[{"type":"Steps","value":8240},{"type":"Sleep","value":"7h 20m"},{"type":"Avg Heart Rate","value":72}]"#
    );
}

#[test]
fn test_dashboard_readings_extend_summary_with_calories() {
    let readings = dashboard_readings();
    assert_eq!(readings[..3], daily_summary()[..]);
    assert_eq!(readings[3].kind, "Calories");
    assert_eq!(readings[3].value, MetricValue::Integer(480));
    assert_eq!(daily_summary().len(), 3);
}

#[test]
fn test_metric_value_display() {
    assert_eq!(MetricValue::Integer(8240).to_string(), "8240");
    assert_eq!(MetricValue::Decimal(36.6).to_string(), "36.6");
    assert_eq!(MetricValue::Text("7h 20m".into()).to_string(), "7h 20m");
}

#[test]
fn test_metric_value_deserializes_untagged() {
    let r: MetricReading = serde_json::from_str(r#"{"type":"Calories","value":1840}"#).unwrap();
    assert_eq!(r.value, MetricValue::Integer(1840));
    let r: MetricReading = serde_json::from_str(r#"{"type":"Sleep","value":"6h"}"#).unwrap();
    assert_eq!(r.value, MetricValue::Text("6h".into()));
}
