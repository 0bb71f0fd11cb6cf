#![allow(clippy::unwrap_used, clippy::expect_used)]

use logkit_core_types::ResultEnvelope;
use serde_json::json;

#[test]
fn test_success_carries_message_and_data() {
    let env = ResultEnvelope::success("created", 42);
    assert!(env.success);
    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({"success": true, "message": "created", "data": 42})
    );
}

#[test]
fn test_failed_msg_omits_data() {
    let env = ResultEnvelope::failed_msg("not found");
    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({"success": false, "message": "not found"})
    );
}

#[test]
fn test_success_data_omits_message() {
    let env = ResultEnvelope::success_data(vec!["a", "b"]);
    assert_eq!(
        serde_json::to_value(&env).unwrap(),
        json!({"success": true, "data": ["a", "b"]})
    );
}

#[test]
fn test_failed_carries_payload() {
    let env = ResultEnvelope::failed("quota exceeded", json!({"limit": 10}));
    assert!(!env.success);
    assert_eq!(env.message.as_deref(), Some("quota exceeded"));
    assert_eq!(env.data, Some(json!({"limit": 10})));
}

#[test]
fn test_deserialize_without_optional_parts() {
    let env: ResultEnvelope<u32> = serde_json::from_str(r#"{"success":true}"#).unwrap();
    assert_eq!(env, ResultEnvelope::<u32> { success: true, message: None, data: None });

    let env: ResultEnvelope<u32> = serde_json::from_str(r#"{"success":false,"data":7}"#).unwrap();
    assert_eq!(env, ResultEnvelope::failed_data(7));
}
