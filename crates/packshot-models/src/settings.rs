//! Render settings helpers.
//!
//! Settings are opaque to the queue; the only server-side rewrite is the
//! preview clamp, which forces a single fast front view so preview renders
//! come back quickly.

use serde_json::Value;

/// Clamp render settings for a preview job.
///
/// Renders only the front camera view and downgrades `"high"` quality to
/// `"low"`. All other keys pass through untouched.
pub fn clamp_for_preview(settings: &Value) -> Value {
    let mut clamped = settings.clone();

    if let Some(obj) = clamped.as_object_mut() {
        obj.insert(
            "cameraViews".to_string(),
            Value::Array(vec![Value::String("front".to_string())]),
        );

        if obj.get("quality").and_then(Value::as_str) == Some("high") {
            obj.insert("quality".to_string(), Value::String("low".to_string()));
        }
    }

    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clamp_forces_front_view() {
        let settings = json!({"cameraViews": ["front", "back", "side"], "resolution": "1080p"});
        let clamped = clamp_for_preview(&settings);

        assert_eq!(clamped["cameraViews"], json!(["front"]));
        assert_eq!(clamped["resolution"], json!("1080p"));
    }

    #[test]
    fn test_clamp_downgrades_high_quality() {
        let clamped = clamp_for_preview(&json!({"quality": "high"}));
        assert_eq!(clamped["quality"], json!("low"));

        let unchanged = clamp_for_preview(&json!({"quality": "medium"}));
        assert_eq!(unchanged["quality"], json!("medium"));
    }

    #[test]
    fn test_clamp_non_object_passthrough() {
        assert_eq!(clamp_for_preview(&Value::Null), Value::Null);
    }
}
