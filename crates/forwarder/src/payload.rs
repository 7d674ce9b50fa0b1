use serde_json::{Map, Value};

/// Builds the webhook body `{"vin": <vin>, "<field>": <value>}`.
pub fn build_payload(vin: &str, field: &str, value: Value) -> Value {
    let mut body = Map::new();
    body.insert("vin".into(), Value::String(vin.to_string()));
    body.insert(field.to_string(), value);
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_value_payload() {
        let body = build_payload("WVW123", "latitude", json!(48.137));
        assert_eq!(body, json!({"vin": "WVW123", "latitude": 48.137}));
    }

    #[test]
    fn history_payload() {
        let samples = json!([{"time": 1.0, "value": 50}, {"time": 2.0, "value": null}]);
        let body = build_payload("WVW123", "speed_history", samples.clone());
        assert_eq!(body["speed_history"], samples);
        assert_eq!(body.as_object().unwrap().len(), 2);
    }
}
