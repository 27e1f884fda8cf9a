use serde_json::Value;

// NOTE: `Value::to_string` keeps the surrounding quotes of JSON strings, error
//       descriptions coming back from the API are shown to users without them.
pub fn parse_serde_json_value_to_raw_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn parse_error_description(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(parse_serde_json_value_to_raw_string)
        .collect()
}
