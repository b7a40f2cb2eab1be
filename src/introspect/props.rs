use std::collections::BTreeMap;

use serde_json::Value;

/// Structural keys the framework threads through every component.
const SKIP_KEYS: [&str; 6] = ["children", "key", "ref", "$$typeof", "__self", "__source"];

/// Key fragments that mark a prop as security-sensitive.
const SENSITIVE_FRAGMENTS: [&str; 6] = [
    "password",
    "token",
    "secret",
    "apikey",
    "authorization",
    "credential",
];

const MAX_STRING_LENGTH: usize = 50;
const MAX_PROPS: usize = 15;
const MAX_OBJECT_ENTRIES: usize = 5;

fn is_sensitive(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

fn truncate_string(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > MAX_STRING_LENGTH {
        let mut out: String = chars[..MAX_STRING_LENGTH - 3].iter().collect();
        out.push_str("...");
        out
    } else {
        value.to_string()
    }
}

/// Rendered-element values carry a `$$typeof` marker; show them as a tag.
fn element_summary(map: &serde_json::Map<String, Value>) -> String {
    let type_name = match map.get("type") {
        Some(Value::String(tag)) => tag.clone(),
        Some(Value::Object(obj)) => obj
            .get("displayName")
            .or_else(|| obj.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Component")
            .to_string(),
        _ => "Component".to_string(),
    };
    format!("<{type_name} />")
}

fn serialize_value(value: &Value, depth: usize) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(format!("\"{}\"", truncate_string(s))),
        Value::Array(items) => Some(format!("[{} items]", items.len())),
        Value::Object(map) => {
            if map.contains_key("$$typeof") {
                return Some(element_summary(map));
            }
            // One level of object detail only.
            if depth > 0 {
                return Some("{...}".to_string());
            }
            if map.is_empty() {
                return Some("{}".to_string());
            }
            let parts: Vec<String> = map
                .iter()
                .take(MAX_OBJECT_ENTRIES)
                .filter_map(|(k, v)| serialize_value(v, depth + 1).map(|s| format!("{k}: {s}")))
                .collect();
            let suffix = if map.len() > MAX_OBJECT_ENTRIES {
                ", ..."
            } else {
                ""
            };
            Some(format!("{{ {}{} }}", parts.join(", "), suffix))
        }
    }
}

/// Serialize a component's prop map to display strings: structural and
/// sensitive keys dropped, long strings truncated, arrays and nested
/// objects summarized, at most [`MAX_PROPS`] entries emitted.
pub fn serialize_props(props: &Value) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    let Value::Object(map) = props else {
        return result;
    };

    for (key, value) in map {
        if result.len() >= MAX_PROPS {
            break;
        }
        if SKIP_KEYS.contains(&key.as_str()) || is_sensitive(key) {
            continue;
        }
        if let Some(serialized) = serialize_value(value, 0) {
            result.insert(key.clone(), serialized);
        }
    }

    result
}
