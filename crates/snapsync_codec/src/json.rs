//! Canonical JSON rendering and near-JSON repair.

use crate::error::{CodecError, CodecResult};
use serde_json::Value;

/// Serializes a value to its canonical JSON form.
///
/// `serde_json` maps iterate in sorted key order (the `preserve_order`
/// feature is deliberately not enabled anywhere in this workspace), so a
/// plain serialization is canonical: two structurally equal values always
/// render to the same text. Checksums and encoded payloads both depend on
/// this.
pub fn to_canonical_json(value: &Value) -> CodecResult<String> {
    serde_json::to_string(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Attempts to repair near-JSON text produced by foreign encoders.
///
/// Two repairs are applied: single-quoted strings are rewritten to
/// double-quoted ones, and trailing commas before `}` or `]` are removed.
/// Returns `None` if the repaired text still does not parse.
pub fn repair_near_json(text: &str) -> Option<Value> {
    let normalized = normalize_quotes(text);
    let cleaned = strip_trailing_commas(&normalized);
    serde_json::from_str(&cleaned).ok()
}

/// Rewrites single-quoted strings to double-quoted strings.
///
/// Quote characters inside double-quoted strings are left untouched.
fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut escaped = false;

    for ch in text.chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => {
                out.push(ch);
                escaped = true;
            }
            '"' => {
                in_double = !in_double;
                out.push(ch);
            }
            '\'' if !in_double => out.push('"'),
            _ => out.push(ch),
        }
    }
    out
}

/// Removes commas that directly precede a closing brace or bracket.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = text.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => {
                out.push(ch);
                escaped = true;
            }
            '"' => {
                in_string = !in_string;
                out.push(ch);
            }
            ',' if !in_string => {
                let next_meaningful = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if !matches!(next_meaningful, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys() {
        let value = json!({"zebra": 1, "apple": 2, "mango": {"b": 1, "a": 2}});
        let text = to_canonical_json(&value).unwrap();
        assert_eq!(text, r#"{"apple":2,"mango":{"a":2,"b":1},"zebra":1}"#);
    }

    #[test]
    fn canonical_json_is_deterministic() {
        let a = json!({"x": [1, 2, 3], "y": null});
        let b = json!({"y": null, "x": [1, 2, 3]});
        assert_eq!(
            to_canonical_json(&a).unwrap(),
            to_canonical_json(&b).unwrap()
        );
    }

    #[test]
    fn repairs_single_quotes() {
        let value = repair_near_json("{'count': 3}").unwrap();
        assert_eq!(value, json!({"count": 3}));
    }

    #[test]
    fn repairs_trailing_commas() {
        let value = repair_near_json(r#"{"items": [1, 2, 3,], }"#).unwrap();
        assert_eq!(value, json!({"items": [1, 2, 3]}));
    }

    #[test]
    fn preserves_quotes_inside_strings() {
        let value = repair_near_json(r#"{"note": "it's fine"}"#).unwrap();
        assert_eq!(value, json!({"note": "it's fine"}));
    }

    #[test]
    fn rejects_hopeless_input() {
        assert!(repair_near_json("not json at all {{{").is_none());
    }
}
