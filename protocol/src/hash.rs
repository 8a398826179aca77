//! Canonical hashing of feed data.
//!
//! The fingerprint must match the server's byte-for-byte: object keys sorted
//! by code point, no whitespace, shortest number forms, standard JSON string
//! escapes, UTF-8 bytes. MD5 is a cheap change detector here, not a security
//! boundary.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::Digest as _;
use md5::Md5;
use serde_json::Number;
use serde_json::Value;

use crate::delta::MAX_SAFE_INTEGER;

/// Computes the base64 MD5 fingerprint of `data` in canonical form. The
/// result is always 24 characters.
pub fn feed_data_hash(data: &Value) -> String {
    let mut canonical = String::new();
    write_value(&mut canonical, data);
    STANDARD.encode(Md5::digest(canonical.as_bytes()))
}

/// Compares `data` against a server-supplied fingerprint.
pub fn verify_feed_data(data: &Value, feed_md5: &str) -> bool {
    feed_data_hash(data) == feed_md5
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(boolean) => out.push_str(if *boolean { "true" } else { "false" }),
        Value::Number(number) => write_number(out, number),
        Value::String(string) => write_string(out, string),
        Value::Array(items) => {
            out.push('[');
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_unstable_by(|left, right| left.0.cmp(right.0));
            out.push('{');
            for (position, (key, member)) in members.into_iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, member);
            }
            out.push('}');
        }
    }
}

/// Integral floats render as integers (`2` rather than `2.0`), matching the
/// shortest-form rendering servers produce.
fn write_number(out: &mut String, number: &Number) {
    if let Some(integer) = number.as_i64() {
        let _ = write!(out, "{integer}");
    } else if let Some(integer) = number.as_u64() {
        let _ = write!(out, "{integer}");
    } else if let Some(float) = number.as_f64() {
        if float.fract() == 0.0 && float.abs() <= MAX_SAFE_INTEGER {
            let _ = write!(out, "{}", float as i64);
        } else {
            let _ = write!(out, "{number}");
        }
    }
}

fn write_string(out: &mut String, string: &str) {
    out.push('"');
    for character in string.chars() {
        match character {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            character if (character as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", character as u32);
            }
            character => out.push(character),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn canonical(value: &Value) -> String {
        let mut out = String::new();
        write_value(&mut out, value);
        out
    }

    #[test]
    fn known_fingerprints() {
        let cases = vec![
            (json!({"member": "myval"}), "2vD60QUu+6QYUPOIEvbbPg=="),
            (json!({}), "mZFLkyvTelC5g8XnyQrpOw=="),
            (json!({"arg": "val"}), "aNMxouqVoniYhVzKrWZe0Q=="),
            (
                json!({"a": 1, "b": [1, 2, 3], "c": {"d": "x"}}),
                "XkVscUE06vEgV8OLqvQ1DQ==",
            ),
            (
                json!({"nested": {"deep": {"deeper": [{"k": "v"}, 2, false]}}}),
                "o0bJ/+CcpkP0UOqOWU/osw==",
            ),
            (json!({"count": 42}), "0f4Q9xxQUzyHI4vBJNOndw=="),
            (json!({"status": "ok"}), "DwR5h0v29KcoEJmxXfJ8Jw=="),
        ];
        for (data, expected) in cases {
            assert_eq!(feed_data_hash(&data), expected);
            assert!(verify_feed_data(&data, expected));
        }
    }

    #[test]
    fn object_keys_are_sorted_regardless_of_insertion_order() {
        let data = json!({"z": true, "a": null, "m": 1.5});
        assert_eq!(canonical(&data), r#"{"a":null,"m":1.5,"z":true}"#);
        assert_eq!(feed_data_hash(&data), "ouf2rZw6/2vGPJADORgBcQ==");
    }

    #[test]
    fn integral_floats_render_as_integers() {
        assert_eq!(canonical(&json!({"count": 42.0})), r#"{"count":42}"#);
        assert_eq!(
            feed_data_hash(&json!({"count": 42.0})),
            feed_data_hash(&json!({"count": 42}))
        );
    }

    #[test]
    fn strings_use_standard_json_escapes() {
        let data = json!({"s": "a\"b\\c\n\t\u{01}"});
        assert_eq!(canonical(&data), "{\"s\":\"a\\\"b\\\\c\\n\\t\\u0001\"}");
    }

    #[test]
    fn mismatched_fingerprints_fail_verification() {
        assert!(!verify_feed_data(
            &json!({"member": "other"}),
            "2vD60QUu+6QYUPOIEvbbPg=="
        ));
    }
}
