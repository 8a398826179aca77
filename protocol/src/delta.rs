//! Feed-data deltas: the mutation catalogue carried by action revelations.
//!
//! A delta addresses a location in the feed-data tree with a [`Path`] and
//! mutates it. Structural mismatches (missing keys, out-of-range indexes,
//! wrong JSON types) are typed errors so the session can discard the whole
//! revelation without corrupting its reference data.

use serde::Deserialize;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

/// Largest magnitude at which every integer is exactly representable in an
/// f64 (2^53).
pub(crate) const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// One step of a [`Path`]: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Navigation from the feed-data root. An empty path addresses the root
/// itself. The first segment (if any) is always an object key, because feed
/// data roots are objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<RawPathSegment>")]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPathSegment {
    Key(String),
    Index(u64),
}

impl TryFrom<Vec<RawPathSegment>> for Path {
    type Error = String;

    fn try_from(raw: Vec<RawPathSegment>) -> Result<Self, Self::Error> {
        let mut segments = Vec::with_capacity(raw.len());
        for (position, segment) in raw.into_iter().enumerate() {
            match segment {
                RawPathSegment::Key(key) => {
                    if key.is_empty() {
                        return Err("path keys must be non-empty strings".to_string());
                    }
                    segments.push(PathSegment::Key(key));
                }
                RawPathSegment::Index(index) => {
                    if position == 0 {
                        return Err("the first path element must be an object key".to_string());
                    }
                    let index = usize::try_from(index)
                        .map_err(|_| "array index does not fit this platform".to_string())?;
                    segments.push(PathSegment::Index(index));
                }
            }
        }
        Ok(Self { segments })
    }
}

/// A single feed-data mutation, keyed on its wire `Operation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDelta")]
pub enum FeedDelta {
    /// Replace the value at `path`. An empty path replaces the whole tree
    /// (the replacement must itself be an object).
    Set { path: Path, value: Value },
    /// Remove the terminal key from its parent object.
    Delete { path: Path },
    /// Remove every element structurally equal to `value` from the array at
    /// `path`.
    DeleteValue { path: Path, value: Value },
    Prepend { path: Path, value: String },
    Append { path: Path, value: String },
    Increment { path: Path, value: Number },
    Decrement { path: Path, value: Number },
    Toggle { path: Path },
    InsertFirst { path: Path, value: Value },
    InsertLast { path: Path, value: Value },
    /// Insert before the array element addressed by the terminal index.
    InsertBefore { path: Path, value: Value },
    InsertAfter { path: Path, value: Value },
    DeleteFirst { path: Path },
    DeleteLast { path: Path },
}

/// Wire shape shared by all operations; `Operation` picks the variant and
/// decides whether `Value` is required, forbidden, and of which type.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawDelta {
    operation: String,
    path: Path,
    #[serde(default)]
    value: Option<Value>,
}

impl TryFrom<RawDelta> for FeedDelta {
    type Error = String;

    fn try_from(raw: RawDelta) -> Result<Self, Self::Error> {
        let RawDelta {
            operation,
            path,
            value,
        } = raw;
        let delta = match operation.as_str() {
            "Set" => FeedDelta::Set {
                path,
                value: required_value(&operation, value)?,
            },
            "Delete" => {
                no_value(&operation, value)?;
                FeedDelta::Delete { path }
            }
            "DeleteValue" => FeedDelta::DeleteValue {
                path,
                value: required_value(&operation, value)?,
            },
            "Prepend" => FeedDelta::Prepend {
                path,
                value: string_value(&operation, value)?,
            },
            "Append" => FeedDelta::Append {
                path,
                value: string_value(&operation, value)?,
            },
            "Increment" => FeedDelta::Increment {
                path,
                value: number_value(&operation, value)?,
            },
            "Decrement" => FeedDelta::Decrement {
                path,
                value: number_value(&operation, value)?,
            },
            "Toggle" => {
                no_value(&operation, value)?;
                FeedDelta::Toggle { path }
            }
            "InsertFirst" => FeedDelta::InsertFirst {
                path,
                value: required_value(&operation, value)?,
            },
            "InsertLast" => FeedDelta::InsertLast {
                path,
                value: required_value(&operation, value)?,
            },
            "InsertBefore" => FeedDelta::InsertBefore {
                path,
                value: required_value(&operation, value)?,
            },
            "InsertAfter" => FeedDelta::InsertAfter {
                path,
                value: required_value(&operation, value)?,
            },
            "DeleteFirst" => {
                no_value(&operation, value)?;
                FeedDelta::DeleteFirst { path }
            }
            "DeleteLast" => {
                no_value(&operation, value)?;
                FeedDelta::DeleteLast { path }
            }
            other => return Err(format!("unrecognized delta Operation `{other}`")),
        };
        Ok(delta)
    }
}

fn required_value(operation: &str, value: Option<Value>) -> Result<Value, String> {
    value.ok_or_else(|| format!("{operation} requires a Value"))
}

fn no_value(operation: &str, value: Option<Value>) -> Result<(), String> {
    if value.is_some() {
        return Err(format!("{operation} does not take a Value"));
    }
    Ok(())
}

fn string_value(operation: &str, value: Option<Value>) -> Result<String, String> {
    match required_value(operation, value)? {
        Value::String(string) => Ok(string),
        _ => Err(format!("{operation} requires a string Value")),
    }
}

fn number_value(operation: &str, value: Option<Value>) -> Result<Number, String> {
    match required_value(operation, value)? {
        Value::Number(number) => Ok(number),
        _ => Err(format!("{operation} requires a numeric Value")),
    }
}

/// A delta that is structurally valid but does not fit the tree it was
/// applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("path references missing object key `{0}`")]
    MissingKey(String),
    #[error("array index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("expected {expected} at the addressed location")]
    WrongType { expected: &'static str },
    #[error("operation cannot be applied to the feed-data root")]
    RootPath,
    #[error("replacing the feed-data root requires an object value")]
    RootNotObject,
    #[error("path must end in an array index")]
    IndexRequired,
    #[error("path must end in an object key")]
    KeyRequired,
    #[error("cannot delete from an empty array")]
    EmptyArray,
    #[error("arithmetic produced a non-finite number")]
    NonFinite,
}

/// Applies `delta` to `data` in place.
///
/// Each operation validates fully before mutating, so a failing delta leaves
/// `data` untouched. Callers applying a *sequence* must work on a scratch
/// clone: earlier deltas in the sequence will already have landed when a
/// later one fails.
pub fn apply(data: &mut Value, delta: &FeedDelta) -> Result<(), DeltaError> {
    match delta {
        FeedDelta::Set { path, value } => set(data, path, value),
        FeedDelta::Delete { path } => delete(data, path),
        FeedDelta::DeleteValue { path, value } => {
            as_array(resolve(data, path.segments())?)?.retain(|element| element != value);
            Ok(())
        }
        FeedDelta::Prepend { path, value } => {
            as_string(resolve(data, path.segments())?)?.insert_str(0, value);
            Ok(())
        }
        FeedDelta::Append { path, value } => {
            as_string(resolve(data, path.segments())?)?.push_str(value);
            Ok(())
        }
        FeedDelta::Increment { path, value } => arithmetic(data, path, value, false),
        FeedDelta::Decrement { path, value } => arithmetic(data, path, value, true),
        FeedDelta::Toggle { path } => {
            let target = as_bool(resolve(data, path.segments())?)?;
            *target = !*target;
            Ok(())
        }
        FeedDelta::InsertFirst { path, value } => {
            as_array(resolve(data, path.segments())?)?.insert(0, value.clone());
            Ok(())
        }
        FeedDelta::InsertLast { path, value } => {
            as_array(resolve(data, path.segments())?)?.push(value.clone());
            Ok(())
        }
        FeedDelta::InsertBefore { path, value } => insert_at(data, path, value, 0),
        FeedDelta::InsertAfter { path, value } => insert_at(data, path, value, 1),
        FeedDelta::DeleteFirst { path } => delete_end(data, path, true),
        FeedDelta::DeleteLast { path } => delete_end(data, path, false),
    }
}

fn resolve<'a>(root: &'a mut Value, segments: &[PathSegment]) -> Result<&'a mut Value, DeltaError> {
    let mut current = root;
    for segment in segments {
        current = step(current, segment)?;
    }
    Ok(current)
}

fn step<'a>(value: &'a mut Value, segment: &PathSegment) -> Result<&'a mut Value, DeltaError> {
    match segment {
        PathSegment::Key(key) => match value {
            Value::Object(map) => map
                .get_mut(key)
                .ok_or_else(|| DeltaError::MissingKey(key.clone())),
            _ => Err(DeltaError::WrongType {
                expected: "an object",
            }),
        },
        PathSegment::Index(index) => match value {
            Value::Array(items) => {
                let len = items.len();
                items.get_mut(*index).ok_or(DeltaError::IndexOutOfRange {
                    index: *index,
                    len,
                })
            }
            _ => Err(DeltaError::WrongType {
                expected: "an array",
            }),
        },
    }
}

fn set(data: &mut Value, path: &Path, value: &Value) -> Result<(), DeltaError> {
    let Some((last, parents)) = path.segments().split_last() else {
        if !value.is_object() {
            return Err(DeltaError::RootNotObject);
        }
        *data = value.clone();
        return Ok(());
    };
    let parent = resolve(data, parents)?;
    match (parent, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value.clone());
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            // Writing one past the end appends.
            if *index > len {
                return Err(DeltaError::IndexOutOfRange { index: *index, len });
            }
            if *index == len {
                items.push(value.clone());
            } else {
                items[*index] = value.clone();
            }
            Ok(())
        }
        (_, PathSegment::Key(_)) => Err(DeltaError::WrongType {
            expected: "an object",
        }),
        (_, PathSegment::Index(_)) => Err(DeltaError::WrongType {
            expected: "an array",
        }),
    }
}

fn delete(data: &mut Value, path: &Path) -> Result<(), DeltaError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(DeltaError::RootPath);
    };
    let PathSegment::Key(key) = last else {
        return Err(DeltaError::KeyRequired);
    };
    let parent = resolve(data, parents)?;
    let Value::Object(map) = parent else {
        return Err(DeltaError::WrongType {
            expected: "an object",
        });
    };
    if map.remove(key).is_none() {
        return Err(DeltaError::MissingKey(key.clone()));
    }
    Ok(())
}

fn insert_at(data: &mut Value, path: &Path, value: &Value, offset: usize) -> Result<(), DeltaError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(DeltaError::RootPath);
    };
    let PathSegment::Index(index) = last else {
        return Err(DeltaError::IndexRequired);
    };
    let parent = resolve(data, parents)?;
    let Value::Array(items) = parent else {
        return Err(DeltaError::WrongType {
            expected: "an array",
        });
    };
    let len = items.len();
    if *index >= len {
        return Err(DeltaError::IndexOutOfRange { index: *index, len });
    }
    items.insert(index + offset, value.clone());
    Ok(())
}

fn delete_end(data: &mut Value, path: &Path, front: bool) -> Result<(), DeltaError> {
    let items = as_array(resolve(data, path.segments())?)?;
    if items.is_empty() {
        return Err(DeltaError::EmptyArray);
    }
    if front {
        items.remove(0);
    } else {
        items.pop();
    }
    Ok(())
}

fn arithmetic(data: &mut Value, path: &Path, amount: &Number, subtract: bool) -> Result<(), DeltaError> {
    let target = resolve(data, path.segments())?;
    let Value::Number(current) = &*target else {
        return Err(DeltaError::WrongType {
            expected: "a number",
        });
    };
    // Integer-to-integer arithmetic stays integral so the canonical rendering
    // of the result matches the server's.
    let next = match (current.as_i64(), amount.as_i64()) {
        (Some(current), Some(amount)) if subtract => current.checked_sub(amount).map(Number::from),
        (Some(current), Some(amount)) => current.checked_add(amount).map(Number::from),
        _ => None,
    };
    let next = match next {
        Some(next) => next,
        None => {
            let current = current.as_f64().ok_or(DeltaError::NonFinite)?;
            let amount = amount.as_f64().ok_or(DeltaError::NonFinite)?;
            let result = if subtract { current - amount } else { current + amount };
            normalized_number(result).ok_or(DeltaError::NonFinite)?
        }
    };
    *target = Value::Number(next);
    Ok(())
}

/// Stores integral results as JSON integers; `2.5 + 0.5` must render as `3`,
/// not `3.0`, for hash interop.
fn normalized_number(value: f64) -> Option<Number> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}

fn as_array(value: &mut Value) -> Result<&mut Vec<Value>, DeltaError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DeltaError::WrongType {
            expected: "an array",
        }),
    }
}

fn as_string(value: &mut Value) -> Result<&mut String, DeltaError> {
    match value {
        Value::String(string) => Ok(string),
        _ => Err(DeltaError::WrongType {
            expected: "a string",
        }),
    }
}

fn as_bool(value: &mut Value) -> Result<&mut bool, DeltaError> {
    match value {
        Value::Bool(boolean) => Ok(boolean),
        _ => Err(DeltaError::WrongType {
            expected: "a boolean",
        }),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn parse_delta(raw: serde_json::Value) -> FeedDelta {
        serde_json::from_value(raw).expect("parse delta")
    }

    fn parse_delta_err(raw: serde_json::Value) -> String {
        serde_json::from_value::<FeedDelta>(raw)
            .expect_err("delta should be rejected")
            .to_string()
    }

    #[test]
    fn set_at_root_replaces_the_whole_tree() {
        let mut data = json!({"old": true});
        let delta = parse_delta(json!({
            "Operation": "Set", "Path": [], "Value": {"member": "myval"}
        }));
        apply(&mut data, &delta).expect("apply");
        assert_eq!(data, json!({"member": "myval"}));
    }

    #[test]
    fn set_at_root_requires_an_object() {
        let mut data = json!({});
        let delta = parse_delta(json!({"Operation": "Set", "Path": [], "Value": 42}));
        assert_eq!(apply(&mut data, &delta), Err(DeltaError::RootNotObject));
        assert_eq!(data, json!({}));
    }

    #[test]
    fn set_creates_a_new_object_key() {
        let mut data = json!({"existing": 1});
        let delta = parse_delta(json!({
            "Operation": "Set", "Path": ["fresh"], "Value": "x"
        }));
        apply(&mut data, &delta).expect("apply");
        assert_eq!(data, json!({"existing": 1, "fresh": "x"}));
    }

    #[test]
    fn set_appends_at_the_array_length_but_not_past_it() {
        let mut data = json!({"items": [1, 2]});
        let append = parse_delta(json!({
            "Operation": "Set", "Path": ["items", 2], "Value": 3
        }));
        apply(&mut data, &append).expect("apply");
        assert_eq!(data, json!({"items": [1, 2, 3]}));

        let gap = parse_delta(json!({
            "Operation": "Set", "Path": ["items", 5], "Value": 9
        }));
        assert_eq!(
            apply(&mut data, &gap),
            Err(DeltaError::IndexOutOfRange { index: 5, len: 3 })
        );
    }

    #[test]
    fn set_through_a_missing_key_fails_without_mutating() {
        let mut data = json!({"present": {}});
        let delta = parse_delta(json!({
            "Operation": "Set", "Path": ["nonexistent", "child"], "Value": "x"
        }));
        assert_eq!(
            apply(&mut data, &delta),
            Err(DeltaError::MissingKey("nonexistent".to_string()))
        );
        assert_eq!(data, json!({"present": {}}));
    }

    #[test]
    fn delete_removes_an_existing_key_and_rejects_a_missing_one() {
        let mut data = json!({"a": 1, "b": 2});
        let delta = parse_delta(json!({"Operation": "Delete", "Path": ["a"]}));
        apply(&mut data, &delta).expect("apply");
        assert_eq!(data, json!({"b": 2}));

        assert_eq!(
            apply(&mut data, &delta),
            Err(DeltaError::MissingKey("a".to_string()))
        );
    }

    #[test]
    fn delete_at_root_is_rejected() {
        let mut data = json!({"a": 1});
        let delta = parse_delta(json!({"Operation": "Delete", "Path": []}));
        assert_eq!(apply(&mut data, &delta), Err(DeltaError::RootPath));
    }

    #[test]
    fn delete_value_removes_every_structural_match() {
        let mut data = json!({"items": [{"k": 1}, 2, {"k": 1}, 3]});
        let delta = parse_delta(json!({
            "Operation": "DeleteValue", "Path": ["items"], "Value": {"k": 1}
        }));
        apply(&mut data, &delta).expect("apply");
        assert_eq!(data, json!({"items": [2, 3]}));
    }

    #[test]
    fn string_and_boolean_and_number_edits() {
        let mut data = json!({"s": "world", "b": false, "n": 40});
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Prepend", "Path": ["s"], "Value": "hello "})),
        )
        .expect("prepend");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Append", "Path": ["s"], "Value": "!"})),
        )
        .expect("append");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Toggle", "Path": ["b"]})),
        )
        .expect("toggle");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Increment", "Path": ["n"], "Value": 2})),
        )
        .expect("increment");
        assert_eq!(data, json!({"s": "hello world!", "b": true, "n": 42}));
    }

    #[test]
    fn toggle_twice_is_identity() {
        let mut data = json!({"b": true});
        let delta = parse_delta(json!({"Operation": "Toggle", "Path": ["b"]}));
        apply(&mut data, &delta).expect("first toggle");
        apply(&mut data, &delta).expect("second toggle");
        assert_eq!(data, json!({"b": true}));
    }

    #[test]
    fn increment_then_decrement_is_identity() {
        let mut data = json!({"n": 7});
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Increment", "Path": ["n"], "Value": 5})),
        )
        .expect("increment");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Decrement", "Path": ["n"], "Value": 5})),
        )
        .expect("decrement");
        assert_eq!(data, json!({"n": 7}));
    }

    #[test]
    fn float_arithmetic_normalizes_integral_results() {
        let mut data = json!({"n": 2.5});
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "Increment", "Path": ["n"], "Value": 0.5})),
        )
        .expect("increment");
        let Some(Value::Number(number)) = data.get("n") else {
            panic!("n must remain a number");
        };
        assert_eq!(number.as_i64(), Some(3));
    }

    #[test]
    fn array_insertions_address_existing_elements() {
        let mut data = json!({"items": ["b"]});
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "InsertFirst", "Path": ["items"], "Value": "a"})),
        )
        .expect("insert first");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "InsertLast", "Path": ["items"], "Value": "d"})),
        )
        .expect("insert last");
        apply(
            &mut data,
            &parse_delta(
                json!({"Operation": "InsertAfter", "Path": ["items", 1], "Value": "c"}),
            ),
        )
        .expect("insert after");
        apply(
            &mut data,
            &parse_delta(
                json!({"Operation": "InsertBefore", "Path": ["items", 0], "Value": "_"}),
            ),
        )
        .expect("insert before");
        assert_eq!(data, json!({"items": ["_", "a", "b", "c", "d"]}));

        let out_of_range = parse_delta(
            json!({"Operation": "InsertBefore", "Path": ["items", 5], "Value": "x"}),
        );
        assert_eq!(
            apply(&mut data, &out_of_range),
            Err(DeltaError::IndexOutOfRange { index: 5, len: 5 })
        );
    }

    #[test]
    fn insert_before_requires_an_index_terminator() {
        let mut data = json!({"items": [1]});
        let delta = parse_delta(
            json!({"Operation": "InsertBefore", "Path": ["items"], "Value": 0}),
        );
        assert_eq!(apply(&mut data, &delta), Err(DeltaError::IndexRequired));
    }

    #[test]
    fn delete_first_and_last_trim_the_array() {
        let mut data = json!({"items": [1, 2, 3]});
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "DeleteFirst", "Path": ["items"]})),
        )
        .expect("delete first");
        apply(
            &mut data,
            &parse_delta(json!({"Operation": "DeleteLast", "Path": ["items"]})),
        )
        .expect("delete last");
        assert_eq!(data, json!({"items": [2]}));

        apply(
            &mut data,
            &parse_delta(json!({"Operation": "DeleteFirst", "Path": ["items"]})),
        )
        .expect("empty the array");
        assert_eq!(
            apply(
                &mut data,
                &parse_delta(json!({"Operation": "DeleteLast", "Path": ["items"]})),
            ),
            Err(DeltaError::EmptyArray)
        );
    }

    #[test]
    fn type_mismatches_are_typed_errors() {
        let mut data = json!({"s": "text", "n": 1, "items": []});
        let cases = vec![
            (
                json!({"Operation": "Toggle", "Path": ["s"]}),
                DeltaError::WrongType {
                    expected: "a boolean",
                },
            ),
            (
                json!({"Operation": "Append", "Path": ["n"], "Value": "x"}),
                DeltaError::WrongType {
                    expected: "a string",
                },
            ),
            (
                json!({"Operation": "Increment", "Path": ["items"], "Value": 1}),
                DeltaError::WrongType {
                    expected: "a number",
                },
            ),
            (
                json!({"Operation": "InsertLast", "Path": ["s"], "Value": 1}),
                DeltaError::WrongType {
                    expected: "an array",
                },
            ),
        ];
        for (raw, expected) in cases {
            assert_eq!(apply(&mut data, &parse_delta(raw)), Err(expected));
        }
    }

    #[test]
    fn operation_schemas_gate_the_value_field() {
        assert!(
            parse_delta_err(json!({"Operation": "Set", "Path": []})).contains("requires a Value")
        );
        assert!(
            parse_delta_err(json!({"Operation": "Toggle", "Path": ["b"], "Value": 1}))
                .contains("does not take a Value")
        );
        assert!(
            parse_delta_err(json!({"Operation": "Prepend", "Path": ["s"], "Value": 3}))
                .contains("string Value")
        );
        assert!(
            parse_delta_err(json!({"Operation": "Increment", "Path": ["n"], "Value": "1"}))
                .contains("numeric Value")
        );
        assert!(
            parse_delta_err(json!({"Operation": "Explode", "Path": []}))
                .contains("unrecognized delta Operation")
        );
    }

    #[test]
    fn path_schema_rejects_malformed_segments() {
        for raw in [
            json!({"Operation": "Toggle", "Path": [0]}),
            json!({"Operation": "Toggle", "Path": [""]}),
            json!({"Operation": "Toggle", "Path": ["a", -1]}),
            json!({"Operation": "Toggle", "Path": ["a", 1.5]}),
            json!({"Operation": "Toggle", "Path": ["a", true]}),
        ] {
            assert!(serde_json::from_value::<FeedDelta>(raw).is_err());
        }
    }

    #[test]
    fn unknown_delta_properties_are_rejected() {
        assert!(
            serde_json::from_value::<FeedDelta>(
                json!({"Operation": "Toggle", "Path": ["b"], "Extra": 1})
            )
            .is_err()
        );
    }
}
