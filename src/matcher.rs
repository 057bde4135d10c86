// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The recursive structural matcher behind [`check`] and [`test`].

use crate::audit;
use crate::error::{Error, MatchError, Result};
use crate::pattern::{Kind, Pattern};
use crate::value::Value;

use std::collections::BTreeMap;
use std::sync::Arc;

const ONE_OF_FAILED: &str = "Failed OneOf or Optional validation";

/// Checks that `value` matches `pattern`, faulting with a path-annotated
/// [`MatchError`] on mismatch.
///
/// When an audited call is active, the value is recorded with its audit
/// before matching (a failed check still consumes its argument). The
/// lenient context read keeps `check` usable from plain call sites outside
/// any logical execution context; it silently skips audit integration
/// there.
pub fn check(value: &Value, pattern: &Pattern) -> Result<()> {
    if let Some(current) = audit::current() {
        current.record(value);
    }
    check_subtree(value, pattern)
}

/// Returns whether `value` matches `pattern`. Mismatches become `false`;
/// faults about malformed patterns still propagate. Does not interact with
/// any active call audit.
pub fn test(value: &Value, pattern: &Pattern) -> Result<bool> {
    match check_subtree(value, pattern) {
        Ok(()) => Ok(true),
        Err(Error::Match(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

fn fail(message: impl Into<String>) -> Error {
    Error::Match(MatchError::new(message))
}

fn stringify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
}

// Literal patterns read better unquoted in messages: "Expected foo, got ..".
fn literal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        _ => stringify(value),
    }
}

// Scalars keep their raw text in the Integer message; only structured
// values get stringified.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Undefined => "undefined".to_string(),
        _ => stringify(value),
    }
}

fn check_subtree(value: &Value, pattern: &Pattern) -> Result<()> {
    match pattern {
        // Match anything!
        Pattern::Any => Ok(()),

        // Basic atomic kinds. Opaque wrappers of a primitive do not match.
        Pattern::TypeOf(kind) => {
            let matched = matches!(
                (kind, value),
                (Kind::String, Value::String(_))
                    | (Kind::Number, Value::Number(_))
                    | (Kind::Boolean, Value::Bool(_))
                    | (Kind::Undefined, Value::Undefined)
            );
            if matched {
                Ok(())
            } else {
                Err(fail(format!(
                    "Expected {}, got {}",
                    kind.name(),
                    value.kind_name()
                )))
            }
        }

        Pattern::Null => match value {
            Value::Null => Ok(()),
            _ => Err(fail(format!("Expected null, got {}", stringify(value)))),
        },

        // Strings, numbers, and booleans match literally.
        Pattern::Literal(expected) => match expected {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                if value == expected {
                    Ok(())
                } else {
                    Err(fail(format!(
                        "Expected {}, got {}",
                        literal_text(expected),
                        stringify(value)
                    )))
                }
            }
            _ => Err(Error::InvalidPattern(format!(
                "literal patterns must be a string, number, or boolean, got {}",
                expected.kind_name()
            ))),
        },

        Pattern::Integer => match value {
            Value::Number(n) if n.fits_i32() => Ok(()),
            _ => Err(fail(format!("Expected Integer, got {}", scalar_text(value)))),
        },

        Pattern::ArrayOf(element) => {
            let items = match value {
                Value::Array(items) => items,
                _ => return Err(fail(format!("Expected array, got {}", stringify(value)))),
            };
            for (index, item) in items.iter().enumerate() {
                check_subtree(item, element).map_err(|err| at_index(err, index))?;
            }
            Ok(())
        }

        // The condition can return Ok(false) or fail with a match error
        // (i.e. it can internally use check()) to fail the match.
        Pattern::Where(condition) => {
            if condition(value)? {
                Ok(())
            } else {
                Err(fail("Failed Where validation"))
            }
        }

        // Optional(p) is OneOf(undefined, p): an inner mismatch collapses
        // into the generic OneOf failure, while non-match faults propagate.
        Pattern::Optional(inner) => {
            if value.is_undefined() {
                return Ok(());
            }
            match check_subtree(value, inner) {
                Err(Error::Match(_)) => Err(fail(ONE_OF_FAILED)),
                other => other,
            }
        }

        Pattern::OneOf(choices) => {
            if choices.is_empty() {
                return Err(Error::InvalidPattern(
                    "OneOf requires at least one choice".into(),
                ));
            }
            for choice in choices {
                match check_subtree(value, choice) {
                    Ok(()) => return Ok(()),
                    // A mismatch just means: try the next choice.
                    Err(Error::Match(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
            // Which choice came closest is not preserved; all the caller
            // gets is the single generic failure.
            Err(fail(ONE_OF_FAILED))
        }

        Pattern::InstanceOf { name, type_id } => match value {
            Value::Opaque(o) if o.type_id() == *type_id => Ok(()),
            _ => Err(fail(format!("Expected {name}"))),
        },

        Pattern::ObjectIncluding(shape) => check_object(value, shape, true, None),

        Pattern::ObjectWithValues(value_pattern) => {
            let no_required_keys = BTreeMap::new();
            check_object(value, &no_required_keys, true, Some(value_pattern.as_ref()))
        }

        Pattern::Object(shape) => check_object(value, shape, false, None),
    }
}

fn check_object(
    value: &Value,
    shape: &BTreeMap<Arc<str>, Pattern>,
    unknown_keys_allowed: bool,
    unknown_key_pattern: Option<&Pattern>,
) -> Result<()> {
    // This does NOT structurally match values of special types that happen
    // to satisfy the shape: it really needs to be a plain data object.
    let fields = match value {
        Value::Object(fields) => fields,
        Value::Null => return Err(fail("Expected object, got null")),
        Value::Opaque(_) => return Err(fail("Expected plain object")),
        _ => {
            return Err(fail(format!(
                "Expected object, got {}",
                value.kind_name()
            )))
        }
    };

    let mut required: BTreeMap<&str, &Pattern> = BTreeMap::new();
    let mut optional: BTreeMap<&str, &Pattern> = BTreeMap::new();
    for (key, sub_pattern) in shape.iter() {
        match sub_pattern {
            Pattern::Optional(inner) => {
                optional.insert(key.as_ref(), inner.as_ref());
            }
            _ => {
                required.insert(key.as_ref(), sub_pattern);
            }
        }
    }

    for (key, sub_value) in fields.iter() {
        let result = if let Some(sub_pattern) = required.remove(key.as_ref()) {
            check_subtree(sub_value, sub_pattern)
        } else if let Some(sub_pattern) = optional.get(key.as_ref()).copied() {
            check_subtree(sub_value, sub_pattern)
        } else if !unknown_keys_allowed {
            Err(fail("Unknown key"))
        } else if let Some(sub_pattern) = unknown_key_pattern {
            check_subtree(sub_value, sub_pattern)
        } else {
            Ok(())
        };
        result.map_err(|err| at_key(err, key))?;
    }

    // Keys iterate in sorted order, so the missing key reported is always
    // the lexicographically smallest one.
    if let Some(key) = required.keys().next() {
        return Err(fail(format!("Missing key '{key}'")));
    }
    Ok(())
}

// Only match-kind failures accumulate path segments; other faults pass
// through untouched.
fn at_index(err: Error, index: usize) -> Error {
    match err {
        Error::Match(mut m) => {
            m.path = prepend_path(&index.to_string(), &m.path);
            Error::Match(m)
        }
        other => other,
    }
}

fn at_key(err: Error, key: &str) -> Error {
    match err {
        Error::Match(mut m) => {
            m.path = prepend_path(key, &m.path);
            Error::Match(m)
        }
        other => other,
    }
}

// Keys that would read ambiguously as a bare `.key` segment are rendered
// in a quoted bracket form instead. The word list matches JavaScript's
// reserved words, the lingua franca for paths into JSON-shaped data.
const RESERVED_WORDS: &[&str] = &[
    "do", "if", "in", "for", "let", "new", "try", "var", "case", "else", "enum", "eval", "false",
    "null", "this", "true", "void", "with", "break", "catch", "class", "const", "super", "throw",
    "while", "yield", "delete", "export", "import", "public", "return", "static", "switch",
    "typeof", "default", "extends", "finally", "package", "private", "continue", "debugger",
    "function", "arguments", "interface", "protected", "implements", "instanceof",
];

// Assumes the base of the path is already rendered; returns key + base.
fn prepend_path(key: &str, base: &str) -> String {
    let rendered = if is_index(key) {
        format!("[{key}]")
    } else if !is_identifier(key) || RESERVED_WORDS.contains(&key) {
        serde_json::to_string(&[key]).unwrap_or_else(|_| format!("[{key:?}]"))
    } else {
        key.to_string()
    };

    if !base.is_empty() && !base.starts_with('[') {
        format!("{rendered}.{base}")
    } else {
        format!("{rendered}{base}")
    }
}

fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::prepend_path;

    #[test]
    fn path_rendering() {
        assert_eq!(prepend_path("2", ""), "[2]");
        assert_eq!(prepend_path("a", "[0]"), "a[0]");
        assert_eq!(prepend_path("0", "a.b"), "[0].a.b");
        assert_eq!(prepend_path("vals", "[3].entity"), "vals[3].entity");
        assert_eq!(prepend_path("entity", "created"), "entity.created");
    }

    #[test]
    fn path_quotes_non_identifiers_and_reserved_words() {
        assert_eq!(prepend_path("strange key", ""), r#"["strange key"]"#);
        assert_eq!(prepend_path("return", "x"), r#"["return"].x"#);
        assert_eq!(prepend_path("$ok_1", "y"), "$ok_1.y");
    }
}
