//! Argument validation against declared shapes.
//!
//! Validation never coerces: a text field given a number fails. Failures
//! aggregate across fields so a caller sees every problem at once. The
//! validated output contains only declared fields; anything else the
//! caller supplied is dropped.

use serde_json::{Map, Value};

use crate::schema::{FieldKind, FieldSpec, Shape, TextFormat};

/// A single per-field validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted/indexed path to the offending field, e.g. `user.email` or
    /// `tags[2]`.
    pub path: String,
    pub message: String,
}

/// Aggregated validation failure for one argument bag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", self.summary())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// One-line human-readable rendering of every failure.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Validate `args` against `shape`, producing a sanitized argument bag.
///
/// On success the output holds exactly the declared fields that were
/// present or defaulted. On failure, every failing field is reported.
pub fn validate(shape: &Shape, args: &Map<String, Value>) -> Result<Map<String, Value>, ValidationFailure> {
    let mut out = Map::new();
    let mut errors = Vec::new();
    validate_fields(shape, args, "", &mut out, &mut errors);
    if errors.is_empty() {
        Ok(out)
    } else {
        Err(ValidationFailure { errors })
    }
}

fn validate_fields(
    shape: &Shape,
    args: &Map<String, Value>,
    prefix: &str,
    out: &mut Map<String, Value>,
    errors: &mut Vec<FieldError>,
) {
    for (name, spec) in shape.fields() {
        let path = join_path(prefix, name);
        match args.get(name) {
            None => {
                if let Some(default) = &spec.default {
                    out.insert(name.to_string(), default.clone());
                } else if !spec.optional {
                    errors.push(FieldError {
                        path,
                        message: "missing required field".to_string(),
                    });
                }
            }
            Some(value) => {
                if let Some(checked) = check_value(spec, value, &path, errors) {
                    out.insert(name.to_string(), checked);
                }
            }
        }
    }
}

/// Check one present value against its spec. Returns the sanitized value,
/// or `None` after pushing at least one error.
fn check_value(
    spec: &FieldSpec,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    match &spec.kind {
        FieldKind::Text {
            min_len,
            max_len,
            format,
        } => {
            let Some(text) = value.as_str() else {
                errors.push(fail(path, "expected a string"));
                return None;
            };
            let len = text.chars().count();
            if let Some(n) = min_len {
                if len < *n {
                    errors.push(fail(path, format!("must be at least {n} characters")));
                    return None;
                }
            }
            if let Some(n) = max_len {
                if len > *n {
                    errors.push(fail(path, format!("must be at most {n} characters")));
                    return None;
                }
            }
            if let Some(tag) = format {
                if !check_format(*tag, text) {
                    errors.push(fail(path, format!("is not a valid {}", tag.as_str())));
                    return None;
                }
            }
            Some(value.clone())
        }
        FieldKind::Number { min, max, integer } => {
            if *integer && value.as_i64().is_none() && value.as_u64().is_none() {
                errors.push(fail(path, "expected an integer"));
                return None;
            }
            let Some(number) = value.as_f64() else {
                errors.push(fail(path, "expected a number"));
                return None;
            };
            if let Some(bound) = min {
                if number < *bound {
                    errors.push(fail(path, format!("must be >= {bound}")));
                    return None;
                }
            }
            if let Some(bound) = max {
                if number > *bound {
                    errors.push(fail(path, format!("must be <= {bound}")));
                    return None;
                }
            }
            Some(value.clone())
        }
        FieldKind::Boolean => {
            if value.as_bool().is_none() {
                errors.push(fail(path, "expected a boolean"));
                return None;
            }
            Some(value.clone())
        }
        FieldKind::Choice { values } => {
            let Some(text) = value.as_str() else {
                errors.push(fail(path, "expected a string"));
                return None;
            };
            if !values.iter().any(|v| v == text) {
                errors.push(fail(
                    path,
                    format!("must be one of: {}", values.join(", ")),
                ));
                return None;
            }
            Some(value.clone())
        }
        FieldKind::List {
            item,
            min_items,
            max_items,
        } => {
            let Some(elements) = value.as_array() else {
                errors.push(fail(path, "expected an array"));
                return None;
            };
            if let Some(n) = min_items {
                if elements.len() < *n {
                    errors.push(fail(path, format!("must have at least {n} items")));
                    return None;
                }
            }
            if let Some(n) = max_items {
                if elements.len() > *n {
                    errors.push(fail(path, format!("must have at most {n} items")));
                    return None;
                }
            }
            let before = errors.len();
            let checked: Vec<Value> = elements
                .iter()
                .enumerate()
                .filter_map(|(index, element)| {
                    check_value(item, element, &format!("{path}[{index}]"), errors)
                })
                .collect();
            (errors.len() == before).then(|| Value::Array(checked))
        }
        FieldKind::Record { fields } => {
            let Some(nested) = value.as_object() else {
                errors.push(fail(path, "expected an object"));
                return None;
            };
            let before = errors.len();
            let mut checked = Map::new();
            validate_fields(fields, nested, path, &mut checked, errors);
            (errors.len() == before).then(|| Value::Object(checked))
        }
    }
}

fn check_format(tag: TextFormat, text: &str) -> bool {
    match tag {
        TextFormat::Email => is_email(text),
        TextFormat::Url => is_url(text),
        TextFormat::Uuid => is_uuid(text),
    }
}

// Small acceptance checks, not full RFC parsers.

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@')
}

fn is_url(text: &str) -> bool {
    let rest = text
        .strip_prefix("http://")
        .or_else(|| text.strip_prefix("https://"));
    matches!(rest, Some(host) if !host.is_empty())
}

fn is_uuid(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => *b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

fn fail(path: &str, message: impl Into<String>) -> FieldError {
    FieldError {
        path: path.to_string(),
        message: message.into(),
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
