//! Declared argument shapes and their portable JSON Schema projection.
//!
//! A [`Shape`] is the author-side description of an operation's or
//! template's expected arguments. The field kinds form a closed union, so
//! translation and validation match exhaustively instead of probing
//! runtime type identity.

use serde_json::{json, Map, Value};

/// Recognized string format tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Email,
    Url,
    Uuid,
}

impl TextFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Uuid => "uuid",
        }
    }
}

/// Constraint kind for a single declared field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// UTF-8 string with optional length bounds and format tag.
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
        format: Option<TextFormat>,
    },
    /// Numeric value with optional inclusive bounds. `integer` rejects
    /// values with a fractional part.
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Boolean,
    /// One of a fixed, ordered set of string values.
    Choice { values: Vec<String> },
    /// Homogeneous array with optional item-count bounds.
    List {
        item: Box<FieldSpec>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// Nested object; recurses into a full sub-shape.
    Record { fields: Shape },
}

/// A single declared field: constraint kind plus presence metadata.
///
/// A field carrying a default is implicitly optional.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub description: Option<String>,
    pub optional: bool,
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            description: None,
            optional: false,
            default: None,
        }
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text {
            min_len: None,
            max_len: None,
            format: None,
        })
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number {
            min: None,
            max: None,
            integer: false,
        })
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Number {
            min: None,
            max: None,
            integer: true,
        })
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FieldKind::Choice {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn list(item: FieldSpec) -> Self {
        Self::new(FieldKind::List {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        })
    }

    pub fn record(fields: Shape) -> Self {
        Self::new(FieldKind::Record { fields })
    }

    /// Attach a human-readable description, carried into the portable form.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Mark the field as optional-presence.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Supply a default used when the caller omits the field. Implies
    /// optional presence.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Minimum length; applies to text fields.
    pub fn min_len(mut self, n: usize) -> Self {
        if let FieldKind::Text { min_len, .. } = &mut self.kind {
            *min_len = Some(n);
        }
        self
    }

    /// Maximum length; applies to text fields.
    pub fn max_len(mut self, n: usize) -> Self {
        if let FieldKind::Text { max_len, .. } = &mut self.kind {
            *max_len = Some(n);
        }
        self
    }

    /// Format tag; applies to text fields.
    pub fn format(mut self, tag: TextFormat) -> Self {
        if let FieldKind::Text { format, .. } = &mut self.kind {
            *format = Some(tag);
        }
        self
    }

    /// Minimum value (inclusive); applies to number fields.
    pub fn min(mut self, bound: f64) -> Self {
        if let FieldKind::Number { min, .. } = &mut self.kind {
            *min = Some(bound);
        }
        self
    }

    /// Maximum value (inclusive); applies to number fields.
    pub fn max(mut self, bound: f64) -> Self {
        if let FieldKind::Number { max, .. } = &mut self.kind {
            *max = Some(bound);
        }
        self
    }

    /// Minimum item count; applies to list fields.
    pub fn min_items(mut self, n: usize) -> Self {
        if let FieldKind::List { min_items, .. } = &mut self.kind {
            *min_items = Some(n);
        }
        self
    }

    /// Maximum item count; applies to list fields.
    pub fn max_items(mut self, n: usize) -> Self {
        if let FieldKind::List { max_items, .. } = &mut self.kind {
            *max_items = Some(n);
        }
        self
    }

    /// A field is required when it is neither optional nor defaulted.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }

    /// Portable JSON Schema document for this field.
    pub fn json_schema(&self) -> Value {
        let mut doc = match &self.kind {
            FieldKind::Text {
                min_len,
                max_len,
                format,
            } => {
                let mut doc = Map::new();
                doc.insert("type".to_string(), json!("string"));
                if let Some(n) = min_len {
                    doc.insert("minLength".to_string(), json!(n));
                }
                if let Some(n) = max_len {
                    doc.insert("maxLength".to_string(), json!(n));
                }
                if let Some(tag) = format {
                    doc.insert("format".to_string(), json!(tag.as_str()));
                }
                doc
            }
            FieldKind::Number { min, max, integer } => {
                let mut doc = Map::new();
                doc.insert(
                    "type".to_string(),
                    json!(if *integer { "integer" } else { "number" }),
                );
                if let Some(bound) = min {
                    doc.insert("minimum".to_string(), json!(bound));
                }
                if let Some(bound) = max {
                    doc.insert("maximum".to_string(), json!(bound));
                }
                doc
            }
            FieldKind::Boolean => {
                let mut doc = Map::new();
                doc.insert("type".to_string(), json!("boolean"));
                doc
            }
            FieldKind::Choice { values } => {
                let mut doc = Map::new();
                doc.insert("type".to_string(), json!("string"));
                doc.insert("enum".to_string(), json!(values));
                doc
            }
            FieldKind::List {
                item,
                min_items,
                max_items,
            } => {
                let mut doc = Map::new();
                doc.insert("type".to_string(), json!("array"));
                doc.insert("items".to_string(), item.json_schema());
                if let Some(n) = min_items {
                    doc.insert("minItems".to_string(), json!(n));
                }
                if let Some(n) = max_items {
                    doc.insert("maxItems".to_string(), json!(n));
                }
                doc
            }
            FieldKind::Record { fields } => match fields.json_schema() {
                Value::Object(doc) => doc,
                _ => Map::new(),
            },
        };

        if let Some(text) = &self.description {
            doc.insert("description".to_string(), json!(text));
        }
        if let Some(value) = &self.default {
            doc.insert("default".to_string(), value.clone());
        }
        Value::Object(doc)
    }
}

/// Ordered collection of named fields. Declaration order is preserved and
/// flows through to the portable description's property and required-name
/// ordering.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    fields: Vec<(String, FieldSpec)>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Re-declaring a name replaces the earlier spec in place.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        if let Some(existing) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = spec;
        } else {
            self.fields.push((name, spec));
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Portable `{type, properties, required}` document for the whole
    /// shape. Regenerated on each call; callers never mutate it.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.fields {
            properties.insert(name.clone(), spec.json_schema());
            if spec.is_required() {
                required.push(Value::String(name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
