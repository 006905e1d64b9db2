//! Capability registry: operations, data sources, and message templates.
//!
//! Registration happens on a [`ServerBuilder`] before any traffic is
//! served; [`ServerBuilder::build`] freezes the entries into an immutable
//! [`CapabilityServer`]. Handlers are caller-supplied async closures the
//! registry stores and invokes; the raw operation and template handlers
//! are private and only reachable through a validating `invoke`, so
//! validation cannot be bypassed per-call.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::content::{OperationOutput, SourceContents, TemplateOutput};
use crate::schema::Shape;
use crate::validate::{self, ValidationFailure};

/// Validated argument bag passed to operation and template handlers.
pub type Args = Map<String, Value>;

/// Error surfaced by a user-supplied handler.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Failure from invoking an operation or template. The router maps the
/// two variants differently, so they stay distinct here.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("Invalid arguments: {0}")]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

type OperationFn =
    Arc<dyn Fn(Args) -> BoxFuture<'static, Result<OperationOutput, HandlerError>> + Send + Sync>;
type SourceFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<SourceContents, HandlerError>> + Send + Sync>;
type TemplateFn =
    Arc<dyn Fn(Args) -> BoxFuture<'static, Result<TemplateOutput, HandlerError>> + Send + Sync>;

/// A named, invocable unit of server-side logic with validated input.
pub struct Operation {
    name: String,
    description: String,
    shape: Shape,
    handler: OperationFn,
}

impl Operation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Portable description of the declared input shape.
    pub fn input_schema(&self) -> Value {
        self.shape.json_schema()
    }

    /// Validate `args` against the declared shape, then run the handler.
    /// User code is never reached when validation fails.
    pub async fn invoke(&self, args: &Args) -> Result<OperationOutput, InvokeError> {
        let validated = validate::validate(&self.shape, args)?;
        Ok((self.handler)(validated).await?)
    }
}

/// A named, URI-addressed read-only resource.
pub struct DataSource {
    name: String,
    uri: String,
    description: String,
    handler: SourceFn,
}

impl DataSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the handler with the requested URI.
    pub async fn read(&self, uri: &str) -> Result<SourceContents, HandlerError> {
        (self.handler)(uri.to_string()).await
    }
}

/// A named, parameterized message-construction unit.
pub struct Template {
    name: String,
    description: String,
    shape: Shape,
    handler: TemplateFn,
}

impl Template {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Validate `args` against the declared shape, then run the handler.
    pub async fn invoke(&self, args: &Args) -> Result<TemplateOutput, InvokeError> {
        let validated = validate::validate(&self.shape, args)?;
        Ok((self.handler)(validated).await?)
    }
}

// ---------------------------------------------------------------------------
// Listing snapshots
// ---------------------------------------------------------------------------

/// Listing entry for one operation. Never exposes the handler.
#[derive(Debug, Clone, Serialize)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Listing entry for one data source.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceInfo {
    pub uri: String,
    pub name: String,
    pub description: String,
}

/// Listing entry for one template, with argument descriptors derived from
/// its declared shape.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub description: String,
    pub arguments: Vec<TemplateArgument>,
}

/// One declared template argument.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateArgument {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates capability registrations before the server starts serving.
///
/// Registration is fluent and last-write-wins: re-registering a name
/// replaces the earlier entry in place.
#[derive(Default)]
pub struct ServerBuilder {
    operations: Vec<Operation>,
    data_sources: Vec<DataSource>,
    templates: Vec<Template>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation with its declared input shape and handler.
    pub fn operation<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        shape: Shape,
        handler: F,
    ) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OperationOutput, HandlerError>> + Send + 'static,
    {
        let entry = Operation {
            name: name.into(),
            description: description.into(),
            shape,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        };
        upsert(&mut self.operations, entry, |e| e.name.clone());
        self
    }

    /// Register a data source addressed by `uri`. The handler receives the
    /// URI it was looked up under.
    pub fn data_source<F, Fut>(
        mut self,
        name: impl Into<String>,
        uri: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SourceContents, HandlerError>> + Send + 'static,
    {
        let entry = DataSource {
            name: name.into(),
            uri: uri.into(),
            description: description.into(),
            handler: Arc::new(move |uri| Box::pin(handler(uri))),
        };
        upsert(&mut self.data_sources, entry, |e| e.name.clone());
        self
    }

    /// Register a message template with its declared argument shape.
    pub fn template<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        shape: Shape,
        handler: F,
    ) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TemplateOutput, HandlerError>> + Send + 'static,
    {
        let entry = Template {
            name: name.into(),
            description: description.into(),
            shape,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        };
        upsert(&mut self.templates, entry, |e| e.name.clone());
        self
    }

    /// Freeze the registrations into an immutable capability server.
    pub fn build(self) -> CapabilityServer {
        CapabilityServer {
            operations: self.operations,
            data_sources: self.data_sources,
            templates: self.templates,
        }
    }
}

/// Replace an entry with the same key in place, else append.
fn upsert<T>(entries: &mut Vec<T>, entry: T, key: impl Fn(&T) -> String) {
    let entry_key = key(&entry);
    if let Some(existing) = entries.iter_mut().find(|e| key(e) == entry_key) {
        *existing = entry;
    } else {
        entries.push(entry);
    }
}

// ---------------------------------------------------------------------------
// Frozen registry
// ---------------------------------------------------------------------------

/// Immutable snapshot of all registered capabilities, read-only for the
/// lifetime of the serving process.
pub struct CapabilityServer {
    operations: Vec<Operation>,
    data_sources: Vec<DataSource>,
    templates: Vec<Template>,
}

impl CapabilityServer {
    pub fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.name == name)
    }

    /// Data sources are addressed by URI at read time; names are for
    /// listing only.
    pub fn find_data_source(&self, uri: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|d| d.uri == uri)
    }

    pub fn find_template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn has_data_sources(&self) -> bool {
        !self.data_sources.is_empty()
    }

    pub fn has_templates(&self) -> bool {
        !self.templates.is_empty()
    }

    /// Listing snapshot in registration order.
    pub fn list_operations(&self) -> Vec<OperationInfo> {
        self.operations
            .iter()
            .map(|o| OperationInfo {
                name: o.name.clone(),
                description: o.description.clone(),
                input_schema: o.input_schema(),
            })
            .collect()
    }

    /// Listing snapshot in registration order.
    pub fn list_data_sources(&self) -> Vec<DataSourceInfo> {
        self.data_sources
            .iter()
            .map(|d| DataSourceInfo {
                uri: d.uri.clone(),
                name: d.name.clone(),
                description: d.description.clone(),
            })
            .collect()
    }

    /// Listing snapshot in registration order, argument descriptors
    /// derived from each template's declared shape.
    pub fn list_templates(&self) -> Vec<TemplateInfo> {
        self.templates
            .iter()
            .map(|t| TemplateInfo {
                name: t.name.clone(),
                description: t.description.clone(),
                arguments: t
                    .shape
                    .fields()
                    .map(|(name, spec)| TemplateArgument {
                        name: name.to_string(),
                        description: spec.description.clone(),
                        required: spec.is_required(),
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn operation_invoke_validates_before_user_code() {
        let server = ServerBuilder::new()
            .operation(
                "shout",
                "Uppercase a word",
                Shape::new().field("word", FieldSpec::text().min_len(1)),
                |args: Args| async move {
                    let word = args
                        .get("word")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_uppercase();
                    Ok(OperationOutput::text(word))
                },
            )
            .build();

        let op = server.find_operation("shout").unwrap();
        let out = op.invoke(&args(json!({"word": "hi"}))).await.unwrap();
        assert_eq!(out.content[0], crate::content::ContentItem::text("HI"));

        // Validation failure short-circuits; the handler never runs.
        let err = op.invoke(&args(json!({"word": 3}))).await.unwrap_err();
        assert!(matches!(err, InvokeError::Validation(_)));
    }

    #[tokio::test]
    async fn reregistering_a_name_replaces_the_handler() {
        let server = ServerBuilder::new()
            .operation("dup", "first", Shape::new(), |_| async {
                Ok(OperationOutput::text("first"))
            })
            .operation("dup", "second", Shape::new(), |_| async {
                Ok(OperationOutput::text("second"))
            })
            .build();

        assert_eq!(server.list_operations().len(), 1);
        assert_eq!(server.list_operations()[0].description, "second");

        let op = server.find_operation("dup").unwrap();
        let out = op.invoke(&Args::new()).await.unwrap();
        assert_eq!(out.content[0], crate::content::ContentItem::text("second"));
    }

    #[tokio::test]
    async fn data_source_lookup_is_by_uri() {
        let server = ServerBuilder::new()
            .data_source("status", "system://status", "Process status", |uri| async move {
                Ok(SourceContents::text(uri, "ok"))
            })
            .build();

        assert!(server.find_data_source("system://status").is_some());
        assert!(server.find_data_source("status").is_none());

        let source = server.find_data_source("system://status").unwrap();
        let contents = source.read("system://status").await.unwrap();
        assert_eq!(contents.contents[0].uri, "system://status");
    }

    #[test]
    fn listings_preserve_registration_order_and_hide_handlers() {
        let server = ServerBuilder::new()
            .operation("b", "second letter", Shape::new(), |_| async {
                Ok(OperationOutput::text(""))
            })
            .operation("a", "first letter", Shape::new(), |_| async {
                Ok(OperationOutput::text(""))
            })
            .build();

        let listings = server.list_operations();
        let names: Vec<&str> = listings.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let listed = serde_json::to_value(server.list_operations()).unwrap();
        assert!(listed[0].get("handler").is_none());
        assert_eq!(listed[0]["inputSchema"]["type"], "object");
    }

    #[test]
    fn template_arguments_derive_from_shape() {
        let server = ServerBuilder::new()
            .template(
                "greeting",
                "Build a greeting",
                Shape::new()
                    .field("name", FieldSpec::text().describe("Who to greet"))
                    .field("tone", FieldSpec::choice(["formal", "casual"]).optional()),
                |_| async { Ok(TemplateOutput::new(vec![])) },
            )
            .build();

        let templates = server.list_templates();
        assert_eq!(templates.len(), 1);
        let arguments = &templates[0].arguments;
        assert_eq!(arguments[0].name, "name");
        assert!(arguments[0].required);
        assert_eq!(arguments[0].description.as_deref(), Some("Who to greet"));
        assert_eq!(arguments[1].name, "tone");
        assert!(!arguments[1].required);
    }

    #[test]
    fn capability_flags_reflect_non_empty_registries() {
        let empty = ServerBuilder::new().build();
        assert!(!empty.has_operations());
        assert!(!empty.has_data_sources());
        assert!(!empty.has_templates());

        let server = ServerBuilder::new()
            .operation("x", "", Shape::new(), |_| async {
                Ok(OperationOutput::text(""))
            })
            .build();
        assert!(server.has_operations());
        assert!(!server.has_data_sources());
    }
}
