//! Result payload types carried inside response envelopes.

use serde::{Deserialize, Serialize};

/// One piece of operation or template content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text { text: String },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Result of an operation call. `is_error` marks domain-level failures the
/// caller should see as content, not as a protocol error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutput {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl OperationOutput {
    /// Successful single-text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    /// Error result rendered as content.
    pub fn error_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: true,
        }
    }
}

/// Result of reading a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContents {
    pub contents: Vec<SourceItem>,
}

/// One retrieved piece of a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub uri: String,
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

impl SourceContents {
    /// Single text item for the given URI.
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            contents: vec![SourceItem {
                uri: uri.into(),
                mime_type: None,
                text: text.into(),
            }],
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        if let Some(item) = self.contents.first_mut() {
            item.mime_type = Some(mime_type.into());
        }
        self
    }
}

/// Message role inside a template result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One constructed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub role: Role,
    pub content: ContentItem,
}

impl TemplateMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: ContentItem::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: ContentItem::text(text),
        }
    }
}

/// Result of expanding a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<TemplateMessage>,
}

impl TemplateOutput {
    pub fn new(messages: Vec<TemplateMessage>) -> Self {
        Self {
            description: None,
            messages,
        }
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}
