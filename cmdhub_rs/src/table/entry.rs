//! Command entry and argument spec types.

use serde::Serialize;
use serde_json::Value;

use super::HandlerRef;

/// Opaque key/value metadata, passed through untouched to the argument parser.
pub type Metadata = serde_json::Map<String, Value>;

/// One parameter declaration of a command.
///
/// `name` holds one or more whitespace-separated aliases (`"--name -n"`).
/// Everything else is pass-through metadata; the well-known keys are read by
/// [`render`](crate::render) (`help`, `required`, `metavar`, `choices`,
/// `default`, `action`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach an arbitrary metadata key. The `name` key is reserved.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key == "name" {
            tracing::debug!(arg = %self.name, "ignoring reserved `name` metadata key");
            return self;
        }
        self.metadata.insert(key, value.into());
        self
    }

    pub fn help(self, text: impl Into<String>) -> Self {
        self.with("help", text.into())
    }

    pub fn required(self, required: bool) -> Self {
        self.with("required", required)
    }

    pub fn metavar(self, metavar: impl Into<String>) -> Self {
        self.with("metavar", metavar.into())
    }

    pub fn choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<Value> = choices
            .into_iter()
            .map(|c| Value::String(c.into()))
            .collect();
        self.with("choices", values)
    }

    pub fn default_value(self, value: impl Into<String>) -> Self {
        self.with("default", value.into())
    }

    /// Boolean switch that takes no value.
    pub fn flag(self) -> Self {
        self.with("action", "store_true")
    }

    /// Individual aliases, in declaration order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.name.split_whitespace()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    pub fn help_text(&self) -> Option<&str> {
        self.get("help").and_then(Value::as_str)
    }

    pub fn is_required(&self) -> bool {
        self.get("required").and_then(Value::as_bool).unwrap_or(false)
    }
}

impl From<&str> for ArgSpec {
    fn from(name: &str) -> Self {
        ArgSpec::new(name)
    }
}

impl From<String> for ArgSpec {
    fn from(name: String) -> Self {
        ArgSpec::new(name)
    }
}

/// One invocable command, accumulated from annotations on its handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandEntry {
    pub handler: HandlerRef,
    /// Space-separated command path (`"vm create"`). `None` until `command` is applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_file: Option<String>,
    /// Argument specs in declaration order. Always present, possibly empty.
    pub arguments: Vec<ArgSpec>,
    /// Extra registration options from `command_with`.
    #[serde(flatten)]
    pub extra: Metadata,
}

impl CommandEntry {
    pub fn new(handler: HandlerRef) -> Self {
        Self {
            handler,
            name: None,
            description: None,
            help_file: None,
            arguments: Vec::new(),
            extra: Metadata::new(),
        }
    }

    /// Name segments: `"vm disk attach"` -> `["vm", "disk", "attach"]`.
    pub fn path(&self) -> Vec<&str> {
        self.name
            .as_deref()
            .map(|n| n.split_whitespace().collect())
            .unwrap_or_default()
    }
}
