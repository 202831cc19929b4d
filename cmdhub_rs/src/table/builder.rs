//! Per-module table builder and the frozen table it produces.

use std::collections::BTreeMap;

use serde_json::Value;

use super::entry::{ArgSpec, CommandEntry, Metadata};
use super::{HandlerId, HandlerRef};

/// Collects one module's command entries.
///
/// Each command module receives its own builder from the loader, so there is
/// no registry shared between modules. [`TableBuilder::finish`] freezes the
/// result into a [`CommandTable`].
#[derive(Debug, Default)]
pub struct TableBuilder {
    entries: BTreeMap<HandlerId, CommandEntry>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or continue) annotating `handler`. The entry is created with an
    /// empty argument list the first time a handler is seen.
    pub fn on(&mut self, handler: HandlerRef) -> EntryBuilder<'_> {
        let entry = self
            .entries
            .entry(handler.id())
            .or_insert_with(|| CommandEntry::new(handler));
        EntryBuilder { entry }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> CommandTable {
        CommandTable {
            entries: self.entries,
        }
    }
}

/// Annotation handle for a single handler's entry.
///
/// Every method returns the builder, so annotations stack in any order.
pub struct EntryBuilder<'a> {
    entry: &'a mut CommandEntry,
}

impl<'a> EntryBuilder<'a> {
    /// Set the command name.
    pub fn command(self, name: impl Into<String>) -> Self {
        self.command_with(name, Metadata::new())
    }

    /// Set the command name and merge registration options.
    ///
    /// `description` and `help_file` in `opts` override those fields; the
    /// reserved keys `name` and `arguments` are skipped; anything else is
    /// stored in [`CommandEntry::extra`], replacing earlier values.
    pub fn command_with(self, name: impl Into<String>, opts: Metadata) -> Self {
        self.entry.name = Some(name.into());
        for (key, value) in opts {
            match key.as_str() {
                "description" => self.entry.description = value_to_text(value),
                "help_file" => self.entry.help_file = value_to_text(value),
                "name" | "arguments" => {
                    tracing::debug!(
                        handler = %self.entry.handler.id(),
                        key = %key,
                        "ignoring reserved command option"
                    );
                }
                _ => {
                    self.entry.extra.insert(key, value);
                }
            }
        }
        self
    }

    pub fn description(self, text: impl Into<String>) -> Self {
        self.entry.description = Some(text.into());
        self
    }

    /// Reference to external help content.
    pub fn help(self, reference: impl Into<String>) -> Self {
        self.entry.help_file = Some(reference.into());
        self
    }

    /// Append one argument spec. Repeated flags are not deduplicated.
    pub fn option(self, spec: impl Into<ArgSpec>) -> Self {
        self.entry.arguments.push(spec.into());
        self
    }

    /// The annotated handler, unchanged.
    pub fn handler(&self) -> HandlerRef {
        self.entry.handler
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// A module's frozen command table, keyed by handler identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandTable {
    entries: BTreeMap<HandlerId, CommandEntry>,
}

impl CommandTable {
    pub fn get(&self, id: HandlerId) -> Option<&CommandEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HandlerId, &CommandEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for CommandTable {
    type Item = (HandlerId, CommandEntry);
    type IntoIter = std::collections::btree_map::IntoIter<HandlerId, CommandEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
