//! Command tables.
//!
//! A command module builds its table with a [`TableBuilder`]: every handler
//! is annotated through [`TableBuilder::on`], and each annotation mutates the
//! entry owned by that handler. Entries are keyed by handler identity, not by
//! command name, so annotations applied at different places accumulate into
//! one entry.
//!
//! - `entry`: [`CommandEntry`], [`ArgSpec`] and the opaque [`Metadata`] map
//! - `builder`: [`TableBuilder`], [`EntryBuilder`] and the frozen [`CommandTable`]

mod builder;
mod entry;

use std::fmt;

use serde::{Serialize, Serializer};

pub use builder::{CommandTable, EntryBuilder, TableBuilder};
pub use entry::{ArgSpec, CommandEntry, Metadata};

/// Parsed argument values handed to a handler by the dispatch layer.
pub type Arguments = serde_json::Map<String, serde_json::Value>;

/// Signature every command handler implements.
pub type HandlerFn = fn(&Arguments) -> anyhow::Result<serde_json::Value>;

/// Stable identity of a handler: `"<module path>::<function>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandlerId(&'static str);

impl HandlerId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A handler together with its identity.
///
/// Build one with the [`handler!`](crate::handler) macro so the identity is
/// derived from the defining module path.
#[derive(Clone, Copy)]
pub struct HandlerRef {
    id: HandlerId,
    func: HandlerFn,
}

impl HandlerRef {
    pub const fn new(id: &'static str, func: HandlerFn) -> Self {
        Self {
            id: HandlerId::new(id),
            func,
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// The handler function, for the dispatch layer that consumes the table.
    pub fn func(&self) -> HandlerFn {
        self.func
    }
}

// Identity is the id; function pointer addresses are not stable across codegen units.
impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandlerRef {}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRef").field(&self.id.0).finish()
    }
}

impl Serialize for HandlerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id.0)
    }
}

/// Build a [`HandlerRef`] for a handler function, using the calling module
/// path as its identity.
///
/// ```rust
/// use cmdhub::handler;
/// use cmdhub::table::Arguments;
///
/// fn show(_args: &Arguments) -> anyhow::Result<serde_json::Value> {
///     Ok(serde_json::Value::Null)
/// }
///
/// let h = handler!(show);
/// assert!(h.id().as_str().ends_with("::show"));
/// ```
#[macro_export]
macro_rules! handler {
    ($func:path) => {
        $crate::table::HandlerRef::new(
            concat!(module_path!(), "::", stringify!($func)),
            $func,
        )
    };
}
