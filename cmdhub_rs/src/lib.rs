//! # cmdhub
//!
//! **Pluggable command tables** - independently packaged command modules
//! declare their commands next to their handlers; the host links them in,
//! merges every table into one ordered command table and hands it to the
//! argument parser.
//!
//! ## Features
//!
//! - **Fluent annotations** - `command`, `description`, `help` and `option`
//!   stack on a handler in any order
//! - **Link-time discovery** - modules register through a distributed slice,
//!   no import-by-string
//! - **Deterministic merge** - tables are merged in discovery order and
//!   re-keyed by command name, sorted ascending
//! - **Long-running operations** - a blocking progress loop around any
//!   [`Poller`](monitor::Poller), with cancellation and timeouts
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,no_run
//! use cmdhub::loader::CommandLoader;
//! use cmdhub::registry::ModuleRegistry;
//!
//! let registry = ModuleRegistry::installed().expect("module discovery");
//! let table = CommandLoader::new(registry)
//!     .get_command_table(None)
//!     .expect("command table");
//! for (name, entry) in table.iter() {
//!     println!("{name:<24} {}", entry.description.as_deref().unwrap_or(""));
//! }
//! ```
//!
//! ## Writing a Command Module
//!
//! ```rust,ignore
//! use cmdhub::registry::{COMMAND_MODULES, ModuleDescriptor};
//! use cmdhub::table::{Arguments, TableBuilder};
//! use cmdhub::{common, handler};
//! use linkme::distributed_slice;
//!
//! #[distributed_slice(COMMAND_MODULES)]
//! static MODULE: ModuleDescriptor = ModuleDescriptor::new("cmdhub-group", setup);
//!
//! fn list_groups(_args: &Arguments) -> anyhow::Result<serde_json::Value> {
//!     Ok(serde_json::json!([]))
//! }
//!
//! fn setup(table: &mut TableBuilder) -> anyhow::Result<()> {
//!     table
//!         .on(handler!(list_groups))
//!         .command("group list")
//!         .description("List resource groups")
//!         .option(common::location());
//!     Ok(())
//! }
//! ```

// ============================================================================
// Command Tables
// ============================================================================

/// Command table builder and entry types.
///
/// - [`TableBuilder`](table::TableBuilder) / [`EntryBuilder`](table::EntryBuilder) - per-module annotation API
/// - [`CommandTable`](table::CommandTable) - immutable snapshot keyed by handler
/// - [`CommandEntry`](table::CommandEntry) and [`ArgSpec`](table::ArgSpec)
pub mod table;

/// Shared argument presets (resource group, location).
pub mod common;

// ============================================================================
// Discovery & Loading
// ============================================================================

/// Module discovery over the linked `COMMAND_MODULES` slice.
pub mod registry;

/// Merges module tables into one name-ordered table.
pub mod loader;

/// Builds a `clap::Command` tree from an ordered table and resolves argv.
pub mod render;

// ============================================================================
// Runtime Support
// ============================================================================

/// Long-running-operation monitor (progress loop around a poller).
pub mod monitor;

/// Configuration file support (`config.toml`).
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::HubConfig;
pub use loader::{CollisionPolicy, CommandLoader, LoadError, OrderedTable};
pub use monitor::{LongRunningOperation, MonitorError, Poller};
pub use registry::{COMMAND_MODULES, MODULE_PREFIX, ModuleDescriptor, ModuleRegistry};
pub use table::{ArgSpec, CommandEntry, CommandTable, HandlerRef, TableBuilder};
