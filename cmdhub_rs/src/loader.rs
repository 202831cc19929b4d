//! Command table loading.
//!
//! Turns the discovered modules into the single table that drives dispatch:
//! either one module's table (when a module hint resolves) or every module's
//! table merged in registry order, re-keyed by command name and sorted.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{DiscoveredModule, ModuleRegistry};
use crate::table::{CommandEntry, CommandTable, HandlerId};

/// What to do when two entries end up with the same command name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Later entry wins; the collision is logged as a warning.
    #[default]
    Overwrite,
    /// Abort the load with [`LoadError::DuplicateCommand`].
    Fail,
}

/// Errors raised while building the command table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("command module `{0}` is not installed")]
    NotFound(String),

    #[error("failed to load command module `{module}`")]
    ImportFailed {
        module: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("command `{name}` is declared by both `{first}` and `{second}`")]
    DuplicateCommand {
        name: String,
        first: HandlerId,
        second: HandlerId,
    },

    #[error("handler `{handler}` in module `{module}` was never given a command name")]
    UnnamedCommand { module: String, handler: HandlerId },
}

/// Final command table: display name -> entry, iterated in ascending name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OrderedTable {
    entries: BTreeMap<String, CommandEntry>,
}

impl OrderedTable {
    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, CommandEntry)> for OrderedTable {
    fn from_iter<T: IntoIterator<Item = (String, CommandEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OrderedTable {
    type Item = (String, CommandEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, CommandEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Loads command tables from a [`ModuleRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct CommandLoader<'r> {
    registry: &'r ModuleRegistry,
    policy: CollisionPolicy,
}

impl<'r> CommandLoader<'r> {
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            policy: CollisionPolicy::default(),
        }
    }

    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the table of a single module by logical name.
    pub fn resolve_module_table(&self, module_name: &str) -> Result<CommandTable, LoadError> {
        let module = self
            .registry
            .iter()
            .find(|m| m.name == module_name)
            .ok_or_else(|| LoadError::NotFound(module_name.to_string()))?;
        load_module(module)
    }

    /// Build the command table, optionally scoped to one module.
    ///
    /// A module hint that fails to resolve falls back to loading every
    /// module. During that full load the first failing module aborts the
    /// whole build.
    pub fn get_command_table(&self, module_name: Option<&str>) -> Result<OrderedTable, LoadError> {
        if let Some(name) = module_name {
            match self.resolve_module_table(name) {
                Ok(table) => return self.order_by_name(vec![(name, table)]),
                Err(err) => {
                    tracing::debug!(module = name, error = %err, "module hint did not resolve, loading all modules");
                }
            }
        }

        let mut tables = Vec::with_capacity(self.registry.len());
        for module in self.registry.iter() {
            tables.push((module.name, load_module(module)?));
        }
        self.order_by_name(tables)
    }

    // Tables arrive in registry order; later entries win under `Overwrite`.
    fn order_by_name(&self, tables: Vec<(&str, CommandTable)>) -> Result<OrderedTable, LoadError> {
        let mut by_name: BTreeMap<String, CommandEntry> = BTreeMap::new();

        for (module, table) in tables {
            for (handler, entry) in table {
                let Some(name) = entry.name.clone() else {
                    return Err(LoadError::UnnamedCommand {
                        module: module.to_string(),
                        handler,
                    });
                };
                match by_name.entry(name) {
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                    Entry::Occupied(mut slot) => {
                        let first = slot.get().handler.id();
                        match self.policy {
                            CollisionPolicy::Overwrite => {
                                tracing::warn!(
                                    command = %slot.key(),
                                    replaced = %first,
                                    by = %handler,
                                    module,
                                    "duplicate command name, later registration wins"
                                );
                                slot.insert(entry);
                            }
                            CollisionPolicy::Fail => {
                                return Err(LoadError::DuplicateCommand {
                                    name: slot.key().clone(),
                                    first,
                                    second: handler,
                                });
                            }
                        }
                    }
                }
            }
        }

        Ok(OrderedTable { entries: by_name })
    }
}

fn load_module(module: DiscoveredModule<'_>) -> Result<CommandTable, LoadError> {
    tracing::debug!(module = module.name, package = module.descriptor.package, "loading command module");
    module
        .descriptor
        .build_table()
        .map_err(|source| LoadError::ImportFailed {
            module: module.name.to_string(),
            source: source.into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleDescriptor;
    use crate::table::{Arguments, TableBuilder};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn show_a(_args: &Arguments) -> anyhow::Result<Value> {
        Ok(Value::from("a"))
    }

    fn show_b(_args: &Arguments) -> anyhow::Result<Value> {
        Ok(Value::from("b"))
    }

    fn list_b(_args: &Arguments) -> anyhow::Result<Value> {
        Ok(Value::from("b-list"))
    }

    fn setup_a(table: &mut TableBuilder) -> anyhow::Result<()> {
        table.on(crate::handler!(show_a)).command("x y").description("from A");
        Ok(())
    }

    fn setup_b(table: &mut TableBuilder) -> anyhow::Result<()> {
        table.on(crate::handler!(show_b)).command("x y").description("from B");
        table.on(crate::handler!(list_b)).command("a b");
        Ok(())
    }

    fn setup_broken(_table: &mut TableBuilder) -> anyhow::Result<()> {
        anyhow::bail!("module failed to initialise")
    }

    fn setup_unnamed(table: &mut TableBuilder) -> anyhow::Result<()> {
        table.on(crate::handler!(show_a)).description("no name");
        Ok(())
    }

    static FOO_CALLS: AtomicUsize = AtomicUsize::new(0);
    static BAR_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn setup_foo(table: &mut TableBuilder) -> anyhow::Result<()> {
        FOO_CALLS.fetch_add(1, Ordering::SeqCst);
        table.on(crate::handler!(show_b)).command("foo show");
        table.on(crate::handler!(list_b)).command("foo list");
        Ok(())
    }

    fn setup_bar(table: &mut TableBuilder) -> anyhow::Result<()> {
        BAR_CALLS.fetch_add(1, Ordering::SeqCst);
        table.on(crate::handler!(show_a)).command("bar show");
        Ok(())
    }

    fn registry(packages: &[ModuleDescriptor]) -> ModuleRegistry {
        ModuleRegistry::discover(packages).expect("discover")
    }

    fn a_then_b() -> ModuleRegistry {
        registry(&[
            ModuleDescriptor::new("cmdhub-a", setup_a),
            ModuleDescriptor::new("cmdhub-b", setup_b),
        ])
    }

    #[test]
    fn test_merge_is_last_wins_and_sorted() {
        let registry = a_then_b();
        let table = CommandLoader::new(&registry)
            .get_command_table(None)
            .expect("table");

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a b", "x y"]);
        let xy = table.get("x y").expect("x y");
        assert_eq!(xy.description.as_deref(), Some("from B"));
        assert_eq!(xy.handler, crate::handler!(show_b));
    }

    #[test]
    fn test_fail_policy_rejects_duplicate_names() {
        let registry = a_then_b();
        let err = CommandLoader::new(&registry)
            .collision_policy(CollisionPolicy::Fail)
            .get_command_table(None)
            .expect_err("duplicate");
        match err {
            LoadError::DuplicateCommand { name, first, second } => {
                assert_eq!(name, "x y");
                assert_eq!(first, crate::handler!(show_a).id());
                assert_eq!(second, crate::handler!(show_b).id());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_single_module_skips_other_modules() {
        let registry = registry(&[
            ModuleDescriptor::new("cmdhub-bar", setup_bar),
            ModuleDescriptor::new("cmdhub-foo", setup_foo),
        ]);
        let table = CommandLoader::new(&registry)
            .get_command_table(Some("foo"))
            .expect("table");

        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["foo list", "foo show"]
        );
        assert_eq!(FOO_CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(BAR_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_module_falls_back_to_full_load() {
        let registry = a_then_b();
        let loader = CommandLoader::new(&registry);
        let fallback = loader
            .get_command_table(Some("doesnotexist"))
            .expect("fallback");
        let full = loader.get_command_table(None).expect("full");
        assert_eq!(fallback, full);
    }

    #[test]
    fn test_broken_hint_falls_back_but_full_load_fails_fast() {
        let registry = registry(&[
            ModuleDescriptor::new("cmdhub-a", setup_a),
            ModuleDescriptor::new("cmdhub-broken", setup_broken),
        ]);
        let loader = CommandLoader::new(&registry);

        assert!(matches!(
            loader.resolve_module_table("missing"),
            Err(LoadError::NotFound(name)) if name == "missing"
        ));

        let err = loader
            .get_command_table(Some("broken"))
            .expect_err("full load hits the broken module");
        match err {
            LoadError::ImportFailed { module, source } => {
                assert_eq!(module, "broken");
                assert!(source.to_string().contains("failed to initialise"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unnamed_entry_aborts_load() {
        let registry = registry(&[ModuleDescriptor::new("cmdhub-raw", setup_unnamed)]);
        let err = CommandLoader::new(&registry)
            .get_command_table(None)
            .expect_err("unnamed");
        assert!(matches!(err, LoadError::UnnamedCommand { module, .. } if module == "raw"));
    }

    #[test]
    fn test_resorting_is_a_no_op() {
        let registry = a_then_b();
        let table = CommandLoader::new(&registry)
            .get_command_table(None)
            .expect("table");
        let resorted: OrderedTable = table.clone().into_iter().collect();
        assert_eq!(resorted, table);
        assert_eq!(
            resorted.names().collect::<Vec<_>>(),
            table.names().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_registry_gives_empty_table() {
        let registry = ModuleRegistry::default();
        let table = CommandLoader::new(&registry)
            .get_command_table(Some("anything"))
            .expect("table");
        assert!(table.is_empty());
    }
}
