//! Command module discovery.
//!
//! Command modules are separate crates. Each one adds a [`ModuleDescriptor`]
//! to the [`COMMAND_MODULES`] distributed slice; linking the crate into the
//! host binary is what "installs" it. Discovery filters the linked packages
//! by [`MODULE_PREFIX`] and strips the prefix to get the logical module name
//! (`cmdhub-vm` -> `vm`).

use std::collections::HashSet;
use std::fmt;

use linkme::distributed_slice;
use once_cell::sync::OnceCell;
use thiserror::Error;

use crate::table::{CommandTable, TableBuilder};

/// Package key prefix marking a command module.
pub const MODULE_PREFIX: &str = "cmdhub-";

/// Module entry point: declare every command on the given builder.
pub type SetupFn = fn(&mut TableBuilder) -> anyhow::Result<()>;

/// Registration record a command module exports.
#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    /// Package key, e.g. `"cmdhub-vm"`.
    pub package: &'static str,
    pub setup: SetupFn,
}

impl ModuleDescriptor {
    pub const fn new(package: &'static str, setup: SetupFn) -> Self {
        Self { package, setup }
    }

    /// Run the module's setup on a fresh builder.
    pub fn build_table(&self) -> anyhow::Result<CommandTable> {
        let mut builder = TableBuilder::new();
        (self.setup)(&mut builder)?;
        Ok(builder.finish())
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("package", &self.package)
            .finish_non_exhaustive()
    }
}

/// Every command module linked into the current binary.
#[distributed_slice]
pub static COMMAND_MODULES: [ModuleDescriptor];

/// Errors raised while enumerating installed modules.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("command module package `{0}` is registered more than once")]
    DuplicatePackage(String),
    #[error("command module package `{0}` has an empty module name")]
    EmptyModuleName(String),
}

/// A discovered module: logical name plus its registration record.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveredModule<'a> {
    pub name: &'a str,
    pub descriptor: &'a ModuleDescriptor,
}

/// Logical module names derived from the installed packages, in
/// enumeration order. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<(String, ModuleDescriptor)>,
}

static INSTALLED: OnceCell<ModuleRegistry> = OnceCell::new();

impl ModuleRegistry {
    /// Filter `packages` to command modules and derive their names.
    ///
    /// Order follows the input. Packages without the prefix are skipped.
    pub fn discover<'a, I>(packages: I) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator<Item = &'a ModuleDescriptor>,
    {
        let mut seen = HashSet::new();
        let mut modules = Vec::new();

        for descriptor in packages {
            let Some(name) = descriptor.package.strip_prefix(MODULE_PREFIX) else {
                tracing::trace!(package = descriptor.package, "not a command module");
                continue;
            };
            if name.is_empty() {
                return Err(DiscoveryError::EmptyModuleName(
                    descriptor.package.to_string(),
                ));
            }
            if !seen.insert(descriptor.package) {
                return Err(DiscoveryError::DuplicatePackage(
                    descriptor.package.to_string(),
                ));
            }
            modules.push((name.to_string(), *descriptor));
        }

        tracing::debug!(count = modules.len(), "discovered command modules");
        Ok(Self { modules })
    }

    /// Process-wide registry of the modules linked into this binary.
    /// Computed on first call; later calls return the same instance.
    pub fn installed() -> Result<&'static ModuleRegistry, DiscoveryError> {
        INSTALLED.get_or_try_init(|| Self::discover(COMMAND_MODULES.iter()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = DiscoveredModule<'_>> {
        self.modules.iter().map(|(name, descriptor)| DiscoveredModule {
            name: name.as_str(),
            descriptor,
        })
    }

    pub fn find(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, descriptor)| descriptor)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_setup(_table: &mut TableBuilder) -> anyhow::Result<()> {
        Ok(())
    }

    fn failing_setup(_table: &mut TableBuilder) -> anyhow::Result<()> {
        anyhow::bail!("missing dependency")
    }

    #[test]
    fn test_discover_strips_prefix_and_keeps_order() {
        let packages = [
            ModuleDescriptor::new("cmdhub-vm", empty_setup),
            ModuleDescriptor::new("serde-helpers", empty_setup),
            ModuleDescriptor::new("cmdhub-storage", empty_setup),
            ModuleDescriptor::new("cmdhub-network", empty_setup),
        ];
        let registry = ModuleRegistry::discover(&packages).expect("discover");
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["vm", "storage", "network"]
        );
        assert_eq!(
            registry.find("storage").map(|d| d.package),
            Some("cmdhub-storage")
        );
        assert!(registry.find("serde-helpers").is_none());
    }

    #[test]
    fn test_discover_rejects_duplicate_package() {
        let packages = [
            ModuleDescriptor::new("cmdhub-vm", empty_setup),
            ModuleDescriptor::new("cmdhub-vm", empty_setup),
        ];
        let err = ModuleRegistry::discover(&packages).expect_err("duplicate");
        assert!(matches!(err, DiscoveryError::DuplicatePackage(p) if p == "cmdhub-vm"));
    }

    #[test]
    fn test_discover_rejects_bare_prefix() {
        let packages = [ModuleDescriptor::new("cmdhub-", empty_setup)];
        let err = ModuleRegistry::discover(&packages).expect_err("empty name");
        assert!(matches!(err, DiscoveryError::EmptyModuleName(_)));
    }

    #[test]
    fn test_build_table_propagates_setup_error() {
        let descriptor = ModuleDescriptor::new("cmdhub-broken", failing_setup);
        let err = descriptor.build_table().expect_err("setup fails");
        assert!(err.to_string().contains("missing dependency"));
    }

    #[test]
    fn test_installed_is_computed_once() {
        let first = ModuleRegistry::installed().expect("installed");
        let second = ModuleRegistry::installed().expect("installed");
        assert!(std::ptr::eq(first, second));
    }
}
