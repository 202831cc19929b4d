//! `storage` command module.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use cmdhub::config::HubConfig;
use cmdhub::monitor::{LongRunningOperation, ThreadPoller};
use cmdhub::registry::{COMMAND_MODULES, ModuleDescriptor};
use cmdhub::table::{ArgSpec, Arguments, Metadata, TableBuilder};
use cmdhub::{common, handler};
use linkme::distributed_slice;
use serde_json::{Value, json};

#[distributed_slice(COMMAND_MODULES)]
pub static MODULE: ModuleDescriptor = ModuleDescriptor::new("cmdhub-storage", setup);

const SKUS: &[&str] = &["Standard_LRS", "Standard_GRS", "Premium_LRS"];

pub fn setup(table: &mut TableBuilder) -> Result<()> {
    let mut create_opts = Metadata::new();
    create_opts.insert(
        "description".into(),
        json!("Create a storage account"),
    );
    create_opts.insert("confirmation".into(), json!(false));

    table
        .on(handler!(create_account))
        .command_with("storage account create", create_opts)
        .help("storage/account-create.md")
        .option(common::resource_group())
        .option(
            ArgSpec::new("--name -n")
                .metavar("NAME")
                .help("Globally unique account name (3-24 lowercase letters and digits)")
                .required(true),
        )
        .option(common::location())
        .option(ArgSpec::new("--sku").choices(SKUS.iter().copied()).default_value("Standard_LRS"));

    table
        .on(handler!(list_accounts))
        .command("storage account list")
        .description("List storage accounts")
        .option(common::resource_group());

    table
        .on(handler!(list_containers))
        .command("storage container list")
        .description("List blob containers of an account")
        .option(ArgSpec::new("--account-name").metavar("ACCOUNT").required(true))
        .option(ArgSpec::new("--prefix").help("Only containers starting with this prefix"));

    Ok(())
}

fn arg<'a>(args: &'a Arguments, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing argument `{key}`"))
}

fn create_account(args: &Arguments) -> Result<Value> {
    let name = arg(args, "name")?.to_string();
    ensure!(
        (3..=24).contains(&name.len())
            && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        "storage account name `{name}` must be 3-24 lowercase letters or digits"
    );
    let account = json!({
        "name": name,
        "resourceGroup": arg(args, "resourcegroup")?,
        "location": arg(args, "location")?,
        "sku": args.get("sku").cloned().unwrap_or_else(|| json!("Standard_LRS")),
    });

    let job = ThreadPoller::spawn(move || -> Result<Value> {
        thread::sleep(Duration::from_millis(100));
        let mut account = account;
        account["provisioningState"] = json!("Succeeded");
        Ok(account)
    });
    let op = LongRunningOperation::new(format!("Creating storage account '{name}'"), "Storage account created")
        .with_config(&HubConfig::current().monitor);
    let account = op.run(job)?;
    tracing::debug!(account = %account["name"], "storage account provisioned");
    Ok(account)
}

fn list_accounts(args: &Arguments) -> Result<Value> {
    let group = arg(args, "resourcegroup")?;
    Ok(json!([{ "name": "logs0001", "resourceGroup": group, "sku": "Standard_LRS" }]))
}

fn list_containers(args: &Arguments) -> Result<Value> {
    let account = arg(args, "account_name")?;
    let prefix = args.get("prefix").and_then(Value::as_str).unwrap_or("");
    let containers: Vec<Value> = ["backups", "images", "logs"]
        .iter()
        .filter(|c| c.starts_with(prefix))
        .map(|c| json!({ "name": c, "account": account }))
        .collect();
    Ok(Value::Array(containers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdhub::monitor::{ProgressSink, set_default_sink};
    use cmdhub::registry::ModuleRegistry;
    use cmdhub::CommandLoader;
    use serial_test::serial;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_module_loads_through_registry() {
        let registry = ModuleRegistry::installed().expect("installed");
        let table = CommandLoader::new(registry)
            .get_command_table(Some("storage"))
            .expect("table");
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["storage account create", "storage account list", "storage container list"]
        );
        let create = table.get("storage account create").expect("create");
        assert_eq!(create.description.as_deref(), Some("Create a storage account"));
        assert_eq!(create.extra.get("confirmation"), Some(&json!(false)));
    }

    #[test]
    fn test_container_prefix_filter() {
        let listed = list_containers(&args(json!({ "account_name": "logs0001", "prefix": "b" })))
            .expect("list");
        assert_eq!(listed, json!([{ "name": "backups", "account": "logs0001" }]));
    }

    #[test]
    fn test_create_rejects_bad_name() {
        let err = create_account(&args(json!({
            "name": "Bad_Name", "resourcegroup": "rg", "location": "westeurope"
        })))
        .expect_err("invalid name");
        assert!(err.to_string().contains("Bad_Name"));
    }

    #[test]
    #[serial(progress_sink)]
    fn test_create_waits_for_account() {
        let previous = set_default_sink(ProgressSink::Disabled);
        let result = create_account(&args(json!({
            "name": "logs0002", "resourcegroup": "rg", "location": "westeurope"
        })));
        set_default_sink(previous);

        let account = result.expect("create");
        assert_eq!(account["provisioningState"], "Succeeded");
        assert_eq!(account["sku"], "Standard_LRS");
    }

    #[test]
    fn test_list_accounts_uses_group() {
        let listed = list_accounts(&args(json!({ "resourcegroup": "rg" }))).expect("list");
        assert_eq!(listed[0]["resourceGroup"], "rg");
    }
}
