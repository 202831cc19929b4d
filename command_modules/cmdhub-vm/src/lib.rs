//! `vm` command module.
//!
//! Declares the virtual machine commands. Provisioning and deletion are
//! long-running: the handlers start a background job and wait on it through
//! [`LongRunningOperation`] unless `--no-wait` is given.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use cmdhub::config::HubConfig;
use cmdhub::monitor::{LongRunningOperation, ThreadPoller};
use cmdhub::registry::{COMMAND_MODULES, ModuleDescriptor};
use cmdhub::table::{ArgSpec, Arguments, TableBuilder};
use cmdhub::{common, handler};
use linkme::distributed_slice;
use serde_json::{Value, json};

#[distributed_slice(COMMAND_MODULES)]
pub static MODULE: ModuleDescriptor = ModuleDescriptor::new("cmdhub-vm", setup);

/// Simulated time the backend needs to settle a request.
const BACKEND_LATENCY: Duration = Duration::from_millis(150);

const SIZES: &[&str] = &["Standard_B1s", "Standard_B2s", "Standard_D2s_v3"];

pub fn setup(table: &mut TableBuilder) -> Result<()> {
    table
        .on(handler!(create_vm))
        .command("vm create")
        .description("Create a virtual machine")
        .help("vm/create.md")
        .option(common::resource_group())
        .option(
            ArgSpec::new("--name -n")
                .metavar("NAME")
                .help("Name of the virtual machine")
                .required(true),
        )
        .option(common::location())
        .option(
            ArgSpec::new("--size")
                .help("Machine size")
                .choices(SIZES.iter().copied())
                .default_value("Standard_B1s"),
        )
        .option(ArgSpec::new("--no-wait").help("Do not wait for provisioning").flag());

    table
        .on(handler!(list_vms))
        .description("List virtual machines in a resource group")
        .option(common::resource_group())
        .command("vm list");

    table
        .on(handler!(show_vm))
        .command("vm show")
        .description("Show one virtual machine")
        .option(common::resource_group())
        .option(ArgSpec::new("--name -n").metavar("NAME").required(true));

    table
        .on(handler!(delete_vm))
        .command("vm delete")
        .description("Delete a virtual machine")
        .help("vm/delete.md")
        .option(common::resource_group())
        .option(ArgSpec::new("--name -n").metavar("NAME").required(true))
        .option(ArgSpec::new("--no-wait").help("Do not wait for deletion").flag());

    Ok(())
}

fn arg<'a>(args: &'a Arguments, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing argument `{key}`"))
}

fn flag(args: &Arguments, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn monitor(start: String, finish: &str) -> LongRunningOperation {
    LongRunningOperation::new(start, finish).with_config(&HubConfig::current().monitor)
}

fn create_vm(args: &Arguments) -> Result<Value> {
    let group = arg(args, "resourcegroup")?.to_string();
    let name = arg(args, "name")?.to_string();
    let location = arg(args, "location")?.to_string();
    let size = args
        .get("size")
        .and_then(Value::as_str)
        .unwrap_or("Standard_B1s")
        .to_string();

    if !SIZES.contains(&size.as_str()) {
        bail!("size `{size}` is not offered in {location}");
    }

    let accepted = json!({
        "name": name,
        "resourceGroup": group,
        "location": location,
        "size": size,
        "provisioningState": "Accepted",
    });
    if flag(args, "no_wait") {
        return Ok(accepted);
    }

    let job = ThreadPoller::spawn(move || -> Result<Value> {
        thread::sleep(BACKEND_LATENCY);
        let mut vm = accepted;
        vm["provisioningState"] = json!("Succeeded");
        Ok(vm)
    });
    let vm = monitor(format!("Creating virtual machine '{name}'"), "Virtual machine created").run(job)?;
    tracing::debug!(vm = %vm["name"], "virtual machine provisioned");
    Ok(vm)
}

fn list_vms(args: &Arguments) -> Result<Value> {
    let group = arg(args, "resourcegroup")?;
    Ok(json!([
        { "name": "web01", "resourceGroup": group, "size": "Standard_B1s" },
        { "name": "web02", "resourceGroup": group, "size": "Standard_B2s" },
    ]))
}

fn show_vm(args: &Arguments) -> Result<Value> {
    let group = arg(args, "resourcegroup")?;
    let name = arg(args, "name")?;
    Ok(json!({ "name": name, "resourceGroup": group, "powerState": "running" }))
}

fn delete_vm(args: &Arguments) -> Result<Value> {
    let name = arg(args, "name")?.to_string();
    if flag(args, "no_wait") {
        return Ok(json!({ "name": name, "status": "Deleting" }));
    }

    let job = ThreadPoller::spawn(move || -> Result<Value> {
        thread::sleep(BACKEND_LATENCY);
        Ok(json!({ "name": name, "status": "Deleted" }))
    });
    Ok(monitor(String::from("Deleting virtual machine"), "Virtual machine deleted").run(job)?)
}
