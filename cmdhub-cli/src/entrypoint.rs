//! Dispatch of the host subcommands.

use std::process::ExitCode;

use anyhow::{Context, Result};
use cmdhub::render::{self, RenderError};
use cmdhub::{CommandLoader, HubConfig, ModuleRegistry, OrderedTable};
use console::style;
use serde_json::json;

use crate::{Args, HubCommand};

/// Program name the rendered command tree is rooted at.
const BIN_NAME: &str = "cmdhub";

pub(crate) fn run(args: &Args) -> Result<ExitCode> {
    let loaded = match &args.config {
        Some(path) => HubConfig::load_from_path(path),
        None => HubConfig::load(),
    };
    // Handlers read their monitor settings from the installed config.
    let config = loaded.install().unwrap_or_else(|_| HubConfig::current());
    let registry = ModuleRegistry::installed().context("failed to discover command modules")?;
    tracing::debug!(modules = registry.len(), policy = ?config.collision_policy, "command modules discovered");
    let loader = CommandLoader::new(registry).collision_policy(config.collision_policy);

    match &args.command {
        HubCommand::Modules => {
            for module in registry.iter() {
                println!("{:<12} {}", module.name, style(module.descriptor.package).dim());
            }
            Ok(ExitCode::SUCCESS)
        }
        HubCommand::Commands { module, json } => {
            let table = loader.get_command_table(module.as_deref())?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
            Ok(ExitCode::SUCCESS)
        }
        HubCommand::Describe { words } => {
            let table = loader.get_command_table(words.first().map(String::as_str))?;
            let help = render::help_for(BIN_NAME, &table, words)?;
            print!("{help}");
            Ok(ExitCode::SUCCESS)
        }
        HubCommand::Resolve { argv } => {
            let table = loader.get_command_table(argv.first().map(String::as_str))?;
            match render::resolve(BIN_NAME, &table, argv) {
                Ok(resolved) => {
                    let out = json!({
                        "command": resolved.name,
                        "handler": resolved.entry.handler,
                        "arguments": resolved.arguments,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(RenderError::Parse(e)) => {
                    // Help/usage go through clap so they keep its formatting and exit code.
                    e.print()?;
                    Ok(ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2)))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

fn print_table(table: &OrderedTable) {
    if table.is_empty() {
        println!("{}", style("No commands installed").yellow());
        return;
    }
    let width = table.names().map(str::len).max().unwrap_or(0);
    for (name, entry) in table.iter() {
        println!(
            "{:<width$}  {}",
            style(name).bold(),
            entry.description.as_deref().unwrap_or(""),
            width = width
        );
    }
}
