//! clap adapter for ordered command tables.
//!
//! The table only carries metadata; this module is the consumer that turns it
//! into a `clap::Command` tree (`"vm disk attach"` becomes nested
//! subcommands) and maps parsed matches back to the declaring entry. Nothing
//! here calls a handler.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsString;

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::Value;
use thiserror::Error;

use crate::loader::OrderedTable;
use crate::table::{ArgSpec, Arguments, CommandEntry};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("argument `{spec}` of `{command}` has no usable alias")]
    EmptyArgument { command: String, spec: String },
    #[error("`{0}` is not a command")]
    UnknownCommand(String),
    #[error(transparent)]
    Parse(#[from] clap::Error),
}

/// A parsed invocation, matched to its table entry.
#[derive(Debug)]
pub struct Resolved<'t> {
    pub name: String,
    pub entry: &'t CommandEntry,
    pub arguments: Arguments,
}

#[derive(Default)]
struct Node<'t> {
    entry: Option<&'t CommandEntry>,
    children: BTreeMap<&'t str, Node<'t>>,
}

/// Build the clap command tree for `table`.
pub fn to_clap(bin_name: &str, table: &OrderedTable) -> Result<Command, RenderError> {
    let mut root = Node::default();
    for (_, entry) in table.iter() {
        let mut node = &mut root;
        for segment in entry.path() {
            node = node.children.entry(segment).or_default();
        }
        node.entry = Some(entry);
    }
    build_command(bin_name.to_string(), String::new(), &root)
}

fn build_command(name: String, path: String, node: &Node<'_>) -> Result<Command, RenderError> {
    let mut cmd = Command::new(name);

    match node.entry {
        Some(entry) => {
            if let Some(description) = &entry.description {
                cmd = cmd.about(description.clone());
            }
            if let Some(help_file) = &entry.help_file {
                cmd = cmd.after_help(format!("See also: {help_file}"));
            }
            let mut claimed = Claimed::new();
            for spec in &entry.arguments {
                if let Some(arg) = build_arg(&path, spec, &mut claimed)? {
                    cmd = cmd.arg(arg);
                }
            }
        }
        None => {
            cmd = cmd.subcommand_required(true).arg_required_else_help(true);
        }
    }

    for (child, child_node) in &node.children {
        let child_path = if path.is_empty() {
            child.to_string()
        } else {
            format!("{path} {child}")
        };
        cmd = cmd.subcommand(build_command(child.to_string(), child_path, child_node)?);
    }
    Ok(cmd)
}

/// Ids and flag names already taken on one command. clap's own `--help`/`-h`
/// are taken from the start.
struct Claimed {
    ids: HashSet<String>,
    longs: HashSet<String>,
    shorts: HashSet<char>,
}

impl Claimed {
    fn new() -> Self {
        Self {
            ids: HashSet::from(["help".to_string()]),
            longs: HashSet::from(["help".to_string()]),
            shorts: HashSet::from(['h']),
        }
    }
}

/// Id clap uses for a spec: first long alias, else short, else positional name.
pub fn arg_id(spec: &ArgSpec) -> Option<String> {
    let aliases: Vec<&str> = spec.aliases().collect();
    aliases
        .iter()
        .find_map(|a| a.strip_prefix("--"))
        .or_else(|| aliases.iter().find_map(|a| a.strip_prefix('-')))
        .or_else(|| aliases.first().copied())
        .filter(|id| !id.is_empty())
        .map(|id| id.replace('-', "_"))
}

/// Build the clap arg for `spec`, or `None` when it cannot be added to the
/// command without clashing with an earlier argument.
fn build_arg(command: &str, spec: &ArgSpec, claimed: &mut Claimed) -> Result<Option<Arg>, RenderError> {
    let id = arg_id(spec).ok_or_else(|| RenderError::EmptyArgument {
        command: command.to_string(),
        spec: spec.name.clone(),
    })?;
    if claimed.ids.contains(&id) {
        tracing::warn!(command, arg = %id, "skipping repeated argument");
        return Ok(None);
    }

    let mut longs = Vec::new();
    let mut shorts = Vec::new();
    let mut is_flag = false;
    for alias in spec.aliases() {
        if let Some(long) = alias.strip_prefix("--") {
            is_flag = true;
            if long.is_empty() || claimed.longs.contains(long) || longs.contains(&long) {
                tracing::warn!(command, arg = %id, alias, "dropping unusable or taken alias");
                continue;
            }
            longs.push(long);
        } else if let Some(short) = alias.strip_prefix('-') {
            is_flag = true;
            match single_char(short) {
                Some(c) if !claimed.shorts.contains(&c) && !shorts.contains(&c) => shorts.push(c),
                _ => {
                    tracing::warn!(command, arg = %id, alias, "dropping unusable or taken alias");
                }
            }
        }
    }
    if is_flag && longs.is_empty() && shorts.is_empty() {
        tracing::warn!(command, arg = %id, "skipping argument without a usable alias");
        return Ok(None);
    }

    let mut arg = Arg::new(id.clone());
    for (i, long) in longs.iter().enumerate() {
        arg = if i == 0 {
            arg.long(long.to_string())
        } else {
            arg.visible_alias(long.to_string())
        };
    }
    for (i, short) in shorts.iter().enumerate() {
        arg = if i == 0 {
            arg.short(*short)
        } else {
            arg.visible_short_alias(*short)
        };
    }
    claimed.ids.insert(id);
    claimed.longs.extend(longs.iter().map(|l| l.to_string()));
    claimed.shorts.extend(shorts);

    let action = spec.get("action").and_then(Value::as_str);
    arg = match action {
        Some("store_true") => arg.action(ArgAction::SetTrue),
        Some("append") => arg.action(ArgAction::Append),
        _ => arg.action(ArgAction::Set),
    };

    if let Some(help) = spec.help_text() {
        arg = arg.help(help.to_string());
    }
    if let Some(metavar) = spec.get("metavar").and_then(Value::as_str) {
        arg = arg.value_name(metavar.to_string());
    }
    if spec.is_required() {
        arg = arg.required(true);
    }
    if let Some(Value::Array(choices)) = spec.get("choices") {
        let choices: Vec<String> = choices.iter().map(value_text).collect();
        arg = arg.value_parser(PossibleValuesParser::new(choices));
    }
    if let Some(default) = spec.get("default") {
        arg = arg.default_value(value_text(default));
    }
    Ok(Some(arg))
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Parse `argv` (without the binary name) against the table.
pub fn resolve<'t, I, T>(bin_name: &str, table: &'t OrderedTable, argv: I) -> Result<Resolved<'t>, RenderError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cmd = to_clap(bin_name, table)?;
    let args = std::iter::once(OsString::from(bin_name)).chain(argv.into_iter().map(Into::into));
    let matches = cmd.try_get_matches_from(args)?;

    let mut path = Vec::new();
    let mut current = &matches;
    while let Some((sub, sub_matches)) = current.subcommand() {
        path.push(sub);
        current = sub_matches;
    }
    // Match on name segments, as the tree was built; the last entry with this
    // path is the one the tree holds.
    let (name, entry) = table
        .iter()
        .filter(|(_, entry)| entry.path() == path)
        .last()
        .ok_or_else(|| RenderError::UnknownCommand(path.join(" ")))?;
    let arguments = collect_arguments(entry, current);

    Ok(Resolved {
        name: name.to_string(),
        entry,
        arguments,
    })
}

fn collect_arguments(entry: &CommandEntry, matches: &ArgMatches) -> Arguments {
    let mut arguments = Arguments::new();
    for spec in &entry.arguments {
        let Some(id) = arg_id(spec) else { continue };
        if arguments.contains_key(&id) {
            continue;
        }
        // Specs dropped while building the command are unknown to clap.
        let value = match spec.get("action").and_then(Value::as_str) {
            Some("store_true") => matches
                .try_get_one::<bool>(&id)
                .ok()
                .flatten()
                .map(|flag| Value::Bool(*flag)),
            Some("append") => matches.try_get_many::<String>(&id).ok().flatten().map(|values| {
                Value::Array(values.cloned().map(Value::String).collect())
            }),
            _ => matches
                .try_get_one::<String>(&id)
                .ok()
                .flatten()
                .cloned()
                .map(Value::String),
        };
        if let Some(value) = value {
            arguments.insert(id, value);
        }
    }
    arguments
}

/// Long help for the command named by `words` (`["vm", "create"]`).
pub fn help_for(bin_name: &str, table: &OrderedTable, words: &[String]) -> Result<String, RenderError> {
    let mut cmd = to_clap(bin_name, table)?;
    cmd.build();
    let mut current = &mut cmd;
    for word in words {
        current = current
            .find_subcommand_mut(word)
            .ok_or_else(|| RenderError::UnknownCommand(words.join(" ")))?;
    }
    Ok(current.render_long_help().to_string())
}
