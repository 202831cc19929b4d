//! # cmdhub
//!
//! Host binary for cmdhub command modules. Every module crate linked below
//! registers itself in the `COMMAND_MODULES` slice; this binary merges their
//! tables and lets you inspect and parse against the result.
//!
//! ```bash
//! cmdhub modules                       # installed command modules
//! cmdhub commands --json               # merged, name-ordered table
//! cmdhub describe vm create            # rendered help for one command
//! cmdhub resolve -- vm show -g rg -n web01
//! ```

mod entrypoint;

use std::any::Any;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cmdhub::ModuleDescriptor;

// Linking a module crate installs it. Referencing each descriptor keeps the
// linker from discarding the crate's COMMAND_MODULES registration.
#[used]
static LINKED_MODULES: [&ModuleDescriptor; 2] = [&cmdhub_vm::MODULE, &cmdhub_storage::MODULE];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "cmdhub")]
#[command(about = "Inspect and resolve commands contributed by installed command modules")]
#[command(version)]
pub(crate) struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    pub(crate) log_level: String,

    /// Config file (default: $CMDHUB_CONFIG or <config dir>/cmdhub/config.toml)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: HubCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum HubCommand {
    /// List installed command modules in discovery order
    Modules,

    /// Print the merged command table
    Commands {
        /// Only load this module (falls back to all modules if unknown)
        #[arg(long)]
        module: Option<String>,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Show help for one command, e.g. `describe vm create`
    Describe {
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Parse a command line against the table and print the match (nothing is executed)
    Resolve {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },
}

fn install_broken_pipe_handler() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let payload = info.payload();
        let is_broken = <dyn Any>::downcast_ref::<&str>(payload)
            .is_some_and(|s| s.contains("Broken pipe"))
            || <dyn Any>::downcast_ref::<String>(payload)
                .is_some_and(|s| s.contains("Broken pipe"));

        if is_broken {
            // Quietly exit when downstream closes the pipe (e.g. piping to `head`).
            std::process::exit(0);
        }

        default_hook(info);
    }));
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.parse().unwrap_or_default()),
        )
        .init();
}

fn main() -> ExitCode {
    install_broken_pipe_handler();

    let args = Args::parse();
    init_logging(&args.log_level);

    match entrypoint::run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", console::style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
