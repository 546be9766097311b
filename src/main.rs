// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Quire - inspect and drive Node.js-style module resolution
//!
//! This is the main entry point for the quire CLI/REPL.
//!
//! ## Features
//!
//! - Resolve a specifier the way `require.resolve` would
//! - Show the lookup directories for a specifier
//! - Load data modules and built-ins and print their exports
//! - Interactive resolver REPL with history

mod repl;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use quire_node::{LoaderConfig, ModuleRuntime, ResolveOptions, Resolved};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// quire - Node.js-compatible module resolution from the command line
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log every resolution step
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory that relative entry specifiers are resolved against
    #[arg(long, global = true, value_name = "DIR")]
    cwd: Option<PathBuf>,

    /// Only search project-local node_modules directories
    #[arg(long, global = true)]
    local_modules_dir: bool,

    /// Keep symlinked paths instead of resolving them
    #[arg(long, global = true)]
    preserve_symlinks: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the file a specifier resolves to
    #[command(alias = "r")]
    Resolve(ResolveArgs),

    /// Print the directories searched for a specifier
    Paths(PathsArgs),

    /// Load a module and print its exports as JSON
    Load(LoadArgs),

    /// Start the interactive resolver
    Repl,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Module specifier, as passed to require()
    specifier: String,

    /// Resolve as if required from this file
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,

    /// Search these directories instead of the default lookup paths
    #[arg(long, value_name = "DIR", num_args = 1..)]
    paths: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct PathsArgs {
    /// Module specifier, as passed to require()
    specifier: String,

    /// Compute the paths as seen from this file
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Module specifier, as passed to require()
    specifier: String,

    /// Load as if required from this file
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "quire_node=debug"
    } else {
        "quire_node=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    let mut config = LoaderConfig::load().context("failed to load configuration")?;
    if let Some(cwd) = &cli.cwd {
        config.cwd = cwd
            .canonicalize()
            .with_context(|| format!("invalid --cwd '{}'", cwd.display()))?;
    }
    if cli.local_modules_dir {
        config.local_modules_dir = true;
    }
    if cli.preserve_symlinks {
        config.preserve_symlinks = true;
    }
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Some(Commands::Resolve(args)) => run_resolve(config, args),
        Some(Commands::Paths(args)) => run_paths(config, args),
        Some(Commands::Load(args)) => run_load(config, args),
        Some(Commands::Repl) => run_repl(config),
        None if atty::is(atty::Stream::Stdin) => run_repl(config),
        None => {
            println!("{}", "Usage: quire <command> [options]".yellow());
            println!();
            println!("Run {} for more information", "quire --help".cyan());
            Ok(())
        }
    }
}

fn run_resolve(config: LoaderConfig, args: &ResolveArgs) -> anyhow::Result<()> {
    let mut runtime = ModuleRuntime::new(config);
    let from = args.from.as_deref().map(|file| runtime.create_require(file));
    let options = if args.paths.is_empty() {
        None
    } else {
        Some(ResolveOptions::with_paths(args.paths.iter().cloned()))
    };

    let resolved = runtime.resolve(&args.specifier, from, options.as_ref())?;
    println!("{}", format_resolved(&resolved));
    Ok(())
}

fn run_paths(config: LoaderConfig, args: &PathsArgs) -> anyhow::Result<()> {
    let mut runtime = ModuleRuntime::new(config);
    let from = args.from.as_deref().map(|file| runtime.create_require(file));

    match runtime.lookup_paths(&args.specifier, from) {
        Some(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
        }
        None => println!("{} {}", args.specifier.cyan(), "is a built-in module".dimmed()),
    }
    Ok(())
}

fn run_load(config: LoaderConfig, args: &LoadArgs) -> anyhow::Result<()> {
    let mut runtime = ModuleRuntime::new(config);
    let from = args.from.as_deref().map(|file| runtime.create_require(file));

    let exports = runtime.make_require(from).call(&args.specifier)?;
    let json = serde_json::to_string_pretty(&exports.to_json())?;
    println!("{}", json);
    Ok(())
}

fn run_repl(config: LoaderConfig) -> anyhow::Result<()> {
    let mut repl =
        repl::Repl::new(ModuleRuntime::new(config)).context("failed to initialize REPL")?;
    repl.run()?;
    Ok(())
}

/// `name (built-in)` for built-ins, the filename otherwise
pub(crate) fn format_resolved(resolved: &Resolved) -> String {
    match resolved {
        Resolved::Builtin(name) => format!("{} {}", name.cyan(), "(built-in)".dimmed()),
        Resolved::File(path) => path.display().to_string(),
    }
}
