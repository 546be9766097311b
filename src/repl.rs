// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive resolver REPL.
//!
//! Plain input is resolved as a specifier; dot commands load modules,
//! change the requesting file and inspect the module cache.

use crate::format_resolved;
use owo_colors::OwoColorize;
use quire_node::{LoaderError, ModuleId, ModuleRuntime, Value};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// REPL configuration constants
const HISTORY_FILE: &str = ".quire_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Resolve,
    Paths,
    Load,
    From,
    Cache,
    Warnings,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let input = input.trim();
        let rest = input.strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        match cmd.as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "cls" => Some((ReplCommand::Clear, arg)),
            "version" | "v" => Some((ReplCommand::Version, arg)),
            "resolve" | "r" => Some((ReplCommand::Resolve, arg)),
            "paths" | "p" => Some((ReplCommand::Paths, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            "from" | "f" => Some((ReplCommand::From, arg)),
            "cache" | "c" => Some((ReplCommand::Cache, arg)),
            "warnings" | "w" => Some((ReplCommand::Warnings, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".resolve <spec>", "Resolve a specifier (also plain input)"),
            (".paths <spec>", "Show the lookup directories for a specifier"),
            (".load <spec>", "Load a module and print its exports"),
            (".from [file]", "Issue requests from a file (none: the cwd)"),
            (".cache", "List cached modules"),
            (".warnings", "Show and clear emitted warnings"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
        ]
    }
}

/// Helper struct for rustyline that provides completion and hints
struct QuireHelper {
    /// Commands and built-in module names for completion
    words: Vec<String>,
}

impl QuireHelper {
    fn new(builtins: Vec<String>) -> Self {
        let mut words: Vec<String> = ReplCommand::all_commands()
            .iter()
            .filter_map(|(usage, _)| usage.split_whitespace().next())
            .map(String::from)
            .collect();
        words.extend(builtins);
        Self { words }
    }

    fn word_start(line: &str) -> usize {
        line.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0)
    }
}

impl Completer for QuireHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for QuireHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| w[word.len()..].to_string().dimmed().to_string())
    }
}

impl Highlighter for QuireHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) if cmd.starts_with('.') => {
                Cow::Owned(format!("{} {}", cmd.magenta(), rest))
            }
            None if line.starts_with('.') => Cow::Owned(line.magenta().to_string()),
            _ => Cow::Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Validator for QuireHelper {}

impl Helper for QuireHelper {}

/// The interactive resolver
pub struct Repl {
    runtime: ModuleRuntime,
    editor: Editor<QuireHelper, DefaultHistory>,
    history_path: PathBuf,
    /// Requesting module; `None` issues requests from the cwd
    from: Option<ModuleId>,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(runtime: ModuleRuntime) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(QuireHelper::new(runtime.resolver().builtins().names())));

        let history_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(HISTORY_FILE);

        // A missing history file is expected on first run
        let _ = editor.load_history(&history_path);

        Ok(Self {
            runtime,
            editor,
            history_path,
            from: None,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = self.format_prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    match ReplCommand::parse(trimmed) {
                        Some((cmd, arg)) => {
                            if let CommandResult::Exit = self.execute_command(cmd, arg) {
                                break;
                            }
                        }
                        None => self.resolve(trimmed),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        if let Err(e) = self.editor.save_history(&self.history_path) {
            tracing::warn!("could not save history: {}", e);
        }
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Quire module resolver".white().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "  {} {}",
            "cwd".dimmed(),
            self.runtime.config().cwd.display()
        );
        println!();
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn format_prompt(&self) -> String {
        let name = self
            .from
            .and_then(|id| self.runtime.module(id))
            .and_then(|m| m.filename().file_name())
            .map(|n| n.to_string_lossy().into_owned());
        match name {
            Some(name) => format!("{} ", format!("quire({})>", name).bright_green().bold()),
            None => format!("{} ", "quire>".bright_green().bold()),
        }
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match (cmd, arg) {
            (ReplCommand::Help, _) => self.print_help(),
            (ReplCommand::Exit, _) => return CommandResult::Exit,
            (ReplCommand::Clear, _) => print!("\x1B[2J\x1B[H"),
            (ReplCommand::Version, _) => {
                println!(
                    "{} {} (Node.js {})",
                    "quire".bright_cyan().bold(),
                    env!("CARGO_PKG_VERSION").yellow(),
                    quire_node::NODE_API_VERSION
                );
            }
            (ReplCommand::Resolve, Some(spec)) => self.resolve(spec),
            (ReplCommand::Paths, Some(spec)) => self.paths(spec),
            (ReplCommand::Load, Some(spec)) => self.load(spec),
            (ReplCommand::From, file) => self.set_from(file),
            (ReplCommand::Cache, _) => self.print_cache(),
            (ReplCommand::Warnings, _) => self.print_warnings(),
            (_, None) => {
                eprintln!(
                    "{}: {}",
                    "Error".red().bold(),
                    "this command requires a specifier".dimmed()
                );
            }
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:18} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:18} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:18} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:18} {}", "Tab".yellow(), "Complete commands and built-ins".dimmed());
        println!();
    }

    fn resolve(&mut self, spec: &str) {
        match self.runtime.resolve(spec, self.from, None) {
            Ok(resolved) => println!("{}", format_resolved(&resolved)),
            Err(e) => print_error(&e),
        }
    }

    fn paths(&mut self, spec: &str) {
        match self.runtime.lookup_paths(spec, self.from) {
            Some(paths) => {
                for path in paths {
                    println!("  {}", path.display());
                }
            }
            None => println!("{} {}", spec.cyan(), "is a built-in module".dimmed()),
        }
    }

    fn load(&mut self, spec: &str) {
        match self.runtime.make_require(self.from).call(spec) {
            Ok(exports) => println!("{}", format_value(&exports)),
            Err(e) => print_error(&e),
        }
    }

    fn set_from(&mut self, file: Option<&str>) {
        self.from = file.map(|f| self.runtime.create_require(Path::new(f)));
        match self.from.and_then(|id| self.runtime.module(id)) {
            Some(module) => println!(
                "{} {}",
                "requests are now issued from".dimmed(),
                module.filename().display()
            ),
            None => println!("{}", "requests are now issued from the cwd".dimmed()),
        }
    }

    fn print_cache(&self) {
        let registry = self.runtime.registry();
        if registry.is_empty() {
            println!("{}", "(no cached modules)".dimmed());
            return;
        }
        for module in registry.iter() {
            let state = if module.is_loaded() {
                "loaded".green().to_string()
            } else {
                "loading".yellow().to_string()
            };
            println!("  {} {}", module.filename().display(), state);
        }
    }

    fn print_warnings(&self) {
        let warnings = self.runtime.diagnostics().take();
        if warnings.is_empty() {
            println!("{}", "(no warnings)".dimmed());
        }
        for warning in warnings {
            let label = warning.code().unwrap_or(warning.name());
            println!("  {} {}", label.yellow().bold(), warning.message);
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format exports for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".blue().dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(b) => b.to_string().yellow().to_string(),
        Value::Number(_) => value.to_string().yellow().to_string(),
        Value::String(s) => format!("'{}'", s).green().to_string(),
        Value::Function(f) => format!("[Function: {}]", f.name()).magenta().to_string(),
        Value::Array(_) | Value::Object(_) | Value::Partial(_) => {
            serde_json::to_string_pretty(&value.to_json())
                .unwrap_or_else(|_| value.to_string())
                .cyan()
                .to_string()
        }
    }
}

/// Print a loader error with its Node.js error code
fn print_error(error: &LoaderError) {
    eprintln!("{} {}", format!("[{}]", error.code()).red().bold(), error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".load ./data.json"),
            Some((ReplCommand::Load, Some("./data.json")))
        ));
        assert!(matches!(
            ReplCommand::parse(".from   "),
            Some((ReplCommand::From, None))
        ));
        assert!(ReplCommand::parse("lodash").is_none());
        assert!(ReplCommand::parse(".nope").is_none());
    }

    #[test]
    fn test_completion_words() {
        let helper = QuireHelper::new(vec!["fs".to_string(), "node:test".to_string()]);
        assert!(helper.words.contains(&".resolve".to_string()));
        assert!(helper.words.contains(&".from".to_string()));
        assert!(helper.words.contains(&"node:test".to_string()));
        assert_eq!(QuireHelper::word_start(".load ./a"), 6);
    }
}
