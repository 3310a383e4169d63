use crate::catalog;
use crate::commands::dispatcher::CommandDispatcher;
use crate::config::Config;
use crate::core::error::MchatError;

use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::FileHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config as EditorConfig, Context, EditMode, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

/// Completes slash commands, and model names as their arguments
pub struct ComparisonHelper {
    commands: CommandDispatcher,
    hinter: HistoryHinter,
}

impl ComparisonHelper {
    pub fn new(commands: CommandDispatcher) -> Self {
        Self {
            commands,
            hinter: HistoryHinter::new(),
        }
    }

    fn candidates(&self, line: &str) -> (usize, Vec<Pair>) {
        if !line.starts_with('/') {
            return (0, Vec::new());
        }

        let pairs = |names: Vec<String>, prefix: &str| -> Vec<Pair> {
            names
                .into_iter()
                .filter(|name| name.starts_with(prefix))
                .map(|name| Pair {
                    display: name.clone(),
                    replacement: name,
                })
                .collect()
        };

        match line.rfind(' ') {
            None => (1, pairs(self.commands.get_command_names(), &line[1..])),
            Some(space) => {
                let models = catalog::MODELS.iter().map(|m| m.name.to_string()).collect();
                (space + 1, pairs(models, &line[space + 1..]))
            }
        }
    }
}

impl Helper for ComparisonHelper {}

impl Completer for ComparisonHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok(self.candidates(&line[..pos]))
    }
}

impl Hinter for ComparisonHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Highlighter for ComparisonHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for ComparisonHelper {}

fn history_path() -> PathBuf {
    Config::app_dir().join("input_history.txt")
}

/// Creates a configured rustyline editor
pub fn create_editor(
    commands: CommandDispatcher,
) -> Result<Editor<ComparisonHelper, FileHistory>, MchatError> {
    let config = EditorConfig::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let mut editor = Editor::with_config(config)
        .map_err(|e| MchatError::Input(format!("Failed to create line editor: {}", e)))?;
    editor.set_helper(Some(ComparisonHelper::new(commands)));

    // A missing history file on first run is expected.
    let _ = editor.load_history(&history_path());

    Ok(editor)
}

/// Reads a line of input; `None` on Ctrl-C or Ctrl-D
pub fn read_input(
    editor: &mut Editor<ComparisonHelper, FileHistory>,
) -> Result<Option<String>, MchatError> {
    let prompt = if cfg!(windows) && std::env::var("PSModulePath").is_ok() {
        "> ".to_string()
    } else {
        style("> ").bold().cyan().to_string()
    };
    match editor.readline(&prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                editor
                    .add_history_entry(line.as_str())
                    .map_err(|e| MchatError::Input(format!("Failed to add history entry: {}", e)))?;
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Exiting...");
            Ok(None)
        }
        Err(err) => Err(MchatError::Input(format!("Input error: {}", err))),
    }
}

/// Saves the editor history
pub fn save_history(editor: &mut Editor<ComparisonHelper, FileHistory>) -> Result<(), MchatError> {
    let history_path = history_path();
    if let Some(parent) = history_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    editor
        .save_history(&history_path)
        .map_err(|e| MchatError::Input(format!("Failed to save history: {}", e)))
}
