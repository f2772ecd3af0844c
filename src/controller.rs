use std::fmt;
use std::io::Write;

use tracing::{debug, info, instrument, trace, warn};

use crate::domain::{
    COLOR_BLACK, COLOR_BLUE, COLOR_CYAN, COLOR_GREEN, COLOR_MAGENTA, COLOR_RED, COLOR_WHITE, COLOR_YELLOW,
    ColorId, ViewError,
};
use crate::inputter::{Answer, PromptKeys};
use crate::loader::RowRef;
use crate::prompt::{HelpLine, HelpSegment, PromptText};
use crate::terminal::TerminalSession;
use crate::view::TableView;

pub const FILTER_KEY: char = '|';
pub const SEARCH_KEY: char = '/';
pub const SORT_KEYS: [char; 2] = ['s', 'S'];

const COLORS: [(&str, ColorId); 8] = [
    ("black", COLOR_BLACK),
    ("red", COLOR_RED),
    ("green", COLOR_GREEN),
    ("yellow", COLOR_YELLOW),
    ("blue", COLOR_BLUE),
    ("magenta", COLOR_MAGENTA),
    ("cyan", COLOR_CYAN),
    ("white", COLOR_WHITE),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Commands of the main prompt, each bound to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleSubrows,
    ToggleNumbers,
    ViewRow,
    ColumnColor,
    Help,
}

pub const COMMANDS: [Command; 6] = [
    Command::Quit,
    Command::ToggleSubrows,
    Command::ToggleNumbers,
    Command::ViewRow,
    Command::ColumnColor,
    Command::Help,
];

impl Command {
    pub fn shortcut(self) -> char {
        match self {
            Command::Quit => 'q',
            Command::ToggleSubrows => 'T',
            Command::ToggleNumbers => 'n',
            Command::ViewRow => 'v',
            Command::ColumnColor => 'c',
            Command::Help => 'h',
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Quit => "quit",
            Command::ToggleSubrows => "subrows",
            Command::ToggleNumbers => "numbers",
            Command::ViewRow => "view row",
            Command::ColumnColor => "colour",
            Command::Help => "help",
        }
    }

    pub fn from_shortcut(key: char) -> Option<Command> {
        COMMANDS.into_iter().find(|c| c.shortcut() == key)
    }

    #[instrument(level = "debug", skip(view))]
    pub fn execute<T: TerminalSession>(self, view: &mut TableView<T, RowRef>) -> Result<Flow, ViewError> {
        match self {
            Command::Quit => return Ok(Flow::Quit),
            Command::ToggleSubrows => {
                view.toggle_subrows();
                view.draw()?;
            }
            Command::ToggleNumbers => {
                if view.model().row_numbers_enabled() {
                    view.disable_row_numbers();
                } else {
                    view.enable_row_numbers();
                }
                view.draw()?;
            }
            Command::ViewRow => {
                let answer = view.prompt_get_string("Row number", &PromptKeys::default())?;
                if !answer.is_cancelled() {
                    show_row_by_number(view, &answer.into_token())?;
                }
            }
            Command::ColumnColor => pick_column_color(view)?,
            Command::Help => {
                let entries: Vec<(String, Command)> = COMMANDS
                    .into_iter()
                    .filter(|c| *c != Command::Help)
                    .map(|c| (c.shortcut().to_string(), c))
                    .collect();
                if let Some(command) = view.prompt_with_choice_dictionary("Run command:", &entries)? {
                    return command.execute(view);
                }
            }
        }
        Ok(Flow::Continue)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Main prompt loop of the viewer.
pub struct Controller {
    prompt: PromptText,
    keys: PromptKeys,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    pub fn new() -> Self {
        let mut commands = Vec::new();
        for command in COMMANDS {
            commands.push(HelpSegment::highlighted(command.shortcut()));
            commands.push(HelpSegment::plain(format!(":{}  ", command.description())));
        }
        let prompt = PromptText::new("Command or row number")
            .with_help(HelpLine::Colored(commands))
            .with_help(HelpLine::Plain(format!(
                "{}/{}:sort  {FILTER_KEY}:filter  {SEARCH_KEY}:search  PgUp/PgDn:page  F1:help",
                SORT_KEYS[0], SORT_KEYS[1]
            )));
        let keys = PromptKeys::default()
            .keypresses(COMMANDS.iter().map(|c| c.shortcut()).collect::<Vec<_>>())
            .filter_key(FILTER_KEY)
            .sort_keys(SORT_KEYS)
            .search_key(SEARCH_KEY);
        Controller { prompt, keys }
    }

    pub fn prompt_keys(&self) -> &PromptKeys {
        &self.keys
    }

    /// Prompts until the user quits. Failed commands are shown and the loop
    /// goes on.
    pub fn run<T: TerminalSession>(&self, view: &mut TableView<T, RowRef>) -> Result<(), ViewError> {
        view.draw()?;
        loop {
            let answer = view.prompt_get_string(self.prompt.clone(), &self.keys)?;
            match self.handle_answer(answer, view) {
                Ok(Flow::Quit) => {
                    info!("Quitting");
                    return Ok(());
                }
                Ok(Flow::Continue) => {}
                Err(e) => self.report(view, e)?,
            }
        }
    }

    pub fn handle_answer<T: TerminalSession>(
        &self,
        answer: Answer,
        view: &mut TableView<T, RowRef>,
    ) -> Result<Flow, ViewError> {
        trace!("Handling {answer:?}");
        match answer {
            Answer::Key(key) => match Command::from_shortcut(key) {
                Some(command) => command.execute(view),
                None => Ok(Flow::Continue),
            },
            Answer::Sort(key) => {
                view.prompt_sort(key == SORT_KEYS[1])?;
                Ok(Flow::Continue)
            }
            Answer::Function(1) => Command::Help.execute(view),
            Answer::Function(n) => {
                debug!("No binding for F{n}");
                Ok(Flow::Continue)
            }
            Answer::Text(text) if text.trim().is_empty() => Ok(Flow::Continue),
            Answer::Text(text) => {
                show_row_by_number(view, &text)?;
                Ok(Flow::Continue)
            }
            Answer::Cancelled => Ok(Flow::Continue),
        }
    }

    fn report<T: TerminalSession>(&self, view: &mut TableView<T, RowRef>, err: ViewError) -> Result<(), ViewError> {
        if let Err(shown) = view.error("Command failed", Some(&err)) {
            warn!("Could not show failure {err}: {shown}");
        }
        if view.is_yielded() {
            view.restore_screen()
        } else {
            view.draw()
        }
    }
}

fn show_row_by_number<T: TerminalSession>(view: &mut TableView<T, RowRef>, text: &str) -> Result<(), ViewError> {
    match text.trim().parse::<usize>() {
        Ok(number) if number > 0 => show_row(view, number - 1),
        _ => view.error(&format!("Not a row number: {}", text.trim()), None),
    }
}

/// Opens every `header: value` pair of an active row in the pager.
fn show_row<T: TerminalSession>(view: &mut TableView<T, RowRef>, index: usize) -> Result<(), ViewError> {
    let header = view.model().header().to_vec();
    let Some((cells, payload)) = view.get_row(index) else {
        return view.error(&format!("No row {}", index + 1), None);
    };
    let mut text: String = header
        .iter()
        .zip(cells)
        .map(|(name, value)| format!("{name}: {value}\n"))
        .collect();
    if let Some(source) = payload {
        text.push_str(&format!("\nSource line: {}\n", source.line));
    }

    let mut file = tempfile::Builder::new().prefix("tabview-row-").suffix(".txt").tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let pager = view.config().pager.clone();
    debug!("Showing row {} in {pager}", index + 1);
    let status = view.run_foreground(|| std::process::Command::new(&pager).arg(file.path()).status())??;
    debug!("Pager exited with {status}");
    Ok(())
}

fn pick_column_color<T: TerminalSession>(view: &mut TableView<T, RowRef>) -> Result<(), ViewError> {
    let headers = view.model().data_headers().to_vec();
    let Some((idx, name)) = view.prompt_with_choice_list("Column:", &headers, false)? else {
        return Ok(());
    };
    let names: Vec<&str> = COLORS.iter().map(|(n, _)| *n).collect();
    let Some((color_idx, color_name)) = view.prompt_with_choice_list("Colour:", &names, true)? else {
        return Ok(());
    };

    let column = if view.model().row_numbers_enabled() { idx + 1 } else { idx };
    let mut colors = view.column_colors().to_vec();
    if colors.len() <= column {
        colors.resize(column + 1, COLOR_WHITE);
    }
    colors[column] = COLORS[color_idx].1;
    info!("Column {name} coloured {color_name}");
    view.set_column_colors(colors);
    view.draw()
}
