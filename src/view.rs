use std::error::Error;
use std::fmt::Display;
use std::io::Write;
use std::process::Command;

use tracing::{debug, info, instrument, trace, warn};
use tracing_error::SpanTrace;

use crate::domain::{
    CellStyle, ColorId, COLOR_BLACK, COLOR_RED, DEFAULT_COLOR_PAIR, KeyEvent, ViewConfig, ViewError,
};
use crate::inputter::{Answer, InputAction, Inputter, PromptKeys};
use crate::model::{Subrow, TableModel};
use crate::prompt::{self, HelpLine, PromptText};
use crate::table::RowContainer;
use crate::terminal::TerminalSession;
use crate::ui::{self, Palette};

/// Interactive table on a terminal session: drawing, paging and prompts.
///
/// Every state change redraws the whole screen. Between `yield_screen` and
/// `restore_screen` nothing is drawn.
pub struct TableView<T: TerminalSession, P> {
    model: TableModel<P>,
    session: T,
    config: ViewConfig,
    palette: Palette,
    yielded: bool,
}

impl<T: TerminalSession, P> TableView<T, P> {
    pub fn new(session: T, config: ViewConfig) -> Self {
        TableView {
            model: TableModel::default(),
            session,
            config,
            palette: Palette::default(),
            yielded: false,
        }
    }

    pub fn model(&self) -> &TableModel<P> {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut TableModel<P> {
        &mut self.model
    }

    pub fn session(&self) -> &T {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut T {
        &mut self.session
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn is_yielded(&self) -> bool {
        self.yielded
    }

    pub fn column_colors(&self) -> &[ColorId] {
        &self.palette.column_colors
    }

    pub fn set_column_colors(&mut self, colors: Vec<ColorId>) {
        self.palette.column_colors = colors;
    }

    pub fn set_header_color(&mut self, color: ColorId) {
        self.palette.header_color = Some(color);
    }

    pub fn set_help_text_color(&mut self, color: ColorId) {
        self.palette.help_text_color = Some(color);
    }

    pub fn add_header<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model.add_header(columns);
    }

    pub fn add_row(&mut self, cells: Vec<String>, payload: Option<P>, subrows: Vec<Subrow<P>>) {
        self.model.add_row(cells, payload, subrows);
    }

    pub fn get_row(&mut self, index: usize) -> Option<(&[String], Option<&P>)> {
        self.model.get_row(index)
    }

    pub fn get_rows(&mut self) -> Vec<&RowContainer<P>> {
        self.model.get_rows()
    }

    pub fn clear(&mut self) {
        self.model.clear();
    }

    pub fn enable_row_numbers(&mut self) {
        self.model.enable_row_numbers();
    }

    pub fn disable_row_numbers(&mut self) {
        self.model.disable_row_numbers();
    }

    pub fn toggle_subrows(&mut self) {
        self.model.toggle_subrows();
    }

    pub fn rows_per_page(&self) -> usize {
        let (rows, _) = self.session.geometry();
        ui::rows_per_page(rows, &self.config, self.model.row_numbers_enabled())
    }

    pub fn draw(&mut self) -> Result<(), ViewError> {
        self.ensure_screen()?;
        ui::draw_table(&mut self.model, &mut self.session, &self.config, &self.palette)
    }

    pub fn sort(&mut self, column: usize, reverse: bool) -> Result<(), ViewError> {
        self.model.sort(column, reverse);
        self.draw()
    }

    /// Moves `delta` pages and redraws, even when the page did not change.
    pub fn move_page(&mut self, delta: i32) -> Result<(), ViewError> {
        let per_page = self.rows_per_page();
        self.model.move_page(delta, per_page);
        self.draw()
    }

    pub fn clear_prompt(&mut self) -> Result<(), ViewError> {
        self.ensure_screen()?;
        let (rows, _) = self.session.geometry();
        let top = usize::from(rows).saturating_sub(self.config.prompt_max_lines);
        self.session.clear_from(top as u16, 0);
        self.session.refresh()
    }

    /// Shows `text` bold at the bottom of the screen, `suffix` appended to its
    /// last line.
    pub fn prompt(&mut self, text: &str, suffix: &str, color: Option<ColorId>) -> Result<(), ViewError> {
        let lines: Vec<&str> = text.split('\n').collect();
        self.check_prompt_height(lines.len())?;
        self.clear_prompt()?;

        let style = CellStyle::pair(color.map_or(DEFAULT_COLOR_PAIR, Palette::pair_for)).bold();
        let (rows, _) = self.session.geometry();
        let top = rows.saturating_sub(lines.len() as u16);
        let last = lines.len() - 1;
        for (idx, line) in lines.iter().enumerate() {
            let text = if idx == last {
                format!("{line}{suffix}")
            } else {
                line.to_string()
            };
            self.write_clipped(top + idx as u16, 0, &text, style)?;
        }
        self.session.refresh()
    }

    /// One line message without suffix, for example while loading.
    pub fn status(&mut self, text: &str) -> Result<(), ViewError> {
        self.prompt(text, "", None)
    }

    /// Shows help lines above the input line. Lines after the first are
    /// indented by two columns, highlighted segments use the help colour.
    pub fn prompt_with_colored_help(&mut self, prompt: &PromptText, suffix: &str) -> Result<(), ViewError> {
        self.check_prompt_height(prompt.line_count())?;
        self.clear_prompt()?;
        self.palette.register(&mut self.session);

        let (rows, _) = self.session.geometry();
        let top = rows.saturating_sub(prompt.line_count() as u16);
        let help_style = self.palette.help_style();
        for (idx, line) in prompt.help.iter().enumerate() {
            let row = top + idx as u16;
            let mut col: u16 = if idx == 0 { 0 } else { 2 };
            match line {
                HelpLine::Plain(text) => self.write_clipped(row, col, text, CellStyle::default())?,
                HelpLine::Colored(segments) => {
                    for segment in segments {
                        let style = if segment.highlighted {
                            help_style
                        } else {
                            CellStyle::default()
                        };
                        self.write_clipped(row, col, &segment.text, style)?;
                        col = col.saturating_add(segment.text.chars().count() as u16);
                    }
                }
            }
        }
        let input = format!("{}{suffix}", prompt.input_line);
        self.write_clipped(rows.saturating_sub(1), 0, &input, CellStyle::default().bold())?;
        self.session.refresh()
    }

    /// Returns the first printable key, `None` on Escape.
    pub fn prompt_get_character(&mut self, text: &str) -> Result<Option<char>, ViewError> {
        let suffix = self.config.prompt_suffix.clone();
        loop {
            self.prompt(text, &suffix, None)?;
            match self.session.read_key()? {
                KeyEvent::Resize => self.draw()?,
                KeyEvent::Escape => return Ok(None),
                key => {
                    if let Some(chr) = key.as_printable() {
                        return Ok(Some(chr));
                    }
                    trace!("Ignoring {key:?} in character prompt");
                }
            }
        }
    }

    /// Reads a line of text below `prompt` until one of the finishing keys.
    ///
    /// The filter and search keys run a live filter or search that redraws the
    /// table on every key and then returns to an empty input line. Resize,
    /// paging and the arrow keys redraw and keep the typed text.
    #[instrument(level = "debug", skip_all)]
    pub fn prompt_get_string(
        &mut self,
        prompt: impl Into<PromptText>,
        keys: &PromptKeys,
    ) -> Result<Answer, ViewError> {
        let prompt = prompt.into();
        let mut inputter = Inputter::default();
        self.reprompt(&prompt, "")?;

        loop {
            let key = self.session.read_key()?;
            match inputter.handle_key(key, keys) {
                InputAction::Ignore => {}
                InputAction::Echo(_) | InputAction::Erase => self.echo(&prompt, inputter.answer())?,
                InputAction::Finish(answer) => {
                    debug!("Prompt answered with {answer:?}");
                    return Ok(answer);
                }
                InputAction::EnterLive(_) => self.show_live_prompt(&inputter)?,
                InputAction::Filter { term, done } => {
                    self.model.set_filter(term);
                    self.after_live_update(&prompt, &inputter, done)?;
                }
                InputAction::Search { term, done } => {
                    self.model.set_search(term);
                    self.after_live_update(&prompt, &inputter, done)?;
                }
                InputAction::Redraw => {
                    self.draw()?;
                    self.reprompt(&prompt, inputter.answer())?;
                }
                InputAction::MovePage(delta) => {
                    self.move_page(delta)?;
                    self.reprompt(&prompt, inputter.answer())?;
                }
                InputAction::Scroll(delta) => {
                    self.model.scroll(delta);
                    self.draw()?;
                    self.reprompt(&prompt, inputter.answer())?;
                }
            }
        }
    }

    /// Offers `choices` with a shortcut each and returns the picked index and
    /// label, `None` when cancelled or no choice matched.
    ///
    /// Shortcuts are the numbers from 1, or letters of each choice when
    /// `non_numeric_keypresses` is set.
    pub fn prompt_with_choice_list<S: AsRef<str>>(
        &mut self,
        text: &str,
        choices: &[S],
        non_numeric_keypresses: bool,
    ) -> Result<Option<(usize, String)>, ViewError> {
        let (legend, shortcuts) = if non_numeric_keypresses {
            let shortcuts = prompt::assign_shortcuts(choices);
            (prompt::shortcut_legend(&shortcuts, choices), Some(shortcuts))
        } else {
            (prompt::numbered_legend(choices), None)
        };
        let legend = prompt::wrap_legend(&legend, self.config.max_column_width);
        let full_text = format!("{legend}\n{text}");

        let single_key = match &shortcuts {
            Some(shortcuts) => shortcuts.iter().all(|s| s.chars().count() == 1),
            None => choices.len() < 10,
        };
        let Some(selection) = self.read_selection(&full_text, single_key)? else {
            return Ok(None);
        };

        let index = match &shortcuts {
            Some(shortcuts) => shortcuts.iter().position(|s| *s == selection),
            None => selection
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=choices.len()).contains(n))
                .map(|n| n - 1),
        };
        debug!("Choice {selection:?} => {index:?}");
        Ok(index.map(|idx| (idx, choices[idx].as_ref().to_string())))
    }

    /// Offers `entries` as `key:label` and returns the label of the typed key.
    pub fn prompt_with_choice_dictionary<V: Display + Clone>(
        &mut self,
        text: &str,
        entries: &[(String, V)],
    ) -> Result<Option<V>, ViewError> {
        let legend = prompt::wrap_legend(&prompt::dictionary_legend(entries), self.config.max_column_width);
        let full_text = format!("{legend}\n{text}");
        let Some(selection) = self.read_selection(&full_text, entries.len() < 10)? else {
            return Ok(None);
        };
        Ok(entries
            .iter()
            .find(|(key, _)| *key == selection)
            .map(|(_, value)| value.clone()))
    }

    /// Asks for a column to sort by and sorts. Returns false when cancelled.
    pub fn prompt_sort(&mut self, reverse: bool) -> Result<bool, ViewError> {
        let headers = self.model.data_headers().to_vec();
        let Some((idx, name)) = self.prompt_with_choice_list("Sort by:", &headers, false)? else {
            return Ok(false);
        };
        let column = if self.model.row_numbers_enabled() { idx + 1 } else { idx };
        info!("Sorting by {name}{}", if reverse { " (reverse)" } else { "" });
        self.sort(column, reverse)?;
        Ok(true)
    }

    /// Shows `msg` in red and waits for a key.
    ///
    /// With an `error` attached, `v` yields the screen and opens its details in
    /// the pager. The screen stays yielded afterwards, the caller restores it.
    /// A pager that cannot be started is only logged.
    #[instrument(level = "debug", skip(self, error))]
    pub fn error(&mut self, msg: &str, error: Option<&dyn Error>) -> Result<(), ViewError> {
        let text = match error {
            Some(err) => {
                let first_line: String = err
                    .to_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .chars()
                    .take(self.config.max_column_width)
                    .collect();
                format!("Error: {first_line}\nMsg: {msg}\nPress v to view the exception...")
            }
            None => format!("Error: {msg}\nPress any key to continue..."),
        };
        warn!("{}", text.replace('\n', " | "));

        self.session
            .init_color_pair(Palette::pair_for(COLOR_RED), COLOR_RED, COLOR_BLACK);
        let key = loop {
            self.prompt(&text, "", Some(COLOR_RED))?;
            match self.session.read_key()? {
                KeyEvent::Resize => self.draw()?,
                key => break key,
            }
        };

        if let (KeyEvent::Printable('v'), Some(err)) = (key, error) {
            self.prompt("", "", None)?;
            self.yield_screen()?;
            self.show_in_pager(msg, err)?;
        }
        Ok(())
    }

    /// Tears the screen down for a foreground process.
    pub fn yield_screen(&mut self) -> Result<(), ViewError> {
        self.session.yield_screen()?;
        self.yielded = true;
        debug!("Screen yielded");
        Ok(())
    }

    /// Takes the screen back and redraws.
    pub fn restore_screen(&mut self) -> Result<(), ViewError> {
        self.session.restore_screen()?;
        self.yielded = false;
        debug!("Screen restored");
        self.draw()
    }

    /// Runs `f` with the screen yielded, then restores and redraws.
    pub fn run_foreground<R>(&mut self, f: impl FnOnce() -> R) -> Result<R, ViewError> {
        self.yield_screen()?;
        let result = f();
        self.restore_screen()?;
        Ok(result)
    }

    pub fn into_session(self) -> T {
        self.session
    }

    fn ensure_screen(&self) -> Result<(), ViewError> {
        if self.yielded {
            return Err(ViewError::ScreenYielded);
        }
        Ok(())
    }

    fn check_prompt_height(&self, lines: usize) -> Result<(), ViewError> {
        if lines > self.config.prompt_max_lines {
            return Err(ViewError::PromptOverflow {
                lines,
                max: self.config.prompt_max_lines,
            });
        }
        Ok(())
    }

    fn write_clipped(&mut self, row: u16, col: u16, text: &str, style: CellStyle) -> Result<(), ViewError> {
        match self.session.write(row, col, text, style) {
            Err(ViewError::OutOfBounds { row, col }) => {
                trace!("Prompt clipped at {row}:{col}");
                Ok(())
            }
            other => other,
        }
    }

    fn input_column(&self, prompt: &PromptText) -> u16 {
        let len = prompt.input_line.chars().count() + self.config.prompt_suffix.chars().count() + 1;
        len.min(usize::from(u16::MAX)) as u16
    }

    fn reprompt(&mut self, prompt: &PromptText, answer: &str) -> Result<(), ViewError> {
        let suffix = self.config.prompt_suffix.clone();
        self.prompt_with_colored_help(prompt, &suffix)?;
        if !answer.is_empty() {
            self.echo(prompt, answer)?;
        }
        Ok(())
    }

    fn echo(&mut self, prompt: &PromptText, answer: &str) -> Result<(), ViewError> {
        let (rows, _) = self.session.geometry();
        let row = rows.saturating_sub(1);
        let col = self.input_column(prompt);
        self.session.clear_from(row, col);
        self.write_clipped(row, col, answer, CellStyle::default())?;
        self.session.refresh()
    }

    fn show_live_prompt(&mut self, inputter: &Inputter) -> Result<(), ViewError> {
        let text = inputter.live_prompt().unwrap_or_default();
        self.prompt(&text, "", None)
    }

    fn after_live_update(&mut self, prompt: &PromptText, inputter: &Inputter, done: bool) -> Result<(), ViewError> {
        self.draw()?;
        if done {
            self.reprompt(prompt, "")
        } else {
            self.show_live_prompt(inputter)
        }
    }

    fn read_selection(&mut self, text: &str, single_key: bool) -> Result<Option<String>, ViewError> {
        if single_key {
            return Ok(self.prompt_get_character(text)?.map(String::from));
        }
        let answer = self.prompt_get_string(text, &PromptKeys::default())?;
        if answer.is_cancelled() {
            return Ok(None);
        }
        Ok(Some(answer.into_token()))
    }

    fn show_in_pager(&self, msg: &str, err: &dyn Error) -> Result<(), ViewError> {
        let mut file = tempfile::Builder::new()
            .prefix("tabview-error-")
            .suffix(".txt")
            .tempfile()?;
        writeln!(file, "Error: {err}\nMsg: {msg}\n")?;
        let mut source = err.source();
        while let Some(cause) = source {
            writeln!(file, "Caused by: {cause}")?;
            source = cause.source();
        }
        writeln!(file, "\nSpan trace:\n{}", SpanTrace::capture())?;
        file.flush()?;

        info!("Opening error details in {}", self.config.pager);
        match Command::new(&self.config.pager).arg(file.path()).status() {
            Ok(status) if !status.success() => warn!("Pager exited with {status}"),
            Ok(_) => {}
            Err(e) => warn!("Could not start pager {}: {e}", self.config.pager),
        }
        Ok(())
    }
}
