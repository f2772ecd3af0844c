use derive_setters::Setters;
use tracing::trace;

use crate::domain::KeyEvent;

/// Which key handler is active inside one prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    LiveFilter,
    LiveSearch,
}

/// Reserved keys of a string prompt.
#[derive(Debug, Clone, Default, Setters)]
#[setters(strip_option)]
pub struct PromptKeys {
    /// Keys returned immediately, discarding typed text.
    pub keypresses: Vec<char>,
    /// Opens the live filter.
    pub filter_key: Option<char>,
    /// Forward and backward sort keys, returned immediately.
    pub sort_keys: Option<[char; 2]>,
    /// Opens the live search.
    pub search_key: Option<char>,
}

/// The one logical result of a string prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Key(char),
    Sort(char),
    Function(u8),
    Cancelled,
}

impl Answer {
    /// String form: typed text, the key, `"KEY_F<n>"` or `""` when cancelled.
    pub fn into_token(self) -> String {
        match self {
            Answer::Text(text) => text,
            Answer::Key(chr) | Answer::Sort(chr) => chr.to_string(),
            Answer::Function(n) => format!("KEY_F{n}"),
            Answer::Cancelled => String::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Answer::Cancelled)
    }
}

/// What the prompt loop has to do after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    Ignore,
    /// A character was appended to the answer.
    Echo(char),
    /// The last character of the answer was removed.
    Erase,
    Finish(Answer),
    EnterLive(InputMode),
    Filter { term: Option<String>, done: bool },
    Search { term: Option<String>, done: bool },
    /// Redraw table and prompt, keeping the answer.
    Redraw,
    MovePage(i32),
    Scroll(i32),
}

/// Line editing and mode switching of a single prompt.
#[derive(Debug, Default)]
pub struct Inputter {
    mode: InputMode,
    answer: String,
    live_term: String,
}

impl Inputter {
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Prompt line shown while a live mode is active.
    pub fn live_prompt(&self) -> Option<String> {
        match self.mode {
            InputMode::Normal => None,
            InputMode::LiveFilter => Some(format!("filter: {}", self.live_term)),
            InputMode::LiveSearch => Some(format!("search: {}", self.live_term)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, keys: &PromptKeys) -> InputAction {
        let action = match self.mode {
            InputMode::Normal => self.normal_key(key, keys),
            InputMode::LiveFilter | InputMode::LiveSearch => self.live_key(key),
        };
        trace!("Input {key:?} in {:?} => {action:?}", self.mode);
        action
    }

    fn normal_key(&mut self, key: KeyEvent, keys: &PromptKeys) -> InputAction {
        match key {
            KeyEvent::Enter => return InputAction::Finish(Answer::Text(std::mem::take(&mut self.answer))),
            KeyEvent::Escape => {
                self.answer.clear();
                return InputAction::Finish(Answer::Cancelled);
            }
            KeyEvent::Backspace if !self.answer.is_empty() => {
                self.answer.pop();
                return InputAction::Erase;
            }
            _ => {}
        }

        if let KeyEvent::Printable(chr) = key
            && keys.keypresses.contains(&chr)
        {
            self.answer.clear();
            return InputAction::Finish(Answer::Key(chr));
        }
        if let KeyEvent::FunctionKey(n) = key
            && (1..=12).contains(&n)
        {
            self.answer.clear();
            return InputAction::Finish(Answer::Function(n));
        }
        if let KeyEvent::Printable(chr) = key {
            if keys.filter_key == Some(chr) {
                return self.enter_live(InputMode::LiveFilter);
            }
            if keys.sort_keys.is_some_and(|sort| sort.contains(&chr)) {
                self.answer.clear();
                return InputAction::Finish(Answer::Sort(chr));
            }
            if keys.search_key == Some(chr) {
                return self.enter_live(InputMode::LiveSearch);
            }
        }

        match key {
            KeyEvent::Resize => InputAction::Redraw,
            KeyEvent::PageDown => InputAction::MovePage(1),
            KeyEvent::PageUp => InputAction::MovePage(-1),
            KeyEvent::ArrowDown => InputAction::Scroll(1),
            KeyEvent::ArrowUp => InputAction::Scroll(-1),
            other => match other.as_printable() {
                Some(chr) => {
                    self.answer.push(chr);
                    InputAction::Echo(chr)
                }
                None => InputAction::Ignore,
            },
        }
    }

    fn enter_live(&mut self, mode: InputMode) -> InputAction {
        self.mode = mode;
        self.answer.clear();
        self.live_term.clear();
        InputAction::EnterLive(mode)
    }

    // Every key reports the current term so the table can be redrawn live.
    fn live_key(&mut self, key: KeyEvent) -> InputAction {
        let done = match key {
            KeyEvent::Escape => {
                self.live_term.clear();
                true
            }
            KeyEvent::Enter => true,
            KeyEvent::Backspace if self.live_term.is_empty() => true,
            KeyEvent::Backspace => {
                self.live_term.pop();
                false
            }
            KeyEvent::Resize => false,
            other => match other.as_printable() {
                Some(chr) => {
                    self.live_term.push(chr);
                    false
                }
                None => return InputAction::Ignore,
            },
        };

        let term = Some(self.live_term.clone()).filter(|t| !t.trim().is_empty());
        let action = match self.mode {
            InputMode::LiveSearch => InputAction::Search { term, done },
            _ => InputAction::Filter { term, done },
        };
        if done {
            self.mode = InputMode::Normal;
            self.live_term.clear();
        }
        action
    }
}
