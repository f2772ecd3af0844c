use derive_setters::Setters;
use std::fmt;
use std::io::Error;

/// Curses-style colour ids. Colour pair `c + 1` is registered for colour `c`.
pub type ColorId = u8;

pub const COLOR_BLACK: ColorId = 0;
pub const COLOR_RED: ColorId = 1;
pub const COLOR_GREEN: ColorId = 2;
pub const COLOR_YELLOW: ColorId = 3;
pub const COLOR_BLUE: ColorId = 4;
pub const COLOR_MAGENTA: ColorId = 5;
pub const COLOR_CYAN: ColorId = 6;
pub const COLOR_WHITE: ColorId = 7;

/// Pair index 0 is the terminal default and never registered.
pub const DEFAULT_COLOR_PAIR: u16 = 0;

#[derive(Debug)]
pub enum ViewError {
    IoError(Error),
    PromptOverflow { lines: usize, max: usize },
    OutOfBounds { row: u16, col: u16 },
    ScreenYielded,
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::IoError(e) => write!(f, "terminal i/o failed: {e}"),
            ViewError::PromptOverflow { lines, max } => {
                write!(f, "Too many lines in prompt ({lines} > {max})")
            }
            ViewError::OutOfBounds { row, col } => {
                write!(f, "write at {row}:{col} is outside the terminal")
            }
            ViewError::ScreenYielded => write!(f, "screen is yielded to a foreground process"),
            ViewError::LoadingFailed(msg) => write!(f, "loading failed: {msg}"),
            ViewError::FileNotFound => write!(f, "file not found"),
            ViewError::PermissionDenied => write!(f, "permission denied"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for ViewError {
    fn from(err: Error) -> Self {
        ViewError::IoError(err)
    }
}

/// One logical input event as delivered by a [`crate::terminal::TerminalSession`].
///
/// Resize is surfaced here as a regular read result rather than a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Printable(char),
    Enter,
    Escape,
    Backspace,
    FunctionKey(u8),
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    Resize,
}

impl KeyEvent {
    /// Printable ASCII, codes 32 to 126.
    pub fn as_printable(&self) -> Option<char> {
        match self {
            KeyEvent::Printable(c) if (' '..='~').contains(c) => Some(*c),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellStyle {
    pub color_pair: u16,
    pub bold: bool,
}

impl CellStyle {
    pub fn pair(color_pair: u16) -> Self {
        CellStyle {
            color_pair,
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Limits and prompt settings of a table view.
#[derive(Debug, Clone, Setters)]
pub struct ViewConfig {
    /// Cells longer than this are truncated to `max_column_width - 3` chars plus "...".
    pub max_column_width: usize,
    /// Trailing spaces after every column.
    pub padding: usize,
    /// Height of the prompt region at the bottom of the terminal.
    pub prompt_max_lines: usize,
    #[setters(into)]
    pub prompt_suffix: String,
    /// External viewer used by `TableView::error` for exception details.
    #[setters(into)]
    pub pager: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            max_column_width: 80,
            padding: 2,
            prompt_max_lines: 5,
            prompt_suffix: " >".to_string(),
            pager: "less".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_is_limited_to_ascii_range() {
        assert_eq!(KeyEvent::Printable('a').as_printable(), Some('a'));
        assert_eq!(KeyEvent::Printable('~').as_printable(), Some('~'));
        assert_eq!(KeyEvent::Printable('é').as_printable(), None);
        assert_eq!(KeyEvent::Printable('\t').as_printable(), None);
        assert_eq!(KeyEvent::Enter.as_printable(), None);
    }

    #[test]
    fn config_setters_chain() {
        let cfg = ViewConfig::default().padding(4).prompt_max_lines(3).pager("more");
        assert_eq!(cfg.padding, 4);
        assert_eq!(cfg.prompt_max_lines, 3);
        assert_eq!(cfg.pager, "more");
        assert_eq!(cfg.max_column_width, 80);
    }

    #[test]
    fn overflow_message_names_the_limit() {
        let err = ViewError::PromptOverflow { lines: 7, max: 5 };
        assert_eq!(err.to_string(), "Too many lines in prompt (7 > 5)");
    }
}
