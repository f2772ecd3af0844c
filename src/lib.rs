//! Interactive table view for character-cell terminals.
//!
//! A [`TableView`] owns a [`TableModel`] of rows with optional subrows and a
//! [`TerminalSession`] to draw on. It pages, sorts, filters and highlights the
//! rows and resolves prompts at the bottom of the screen, including live
//! filtering and searching while the user types.

pub mod controller;
pub mod domain;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod prompt;
pub mod table;
pub mod terminal;
pub mod ui;
pub mod view;

#[cfg(test)]
mod test_support;

pub use domain::{CellStyle, ColorId, KeyEvent, ViewConfig, ViewError};
pub use inputter::{Answer, PromptKeys};
pub use model::TableModel;
pub use prompt::{HelpLine, HelpSegment, PromptText};
pub use terminal::{CrosstermSession, TerminalSession};
pub use view::TableView;
