use std::borrow::Cow;

use tracing::trace;

use crate::domain::{CellStyle, ColorId, COLOR_BLACK, COLOR_WHITE, DEFAULT_COLOR_PAIR, ViewConfig, ViewError};
use crate::model::TableModel;
use crate::terminal::TerminalSession;

pub const TABLE_HEADER_HEIGHT: u16 = 1;
pub const SUBROW_COLOR: ColorId = COLOR_WHITE;
const ELLIPSIS: &str = "...";

/// Colours of a table view. Each colour id is drawn with pair `id + 1`.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    pub column_colors: Vec<ColorId>,
    pub header_color: Option<ColorId>,
    pub help_text_color: Option<ColorId>,
}

impl Palette {
    pub fn pair_for(color: ColorId) -> u16 {
        u16::from(color) + 1
    }

    /// Black on white, registered after the column colours.
    ///
    /// Numbered past the pairs of all eight colours rather than at
    /// `len(column_colors)`: that pair is also `pair_for` of some colour, and
    /// registering that colour for a column would repaint every search hit.
    pub fn highlight_pair(&self) -> u16 {
        Self::pair_for(COLOR_WHITE) + 1 + self.column_colors.len() as u16
    }

    pub fn header_style(&self) -> CellStyle {
        CellStyle::pair(self.header_color.map_or(DEFAULT_COLOR_PAIR, Self::pair_for))
    }

    /// Highlighted help segments fall back to the header colour.
    pub fn help_style(&self) -> CellStyle {
        let color = self.help_text_color.or(self.header_color);
        CellStyle::pair(color.map_or(DEFAULT_COLOR_PAIR, Self::pair_for)).bold()
    }

    pub fn register<T: TerminalSession>(&self, session: &mut T) {
        session.init_color_pair(Self::pair_for(SUBROW_COLOR), SUBROW_COLOR, COLOR_BLACK);
        let named = [self.header_color, self.help_text_color];
        for color in named.into_iter().flatten().chain(self.column_colors.iter().copied()) {
            session.init_color_pair(Self::pair_for(color), color, COLOR_BLACK);
        }
        session.init_color_pair(self.highlight_pair(), COLOR_BLACK, COLOR_WHITE);
    }

    fn row_style(&self, column: usize, is_subrow: bool, highlighted: bool) -> CellStyle {
        if is_subrow {
            CellStyle::pair(Self::pair_for(SUBROW_COLOR))
        } else if highlighted {
            CellStyle::pair(self.highlight_pair())
        } else if let Some(&color) = self.column_colors.get(column) {
            CellStyle::pair(Self::pair_for(color))
        } else {
            CellStyle::default()
        }
    }
}

pub fn rows_per_page(terminal_rows: u16, config: &ViewConfig, row_numbers: bool) -> usize {
    let mut rows = usize::from(terminal_rows).saturating_sub(config.prompt_max_lines + 1);
    if row_numbers {
        rows = rows.saturating_sub(1);
    }
    rows.max(1)
}

pub fn truncate_cell(cell: &str, max_column_width: usize) -> Cow<'_, str> {
    if cell.chars().count() <= max_column_width {
        return Cow::Borrowed(cell);
    }
    let keep = max_column_width.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = cell.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    Cow::Owned(truncated)
}

/// Widest header or truncated cell of every column, over all rows.
pub fn column_widths<P>(model: &TableModel<P>, max_column_width: usize) -> Vec<usize> {
    let mut widths: Vec<usize> = model.header().iter().map(|h| h.chars().count()).collect();
    for row in model.rows().in_display_order() {
        for (col, cell) in row.cells.iter().enumerate() {
            let width = truncate_cell(cell, max_column_width).chars().count();
            match widths.get_mut(col) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }
    widths
}

/// Redraws header and the current page of active rows.
///
/// Writes outside the screen end the frame early without an error, the next
/// full draw repaints it.
pub fn draw_table<T: TerminalSession, P>(
    model: &mut TableModel<P>,
    session: &mut T,
    config: &ViewConfig,
    palette: &Palette,
) -> Result<(), ViewError> {
    if model.row_numbers_enabled() {
        model.renumber_active_rows();
    }
    session.clear_all();
    let (rows, cols) = session.geometry();
    let per_page = rows_per_page(rows, config, model.row_numbers_enabled());
    palette.register(session);
    let widths = column_widths(model, config.max_column_width);

    match draw_rows(model, session, config, palette, &widths, per_page, cols) {
        Err(ViewError::OutOfBounds { row, col }) => {
            trace!("Frame clipped at {row}:{col}");
        }
        other => other?,
    }
    session.refresh()
}

fn draw_rows<T: TerminalSession, P>(
    model: &mut TableModel<P>,
    session: &mut T,
    config: &ViewConfig,
    palette: &Palette,
    widths: &[usize],
    per_page: usize,
    cols: u16,
) -> Result<(), ViewError> {
    let mut col = 0usize;
    for (idx, title) in model.header().iter().enumerate() {
        let justified = justify(title, widths[idx] + config.padding);
        if col < usize::from(cols) {
            session.write(0, col as u16, &justified, palette.header_style())?;
        }
        col += justified.chars().count();
    }

    let active = model.active_rows();
    let first = (model.current_page() - 1) * per_page;
    trace!(
        "Drawing rows {}..{} of {} on page {}",
        first,
        first + per_page,
        active.len(),
        model.current_page()
    );

    for (line, &idx) in active.iter().skip(first).take(per_page).enumerate() {
        let Some(row) = model.rows().get(idx) else {
            continue;
        };
        let highlighted = model.matches_search(row);
        let screen_row = TABLE_HEADER_HEIGHT + line as u16;
        let mut col = 0usize;
        for (cidx, cell) in row.cells.iter().enumerate() {
            let text = truncate_cell(cell, config.max_column_width);
            let justified = justify(&text, widths[cidx] + config.padding);
            if col < usize::from(cols) {
                let style = palette.row_style(cidx, row.is_subrow(), highlighted);
                session.write(screen_row, col as u16, &justified, style)?;
            }
            col += justified.chars().count();
        }
    }
    Ok(())
}

fn justify(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}
