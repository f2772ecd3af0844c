use std::collections::HashMap;

use ratatui::DefaultTerminal;
use ratatui::buffer::Buffer;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use tracing::{debug, trace};

use crate::domain::{CellStyle, ColorId, KeyEvent, ViewError};

/// The character-cell terminal the view draws on and reads keys from.
///
/// Coordinates are `(row, col)` with the origin in the top-left corner.
pub trait TerminalSession {
    /// Current `(rows, cols)`. May change between calls.
    fn geometry(&self) -> (u16, u16);

    /// Blocks until the next key or resize.
    fn read_key(&mut self) -> Result<KeyEvent, ViewError>;

    /// Writes `text` clipped at the right edge. Fails with `OutOfBounds` when
    /// the start position is outside the screen.
    fn write(&mut self, row: u16, col: u16, text: &str, style: CellStyle) -> Result<(), ViewError>;

    /// Clears from `(row, col)` to the end of the screen.
    fn clear_from(&mut self, row: u16, col: u16);

    fn clear_all(&mut self);

    fn init_color_pair(&mut self, pair: u16, fg: ColorId, bg: ColorId);

    /// Makes all writes since the last refresh visible.
    fn refresh(&mut self) -> Result<(), ViewError>;

    /// Tears the screen down so a foreground process can use the terminal.
    fn yield_screen(&mut self) -> Result<(), ViewError>;

    /// Takes the terminal back after `yield_screen`. The caller redraws.
    fn restore_screen(&mut self) -> Result<(), ViewError>;
}

/// [`TerminalSession`] on a real terminal.
///
/// Writes land in an off-screen buffer which `refresh` hands to ratatui, so
/// only changed cells reach the terminal.
pub struct CrosstermSession {
    terminal: Option<DefaultTerminal>,
    buffer: Buffer,
    pairs: HashMap<u16, (ColorId, ColorId)>,
    cursor: Position,
}

impl CrosstermSession {
    pub fn init() -> Result<Self, ViewError> {
        let terminal = ratatui::try_init()?;
        let size = terminal.size()?;
        debug!("Terminal initialised with {}x{}", size.width, size.height);
        Ok(Self {
            terminal: Some(terminal),
            buffer: Buffer::empty(Rect::new(0, 0, size.width, size.height)),
            pairs: HashMap::new(),
            cursor: Position::ORIGIN,
        })
    }

    /// Restores the terminal for the shell. Also done on drop.
    pub fn close(&mut self) {
        if self.terminal.take().is_some() {
            ratatui::restore();
        }
    }

    fn sync_buffer_size(&mut self) {
        let (rows, cols) = self.geometry();
        let area = Rect::new(0, 0, cols, rows);
        if self.buffer.area != area {
            trace!("Resizing screen buffer to {cols}x{rows}");
            self.buffer.resize(area);
        }
    }

    fn style_for(&self, style: CellStyle) -> Style {
        let mut out = match self.pairs.get(&style.color_pair) {
            Some(&(fg, bg)) => Style::default().fg(Color::Indexed(fg)).bg(Color::Indexed(bg)),
            None => Style::default(),
        };
        if style.bold {
            out = out.add_modifier(Modifier::BOLD);
        }
        out
    }

    fn map_key(key: event::KeyEvent) -> Option<KeyEvent> {
        let mapped = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(KeyEvent::Escape),
            (KeyCode::Char(_), km) if km.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                None
            }
            (KeyCode::Char(chr), _) => Some(KeyEvent::Printable(chr)),
            (KeyCode::Enter, _) => Some(KeyEvent::Enter),
            (KeyCode::Esc, _) => Some(KeyEvent::Escape),
            (KeyCode::Backspace, _) => Some(KeyEvent::Backspace),
            (KeyCode::F(n), _) if (1..=12).contains(&n) => Some(KeyEvent::FunctionKey(n)),
            (KeyCode::PageUp, _) => Some(KeyEvent::PageUp),
            (KeyCode::PageDown, _) => Some(KeyEvent::PageDown),
            (KeyCode::Up, _) => Some(KeyEvent::ArrowUp),
            (KeyCode::Down, _) => Some(KeyEvent::ArrowDown),
            _ => None,
        };
        trace!("Mapped: {key:?} => {mapped:?}");
        mapped
    }
}

impl Drop for CrosstermSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl TerminalSession for CrosstermSession {
    fn geometry(&self) -> (u16, u16) {
        match ratatui::crossterm::terminal::size() {
            Ok((cols, rows)) => (rows, cols),
            Err(_) => (self.buffer.area.height, self.buffer.area.width),
        }
    }

    fn read_key(&mut self) -> Result<KeyEvent, ViewError> {
        loop {
            match event::read()? {
                Event::Resize(width, height) => {
                    debug!("Terminal resized to {width}x{height}");
                    self.buffer.resize(Rect::new(0, 0, width, height));
                    return Ok(KeyEvent::Resize);
                }
                // crossterm also emits release and repeat events on Windows.
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(mapped) = Self::map_key(key) {
                        return Ok(mapped);
                    }
                }
                _ => {}
            }
        }
    }

    fn write(&mut self, row: u16, col: u16, text: &str, style: CellStyle) -> Result<(), ViewError> {
        let area = self.buffer.area;
        if row >= area.height || col >= area.width {
            return Err(ViewError::OutOfBounds { row, col });
        }
        let max_width = usize::from(area.width - col);
        let style = self.style_for(style);
        let (x, y) = self.buffer.set_stringn(col, row, text, max_width, style);
        self.cursor = Position::new(x, y);
        Ok(())
    }

    fn clear_from(&mut self, row: u16, col: u16) {
        let area = self.buffer.area;
        for y in row..area.height {
            let start = if y == row { col } else { 0 };
            for x in start..area.width {
                if let Some(cell) = self.buffer.cell_mut((x, y)) {
                    cell.reset();
                }
            }
        }
        self.cursor = Position::new(col, row);
    }

    fn clear_all(&mut self) {
        self.sync_buffer_size();
        self.buffer.reset();
        self.cursor = Position::ORIGIN;
    }

    fn init_color_pair(&mut self, pair: u16, fg: ColorId, bg: ColorId) {
        self.pairs.insert(pair, (fg, bg));
    }

    fn refresh(&mut self) -> Result<(), ViewError> {
        let Some(terminal) = self.terminal.as_mut() else {
            return Err(ViewError::ScreenYielded);
        };
        let buffer = &self.buffer;
        let cursor = self.cursor;
        terminal.draw(|frame| {
            let area = frame.area();
            for y in area.top()..area.bottom() {
                for x in area.left()..area.right() {
                    if let (Some(src), Some(dst)) =
                        (buffer.cell((x, y)), frame.buffer_mut().cell_mut((x, y)))
                    {
                        *dst = src.clone();
                    }
                }
            }
            frame.set_cursor_position(cursor);
        })?;
        Ok(())
    }

    fn yield_screen(&mut self) -> Result<(), ViewError> {
        if let Some(mut terminal) = self.terminal.take() {
            terminal.clear()?;
            ratatui::restore();
            debug!("Screen yielded");
        }
        Ok(())
    }

    fn restore_screen(&mut self) -> Result<(), ViewError> {
        if self.terminal.is_none() {
            let mut terminal = ratatui::try_init()?;
            terminal.clear()?;
            self.terminal = Some(terminal);
            debug!("Screen restored");
        }
        self.clear_all();
        Ok(())
    }
}
