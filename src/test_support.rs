//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};

use crate::domain::{CellStyle, ColorId, KeyEvent, ViewError};
use crate::terminal::TerminalSession;

/// An in-memory terminal fed from a key script.
pub struct FakeSession {
    rows: u16,
    cols: u16,
    // Size writes are checked against; differs from `rows`/`cols` to fake a resize race.
    actual: (u16, u16),
    keys: VecDeque<(KeyEvent, Option<(u16, u16)>)>,
    grid: Vec<Vec<char>>,
    styles: Vec<Vec<CellStyle>>,
    pub pairs: HashMap<u16, (ColorId, ColorId)>,
    pub refreshes: usize,
    pub yields: usize,
    pub restores: usize,
}

impl FakeSession {
    pub fn new(rows: u16, cols: u16) -> Self {
        FakeSession {
            rows,
            cols,
            actual: (rows, cols),
            keys: VecDeque::new(),
            grid: vec![vec![' '; cols as usize]; rows as usize],
            styles: vec![vec![CellStyle::default(); cols as usize]; rows as usize],
            pairs: HashMap::new(),
            refreshes: 0,
            yields: 0,
            restores: 0,
        }
    }

    pub fn with_keys(mut self, keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        self.push_keys(keys);
        self
    }

    pub fn push_keys(&mut self, keys: impl IntoIterator<Item = KeyEvent>) {
        self.keys.extend(keys.into_iter().map(|k| (k, None)));
    }

    /// Types `text` one printable key at a time.
    pub fn type_text(&mut self, text: &str) {
        self.push_keys(text.chars().map(KeyEvent::Printable));
    }

    /// Queues a resize event that changes the geometry once read.
    pub fn push_resize(&mut self, rows: u16, cols: u16) {
        self.keys.push_back((KeyEvent::Resize, Some((rows, cols))));
    }

    /// Shrinks the writable area without changing the reported geometry.
    pub fn shrink_behind_the_scenes(&mut self, rows: u16, cols: u16) {
        self.actual = (rows, cols);
    }

    pub fn pending_keys(&self) -> usize {
        self.keys.len()
    }

    /// Text of a screen line with trailing blanks removed.
    pub fn line(&self, row: u16) -> String {
        self.grid
            .get(row as usize)
            .map(|cells| cells.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn style_at(&self, row: u16, col: u16) -> CellStyle {
        self.styles[row as usize][col as usize]
    }

    fn resize(&mut self, rows: u16, cols: u16) {
        self.rows = rows;
        self.cols = cols;
        self.actual = (rows, cols);
        self.grid = vec![vec![' '; cols as usize]; rows as usize];
        self.styles = vec![vec![CellStyle::default(); cols as usize]; rows as usize];
    }
}

impl TerminalSession for FakeSession {
    fn geometry(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn read_key(&mut self) -> Result<KeyEvent, ViewError> {
        let (key, resize) = self.keys.pop_front().expect("key script exhausted");
        if let Some((rows, cols)) = resize {
            self.resize(rows, cols);
        }
        Ok(key)
    }

    fn write(&mut self, row: u16, col: u16, text: &str, style: CellStyle) -> Result<(), ViewError> {
        let (rows, cols) = self.actual;
        if row >= rows || col >= cols || row >= self.rows || col >= self.cols {
            return Err(ViewError::OutOfBounds { row, col });
        }
        for (offset, chr) in text.chars().enumerate() {
            let x = col as usize + offset;
            if x >= cols.min(self.cols) as usize {
                break;
            }
            self.grid[row as usize][x] = chr;
            self.styles[row as usize][x] = style;
        }
        Ok(())
    }

    fn clear_from(&mut self, row: u16, col: u16) {
        for y in row as usize..self.rows as usize {
            let start = if y == row as usize { col as usize } else { 0 };
            for x in start..self.cols as usize {
                self.grid[y][x] = ' ';
                self.styles[y][x] = CellStyle::default();
            }
        }
    }

    fn clear_all(&mut self) {
        self.clear_from(0, 0);
    }

    fn init_color_pair(&mut self, pair: u16, fg: ColorId, bg: ColorId) {
        self.pairs.insert(pair, (fg, bg));
    }

    fn refresh(&mut self) -> Result<(), ViewError> {
        self.refreshes += 1;
        Ok(())
    }

    fn yield_screen(&mut self) -> Result<(), ViewError> {
        self.yields += 1;
        Ok(())
    }

    fn restore_screen(&mut self) -> Result<(), ViewError> {
        self.restores += 1;
        self.clear_all();
        Ok(())
    }
}

pub fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
