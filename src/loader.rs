use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::domain::ViewError;
use crate::terminal::TerminalSession;
use crate::view::TableView;

/// Payload of a loaded row: where it came from in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRef {
    /// 1-based line number.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRow {
    pub cells: Vec<String>,
    pub source: RowRef,
    pub subrows: Vec<(Vec<String>, RowRef)>,
}

/// A delimited text table: a header line, then one row per line. Lines
/// indented with spaces are subrows of the row above them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedTable {
    pub header: Vec<String>,
    pub rows: Vec<LoadedRow>,
}

impl LoadedTable {
    pub fn read(path: &Path, delimiter: char) -> Result<Self, ViewError> {
        let metadata = fs::metadata(path).map_err(map_io_error)?;
        if !metadata.is_file() {
            return Err(ViewError::LoadingFailed("Not a file!".into()));
        }

        let start_time = Instant::now();
        let text = fs::read_to_string(path).map_err(map_io_error)?;
        let table = Self::parse(&text, delimiter)?;
        info!(
            "Loaded {} rows from {} in {}ms",
            table.rows.len(),
            path.display(),
            start_time.elapsed().as_millis()
        );
        Ok(table)
    }

    pub fn parse(text: &str, delimiter: char) -> Result<Self, ViewError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
        let Some((_, header)) = lines.next() else {
            return Err(ViewError::LoadingFailed("No header line".into()));
        };

        let mut table = LoadedTable {
            header: split_line(header, delimiter),
            rows: Vec::new(),
        };
        for (idx, line) in lines {
            let source = RowRef { line: idx + 1 };
            if !is_subrow_line(line, delimiter) {
                table.rows.push(LoadedRow {
                    cells: split_line(line, delimiter),
                    source,
                    subrows: Vec::new(),
                });
                continue;
            }
            let Some(parent) = table.rows.last_mut() else {
                return Err(ViewError::LoadingFailed(format!(
                    "Subrow on line {} has no parent",
                    source.line
                )));
            };
            let cells = split_line(line.trim_start_matches(' '), delimiter);
            parent.subrows.push((cells, source));
        }
        debug!("Parsed header {:?}", table.header);
        Ok(table)
    }

    /// Appends header and rows to `view`, each row carrying its [`RowRef`].
    pub fn fill<T: TerminalSession>(self, view: &mut TableView<T, RowRef>) {
        view.add_header(self.header);
        for row in self.rows {
            let subrows = row
                .subrows
                .into_iter()
                .map(|(cells, source)| (cells, Some(source)))
                .collect();
            view.add_row(row.cells, Some(row.source), subrows);
        }
    }
}

fn split_line(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|cell| cell.trim().to_string()).collect()
}

// Space indented lines are subrows, unless spaces delimit the cells.
fn is_subrow_line(line: &str, delimiter: char) -> bool {
    delimiter != ' ' && line.starts_with(' ')
}

fn map_io_error(e: std::io::Error) -> ViewError {
    match e.kind() {
        ErrorKind::NotFound => ViewError::FileNotFound,
        ErrorKind::PermissionDenied => ViewError::PermissionDenied,
        _ => ViewError::IoError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ViewConfig;
    use crate::test_support::FakeSession;
    use pretty_assertions::assert_eq;

    const ISSUES: &str =
        "Key\tSummary\tStatus\nEPM-1\tFix login\tOpen\n  EPM-1.1\tdb migration\tDone\n\nEPM-2\tAdd logout\tDone\n";

    #[test]
    fn parses_rows_and_indented_subrows() {
        let table = LoadedTable::parse(ISSUES, '\t').unwrap();
        assert_eq!(table.header, vec!["Key", "Summary", "Status"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].source, RowRef { line: 2 });
        assert_eq!(
            table.rows[0].subrows,
            vec![(
                vec!["EPM-1.1".to_string(), "db migration".to_string(), "Done".to_string()],
                RowRef { line: 3 }
            )]
        );
        assert_eq!(table.rows[1].cells, vec!["EPM-2", "Add logout", "Done"]);
        assert_eq!(table.rows[1].source, RowRef { line: 5 });
    }

    #[test]
    fn empty_input_and_orphan_subrows_fail() {
        assert!(matches!(LoadedTable::parse("\n\n", ','), Err(ViewError::LoadingFailed(_))));
        assert!(matches!(
            LoadedTable::parse("a,b\n  c,d\n", ','),
            Err(ViewError::LoadingFailed(msg)) if msg == "Subrow on line 2 has no parent"
        ));
    }

    #[test]
    fn space_delimited_lines_are_never_subrows() {
        let table = LoadedTable::parse("a b\n1 2\n 3 4\n", ' ').unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].cells, vec!["", "3", "4"]);
    }

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.tsv");
        assert!(matches!(LoadedTable::read(&missing, '\t'), Err(ViewError::FileNotFound)));
        assert!(matches!(LoadedTable::read(dir.path(), '\t'), Err(ViewError::LoadingFailed(_))));
    }

    #[test]
    fn fills_the_view_with_row_refs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, ISSUES.as_bytes()).unwrap();
        let table = LoadedTable::read(file.path(), '\t').unwrap();

        let mut view = TableView::new(FakeSession::new(12, 60), ViewConfig::default());
        table.fill(&mut view);
        view.toggle_subrows();
        let (cells, payload) = view.get_row(1).unwrap();
        assert_eq!(cells.to_vec(), vec!["EPM-1.1", "db migration", "Done"]);
        assert_eq!(payload, Some(&RowRef { line: 3 }));
    }
}
