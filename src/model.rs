use std::cmp::Ordering;
use tracing::{debug, trace};

use crate::table::{RowContainer, RowModel};

/// Header cell of the row number column.
pub const ROW_NUMBER_HEADER: &str = "#";

/// A subrow given to [`TableModel::add_row`]: its cells and payload.
pub type Subrow<P> = (Vec<String>, Option<P>);

/// The whole table state: header, rows and the view settings that select and
/// number them. Pure data, no terminal access.
#[derive(Debug)]
pub struct TableModel<P> {
    header: Vec<String>,
    rows: RowModel<P>,
    row_numbers: bool,
    subrows_visible: bool,
    current_filter: Option<String>,
    current_search: Option<String>,
    current_page: usize,
    // Moved by the arrow keys while a prompt is open. Nothing reads it for drawing.
    row_offset: usize,
}

impl<P> Default for TableModel<P> {
    fn default() -> Self {
        TableModel {
            header: Vec::new(),
            rows: RowModel::default(),
            row_numbers: false,
            subrows_visible: false,
            current_filter: None,
            current_search: None,
            current_page: 1,
            row_offset: 0,
        }
    }
}

impl<P> TableModel<P> {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Header without the row number column.
    pub fn data_headers(&self) -> &[String] {
        if self.row_numbers && !self.header.is_empty() {
            &self.header[1..]
        } else {
            &self.header
        }
    }

    pub fn rows(&self) -> &RowModel<P> {
        &self.rows
    }

    pub fn row_numbers_enabled(&self) -> bool {
        self.row_numbers
    }

    pub fn subrows_visible(&self) -> bool {
        self.subrows_visible
    }

    pub fn current_filter(&self) -> Option<&str> {
        self.current_filter.as_deref()
    }

    pub fn current_search(&self) -> Option<&str> {
        self.current_search.as_deref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    pub fn add_header<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header.extend(columns.into_iter().map(Into::into));
    }

    /// Appends a top-level row immediately followed by its subrows.
    pub fn add_row(&mut self, mut cells: Vec<String>, payload: Option<P>, subrows: Vec<Subrow<P>>) {
        if self.row_numbers {
            let number = if self.subrows_visible {
                self.rows.len() + 1
            } else {
                self.rows.parents().len() + 1
            };
            cells.insert(0, number.to_string());
        }
        let parent = self.rows.push_row(cells, payload);

        for (mut sub_cells, sub_payload) in subrows {
            if self.row_numbers {
                let number = if self.subrows_visible {
                    (self.rows.len() + 1).to_string()
                } else {
                    String::new()
                };
                sub_cells.insert(0, number);
            }
            self.rows.push_subrow(parent, sub_cells, sub_payload);
        }
    }

    /// Row `index` of the active rows with its payload.
    pub fn get_row(&mut self, index: usize) -> Option<(&[String], Option<&P>)> {
        let idx = *self.active_rows().get(index)?;
        self.rows
            .get(idx)
            .map(|row| (row.cells.as_slice(), row.payload.as_ref()))
    }

    pub fn get_rows(&mut self) -> Vec<&RowContainer<P>> {
        let active = self.active_rows();
        active.iter().filter_map(|&idx| self.rows.get(idx)).collect()
    }

    /// Drops header and rows, resets page, filter and search. Numbering stays enabled.
    pub fn clear(&mut self) {
        self.header.clear();
        if self.row_numbers {
            self.header.push(ROW_NUMBER_HEADER.to_string());
        }
        self.rows.clear();
        self.current_page = 1;
        self.current_filter = None;
        self.current_search = None;
    }

    pub fn enable_row_numbers(&mut self) {
        if self.row_numbers {
            return;
        }
        self.row_numbers = true;
        self.header.insert(0, ROW_NUMBER_HEADER.to_string());
        for row in self.rows.iter_mut() {
            row.cells.insert(0, String::new());
        }
        self.number_rows();
    }

    pub fn disable_row_numbers(&mut self) {
        if !self.row_numbers {
            return;
        }
        self.row_numbers = false;
        if !self.header.is_empty() {
            self.header.remove(0);
        }
        for row in self.rows.iter_mut() {
            if !row.cells.is_empty() {
                row.cells.remove(0);
            }
        }
    }

    pub fn toggle_subrows(&mut self) {
        self.subrows_visible = !self.subrows_visible;
        debug!("Subrows visible: {}", self.subrows_visible);
        if self.row_numbers {
            self.number_rows();
        }
    }

    // Numbers every row in display order, ignoring the filter.
    fn number_rows(&mut self) {
        if self.subrows_visible {
            let order = self.rows.order().to_vec();
            self.write_numbers(&order);
        } else {
            let parents = self.rows.parents();
            self.write_numbers(&parents);
            for idx in self.rows.subrows() {
                if let Some(first) = self.rows.get_mut(idx).and_then(|r| r.cells.first_mut()) {
                    first.clear();
                }
            }
        }
    }

    fn write_numbers(&mut self, indices: &[usize]) {
        for (pos, &idx) in indices.iter().enumerate() {
            if let Some(first) = self.rows.get_mut(idx).and_then(|r| r.cells.first_mut()) {
                *first = (pos + 1).to_string();
            }
        }
    }

    // The row number cell is rewritten on every filter pass, so it never takes
    // part in matching.
    fn first_data_cell(&self) -> usize {
        usize::from(self.row_numbers)
    }

    /// Arena indices of the rows eligible for display, in display order.
    ///
    /// With a filter set and numbering enabled the surviving rows are
    /// renumbered densely in place. Only data cells are matched.
    pub fn active_rows(&mut self) -> Vec<usize> {
        let candidates = if self.subrows_visible {
            self.rows.order().to_vec()
        } else {
            self.rows.parents()
        };

        let Some(filter) = &self.current_filter else {
            return candidates;
        };
        let needle = filter.to_lowercase();
        let first_cell = self.first_data_cell();

        let mut active = Vec::with_capacity(candidates.len());
        for idx in candidates {
            let Some(row) = self.rows.get_mut(idx) else {
                continue;
            };
            if row.combined_text(first_cell).to_lowercase().contains(&needle) {
                active.push(idx);
                if self.row_numbers
                    && let Some(first) = row.cells.first_mut()
                {
                    *first = active.len().to_string();
                }
            }
        }
        active
    }

    pub fn renumber_active_rows(&mut self) {
        let active = self.active_rows();
        self.write_numbers(&active);
    }

    pub fn active_row_count(&mut self) -> usize {
        self.active_rows().len()
    }

    /// Sets the live filter. Blank terms clear it. Returns to the first page.
    pub fn set_filter(&mut self, filter: Option<String>) {
        self.current_filter = filter.filter(|f| !f.trim().is_empty());
        self.current_page = 1;
        debug!("Filter set to {:?}", self.current_filter);
    }

    /// Sets the search highlight. Blank terms clear it.
    pub fn set_search(&mut self, search: Option<String>) {
        self.current_search = search.filter(|s| !s.trim().is_empty());
        debug!("Search set to {:?}", self.current_search);
    }

    pub fn matches_search(&self, row: &RowContainer<P>) -> bool {
        match &self.current_search {
            Some(search) => row
                .combined_text(self.first_data_cell())
                .to_lowercase()
                .contains(&search.to_lowercase()),
            None => false,
        }
    }

    /// Sorts by `column` (an index into the cells, row number column included).
    ///
    /// Numeric when every row's cell parses as a number (empty is 0), otherwise
    /// alphabetic. A parent and its subrows always move as one block.
    pub fn sort(&mut self, column: usize, reverse: bool) {
        let numeric: Option<Vec<f64>> = (0..self.rows.len())
            .map(|idx| {
                self.rows
                    .get(idx)
                    .and_then(|row| Self::parse_numeric(row.cell(column)))
            })
            .collect();
        debug!(
            "Sorting column {column} ({}), reverse: {reverse}",
            if numeric.is_some() { "numeric" } else { "alphabetic" }
        );

        let rows = &self.rows;
        let block_of = |idx: usize| rows.get(idx).and_then(|r| r.parent()).unwrap_or(idx);
        let origin_of = |idx: usize| rows.get(idx).map(|r| r.origin_index()).unwrap_or(0);
        let within_block = |idx: usize| match rows.get(idx) {
            Some(row) if row.is_subrow() => row.origin_index() + 1,
            _ => 0,
        };
        let compare_blocks = |a: usize, b: usize| -> Ordering {
            let by_value = match &numeric {
                Some(values) => values[a].total_cmp(&values[b]),
                None => {
                    let text = |idx: usize| rows.get(idx).map(|r| r.cell(column)).unwrap_or("");
                    text(a).cmp(text(b))
                }
            };
            by_value.then_with(|| origin_of(a).cmp(&origin_of(b)))
        };

        let mut order = rows.order().to_vec();
        order.sort_by(|&a, &b| {
            let mut ordering = compare_blocks(block_of(a), block_of(b));
            if reverse {
                ordering = ordering.reverse();
            }
            ordering.then_with(|| within_block(a).cmp(&within_block(b)))
        });
        trace!("New row order {:?}", order);
        self.rows.set_order(order);
    }

    fn parse_numeric(cell: &str) -> Option<f64> {
        let value = cell.trim();
        if value.is_empty() {
            return Some(0.0);
        }
        value.parse::<f64>().ok()
    }

    pub fn total_pages(&mut self, rows_per_page: usize) -> usize {
        self.active_row_count().div_ceil(rows_per_page.max(1))
    }

    /// Moves `delta` pages, clamped to the available pages.
    pub fn move_page(&mut self, delta: i32, rows_per_page: usize) {
        let total = self.total_pages(rows_per_page);
        if delta < 0 && self.current_page > 1 {
            self.current_page = self
                .current_page
                .saturating_sub(delta.unsigned_abs() as usize)
                .max(1);
        } else if delta > 0 && self.current_page < total {
            self.current_page = (self.current_page + delta as usize).min(total);
        }
        debug!("Page {}/{}", self.current_page, total);
    }

    /// Moves the arrow-key scroll counter within the active rows.
    pub fn scroll(&mut self, delta: i32) {
        let active = self.active_row_count();
        if delta > 0 && self.row_offset + 1 < active {
            self.row_offset += 1;
        } else if delta < 0 && self.row_offset > 0 {
            self.row_offset -= 1;
        }
        trace!("Row offset {}", self.row_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn firsts(model: &mut TableModel<u32>, column: usize) -> Vec<String> {
        model
            .get_rows()
            .iter()
            .map(|r| r.cell(column).to_string())
            .collect()
    }

    fn flat(model: &TableModel<u32>, column: usize) -> Vec<String> {
        model
            .rows()
            .in_display_order()
            .map(|r| r.cell(column).to_string())
            .collect()
    }

    fn issue_model() -> TableModel<u32> {
        let mut model = TableModel::default();
        model.add_header(["Key", "Points"]);
        model.add_row(
            cells(&["A", "5"]),
            Some(1),
            vec![(cells(&["A.1", "9"]), Some(11)), (cells(&["A.2", "1"]), Some(12))],
        );
        model.add_row(cells(&["B", "2"]), Some(2), vec![]);
        model.add_row(cells(&["C", "5"]), Some(3), vec![(cells(&["C.1", "0"]), Some(31))]);
        model
    }

    fn assert_blocks_intact(model: &TableModel<u32>) {
        let order = model.rows().order().to_vec();
        for (pos, &idx) in order.iter().enumerate() {
            let row = model.rows().get(idx).unwrap();
            if let Some(parent) = row.parent() {
                let before = &order[..pos];
                let parent_pos = before.iter().rposition(|&i| !model.rows().get(i).unwrap().is_subrow());
                assert_eq!(parent_pos.map(|p| order[p]), Some(parent));
            }
        }
    }

    #[test]
    fn numbered_rows_end_to_end() {
        let mut model: TableModel<u32> = TableModel::default();
        model.add_header(["Key", "Summary", "Status"]);
        model.enable_row_numbers();
        model.add_row(cells(&["EPM-1", "Fix login", "Open"]), None, vec![]);
        model.add_row(cells(&["EPM-2", "Add logout", "Done"]), None, vec![]);

        assert_eq!(model.header(), cells(&["#", "Key", "Summary", "Status"]).as_slice());
        let rows = model.get_rows();
        assert_eq!(rows[0].cells, cells(&["1", "EPM-1", "Fix login", "Open"]));
        assert_eq!(rows[1].cells, cells(&["2", "EPM-2", "Add logout", "Done"]));
    }

    #[test]
    fn toggling_subrows_exposes_and_numbers_them() {
        let mut model: TableModel<u32> = TableModel::default();
        model.add_header(["Key", "Summary", "Status"]);
        model.enable_row_numbers();
        model.add_row(
            cells(&["EPM-3", "Refactor", "Open"]),
            None,
            vec![(cells(&["EPM-3.1", "sub task", "Open"]), None)],
        );
        assert_eq!(model.get_rows().len(), 1);
        let sub = model.rows().subrows()[0];
        assert_eq!(model.rows().get(sub).unwrap().cell(0), "");

        model.toggle_subrows();
        assert_eq!(model.get_rows().len(), 2);
        assert_eq!(model.rows().get(sub).unwrap().cell(0), "2");

        model.toggle_subrows();
        assert_eq!(model.rows().get(sub).unwrap().cell(0), "");
    }

    #[test]
    fn subrows_follow_their_parent_after_insertion() {
        let model = issue_model();
        assert_eq!(flat(&model, 0), cells(&["A", "A.1", "A.2", "B", "C", "C.1"]));
        assert_blocks_intact(&model);
    }

    #[test]
    fn numeric_sort_moves_blocks_together() {
        let mut model = issue_model();
        model.sort(1, false);
        assert_eq!(flat(&model, 0), cells(&["B", "A", "A.1", "A.2", "C", "C.1"]));
        assert_blocks_intact(&model);
    }

    #[test]
    fn reverse_sort_keeps_parent_first_within_block() {
        let mut model = issue_model();
        model.sort(1, true);
        assert_eq!(flat(&model, 0), cells(&["C", "C.1", "A", "A.1", "A.2", "B"]));
        assert_blocks_intact(&model);
    }

    #[test]
    fn non_numeric_cell_falls_back_to_alphabetic() {
        let mut model: TableModel<u32> = TableModel::default();
        model.add_row(cells(&["10"]), None, vec![]);
        model.add_row(cells(&["9"]), None, vec![]);
        model.add_row(cells(&["x"]), None, vec![]);
        model.sort(0, false);
        // numerically 9 < 10, alphabetically "10" < "9"
        assert_eq!(flat(&model, 0), cells(&["10", "9", "x"]));

        let mut numeric: TableModel<u32> = TableModel::default();
        numeric.add_row(cells(&["10"]), None, vec![]);
        numeric.add_row(cells(&["9"]), None, vec![]);
        numeric.add_row(cells(&[""]), None, vec![]);
        numeric.sort(0, false);
        assert_eq!(flat(&numeric, 0), cells(&["", "9", "10"]));
    }

    #[test]
    fn sorting_twice_is_stable_under_ties() {
        let mut model = issue_model();
        model.sort(1, true);
        let once = model.rows().order().to_vec();
        model.sort(1, true);
        assert_eq!(model.rows().order(), once.as_slice());

        model.sort(1, false);
        let forward = model.rows().order().to_vec();
        model.sort(1, false);
        assert_eq!(model.rows().order(), forward.as_slice());
    }

    #[test]
    fn filter_ignores_hidden_subrows() {
        let mut model = issue_model();
        model.set_filter(Some("A.1".to_string()));
        assert!(model.get_rows().is_empty());

        model.toggle_subrows();
        assert_eq!(firsts(&mut model, 0), cells(&["A.1"]));
    }

    #[test]
    fn filter_is_case_insensitive_and_renumbers_densely() {
        let mut model = issue_model();
        model.enable_row_numbers();
        model.toggle_subrows();
        model.set_filter(Some("c".to_string()));
        let rows = model.get_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells, cells(&["1", "C", "5"]));
        assert_eq!(rows[1].cells, cells(&["2", "C.1", "0"]));
    }

    #[test]
    fn row_numbers_never_match_the_filter() {
        let mut model: TableModel<u32> = TableModel::default();
        model.add_header(["Key"]);
        model.enable_row_numbers();
        for key in ["a", "b", "c2"] {
            model.add_row(cells(&[key]), None, vec![]);
        }
        model.set_filter(Some("2".to_string()));

        let first: Vec<Vec<String>> = model.get_rows().iter().map(|r| r.cells.clone()).collect();
        let second: Vec<Vec<String>> = model.get_rows().iter().map(|r| r.cells.clone()).collect();
        assert_eq!(first, vec![cells(&["1", "c2"])]);
        assert_eq!(second, first);
    }

    #[test]
    fn search_ignores_row_numbers() {
        let mut model = issue_model();
        model.enable_row_numbers();
        model.set_search(Some("3".to_string()));
        let flagged: Vec<bool> = model
            .active_rows()
            .into_iter()
            .map(|idx| model.matches_search(model.rows().get(idx).unwrap()))
            .collect();
        assert_eq!(flagged, vec![false, false, false]);
    }

    #[test]
    fn blank_filter_clears() {
        let mut model = issue_model();
        model.set_filter(Some("   ".to_string()));
        assert_eq!(model.current_filter(), None);
        assert_eq!(model.get_rows().len(), 3);
    }

    #[test]
    fn disabling_and_enabling_numbers_round_trips() {
        let mut model = issue_model();
        model.enable_row_numbers();
        let header = model.header().to_vec();
        let numbers = flat(&model, 0);

        model.disable_row_numbers();
        assert_eq!(model.header(), cells(&["Key", "Points"]).as_slice());
        assert_eq!(flat(&model, 0), cells(&["A", "A.1", "A.2", "B", "C", "C.1"]));

        model.enable_row_numbers();
        assert_eq!(model.header(), header.as_slice());
        assert_eq!(flat(&model, 0), numbers);
        assert_eq!(numbers, cells(&["1", "", "", "2", "3", ""]));
    }

    #[test]
    fn enabling_numbers_twice_is_idempotent() {
        let mut model = issue_model();
        model.enable_row_numbers();
        model.enable_row_numbers();
        assert_eq!(model.header(), cells(&["#", "Key", "Points"]).as_slice());
        assert_eq!(model.rows().get(0).unwrap().cells.len(), 3);
    }

    #[test]
    fn search_flags_without_removing() {
        let mut model = issue_model();
        model.set_search(Some("b".to_string()));
        assert_eq!(model.get_rows().len(), 3);
        let flagged: Vec<bool> = model
            .active_rows()
            .into_iter()
            .map(|idx| model.matches_search(model.rows().get(idx).unwrap()))
            .collect();
        assert_eq!(flagged, vec![false, true, false]);
    }

    #[test]
    fn clear_keeps_numbering_header() {
        let mut model = issue_model();
        model.enable_row_numbers();
        model.set_filter(Some("a".to_string()));
        model.clear();
        assert_eq!(model.header(), cells(&["#"]).as_slice());
        assert!(model.rows().is_empty());
        assert_eq!(model.current_filter(), None);
        assert_eq!(model.current_page(), 1);
    }

    #[test]
    fn paging_clamps_to_available_pages() {
        let mut model: TableModel<u32> = TableModel::default();
        for i in 0..7 {
            model.add_row(cells(&[&i.to_string()]), None, vec![]);
        }
        assert_eq!(model.total_pages(3), 3);
        model.move_page(-1, 3);
        assert_eq!(model.current_page(), 1);
        model.move_page(1, 3);
        model.move_page(1, 3);
        model.move_page(1, 3);
        assert_eq!(model.current_page(), 3);
    }

    #[test]
    fn get_row_returns_payload_of_active_row() {
        let mut model = issue_model();
        let (row, payload) = model.get_row(1).unwrap();
        assert_eq!(row[0], "B");
        assert_eq!(payload, Some(&2));
        assert!(model.get_row(3).is_none());
    }

    #[test]
    fn scroll_counter_is_bounded() {
        let mut model = issue_model();
        model.scroll(-1);
        assert_eq!(model.row_offset(), 0);
        for _ in 0..5 {
            model.scroll(1);
        }
        assert_eq!(model.row_offset(), 2);
    }

    #[test]
    fn alphabetic_sort_groups_subrows_with_their_parent() {
        let mut model: TableModel<u32> = TableModel::default();
        model.add_header(["Key", "Owner"]);
        model.add_row(cells(&["X", "bob"]), None, vec![(cells(&["X.1", "zed"]), None)]);
        model.add_row(
            cells(&["Y", "alice"]),
            None,
            vec![(cells(&["Y.1", "aaron"]), None), (cells(&["Y.2", "mia"]), None)],
        );
        model.add_row(cells(&["Z", "bob"]), None, vec![]);

        model.sort(1, false);
        assert_eq!(flat(&model, 0), cells(&["Y", "Y.1", "Y.2", "X", "X.1", "Z"]));
        assert_blocks_intact(&model);

        model.sort(1, true);
        assert_eq!(flat(&model, 0), cells(&["Z", "X", "X.1", "Y", "Y.1", "Y.2"]));
        assert_blocks_intact(&model);
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        // (parent value, subrow count) per row. Values are single characters so
        // numeric and alphabetic order agree.
        fn build(rows: &[(u8, usize)], alphabetic: bool) -> TableModel<u32> {
            let value = |v: u8| {
                if alphabetic {
                    char::from(b'a' + v).to_string()
                } else {
                    v.to_string()
                }
            };
            let mut model = TableModel::default();
            model.add_header(["Key", "Value"]);
            for (i, &(v, subs)) in rows.iter().enumerate() {
                let subrows = (0..subs)
                    .map(|s| (vec![format!("r{i}.{s}"), value(3 - s as u8)], None))
                    .collect();
                model.add_row(vec![format!("r{i}"), value(v)], None, subrows);
            }
            model
        }

        fn parent_values(model: &TableModel<u32>, column: usize) -> Vec<String> {
            model
                .rows()
                .in_display_order()
                .filter(|r| !r.is_subrow())
                .map(|r| r.cell(column).to_string())
                .collect()
        }

        fn rows_strategy() -> impl Strategy<Value = Vec<(u8, usize)>> {
            prop::collection::vec((0u8..4, 0usize..3), 0..12)
        }

        proptest! {
            #[test]
            fn blocks_stay_intact_through_inserts_and_sorts(
                rows in rows_strategy(),
                alphabetic in any::<bool>(),
                reverse in any::<bool>()
            ) {
                let mut model = build(&rows, alphabetic);
                assert_blocks_intact(&model);

                model.sort(1, reverse);
                assert_blocks_intact(&model);
                let values = parent_values(&model, 1);
                let mut expected = values.clone();
                expected.sort();
                if reverse {
                    expected.reverse();
                }
                prop_assert_eq!(values, expected);
            }

            #[test]
            fn sorting_again_keeps_the_order(
                rows in rows_strategy(),
                alphabetic in any::<bool>(),
                column in 0usize..2,
                reverse in any::<bool>()
            ) {
                let mut model = build(&rows, alphabetic);
                model.sort(column, reverse);
                let once = model.rows().order().to_vec();
                model.sort(column, reverse);
                prop_assert_eq!(model.rows().order(), once.as_slice());
            }

            #[test]
            fn filtered_rows_are_numbered_densely(
                rows in rows_strategy(),
                alphabetic in any::<bool>(),
                show_subrows in any::<bool>(),
                needle in "[0-3a-d.]"
            ) {
                let mut model = build(&rows, alphabetic);
                model.enable_row_numbers();
                if show_subrows {
                    model.toggle_subrows();
                }
                model.set_filter(Some(needle.clone()));

                let active = model.get_rows();
                let numbers: Vec<String> = active.iter().map(|r| r.cell(0).to_string()).collect();
                let expected: Vec<String> = (1..=active.len()).map(|n| n.to_string()).collect();
                prop_assert_eq!(numbers, expected);
                for row in &active {
                    prop_assert!(row.combined_text(1).contains(&needle));
                }
            }
        }
    }
}
