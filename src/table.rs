/// One visual table row.
///
/// `cells` may carry a leading row number cell when numbering is enabled on the
/// owning model. The payload is never interpreted.
#[derive(Debug, Clone)]
pub struct RowContainer<P> {
    pub cells: Vec<String>,
    pub payload: Option<P>,
    origin_index: usize,
    parent: Option<usize>,
}

impl<P> RowContainer<P> {
    /// Insertion order tie-breaker. Subrows carry their parent's value.
    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    /// Arena index of the parent row, stable across sorting.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_subrow(&self) -> bool {
        self.parent.is_some()
    }

    pub fn cell(&self, column: usize) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }

    /// Cells from `first_cell` on, joined with a space, as matched by filter
    /// and search.
    pub fn combined_text(&self, first_cell: usize) -> String {
        self.cells.get(first_cell..).unwrap_or_default().join(" ")
    }
}

/// Rows in insertion order plus the current display order.
///
/// Sorting only permutes `order`; arena indices (and therefore parent links)
/// never move.
#[derive(Debug)]
pub struct RowModel<P> {
    rows: Vec<RowContainer<P>>,
    order: Vec<usize>,
}

impl<P> Default for RowModel<P> {
    fn default() -> Self {
        RowModel {
            rows: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<P> RowModel<P> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.order.clear();
    }

    pub fn get(&self, idx: usize) -> Option<&RowContainer<P>> {
        self.rows.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut RowContainer<P>> {
        self.rows.get_mut(idx)
    }

    /// Appends a top-level row, its origin index is the current row count.
    pub fn push_row(&mut self, cells: Vec<String>, payload: Option<P>) -> usize {
        let idx = self.rows.len();
        self.rows.push(RowContainer {
            cells,
            payload,
            origin_index: idx,
            parent: None,
        });
        self.order.push(idx);
        idx
    }

    /// Appends a subrow of `parent`, which must already be in the arena.
    pub fn push_subrow(&mut self, parent: usize, cells: Vec<String>, payload: Option<P>) -> usize {
        assert!(parent < self.rows.len(), "subrow parent {parent} does not exist");
        let idx = self.rows.len();
        let origin_index = self.rows[parent].origin_index;
        self.rows.push(RowContainer {
            cells,
            payload,
            origin_index,
            parent: Some(parent),
        });
        self.order.push(idx);
        idx
    }

    /// Arena indices in display order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn set_order(&mut self, order: Vec<usize>) {
        debug_assert_eq!(order.len(), self.rows.len());
        self.order = order;
    }

    /// Arena indices of top-level rows in display order.
    pub fn parents(&self) -> Vec<usize> {
        self.order
            .iter()
            .copied()
            .filter(|&idx| !self.rows[idx].is_subrow())
            .collect()
    }

    /// Arena indices of subrows in display order.
    pub fn subrows(&self) -> Vec<usize> {
        self.order
            .iter()
            .copied()
            .filter(|&idx| self.rows[idx].is_subrow())
            .collect()
    }

    pub fn in_display_order(&self) -> impl Iterator<Item = &RowContainer<P>> {
        self.order.iter().map(|&idx| &self.rows[idx])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RowContainer<P>> {
        self.rows.iter_mut()
    }
}
