//! Row-span reconstruction for HTML tables.
//!
//! A cell with `rowspan="n"` appears once in the markup but belongs to `n`
//! consecutive rows. [`SpanGrid`] walks the physical cells of each row and
//! yields one logical cell per column, reusing spanning cells for the rows
//! they cover.

/// A physical table cell that may span several rows.
pub trait SpanCell: Clone {
    /// Value of the `rowspan` attribute, 1 when absent or invalid.
    fn row_span(&self) -> usize;
}

impl SpanCell for scraper::ElementRef<'_> {
    fn row_span(&self) -> usize {
        self.value()
            .attr("rowspan")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone)]
struct Pending<C> {
    cell: C,
    remaining: usize,
}

/// Per-column countdown cache across the rows of one table.
///
/// `N` is the number of logical columns.
#[derive(Debug, Clone)]
pub struct SpanGrid<C, const N: usize> {
    pending: [Option<Pending<C>>; N],
}

impl<C: SpanCell, const N: usize> Default for SpanGrid<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: SpanCell, const N: usize> SpanGrid<C, N> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: std::array::from_fn(|_| None),
        }
    }

    /// Map one row of physical cells to `N` logical cells.
    ///
    /// Columns with a pending span reuse the cached cell and do not consume
    /// a physical cell. A column with no physical cell left yields `None`.
    pub fn next_row(&mut self, physical: &[C]) -> [Option<C>; N] {
        let mut cells = physical.iter();
        std::array::from_fn(|col| {
            let slot = &mut self.pending[col];
            if let Some(pending) = slot.as_mut() {
                let cell = pending.cell.clone();
                pending.remaining -= 1;
                if pending.remaining == 0 {
                    *slot = None;
                }
                return Some(cell);
            }
            let cell = cells.next()?.clone();
            let span = cell.row_span();
            if span > 1 {
                *slot = Some(Pending {
                    cell: cell.clone(),
                    remaining: span - 1,
                });
            }
            Some(cell)
        })
    }

    /// Number of further rows that will reuse the cell cached for `col`.
    #[must_use]
    pub fn remaining(&self, col: usize) -> usize {
        self.pending
            .get(col)
            .and_then(|p| p.as_ref())
            .map_or(0, |p| p.remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Stub(&'static str, usize);

    impl SpanCell for Stub {
        fn row_span(&self) -> usize {
            self.1
        }
    }

    fn names<const N: usize>(row: [Option<Stub>; N]) -> Vec<Option<&'static str>> {
        row.into_iter().map(|c| c.map(|s| s.0)).collect()
    }

    #[test]
    fn test_rowspan_three_reused_for_following_rows() {
        let mut grid: SpanGrid<Stub, 3> = SpanGrid::new();

        let row1 = grid.next_row(&[Stub("법률", 3), Stub("A", 1), Stub("과1", 1)]);
        assert_eq!(names(row1), vec![Some("법률"), Some("A"), Some("과1")]);
        assert_eq!(grid.remaining(0), 2);

        let row2 = grid.next_row(&[Stub("B", 1), Stub("과2", 1)]);
        assert_eq!(names(row2), vec![Some("법률"), Some("B"), Some("과2")]);
        assert_eq!(grid.remaining(0), 1);

        let row3 = grid.next_row(&[Stub("C", 1), Stub("과3", 1)]);
        assert_eq!(names(row3), vec![Some("법률"), Some("C"), Some("과3")]);
        assert_eq!(grid.remaining(0), 0);

        let row4 = grid.next_row(&[Stub("고시", 1), Stub("D", 1), Stub("과4", 1)]);
        assert_eq!(names(row4), vec![Some("고시"), Some("D"), Some("과4")]);
    }

    #[test]
    fn test_span_in_last_column() {
        let mut grid: SpanGrid<Stub, 3> = SpanGrid::new();
        grid.next_row(&[Stub("법률", 1), Stub("A", 1), Stub("과", 2)]);
        let row2 = grid.next_row(&[Stub("시행령", 1), Stub("B", 1)]);
        assert_eq!(names(row2), vec![Some("시행령"), Some("B"), Some("과")]);
    }

    #[test]
    fn test_short_row_yields_none() {
        let mut grid: SpanGrid<Stub, 3> = SpanGrid::new();
        let row = grid.next_row(&[Stub("법률", 1)]);
        assert_eq!(names(row), vec![Some("법률"), None, None]);
    }

    #[test]
    fn test_element_ref_row_span() {
        let html = scraper::Html::parse_fragment(
            r#"<table><tr><td rowspan="3">a</td><td rowspan="x">b</td><td>c</td></tr></table>"#,
        );
        let sel = scraper::Selector::parse("td").unwrap();
        let spans: Vec<usize> = html.select(&sel).map(|td| td.row_span()).collect();
        assert_eq!(spans, vec![3, 1, 1]);
    }
}
