//! Script flattener
//!
//! Joins a notebook's code cells into one Python buffer, keeping a map from
//! buffer lines back to the cell they came from for diagnostics.

/// Lines `[start_line, end_line]` (0-indexed, inclusive) of the buffer that came from one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub cell_index: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// A flattened notebook
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatScript {
    pub source: String,
    pub cells: Vec<CellRange>,
}

impl FlatScript {
    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Cell that produced the given 0-indexed buffer line
    pub fn cell_for_line(&self, line: usize) -> Option<usize> {
        self.cells
            .iter()
            .find(|range| range.start_line <= line && line <= range.end_line)
            .map(|range| range.cell_index)
    }
}

/// Concatenate code cells in order, separated by a newline
pub fn flatten<S: AsRef<str>>(cells: &[S]) -> FlatScript {
    let mut source = String::new();
    let mut ranges = Vec::with_capacity(cells.len());
    let mut line = 0;

    for (cell_index, cell) in cells.iter().enumerate() {
        let cell = cell.as_ref();
        if cell_index > 0 {
            source.push('\n');
        }
        source.push_str(cell);

        let newlines = cell.matches('\n').count();
        ranges.push(CellRange {
            cell_index,
            start_line: line,
            end_line: line + newlines,
        });
        line += newlines + 1;
    }

    FlatScript {
        source,
        cells: ranges,
    }
}
