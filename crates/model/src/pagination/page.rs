use crate::{pagination::cursor::PageCursor, records::row::RowData};

/// Rows returned by one bounded `LIMIT/OFFSET` query.
#[derive(Debug, Clone)]
pub struct Page {
    pub cursor: PageCursor, // cursor this page was fetched at
    pub rows: Vec<RowData>,
    pub took_ms: u128, // time spent fetching the page
}

impl Page {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resume-from cursor. A short page does not mean the table is exhausted,
    /// so this always points past the full page size. `None` when the next
    /// offset would overflow.
    pub fn next_cursor(&self) -> Option<PageCursor> {
        self.cursor.advance()
    }
}
