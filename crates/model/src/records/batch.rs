use crate::records::row::RowData;

/// Consecutive rows grouped by a batch stream. Once yielded, the batch belongs
/// to the consumer; the producer keeps no reference to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub index: usize, // 0-based emission sequence number
    pub rows: Vec<RowData>,
}

impl Batch {
    pub fn new(index: usize, rows: Vec<RowData>) -> Self {
        Batch { index, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<RowData> {
        self.rows
    }
}
