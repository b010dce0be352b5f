use crate::stream::PullStream;
use connectors::error::StreamError;
use model::records::row::RowData;
use tracing::{info, warn};

/// Running mean of a numeric column. NULLs, missing columns and values that
/// are not numbers are counted as skipped and do not contribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Average {
    pub count: u64,
    pub sum: f64,
    pub skipped: u64,
}

impl Average {
    pub fn push(&mut self, row: &RowData, column: &str) {
        match row.get(column).and_then(|field| field.value.as_f64()) {
            Some(value) => {
                self.count += 1;
                self.sum += value;
            }
            None => {
                self.skipped += 1;
                warn!(column, entity = row.entity(), "Skipping non-numeric value");
            }
        }
    }

    /// `None` when no numeric value was seen.
    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

/// Consumes `rows` to the end, one row at a time, and averages `column`.
/// Memory use is constant in the number of rows.
pub async fn average<S>(rows: &mut S, column: &str) -> Result<Average, StreamError>
where
    S: PullStream<Item = RowData>,
{
    let mut avg = Average::default();
    while let Some(row) = rows.next().await? {
        avg.push(&row, column);
    }

    info!(column, count = avg.count, skipped = avg.skipped, "Average computed");
    Ok(avg)
}
