//! An in-process row source over a fixed set of rows.
//!
//! Used by tests and by the CLI's `memory:` URLs. The SQL text of a query is
//! not interpreted: every query returns the whole table, restricted to the
//! query's bounds when it has any. Faults can be injected to exercise the
//! error paths of the streams, and [`SourceStats`] records every cursor that
//! is opened and closed.

use crate::{
    error::StreamError,
    sql::base::{
        query::Query,
        source::{RowCursor, RowSource},
    },
};
use async_trait::async_trait;
use model::records::row::RowData;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing::{debug, info};

/// Failures the source should simulate.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// `open` fails as if the store were down.
    pub unreachable: bool,
    /// `open` rejects any query whose SQL contains this text.
    pub reject_sql_containing: Option<String>,
    /// Each cursor yields this many rows, then fails the next fetch.
    pub fail_after: Option<usize>,
}

#[derive(Debug, Default)]
pub struct SourceStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl SourceStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cursors opened but not yet released.
    pub fn open_cursors(&self) -> usize {
        self.opened() - self.closed()
    }
}

#[derive(Clone)]
pub struct MemoryRowSource {
    name: String,
    rows: Arc<Vec<RowData>>,
    faults: Faults,
    stats: Arc<SourceStats>,
}

impl MemoryRowSource {
    pub fn new(name: &str, rows: Vec<RowData>) -> Self {
        MemoryRowSource {
            name: name.to_string(),
            rows: Arc::new(rows),
            faults: Faults::default(),
            stats: Arc::new(SourceStats::default()),
        }
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn stats(&self) -> Arc<SourceStats> {
        self.stats.clone()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RowSource for MemoryRowSource {
    async fn open(&self, query: &Query) -> Result<Box<dyn RowCursor>, StreamError> {
        info!(source = %self.name, sql = %query.sql, bounds = ?query.bounds, "Executing query");

        if self.faults.unreachable {
            return Err(StreamError::connection(&self.name, "store unreachable"));
        }
        if let Some(pattern) = &self.faults.reject_sql_containing
            && query.sql.contains(pattern.as_str())
        {
            return Err(StreamError::query(&query.sql, format!("syntax error near '{pattern}'")));
        }

        let (start, end) = match query.bounds {
            Some(cursor) => {
                let start = cursor.offset.min(self.rows.len());
                let end = cursor.offset.saturating_add(cursor.page_size).min(self.rows.len());
                (start, end)
            }
            None => (0, self.rows.len()),
        };

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            rows: self.rows.clone(),
            position: start,
            end,
            fail_after: self.faults.fail_after,
            rows_read: 0,
            closed: false,
            stats: self.stats.clone(),
        }))
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

pub struct MemoryCursor {
    rows: Arc<Vec<RowData>>,
    position: usize,
    end: usize,
    fail_after: Option<usize>,
    rows_read: usize,
    closed: bool,
    stats: Arc<SourceStats>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    async fn next(&mut self) -> Result<Option<RowData>, StreamError> {
        if self.closed {
            return Ok(None);
        }

        if self.fail_after.is_some_and(|limit| self.rows_read >= limit) {
            let rows_read = self.rows_read;
            self.close();
            return Err(StreamError::fetch(rows_read, "connection reset by peer"));
        }

        if self.position >= self.end {
            self.close();
            return Ok(None);
        }

        let row = self.rows[self.position].clone();
        self.position += 1;
        self.rows_read += 1;
        Ok(Some(row))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        debug!(rows_read = self.rows_read, "Cursor closed");
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::base::source::CursorGuard;
    use model::{
        core::value::{FieldValue, Value},
        pagination::cursor::PageCursor,
    };
    use tracing_test::traced_test;

    fn rows(n: i64) -> Vec<RowData> {
        (1..=n)
            .map(|id| RowData::new("t", vec![FieldValue::new("id", Value::Int(id))]))
            .collect()
    }

    fn ids(rows: &[RowData]) -> Vec<Value> {
        rows.iter().map(|r| r.get_value("id")).collect()
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let source = MemoryRowSource::new("t", rows(2));
        let mut cursor = source.open(&Query::new("t", "SELECT * FROM t")).await.unwrap();

        cursor.close();
        cursor.close();
        cursor.close();

        assert!(cursor.is_closed());
        assert_eq!(source.stats().closed(), 1);
        assert!(cursor.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cursor_closes_itself_on_exhaustion() {
        let source = MemoryRowSource::new("t", rows(1));
        let mut cursor = source.open(&Query::new("t", "SELECT * FROM t")).await.unwrap();

        assert!(cursor.next().await.unwrap().is_some());
        assert!(cursor.next().await.unwrap().is_none());
        assert!(cursor.is_closed());
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_closes_cursor() {
        let source = MemoryRowSource::new("t", rows(3)).with_faults(Faults {
            fail_after: Some(1),
            ..Faults::default()
        });
        let mut cursor = source.open(&Query::new("t", "SELECT * FROM t")).await.unwrap();

        assert!(cursor.next().await.unwrap().is_some());
        let err = cursor.next().await.unwrap_err();
        assert!(matches!(err, StreamError::Fetch { rows_read: 1, .. }));
        assert!(cursor.is_closed());

        cursor.close();
        assert_eq!(source.stats().closed(), 1);
    }

    #[tokio::test]
    async fn test_open_errors_are_typed() {
        let down = MemoryRowSource::new("t", rows(1)).with_faults(Faults {
            unreachable: true,
            ..Faults::default()
        });
        assert!(matches!(
            down.open(&Query::new("t", "SELECT 1")).await,
            Err(StreamError::Connection { .. })
        ));

        let strict = MemoryRowSource::new("t", rows(1)).with_faults(Faults {
            reject_sql_containing: Some("SELEC ".into()),
            ..Faults::default()
        });
        assert!(matches!(
            strict.open(&Query::new("t", "SELEC * FROM t")).await,
            Err(StreamError::Query { .. })
        ));
        assert_eq!(strict.stats().opened(), 0);
    }

    #[tokio::test]
    async fn test_fetch_page_honours_bounds() {
        let source = MemoryRowSource::new("t", rows(5));
        let query = Query::table("t", Some("id"));

        let page = source.fetch_page(&query, PageCursor::at(4, 2)).await.unwrap();
        assert_eq!(ids(&page), vec![Value::Int(5)]);

        let past_end = source.fetch_page(&query, PageCursor::at(10, 2)).await.unwrap();
        assert!(past_end.is_empty());

        assert_eq!(source.stats().opened(), 2);
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_fetch_page_with_huge_page_size() {
        let source = MemoryRowSource::new("t", rows(3));
        let query = Query::table("t", Some("id"));

        let page = source
            .fetch_page(&query, PageCursor::first(usize::MAX / 2))
            .await
            .unwrap();
        assert_eq!(ids(&page), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        let tail = source
            .fetch_page(&query, PageCursor::at(1, usize::MAX))
            .await
            .unwrap();
        assert_eq!(ids(&tail), vec![Value::Int(2), Value::Int(3)]);
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_guard_closes_on_drop() {
        let source = MemoryRowSource::new("t", rows(3));
        {
            let mut guard = CursorGuard::new(source.open(&Query::new("t", "SELECT 1")).await.unwrap());
            assert!(guard.next().await.unwrap().is_some());
            assert_eq!(source.stats().open_cursors(), 1);
        }
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_ping() {
        let source = MemoryRowSource::new("t", rows(1));
        source.ping().await.unwrap();
        assert_eq!(source.stats().open_cursors(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_every_open_is_logged() {
        let source = MemoryRowSource::new("t", rows(3));
        source
            .fetch_page(&Query::table("t", Some("id")), PageCursor::at(2, 2))
            .await
            .unwrap();

        assert!(logs_contain("Executing query"));
        assert!(logs_contain("SELECT * FROM \"t\" ORDER BY \"id\""));
        assert!(logs_contain("Fetched page"));
    }
}
