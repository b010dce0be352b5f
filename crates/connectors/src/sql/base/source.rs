use crate::{error::StreamError, sql::base::query::Query};
use async_trait::async_trait;
use model::{pagination::cursor::PageCursor, records::row::RowData};
use tracing::debug;

// Cap on the up-front page allocation; larger pages grow as rows arrive.
const MAX_PAGE_PREALLOC: usize = 4096;

/// A forward-only cursor over the result of one query, bound 1:1 to a
/// connection.
///
/// After `next` returns an error the cursor has already released itself.
/// `close` must be safe to call any number of times.
#[async_trait]
pub trait RowCursor: Send {
    /// Next row, or `None` once the result is exhausted.
    async fn next(&mut self) -> Result<Option<RowData>, StreamError>;

    /// Releases the cursor and its connection.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// The storage collaborator behind every stream.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Connects and executes `query`, returning a cursor over its result.
    async fn open(&self, query: &Query) -> Result<Box<dyn RowCursor>, StreamError>;

    /// Fully materializes one bounded page of `query`. The cursor used for the
    /// page is closed before this returns, on success and on error alike.
    async fn fetch_page(
        &self,
        query: &Query,
        cursor: PageCursor,
    ) -> Result<Vec<RowData>, StreamError> {
        let bounded = query.clone().bounded(cursor);
        let mut guard = CursorGuard::new(self.open(&bounded).await?);

        let mut rows = Vec::with_capacity(cursor.page_size.min(MAX_PAGE_PREALLOC));
        while let Some(row) = guard.next().await? {
            rows.push(row);
        }

        debug!(
            offset = cursor.offset,
            page_size = cursor.page_size,
            rows = rows.len(),
            "Fetched page"
        );
        Ok(rows)
    }

    /// Checks that the store is reachable and answers a trivial query.
    async fn ping(&self) -> Result<(), StreamError> {
        let mut guard = CursorGuard::new(self.open(&Query::new("ping", "SELECT 1")).await?);
        guard.next().await?;
        Ok(())
    }

    /// Human readable description of the store, safe to log.
    fn describe(&self) -> String;
}

/// Owns a cursor and guarantees it is closed when the guard goes out of
/// scope, whichever way that happens.
pub struct CursorGuard {
    cursor: Box<dyn RowCursor>,
}

impl CursorGuard {
    pub fn new(cursor: Box<dyn RowCursor>) -> Self {
        CursorGuard { cursor }
    }

    pub async fn next(&mut self) -> Result<Option<RowData>, StreamError> {
        self.cursor.next().await
    }

    pub fn close(&mut self) {
        self.cursor.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_closed()
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.cursor.close();
    }
}
