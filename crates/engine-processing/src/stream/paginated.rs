use crate::stream::PullStream;
use async_trait::async_trait;
use connectors::{
    error::StreamError,
    sql::base::{
        query::{Query, bind_bounds},
        source::RowSource,
    },
};
use model::pagination::{cursor::PageCursor, page::Page};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

/// Offset-paginated scan of a query.
///
/// Each page is an independent bounded query that is fully read before it
/// is handed out, so no cursor is held open between pages. The scan ends
/// on the first empty page; a short page is not taken as the end because
/// rows may be inserted concurrently. Pages are consistent individually,
/// not as a whole: concurrent writes can shift rows across page boundaries.
pub struct PaginatedStream {
    source: Arc<dyn RowSource>,
    query: Query,
    cursor: PageCursor,
    pages: usize,
    done: bool,
}

impl PaginatedStream {
    pub fn new(
        source: Arc<dyn RowSource>,
        query: Query,
        page_size: usize,
    ) -> Result<Self, StreamError> {
        Self::resume(source, query, PageCursor::first(page_size))
    }

    /// Continues a scan from a previously observed cursor.
    pub fn resume(
        source: Arc<dyn RowSource>,
        query: Query,
        cursor: PageCursor,
    ) -> Result<Self, StreamError> {
        if cursor.page_size < 1 {
            return Err(StreamError::invalid_argument(format!(
                "page size must be at least 1, got {}",
                cursor.page_size
            )));
        }
        if query.bounds.is_some() {
            return Err(StreamError::invalid_argument(
                "query is already bounded; pagination adds its own LIMIT/OFFSET",
            ));
        }
        bind_bounds(cursor)?;

        info!(
            source = %source.describe(),
            entity = %query.entity,
            offset = cursor.offset,
            page_size = cursor.page_size,
            "Paginated scan started"
        );
        Ok(PaginatedStream {
            source,
            query,
            cursor,
            pages: 0,
            done: false,
        })
    }

    /// Cursor of the next page to fetch. Persist it to resume later.
    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }
}

#[async_trait]
impl PullStream for PaginatedStream {
    type Item = Page;

    async fn next(&mut self) -> Result<Option<Page>, StreamError> {
        if self.done {
            return Ok(None);
        }

        let started = Instant::now();
        let rows = match self.source.fetch_page(&self.query, self.cursor).await {
            Ok(rows) => rows,
            Err(err) => {
                self.done = true;
                return Err(err);
            }
        };

        if rows.is_empty() {
            self.done = true;
            debug!(pages = self.pages, offset = self.cursor.offset, "Paginated scan finished");
            return Ok(None);
        }

        let page = Page {
            cursor: self.cursor,
            rows,
            took_ms: started.elapsed().as_millis(),
        };
        match page.next_cursor().filter(|next| bind_bounds(*next).is_ok()) {
            Some(next) => self.cursor = next,
            None => {
                // No addressable offset remains after this page
                self.done = true;
                debug!(pages = self.pages + 1, offset = self.cursor.offset, "Offset range exhausted");
            }
        }
        self.pages += 1;
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::into_stream;
    use connectors::memory::{Faults, MemoryRowSource};
    use futures::TryStreamExt;
    use model::{
        core::value::{FieldValue, Value},
        records::row::RowData,
    };

    fn users(n: i64) -> Vec<RowData> {
        (1..=n)
            .map(|id| RowData::new("user_data", vec![FieldValue::new("user_id", Value::Int(id))]))
            .collect()
    }

    fn query() -> Query {
        Query::table("user_data", Some("user_id"))
    }

    fn ids(page: &Page) -> Vec<Value> {
        page.rows.iter().map(|row| row.get_value("user_id")).collect()
    }

    #[tokio::test]
    async fn test_pages_until_empty() {
        let source = MemoryRowSource::new("users", users(5));
        let stats = source.stats();
        let pages: Vec<Page> = into_stream(PaginatedStream::new(Arc::new(source), query(), 2).unwrap())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.iter().map(Page::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(
            pages.iter().map(|p| p.cursor.offset).collect::<Vec<_>>(),
            vec![0, 2, 4]
        );
        assert_eq!(ids(&pages[2]), vec![Value::Int(5)]);
        // Three pages plus the empty trailing fetch, each released before the next.
        assert_eq!(stats.opened(), 4);
        assert_eq!(stats.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_page_count_is_ceiling() {
        for (rows, page_size) in [(0, 3), (1, 1), (6, 3), (7, 3), (10, 100)] {
            let source = Arc::new(MemoryRowSource::new("users", users(rows)));
            let pages: Vec<Page> = into_stream(PaginatedStream::new(source, query(), page_size).unwrap())
                .try_collect()
                .await
                .unwrap();

            let expected = (rows as usize).div_ceil(page_size);
            assert_eq!(pages.len(), expected, "rows = {rows}, page_size = {page_size}");
            assert!(pages.iter().all(|p| !p.is_empty()));
            let total: usize = pages.iter().map(Page::len).sum();
            assert_eq!(total, rows as usize);
        }
    }

    #[tokio::test]
    async fn test_resume_from_cursor() {
        let source: Arc<dyn RowSource> = Arc::new(MemoryRowSource::new("users", users(5)));

        let mut first = PaginatedStream::new(source.clone(), query(), 2).unwrap();
        first.next().await.unwrap().unwrap();
        let saved = first.cursor();
        assert_eq!(saved, PageCursor::at(2, 2));
        drop(first);

        let mut resumed = PaginatedStream::resume(source, query(), saved).unwrap();
        let page = resumed.next().await.unwrap().unwrap();
        assert_eq!(ids(&page), vec![Value::Int(3), Value::Int(4)]);
        assert_eq!(resumed.cursor(), PageCursor::at(4, 2));
    }

    #[tokio::test]
    async fn test_fetch_error_ends_scan() {
        let source = MemoryRowSource::new("users", users(5)).with_faults(Faults {
            fail_after: Some(1),
            ..Faults::default()
        });
        let stats = source.stats();
        let mut pages = PaginatedStream::new(Arc::new(source), query(), 2).unwrap();

        assert!(matches!(
            pages.next().await,
            Err(StreamError::Fetch { rows_read: 1, .. })
        ));
        assert!(pages.is_finished());
        assert!(pages.next().await.unwrap().is_none());
        assert_eq!(stats.opened(), 1);
        assert_eq!(stats.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_an_error() {
        let source = MemoryRowSource::new("users", users(3)).with_faults(Faults {
            unreachable: true,
            ..Faults::default()
        });
        let mut pages = PaginatedStream::new(Arc::new(source), query(), 2).unwrap();

        assert!(matches!(pages.next().await, Err(StreamError::Connection { .. })));
    }

    #[test]
    fn test_invalid_arguments_rejected_before_io() {
        let source = MemoryRowSource::new("users", users(3));
        let stats = source.stats();
        let source: Arc<dyn RowSource> = Arc::new(source);

        assert!(matches!(
            PaginatedStream::new(source.clone(), query(), 0),
            Err(StreamError::InvalidArgument(_))
        ));
        let bounded = query().bounded(PageCursor::first(10));
        assert!(matches!(
            PaginatedStream::new(source, bounded, 10),
            Err(StreamError::InvalidArgument(_))
        ));
        assert_eq!(stats.opened(), 0);
    }

    #[test]
    fn test_offsets_beyond_bigint_rejected_before_io() {
        let source = MemoryRowSource::new("users", users(3));
        let stats = source.stats();
        let source: Arc<dyn RowSource> = Arc::new(source);
        let too_far = i64::MAX as usize + 1;

        assert!(matches!(
            PaginatedStream::resume(source.clone(), query(), PageCursor::at(too_far, 10)),
            Err(StreamError::InvalidArgument(_))
        ));
        assert!(matches!(
            PaginatedStream::resume(source.clone(), query(), PageCursor::at(usize::MAX, usize::MAX)),
            Err(StreamError::InvalidArgument(_))
        ));
        assert!(matches!(
            PaginatedStream::new(source, query(), too_far),
            Err(StreamError::InvalidArgument(_))
        ));
        assert_eq!(stats.opened(), 0);
    }

    #[tokio::test]
    async fn test_huge_page_size_returns_single_page() {
        let source = MemoryRowSource::new("users", users(3));
        let stats = source.stats();
        let mut pages = PaginatedStream::new(Arc::new(source), query(), usize::MAX / 2).unwrap();

        let page = pages.next().await.unwrap().unwrap();
        assert_eq!(ids(&page), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(pages.next().await.unwrap().is_none());
        assert_eq!(pages.pages(), 1);
        assert_eq!(stats.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_scan_stops_when_next_offset_leaves_bigint_range() {
        let source = MemoryRowSource::new("users", users(3));
        let stats = source.stats();
        let start = PageCursor::at(1, i64::MAX as usize);
        let mut pages = PaginatedStream::resume(Arc::new(source), query(), start).unwrap();

        let page = pages.next().await.unwrap().unwrap();
        assert_eq!(ids(&page), vec![Value::Int(2), Value::Int(3)]);
        assert!(pages.is_finished());
        assert!(pages.next().await.unwrap().is_none());
        assert_eq!(pages.cursor(), start);
        assert_eq!(stats.opened(), 1);
    }
}
