//! Lazy, pull-based sequences over a row source.
//!
//! Nothing here runs in the background: a stream advances only when its
//! consumer calls [`PullStream::next`]. A stream is single-pass and must be
//! driven from one place at a time; independent scans each open their own
//! stream (and therefore their own cursor).

use async_trait::async_trait;
use connectors::error::StreamError;
use futures::Stream;

pub mod batch;
pub mod filtered;
pub mod paginated;
pub mod rows;

pub use batch::BatchStream;
pub use filtered::FilteredBatchStream;
pub use paginated::PaginatedStream;
pub use rows::RowStream;

/// "Give me the next item or tell me you're done."
///
/// `Ok(None)` is a clean end of stream. After an error or the end of stream,
/// every further call returns `Ok(None)`.
#[async_trait]
pub trait PullStream: Send {
    type Item: Send;

    async fn next(&mut self) -> Result<Option<Self::Item>, StreamError>;
}

/// Adapts a pull stream to a [`futures::Stream`] so it composes with the
/// `StreamExt`/`TryStreamExt` combinators. The stream ends after the first
/// error.
pub fn into_stream<S>(stream: S) -> impl Stream<Item = Result<S::Item, StreamError>> + Send
where
    S: PullStream,
{
    futures::stream::try_unfold(stream, |mut stream| async move {
        let item = stream.next().await?;
        Ok::<_, StreamError>(item.map(|item| (item, stream)))
    })
}
