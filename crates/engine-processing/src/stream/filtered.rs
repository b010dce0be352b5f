use crate::{stream::PullStream, transform::filter::Filter};
use async_trait::async_trait;
use connectors::error::StreamError;
use model::records::batch::Batch;
use tracing::trace;

/// Applies a row filter to each batch of a batch stream.
///
/// Kept rows stay in their original order and each output batch carries the
/// index of the source batch it came from. Batches where every row was
/// filtered out are skipped, so consumers never see an empty batch. Errors
/// from the underlying stream pass through unchanged.
pub struct FilteredBatchStream<S, F> {
    batches: S,
    filter: F,
    skipped: usize,
}

impl<S, F> FilteredBatchStream<S, F>
where
    S: PullStream<Item = Batch>,
    F: Filter,
{
    pub fn new(batches: S, filter: F) -> Self {
        FilteredBatchStream {
            batches,
            filter,
            skipped: 0,
        }
    }

    /// Source batches dropped because nothing in them matched.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

#[async_trait]
impl<S, F> PullStream for FilteredBatchStream<S, F>
where
    S: PullStream<Item = Batch>,
    F: Filter,
{
    type Item = Batch;

    async fn next(&mut self) -> Result<Option<Batch>, StreamError> {
        while let Some(batch) = self.batches.next().await? {
            let index = batch.index;
            let rows: Vec<_> = batch
                .into_rows()
                .into_iter()
                .filter(|row| self.filter.should_keep(row))
                .collect();

            if rows.is_empty() {
                self.skipped += 1;
                trace!(index, "Batch filtered out entirely");
                continue;
            }

            return Ok(Some(Batch::new(index, rows)));
        }
        Ok(None)
    }
}
