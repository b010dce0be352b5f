use crate::stream::{PullStream, rows::RowStream};
use async_trait::async_trait;
use connectors::{
    error::StreamError,
    sql::base::{query::Query, source::RowSource},
};
use model::records::{batch::Batch, row::RowData};
use tracing::{debug, warn};

// Cap on the up-front buffer allocation; larger batches grow on demand.
const MAX_PREALLOC: usize = 4096;

/// Groups the rows of a row stream into batches of exactly `batch_size`
/// rows, except for a final short batch holding whatever is left when the
/// rows run out. Rows keep their arrival order.
///
/// Rows accumulated when the underlying stream fails are discarded: a short
/// batch only ever means "clean end of data".
pub struct BatchStream<S> {
    rows: S,
    batch_size: usize,
    buffer: Vec<RowData>,
    emitted: usize,
    done: bool,
}

impl<S> BatchStream<S>
where
    S: PullStream<Item = RowData>,
{
    pub fn new(rows: S, batch_size: usize) -> Result<Self, StreamError> {
        validate_batch_size(batch_size)?;
        Ok(BatchStream {
            rows,
            batch_size,
            buffer: Vec::with_capacity(batch_size.min(MAX_PREALLOC)),
            emitted: 0,
            done: false,
        })
    }

    /// Number of batches handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn emit(&mut self) -> Batch {
        let fresh = Vec::with_capacity(self.batch_size.min(MAX_PREALLOC));
        let rows = std::mem::replace(&mut self.buffer, fresh);
        let batch = Batch::new(self.emitted, rows);
        self.emitted += 1;
        debug!(index = batch.index, rows = batch.len(), "Batch emitted");
        batch
    }
}

impl BatchStream<RowStream> {
    /// Validates `batch_size`, then opens a row stream for `query`. An invalid
    /// size is rejected without touching the source.
    pub async fn open(
        source: &dyn RowSource,
        query: &Query,
        batch_size: usize,
    ) -> Result<Self, StreamError> {
        validate_batch_size(batch_size)?;
        let rows = RowStream::open(source, query).await?;
        BatchStream::new(rows, batch_size)
    }
}

fn validate_batch_size(batch_size: usize) -> Result<(), StreamError> {
    if batch_size < 1 {
        return Err(StreamError::invalid_argument(format!(
            "batch size must be at least 1, got {batch_size}"
        )));
    }
    Ok(())
}

#[async_trait]
impl<S> PullStream for BatchStream<S>
where
    S: PullStream<Item = RowData>,
{
    type Item = Batch;

    async fn next(&mut self) -> Result<Option<Batch>, StreamError> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self.rows.next().await {
                Ok(Some(row)) => {
                    self.buffer.push(row);
                    if self.buffer.len() == self.batch_size {
                        return Ok(Some(self.emit()));
                    }
                }
                Ok(None) => {
                    self.done = true;
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(self.emit()));
                }
                Err(err) => {
                    self.done = true;
                    if !self.buffer.is_empty() {
                        warn!(
                            discarded = self.buffer.len(),
                            "Discarding partial batch after fetch failure"
                        );
                        self.buffer.clear();
                    }
                    return Err(err);
                }
            }
        }
    }
}
