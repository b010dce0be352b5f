use crate::transform::filter::Filter;
use model::records::row::RowData;
use std::sync::Arc;

pub trait FilterPipelineExt {
    fn add_if<T, F>(self, condition: bool, factory: F) -> Self
    where
        T: Filter + 'static,
        F: FnOnce() -> T;
}

/// Conjunction of filters: a row is kept only if every filter keeps it.
/// An empty pipeline keeps everything.
#[derive(Clone, Default)]
pub struct FilterPipeline {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter<T: Filter + 'static>(mut self, filter: T) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Filter for FilterPipeline {
    fn should_keep(&self, row: &RowData) -> bool {
        self.filters.iter().all(|filter| filter.should_keep(row))
    }
}

impl FilterPipelineExt for FilterPipeline {
    fn add_if<T, F>(self, condition: bool, factory: F) -> Self
    where
        T: Filter + 'static,
        F: FnOnce() -> T,
    {
        if condition {
            self.add_filter(factory())
        } else {
            self
        }
    }
}
