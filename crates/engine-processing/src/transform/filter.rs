use model::{core::value::Value, records::row::RowData};
use std::cmp::Ordering;

/// A pure row predicate. Implementations must not rely on being called in any
/// particular order or number of times.
pub trait Filter: Send + Sync {
    fn should_keep(&self, row: &RowData) -> bool;
}

/// Filters rows with an arbitrary closure.
pub struct FieldValueFilter<F>
where
    F: Fn(&RowData) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> FieldValueFilter<F>
where
    F: Fn(&RowData) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Filter for FieldValueFilter<F>
where
    F: Fn(&RowData) -> bool + Send + Sync,
{
    fn should_keep(&self, row: &RowData) -> bool {
        (self.predicate)(row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl CompareOp {
    fn matches(&self, ord: Ordering) -> bool {
        match self {
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Gte => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Lte => ord != Ordering::Greater,
            CompareOp::Eq => ord == Ordering::Equal,
        }
    }
}

/// Keeps rows whose `column` compares to a constant, e.g. `age > 40`.
/// Missing columns, NULLs and incomparable values never match.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: String,
    op: CompareOp,
    value: Value,
}

impl ColumnFilter {
    pub fn new(column: &str, op: CompareOp, value: Value) -> Self {
        Self {
            column: column.to_string(),
            op,
            value,
        }
    }

    pub fn greater_than(column: &str, value: Value) -> Self {
        Self::new(column, CompareOp::Gt, value)
    }
}

impl Filter for ColumnFilter {
    fn should_keep(&self, row: &RowData) -> bool {
        row.get(&self.column)
            .and_then(|field| field.value.compare(&self.value))
            .is_some_and(|ord| self.op.matches(ord))
    }
}
