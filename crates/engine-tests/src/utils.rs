use connectors::sql::base::query::{Query, quote_ident};
use model::records::{batch::Batch, row::RowData};

/// Whole-table scan ordered by age, so assertions do not depend on the
/// server's physical row order.
pub fn users_by_age(table: &str) -> Query {
    Query::new(
        table,
        &format!("SELECT * FROM {} ORDER BY age, email", quote_ident(table)),
    )
}

pub fn age_of(row: &RowData) -> f64 {
    row.get_value("age")
        .as_f64()
        .unwrap_or_else(|| panic!("row without numeric age: {row:?}"))
}

pub fn ages_of(rows: &[RowData]) -> Vec<f64> {
    rows.iter().map(age_of).collect()
}

pub fn batch_ages(batches: &[Batch]) -> Vec<Vec<f64>> {
    batches.iter().map(|batch| ages_of(&batch.rows)).collect()
}

/// Table name unique to one test, so tests can share a database.
pub fn scratch_table(test: &str) -> String {
    format!("rowstream_{test}")
}
