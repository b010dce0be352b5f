use crate::error::CliError;
use model::{
    pagination::page::Page,
    records::{batch::Batch, row::RowData},
};
use serde_json::{Value as JsonValue, json};
use std::io::{self, Write};

/// Writes one JSON document per line to stdout.
fn write_line(value: &JsonValue) -> Result<(), CliError> {
    let line = serde_json::to_string(value)?;
    let mut out = io::stdout().lock();
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

pub fn print_row(row: &RowData) -> Result<(), CliError> {
    write_line(&row.to_json())
}

pub fn print_batch(batch: &Batch) -> Result<(), CliError> {
    write_line(&json!({
        "batch": batch.index,
        "size": batch.len(),
        "rows": batch.rows.iter().map(RowData::to_json).collect::<Vec<_>>(),
    }))
}

fn page_json(page: &Page) -> JsonValue {
    json!({
        "offset": page.cursor.offset,
        "page_size": page.cursor.page_size,
        "took_ms": page.took_ms,
        "rows": page.rows.iter().map(RowData::to_json).collect::<Vec<_>>(),
        "next": page.next_cursor(),
    })
}

pub fn print_page(page: &Page) -> Result<(), CliError> {
    write_line(&page_json(page))
}

pub fn print_json(value: JsonValue) -> Result<(), CliError> {
    write_line(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::value::{FieldValue, Value},
        pagination::cursor::PageCursor,
    };

    fn page_at(cursor: PageCursor) -> Page {
        Page {
            cursor,
            rows: vec![RowData::new("user_data", vec![FieldValue::new("age", Value::Int(30))])],
            took_ms: 7,
        }
    }

    #[test]
    fn test_page_json_reports_timing_and_next_cursor() {
        let json = page_json(&page_at(PageCursor::at(4, 2)));

        assert_eq!(json["took_ms"], 7);
        assert_eq!(json["offset"], 4);
        assert_eq!(json["next"], json!({ "offset": 6, "page_size": 2 }));
        assert_eq!(json["rows"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_last_addressable_page_has_null_next() {
        let json = page_json(&page_at(PageCursor::at(usize::MAX, 1)));
        assert!(json["next"].is_null());
    }
}
