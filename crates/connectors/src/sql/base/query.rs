use crate::error::StreamError;
use model::{core::value::Value, pagination::cursor::PageCursor};

/// A parameterized query against a row source.
///
/// `sql` must not carry its own `LIMIT`/`OFFSET`; bounds are attached with
/// [`Query::bounded`] and rendered by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub entity: String,
    pub sql: String,
    pub params: Vec<Value>,
    pub bounds: Option<PageCursor>,
}

impl Query {
    pub fn new(entity: &str, sql: &str) -> Self {
        Query {
            entity: entity.to_string(),
            sql: sql.trim().trim_end_matches(';').to_string(),
            params: Vec::new(),
            bounds: None,
        }
    }

    /// `SELECT *` over a whole table. Offset pagination needs a stable order,
    /// so pass the key column whenever the query will be paginated.
    pub fn table(table: &str, order_by: Option<&str>) -> Self {
        let mut sql = format!("SELECT * FROM {}", quote_ident(table));
        if let Some(column) = order_by {
            sql.push_str(&format!(" ORDER BY {}", quote_ident(column)));
        }
        Query::new(table, &sql)
    }

    pub fn bind(mut self, value: Value) -> Self {
        self.params.push(value);
        self
    }

    pub fn bounded(mut self, cursor: PageCursor) -> Self {
        self.bounds = Some(cursor);
        self
    }

    /// Postgres text of the query, with bounds as trailing positional
    /// parameters, followed by the full parameter list.
    pub fn to_postgres(&self) -> Result<(String, Vec<Value>), StreamError> {
        let mut params = self.params.clone();
        let mut sql = self.sql.clone();

        if let Some(cursor) = self.bounds {
            let (limit, offset) = bind_bounds(cursor)?;
            let limit_idx = params.len() + 1;
            sql.push_str(&format!(" LIMIT ${} OFFSET ${}", limit_idx, limit_idx + 1));
            params.push(Value::Int(limit));
            params.push(Value::Int(offset));
        }

        Ok((sql, params))
    }
}

/// `(LIMIT, OFFSET)` of a cursor as BIGINT parameters. Fails when either
/// value is beyond `i64::MAX`.
pub fn bind_bounds(cursor: PageCursor) -> Result<(i64, i64), StreamError> {
    let limit = i64::try_from(cursor.page_size).map_err(|_| {
        StreamError::invalid_argument(format!("page size {} exceeds i64::MAX", cursor.page_size))
    })?;
    let offset = i64::try_from(cursor.offset).map_err(|_| {
        StreamError::invalid_argument(format!("offset {} exceeds i64::MAX", cursor.offset))
    })?;
    Ok((limit, offset))
}

pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}
