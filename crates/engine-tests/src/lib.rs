#![allow(dead_code)]

use connectors::{
    error::StreamError,
    file::csv::reader::NewUser,
    sql::{
        base::query::quote_ident,
        postgres::{
            adapter::PgRowSource,
            seed::{create_users_table, insert_users},
        },
    },
};
use bigdecimal::BigDecimal;

pub mod utils;

/// Live tests only run when this points at a scratch Postgres database.
pub const TEST_PG_URL_ENV: &str = "ROWSTREAM_TEST_PG_URL";

/// Accepts no connections, so opening a source against it always fails to connect.
pub const UNREACHABLE_PG_URL: &str = "postgres://nobody@127.0.0.1:1/nowhere";

pub fn test_pg_url() -> Option<String> {
    std::env::var(TEST_PG_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Skips the calling test when no live database is configured.
#[macro_export]
macro_rules! require_pg {
    () => {
        match $crate::test_pg_url() {
            Some(url) => url,
            None => {
                eprintln!("{} not set, skipping", $crate::TEST_PG_URL_ENV);
                return;
            }
        }
    };
}

/// Drops and recreates `table`, then inserts one user per age.
async fn reset_users_table(url: &str, table: &str, ages: &[i64]) -> Result<PgRowSource, StreamError> {
    let source = PgRowSource::new(url)?;
    let mut conn = source.connect().await?;

    let drop = format!("DROP TABLE IF EXISTS {}", quote_ident(table));
    conn.client()
        .batch_execute(&drop)
        .await
        .map_err(|e| StreamError::query(&drop, e))?;
    create_users_table(&conn, table).await?;

    let users = ages
        .iter()
        .enumerate()
        .map(|(idx, age)| NewUser {
            name: format!("user{idx}"),
            email: format!("user{idx}@example.com"),
            age: BigDecimal::from(*age),
        })
        .collect();
    insert_users(&mut conn, table, users).await?;

    Ok(source)
}
