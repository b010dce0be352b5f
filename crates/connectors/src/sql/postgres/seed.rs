use crate::{
    error::StreamError,
    file::csv::reader::NewUser,
    sql::{base::query::quote_ident, postgres::adapter::PgConnection},
};
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// Creates the users table if it does not exist yet.
pub async fn create_users_table(conn: &PgConnection, table: &str) -> Result<(), StreamError> {
    let ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            user_id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            email VARCHAR(255) NOT NULL,
            age NUMERIC NOT NULL
        )",
        quote_ident(table)
    );

    conn.client()
        .batch_execute(&ddl)
        .await
        .map_err(|e| StreamError::query(&ddl, e))?;

    info!(table, "Users table ready");
    Ok(())
}

/// Inserts `users` with fresh ids in one transaction and returns the number
/// of rows written. Rows whose id already exists are skipped.
pub async fn insert_users(
    conn: &mut PgConnection,
    table: &str,
    users: Vec<NewUser>,
) -> Result<u64, StreamError> {
    let sql = format!(
        "INSERT INTO {} (user_id, name, email, age) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id) DO NOTHING",
        quote_ident(table)
    );
    let target = conn.target().to_string();

    let tx = conn
        .client_mut()
        .transaction()
        .await
        .map_err(|e| StreamError::connection(&target, e))?;
    let stmt = tx
        .prepare(&sql)
        .await
        .map_err(|e| StreamError::query(&sql, e))?;

    let mut inserted = 0;
    for user in users {
        let age = RustDecimal::from_str(&user.age.to_string()).map_err(|e| {
            StreamError::invalid_argument(format!("age '{}' for {}: {e}", user.age, user.email))
        })?;
        inserted += tx
            .execute(&stmt, &[&Uuid::new_v4(), &user.name, &user.email, &age])
            .await
            .map_err(|e| StreamError::query(&sql, e))?;
    }

    tx.commit()
        .await
        .map_err(|e| StreamError::query("COMMIT", e))?;

    info!(table, inserted, "Users inserted");
    Ok(inserted)
}
