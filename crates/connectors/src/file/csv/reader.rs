use crate::error::StreamError;
use bigdecimal::BigDecimal;
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use serde::Deserialize;
use std::{fs::File, io::Read, path::Path, str::FromStr};
use tracing::debug;
use uuid::Uuid;

/// A user record as it appears in the seed CSV (`name,email,age`).
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub age: BigDecimal,
}

#[derive(Debug, Deserialize)]
struct CsvUser {
    name: String,
    email: String,
    age: String,
}

impl NewUser {
    /// The row this user becomes once stored under `user_id`.
    pub fn to_row(&self, entity: &str, user_id: Uuid) -> RowData {
        RowData::new(
            entity,
            vec![
                FieldValue::new("user_id", Value::Uuid(user_id)),
                FieldValue::new("name", Value::String(self.name.clone())),
                FieldValue::new("email", Value::String(self.email.clone())),
                FieldValue::new("age", Value::Decimal(self.age.clone())),
            ],
        )
    }
}

pub fn read_users_file(path: impl AsRef<Path>) -> Result<Vec<NewUser>, StreamError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let users = read_users(file)?;
    debug!(path = %path.display(), users = users.len(), "Read users CSV");
    Ok(users)
}

pub fn read_users<R: Read>(input: R) -> Result<Vec<NewUser>, StreamError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut users = Vec::new();
    for (idx, record) in reader.deserialize::<CsvUser>().enumerate() {
        let record = record?;
        // +2: one for the header, one for 1-based line numbers
        let age = BigDecimal::from_str(&record.age).map_err(|e| {
            StreamError::invalid_argument(format!(
                "line {}: invalid age '{}': {e}",
                idx + 2,
                record.age
            ))
        })?;

        users.push(NewUser {
            name: record.name,
            email: record.email,
            age,
        });
    }

    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_users_trims_fields() {
        let csv = "name,email,age\n Ada Lovelace , ada@example.com , 36\nAlan,alan@example.com,41\n";
        let users = read_users(csv.as_bytes()).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Ada Lovelace");
        assert_eq!(users[0].email, "ada@example.com");
        assert_eq!(users[1].age, BigDecimal::from(41));
    }

    #[test]
    fn test_read_users_rejects_bad_age() {
        let csv = "name,email,age\nAda,ada@example.com,old\n";
        let err = read_users(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidArgument(msg) if msg.contains("line 2")));
    }

    #[test]
    fn test_read_users_reports_missing_column() {
        let csv = "name,email\nAda,ada@example.com\n";
        assert!(matches!(
            read_users(csv.as_bytes()),
            Err(StreamError::Csv(_))
        ));
    }

    #[test]
    fn test_to_row_orders_columns() {
        let user = NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            age: BigDecimal::from(36),
        };
        let row = user.to_row("user_data", Uuid::nil());
        let names: Vec<_> = row.field_values().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["user_id", "name", "email", "age"]);
    }
}
