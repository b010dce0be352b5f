use bigdecimal::BigDecimal;
use model::{
    core::value::{FieldValue, Value},
    records::row::RowData,
};
use rust_decimal::Decimal as RustDecimal;
use std::str::FromStr;
use tokio_postgres::{Row as PgRow, types::Type};
use tracing::warn;
use uuid::Uuid;

/// Decodes a driver row into a [`RowData`], keeping the column order of the
/// result set. Columns of unsupported types decode as `Null`.
pub fn to_row_data(row: &PgRow, entity: &str) -> Result<RowData, tokio_postgres::Error> {
    let mut field_values = Vec::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode(row, idx, column.type_())?;
        field_values.push(FieldValue::new(column.name(), value));
    }

    Ok(RowData::new(entity, field_values))
}

fn decode(row: &PgRow, idx: usize, ty: &Type) -> Result<Value, tokio_postgres::Error> {
    let value = match *ty {
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(|v| Value::Int(v as i64)),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(|v| Value::Int(v as i64)),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::Int),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(|v| Value::Float(v as f64)),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(Value::Float),
        Type::NUMERIC => row
            .try_get::<_, Option<RustDecimal>>(idx)?
            .and_then(|v| BigDecimal::from_str(&v.to_string()).ok())
            .map(Value::Decimal),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Boolean),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(Value::Uuid),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx)?.map(Value::String)
        }
        ref other => {
            warn!(column = idx, ty = %other, "Unsupported column type, decoding as NULL");
            None
        }
    };

    Ok(value.unwrap_or(Value::Null))
}
