pub mod query;
pub mod source;
