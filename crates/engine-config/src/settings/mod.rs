pub mod batch_size;
pub mod page_size;
pub mod validated;

pub const ENV_DATABASE_URL: &str = "ROWSTREAM_DATABASE_URL";
pub const ENV_TABLE: &str = "ROWSTREAM_TABLE";
pub const ENV_KEY_COLUMN: &str = "ROWSTREAM_KEY_COLUMN";
pub const ENV_BATCH_SIZE: &str = "ROWSTREAM_BATCH_SIZE";
pub const ENV_PAGE_SIZE: &str = "ROWSTREAM_PAGE_SIZE";
