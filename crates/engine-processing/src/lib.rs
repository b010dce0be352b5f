pub mod aggregate;
pub mod stream;
pub mod transform;
