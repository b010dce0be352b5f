pub mod filter;
pub mod pipeline;
