pub mod adapter;
pub mod params;
pub mod row;
pub mod seed;
pub mod utils;
