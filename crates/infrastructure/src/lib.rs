pub mod collections;
pub mod database;

pub use collections::*;
pub use database::*;
