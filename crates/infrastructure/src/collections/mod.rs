pub mod task_types;
pub mod windows;

pub use task_types::{register_types_from_db, TaskTypeCollection};
pub use windows::{WindowCollection, WindowFailure, WindowListing};
