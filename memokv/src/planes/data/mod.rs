pub mod cache_object;
pub mod operation;
