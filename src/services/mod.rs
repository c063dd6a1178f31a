pub mod cache;
pub mod extraction;
