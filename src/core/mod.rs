pub mod aggregate;
pub mod allocator;
pub mod config;
pub mod decompose;
pub mod die;
pub mod explosion;
pub mod groups;
pub mod pipeline;
pub mod random;
pub mod summary;
