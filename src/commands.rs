pub mod fetch;
pub mod realloc;
pub mod render;
pub mod stats;
