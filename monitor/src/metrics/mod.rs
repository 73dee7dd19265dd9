pub mod snapshot;
pub mod stream_stat;

// Re-export the main types for easy access
pub use snapshot::*;
pub use stream_stat::*;
