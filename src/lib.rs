// Export public modules
pub mod common;
pub mod storage;

// Re-export key items for convenient access
pub use common::types::PageId;
pub use storage::buffer::BufferPool;
pub use storage::buffer::BufferPoolConfig;
pub use storage::buffer::BufferPoolError;
pub use storage::buffer::FrameHandle;
