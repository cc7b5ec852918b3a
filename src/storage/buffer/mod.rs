pub mod error;
pub mod frame;
pub mod manager;
pub mod replacer;

pub use error::BufferPoolError;
pub use frame::{BufferFrame, FrameHandle};
pub use manager::{BufferPool, BufferPoolConfig};
