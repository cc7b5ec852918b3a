use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use siltdb::storage::buffer::BufferPool;

// Create a buffer pool backed by a temporary data directory
#[allow(dead_code)]
pub fn create_test_buffer_pool(
    page_size: usize,
    page_count: usize,
) -> Result<(Arc<BufferPool>, TempDir)> {
    let dir = TempDir::new()?;
    let pool = Arc::new(BufferPool::new(page_size, page_count, dir.path())?);
    Ok((pool, dir))
}

// Read a whole segment file from the data directory
#[allow(dead_code)]
pub fn read_segment_file(dir: &TempDir, segment: u16) -> Result<Vec<u8>> {
    Ok(std::fs::read(dir.path().join(segment.to_string()))?)
}
