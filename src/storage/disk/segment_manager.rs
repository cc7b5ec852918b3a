use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::SegmentId;

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// SegmentManager is responsible for handling the segment files that back
/// the page store. Segment `s` lives in a file named after the decimal
/// string of `s` inside the data directory.
pub struct SegmentManager {
    base_dir: PathBuf,
    segments: Mutex<HashMap<SegmentId, Arc<SegmentFile>>>,
}

impl SegmentManager {
    /// Create a new SegmentManager rooted at the given data directory,
    /// creating the directory if it does not exist yet.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, DiskError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;

        Ok(Self {
            base_dir,
            segments: Mutex::new(HashMap::new()),
        })
    }

    /// Open the file for a segment, reusing an already open handle when
    /// the segment has been touched before.
    pub fn segment(&self, segment_id: SegmentId) -> Result<Arc<SegmentFile>, DiskError> {
        let mut segments = self.segments.lock();
        if let Some(segment) = segments.get(&segment_id) {
            return Ok(Arc::clone(segment));
        }

        let path = self.base_dir.join(segment_id.to_string());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let segment = Arc::new(SegmentFile {
            file: Mutex::new(file),
        });
        segments.insert(segment_id, Arc::clone(&segment));
        Ok(segment)
    }
}

/// One open segment file. Block reads and writes are serialized on the
/// file handle.
pub struct SegmentFile {
    file: Mutex<File>,
}

impl SegmentFile {
    /// Read exactly `buf.len()` bytes at `offset`. A region past the end
    /// of the file reads as zeroes; a page that was never written back
    /// is all-zero by definition.
    pub fn read_block(&self, offset: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        let mut file = self.file.lock();

        let file_size = file.metadata()?.len();
        if offset >= file_size {
            buf.fill(0);
            return Ok(());
        }

        let available = ((file_size - offset) as usize).min(buf.len());
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf[..available])?;
        buf[available..].fill(0);

        Ok(())
    }

    /// Write the full buffer at `offset`, extending the file as needed.
    pub fn write_block(&self, buf: &[u8], offset: u64) -> Result<(), DiskError> {
        let mut file = self.file.lock();

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_block() {
        let dir = TempDir::new().unwrap();
        let manager = SegmentManager::new(dir.path()).unwrap();

        let segment = manager.segment(3).unwrap();
        segment.write_block(b"hello world!", 24).unwrap();

        let mut buf = [0u8; 12];
        segment.read_block(24, &mut buf).unwrap();
        assert_eq!(&buf, b"hello world!");

        assert!(dir.path().join("3").exists());
    }

    #[test]
    fn test_read_past_end_is_zeroed() {
        let dir = TempDir::new().unwrap();
        let manager = SegmentManager::new(dir.path()).unwrap();

        let segment = manager.segment(0).unwrap();
        let mut buf = [0xffu8; 16];
        segment.read_block(4096, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn test_read_straddling_end_zero_fills_tail() {
        let dir = TempDir::new().unwrap();
        let manager = SegmentManager::new(dir.path()).unwrap();

        let segment = manager.segment(0).unwrap();
        segment.write_block(b"abcd", 0).unwrap();

        let mut buf = [0xffu8; 8];
        segment.read_block(0, &mut buf).unwrap();
        assert_eq!(&buf, b"abcd\0\0\0\0");
    }

    #[test]
    fn test_segment_handle_is_reused() {
        let dir = TempDir::new().unwrap();
        let manager = SegmentManager::new(dir.path()).unwrap();

        let first = manager.segment(7).unwrap();
        let second = manager.segment(7).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
